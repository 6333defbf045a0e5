//! # Workflows Module
//!
//! High-level entry points that turn a loaded structure into a report, or into a repaired
//! revision with before and after reports.
//!
//! ## Overview
//!
//! Workflows validate their configuration, build the shared analysis context, run the checks
//! or repair stages in order and assemble the results. Progress is reported per phase so a
//! front end can render it without knowing the individual checks or stages.
//!
//! ## Architecture
//!
//! - **Check Workflow** ([`check`]) - Runs every check on one revision and merges the findings
//!   into a [`Report`](crate::engine::report::Report).
//! - **Repair Workflow** ([`repair`]) - Drives the thirteen repair stages, optional geometric
//!   repair cycles and the before/after diff.
//!
//! ## Key Capabilities
//!
//! - **Immutable revisions** so every stage result can be inspected and diffed
//! - **Graceful degradation** when collaborators are missing, slow or fail
//! - **Deterministic reports** suitable for machine comparison

pub mod check;
pub mod repair;
