//! # Engine Module
//!
//! Diagnosis and repair logic operating on immutable structure revisions.
//!
//! ## Overview
//!
//! A [`context::CheckContext`] flattens the primary model of one revision into the
//! tables every check needs: atom chemistry, a spatial index and bond connectivity. The
//! [`checks`] are pure functions of that context; their findings are assembled into a
//! [`report::Report`]. The [`repairs`] are sequential stages, each consuming the current
//! revision and producing the next one together with notes on anything left unresolved.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Check thresholds, repair switches and collaborator limits
//! - **Findings** ([`findings`]) - Typed finding variants, clash categories and repair notes
//! - **Checks** ([`checks`]) - The fourteen diagnostic passes and their parallel driver
//! - **Reports** ([`report`]) - Report assembly, JSON/CSV output and before/after diffs
//! - **Repairs** ([`repairs`]) - The thirteen repair stages
//! - **Collaborators** ([`collaborators`]) - Sequence, modeling and minimization interfaces
//!   with timeout handling, plus the built-in [`minimizer`]
//! - **Progress Monitoring** ([`progress`]) - Phase and task events for front ends
//! - **Error Handling** ([`error`]) - Conditions that abort a run

pub mod checks;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod findings;
pub mod minimizer;
pub mod progress;
pub mod repairs;
pub mod report;
