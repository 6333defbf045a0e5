//! # structcheck Core Library
//!
//! Diagnosis and repair of deposited biomolecular structures so they become suitable
//! input for physical simulation.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Immutable, revisioned structure models, the topology
//!   reference (residue templates, classification tables, atom chemistry), the spatial
//!   index and geometry helpers, plus thin record adapters for PDB text and FASTA sequences.
//!
//! - **[`engine`]: The Logic Core.** Independent diagnostic checks producing typed findings,
//!   the report assembler with before/after diffing, the sequential repair stages, the
//!   capability interfaces for external collaborators and a built-in minimizer.
//!
//! - **[`workflows`]: The Public API.** `check::run` produces a report for one structure
//!   revision; `repair::run` drives the full check/repair cycle and returns the repaired
//!   revision together with its before and after reports.

pub mod core;
pub mod engine;
pub mod workflows;

#[cfg(test)]
pub(crate) mod test_utils;
