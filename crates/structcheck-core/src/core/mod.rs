//! # Core Module
//!
//! Stateless building blocks shared by every check and repair stage.
//!
//! - **Structure Representation** ([`models`]) - Atoms, residues, chains, models and the
//!   revisioned [`models::structure::Structure`] aggregate, plus the record loader.
//! - **Structural Knowledge** ([`topology`]) - Residue templates, classification tables,
//!   atom chemistry and covalent connectivity.
//! - **Proximity Queries** ([`spatial`]) - Uniform grid over atom coordinates.
//! - **File I/O** ([`io`]) - PDB record tokenizer/writer and FASTA canonical sequences.
//! - **Geometry** ([`utils`]) - Internal-coordinate placement, dihedrals, signed volumes.

pub mod io;
pub mod models;
pub mod spatial;
pub mod topology;
pub mod utils;
