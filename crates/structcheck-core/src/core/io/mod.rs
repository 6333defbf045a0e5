//! Thin adapters between text formats and the structure model.
//!
//! The PDB adapter only tokenizes lines into raw records; validation and assembly happen in
//! [`crate::core::models::builder::load`]. The FASTA adapter supplies canonical sequences.

pub mod fasta;
pub mod pdb;
pub mod traits;
