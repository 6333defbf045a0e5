pub mod atom;
pub mod builder;
pub mod chain;
pub mod ids;
pub mod model;
pub mod residue;
pub mod structure;
