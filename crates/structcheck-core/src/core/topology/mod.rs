pub mod chemistry;
pub mod classes;
pub mod connectivity;
pub mod registry;
