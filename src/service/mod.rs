//! One module per entity; each wraps the statements for its tables.

pub mod branch;
pub mod document;
pub mod employee;
pub mod leave;
pub mod leave_year;
pub mod settings;
pub mod user;
