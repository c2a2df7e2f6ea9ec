pub mod branch;
pub mod document;
pub mod employee;
pub mod leave;
pub mod leave_year;
pub mod permission;
pub mod role;
pub mod settings;
pub mod user;
