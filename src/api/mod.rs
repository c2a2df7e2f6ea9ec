pub mod branch;
pub mod dashboard;
pub mod document;
pub mod employee;
pub mod leave;
pub mod leave_year;
pub mod settings;
pub mod user;
