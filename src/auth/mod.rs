pub mod auth;
pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod permission;
pub mod revocation;
pub mod session;
