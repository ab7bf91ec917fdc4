//! Shared database schema identifiers and query builders.
//!
//! Builders return `(String, sea_query::Values)`; the server binds the
//! values to its SQLite connection.

pub mod plans;
pub mod tables;
pub mod users;

pub use tables::*;

pub type Built = (String, sea_query::Values);
