//! Shared types for the mojung board: domain models, HTTP request/response
//! shapes and the error taxonomy used by every other crate.

pub mod api;
pub mod error;
pub mod models;
