//! Common library for the SAKTI Mini application
//!
//! This crate provides shared infrastructure used by the API service:
//! database connectivity and the database error types.

pub mod database;
pub mod error;
