//! SAKTI Mini API service
//!
//! Token-authenticated student records API: registration and login with
//! opaque bearer tokens, throttled endpoints, a uniform JSON response
//! envelope and soft-deleting mahasiswa CRUD.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod rate_limiter;
pub mod repositories;
pub mod response;
pub mod routes;
pub mod state;
pub mod validation;
