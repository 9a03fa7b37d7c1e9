//! Application state shared across handlers

use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::Environment;
use crate::rate_limiter::{RateLimiter, RateLimits};
use crate::repositories::StudentRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub students: Arc<dyn StudentRepository>,
    pub rate_limiter: RateLimiter,
    pub limits: RateLimits,
    pub environment: Environment,
}
