//! API service routes

pub mod auth;
pub mod mahasiswa;

use axum::{
    Router,
    extract::State,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    response::Response,
    routing::{get, post},
};
use serde_json::json;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::{ApiError, NotFoundKind};
use crate::middleware::{
    api_rate_limit, auth_middleware, envelope_router_errors, expose_error_detail,
    security_headers,
};
use crate::state::AppState;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route(
            "/mahasiswa",
            get(mahasiswa::index).post(mahasiswa::store),
        )
        .route(
            "/mahasiswa/:id",
            get(mahasiswa::show)
                .put(mahasiswa::update)
                .delete(mahasiswa::destroy),
        )
        .merge(protected_routes)
        .fallback(endpoint_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), api_rate_limit))
        .layer(middleware::from_fn(envelope_router_errors))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            expose_error_detail,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), security_headers))
        .with_state(state)
}

/// CORS policy: allow-listed origins with credentials, exposing the
/// rate-limit headers to browser clients.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([
            header::RETRY_AFTER,
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("x-ratelimit-remaining"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Response {
    crate::response::ok(
        "SAKTI Mini API is running",
        json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.environment.as_str(),
        }),
    )
}

/// Fallback for routes that do not exist
pub async fn endpoint_not_found() -> ApiError {
    ApiError::NotFound(NotFoundKind::Endpoint)
}
