//! Request middleware: bearer-token authentication, rate limiting and
//! envelope normalization

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde_json::{Value, json};
use std::net::SocketAddr;

use crate::config::Environment;
use crate::error::{ApiError, ErrorDetail};
use crate::rate_limiter::retry_after_secs;
use crate::state::AppState;

/// Client IP resolved for the current request, inserted by the rate-limit
/// middleware so handlers can key their own limiters on it.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

fn resolve_client_ip(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded
            .split(',')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return first.to_string();
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Generic API rate limit, keyed by client IP. Applied before routing, so it
/// covers every endpoint including unknown routes.
pub async fn api_rate_limit(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = resolve_client_ip(&req);

    let remaining = state
        .rate_limiter
        .check(&format!("api:ip:{ip}"), state.limits.api)
        .await
        .map_err(|retry| ApiError::RateLimited {
            retry_after: retry_after_secs(retry),
        })?;

    req.extensions_mut().insert(ClientIp(ip));

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", state.limits.api.max_attempts.into());
    headers.insert("x-ratelimit-remaining", remaining.into());
    Ok(response)
}

/// Validate the bearer token and make the authenticated session available to
/// handlers. Authenticated endpoints carry a stricter per-user rate limit.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(ApiError::Unauthenticated);
    };

    let session = state.auth.authenticate(bearer.token()).await?;

    state
        .rate_limiter
        .check(
            &format!("auth:user:{}", session.user.id),
            state.limits.authenticated,
        )
        .await
        .map_err(|retry| ApiError::RateLimited {
            retry_after: retry_after_secs(retry),
        })?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Attach the baseline security headers to every response. HSTS is only
/// sent in production and only when the request arrived over HTTPS.
pub async fn security_headers(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let https = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|proto| proto.eq_ignore_ascii_case("https"))
        .unwrap_or(false);

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );
    if state.environment == Environment::Production && https {
        headers.insert(
            "strict-transport-security",
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }
    response
}

/// Outside production, replace the generic 500 message with the full error
/// detail the error mapper attached as a response extension.
pub async fn expose_error_detail(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    reveal_error_detail(response, state.environment).await
}

pub(crate) async fn reveal_error_detail(response: Response, environment: Environment) -> Response {
    if environment == Environment::Production {
        return response;
    }
    let Some(detail) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, 64 * 1024).await {
        Ok(bytes) => bytes,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(mut envelope) => {
            envelope["message"] = json!(detail.0);
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(envelope.to_string()))
        }
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}

/// Re-wrap plain error responses generated inside the router (405s,
/// extractor rejections) into the JSON envelope, so that no response ever
/// escapes without it.
pub async fn envelope_router_errors(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let status = response.status();

    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);
    if is_json {
        return response;
    }

    let (parts, body) = response.into_parts();
    let detail = axum::body::to_bytes(body, 64 * 1024)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default();

    let (key, fallback): (&str, &str) = match parts.status.as_u16() {
        401 => ("auth", "Authentication required."),
        403 => ("authorization", "Access denied."),
        404 => ("endpoint", "The requested endpoint does not exist."),
        405 => ("method", "The HTTP method is not supported for this endpoint."),
        429 => ("rate_limit", "Too many requests. Please try again later."),
        500..=599 => ("server", "An error occurred while processing your request."),
        _ => ("request", "The request could not be processed."),
    };
    let message = if detail.is_empty() {
        fallback.to_string()
    } else {
        detail
    };

    let mut errors = serde_json::Map::new();
    errors.insert(key.to_string(), json!([fallback]));

    let mut wrapped =
        crate::response::error(parts.status, &message, Value::Object(errors)).into_response();
    // Keep router-set headers such as Allow on 405 responses.
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            wrapped.headers_mut().insert(name.clone(), value.clone());
        }
    }
    wrapped
}
