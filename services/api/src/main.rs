use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use api::auth::AuthService;
use api::config::AppConfig;
use api::rate_limiter::{RateLimiter, RateLimits};
use api::repositories::{PgStudentRepository, PgTokenRepository, PgUserRepository};
use api::routes;
use api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting API service");

    let config = AppConfig::from_env();

    // Initialize database connection pool
    let db_config = common::database::DatabaseConfig::from_env()?;
    let pool = common::database::init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    sqlx::migrate!().run(&pool).await?;
    info!("Database migrations applied");

    let users = Arc::new(PgUserRepository::new(pool.clone()));
    let tokens = Arc::new(PgTokenRepository::new(pool.clone()));
    let students = Arc::new(PgStudentRepository::new(pool.clone()));

    let limits = RateLimits::default();
    let rate_limiter = RateLimiter::new();

    // Periodically drop stale rate-limit windows.
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup(Duration::from_secs(3600)).await;
        }
    });

    let app_state = AppState {
        auth: AuthService::new(users, tokens, config.token_ttl_days),
        students,
        rate_limiter,
        limits,
        environment: config.environment,
    };

    // Start the web server
    let app = routes::create_router(app_state)
        .layer(routes::cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("API service listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
