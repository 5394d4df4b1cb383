use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tapline::{
    AppState, Stores,
    clock::SystemClock,
    config::Config,
    middleware::{RateLimiter, log_errors, rate_limit},
    routes,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {e}"))?;

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'tapline';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .map_err(|e| format!("Failed to connect to Postgres: {e}"))?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let redis_client = Arc::new(
        redis::Client::open(config.redis_url.clone())
            .map_err(|e| format!("Failed to create Redis client: {e}"))?,
    );

    let state = AppState::new(
        config,
        Stores::live(pool, redis_client.clone()),
        Arc::new(SystemClock),
    );
    let config = state.config.clone();
    let rate_limiter = Arc::new(RateLimiter::new(redis_client, config.clone()));

    let router = routes::router(state)
        .layer(axum::middleware::from_fn(log_errors))
        .layer(axum::middleware::from_fn_with_state(rate_limiter, rate_limit));

    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
