use std::{net::SocketAddr, time::Duration};

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lotostats_backend::{app, config::Config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lotostats_backend=info,tower_http=info,info")),
        )
        .init();

    let config = Config::from_env()?;
    if config.uses_dev_secret() && !config.debug_mode {
        warn!("⚠️ Running with the development JWT secret outside DEBUG_MODE");
    }
    if config.allow_simulated_payments {
        warn!("⚠️ Simulated payments are enabled; do not use this in production");
    }

    let state = AppState::from_config(&config).await?;
    info!("👤 User store at {}", state.users.path().display());

    // Forget idle rate-limit keys so the table does not grow without bound
    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    });

    let app = app(state).layer(cors_layer(&config));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🚀 Server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

// Permissive for development, restricted to ALLOWED_ORIGINS (or the frontend URL) otherwise
fn cors_layer(config: &Config) -> CorsLayer {
    let cors = if config.debug_mode {
        info!("🔓 Development mode: Using permissive CORS");
        CorsLayer::new().allow_origin(Any)
    } else {
        let allowed_origins = config
            .allowed_origins
            .clone()
            .unwrap_or_else(|| config.frontend_url.clone());

        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .filter_map(|origin| {
                let trimmed = origin.trim();
                match trimmed.parse() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!("⚠️ Ignoring invalid origin '{}': {}", trimmed, e);
                        None
                    }
                }
            })
            .collect();

        info!("🔒 Production mode: CORS configured for origins: {}", allowed_origins);
        CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(true)
    };

    cors.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
        ])
}
