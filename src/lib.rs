pub mod client;
pub mod config;
pub mod display;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;

use std::{sync::Arc, time::Duration};

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use config::Config;
use handlers::{auth, games, generate, payments};
use middleware::IpRateLimiter;
use services::{GeminiClient, MercadoPagoClient, TokenIssuer, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub tokens: TokenIssuer,
    pub gemini: GeminiClient,
    pub payments: MercadoPagoClient,
    pub limiter: Arc<IpRateLimiter>,
    pub in_flight: generate::InFlight,
    pub allow_simulated_payments: bool,
}

impl AppState {
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let users = UserStore::open(&config.users_file).await?;

        Ok(Self {
            users: Arc::new(users),
            tokens: TokenIssuer::new(&config.jwt_secret),
            gemini: GeminiClient::new(
                http.clone(),
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
                config.gemini_api_base.clone(),
            ),
            payments: MercadoPagoClient::new(
                http,
                config.mp_access_token.clone(),
                &config.mp_api_base,
                &config.frontend_url,
            )?,
            limiter: Arc::new(middleware::build_limiter(config.rate_limit_per_minute)),
            in_flight: generate::InFlight::default(),
            allow_simulated_payments: config.allow_simulated_payments,
        })
    }
}

/// All routes with tracing and rate limiting; CORS is added by the binary.
pub fn app(state: AppState) -> Router {
    // Read-only endpoints
    let public_routes = Router::new()
        .route("/api/health", get(handlers::health_check))
        .nest("/api/games", games::router());

    // Endpoints that hash passwords, call paid APIs or mint tokens
    let limited_routes = Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(payments::router())
                .merge(generate::router()),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ));

    public_routes
        .merge(limited_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
