use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::{
    errors::Result,
    middleware::AuthUser,
    models::{AuthResponse, ForgotPasswordRequest, LoginRequest, PublicUser, RegisterRequest},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot", post(forgot_password))
        .route("/me", get(me))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    payload.validate()?;

    let record = state
        .users
        .register(&payload.email, &payload.password, payload.name)
        .await?;
    let user = PublicUser::from(&record);
    let token = state.tokens.issue_session(&user)?;

    Ok(Json(AuthResponse { token, user }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    payload.validate()?;

    let record = state
        .users
        .authenticate(&payload.email, &payload.password)
        .await?;
    let user = PublicUser::from(&record);
    let token = state.tokens.issue_session(&user)?;

    info!("User {} logged in", record.id);
    Ok(Json(AuthResponse { token, user }))
}

/// Always acknowledges, so the endpoint does not reveal which emails exist.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;

    match state.users.find(&payload.email).await {
        Some(record) => info!("Password reset requested for user {}", record.id),
        None => info!("Password reset requested for an unknown email"),
    }

    Ok(Json(json!({ "ok": true })))
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Json<PublicUser>> {
    let current = match state.users.find(user.email()).await {
        Some(record) => PublicUser {
            paid: record.paid || user.claims.paid,
            ..PublicUser::from(&record)
        },
        // Access tokens from a payment can outlive or precede an account
        None => PublicUser {
            email: user.claims.sub.clone(),
            name: user.claims.name.clone(),
            paid: user.claims.paid,
        },
    };

    Ok(Json(current))
}
