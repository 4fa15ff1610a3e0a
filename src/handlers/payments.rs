use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    errors::{AppError, Result},
    middleware::AuthUser,
    models::{
        ConfirmPaymentQuery, ConfirmPaymentResponse, CreatePreferenceRequest, MpMerchantOrder,
        PreferenceResponse,
    },
    services::PaidTransition,
    AppState,
};

const PROVIDER: &str = "mercadopago";
const SIMULATED_PROVIDER: &str = "simulated";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create_preference", post(create_preference))
        .route("/confirm_payment", get(confirm_payment))
        .route("/payments/simulate", post(simulate_payment))
}

/// Creates a Checkout Pro preference for the lifetime-access product.
pub async fn create_preference(
    State(state): State<AppState>,
    Json(payload): Json<CreatePreferenceRequest>,
) -> Result<Json<PreferenceResponse>> {
    payload.validate()?;
    let preference = state.payments.create_preference(payload.email.trim()).await?;
    Ok(Json(preference))
}

/// Queries the provider once for the given payment, preference or merchant
/// order. Not-yet-approved payments are reported, never retried here.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Query(query): Query<ConfirmPaymentQuery>,
) -> Result<Json<ConfirmPaymentResponse>> {
    if let Some(payment_id) = query.payment() {
        let payment = state.payments.find_payment(payment_id).await?;
        if !payment.is_approved() {
            info!("Payment {} not approved yet: {}", payment.id, payment.status);
            return Ok(Json(ConfirmPaymentResponse::pending(
                Some(payment.status),
                None,
            )));
        }

        let email = payment
            .payer_email()
            .or(query.external_reference.as_deref())
            .ok_or_else(|| AppError::BadRequest("approved payment has no payer email".to_string()))?
            .to_string();
        let token = grant_access(&state, &email, PROVIDER).await?;
        return Ok(Json(ConfirmPaymentResponse::approved(token)));
    }

    if let Some(preference_id) = query.preference() {
        let orders = state.payments.search_orders_by_preference(preference_id).await?;
        return settle_orders(&state, &orders, query.external_reference.as_deref()).await;
    }

    if let Some(order_id) = query.merchant_order() {
        let order = state.payments.find_merchant_order(order_id).await?;
        return settle_orders(&state, std::slice::from_ref(&order), query.external_reference.as_deref())
            .await;
    }

    Err(AppError::BadRequest(
        "collection_id or preference_id or merchant_order_id required".to_string(),
    ))
}

async fn settle_orders(
    state: &AppState,
    orders: &[MpMerchantOrder],
    fallback_email: Option<&str>,
) -> Result<Json<ConfirmPaymentResponse>> {
    for order in orders {
        if let Some(payment) = order.approved_payment() {
            let email = order
                .payer_email()
                .or(fallback_email)
                .ok_or_else(|| {
                    AppError::BadRequest("approved payment has no payer email".to_string())
                })?
                .to_string();
            info!("Order {} has approved payment {}", order.id, payment.id);
            let token = grant_access(state, &email, PROVIDER).await?;
            return Ok(Json(ConfirmPaymentResponse::approved(token)));
        }
    }

    let status = orders.iter().rev().find_map(|o| o.last_status()).map(str::to_string);
    Ok(Json(ConfirmPaymentResponse::pending(
        status,
        Some("no approved payment found yet".to_string()),
    )))
}

/// Local-testing stand-in for the provider's success signal.
pub async fn simulate_payment(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ConfirmPaymentResponse>> {
    if !state.allow_simulated_payments {
        return Err(AppError::NotFound("Simulated payments are disabled".to_string()));
    }

    warn!("Simulated payment accepted for {}", user.email());
    let token = grant_access(&state, user.email(), SIMULATED_PROVIDER).await?;
    Ok(Json(ConfirmPaymentResponse::approved(token)))
}

/// Flips the stored paid flag (when the payer has an account) and issues the access token.
async fn grant_access(state: &AppState, email: &str, provider: &str) -> Result<String> {
    let name = match state.users.mark_paid(email).await? {
        PaidTransition::Flipped | PaidTransition::AlreadyPaid => {
            state.users.find(email).await.and_then(|u| u.name)
        }
        PaidTransition::UnknownUser => {
            info!("Payment approved for an email without an account");
            None
        }
    };

    Ok(state.tokens.issue_access(email, name, provider)?)
}
