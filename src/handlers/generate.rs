use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use axum::{extract::State, response::Json, routing::post, Router};
use tracing::info;
use validator::Validate;

use crate::{
    errors::{AppError, Result},
    middleware::PaidUser,
    models::{find_game, GenerationRequest, GenerationResult},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/generate", post(generate_numbers))
}

/// Users with a generation request outstanding.
#[derive(Clone, Default)]
pub struct InFlight(Arc<Mutex<HashSet<String>>>);

impl InFlight {
    /// Claims the slot for `key`; `None` when a request is already running.
    pub fn try_acquire(&self, key: &str) -> Option<InFlightGuard> {
        let mut active = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !active.insert(key.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            set: self.clone(),
            key: key.to_string(),
        })
    }
}

pub struct InFlightGuard {
    set: InFlight,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut active = self.set.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        active.remove(&self.key);
    }
}

/// One suggestion for the requested game. A second request from the same
/// user while the first is running is refused rather than queued.
pub async fn generate_numbers(
    State(state): State<AppState>,
    PaidUser(user): PaidUser,
    Json(payload): Json<GenerationRequest>,
) -> Result<Json<GenerationResult>> {
    payload.validate()?;

    let game = find_game(&payload.game_name)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown game: {}", payload.game_name)))?;
    game.validate_pick_count(payload.pick_count)
        .map_err(AppError::BadRequest)?;

    let _guard = state.in_flight.try_acquire(user.email()).ok_or_else(|| {
        AppError::TooManyRequests("A generation is already in progress".to_string())
    })?;

    let result = state.gemini.generate(game, payload.pick_count).await?;

    info!(
        "Generated {} tokens for {} ({} requested)",
        result.generated_numbers.len(),
        game.id,
        payload.pick_count
    );
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_in_flight_request_per_key() {
        let in_flight = InFlight::default();
        let guard = in_flight.try_acquire("ana@example.com").unwrap();
        assert!(in_flight.try_acquire("ana@example.com").is_none());
        assert!(in_flight.try_acquire("bia@example.com").is_some());

        drop(guard);
        assert!(in_flight.try_acquire("ana@example.com").is_some());
    }
}
