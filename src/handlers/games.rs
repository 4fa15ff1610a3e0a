use axum::{extract::Path, response::Json, routing::get, Router};

use crate::{
    errors::{AppError, Result},
    models::{find_game, GameDescriptor, LOTTERY_GAMES},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_games))
        .route("/:id", get(get_game))
}

pub async fn list_games() -> Json<&'static [GameDescriptor]> {
    Json(LOTTERY_GAMES)
}

pub async fn get_game(Path(id): Path<String>) -> Result<Json<&'static GameDescriptor>> {
    find_game(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Unknown game: {}", id)))
}
