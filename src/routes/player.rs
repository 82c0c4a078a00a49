use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::player::{BuzzResponse, RegisterRequest, RegisterResponse},
    error::AppError,
    services::{buzz_service, player_service},
    state::SharedState,
};

/// Routes exposed to player clients.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/players/register", post(register))
        .route("/players/{id}/buzz", post(buzz))
}

/// Register a new player into the hosted game session.
#[utoipa::path(
    post,
    path = "/players/register",
    tag = "player",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Player registered", body = RegisterResponse),
        (status = 400, description = "Invalid profile or unknown game")
    )
)]
pub async fn register(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegisterRequest>>,
) -> Result<Json<RegisterResponse>, AppError> {
    Ok(Json(player_service::register(&state, payload).await?))
}

/// Submit a buzz for the active round.
#[utoipa::path(
    post,
    path = "/players/{id}/buzz",
    tag = "player",
    params(("id" = Uuid, Path, description = "Identifier of the buzzing player")),
    responses(
        (status = 200, description = "Buzz arbitrated", body = BuzzResponse),
        (status = 409, description = "No round is accepting buzzes")
    )
)]
pub async fn buzz(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BuzzResponse>, AppError> {
    Ok(Json(buzz_service::buzz(&state, id).await?))
}
