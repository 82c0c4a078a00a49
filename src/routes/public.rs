use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::public::{LeaderboardResponse, RoundResultResponse, RoundSnapshot},
    error::AppError,
    services::{leaderboard as leaderboard_service, public_service},
    state::SharedState,
};

/// Read-only routes every client renders from.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/round", get(round))
        .route("/round/result", get(round_result))
        .route("/leaderboard", get(leaderboard))
}

/// Current round snapshot.
#[utoipa::path(
    get,
    path = "/round",
    tag = "public",
    responses((status = 200, description = "Round snapshot", body = RoundSnapshot))
)]
pub async fn round(State(state): State<SharedState>) -> Result<Json<RoundSnapshot>, AppError> {
    Ok(Json(public_service::round_snapshot(&state).await?))
}

/// Result rows of the most recently decided round.
#[utoipa::path(
    get,
    path = "/round/result",
    tag = "public",
    responses(
        (status = 200, description = "Round result", body = RoundResultResponse),
        (status = 404, description = "No decided round yet")
    )
)]
pub async fn round_result(
    State(state): State<SharedState>,
) -> Result<Json<RoundResultResponse>, AppError> {
    Ok(Json(public_service::last_round_result(&state).await?))
}

/// Ranked standings, capped to the configured display window.
#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "public",
    responses((status = 200, description = "Leaderboard window", body = LeaderboardResponse))
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(leaderboard_service::standings(&state).await?))
}
