use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        admin::{ActionResponse, FinalWinnerResponse, StartRoundRequest, StartRoundResponse},
        public::RosterResponse,
    },
    error::AppError,
    services::{player_service, round_service},
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Operator-only endpoints driving the round lifecycle.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/round/start", post(start_round))
        .route("/admin/round/reset", post(reset_round))
        .route("/admin/round/final", post(declare_final_winner))
        .route("/admin/game/refresh", post(refresh_game))
        .route("/admin/players", get(roster))
        .route("/admin/players/reset", post(reset_players))
        .route("/admin/players/{id}", delete(boot_player))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Schedule and launch a new round.
#[utoipa::path(
    post,
    path = "/admin/round/start",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = StartRoundRequest,
    responses(
        (status = 200, description = "Round scheduled", body = StartRoundResponse),
        (status = 409, description = "A round is already in flight")
    )
)]
pub async fn start_round(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<StartRoundRequest>>,
) -> Result<Json<StartRoundResponse>, AppError> {
    Ok(Json(round_service::start_round(&state, payload).await?))
}

/// Abandon the current round and return to registration.
#[utoipa::path(
    post,
    path = "/admin/round/reset",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses((status = 200, description = "Round reset", body = ActionResponse))
)]
pub async fn reset_round(
    State(state): State<SharedState>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(round_service::reset_round(&state).await?))
}

/// Declare the last surviving player the champion.
#[utoipa::path(
    post,
    path = "/admin/round/final",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses(
        (status = 200, description = "Champion declared", body = FinalWinnerResponse),
        (status = 409, description = "Preconditions not met")
    )
)]
pub async fn declare_final_winner(
    State(state): State<SharedState>,
) -> Result<Json<FinalWinnerResponse>, AppError> {
    Ok(Json(round_service::declare_final_winner(&state).await?))
}

/// Reset every score and elimination mark.
#[utoipa::path(
    post,
    path = "/admin/game/refresh",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses((status = 200, description = "Game refreshed", body = ActionResponse))
)]
pub async fn refresh_game(
    State(state): State<SharedState>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(round_service::refresh_game(&state).await?))
}

/// Full roster in registration order.
#[utoipa::path(
    get,
    path = "/admin/players",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses((status = 200, description = "Registered players", body = RosterResponse))
)]
pub async fn roster(State(state): State<SharedState>) -> Result<Json<RosterResponse>, AppError> {
    Ok(Json(player_service::roster(&state).await?))
}

/// Remove every registered player.
#[utoipa::path(
    post,
    path = "/admin/players/reset",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses((status = 200, description = "Players removed", body = ActionResponse))
)]
pub async fn reset_players(
    State(state): State<SharedState>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(player_service::reset_players(&state).await?))
}

/// Remove one player from the session.
#[utoipa::path(
    delete,
    path = "/admin/players/{id}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("id" = Uuid, Path, description = "Identifier of the player to remove")),
    responses(
        (status = 204, description = "Player removed"),
        (status = 404, description = "Player not registered")
    )
)]
pub async fn boot_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    player_service::boot_player(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    let expected = {
        let guard = state.admin_token().lock().await;
        guard.clone()
    };

    match expected {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "admin SSE stream not initialised yet".into(),
        )),
    }
}
