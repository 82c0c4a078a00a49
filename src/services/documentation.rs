use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the fastest-finger backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::sse::admin_stream,
        crate::routes::player::register,
        crate::routes::player::buzz,
        crate::routes::public::round,
        crate::routes::public::leaderboard,
        crate::routes::public::round_result,
        crate::routes::admin::start_round,
        crate::routes::admin::reset_round,
        crate::routes::admin::declare_final_winner,
        crate::routes::admin::refresh_game,
        crate::routes::admin::roster,
        crate::routes::admin::reset_players,
        crate::routes::admin::boot_player,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::AdminHandshake,
            crate::dto::player::RegisterRequest,
            crate::dto::player::RegisterResponse,
            crate::dto::player::BuzzResponse,
            crate::dto::admin::StartRoundRequest,
            crate::dto::admin::StartRoundResponse,
            crate::dto::admin::ActionResponse,
            crate::dto::admin::FinalWinnerResponse,
            crate::dto::public::RoundSnapshot,
            crate::dto::public::LeaderboardResponse,
            crate::dto::public::RosterResponse,
            crate::dto::public::RoundResultResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "player", description = "Player registration and buzzing"),
        (name = "public", description = "Read-only round and standings projections"),
        (name = "admin", description = "Operator round controls"),
    )
)]
pub struct ApiDoc;
