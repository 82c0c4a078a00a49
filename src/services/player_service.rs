//! Player registration and roster management.

use uuid::Uuid;

use crate::{
    dto::{
        admin::ActionResponse,
        player::{RegisterRequest, RegisterResponse},
        public::{PlayerSummary, RosterResponse},
    },
    error::ServiceError,
    services::sse_events,
    state::{SharedState, models::PlayerRecord, models::decode},
    store::{StoreError, keys},
};

/// Register a new player into the hosted game session.
pub async fn register(
    state: &SharedState,
    request: RegisterRequest,
) -> Result<RegisterResponse, ServiceError> {
    if request.game_id != state.game_id() {
        return Err(ServiceError::InvalidInput(format!(
            "unknown game `{}`",
            request.game_id
        )));
    }

    let record = PlayerRecord {
        id: Uuid::new_v4(),
        nickname: request.nickname.trim().to_owned(),
        first_name: request.first_name.trim().to_owned(),
        last_name: request.last_name.trim().to_owned(),
        victory_chant: request
            .victory_chant
            .as_deref()
            .map(str::trim)
            .filter(|chant| !chant.is_empty())
            .map(str::to_owned),
        score: 0,
        last_reaction_ms: None,
        eliminated: None,
        registered_at: state.clock().now_ms(),
    };

    let key = keys::player(state.game_id(), record.id);
    state
        .store()
        .set(
            &key,
            serde_json::to_value(&record).map_err(StoreError::from)?,
        )
        .await?;

    let player: PlayerSummary = record.into();
    sse_events::broadcast_player_joined(state, player.clone());
    Ok(RegisterResponse { player })
}

/// Every registered player, in registration order.
pub async fn load_players(state: &SharedState) -> Result<Vec<PlayerRecord>, ServiceError> {
    let prefix = keys::players_prefix(state.game_id());
    let mut players: Vec<PlayerRecord> = state
        .store()
        .list_prefix(&prefix)
        .await?
        .into_iter()
        .filter_map(|(key, value)| decode(&key, value))
        .collect();
    players.sort_by_key(|player| (player.registered_at, player.id));
    Ok(players)
}

/// Roster projection for the operator console.
pub async fn roster(state: &SharedState) -> Result<RosterResponse, ServiceError> {
    let players = load_players(state)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(RosterResponse { players })
}

/// Remove one player from the session.
pub async fn boot_player(state: &SharedState, player_id: Uuid) -> Result<(), ServiceError> {
    let key = keys::player(state.game_id(), player_id);
    if state.store().get(&key).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "player `{player_id}` is not registered"
        )));
    }
    state.store().remove(&key).await?;
    sse_events::broadcast_player_booted(state, player_id);
    Ok(())
}

/// Remove every registered player.
pub async fn reset_players(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    let prefix = keys::players_prefix(state.game_id());
    let players = state.store().list_prefix(&prefix).await?;
    let removed = players.len();
    for (key, _) in players {
        state.store().remove(&key).await?;
    }
    sse_events::broadcast_leaderboard(state, Vec::new());
    Ok(ActionResponse::new(format!("removed {removed} players")))
}
