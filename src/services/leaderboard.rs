//! Ranked standings derived from player records.

use std::cmp::Ordering;

use crate::{
    dto::public::{LeaderboardRow, LeaderboardResponse},
    error::ServiceError,
    services::player_service,
    state::{SharedState, models::PlayerRecord},
};

/// Rank every player: score descending, reaction time ascending as the
/// tie-break (missing reaction sorts last), registration order as the final
/// one. The full ordering is always computed; callers cap the display window.
pub fn rank(mut players: Vec<PlayerRecord>) -> Vec<LeaderboardRow> {
    players.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| compare_reactions(a.last_reaction_ms, b.last_reaction_ms))
            .then_with(|| a.registered_at.cmp(&b.registered_at))
    });

    players
        .into_iter()
        .enumerate()
        .map(|(index, player)| LeaderboardRow {
            rank: index + 1,
            player_id: player.id,
            nickname: player.nickname,
            score: player.score,
            last_reaction_ms: player.last_reaction_ms,
        })
        .collect()
}

fn compare_reactions(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Current standings, capped to the configured display window.
pub async fn standings(state: &SharedState) -> Result<LeaderboardResponse, ServiceError> {
    let players = player_service::load_players(state).await?;
    let ranked = rank(players);
    let total_players = ranked.len();
    Ok(LeaderboardResponse {
        rows: ranked
            .into_iter()
            .take(state.config().leaderboard_size)
            .collect(),
        total_players,
    })
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn player(score: u32, reaction: Option<u64>, registered_at: u64) -> PlayerRecord {
        PlayerRecord {
            id: Uuid::new_v4(),
            nickname: format!("p{score}"),
            first_name: String::new(),
            last_name: String::new(),
            victory_chant: None,
            score,
            last_reaction_ms: reaction,
            eliminated: None,
            registered_at,
        }
    }

    #[test]
    fn score_wins_then_faster_reaction_breaks_ties() {
        let ranked = rank(vec![
            player(3, Some(200), 1),
            player(3, Some(100), 2),
            player(5, None, 3),
        ]);

        let summary: Vec<(u32, Option<u64>)> = ranked
            .iter()
            .map(|row| (row.score, row.last_reaction_ms))
            .collect();
        assert_eq!(
            summary,
            vec![(5, None), (3, Some(100)), (3, Some(200))]
        );
        assert_eq!(
            ranked.iter().map(|row| row.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn missing_reaction_sorts_last_within_equal_scores() {
        let ranked = rank(vec![
            player(2, None, 1),
            player(2, Some(900), 2),
        ]);
        assert_eq!(ranked[0].last_reaction_ms, Some(900));
        assert_eq!(ranked[1].last_reaction_ms, None);
    }

    #[test]
    fn full_tie_falls_back_to_registration_order() {
        let first = player(1, Some(300), 10);
        let second = player(1, Some(300), 20);
        let expected = vec![first.id, second.id];

        let ranked = rank(vec![second, first]);
        assert_eq!(
            ranked.iter().map(|row| row.player_id).collect::<Vec<_>>(),
            expected
        );
    }
}
