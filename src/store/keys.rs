//! Key layout of the shared round store.
//!
//! Documents are addressed by slash-separated paths scoped under a game
//! session. Attempts and winner records additionally carry the round
//! identifier in their path, so documents from superseded rounds are simply
//! orphaned rather than deleted when a new round starts.

use std::fmt;

use uuid::Uuid;

/// Slash-separated path addressing exactly one document in the round store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey(String);

impl StoreKey {
    /// Wrap an already-formed path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Borrow the raw path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key lives under `prefix` (strictly below, not equal).
    pub fn is_under(&self, prefix: &StoreKey) -> bool {
        self.0.len() > prefix.0.len() + 1
            && self.0.starts_with(&prefix.0)
            && self.0.as_bytes()[prefix.0.len()] == b'/'
    }

    /// Final path segment, e.g. the player id of an attempt key.
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The singleton round-state document of a game session.
pub fn round_state(game: Uuid) -> StoreKey {
    StoreKey(format!("games/{}/round", game.simple()))
}

/// One player's attempt for one round.
pub fn attempt(game: Uuid, round: &str, player: Uuid) -> StoreKey {
    StoreKey(format!(
        "games/{}/rounds/{round}/attempts/{}",
        game.simple(),
        player.simple()
    ))
}

/// Prefix under which all attempts of a round live.
pub fn attempts_prefix(game: Uuid, round: &str) -> StoreKey {
    StoreKey(format!("games/{}/rounds/{round}/attempts", game.simple()))
}

/// The first-writer-wins winner record of a round.
pub fn winner(game: Uuid, round: &str) -> StoreKey {
    StoreKey(format!("games/{}/rounds/{round}/winner", game.simple()))
}

/// The post-lock summary of a round.
pub fn round_summary(game: Uuid, round: &str) -> StoreKey {
    StoreKey(format!("games/{}/rounds/{round}/summary", game.simple()))
}

/// One registered player's record.
pub fn player(game: Uuid, player: Uuid) -> StoreKey {
    StoreKey(format!("games/{}/players/{}", game.simple(), player.simple()))
}

/// Prefix under which every player record of a game lives.
pub fn players_prefix(game: Uuid) -> StoreKey {
    StoreKey(format!("games/{}/players", game.simple()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matching_requires_separator() {
        let game = Uuid::new_v4();
        let prefix = players_prefix(game);
        let record = player(game, Uuid::new_v4());
        assert!(record.is_under(&prefix));
        assert!(!prefix.is_under(&prefix));

        let sibling = StoreKey::new(format!("{}extra/x", prefix.as_str()));
        assert!(!sibling.is_under(&prefix));
    }

    #[test]
    fn leaf_is_last_segment() {
        let game = Uuid::new_v4();
        let id = Uuid::new_v4();
        assert_eq!(player(game, id).leaf(), id.simple().to_string());
    }
}
