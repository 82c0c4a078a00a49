//! Request, response, and event payloads exchanged with clients.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod admin;
pub mod health;
pub mod player;
pub mod public;
pub mod sse;
pub mod validation;

/// Format an epoch-millisecond timestamp as RFC 3339 for display strings.
pub(crate) fn format_epoch_ms(ms: u64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .ok()
        .and_then(|stamp| stamp.format(&Rfc3339).ok())
        .unwrap_or_else(|| "invalid-timestamp".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_formatting_is_rfc3339() {
        assert_eq!(format_epoch_ms(0), "1970-01-01T00:00:00Z");
        assert!(format_epoch_ms(1_700_000_000_000).starts_with("2023-11-14T"));
    }
}
