/// Buzz arbitration against the shared per-round keys.
pub mod buzz_service;
/// Countdown tick sequencing and round scheduling.
pub mod countdown;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Ranked standings derived from player records.
pub mod leaderboard;
/// Time-driven phase reconciler.
pub mod phase_guard;
/// Player registration and roster management.
pub mod player_service;
/// Read-only projections served to every client.
pub mod public_service;
/// Round lifecycle operations driven by the operator.
pub mod round_service;
/// Winner finalization, scoring, and elimination resolution.
pub mod scoring;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
