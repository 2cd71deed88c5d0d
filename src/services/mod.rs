/// OpenAPI documentation generation.
pub mod documentation;
/// Health check and monitoring snapshots.
pub mod health_service;
/// Match orchestration between the transport and the lifecycle core.
pub mod match_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;

use time::OffsetDateTime;

/// Current wall-clock time in unix milliseconds.
///
/// The single timestamp authority: answers are stamped here on receipt and
/// the core never reads a clock of its own.
pub(crate) fn now_unix_millis() -> u64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}
