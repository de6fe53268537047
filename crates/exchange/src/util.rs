//! Identifiers, timestamps, nonces and trace events.

use rand::Rng;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const TRACE_TARGET: &str = "aries::trace";

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current UTC time as RFC 3339.
pub fn timestamp_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::UNIX_EPOCH.to_string())
}

/// Parse a stamp written by [`timestamp_now`]. The fractional part has
/// no fixed width, so stamps only order correctly once parsed.
pub fn parse_timestamp(ts: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(ts, &Rfc3339).ok()
}

/// Seconds since the epoch.
pub fn epoch_now() -> u64 {
    OffsetDateTime::now_utc().unix_timestamp().max(0) as u64
}

/// 80-bit random nonce in decimal.
pub fn random_nonce() -> String {
    let mut bytes = [0u8; 10];
    rand::thread_rng().fill(&mut bytes[..]);
    let mut n: u128 = 0;
    for b in bytes {
        n = (n << 8) | u128::from(b);
    }
    n.to_string()
}

/// Emit an exchange trace event when tracing is on for the record.
pub fn trace_event(enabled: bool, exchange_id: &str, thread_id: Option<&str>, outcome: &str) {
    if enabled {
        tracing::info!(
            target: TRACE_TARGET,
            exchange_id,
            thread_id = thread_id.unwrap_or(""),
            outcome,
            "exchange trace"
        );
    }
}
