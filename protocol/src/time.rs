//! Ledger epoch time.
//!
//! Transaction timestamps count seconds from the network's genesis instant
//! ([`EPOCH_BEGINNING_MS`]), not from the Unix epoch.

use chrono::{DateTime, TimeZone, Utc};

use crate::config::EPOCH_BEGINNING_MS;

/// Current time in seconds since the ledger epoch.
///
/// Clamped to zero for clocks set before genesis.
pub fn epoch_time_now() -> u32 {
    to_epoch_time(Utc::now())
}

/// Convert a wall-clock instant to seconds since the ledger epoch.
pub fn to_epoch_time(at: DateTime<Utc>) -> u32 {
    let elapsed_ms = at.timestamp_millis() - EPOCH_BEGINNING_MS;
    // Round to the nearest second.
    let seconds = (elapsed_ms + 500) / 1000;
    seconds.clamp(0, i64::from(u32::MAX)) as u32
}

/// Convert seconds since the ledger epoch back to a UTC instant.
pub fn to_utc(epoch_time: u32) -> Option<DateTime<Utc>> {
    let millis = EPOCH_BEGINNING_MS + i64::from(epoch_time) * 1000;
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_zero() {
        let genesis = Utc.timestamp_millis_opt(EPOCH_BEGINNING_MS).unwrap();
        assert_eq!(to_epoch_time(genesis), 0);
        assert_eq!(to_utc(0), Some(genesis));
    }

    #[test]
    fn roundtrips_whole_seconds() {
        let at = to_utc(86_400).unwrap();
        assert_eq!(to_epoch_time(at), 86_400);
    }

    #[test]
    fn before_genesis_clamps_to_zero() {
        let early = Utc.timestamp_millis_opt(0).unwrap();
        assert_eq!(to_epoch_time(early), 0);
    }

    #[test]
    fn now_is_after_genesis() {
        assert!(epoch_time_now() > 0);
    }
}
