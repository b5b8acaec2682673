//! Payload timestamp normalization

use chrono::{DateTime, Utc};

/// Convert an epoch timestamp from a payload into a UTC time.
///
/// Emitters are inconsistent about units: values above 1e10 are epoch
/// milliseconds, everything else epoch seconds. Negative or non-finite
/// values return `None`; callers fall back to the receive time.
pub fn normalize_epoch(ts: f64) -> Option<DateTime<Utc>> {
    if !ts.is_finite() || ts < 0.0 {
        return None;
    }
    let secs = if ts > 1.0e10 { ts / 1000.0 } else { ts };
    let whole = secs.trunc() as i64;
    let nanos = (secs.fract() * 1e9) as u32;
    DateTime::from_timestamp(whole, nanos)
}
