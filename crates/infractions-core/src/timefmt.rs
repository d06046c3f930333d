//! Coarse human-readable ages for infraction display.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Renders how long ago `then_ms` was, relative to `now_ms`, at the
/// granularity operators read in chat ("few seconds" up to "N weeks").
/// A `then_ms` in the future clamps to "few seconds".
#[must_use]
pub fn pretty_age(then_ms: u64, now_ms: u64) -> String {
    let secs = now_ms.saturating_sub(then_ms) / 1000;
    let days = secs / 86_400;

    if secs < 60 {
        "few seconds".to_string()
    } else if secs < 120 {
        "minute".to_string()
    } else if secs < 3_600 {
        format!("{} minutes", secs / 60)
    } else if secs < 7_200 {
        "hour".to_string()
    } else if secs < 86_400 {
        format!("{} hours", secs / 3_600)
    } else if days == 1 {
        "day".to_string()
    } else if days < 7 {
        format!("{days} days")
    } else {
        format!("{} weeks", days.div_ceil(7))
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    const MS: u64 = 1000;

    #[test]
    fn buckets_match_expected_granularity() {
        let now = 1_700_000_000_000;
        assert_eq!(pretty_age(now - 5 * MS, now), "few seconds");
        assert_eq!(pretty_age(now - 90 * MS, now), "minute");
        assert_eq!(pretty_age(now - 600 * MS, now), "10 minutes");
        assert_eq!(pretty_age(now - 5_000 * MS, now), "hour");
        assert_eq!(pretty_age(now - 30_000 * MS, now), "8 hours");
        assert_eq!(pretty_age(now - 100_000 * MS, now), "day");
        assert_eq!(pretty_age(now - 3 * 86_400 * MS, now), "3 days");
        assert_eq!(pretty_age(now - 20 * 86_400 * MS, now), "3 weeks");
    }

    #[test]
    fn future_timestamps_clamp() {
        assert_eq!(pretty_age(2_000, 1_000), "few seconds");
    }

    #[test]
    fn epoch_millis_is_past_2020() {
        assert!(epoch_millis() > 1_577_836_800_000);
    }
}
