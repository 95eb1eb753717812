//! Recency-decayed popularity scoring.
//!
//! The momentum score is total engagement divided by hours since
//! publication, rounded to two decimal places. It is "popularity as of
//! evaluation time": the orchestrator recomputes it lazily for items that
//! arrive without a score, and re-ingestion refreshes it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Floor on the age denominator, in hours. Keeps just-published content
/// from dividing by zero without letting the score blow up.
pub const MIN_AGE_HOURS: f64 = 1e-4;

/// Compute the momentum score for an item published at `published_at`
/// with the given engagement counters, as of `now`.
///
/// Engagement is the unweighted sum of all metric values; negative or
/// non-finite values count as zero. Platform adapters that want to weight
/// individual metrics (e.g. comments over raw views) do so before handing
/// items to the engine — this is the default/fallback formula.
pub fn score(
    published_at: DateTime<Utc>,
    metrics: &HashMap<String, f64>,
    now: DateTime<Utc>,
) -> f64 {
    let age_ms = (now - published_at).num_milliseconds() as f64;
    let hours = (age_ms / 3_600_000.0).max(MIN_AGE_HOURS);

    let engagement: f64 = metrics
        .values()
        .map(|v| if v.is_finite() && *v > 0.0 { *v } else { 0.0 })
        .sum();

    round2(engagement / hours)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn metrics(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_score_is_engagement_over_hours() {
        let now = Utc::now();
        let published = now - Duration::hours(10);
        let m = metrics(&[("likes", 80.0), ("comments", 20.0)]);
        assert_eq!(score(published, &m, now), 10.0);
    }

    #[test]
    fn test_score_rounds_to_two_decimals() {
        let now = Utc::now();
        let published = now - Duration::hours(3);
        let m = metrics(&[("likes", 10.0)]);
        // 10 / 3 = 3.333... -> 3.33
        assert_eq!(score(published, &m, now), 3.33);
    }

    #[test]
    fn test_score_deterministic_at_fixed_instant() {
        let now = Utc::now();
        let published = now - Duration::hours(5);
        let m = metrics(&[("upvotes", 123.0), ("comments", 45.0)]);
        assert_eq!(score(published, &m, now), score(published, &m, now));
    }

    #[test]
    fn test_score_non_negative() {
        let now = Utc::now();
        let published = now - Duration::hours(2);
        assert!(score(published, &HashMap::new(), now) >= 0.0);
        let m = metrics(&[("weird", -50.0)]);
        assert!(score(published, &m, now) >= 0.0);
    }

    #[test]
    fn test_just_published_does_not_divide_by_zero() {
        let now = Utc::now();
        let m = metrics(&[("likes", 1.0)]);
        let s = score(now, &m, now);
        assert!(s.is_finite());
        // 1 / 1e-4 hours = 10_000
        assert_eq!(s, 10_000.0);
    }

    #[test]
    fn test_monotonic_in_engagement() {
        let now = Utc::now();
        let published = now - Duration::hours(6);
        let low = metrics(&[("likes", 10.0)]);
        let high = metrics(&[("likes", 100.0)]);
        assert!(score(published, &high, now) > score(published, &low, now));
    }

    #[test]
    fn test_antitonic_in_age() {
        let now = Utc::now();
        let m = metrics(&[("likes", 500.0)]);
        let newer = score(now - Duration::hours(1), &m, now);
        let older = score(now - Duration::hours(48), &m, now);
        assert!(older <= newer);
    }

    #[test]
    fn test_input_not_mutated() {
        let now = Utc::now();
        let m = metrics(&[("likes", 7.0), ("views", 3.0)]);
        let before = m.clone();
        let _ = score(now - Duration::hours(1), &m, now);
        assert_eq!(m, before);
    }
}
