//! Trend math over half-window comparisons

use crate::analytics::models::Trend;

/// Changes strictly beyond this many percent count as a trend
pub const TREND_THRESHOLD: f64 = 10.0;

/// `(second - first) / first * 100`, or 0 when `first` is not positive
pub fn percentage_change(first: f64, second: f64) -> f64 {
    if first > 0.0 {
        (second - first) / first * 100.0
    } else {
        0.0
    }
}

/// Classify an unrounded percentage change
pub fn classify(change: f64) -> Trend {
    if change > TREND_THRESHOLD {
        Trend::Increasing
    } else if change < -TREND_THRESHOLD {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Trend and rounded change between two half-window counts
pub fn trend_between(first_half: u64, second_half: u64) -> (Trend, i64) {
    let change = percentage_change(first_half as f64, second_half as f64);
    (classify(change), change.round() as i64)
}

/// Compare the average of the first half of the buckets against the second;
/// on odd lengths the second half gets the extra bucket
pub fn trend_over_time(counts: &[u64]) -> Trend {
    if counts.len() < 2 {
        return Trend::Stable;
    }

    let (first, second) = counts.split_at(counts.len() / 2);
    classify(percentage_change(average(first), average(second)))
}

fn average(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<u64>() as f64 / values.len() as f64
}
