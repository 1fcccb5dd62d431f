//! Price history observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed tick for an instrument. Windows are ordered ascending by
/// timestamp; no fixed sampling interval is assumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: f64,
}

impl PriceHistoryPoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }
}

/// Price column of a window.
pub fn prices(points: &[PriceHistoryPoint]) -> Vec<f64> {
    points.iter().map(|p| p.price).collect()
}

/// Minutes elapsed between the first and last point, 0 for fewer than 2 points.
pub fn span_minutes(points: &[PriceHistoryPoint]) -> f64 {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() >= 2 => {
            (last.timestamp - first.timestamp).num_milliseconds() as f64 / 60_000.0
        }
        _ => 0.0,
    }
}
