//! Price history store port trait.

use chrono::{DateTime, Utc};

use crate::domain::error::TrendscanError;
use crate::domain::price_point::PriceHistoryPoint;

/// Shared tick store. Implementations must tolerate concurrent calls for
/// different instruments; scan and monitor cycles fan out across threads.
pub trait PriceHistoryPort: Send + Sync {
    fn append(
        &self,
        instrument_id: &str,
        price: f64,
        volume: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), TrendscanError>;

    /// Points with `now - window_minutes <= timestamp <= now`, ascending.
    fn read_window(
        &self,
        instrument_id: &str,
        window_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<PriceHistoryPoint>, TrendscanError>;
}
