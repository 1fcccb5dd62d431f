//! In-process price history store.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::domain::error::TrendscanError;
use crate::domain::price_point::PriceHistoryPoint;
use crate::ports::price_history_port::PriceHistoryPort;

/// Ticks per instrument kept sorted by timestamp behind a read/write lock.
#[derive(Debug, Default)]
pub struct MemoryHistoryAdapter {
    series: RwLock<HashMap<String, Vec<PriceHistoryPoint>>>,
    /// Ticks older than this are dropped on append.
    retention: Option<Duration>,
}

impl MemoryHistoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            retention: Some(retention),
        }
    }

    pub fn insert_points(&self, instrument_id: &str, points: &[PriceHistoryPoint]) {
        let mut series = self.series.write();
        let entry = series.entry(instrument_id.to_string()).or_default();
        entry.extend_from_slice(points);
        entry.sort_by_key(|p| p.timestamp);
    }

    pub fn len(&self, instrument_id: &str) -> usize {
        self.series
            .read()
            .get(instrument_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl PriceHistoryPort for MemoryHistoryAdapter {
    fn append(
        &self,
        instrument_id: &str,
        price: f64,
        volume: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), TrendscanError> {
        let mut series = self.series.write();
        let entry = series.entry(instrument_id.to_string()).or_default();

        let point = PriceHistoryPoint::new(timestamp, price, volume);
        let at = entry.partition_point(|p| p.timestamp <= timestamp);
        entry.insert(at, point);

        // a retention reaching past the representable range keeps everything
        if let Some(cutoff) = self
            .retention
            .and_then(|retention| timestamp.checked_sub_signed(retention))
        {
            entry.retain(|p| p.timestamp >= cutoff);
        }
        Ok(())
    }

    fn read_window(
        &self,
        instrument_id: &str,
        window_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<PriceHistoryPoint>, TrendscanError> {
        let since = now - Duration::minutes(i64::from(window_minutes));
        let series = self.series.read();
        Ok(series
            .get(instrument_id)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.timestamp >= since && p.timestamp <= now)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
