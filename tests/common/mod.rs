#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use trendscan::adapters::memory_history_adapter::MemoryHistoryAdapter;
use trendscan::domain::error::TrendscanError;
use trendscan::domain::market::InstrumentSnapshot;
use trendscan::domain::position::{PositionSide, TrendPosition};
pub use trendscan::domain::price_point::PriceHistoryPoint;
use trendscan::ports::price_history_port::PriceHistoryPort;
use trendscan::ports::snapshot_port::SnapshotPort;

/// History store with injectable failures in front of an in-memory store.
pub struct MockHistoryPort {
    pub inner: MemoryHistoryAdapter,
    pub read_errors: HashMap<String, String>,
    pub append_errors: HashMap<String, String>,
    pub timeouts: HashSet<String>,
    pub read_delays: HashMap<String, StdDuration>,
    pub reads: AtomicUsize,
}

impl MockHistoryPort {
    pub fn new() -> Self {
        Self {
            inner: MemoryHistoryAdapter::new(),
            read_errors: HashMap::new(),
            append_errors: HashMap::new(),
            timeouts: HashSet::new(),
            read_delays: HashMap::new(),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn with_points(self, instrument_id: &str, points: &[PriceHistoryPoint]) -> Self {
        self.inner.insert_points(instrument_id, points);
        self
    }

    pub fn with_read_error(mut self, instrument_id: &str, reason: &str) -> Self {
        self.read_errors
            .insert(instrument_id.to_string(), reason.to_string());
        self
    }

    pub fn with_append_error(mut self, instrument_id: &str, reason: &str) -> Self {
        self.append_errors
            .insert(instrument_id.to_string(), reason.to_string());
        self
    }

    pub fn with_timeout(mut self, instrument_id: &str) -> Self {
        self.timeouts.insert(instrument_id.to_string());
        self
    }

    pub fn with_read_delay(mut self, instrument_id: &str, delay: StdDuration) -> Self {
        self.read_delays.insert(instrument_id.to_string(), delay);
        self
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl PriceHistoryPort for MockHistoryPort {
    fn append(
        &self,
        instrument_id: &str,
        price: f64,
        volume: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), TrendscanError> {
        if let Some(reason) = self.append_errors.get(instrument_id) {
            return Err(TrendscanError::HistoryStore {
                instrument: instrument_id.to_string(),
                reason: reason.clone(),
            });
        }
        self.inner.append(instrument_id, price, volume, timestamp)
    }

    fn read_window(
        &self,
        instrument_id: &str,
        window_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<PriceHistoryPoint>, TrendscanError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.read_errors.get(instrument_id) {
            return Err(TrendscanError::HistoryStore {
                instrument: instrument_id.to_string(),
                reason: reason.clone(),
            });
        }
        if self.timeouts.contains(instrument_id) {
            return Err(TrendscanError::Timeout {
                instrument: instrument_id.to_string(),
                timeout_ms: 250,
            });
        }
        if let Some(delay) = self.read_delays.get(instrument_id) {
            std::thread::sleep(*delay);
        }
        self.inner.read_window(instrument_id, window_minutes, now)
    }
}

pub struct MockSnapshotPort {
    pub snapshots: Vec<InstrumentSnapshot>,
    pub error: Option<String>,
}

impl MockSnapshotPort {
    pub fn new(snapshots: Vec<InstrumentSnapshot>) -> Self {
        Self {
            snapshots,
            error: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            snapshots: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl SnapshotPort for MockSnapshotPort {
    fn fetch_snapshots(&self) -> Result<Vec<InstrumentSnapshot>, TrendscanError> {
        match &self.error {
            Some(reason) => Err(TrendscanError::Snapshot {
                reason: reason.clone(),
            }),
            None => Ok(self.snapshots.clone()),
        }
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 7, 16, 0, 0).unwrap()
}

pub fn minutes_before(minutes: i64) -> DateTime<Utc> {
    base_time() - Duration::minutes(minutes)
}

/// One tick per minute ending one minute before [`base_time`].
pub fn series_before_base(prices: &[f64], volume: f64) -> Vec<PriceHistoryPoint> {
    let n = prices.len() as i64;
    prices
        .iter()
        .enumerate()
        .map(|(i, &price)| PriceHistoryPoint::new(minutes_before(n - i as i64), price, volume))
        .collect()
}

/// One tick per minute ending at [`base_time`].
pub fn series_ending_at_base(prices: &[f64], volume: f64) -> Vec<PriceHistoryPoint> {
    let n = prices.len() as i64;
    prices
        .iter()
        .enumerate()
        .map(|(i, &price)| PriceHistoryPoint::new(minutes_before(n - 1 - i as i64), price, volume))
        .collect()
}

pub fn linear(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + i as f64 * step).collect()
}

/// `start + rate * i²`: a move that accelerates every tick.
pub fn steepening(start: f64, rate: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + rate * (i * i) as f64).collect()
}

pub fn snapshot(id: &str, price: f64, volume: f64) -> InstrumentSnapshot {
    InstrumentSnapshot {
        id: id.to_string(),
        outcome_prices: format!("[\"{}\",\"{}\"]", price, 1.0 - price),
        volume,
        liquidity: 25_000.0,
        question: format!("Will {id} resolve yes?"),
        category: "crypto".to_string(),
    }
}

pub fn long_position(id: &str, instrument_id: &str, entry: f64) -> TrendPosition {
    TrendPosition::open(
        id,
        instrument_id,
        PositionSide::Long,
        entry,
        100.0,
        base_time() - Duration::hours(1),
    )
}

pub fn short_position(id: &str, instrument_id: &str, entry: f64) -> TrendPosition {
    TrendPosition::open(
        id,
        instrument_id,
        PositionSide::Short,
        entry,
        100.0,
        base_time() - Duration::hours(1),
    )
}
