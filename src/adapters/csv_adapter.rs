//! CSV file adapters for snapshots, open positions and seed price history.
//!
//! Snapshot file columns: `id,outcome_prices,volume,liquidity,question,category`
//! with `outcome_prices` holding the JSON pair (quoted per CSV rules).
//!
//! Position file columns:
//! `id,instrument_id,side,entry_price,position_size,entry_time[,current_price,highest_price,lowest_price]`.
//!
//! History file columns: `instrument_id,timestamp,price,volume` with RFC 3339
//! timestamps.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::error::TrendscanError;
use crate::domain::market::InstrumentSnapshot;
use crate::domain::position::{PositionSide, TrendPosition};
use crate::ports::price_history_port::PriceHistoryPort;
use crate::ports::snapshot_port::SnapshotPort;

/// Snapshot provider backed by a CSV file, re-read on every fetch.
pub struct CsvAdapter {
    snapshots_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(snapshots_path: PathBuf) -> Self {
        Self { snapshots_path }
    }

    pub fn load_positions(path: &Path) -> Result<Vec<TrendPosition>, TrendscanError> {
        let rows: Vec<PositionRow> = read_rows(path)?;
        Ok(rows.into_iter().map(PositionRow::into_position).collect())
    }

    /// Append every history row to `store`. Returns the number of ticks.
    pub fn seed_history(
        path: &Path,
        store: &dyn PriceHistoryPort,
    ) -> Result<usize, TrendscanError> {
        let rows: Vec<HistoryRow> = read_rows(path)?;
        for row in &rows {
            store.append(&row.instrument_id, row.price, row.volume, row.timestamp)?;
        }
        debug!(file = %path.display(), ticks = rows.len(), "seeded price history");
        Ok(rows.len())
    }
}

impl SnapshotPort for CsvAdapter {
    fn fetch_snapshots(&self) -> Result<Vec<InstrumentSnapshot>, TrendscanError> {
        read_rows(&self.snapshots_path).map_err(|e| TrendscanError::Snapshot {
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PositionRow {
    id: String,
    instrument_id: String,
    side: PositionSide,
    entry_price: f64,
    position_size: f64,
    entry_time: DateTime<Utc>,
    #[serde(default)]
    current_price: Option<f64>,
    #[serde(default)]
    highest_price: Option<f64>,
    #[serde(default)]
    lowest_price: Option<f64>,
}

impl PositionRow {
    fn into_position(self) -> TrendPosition {
        let mut position = TrendPosition::open(
            &self.id,
            &self.instrument_id,
            self.side,
            self.entry_price,
            self.position_size,
            self.entry_time,
        );
        if let Some(high) = self.highest_price {
            position.highest_price = position.highest_price.max(high);
        }
        if let Some(low) = self.lowest_price {
            position.lowest_price = position.lowest_price.min(low);
        }
        position.refresh(self.current_price.unwrap_or(self.entry_price));
        position
    }
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    instrument_id: String,
    timestamp: DateTime<Utc>,
    price: f64,
    volume: f64,
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, TrendscanError> {
    let csv_error = |e: csv::Error| TrendscanError::Csv {
        file: path.display().to_string(),
        reason: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(csv_error)
}
