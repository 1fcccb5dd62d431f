//! SQLite price history store.
//!
//! Ticks live in a single `price_history` table keyed by instrument id with
//! timestamps stored as epoch milliseconds, so window reads are a range scan
//! on `(instrument_id, ts_ms)`.

use chrono::{DateTime, Duration, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::domain::error::TrendscanError;
use crate::domain::price_point::PriceHistoryPoint;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_history_port::PriceHistoryPort;

/// Instrument label for errors not tied to one instrument.
const ANY_INSTRUMENT: &str = "*";

pub struct SqliteHistoryAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteHistoryAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TrendscanError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| TrendscanError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4);
        if pool_size < 1 {
            return Err(TrendscanError::ConfigInvalid {
                section: "sqlite".into(),
                key: "pool_size".into(),
                reason: "pool_size must be at least 1".into(),
            });
        }

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size as u32)
            .build(manager)
            .map_err(|e: r2d2::Error| store_error(ANY_INSTRUMENT, e))?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, TrendscanError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| store_error(ANY_INSTRUMENT, e))?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), TrendscanError> {
        let conn = self.connection(ANY_INSTRUMENT)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS price_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                instrument_id TEXT NOT NULL,
                ts_ms INTEGER NOT NULL,
                price REAL NOT NULL,
                volume REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_price_history_instrument_ts
                ON price_history(instrument_id, ts_ms);",
        )
        .map_err(|e: rusqlite::Error| store_error(ANY_INSTRUMENT, e))?;
        Ok(())
    }

    /// Delete ticks older than `retention` before `now`. Returns rows removed.
    pub fn prune(&self, retention: Duration, now: DateTime<Utc>) -> Result<usize, TrendscanError> {
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return Ok(0);
        };
        let cutoff = cutoff.timestamp_millis();
        let conn = self.connection(ANY_INSTRUMENT)?;
        conn.execute(
            "DELETE FROM price_history WHERE ts_ms < ?1",
            params![cutoff],
        )
        .map_err(|e: rusqlite::Error| store_error(ANY_INSTRUMENT, e))
    }

    fn connection(
        &self,
        instrument_id: &str,
    ) -> Result<PooledConnection<SqliteConnectionManager>, TrendscanError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| store_error(instrument_id, e))
    }
}

impl PriceHistoryPort for SqliteHistoryAdapter {
    fn append(
        &self,
        instrument_id: &str,
        price: f64,
        volume: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), TrendscanError> {
        let conn = self.connection(instrument_id)?;
        conn.execute(
            "INSERT INTO price_history (instrument_id, ts_ms, price, volume)
             VALUES (?1, ?2, ?3, ?4)",
            params![instrument_id, timestamp.timestamp_millis(), price, volume],
        )
        .map_err(|e: rusqlite::Error| store_error(instrument_id, e))?;
        Ok(())
    }

    fn read_window(
        &self,
        instrument_id: &str,
        window_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<PriceHistoryPoint>, TrendscanError> {
        let conn = self.connection(instrument_id)?;
        let since = (now - Duration::minutes(i64::from(window_minutes))).timestamp_millis();
        let until = now.timestamp_millis();

        let mut stmt = conn
            .prepare(
                "SELECT ts_ms, price, volume
                 FROM price_history
                 WHERE instrument_id = ?1 AND ts_ms >= ?2 AND ts_ms <= ?3
                 ORDER BY ts_ms ASC, id ASC",
            )
            .map_err(|e: rusqlite::Error| store_error(instrument_id, e))?;

        let rows = stmt
            .query_map(params![instrument_id, since, until], |row| {
                let ts_ms: i64 = row.get(0)?;
                let timestamp = DateTime::<Utc>::from_timestamp_millis(ts_ms).ok_or(
                    rusqlite::Error::IntegralValueOutOfRange(0, ts_ms),
                )?;
                Ok(PriceHistoryPoint::new(timestamp, row.get(1)?, row.get(2)?))
            })
            .map_err(|e: rusqlite::Error| store_error(instrument_id, e))?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row.map_err(|e: rusqlite::Error| store_error(instrument_id, e))?);
        }
        Ok(points)
    }
}

fn store_error(instrument_id: &str, e: impl std::fmt::Display) -> TrendscanError {
    TrendscanError::HistoryStore {
        instrument: instrument_id.to_string(),
        reason: e.to_string(),
    }
}
