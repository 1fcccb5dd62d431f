//! Momentum scanner.
//!
//! One scan cycle walks the candidate snapshots, records each observed tick
//! in the price history store, reads the rolling window back and emits an
//! opportunity when volume-weighted momentum clears the threshold and the
//! trend is confirmed. Every instrument is evaluated independently; a
//! failure on one is logged and skipped without affecting the others.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::indicator::{compute_with_macd, MacdTracker, TrendIndicators, VolumeTrend};
use crate::domain::market::{FilterRejection, InstrumentSnapshot, MarketFilters};
use crate::domain::momentum::volume_weighted_momentum;
use crate::domain::price_point::{span_minutes, PriceHistoryPoint};
use crate::ports::price_history_port::PriceHistoryPort;
use crate::ports::snapshot_port::SnapshotPort;

/// Weight applied to confirmed opportunities when ranking.
pub const CONFIRMED_RANK_WEIGHT: f64 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub min_momentum_percent: f64,
    pub window_minutes: u32,
    pub filters: MarketFilters,
    /// Reads slower than this are treated as missing data.
    pub fetch_timeout: Option<Duration>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            min_momentum_percent: 2.0,
            window_minutes: 60,
            filters: MarketFilters::default(),
            fetch_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
}

/// Market state at the time an opportunity was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    pub price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
    /// Price change per minute across the window.
    pub velocity: f64,
    pub volume: f64,
    pub spread: f64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentumOpportunity {
    pub id: String,
    pub instrument_id: String,
    pub market: MarketSummary,
    pub direction: Direction,
    pub strength: f64,
    pub timestamp: DateTime<Utc>,
    pub indicators: TrendIndicators,
    pub trend_confirmed: bool,
    pub volume_trend: VolumeTrend,
}

impl MomentumOpportunity {
    pub fn rank_weight(&self) -> f64 {
        if self.trend_confirmed {
            self.strength * CONFIRMED_RANK_WEIGHT
        } else {
            self.strength
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MalformedPrices,
    Filtered(FilterRejection),
    AppendFailed(String),
    ReadFailed(String),
    TimedOut,
    InsufficientData { points: usize },
    BelowThreshold { momentum: f64 },
    Unconfirmed { score: u8 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInstrument {
    pub instrument_id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub opportunities: Vec<MomentumOpportunity>,
    pub skipped: Vec<SkippedInstrument>,
}

pub struct MomentumScanner<'a> {
    history: &'a dyn PriceHistoryPort,
    settings: ScanSettings,
    macd: MacdTracker,
}

impl<'a> MomentumScanner<'a> {
    pub fn new(history: &'a dyn PriceHistoryPort, settings: ScanSettings) -> Self {
        Self {
            history,
            settings,
            macd: MacdTracker::new(),
        }
    }


    /// Fetch candidates from `provider` and scan them. A provider failure
    /// yields an empty report.
    pub fn scan_from(&self, provider: &dyn SnapshotPort, now: DateTime<Utc>) -> ScanReport {
        match provider.fetch_snapshots() {
            Ok(snapshots) => self.scan(&snapshots, now),
            Err(e) => {
                warn!(error = %e, "snapshot fetch failed, skipping scan cycle");
                ScanReport::default()
            }
        }
    }

    pub fn scan(&self, snapshots: &[InstrumentSnapshot], now: DateTime<Utc>) -> ScanReport {
        let results: Vec<(String, Result<MomentumOpportunity, SkipReason>)> = snapshots
            .par_iter()
            .map(|snapshot| (snapshot.id.clone(), self.evaluate(snapshot, now)))
            .collect();

        let mut report = ScanReport::default();
        for (instrument_id, result) in results {
            match result {
                Ok(opportunity) => report.opportunities.push(opportunity),
                Err(reason) => {
                    debug!(instrument = %instrument_id, ?reason, "instrument skipped");
                    report.skipped.push(SkippedInstrument {
                        instrument_id,
                        reason,
                    });
                }
            }
        }
        rank_opportunities(&mut report.opportunities);
        self.macd
            .retain_instruments(snapshots.iter().map(|s| s.id.as_str()));

        info!(
            candidates = snapshots.len(),
            opportunities = report.opportunities.len(),
            skipped = report.skipped.len(),
            tracked = self.macd.tracked_instruments(),
            "scan cycle complete"
        );
        report
    }

    fn evaluate(
        &self,
        snapshot: &InstrumentSnapshot,
        now: DateTime<Utc>,
    ) -> Result<MomentumOpportunity, SkipReason> {
        let prices = snapshot
            .outcome_pair()
            .map_err(|_| SkipReason::MalformedPrices)?;
        self.settings
            .filters
            .check(snapshot, &prices)
            .map_err(SkipReason::Filtered)?;

        self.history
            .append(&snapshot.id, prices.first, snapshot.volume, now)
            .map_err(|e| {
                warn!(instrument = %snapshot.id, error = %e, "failed to record tick");
                SkipReason::AppendFailed(e.to_string())
            })?;

        let window = self.read_window(&snapshot.id, now)?;
        if window.len() < 2 {
            return Err(SkipReason::InsufficientData {
                points: window.len(),
            });
        }

        let momentum = volume_weighted_momentum(&window);
        let macd = self.macd.reading(&snapshot.id, &window);
        let indicators = compute_with_macd(&window, macd);

        if momentum.abs() < self.settings.min_momentum_percent {
            return Err(SkipReason::BelowThreshold { momentum });
        }
        if !indicators.confirmed {
            return Err(SkipReason::Unconfirmed {
                score: indicators.confirmation_score,
            });
        }

        let direction = if momentum > 0.0 {
            Direction::Bullish
        } else {
            Direction::Bearish
        };

        Ok(MomentumOpportunity {
            id: uuid::Uuid::new_v4().to_string(),
            instrument_id: snapshot.id.clone(),
            market: summarize(snapshot, prices.spread(), &window),
            direction,
            strength: momentum.abs(),
            timestamp: now,
            trend_confirmed: indicators.confirmed,
            volume_trend: indicators.volume_trend,
            indicators,
        })
    }

    /// Missing or late data means no opportunity.
    fn read_window(
        &self,
        instrument_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<PriceHistoryPoint>, SkipReason> {
        let started = Instant::now();
        let result = self
            .history
            .read_window(instrument_id, self.settings.window_minutes, now);

        match result {
            Err(e) if e.is_timeout() => {
                warn!(instrument = %instrument_id, error = %e, "price window read timed out");
                Err(SkipReason::TimedOut)
            }
            Err(e) => {
                warn!(instrument = %instrument_id, error = %e, "failed to read price window");
                Err(SkipReason::ReadFailed(e.to_string()))
            }
            Ok(_) if exceeded(started, self.settings.fetch_timeout) => {
                warn!(instrument = %instrument_id, "price window read exceeded timeout");
                Err(SkipReason::TimedOut)
            }
            Ok(window) => Ok(window),
        }
    }
}

pub(crate) fn exceeded(started: Instant, timeout: Option<Duration>) -> bool {
    timeout.is_some_and(|limit| started.elapsed() > limit)
}

fn summarize(
    snapshot: &InstrumentSnapshot,
    spread: f64,
    window: &[PriceHistoryPoint],
) -> MarketSummary {
    let first = window.first().map(|p| p.price).unwrap_or(0.0);
    let last = window.last().map(|p| p.price).unwrap_or(0.0);
    let price_change = last - first;
    let price_change_percent = if first != 0.0 {
        price_change / first * 100.0
    } else {
        0.0
    };
    let minutes = span_minutes(window);
    let velocity = if minutes > 0.0 {
        price_change / minutes
    } else {
        0.0
    };

    MarketSummary {
        price: last,
        price_change,
        price_change_percent,
        velocity,
        volume: snapshot.volume,
        spread,
        category: snapshot.category.clone(),
    }
}

/// Order opportunities by rank weight, comparing `weight(b)` against
/// `weight(a)`. The sort is stable, so equal weights keep scan order.
pub fn rank_opportunities(opportunities: &mut [MomentumOpportunity]) {
    opportunities.sort_by(|a, b| {
        b.rank_weight()
            .partial_cmp(&a.rank_weight())
            .unwrap_or(Ordering::Equal)
    });
}
