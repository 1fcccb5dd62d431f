//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(12) - EMA(26)
//! Signal Line = EMA(9) of the MACD line evaluated at every prefix length
//! from 26 up to the series length.
//!
//! [`calculate_macd`] recomputes every prefix from scratch (O(n²)) and is
//! kept as the reference. [`MacdState`] produces the same numbers in O(1)
//! per tick, and [`MacdTracker`] keeps one state per instrument across scan
//! cycles.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::domain::indicator::ema::{calculate_ema, IncrementalEma};
use crate::domain::price_point::PriceHistoryPoint;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

/// MACD line and its signal line at the end of a series.
///
/// With fewer than 26 prices there is no MACD history, and the signal equals
/// the line so neither side leads.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MacdReading {
    pub macd: f64,
    pub signal: f64,
}

pub fn calculate_macd(prices: &[f64]) -> MacdReading {
    let line = |series: &[f64]| {
        calculate_ema(series, DEFAULT_FAST) - calculate_ema(series, DEFAULT_SLOW)
    };

    let macd = line(prices);
    let history: Vec<f64> = (DEFAULT_SLOW..=prices.len())
        .map(|n| line(&prices[..n]))
        .collect();

    let signal = if history.is_empty() {
        macd
    } else {
        calculate_ema(&history, DEFAULT_SIGNAL)
    };

    MacdReading { macd, signal }
}

/// Running MACD over a price series fed one tick at a time.
#[derive(Debug, Clone)]
pub struct MacdState {
    fast: IncrementalEma,
    slow: IncrementalEma,
    signal: IncrementalEma,
    count: usize,
}

impl Default for MacdState {
    fn default() -> Self {
        Self::new()
    }
}

impl MacdState {
    pub fn new() -> Self {
        Self {
            fast: IncrementalEma::new(DEFAULT_FAST),
            slow: IncrementalEma::new(DEFAULT_SLOW),
            signal: IncrementalEma::new(DEFAULT_SIGNAL),
            count: 0,
        }
    }

    pub fn from_prices(prices: &[f64]) -> Self {
        let mut state = Self::new();
        for &price in prices {
            state.push(price);
        }
        state
    }

    pub fn push(&mut self, price: f64) {
        self.fast.push(price);
        self.slow.push(price);
        self.count += 1;
        if self.count >= DEFAULT_SLOW {
            self.signal.push(self.line());
        }
    }

    pub fn reading(&self) -> MacdReading {
        let macd = self.line();
        let signal = if self.signal.count() == 0 {
            macd
        } else {
            self.signal.value()
        };
        MacdReading { macd, signal }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn line(&self) -> f64 {
        self.fast.value() - self.slow.value()
    }
}

#[derive(Debug, Clone)]
struct TrackedSeries {
    state: MacdState,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
}

/// Per-instrument MACD states reused between cycles.
///
/// A cached state is extended only when the new window starts at the same
/// tick and still contains the last tick consumed; any other window is
/// replayed into a fresh state, so readings always match
/// [`calculate_macd`] over the window's prices.
#[derive(Debug, Default)]
pub struct MacdTracker {
    series: Mutex<HashMap<String, TrackedSeries>>,
}

impl MacdTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reading(&self, instrument_id: &str, window: &[PriceHistoryPoint]) -> MacdReading {
        let (Some(first), Some(last)) = (window.first(), window.last()) else {
            self.series.lock().remove(instrument_id);
            return MacdReading::default();
        };

        // Taken out of the map so parallel callers only contend on the lookup.
        let cached = self.series.lock().remove(instrument_id);
        let mut tracked = match cached {
            Some(t) if extends(&t, window) => t,
            _ => TrackedSeries {
                state: MacdState::new(),
                first: first.timestamp,
                last: first.timestamp,
            },
        };

        let consumed = tracked.state.len();
        for point in &window[consumed..] {
            tracked.state.push(point.price);
        }
        tracked.last = last.timestamp;

        let reading = tracked.state.reading();
        self.series.lock().insert(instrument_id.to_string(), tracked);
        reading
    }

    /// Drop state for every instrument not in `active`.
    pub fn retain_instruments<'a>(&self, active: impl IntoIterator<Item = &'a str>) {
        let active: HashSet<&str> = active.into_iter().collect();
        self.series
            .lock()
            .retain(|instrument_id, _| active.contains(instrument_id.as_str()));
    }

    pub fn tracked_instruments(&self) -> usize {
        self.series.lock().len()
    }
}

fn extends(tracked: &TrackedSeries, window: &[PriceHistoryPoint]) -> bool {
    let consumed = tracked.state.len();
    consumed > 0
        && consumed <= window.len()
        && window[0].timestamp == tracked.first
        && window[consumed - 1].timestamp == tracked.last
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn trending(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 0.40 + (i as f64 * 0.37).sin() * 0.05 + i as f64 * 0.002)
            .collect()
    }

    fn window(prices: &[f64]) -> Vec<PriceHistoryPoint> {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PriceHistoryPoint::new(base + Duration::minutes(i as i64), p, 1500.0))
            .collect()
    }

    #[test]
    fn macd_default_constants() {
        assert_eq!(DEFAULT_FAST, 12);
        assert_eq!(DEFAULT_SLOW, 26);
        assert_eq!(DEFAULT_SIGNAL, 9);
    }

    #[test]
    fn macd_line_is_ema_fast_minus_ema_slow() {
        let prices = trending(40);
        let reading = calculate_macd(&prices);
        let expected = calculate_ema(&prices, 12) - calculate_ema(&prices, 26);
        assert!((reading.macd - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn macd_short_series_signal_equals_line() {
        let prices = trending(20);
        let reading = calculate_macd(&prices);
        assert_eq!(reading.signal, reading.macd);
    }

    #[test]
    fn macd_empty_is_zero() {
        assert_eq!(calculate_macd(&[]), MacdReading::default());
    }

    #[test]
    fn macd_flat_series_is_zero() {
        let reading = calculate_macd(&[0.5; 40]);
        assert!(reading.macd.abs() < 1e-12);
        assert!(reading.signal.abs() < 1e-12);
    }

    #[test]
    fn macd_rising_series_line_above_zero() {
        let prices: Vec<f64> = (0..40).map(|i| 0.2 + i as f64 * 0.01).collect();
        assert!(calculate_macd(&prices).macd > 0.0);
    }

    #[test]
    fn state_matches_naive_at_every_prefix() {
        let prices = trending(60);
        let mut state = MacdState::new();
        for n in 1..=prices.len() {
            state.push(prices[n - 1]);
            assert_eq!(state.reading(), calculate_macd(&prices[..n]), "prefix {n}");
        }
    }

    #[test]
    fn tracker_extends_growing_window() {
        let prices = trending(50);
        let tracker = MacdTracker::new();

        let first = window(&prices[..30]);
        assert_eq!(tracker.reading("m1", &first), calculate_macd(&prices[..30]));

        let grown = window(&prices);
        assert_eq!(tracker.reading("m1", &grown), calculate_macd(&prices));
        assert_eq!(tracker.tracked_instruments(), 1);
    }

    #[test]
    fn tracker_rebuilds_when_window_slides() {
        let prices = trending(60);
        let tracker = MacdTracker::new();
        let all = window(&prices);

        tracker.reading("m1", &all[..40]);
        let slid = &all[10..55];
        assert_eq!(
            tracker.reading("m1", slid),
            calculate_macd(&prices[10..55])
        );
    }

    #[test]
    fn tracker_empty_window_forgets_instrument() {
        let tracker = MacdTracker::new();
        tracker.reading("m1", &window(&trending(30)));
        assert_eq!(tracker.reading("m1", &[]), MacdReading::default());
        assert_eq!(tracker.tracked_instruments(), 0);
    }

    #[test]
    fn tracker_keeps_instruments_apart() {
        let tracker = MacdTracker::new();
        let a = trending(35);
        let b: Vec<f64> = a.iter().map(|p| 1.0 - p).collect();
        assert_eq!(tracker.reading("a", &window(&a)), calculate_macd(&a));
        assert_eq!(tracker.reading("b", &window(&b)), calculate_macd(&b));
        assert_eq!(tracker.tracked_instruments(), 2);
    }

    #[test]
    fn tracker_drops_instruments_no_longer_scanned() {
        let tracker = MacdTracker::new();
        let prices = trending(30);
        for id in ["a", "b", "c"] {
            tracker.reading(id, &window(&prices));
        }

        tracker.retain_instruments(["b", "z"]);
        assert_eq!(tracker.tracked_instruments(), 1);

        // surviving state still extends correctly
        let grown = trending(40);
        assert_eq!(tracker.reading("b", &window(&grown)), calculate_macd(&grown));
    }
}
