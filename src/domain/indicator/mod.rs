//! Trend indicator engine.
//!
//! Pure functions over a window's price/volume series:
//! - `sma`, `ema`, `rsi`, `macd`: the individual indicators
//! - [`TrendIndicators`]: the combined reading used by the scanner, the
//!   position sizer and the reversal detector
//! - [`confirmation_score`]: count of agreeing trend signals gating entries

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use ema::calculate_ema;
pub use macd::{calculate_macd, MacdReading, MacdState, MacdTracker};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::price_point::{prices, PriceHistoryPoint};

/// Minimum score for a trend to count as confirmed.
pub const CONFIRMATION_THRESHOLD: u8 = 3;
pub const MAX_CONFIRMATION_SCORE: u8 = 4;

/// Points required before the volume trend is judged.
pub const VOLUME_TREND_MIN_POINTS: usize = 10;
const VOLUME_TREND_SPAN: usize = 5;
const VOLUME_TREND_CHANGE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl fmt::Display for VolumeTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeTrend::Increasing => write!(f, "increasing"),
            VolumeTrend::Decreasing => write!(f, "decreasing"),
            VolumeTrend::Stable => write!(f, "stable"),
        }
    }
}

/// Indicator snapshot for one window. Recomputed every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendIndicators {
    pub sma20: f64,
    pub sma50: f64,
    pub ema12: f64,
    pub ema26: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub volume_trend: VolumeTrend,
    /// |price - SMA20| / SMA20 as a percent.
    pub trend_strength: f64,
    pub confirmation_score: u8,
    pub confirmed: bool,
}

impl TrendIndicators {
    /// Neutral reading for windows with fewer than two points.
    pub fn neutral(latest_price: f64) -> Self {
        Self {
            sma20: latest_price,
            sma50: latest_price,
            ema12: latest_price,
            ema26: latest_price,
            rsi: 50.0,
            macd: 0.0,
            macd_signal: 0.0,
            volume_trend: VolumeTrend::Stable,
            trend_strength: 0.0,
            confirmation_score: 0,
            confirmed: false,
        }
    }
}

/// Compute indicators over a window, replaying MACD from the window itself.
pub fn compute_trend_indicators(points: &[PriceHistoryPoint]) -> TrendIndicators {
    let macd = MacdState::from_prices(&prices(points)).reading();
    compute_with_macd(points, macd)
}

/// Compute indicators over a window using an already-maintained MACD reading.
pub fn compute_with_macd(points: &[PriceHistoryPoint], macd: MacdReading) -> TrendIndicators {
    let latest = points.last().map(|p| p.price).unwrap_or(0.0);
    if points.len() < 2 {
        return TrendIndicators::neutral(latest);
    }

    let series = prices(points);
    let sma20 = calculate_sma(&series, 20);
    let mut indicators = TrendIndicators {
        sma20,
        sma50: calculate_sma(&series, 50),
        ema12: calculate_ema(&series, 12),
        ema26: calculate_ema(&series, 26),
        rsi: calculate_rsi(&series, rsi::DEFAULT_PERIOD),
        macd: macd.macd,
        macd_signal: macd.signal,
        volume_trend: volume_trend(points),
        trend_strength: trend_strength(latest, sma20),
        confirmation_score: 0,
        confirmed: false,
    };
    indicators.confirmation_score = confirmation_score(latest, &indicators);
    indicators.confirmed = indicators.confirmation_score >= CONFIRMATION_THRESHOLD;
    indicators
}

pub fn trend_strength(price: f64, sma20: f64) -> f64 {
    if sma20 == 0.0 {
        return 0.0;
    }
    (price - sma20).abs() / sma20 * 100.0
}

/// Compare mean volume of the last 5 points with the 5 before them.
pub fn volume_trend(points: &[PriceHistoryPoint]) -> VolumeTrend {
    if points.len() < VOLUME_TREND_MIN_POINTS {
        return VolumeTrend::Stable;
    }

    let n = points.len();
    let mean = |slice: &[PriceHistoryPoint]| {
        slice.iter().map(|p| p.volume).sum::<f64>() / slice.len() as f64
    };
    let recent = mean(&points[n - VOLUME_TREND_SPAN..]);
    let prior = mean(&points[n - 2 * VOLUME_TREND_SPAN..n - VOLUME_TREND_SPAN]);

    if prior == 0.0 {
        return if recent > 0.0 {
            VolumeTrend::Increasing
        } else {
            VolumeTrend::Stable
        };
    }

    let change = (recent - prior) / prior;
    if change > VOLUME_TREND_CHANGE {
        VolumeTrend::Increasing
    } else if change < -VOLUME_TREND_CHANGE {
        VolumeTrend::Decreasing
    } else {
        VolumeTrend::Stable
    }
}

/// Count agreeing trend signals, capped at [`MAX_CONFIRMATION_SCORE`]:
/// - +2 price, SMA20 and SMA50 strictly stacked the same way
/// - +1 MACD on the trend's side of its signal line
/// - +1 RSI on the trend's side of 50
/// - +1 volume increasing
///
/// The trend's side is price versus SMA20.
pub fn confirmation_score(price: f64, indicators: &TrendIndicators) -> u8 {
    let up = price > indicators.sma20;
    let down = price < indicators.sma20;
    let mut score = 0u8;

    if (up && indicators.sma20 > indicators.sma50) || (down && indicators.sma20 < indicators.sma50)
    {
        score += 2;
    }
    if (up && indicators.macd > indicators.macd_signal)
        || (down && indicators.macd < indicators.macd_signal)
    {
        score += 1;
    }
    if (up && indicators.rsi > 50.0) || (down && indicators.rsi < 50.0) {
        score += 1;
    }
    if indicators.volume_trend == VolumeTrend::Increasing {
        score += 1;
    }

    score.min(MAX_CONFIRMATION_SCORE)
}
