//! Position sizing from signal context.
//!
//! size = base_size × multiplier, where the multiplier starts at 1.0 and
//! moves with the trend reading:
//! - +0.3 confirmed trend
//! - +0.2 trend strength > 10%, else +0.1 if > 5%
//! - +0.1 volume increasing
//! - −0.2 RSI above 70 or below 30
//!
//! The multiplier is clamped to [0.5, 2.0] and the size is capped at 10% of
//! total capital.

use serde::{Deserialize, Serialize};

use crate::domain::indicator::{TrendIndicators, VolumeTrend};

pub const MIN_MULTIPLIER: f64 = 0.5;
pub const MAX_MULTIPLIER: f64 = 2.0;
/// Largest share of total capital a single position may take.
pub const MAX_CAPITAL_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct SizingSettings {
    pub base_size: f64,
    pub total_capital: f64,
}

impl Default for SizingSettings {
    fn default() -> Self {
        SizingSettings {
            base_size: 100.0,
            total_capital: 10_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSize {
    pub multiplier: f64,
    pub size: f64,
}

pub fn size_multiplier(indicators: &TrendIndicators) -> f64 {
    let mut multiplier: f64 = 1.0;

    if indicators.confirmed {
        multiplier += 0.3;
    }
    if indicators.trend_strength > 10.0 {
        multiplier += 0.2;
    } else if indicators.trend_strength > 5.0 {
        multiplier += 0.1;
    }
    if indicators.volume_trend == VolumeTrend::Increasing {
        multiplier += 0.1;
    }
    if indicators.rsi > 70.0 || indicators.rsi < 30.0 {
        multiplier -= 0.2;
    }

    multiplier.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER)
}

pub fn size_position(indicators: &TrendIndicators, settings: &SizingSettings) -> PositionSize {
    let multiplier = size_multiplier(indicators);
    let cap = MAX_CAPITAL_FRACTION * settings.total_capital;
    PositionSize {
        multiplier,
        size: (settings.base_size * multiplier).min(cap),
    }
}
