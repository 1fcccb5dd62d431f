//! Trend reversal detection against a held position.
//!
//! Four opposing signals are counted relative to the position's side:
//! - momentum beyond ±2% against the position
//! - MACD on the wrong side of its signal line
//! - RSI below 40 (long) or above 60 (short)
//! - price on the wrong side of SMA20
//!
//! Three or more opposing signals mean the trend has reversed; confidence is
//! the share of signals opposing, in percent.

use serde::{Deserialize, Serialize};

use crate::domain::indicator::compute_trend_indicators;
use crate::domain::momentum::volume_weighted_momentum;
use crate::domain::position::PositionSide;
use crate::domain::price_point::PriceHistoryPoint;

pub const REVERSAL_MIN_POINTS: usize = 10;
pub const REVERSAL_SIGNAL_COUNT: u8 = 4;
const REVERSAL_THRESHOLD: u8 = 3;
const MOMENTUM_THRESHOLD: f64 = 2.0;
const RSI_LONG_FLOOR: f64 = 40.0;
const RSI_SHORT_CEILING: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReversalSignal {
    pub reversed: bool,
    pub confidence: f64,
}

impl ReversalSignal {
    pub fn none() -> Self {
        ReversalSignal {
            reversed: false,
            confidence: 0.0,
        }
    }

    pub fn from_score(score: u8) -> Self {
        ReversalSignal {
            reversed: score >= REVERSAL_THRESHOLD,
            confidence: f64::from(score) / f64::from(REVERSAL_SIGNAL_COUNT) * 100.0,
        }
    }
}

pub fn detect_reversal(points: &[PriceHistoryPoint], side: PositionSide) -> ReversalSignal {
    if points.len() < REVERSAL_MIN_POINTS {
        return ReversalSignal::none();
    }
    ReversalSignal::from_score(opposing_signals(points, side))
}

pub fn opposing_signals(points: &[PriceHistoryPoint], side: PositionSide) -> u8 {
    let Some(latest) = points.last() else {
        return 0;
    };
    let indicators = compute_trend_indicators(points);
    let momentum = volume_weighted_momentum(points);
    let price = latest.price;

    let checks = match side {
        PositionSide::Long => [
            momentum < -MOMENTUM_THRESHOLD,
            indicators.macd < indicators.macd_signal,
            indicators.rsi < RSI_LONG_FLOOR,
            price < indicators.sma20,
        ],
        PositionSide::Short => [
            momentum > MOMENTUM_THRESHOLD,
            indicators.macd > indicators.macd_signal,
            indicators.rsi > RSI_SHORT_CEILING,
            price > indicators.sma20,
        ],
    };
    checks.into_iter().filter(|&opposed| opposed).count() as u8
}
