//! Open position tracking.
//!
//! Positions are owned by the caller. Each monitoring cycle refreshes the
//! current price, net PnL and the high/low watermarks; everything else is
//! left untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fee charged per side of a trade, as a fraction of position size.
pub const FEE_RATE: f64 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

/// OPEN → CLOSING once an exit fires, CLOSING → CLOSED on execution ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionState {
    #[default]
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPosition {
    pub id: String,
    pub instrument_id: String,
    pub side: PositionSide,
    pub entry_price: f64,
    pub current_price: f64,
    pub position_size: f64,
    pub current_pnl: f64,
    pub pnl_percent: f64,
    pub highest_price: f64,
    pub lowest_price: f64,
    pub entry_time: DateTime<Utc>,
    #[serde(default)]
    pub state: PositionState,
}

impl TrendPosition {
    pub fn open(
        id: &str,
        instrument_id: &str,
        side: PositionSide,
        entry_price: f64,
        position_size: f64,
        entry_time: DateTime<Utc>,
    ) -> Self {
        TrendPosition {
            id: id.to_string(),
            instrument_id: instrument_id.to_string(),
            side,
            entry_price,
            current_price: entry_price,
            position_size,
            current_pnl: 0.0,
            pnl_percent: 0.0,
            highest_price: entry_price,
            lowest_price: entry_price,
            entry_time,
            state: PositionState::Open,
        }
    }

    /// PnL before fees at `price`.
    pub fn gross_pnl(&self, price: f64) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        let change = match self.side {
            PositionSide::Long => price - self.entry_price,
            PositionSide::Short => self.entry_price - price,
        };
        change / self.entry_price * self.position_size
    }

    /// Entry plus exit fees.
    pub fn round_trip_fees(&self) -> f64 {
        self.position_size * FEE_RATE * 2.0
    }

    /// Move the position to `price`, recomputing net PnL and watermarks.
    pub fn refresh(&mut self, price: f64) {
        self.current_price = price;
        self.current_pnl = self.gross_pnl(price) - self.round_trip_fees();
        self.pnl_percent = if self.position_size != 0.0 {
            self.current_pnl / self.position_size * 100.0
        } else {
            0.0
        };
        self.highest_price = self.highest_price.max(price);
        self.lowest_price = self.lowest_price.min(price);
    }

    pub fn mark_closing(&mut self) {
        if self.state == PositionState::Open {
            self.state = PositionState::Closing;
        }
    }

    /// Execution acknowledged the exit.
    pub fn mark_closed(&mut self) {
        if self.state == PositionState::Closing {
            self.state = PositionState::Closed;
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == PositionState::Open
    }
}
