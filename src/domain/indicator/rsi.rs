//! RSI (Relative Strength Index).
//!
//! Simple average gain / average loss over the trailing `period` price changes.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//! Fewer than period+1 prices: RSI = 50 (neutral).

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }

    let trailing = &prices[prices.len() - (period + 1)..];
    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in trailing.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
}
