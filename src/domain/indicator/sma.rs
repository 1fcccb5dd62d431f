//! Simple Moving Average.
//!
//! SMA(n) = mean of the last n prices.
//! Series shorter than n (or n = 0) fall back to the last price; an empty
//! series yields 0.

pub fn calculate_sma(prices: &[f64], period: usize) -> f64 {
    let Some(&last) = prices.last() else {
        return 0.0;
    };
    if period == 0 || prices.len() < period {
        return last;
    }

    let window = &prices[prices.len() - period..];
    window.iter().sum::<f64>() / period as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_of_trailing_window() {
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((calculate_sma(&prices, 3) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sma_full_length() {
        let prices = [2.0, 4.0, 6.0];
        assert!((calculate_sma(&prices, 3) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sma_short_series_returns_last() {
        let prices = [0.4, 0.5, 0.55];
        assert_eq!(calculate_sma(&prices, 20), 0.55);
    }

    #[test]
    fn sma_period_zero_returns_last() {
        assert_eq!(calculate_sma(&[1.0, 7.0], 0), 7.0);
    }

    #[test]
    fn sma_empty_is_zero() {
        assert_eq!(calculate_sma(&[], 5), 0.0);
    }
}
