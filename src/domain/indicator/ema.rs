//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the SMA of the first n prices, then
//! EMA[i] = P[i]*k + EMA[i-1]*(1-k).
//! Series shorter than n fall back to the last price; an empty series yields 0.

pub fn calculate_ema(prices: &[f64], period: usize) -> f64 {
    let Some(&last) = prices.last() else {
        return 0.0;
    };
    if period == 0 || prices.len() < period {
        return last;
    }

    let k = smoothing(period);
    let mut ema = prices[..period].iter().sum::<f64>() / period as f64;
    for &price in &prices[period..] {
        ema = price * k + ema * (1.0 - k);
    }
    ema
}

fn smoothing(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// EMA maintained one price at a time.
///
/// After `n` pushes, [`IncrementalEma::value`] equals `calculate_ema` over
/// the same `n` prices, including the short-series fallback.
#[derive(Debug, Clone)]
pub struct IncrementalEma {
    period: usize,
    k: f64,
    count: usize,
    seed_sum: f64,
    ema: f64,
    last: f64,
}

impl IncrementalEma {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            k: smoothing(period),
            count: 0,
            seed_sum: 0.0,
            ema: 0.0,
            last: 0.0,
        }
    }

    pub fn push(&mut self, price: f64) {
        self.count += 1;
        self.last = price;
        if self.count < self.period {
            self.seed_sum += price;
        } else if self.count == self.period {
            self.seed_sum += price;
            self.ema = self.seed_sum / self.period as f64;
        } else {
            self.ema = price * self.k + self.ema * (1.0 - self.k);
        }
    }

    pub fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else if self.count < self.period {
            self.last
        } else {
            self.ema
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}
