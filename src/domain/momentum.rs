//! Volume-weighted momentum over a price window.
//!
//! Each consecutive price change is weighted by the volume traded in that
//! interval (the volume reported on the interval's closing tick):
//!
//! momentum = Σ(Δp · v) / Σv / p₀ · 100
//!
//! A window with no traded volume falls back to the simple percent change
//! between its first and last prices.

use crate::domain::price_point::PriceHistoryPoint;

pub fn volume_weighted_momentum(points: &[PriceHistoryPoint]) -> f64 {
    let Some(first) = points.first() else {
        return 0.0;
    };
    if points.len() < 2 || first.price == 0.0 {
        return 0.0;
    }

    let mut weighted = 0.0;
    let mut total_volume = 0.0;
    for pair in points.windows(2) {
        let delta = pair[1].price - pair[0].price;
        weighted += delta * pair[1].volume;
        total_volume += pair[1].volume;
    }

    if total_volume == 0.0 {
        return percent_change(points);
    }
    weighted / total_volume / first.price * 100.0
}

/// Last versus first price of the window, as a percent.
pub fn percent_change(points: &[PriceHistoryPoint]) -> f64 {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if first.price != 0.0 => {
            (last.price - first.price) / first.price * 100.0
        }
        _ => 0.0,
    }
}
