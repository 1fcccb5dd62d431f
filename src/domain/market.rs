//! Instrument snapshots and market filters.
//!
//! Instruments are two-outcome markets whose snapshot carries the outcome
//! price pair as a JSON array (`["0.62","0.38"]` or `[0.62, 0.38]`). The
//! first outcome's price is the tracked price.

use serde::{Deserialize, Serialize};

use crate::domain::error::TrendscanError;

/// Volume below which a market's price is not considered reliable.
pub const MIN_RELIABLE_VOLUME: f64 = 1000.0;

/// Category value that disables category filtering.
pub const ALL_CATEGORIES: &str = "all";

/// Per-cycle instrument snapshot from the snapshot provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    pub id: String,
    pub outcome_prices: String,
    pub volume: f64,
    pub liquidity: f64,
    pub question: String,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomePrices {
    pub first: f64,
    pub second: f64,
}

impl OutcomePrices {
    /// Distance of the pair from summing to one.
    pub fn spread(&self) -> f64 {
        (self.first + self.second - 1.0).abs()
    }
}

impl InstrumentSnapshot {
    pub fn outcome_pair(&self) -> Result<OutcomePrices, TrendscanError> {
        parse_outcome_prices(&self.outcome_prices).ok_or_else(|| {
            TrendscanError::MalformedPrices {
                instrument: self.id.clone(),
                raw: self.outcome_prices.clone(),
            }
        })
    }

    /// Category text used for matching; the question stands in when the
    /// provider sends no category.
    pub fn category_text(&self) -> &str {
        if self.category.trim().is_empty() {
            &self.question
        } else {
            &self.category
        }
    }
}

fn parse_outcome_prices(raw: &str) -> Option<OutcomePrices> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    let items = value.as_array()?;
    if items.len() != 2 {
        return None;
    }

    let as_price = |v: &serde_json::Value| -> Option<f64> {
        let price = match v {
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
            serde_json::Value::Number(n) => n.as_f64()?,
            _ => return None,
        };
        price.is_finite().then_some(price)
    };

    Some(OutcomePrices {
        first: as_price(&items[0])?,
        second: as_price(&items[1])?,
    })
}

/// Optional market filters applied before any history is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketFilters {
    pub search_query: Option<String>,
    pub category: String,
    pub min_volume: f64,
    pub max_spread: Option<f64>,
    pub category_whitelist: Vec<String>,
}

impl Default for MarketFilters {
    fn default() -> Self {
        MarketFilters {
            search_query: None,
            category: ALL_CATEGORIES.to_string(),
            min_volume: MIN_RELIABLE_VOLUME,
            max_spread: None,
            category_whitelist: Vec::new(),
        }
    }
}

/// Why a snapshot was filtered out.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterRejection {
    LowVolume { volume: f64, minimum: f64 },
    WideSpread { spread: f64, maximum: f64 },
    Category,
    Search,
}

impl MarketFilters {
    pub fn check(
        &self,
        snapshot: &InstrumentSnapshot,
        prices: &OutcomePrices,
    ) -> Result<(), FilterRejection> {
        if snapshot.volume < self.min_volume {
            return Err(FilterRejection::LowVolume {
                volume: snapshot.volume,
                minimum: self.min_volume,
            });
        }

        if let Some(maximum) = self.max_spread {
            let spread = prices.spread();
            if spread > maximum {
                return Err(FilterRejection::WideSpread { spread, maximum });
            }
        }

        let category = snapshot.category_text().to_lowercase();
        if !is_wildcard(&self.category) && !category.contains(&self.category.to_lowercase()) {
            return Err(FilterRejection::Category);
        }
        let whitelisted = self.category_whitelist.is_empty()
            || self.category_whitelist.iter().any(|entry| {
                is_wildcard(entry) || category.contains(&entry.trim().to_lowercase())
            });
        if !whitelisted {
            return Err(FilterRejection::Category);
        }

        if let Some(query) = self.search_query.as_deref().filter(|q| !q.trim().is_empty()) {
            let query = query.trim().to_lowercase();
            if !snapshot.question.to_lowercase().contains(&query) {
                return Err(FilterRejection::Search);
            }
        }

        Ok(())
    }
}

fn is_wildcard(category: &str) -> bool {
    let trimmed = category.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_CATEGORIES)
}
