//! Configuration validation.
//!
//! Reads every tunable from a [`ConfigPort`], rejects out-of-range values and
//! builds the typed settings each cycle runs with. Missing keys fall back to
//! the documented defaults; present but unparsable values are errors.

use std::time::Duration;

use crate::domain::error::TrendscanError;
use crate::domain::exit::ExitSettings;
use crate::domain::market::{MarketFilters, ALL_CATEGORIES, MIN_RELIABLE_VOLUME};
use crate::domain::monitor::MonitorSettings;
use crate::domain::scanner::ScanSettings;
use crate::domain::sizing::SizingSettings;
use crate::ports::config_port::ConfigPort;

/// One hundred years.
const MAX_RETENTION_HOURS: f64 = 876_000.0;

/// Validate all sections without keeping the result.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TrendscanError> {
    build_scan_settings(config)?;
    build_exit_settings(config)?;
    build_sizing_settings(config)?;
    build_history_retention(config)?;
    Ok(())
}

pub fn build_scan_settings(config: &dyn ConfigPort) -> Result<ScanSettings, TrendscanError> {
    let min_momentum_percent = read_double(config, "scanner", "min_momentum_percent", 2.0)?;
    if min_momentum_percent < 0.0 {
        return Err(invalid(
            "scanner",
            "min_momentum_percent",
            "min_momentum_percent must be non-negative",
        ));
    }

    Ok(ScanSettings {
        min_momentum_percent,
        window_minutes: read_window_minutes(config)?,
        filters: build_market_filters(config)?,
        fetch_timeout: read_fetch_timeout(config)?,
    })
}

pub fn build_market_filters(config: &dyn ConfigPort) -> Result<MarketFilters, TrendscanError> {
    let min_volume = read_double(config, "filters", "min_volume", MIN_RELIABLE_VOLUME)?;
    if min_volume < 0.0 {
        return Err(invalid(
            "filters",
            "min_volume",
            "min_volume must be non-negative",
        ));
    }

    let max_spread = read_optional_double(config, "filters", "max_spread")?;
    if let Some(spread) = max_spread {
        if !(0.0..=1.0).contains(&spread) {
            return Err(invalid(
                "filters",
                "max_spread",
                "max_spread must be between 0 and 1",
            ));
        }
    }

    let search_query = non_blank(config.get_string("filters", "search_query"));
    let category = non_blank(config.get_string("filters", "category"))
        .unwrap_or_else(|| ALL_CATEGORIES.to_string());
    let category_whitelist = config
        .get_string("filters", "category_whitelist")
        .map(|list| {
            list.split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(MarketFilters {
        search_query,
        category,
        min_volume,
        max_spread,
        category_whitelist,
    })
}

pub fn build_exit_settings(config: &dyn ConfigPort) -> Result<ExitSettings, TrendscanError> {
    let defaults = ExitSettings::default();
    let profit_target_percent = read_positive(
        config,
        "exit",
        "profit_target_percent",
        defaults.profit_target_percent,
    )?;
    let stop_loss_percent = read_positive(
        config,
        "exit",
        "stop_loss_percent",
        defaults.stop_loss_percent,
    )?;
    let trailing_stop_percent = read_positive(
        config,
        "exit",
        "trailing_stop_percent",
        defaults.trailing_stop_percent,
    )?;
    let max_hold_time_hours = read_positive(
        config,
        "exit",
        "max_hold_time_hours",
        defaults.max_hold_time_hours,
    )?;
    let trailing_stop_enabled = read_bool(
        config,
        "exit",
        "trailing_stop_enabled",
        defaults.trailing_stop_enabled,
    )?;

    Ok(ExitSettings {
        profit_target_percent,
        stop_loss_percent,
        trailing_stop_enabled,
        trailing_stop_percent,
        max_hold_time_hours,
    })
}

pub fn build_monitor_settings(config: &dyn ConfigPort) -> Result<MonitorSettings, TrendscanError> {
    Ok(MonitorSettings {
        exit: build_exit_settings(config)?,
        window_minutes: read_window_minutes(config)?,
        fetch_timeout: read_fetch_timeout(config)?,
    })
}

pub fn build_sizing_settings(config: &dyn ConfigPort) -> Result<SizingSettings, TrendscanError> {
    let defaults = SizingSettings::default();
    Ok(SizingSettings {
        base_size: read_positive(config, "sizing", "base_size", defaults.base_size)?,
        total_capital: read_positive(config, "sizing", "total_capital", defaults.total_capital)?,
    })
}

/// `[history] retention_hours`: ticks older than this are dropped from the
/// store. Absent means keep everything.
pub fn build_history_retention(
    config: &dyn ConfigPort,
) -> Result<Option<chrono::Duration>, TrendscanError> {
    match read_optional_double(config, "history", "retention_hours")? {
        None => Ok(None),
        Some(hours) if hours > 0.0 && hours <= MAX_RETENTION_HOURS => {
            let millis = (hours * 3_600_000.0).round() as i64;
            chrono::Duration::try_milliseconds(millis)
                .map(Some)
                .ok_or_else(retention_out_of_range)
        }
        Some(_) => Err(retention_out_of_range()),
    }
}

fn retention_out_of_range() -> TrendscanError {
    invalid(
        "history",
        "retention_hours",
        &format!("retention_hours must be positive and at most {MAX_RETENTION_HOURS}"),
    )
}

fn read_window_minutes(config: &dyn ConfigPort) -> Result<u32, TrendscanError> {
    match non_blank(config.get_string("scanner", "window_minutes")) {
        None => Ok(60),
        Some(raw) => match raw.parse::<u32>() {
            Ok(minutes) if minutes >= 1 => Ok(minutes),
            _ => Err(invalid(
                "scanner",
                "window_minutes",
                "window_minutes must be a whole number of at least 1",
            )),
        },
    }
}

fn read_fetch_timeout(config: &dyn ConfigPort) -> Result<Option<Duration>, TrendscanError> {
    match non_blank(config.get_string("scanner", "fetch_timeout_ms")) {
        None => Ok(None),
        Some(raw) => match raw.parse::<u64>() {
            Ok(ms) if ms > 0 => Ok(Some(Duration::from_millis(ms))),
            _ => Err(invalid(
                "scanner",
                "fetch_timeout_ms",
                "fetch_timeout_ms must be a positive number of milliseconds",
            )),
        },
    }
}

fn read_positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TrendscanError> {
    let value = read_double(config, section, key, default)?;
    if value <= 0.0 {
        return Err(invalid(section, key, &format!("{} must be positive", key)));
    }
    Ok(value)
}

fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TrendscanError> {
    Ok(read_optional_double(config, section, key)?.unwrap_or(default))
}

fn read_optional_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, TrendscanError> {
    match non_blank(config.get_string(section, key)) {
        None => Ok(None),
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(invalid(section, key, &format!("{} must be a number", key))),
        },
    }
}

fn read_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, TrendscanError> {
    match non_blank(config.get_string(section, key)) {
        None => Ok(default),
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(invalid(section, key, &format!("{} must be true or false", key))),
        },
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid(section: &str, key: &str, reason: &str) -> TrendscanError {
    TrendscanError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = make_config("");
        let scan = build_scan_settings(&config).unwrap();
        assert_eq!(scan, ScanSettings::default());
        assert_eq!(build_exit_settings(&config).unwrap(), ExitSettings::default());
        assert_eq!(build_sizing_settings(&config).unwrap(), SizingSettings::default());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn full_config_is_read() {
        let config = make_config(
            r#"
[scanner]
min_momentum_percent = 3.5
window_minutes = 90
fetch_timeout_ms = 750

[filters]
search_query = election
category = politics
min_volume = 2500
max_spread = 0.05
category_whitelist = politics, crypto ,

[exit]
profit_target_percent = 15
stop_loss_percent = 8
trailing_stop_enabled = yes
trailing_stop_percent = 4
max_hold_time_hours = 12

[sizing]
base_size = 250
total_capital = 50000
"#,
        );
        let scan = build_scan_settings(&config).unwrap();
        assert_eq!(scan.min_momentum_percent, 3.5);
        assert_eq!(scan.window_minutes, 90);
        assert_eq!(scan.fetch_timeout, Some(Duration::from_millis(750)));
        assert_eq!(scan.filters.search_query.as_deref(), Some("election"));
        assert_eq!(scan.filters.category, "politics");
        assert_eq!(scan.filters.min_volume, 2500.0);
        assert_eq!(scan.filters.max_spread, Some(0.05));
        assert_eq!(scan.filters.category_whitelist, vec!["politics", "crypto"]);

        let exit = build_exit_settings(&config).unwrap();
        assert!(exit.trailing_stop_enabled);
        assert_eq!(exit.profit_target_percent, 15.0);
        assert_eq!(exit.max_hold_time_hours, 12.0);

        let monitor = build_monitor_settings(&config).unwrap();
        assert_eq!(monitor.window_minutes, 90);
        assert_eq!(monitor.exit, exit);

        let sizing = build_sizing_settings(&config).unwrap();
        assert_eq!(sizing.base_size, 250.0);
        assert_eq!(sizing.total_capital, 50_000.0);
    }

    #[test]
    fn negative_momentum_threshold_fails() {
        let config = make_config("[scanner]\nmin_momentum_percent = -1\n");
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, TrendscanError::ConfigInvalid { key, .. } if key == "min_momentum_percent")
        );
    }

    #[test]
    fn zero_window_fails() {
        let config = make_config("[scanner]\nwindow_minutes = 0\n");
        let err = build_scan_settings(&config).unwrap_err();
        assert!(matches!(err, TrendscanError::ConfigInvalid { key, .. } if key == "window_minutes"));
    }

    #[test]
    fn non_numeric_value_fails() {
        let config = make_config("[filters]\nmin_volume = lots\n");
        let err = build_market_filters(&config).unwrap_err();
        assert!(matches!(err, TrendscanError::ConfigInvalid { key, .. } if key == "min_volume"));
    }

    #[test]
    fn spread_out_of_range_fails() {
        let config = make_config("[filters]\nmax_spread = 1.5\n");
        let err = build_market_filters(&config).unwrap_err();
        assert!(matches!(err, TrendscanError::ConfigInvalid { key, .. } if key == "max_spread"));
    }

    #[test]
    fn blank_category_means_all() {
        let config = make_config("[filters]\ncategory =\n");
        assert_eq!(build_market_filters(&config).unwrap().category, ALL_CATEGORIES);
    }

    #[test]
    fn zero_profit_target_fails() {
        let config = make_config("[exit]\nprofit_target_percent = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, TrendscanError::ConfigInvalid { key, .. } if key == "profit_target_percent")
        );
    }

    #[test]
    fn bad_trailing_flag_fails() {
        let config = make_config("[exit]\ntrailing_stop_enabled = maybe\n");
        let err = build_exit_settings(&config).unwrap_err();
        assert!(
            matches!(err, TrendscanError::ConfigInvalid { key, .. } if key == "trailing_stop_enabled")
        );
    }

    #[test]
    fn zero_timeout_fails() {
        let config = make_config("[scanner]\nfetch_timeout_ms = 0\n");
        let err = build_monitor_settings(&config).unwrap_err();
        assert!(
            matches!(err, TrendscanError::ConfigInvalid { key, .. } if key == "fetch_timeout_ms")
        );
    }

    #[test]
    fn history_retention_is_optional() {
        assert_eq!(build_history_retention(&make_config("")).unwrap(), None);
        let config = make_config("[history]\nretention_hours = 1.5\n");
        assert_eq!(
            build_history_retention(&config).unwrap(),
            Some(chrono::Duration::minutes(90))
        );
        let config = make_config("[history]\nretention_hours = 0\n");
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn huge_retention_is_rejected() {
        for raw in ["1e12", "876001", "inf"] {
            let config = make_config(&format!("[history]\nretention_hours = {raw}\n"));
            let err = validate_config(&config).unwrap_err();
            assert!(
                matches!(err, TrendscanError::ConfigInvalid { ref key, .. } if key == "retention_hours"),
                "{raw}: {err:?}"
            );
        }
        let config = make_config("[history]\nretention_hours = 876000\n");
        assert!(build_history_retention(&config).unwrap().is_some());
    }

    #[test]
    fn negative_capital_fails() {
        let config = make_config("[sizing]\ntotal_capital = -10\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TrendscanError::ConfigInvalid { key, .. } if key == "total_capital"));
    }
}
