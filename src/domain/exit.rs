//! Exit rule cascade.
//!
//! Rules are checked in a fixed order and the first match wins:
//! profit target, stop loss, trailing stop, time limit, then trend reversal.
//! The reversal check is only evaluated when none of the others fired.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::position::{PositionSide, TrendPosition};
use crate::domain::reversal::ReversalSignal;

/// Reversal confidence (percent) required to exit on a reversal.
pub const REVERSAL_CONFIDENCE_THRESHOLD: f64 = 75.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ExitSettings {
    pub profit_target_percent: f64,
    pub stop_loss_percent: f64,
    pub trailing_stop_enabled: bool,
    pub trailing_stop_percent: f64,
    pub max_hold_time_hours: f64,
}

impl Default for ExitSettings {
    fn default() -> Self {
        ExitSettings {
            profit_target_percent: 20.0,
            stop_loss_percent: 10.0,
            trailing_stop_enabled: false,
            trailing_stop_percent: 5.0,
            max_hold_time_hours: 24.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExitReason {
    ProfitTarget,
    StopLoss,
    TrailingStop,
    TimeLimit,
    TrendReversal { confidence: f64 },
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::ProfitTarget => write!(f, "profit_target"),
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::TrailingStop => write!(f, "trailing_stop"),
            ExitReason::TimeLimit => write!(f, "time_limit"),
            ExitReason::TrendReversal { confidence } => {
                write!(f, "trend_reversal({})", confidence)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitDecision {
    pub position_id: String,
    pub should_exit: bool,
    pub reason: Option<ExitReason>,
}

impl ExitDecision {
    pub fn hold(position_id: &str) -> Self {
        ExitDecision {
            position_id: position_id.to_string(),
            should_exit: false,
            reason: None,
        }
    }

    pub fn exit(position_id: &str, reason: ExitReason) -> Self {
        ExitDecision {
            position_id: position_id.to_string(),
            should_exit: true,
            reason: Some(reason),
        }
    }
}

/// Price-, PnL- and time-based rules, in cascade order.
pub fn check_exit_rules(
    position: &TrendPosition,
    settings: &ExitSettings,
    now: DateTime<Utc>,
) -> Option<ExitReason> {
    if position.pnl_percent >= settings.profit_target_percent {
        return Some(ExitReason::ProfitTarget);
    }
    if position.pnl_percent <= -settings.stop_loss_percent {
        return Some(ExitReason::StopLoss);
    }
    if settings.trailing_stop_enabled
        && trailing_drawdown_percent(position) >= settings.trailing_stop_percent
    {
        return Some(ExitReason::TrailingStop);
    }
    if held_hours(position, now) >= settings.max_hold_time_hours {
        return Some(ExitReason::TimeLimit);
    }
    None
}

/// Full cascade. `reversal` is only invoked when no other rule fired.
pub fn evaluate_exit<F>(
    position: &TrendPosition,
    settings: &ExitSettings,
    now: DateTime<Utc>,
    reversal: F,
) -> ExitDecision
where
    F: FnOnce() -> ReversalSignal,
{
    if let Some(reason) = check_exit_rules(position, settings, now) {
        return ExitDecision::exit(&position.id, reason);
    }

    let signal = reversal();
    if signal.reversed && signal.confidence >= REVERSAL_CONFIDENCE_THRESHOLD {
        return ExitDecision::exit(
            &position.id,
            ExitReason::TrendReversal {
                confidence: signal.confidence,
            },
        );
    }
    ExitDecision::hold(&position.id)
}

/// Retracement from the favourable watermark, as a percent of it.
pub fn trailing_drawdown_percent(position: &TrendPosition) -> f64 {
    match position.side {
        PositionSide::Long if position.highest_price > 0.0 => {
            (position.highest_price - position.current_price) / position.highest_price * 100.0
        }
        PositionSide::Short if position.lowest_price > 0.0 => {
            (position.current_price - position.lowest_price) / position.lowest_price * 100.0
        }
        _ => 0.0,
    }
}

fn held_hours(position: &TrendPosition, now: DateTime<Utc>) -> f64 {
    (now - position.entry_time).num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn entry_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap()
    }

    fn long_at(entry: f64, current: f64) -> TrendPosition {
        let mut pos = TrendPosition::open("p", "m", PositionSide::Long, entry, 100.0, entry_time());
        pos.refresh(current);
        pos
    }

    fn no_reversal() -> ReversalSignal {
        ReversalSignal::none()
    }

    fn soon() -> DateTime<Utc> {
        entry_time() + Duration::minutes(30)
    }

    #[test]
    fn profit_target_fires() {
        let pos = long_at(0.50, 0.62);
        let decision = evaluate_exit(&pos, &ExitSettings::default(), soon(), no_reversal);
        assert_eq!(decision, ExitDecision::exit("p", ExitReason::ProfitTarget));
    }

    #[test]
    fn stop_loss_fires() {
        let pos = long_at(0.50, 0.44);
        let decision = evaluate_exit(&pos, &ExitSettings::default(), soon(), no_reversal);
        assert_eq!(decision.reason, Some(ExitReason::StopLoss));
    }

    #[test]
    fn profit_target_precedes_stop_loss_on_inconsistent_input() {
        let mut pos = long_at(0.50, 0.50);
        pos.pnl_percent = 25.0;
        let settings = ExitSettings {
            profit_target_percent: 20.0,
            stop_loss_percent: -30.0,
            ..ExitSettings::default()
        };
        // Both thresholds met: 25 >= 20 and 25 <= 30.
        assert_eq!(
            check_exit_rules(&pos, &settings, soon()),
            Some(ExitReason::ProfitTarget)
        );
    }

    #[test]
    fn trailing_stop_long() {
        let mut pos = long_at(0.70, 0.80);
        pos.refresh(0.70);
        assert!((trailing_drawdown_percent(&pos) - 12.5).abs() < 1e-9);
        let settings = ExitSettings {
            trailing_stop_enabled: true,
            trailing_stop_percent: 10.0,
            ..ExitSettings::default()
        };
        assert_eq!(
            check_exit_rules(&pos, &settings, soon()),
            Some(ExitReason::TrailingStop)
        );
    }

    #[test]
    fn trailing_stop_short() {
        let mut pos =
            TrendPosition::open("s", "m", PositionSide::Short, 0.50, 100.0, entry_time());
        pos.refresh(0.40);
        pos.refresh(0.45);
        // (0.45 - 0.40) / 0.40 = 12.5%
        let settings = ExitSettings {
            profit_target_percent: 50.0,
            trailing_stop_enabled: true,
            trailing_stop_percent: 10.0,
            ..ExitSettings::default()
        };
        assert_eq!(
            check_exit_rules(&pos, &settings, soon()),
            Some(ExitReason::TrailingStop)
        );
    }

    #[test]
    fn trailing_stop_disabled_is_ignored() {
        let mut pos = long_at(0.70, 0.80);
        pos.refresh(0.70);
        assert_eq!(check_exit_rules(&pos, &ExitSettings::default(), soon()), None);
    }

    #[test]
    fn time_limit_fires_inside_pnl_band() {
        let pos = long_at(0.50, 0.52);
        let later = entry_time() + Duration::hours(24);
        let decision = evaluate_exit(&pos, &ExitSettings::default(), later, no_reversal);
        assert_eq!(decision.reason, Some(ExitReason::TimeLimit));
    }

    #[test]
    fn reversal_needs_confidence() {
        let pos = long_at(0.50, 0.51);
        let weak = || ReversalSignal {
            reversed: false,
            confidence: 50.0,
        };
        assert_eq!(
            evaluate_exit(&pos, &ExitSettings::default(), soon(), weak),
            ExitDecision::hold("p")
        );

        let strong = || ReversalSignal {
            reversed: true,
            confidence: 75.0,
        };
        assert_eq!(
            evaluate_exit(&pos, &ExitSettings::default(), soon(), strong).reason,
            Some(ExitReason::TrendReversal { confidence: 75.0 })
        );
    }

    #[test]
    fn reversal_not_consulted_when_rule_fires() {
        let pos = long_at(0.50, 0.62);
        let decision = evaluate_exit(&pos, &ExitSettings::default(), soon(), || {
            panic!("reversal detector should not run")
        });
        assert!(decision.should_exit);
    }

    #[test]
    fn reason_display() {
        assert_eq!(ExitReason::StopLoss.to_string(), "stop_loss");
        assert_eq!(
            ExitReason::TrendReversal { confidence: 100.0 }.to_string(),
            "trend_reversal(100)"
        );
    }

    #[test]
    fn reason_serializes_tagged() {
        let json = serde_json::to_string(&ExitReason::TrendReversal { confidence: 75.0 }).unwrap();
        assert_eq!(json, r#"{"type":"trend_reversal","confidence":75.0}"#);
        let json = serde_json::to_string(&ExitReason::TimeLimit).unwrap();
        assert_eq!(json, r#"{"type":"time_limit"}"#);
    }
}
