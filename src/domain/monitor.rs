//! Position monitoring cycle.
//!
//! Each open position is marked to the latest price in its instrument's
//! window and run through the exit cascade. When the window cannot be read,
//! times out, or is empty, the position keeps its last known price so a data
//! gap never produces an exit on its own.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::exit::{evaluate_exit, ExitDecision, ExitSettings};
use crate::domain::position::TrendPosition;
use crate::domain::price_point::PriceHistoryPoint;
use crate::domain::reversal::detect_reversal;
use crate::domain::scanner::exceeded;
use crate::ports::price_history_port::PriceHistoryPort;

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub exit: ExitSettings,
    pub window_minutes: u32,
    pub fetch_timeout: Option<Duration>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings {
            exit: ExitSettings::default(),
            window_minutes: 60,
            fetch_timeout: None,
        }
    }
}

pub struct PositionMonitor<'a> {
    history: &'a dyn PriceHistoryPort,
    settings: MonitorSettings,
}

impl<'a> PositionMonitor<'a> {
    pub fn new(history: &'a dyn PriceHistoryPort, settings: MonitorSettings) -> Self {
        Self { history, settings }
    }


    /// Evaluate every open position. Decisions come back in input order;
    /// positions that are already closing or closed are left alone.
    pub fn monitor(&self, positions: &mut [TrendPosition], now: DateTime<Utc>) -> Vec<ExitDecision> {
        let decisions: Vec<ExitDecision> = positions
            .par_iter_mut()
            .filter(|position| position.is_open())
            .map(|position| self.evaluate(position, now))
            .collect();

        let exits = decisions.iter().filter(|d| d.should_exit).count();
        info!(
            positions = decisions.len(),
            exits, "monitor cycle complete"
        );
        decisions
    }

    fn evaluate(&self, position: &mut TrendPosition, now: DateTime<Utc>) -> ExitDecision {
        let window = self.read_window(position, now);
        let price = window
            .last()
            .map(|p| p.price)
            .unwrap_or(position.current_price);
        position.refresh(price);

        let side = position.side;
        let decision = evaluate_exit(position, &self.settings.exit, now, || {
            detect_reversal(&window, side)
        });

        match &decision.reason {
            Some(reason) => {
                info!(
                    position = %position.id,
                    instrument = %position.instrument_id,
                    %reason,
                    pnl_percent = position.pnl_percent,
                    "exit triggered"
                );
                position.mark_closing();
            }
            None => debug!(
                position = %position.id,
                price,
                pnl_percent = position.pnl_percent,
                "holding"
            ),
        }
        decision
    }

    /// Failures and late reads degrade to an empty window, which keeps the
    /// last known price.
    fn read_window(&self, position: &TrendPosition, now: DateTime<Utc>) -> Vec<PriceHistoryPoint> {
        let started = Instant::now();
        let result =
            self.history
                .read_window(&position.instrument_id, self.settings.window_minutes, now);

        match result {
            Err(e) => {
                warn!(
                    position = %position.id,
                    instrument = %position.instrument_id,
                    error = %e,
                    "price read failed, keeping last known price"
                );
                Vec::new()
            }
            Ok(_) if exceeded(started, self.settings.fetch_timeout) => {
                warn!(
                    position = %position.id,
                    instrument = %position.instrument_id,
                    "price read exceeded timeout, keeping last known price"
                );
                Vec::new()
            }
            Ok(window) => window,
        }
    }
}
