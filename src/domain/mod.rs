//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod exit;
pub mod indicator;
pub mod market;
pub mod momentum;
pub mod monitor;
pub mod position;
pub mod price_point;
pub mod reversal;
pub mod scanner;
pub mod sizing;
