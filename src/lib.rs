//! trendscan: momentum scanning and trend-following position monitoring.
//!
//! Hexagonal architecture: indicator, scanner and exit logic in [`domain`],
//! capability traits in [`ports`], concrete stores and loaders in
//! [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
