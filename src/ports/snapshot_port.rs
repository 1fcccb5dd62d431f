//! Instrument snapshot provider port trait.

use crate::domain::error::TrendscanError;
use crate::domain::market::InstrumentSnapshot;

pub trait SnapshotPort: Send + Sync {
    /// Candidate instruments for the current cycle.
    fn fetch_snapshots(&self) -> Result<Vec<InstrumentSnapshot>, TrendscanError>;
}
