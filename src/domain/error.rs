//! Domain error types.

/// Top-level error type for trendscan.
#[derive(Debug, thiserror::Error)]
pub enum TrendscanError {
    #[error("price history store error for {instrument}: {reason}")]
    HistoryStore { instrument: String, reason: String },

    #[error("snapshot provider error: {reason}")]
    Snapshot { reason: String },

    #[error("fetch for {instrument} exceeded {timeout_ms}ms")]
    Timeout { instrument: String, timeout_ms: u64 },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("malformed outcome prices for {instrument}: {raw}")]
    MalformedPrices { instrument: String, raw: String },

    #[error("CSV error in {file}: {reason}")]
    Csv { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrendscanError {
    /// True for errors caused by a slow upstream rather than a broken one.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TrendscanError::Timeout { .. })
    }
}

impl From<&TrendscanError> for std::process::ExitCode {
    fn from(err: &TrendscanError) -> Self {
        let code: u8 = match err {
            TrendscanError::Io(_) => 1,
            TrendscanError::ConfigParse { .. }
            | TrendscanError::ConfigMissing { .. }
            | TrendscanError::ConfigInvalid { .. } => 2,
            TrendscanError::HistoryStore { .. }
            | TrendscanError::Snapshot { .. }
            | TrendscanError::Timeout { .. }
            | TrendscanError::Csv { .. } => 3,
            TrendscanError::MalformedPrices { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
