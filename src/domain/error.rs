//! Domain error types.

/// Top-level error type for equiscore.
#[derive(Debug, thiserror::Error)]
pub enum EquiscoreError {
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

    #[error("retrieval failed for {symbol}: {reason}")]
    Retrieval { symbol: String, reason: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("scoring failed for {symbol}: {reason}")]
    Computation { symbol: String, reason: String },

    #[error("an analysis pass is already running")]
    PassAlreadyRunning,

    #[error("no completed pass available (current phase: {phase})")]
    NotReady { phase: String },

    #[error("analysis pass failed: {reason}")]
    PassFailed { reason: String },

    #[error("timed out waiting for a completed pass")]
    Timeout,

    #[error("execution failed for {symbol}: {reason}")]
    Execution { symbol: String, reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EquiscoreError {
    /// True for failures that drop a single symbol from a pass without
    /// affecting the rest of it.
    pub fn is_symbol_local(&self) -> bool {
        matches!(
            self,
            EquiscoreError::Retrieval { .. }
                | EquiscoreError::InsufficientData { .. }
                | EquiscoreError::Computation { .. }
        )
    }
}

impl From<&EquiscoreError> for std::process::ExitCode {
    fn from(err: &EquiscoreError) -> Self {
        let code: u8 = match err {
            EquiscoreError::Io(_) | EquiscoreError::Report { .. } => 1,
            EquiscoreError::ConfigParse { .. }
            | EquiscoreError::ConfigMissing { .. }
            | EquiscoreError::ConfigInvalid { .. } => 2,
            EquiscoreError::Retrieval { .. } | EquiscoreError::InsufficientData { .. } => 3,
            EquiscoreError::Computation { .. } => 4,
            EquiscoreError::PassAlreadyRunning
            | EquiscoreError::NotReady { .. }
            | EquiscoreError::PassFailed { .. }
            | EquiscoreError::Timeout => 5,
            EquiscoreError::Execution { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
