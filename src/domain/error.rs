//! Top-level error type and process exit-code mapping.

/// Top-level error type for rpscreen.
#[derive(Debug, thiserror::Error)]
pub enum RpscreenError {
    #[error("cache read error for {code}: {reason}")]
    CacheRead { code: String, reason: String },

    #[error("malformed cache file {file}: {reason}")]
    CacheParse { file: String, reason: String },

    #[error("cache directory {dir} is missing or unreadable: {reason}")]
    CacheDir { dir: String, reason: String },

    #[error("no cached instruments found in {dir}")]
    CacheEmpty { dir: String },

    #[error("no instrument in the cache has usable history")]
    EmptyUniverse,

    #[error("instrument {code} not found in cache")]
    CodeNotFound { code: String },

    #[error("invalid instrument code {input:?}: expected six digits")]
    InvalidCode { input: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("worker pool error: {reason}")]
    WorkerPool { reason: String },

    #[error("report write error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RpscreenError> for std::process::ExitCode {
    fn from(err: &RpscreenError) -> Self {
        let code: u8 = match err {
            RpscreenError::Io(_)
            | RpscreenError::WorkerPool { .. }
            | RpscreenError::Report { .. } => 1,
            RpscreenError::ConfigParse { .. }
            | RpscreenError::ConfigInvalid { .. }
            | RpscreenError::InvalidCode { .. } => 2,
            RpscreenError::CacheDir { .. }
            | RpscreenError::CacheEmpty { .. }
            | RpscreenError::EmptyUniverse
            | RpscreenError::CacheRead { .. }
            | RpscreenError::CacheParse { .. } => 3,
            RpscreenError::CodeNotFound { .. } | RpscreenError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
