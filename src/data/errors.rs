use thiserror::Error;

/// Typed error taxonomy for the analysis pipeline.
///
/// Which errors fail a ticker is decided by the stage that hit them:
/// price and indicator failures propagate to the ticker boundary, news
/// and narrative failures are absorbed with documented fallbacks.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Insufficient price data: {rows} rows, need at least {required}")]
    InsufficientData { rows: usize, required: usize },

    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("API error: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Malformed input: {field} - {message}")]
    MalformedInput { field: String, message: String },

    #[error("Timeout: operation took longer than {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Narrative generator unavailable: {0}")]
    NarrativeUnavailable(String),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Create a parse error with context
    pub fn parse_error<S: Into<String>>(message: S) -> Self {
        PipelineError::Parse {
            message: message.into(),
        }
    }

    /// Create a malformed-input error with field context
    pub fn malformed<S: Into<String>>(field: S, message: S) -> Self {
        PipelineError::MalformedInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an API error with status code
    pub fn api_error<S: Into<String>>(status_code: u16, message: S) -> Self {
        PipelineError::Api {
            status_code,
            message: message.into(),
        }
    }
}
