use thiserror::Error;

/// Failures reported by market data and fundamentals providers
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
