use thiserror::Error;

/// Input validation errors raised before any network activity.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("threshold '{field}' is not a number: '{value}'")]
    UnparsableThreshold { field: &'static str, value: String },
    #[error("threshold '{field}' must be finite")]
    NonFiniteThreshold { field: &'static str },
    #[error("invalid timeframe '{value}', expected one of 4h, 1d, 1wk")]
    InvalidTimeframe { value: String },
    #[error("asset index {index} out of range for list of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("timestamp must be RFC3339 UTC: '{value}'")]
    InvalidTimestamp { value: String },
    #[error("candle high must be >= low")]
    InvalidCandleRange,
    #[error("candle open/close must be within high/low range")]
    InvalidCandleBounds,
    #[error("candle field '{field}' must be a finite non-negative number")]
    InvalidCandleValue { field: &'static str },
}
