use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Invalid value: {source}")]
    InvalidNumber {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Missing host (set --host or provide it in config).")]
    MissingHost,
    #[error("`--run-time` requires `--users`; the staged shape has its own duration.")]
    RunTimeWithoutUsers,
    #[error("Weight table must contain at least one entry.")]
    WeightTableEmpty,
    #[error("Weight for '{name}' must be >= 1.")]
    WeightZero { name: String },
    #[error("Weight total overflowed.")]
    WeightOverflow,
    #[error("Think time min {min_ms}ms must be <= max {max_ms}ms.")]
    ThinkTimeInverted { min_ms: u64, max_ms: u64 },
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
