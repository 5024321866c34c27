use thiserror::Error;

/// A derived record failed its own invariant check before being written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{record} at height {height}: field `{field}` must not be empty")]
    EmptyField { record: &'static str, height: u64, field: &'static str },

    #[error("{record} at height {height}: field `{field}` must not be negative (got {value})")]
    NegativeAmount { record: &'static str, height: u64, field: &'static str, value: String },

    #[error("{record} {key}: accumulated uptime {uptime} exceeds uptime count {count}")]
    UptimeOverflow { record: &'static str, key: String, uptime: u64, count: u64 },
}
