//! Structured error types for the engine.
//!
//! Only total absence of usable data surfaces as an error. Field-level
//! coercion failures are absorbed by the sanitizer and reported as
//! [`ParseDegraded`](crate::data::sanitize::ParseDegraded) diagnostics.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// No usable input rows for the requested date. Fatal for that date's run only.
    #[error("no usable data for {}: {reason}", display_date(.date))]
    DataUnavailable {
        date: Option<NaiveDate>,
        reason: String,
    },

    /// Not a single valid file in the momentum lookback.
    #[error("momentum window for {} is empty ({found} valid files)", display_date(.target))]
    InsufficientWindow {
        target: Option<NaiveDate>,
        found: usize,
    },

    #[error("ingest failed: {0}")]
    Ingest(String),
}

impl EngineError {
    pub fn data_unavailable(date: Option<NaiveDate>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            date,
            reason: reason.into(),
        }
    }
}

fn display_date(date: &Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.to_string(),
        None => "unknown date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_unavailable_message_names_date() {
        let err = EngineError::data_unavailable(NaiveDate::from_ymd_opt(2024, 10, 1), "empty file");
        assert_eq!(err.to_string(), "no usable data for 2024-10-01: empty file");
    }

    #[test]
    fn insufficient_window_without_target() {
        let err = EngineError::InsufficientWindow {
            target: None,
            found: 0,
        };
        assert!(err.to_string().contains("unknown date"));
    }
}
