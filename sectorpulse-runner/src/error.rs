use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use sectorpulse_core::ledger::LedgerError;
use sectorpulse_core::EngineError;

use crate::config::ConfigError;

/// Errors from a pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no raw stock files in {}", .dir.display())]
    NoRawFiles { dir: PathBuf },

    #[error("no raw stock file for {date}")]
    MissingDate { date: NaiveDate },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("artifact export failed: {0}")]
    Artifact(String),
}

impl RunError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Data problems that only affect the date being processed.
    pub fn is_date_local(&self) -> bool {
        matches!(
            self,
            RunError::Engine(_) | RunError::MissingDate { .. }
        )
    }
}
