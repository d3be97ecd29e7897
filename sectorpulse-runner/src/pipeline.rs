//! Daily pipeline: raw files → summaries → artifacts → ledgers.
//!
//! The sector summary and the momentum summary are independent stages. A
//! date without usable stock data fails the whole date; a momentum window
//! without usable files only skips the momentum stage.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use sectorpulse_core::data::{Requirement, SanitizeReport, Sanitizer};
use sectorpulse_core::digest::{build_digest, Digest};
use sectorpulse_core::engine::{aggregate_day, attach_ranks, rank_sectors, MomentumEngine};
use sectorpulse_core::ledger::{
    col, merge, momentum_table, sector_summary_table, LedgerSpec, LedgerStats, LedgerTable,
};
use sectorpulse_core::views::{
    momentum_flow_view, sector_ranking_view, MOMENTUM_FLOW_SHEET, SECTOR_RANKING_SHEET,
};
use sectorpulse_core::{EngineError, SectorVocabulary};

use crate::config::PipelineConfig;
use crate::discovery::{discover, find, trailing_window, RawFile};
use crate::error::RunError;
use crate::export::{
    artifacts_exist, hash_inputs, write_manifest, write_momentum_summary, write_sector_summary,
    MergeSummary, RunManifest, StageStatus, SCHEMA_VERSION,
};
use crate::loader::{load_day, load_index_feed, load_window};
use crate::store::{LedgerStore, MOMENTUM_LOG_SHEET, SECTOR_LOG_SHEET};

/// What one processed date produced.
#[derive(Debug, Clone, Serialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub sector: StageStatus,
    pub momentum: StageStatus,
    pub ledgers: Vec<MergeSummary>,
    pub sanitize: SanitizeReport,
    pub manifest: PathBuf,
}

#[derive(Debug, Default, Serialize)]
pub struct BackfillReport {
    pub processed: Vec<NaiveDate>,
    pub skipped: Vec<NaiveDate>,
    pub failed: Vec<(NaiveDate, String)>,
}

impl BackfillReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetStatus {
    pub sheet: String,
    pub stats: LedgerStats,
}

/// Which views were rewritten.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewsReport {
    pub sector_ranking_rows: Option<usize>,
    pub momentum_flow_rows: Option<usize>,
}

pub struct Pipeline<S: LedgerStore> {
    config: PipelineConfig,
    vocab: SectorVocabulary,
    store: S,
}

impl<S: LedgerStore> Pipeline<S> {
    pub fn new(config: PipelineConfig, store: S) -> Result<Self, RunError> {
        let vocab = config.load_vocabulary()?;
        Ok(Self {
            config,
            vocab,
            store,
        })
    }

    pub fn with_vocabulary(config: PipelineConfig, vocab: SectorVocabulary, store: S) -> Self {
        Self {
            config,
            vocab,
            store,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn stock_files(&self) -> Result<Vec<RawFile>, RunError> {
        let paths = &self.config.paths;
        let files = discover(&paths.raw_stock_dir, &paths.stock_prefix)?;
        if files.is_empty() {
            return Err(RunError::NoRawFiles {
                dir: paths.raw_stock_dir.clone(),
            });
        }
        Ok(files)
    }

    fn index_file(&self, date: NaiveDate) -> Result<Option<PathBuf>, RunError> {
        let paths = &self.config.paths;
        let files = discover(&paths.raw_index_dir, &paths.index_prefix)?;
        Ok(find(&files, date).map(|f| f.path.clone()))
    }

    fn merge_into(
        &mut self,
        sheet: &str,
        incoming: &LedgerTable,
        spec: &LedgerSpec,
    ) -> Result<MergeSummary, RunError> {
        let existing = self.store.read(sheet)?;
        let outcome = merge(&existing, incoming, spec)?;
        if outcome.added > 0 || outcome.drift.is_some() {
            self.store.write(sheet, &outcome.table)?;
        }
        info!(
            sheet,
            added = outcome.added,
            skipped = outcome.skipped,
            dropped = outcome.dropped,
            total = outcome.total,
            "ledger merged"
        );
        Ok(MergeSummary::from_outcome(sheet, &outcome))
    }

    /// Process one date (the latest raw file when `date` is `None`).
    pub fn run_day(&mut self, date: Option<NaiveDate>) -> Result<DayReport, RunError> {
        let files = self.stock_files()?;
        let target = match date {
            Some(d) => find(&files, d).cloned().ok_or(RunError::MissingDate { date: d })?,
            None => files[files.len() - 1].clone(),
        };
        let report = self.process(&files, &target)?;
        if self.config.run.refresh_views {
            self.refresh_views()?;
        }
        Ok(report)
    }

    fn process(&mut self, files: &[RawFile], target: &RawFile) -> Result<DayReport, RunError> {
        let date = target.date;
        info!(%date, file = %target.path.display(), "processing");
        let columns = self.config.columns.clone();
        let sanitizer = Sanitizer::new(&self.vocab, &columns);

        // ── Sector summary ──
        let day = load_day(target, &sanitizer, Requirement::Full)?;
        if day.date != date {
            warn!(file_date = %date, data_date = %day.date, "file name and data disagree on date");
        }
        let index_path = self.index_file(date)?;
        let feed = load_index_feed(index_path.as_deref(), &self.vocab, &self.config.index_columns);
        let aggregates = aggregate_day(day.date, &day.records, feed.as_ref());
        let ranks = rank_sectors(&aggregates, &self.vocab);
        let summary = attach_ranks(&aggregates, &ranks);

        let artifact = write_sector_summary(&self.config.paths, date, &summary)
            .map_err(|e| RunError::Artifact(format!("{e:#}")))?;
        let sector_spec = self.config.ledgers.sector_spec();
        let mut ledgers = vec![self.merge_into(
            SECTOR_LOG_SHEET,
            &sector_summary_table(&summary),
            &sector_spec,
        )?];
        let sector = StageStatus::Written {
            rows: summary.len(),
            artifact,
        };

        // ── Momentum ──
        let engine = MomentumEngine::new(self.config.momentum.lookback);
        let window = trailing_window(files, date, engine.lookback());
        let loaded = load_window(window, &self.vocab, &columns);
        let momentum = match engine.compute(&loaded.days) {
            Ok(rows) => {
                let artifact = write_momentum_summary(&self.config.paths, date, &rows)
                    .map_err(|e| RunError::Artifact(format!("{e:#}")))?;
                let spec = self.config.ledgers.momentum_spec();
                ledgers.push(self.merge_into(MOMENTUM_LOG_SHEET, &momentum_table(&rows), &spec)?);
                StageStatus::Written {
                    rows: rows.len(),
                    artifact,
                }
            }
            Err(EngineError::InsufficientWindow { found, .. }) => {
                let reason = format!(
                    "no usable files in a {}-file window ({found} loaded)",
                    window.len()
                );
                warn!(%date, %reason, "momentum skipped");
                StageStatus::Skipped { reason }
            }
            Err(e) => return Err(e.into()),
        };

        // ── Manifest ──
        let mut inputs = vec![target.path.clone()];
        inputs.extend(index_path);
        inputs.extend(
            window
                .iter()
                .filter(|f| f.date != date)
                .filter(|f| !loaded.failures.iter().any(|(bad, _)| bad == *f))
                .map(|f| f.path.clone()),
        );
        let input_hash = hash_inputs(&inputs).map_err(|e| RunError::Artifact(format!("{e:#}")))?;
        let manifest = RunManifest {
            schema_version: SCHEMA_VERSION,
            date,
            generated_at: Utc::now(),
            input_hash,
            inputs,
            sanitize: day.report.clone(),
            sector: sector.clone(),
            momentum: momentum.clone(),
            window_files: window.len(),
            window_failures: loaded.failures.iter().map(|(f, _)| f.path.clone()).collect(),
            ledgers: ledgers.clone(),
        };
        let manifest_path = write_manifest(&self.config.paths, &manifest)
            .map_err(|e| RunError::Artifact(format!("{e:#}")))?;

        info!(%date, sector_rows = summary.len(), "date processed");
        Ok(DayReport {
            date,
            sector,
            momentum,
            ledgers,
            sanitize: day.report,
            manifest: manifest_path,
        })
    }

    /// Process every raw date in `[from, to]`, oldest first.
    ///
    /// Dates whose artifacts already exist are skipped unless `force`.
    /// Failures are collected; with `continue_on_error` off the first one
    /// stops the batch.
    pub fn backfill(
        &mut self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        force: bool,
    ) -> Result<BackfillReport, RunError> {
        let files = self.stock_files()?;
        let mut report = BackfillReport::default();
        self.backfill_inner(&files, from, to, force, &mut report)?;

        if self.config.run.refresh_views && !report.processed.is_empty() {
            self.refresh_views()?;
        }
        info!(
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "backfill finished"
        );
        Ok(report)
    }

    fn backfill_inner(
        &mut self,
        files: &[RawFile],
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        force: bool,
        report: &mut BackfillReport,
    ) -> Result<(), RunError> {
        let in_range = |d: NaiveDate| from.map_or(true, |f| d >= f) && to.map_or(true, |t| d <= t);
        for file in files.iter().filter(|f| in_range(f.date)) {
            if !force && artifacts_exist(&self.config.paths, file.date) {
                report.skipped.push(file.date);
                continue;
            }
            match self.process(files, file) {
                Ok(_) => report.processed.push(file.date),
                Err(e) if e.is_date_local() && self.config.run.continue_on_error => {
                    warn!(date = %file.date, error = %e, "date failed, continuing");
                    report.failed.push((file.date, e.to_string()));
                }
                Err(e) => {
                    report.failed.push((file.date, e.to_string()));
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Rewrite the `sector_ranking` and `momentum_flow` sheets from the ledgers.
    pub fn refresh_views(&mut self) -> Result<ViewsReport, RunError> {
        let mut report = ViewsReport::default();

        let sector_log = self.store.read(SECTOR_LOG_SHEET)?;
        match sector_ranking_view(&sector_log, &self.vocab) {
            Some(grid) => {
                report.sector_ranking_rows = Some(grid.rows.len());
                self.store.write(SECTOR_RANKING_SHEET, &grid.into_table())?;
            }
            None => warn!(sheet = SECTOR_LOG_SHEET, "ledger empty, view not refreshed"),
        }

        let momentum_log = self.store.read(MOMENTUM_LOG_SHEET)?;
        match momentum_flow_view(&momentum_log, &self.vocab) {
            Some(grid) => {
                report.momentum_flow_rows = Some(grid.rows.len());
                self.store.write(MOMENTUM_FLOW_SHEET, &grid.into_table())?;
            }
            None => warn!(sheet = MOMENTUM_LOG_SHEET, "ledger empty, view not refreshed"),
        }
        Ok(report)
    }

    /// Digest of the latest ledger date, `None` when the sector ledger is empty.
    pub fn digest(&self) -> Result<Option<Digest>, RunError> {
        let sector_log = self.store.read(SECTOR_LOG_SHEET)?;
        let momentum_log = self.store.read(MOMENTUM_LOG_SHEET)?;
        Ok(build_digest(
            &sector_log,
            &momentum_log,
            &self.vocab,
            self.config.run.digest_top_n,
        ))
    }

    pub fn ledger_status(&self) -> Result<Vec<SheetStatus>, RunError> {
        [SECTOR_LOG_SHEET, MOMENTUM_LOG_SHEET]
            .into_iter()
            .map(|sheet| -> Result<SheetStatus, RunError> {
                Ok(SheetStatus {
                    sheet: sheet.to_string(),
                    stats: self.store.read(sheet)?.stats(col::DATE),
                })
            })
            .collect()
    }
}
