use std::path::{Path, PathBuf};
use log::info;

use crate::checker::{self, ProfileStatusMap, ProgressUpdate};
use crate::config::CheckerConfig;
use crate::error::{CheckerError, Result};
use crate::exporter;
use crate::formatter::{self, DisplayResults};
use crate::input_loader::{self, ArtistUser, LoadedUsers};

/// Everything a finished batch hands back to the surface that started it.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: DisplayResults,
    pub csv_path: PathBuf,
    pub text_path: PathBuf,
    /// Artist/username pairs parsed in text mode.
    pub pairs: Vec<ArtistUser>,
    /// Row counters from the table loader in upload mode.
    pub load_stats: Option<LoadedUsers>,
}

/// Wires input parsing, checking, formatting and export into one batch run.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: CheckerConfig,
    log_path: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(config: CheckerConfig, log_path: Option<PathBuf>) -> Self {
        Orchestrator { config, log_path }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Text mode: artist lines followed by `@username` lines.
    pub async fn run_text<F>(&self, text: &str, on_progress: F) -> Result<BatchReport>
    where
        F: FnMut(&ProgressUpdate<'_>),
    {
        let pairs = input_loader::extract_pairs(text);
        info!("Parsed {} artist/username pairs from text input", pairs.len());
        for pair in &pairs {
            info!("  {} -> @{}", pair.artist, pair.username);
        }

        let usernames = input_loader::usernames(&pairs);
        let statuses = self.check(&usernames, on_progress).await?;
        let mut report = self.finish(&statuses)?;
        report.pairs = pairs;
        Ok(report)
    }

    /// Upload mode: a CSV or spreadsheet with an `ig user` column.
    pub async fn run_upload<F>(&self, file: Option<&Path>, on_progress: F) -> Result<BatchReport>
    where
        F: FnMut(&ProgressUpdate<'_>),
    {
        let file = file.ok_or(CheckerError::NoFileProvided)?;
        let loaded = input_loader::load_from_table(file)?;

        let statuses = self.check(&loaded.usernames, on_progress).await?;
        let mut report = self.finish(&statuses)?;
        report.load_stats = Some(loaded);
        Ok(report)
    }

    async fn check<F>(&self, usernames: &[String], on_progress: F) -> Result<ProfileStatusMap>
    where
        F: FnMut(&ProgressUpdate<'_>),
    {
        if usernames.is_empty() {
            info!("No usernames to check");
            return Ok(ProfileStatusMap::new());
        }
        checker::with_session(&self.config, usernames, on_progress).await
    }

    /// Formats and exports a finished status map.
    pub fn finish(&self, statuses: &ProfileStatusMap) -> Result<BatchReport> {
        let results = formatter::format_results(statuses);
        let csv_path = exporter::export_csv(statuses, &self.config.output_dir)?;
        let text_path = exporter::export_text(statuses, &self.config.output_dir)?;
        info!("Batch finished. {}", results.summary.replace('\n', ", "));

        Ok(BatchReport {
            results,
            csv_path,
            text_path,
            pairs: Vec::new(),
            load_stats: None,
        })
    }
}
