//! End-to-end run orchestration.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::dispatch::dispatch_files;
use crate::error::{DispatchError, Result};
use crate::export::{archive_folder, export_distribution};
use crate::loader::load_table;
use crate::logging::{log_notice, OperationTimer};
use crate::mailer::MailConnector;
use crate::metrics::RunMetrics;
use crate::models::{Artifact, DistributionList, Notice, SentFlag, Table};
use crate::partition::partition_records;
use crate::validation::InputValidator;

/// What the operator submitted for one run
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Records spreadsheet
    pub records: Option<PathBuf>,
    /// Distribution list spreadsheet
    pub distribution: Option<PathBuf>,
    /// Selected grouping columns
    pub split_by: Vec<String>,
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// When the run was submitted
    pub started_at: DateTime<Local>,
    /// When the last artifact was built
    pub finished_at: DateTime<Local>,
    /// Grouping columns used
    pub split_by: Vec<String>,
    /// Partition files written
    pub files_written: usize,
    /// Messages accepted by the transport
    pub mails_sent: usize,
    /// Messages that failed
    pub mails_failed: usize,
    /// Files with no matching recipient
    pub files_unmatched: usize,
    /// Distribution rows left `Not Sent`
    pub rows_not_sent: usize,
    /// Distribution rows flagged `Sent`
    pub rows_sent: usize,
    /// Distribution rows flagged `Failed`
    pub rows_failed: usize,
    /// Inline messages in the order they were raised
    pub notices: Vec<Notice>,
}

impl RunReport {
    /// Pretty-printed JSON for `run_report.json`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Downloads produced by a run
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Distribution list with the flag column
    pub distribution: Artifact,
    /// Zip of the partition tree
    pub archive: Artifact,
    /// Counts and notices for the run
    pub report: RunReport,
}

/// Runs the load, partition, send and export stages in order
pub struct DispatchService {
    config: AppConfig,
    metrics: RunMetrics,
}

impl DispatchService {
    /// Service for one configuration; metrics accumulate across runs
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            metrics: RunMetrics::default(),
        }
    }

    /// Process one request end to end.
    ///
    /// Operator-input problems return a warning error before any work starts. A mail
    /// connection failure aborts the run after partitioning and produces no artifacts.
    pub async fn run(&self, request: &RunRequest, connector: &dyn MailConnector) -> Result<RunOutput> {
        let started_at = Local::now();
        let result = self.run_stages(request, connector, started_at).await;
        self.metrics.record_run(match &result {
            Ok(_) => "completed",
            Err(e) if e.is_warning() => "rejected",
            Err(_) => "aborted",
        });
        result
    }

    async fn run_stages(&self, request: &RunRequest, connector: &dyn MailConnector, started_at: DateTime<Local>) -> Result<RunOutput> {
        InputValidator::validate_input_file("Input", request.records.as_deref())?;
        InputValidator::validate_input_file("Distribution list", request.distribution.as_deref())?;
        InputValidator::validate_split_columns(&request.split_by, &self.config.split.allowed_columns)?;
        let (Some(records_path), Some(distribution_path)) = (&request.records, &request.distribution) else {
            return Err(DispatchError::MissingInput("input files not provided".to_string()));
        };

        // Load
        let timer = OperationTimer::new("load");
        let records = load_input("Input", records_path)?;
        let distribution = load_input("Distribution list", distribution_path)?;
        let mut list = DistributionList::from_table(distribution, &self.config.distribution)?;
        info!(records = records.len(), recipients = list.len(), "Loaded input files");
        self.metrics.record_stage("load", timer.finish());

        // Working directory lives until the artifacts are built
        let workdir = tempfile::tempdir()?;
        let output_root = workdir.path().join(&self.config.split.output_folder);

        // Partition
        let timer = OperationTimer::new("partition");
        let partitioned = partition_records(&records, &request.split_by, &output_root, &self.metrics)?;
        partitioned.notices.iter().for_each(log_notice);
        info!(files = partitioned.files.len(), "Split records into files");
        self.metrics.record_stage("partition", timer.finish());

        // Send
        let timer = OperationTimer::new("send");
        let mailer = connector.connect().await.map_err(|e| match e {
            DispatchError::MailClientUnavailable(_) => e,
            other => DispatchError::MailClientUnavailable(other.to_string()),
        })?;
        let dispatched = dispatch_files(&partitioned.files, &mut list, mailer.as_ref(), &self.config.mail, &self.metrics).await;
        drop(mailer);
        dispatched.notices.iter().for_each(log_notice);
        if dispatched.unmatched > 0 {
            warn!(files = dispatched.unmatched, "Files without a matching recipient were not emailed");
        }
        self.metrics.record_stage("send", timer.finish());

        // Export
        let timer = OperationTimer::new("export");
        let distribution = export_distribution(&list, &self.config.export.distribution_file_name)?;
        let archive = archive_folder(&output_root, &self.config.export.archive_file_name)?;
        self.metrics.record_stage("export", timer.finish());

        let count = |flag: SentFlag| list.flags().iter().filter(|f| **f == flag).count();
        let mut notices = partitioned.notices;
        notices.extend(dispatched.notices);
        let report = RunReport {
            started_at,
            finished_at: Local::now(),
            split_by: request.split_by.clone(),
            files_written: partitioned.files.len(),
            mails_sent: dispatched.sent,
            mails_failed: dispatched.failed,
            files_unmatched: dispatched.unmatched,
            rows_not_sent: count(SentFlag::NotSent),
            rows_sent: count(SentFlag::Sent),
            rows_failed: count(SentFlag::Failed),
            notices,
        };

        Ok(RunOutput {
            distribution,
            archive,
            report,
        })
    }
}

/// Load one input table; a file that cannot be parsed is an operator problem, not a crash
fn load_input(label: &str, path: &Path) -> Result<Table> {
    load_table(path).map_err(|e| DispatchError::UnreadableInput {
        label: label.to_string(),
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
