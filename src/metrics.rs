use metrics::{counter, histogram};
use std::time::Duration;

/// Metrics collection and management
#[derive(Debug, Clone, Copy)]
pub struct RunMetrics {
    // Partitioning metrics
    pub partition_files_written_total: &'static str,
    pub partition_files_failed_total: &'static str,
    pub partition_rows_written_total: &'static str,

    // Mail metrics
    pub mails_sent_total: &'static str,
    pub mails_failed_total: &'static str,
    pub files_unmatched_total: &'static str,

    // Stage metrics
    pub stage_duration: &'static str,
    pub runs_total: &'static str,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self {
            partition_files_written_total: "sheet_dispatch_partition_files_written_total",
            partition_files_failed_total: "sheet_dispatch_partition_files_failed_total",
            partition_rows_written_total: "sheet_dispatch_partition_rows_written_total",

            mails_sent_total: "sheet_dispatch_mails_sent_total",
            mails_failed_total: "sheet_dispatch_mails_failed_total",
            files_unmatched_total: "sheet_dispatch_files_unmatched_total",

            stage_duration: "sheet_dispatch_stage_duration_seconds",
            runs_total: "sheet_dispatch_runs_total",
        }
    }
}

impl RunMetrics {
    /// Record a partition file write
    pub fn record_partition_file(&self, column: &str, rows: usize, success: bool) {
        let column = column.to_string();
        if success {
            counter!(self.partition_files_written_total, "column" => column.clone()).increment(1);
            counter!(self.partition_rows_written_total, "column" => column).increment(rows as u64);
        } else {
            counter!(self.partition_files_failed_total, "column" => column).increment(1);
        }
    }

    /// Record one send attempt
    pub fn record_send(&self, category: &str, success: bool) {
        let name = if success { self.mails_sent_total } else { self.mails_failed_total };
        counter!(name, "category" => category.to_string()).increment(1);
    }

    /// Record a file that had no recipient
    pub fn record_unmatched(&self, category: &str) {
        counter!(self.files_unmatched_total, "category" => category.to_string()).increment(1);
    }

    /// Record how long a pipeline stage took
    pub fn record_stage(&self, stage: &'static str, duration: Duration) {
        histogram!(self.stage_duration, "stage" => stage).record(duration.as_secs_f64());
    }

    /// Record the end of a run
    pub fn record_run(&self, outcome: &'static str) {
        counter!(self.runs_total, "outcome" => outcome).increment(1);
    }
}
