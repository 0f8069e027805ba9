//! Matching partition files to recipients and sending them.

use tracing::debug;

use crate::config::{MailConfig, MatchPolicy};
use crate::mailer::{compose, Mailer};
use crate::metrics::RunMetrics;
use crate::models::{DistributionList, Notice, PartitionFile, SentFlag};

/// Counts and notices from the send loop
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Messages accepted by the transport
    pub sent: usize,
    /// Messages that failed
    pub failed: usize,
    /// Files with no matching recipient
    pub unmatched: usize,
    /// Inline success and error messages
    pub notices: Vec<Notice>,
}

/// Send every partition file to its matching distribution entries, updating their flags.
///
/// Files without a match are skipped silently. Send failures are recorded and the loop
/// continues; nothing is retried.
pub async fn dispatch_files(
    files: &[PartitionFile],
    list: &mut DistributionList,
    mailer: &dyn Mailer,
    config: &MailConfig,
    metrics: &RunMetrics,
) -> DispatchOutcome {
    let mut outcome = DispatchOutcome::default();

    for file in files {
        let key = file.match_key();
        let matches = list.find_matches(&key);
        if matches.is_empty() {
            debug!(category = %file.column, name = %file.stem, "No recipient for file");
            metrics.record_unmatched(&file.column);
            outcome.unmatched += 1;
            continue;
        }

        match config.match_policy {
            MatchPolicy::First => {
                send_one(file, &matches[..1], &matches, list, mailer, config, metrics, &mut outcome).await;
            }
            MatchPolicy::Each => {
                for index in &matches {
                    let row = std::slice::from_ref(index);
                    send_one(file, row, row, list, mailer, config, metrics, &mut outcome).await;
                }
            }
        }
    }

    outcome
}

/// Mail `file` to the address of `recipient[0]` and apply the result to every row in `flagged`
#[allow(clippy::too_many_arguments)]
async fn send_one(
    file: &PartitionFile,
    recipient: &[usize],
    flagged: &[usize],
    list: &mut DistributionList,
    mailer: &dyn Mailer,
    config: &MailConfig,
    metrics: &RunMetrics,
    outcome: &mut DispatchOutcome,
) {
    let Some(address) = recipient.first().and_then(|&i| list.entry(i)).map(|e| e.email.display()) else {
        return;
    };
    let mail = compose(config, &address, file);
    let file_name = file.file_name();
    debug!(to = %mail.to, file = %file_name, rows = file.rows, "Sending file");

    match mailer.send(&mail).await {
        Ok(()) => {
            list.set_flags(flagged, SentFlag::Sent);
            metrics.record_send(&file.column, true);
            outcome.sent += 1;
            outcome
                .notices
                .push(Notice::success(format!("Email sent to {} with {file_name}", mail.to)));
        }
        Err(e) => {
            list.set_flags(flagged, SentFlag::Failed);
            metrics.record_send(&file.column, false);
            outcome.failed += 1;
            outcome
                .notices
                .push(Notice::error(format!("Failed to send to {}: {e}", mail.to)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::DispatchError;
    use crate::mailer::MockMailer;
    use crate::models::{Cell, DistributionColumns, NoticeLevel, Table};
    use std::path::PathBuf;

    fn list(rows: &[(&str, &str, &str)]) -> DistributionList {
        let mut table = Table::new(vec!["Name".into(), "Designation".into(), "Email_ID".into()]);
        for (name, role, email) in rows {
            table.rows.push(vec![
                Cell::Text((*name).into()),
                Cell::Text((*role).into()),
                Cell::Text((*email).into()),
            ]);
        }
        DistributionList::from_table(table, &DistributionColumns::default()).unwrap()
    }

    fn file(column: &str, stem: &str) -> PartitionFile {
        PartitionFile {
            column: column.into(),
            value: stem.into(),
            stem: stem.into(),
            path: PathBuf::from(format!("/tmp/{stem}.xlsx")),
            rows: 1,
        }
    }

    #[tokio::test]
    async fn test_first_policy_mails_first_and_flags_all() {
        let mut list = list(&[
            ("Alice", "AM Team Member", "a@x.com"),
            ("alice ", " am team member", "a2@x.com"),
            ("Carol", "AM Team Member", "c@x.com"),
        ]);
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .withf(|m| m.to == "a@x.com" && m.attachment_name == "Alice.xlsx")
            .times(1)
            .returning(|_| Ok(()));

        let config = AppConfig::default().mail;
        let outcome = dispatch_files(
            &[file("AM Team Member", "Alice"), file("AM Team Member", "Bob")],
            &mut list,
            &mailer,
            &config,
            &RunMetrics::default(),
        )
        .await;

        assert_eq!(outcome.sent, 1);
        assert_eq!(outcome.unmatched, 1);
        assert_eq!(list.flags(), &[SentFlag::Sent, SentFlag::Sent, SentFlag::NotSent]);
        assert_eq!(outcome.notices.len(), 1);
        assert_eq!(outcome.notices[0].message, "Email sent to a@x.com with Alice.xlsx");
    }

    #[tokio::test]
    async fn test_each_policy_tracks_rows_separately() {
        let mut list = list(&[("Alice", "Lead", "a@x.com"), ("Alice", "Lead", "broken@x.com")]);
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(2).returning(|m| {
            if m.to.starts_with("broken") {
                Err(DispatchError::Mail("mailbox unavailable".into()))
            } else {
                Ok(())
            }
        });

        let mut config = AppConfig::default().mail;
        config.match_policy = MatchPolicy::Each;
        let outcome = dispatch_files(&[file("Lead", "Alice")], &mut list, &mailer, &config, &RunMetrics::default()).await;

        assert_eq!((outcome.sent, outcome.failed), (1, 1));
        assert_eq!(list.flags(), &[SentFlag::Sent, SentFlag::Failed]);
        assert_eq!(outcome.notices[1].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_failure_flags_all_matches_failed() {
        let mut list = list(&[("Alice", "Lead", "a@x.com"), ("ALICE", "lead", "b@x.com")]);
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .times(1)
            .returning(|_| Err(DispatchError::Mail("relay denied".into())));

        let config = AppConfig::default().mail;
        let outcome = dispatch_files(&[file("Lead", "Alice")], &mut list, &mailer, &config, &RunMetrics::default()).await;

        assert_eq!(outcome.failed, 1);
        assert_eq!(list.flags(), &[SentFlag::Failed, SentFlag::Failed]);
        assert!(outcome.notices[0].message.starts_with("Failed to send to a@x.com"));
    }
}
