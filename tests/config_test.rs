//! Unit tests for config.rs module

use sheet_dispatch::config::{AppConfig, MailTransportKind, MatchPolicy};
use std::io::Write;

#[test]
fn test_default_split_config() {
    let config = AppConfig::default();

    assert_eq!(config.split.allowed_columns, vec!["AM Team Member", "AM Team Lead"]);
    assert_eq!(config.split.output_folder, "output_files");
}

#[test]
fn test_default_distribution_columns() {
    let config = AppConfig::default();

    assert_eq!(config.distribution.name, "Name");
    assert_eq!(config.distribution.designation, "Designation");
    assert_eq!(config.distribution.email, "Email_ID");
    assert_eq!(config.distribution.flag, "Sent_Flag");
}

#[test]
fn test_default_mail_config() {
    let config = AppConfig::default();

    assert_eq!(config.mail.transport, MailTransportKind::Pickup);
    assert_eq!(config.mail.smtp_port, 587);
    assert_eq!(config.mail.subject_template, "Attached: {name} Data ({category})");
    assert_eq!(config.mail.match_policy, MatchPolicy::First);
}

#[test]
fn test_default_export_config() {
    let config = AppConfig::default();

    assert_eq!(config.export.distribution_file_name, "Distribution_list_with_flags.xlsx");
    assert_eq!(config.export.archive_file_name, "output_files.zip");
    assert!(config.export.write_report);
}

#[test]
fn test_config_validation_success() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_invalid_log_level() {
    let mut config = AppConfig::default();
    config.logging.level = "invalid".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_valid_log_formats() {
    for format in ["text", "json"] {
        let mut config = AppConfig::default();
        config.logging.format = format.to_string();
        assert!(config.validate().is_ok(), "Failed for format: {format}");
    }
}

#[test]
fn test_config_validation_empty_allowed_columns() {
    let mut config = AppConfig::default();
    config.split.allowed_columns.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_output_folder_with_separator() {
    let mut config = AppConfig::default();
    config.split.output_folder = "../escape".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_smtp_requires_host() {
    let mut config = AppConfig::default();
    config.mail.transport = MailTransportKind::Smtp;
    assert!(config.validate().is_err());

    config.mail.smtp_host = "smtp.example.com".to_string();
    assert!(config.validate().is_ok());

    config.mail.smtp_port = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_bad_from_address() {
    let mut config = AppConfig::default();
    config.mail.from_address = "reports".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_artifact_name_with_path() {
    let mut config = AppConfig::default();
    config.export.archive_file_name = "out/archive.zip".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_load_explicit_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dispatch.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[split]").unwrap();
    writeln!(file, "allowed_columns = [\"Region\"]").unwrap();
    writeln!(file, "[mail]").unwrap();
    writeln!(file, "match_policy = \"each\"").unwrap();
    writeln!(file, "sender_name = \"Ops Team\"").unwrap();
    drop(file);

    let config = AppConfig::load(Some(&path)).unwrap();

    assert_eq!(config.split.allowed_columns, vec!["Region"]);
    assert_eq!(config.mail.match_policy, MatchPolicy::Each);
    assert_eq!(config.mail.sender_name, "Ops Team");
    // untouched keys keep their defaults
    assert_eq!(config.split.output_folder, "output_files");
    assert_eq!(config.distribution.email, "Email_ID");
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(AppConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
}
