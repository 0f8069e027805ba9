//! Layered application configuration.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DispatchError, Result};
use crate::models::DistributionColumns;
use crate::validation::InputValidator;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log level, format and file
    pub logging: LoggingConfig,
    /// Grouping options and output folder
    pub split: SplitConfig,
    /// Distribution list column names
    pub distribution: DistributionColumns,
    /// Mail transport and message templates
    pub mail: MailConfig,
    /// Download file names and run report
    pub export: ExportConfig,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter level: trace, debug, info, warn or error
    pub level: String,
    /// Daily-rotated JSON log file, if any
    pub file_path: Option<String>,
    /// Console format
    pub format: String, // "json" or "text"
}

/// Record splitting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Grouping columns the operator may pick from
    pub allowed_columns: Vec<String>,
    /// Root folder of the partition tree inside the run's working directory
    pub output_folder: String,
}

/// How the mail session is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransportKind {
    /// Relay through an SMTP server
    Smtp,
    /// Drop `.eml` files into a pickup directory for a local mail client
    Pickup,
}

/// What to do when several distribution rows match one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Mail the first match only; every match gets that outcome
    First,
    /// Mail every match separately; each gets its own outcome
    Each,
}

/// Mail session and message settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// SMTP relay or pickup directory
    pub transport: MailTransportKind,
    /// SMTP server host
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP login, if the server needs one
    pub smtp_username: Option<String>,
    /// SMTP password
    pub smtp_password: Option<String>,
    /// Upgrade the SMTP connection with STARTTLS
    pub starttls: bool,
    /// SMTP connect and command timeout
    pub timeout_secs: u64,
    /// Where the pickup transport drops `.eml` files
    pub pickup_directory: String,
    /// Sender address
    pub from_address: String,
    /// Sender display name, also used in templates
    pub sender_name: String,
    /// Placeholders: `{name}`, `{category}`, `{file_name}`, `{sender_name}`
    pub subject_template: String,
    /// Same placeholders as the subject
    pub body_template: String,
    /// Handling of several rows matching one file
    pub match_policy: MatchPolicy,
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Flagged distribution list file name
    pub distribution_file_name: String,
    /// Output archive file name
    pub archive_file_name: String,
    /// Also write `run_report.json`
    pub write_report: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            split: SplitConfig {
                allowed_columns: vec!["AM Team Member".to_string(), "AM Team Lead".to_string()],
                output_folder: "output_files".to_string(),
            },
            distribution: DistributionColumns::default(),
            mail: MailConfig {
                transport: MailTransportKind::Pickup,
                smtp_host: String::new(),
                smtp_port: 587,
                smtp_username: None,
                smtp_password: None,
                starttls: true,
                timeout_secs: 30,
                pickup_directory: "./outbox".to_string(),
                from_address: "reports@example.com".to_string(),
                sender_name: "Your Name".to_string(),
                subject_template: "Attached: {name} Data ({category})".to_string(),
                body_template: "Dear {name},\n\nPlease find the attached file.\n\nBest regards,\n{sender_name}"
                    .to_string(),
                match_policy: MatchPolicy::First,
            },
            export: ExportConfig {
                distribution_file_name: "Distribution_list_with_flags.xlsx".to_string(),
                archive_file_name: "output_files.zip".to_string(),
                write_report: true,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .map_err(|e| DispatchError::InvalidConfig(format!("Failed to build defaults: {e}")))?;

        let mut builder = Config::builder()
            // Start with default values
            .add_source(defaults)
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // Add environment variables with prefix
            .add_source(
                Environment::with_prefix("SHEET_DISPATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| DispatchError::InvalidConfig(format!("Failed to load configuration: {e}")))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| DispatchError::InvalidConfig(format!("Failed to deserialize configuration: {e}")))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(DispatchError::InvalidConfig(msg));

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return invalid(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                self.logging.level
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return invalid(format!(
                "Invalid log format: {}. Must be one of: {valid_formats:?}",
                self.logging.format
            ));
        }

        // Validate split config
        if self.split.allowed_columns.is_empty() {
            return invalid("allowed_columns must list at least one column".to_string());
        }
        if self.split.allowed_columns.iter().any(|c| c.trim().is_empty()) {
            return invalid("allowed_columns cannot contain empty names".to_string());
        }
        InputValidator::validate_plain_name(&self.split.output_folder)?;

        // Validate distribution columns
        let d = &self.distribution;
        for (field, value) in [
            ("name", &d.name),
            ("designation", &d.designation),
            ("email", &d.email),
            ("flag", &d.flag),
        ] {
            if value.trim().is_empty() {
                return invalid(format!("distribution.{field} column name cannot be empty"));
            }
        }

        // Validate mail config
        let mail = &self.mail;
        match mail.transport {
            MailTransportKind::Smtp => {
                if mail.smtp_host.trim().is_empty() {
                    return invalid("smtp_host is required for the smtp transport".to_string());
                }
                if mail.smtp_port == 0 {
                    return invalid("smtp_port must be greater than 0".to_string());
                }
            }
            MailTransportKind::Pickup => {
                if mail.pickup_directory.trim().is_empty() {
                    return invalid("pickup_directory is required for the pickup transport".to_string());
                }
            }
        }
        if mail.timeout_secs == 0 {
            return invalid("timeout_secs must be greater than 0".to_string());
        }
        InputValidator::validate_email(&mail.from_address)
            .map_err(|e| DispatchError::InvalidConfig(format!("from_address: {e}")))?;

        // Validate export config
        InputValidator::validate_plain_name(&self.export.distribution_file_name)?;
        InputValidator::validate_plain_name(&self.export.archive_file_name)?;

        Ok(())
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.split.output_folder, "output_files");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.mail.match_policy, MatchPolicy::First);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.mail.transport = MailTransportKind::Smtp;
        assert!(config.validate().is_err());
    }
}
