use std::path::Path;

use unicode_normalization::UnicodeNormalization;

use crate::error::{DispatchError, Result};

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate that an input spreadsheet was supplied and exists
    pub fn validate_input_file(label: &str, path: Option<&Path>) -> Result<()> {
        let Some(path) = path else {
            return Err(DispatchError::MissingInput(format!("{label} file not provided")));
        };

        if path.as_os_str().is_empty() {
            return Err(DispatchError::MissingInput(format!("{label} file path is empty")));
        }

        if !path.is_file() {
            return Err(DispatchError::MissingInput(format!(
                "{label} file does not exist: {}",
                path.display()
            )));
        }

        Ok(())
    }

    /// Validate the operator's grouping column selection against the allowed options
    pub fn validate_split_columns(selected: &[String], allowed: &[String]) -> Result<()> {
        if selected.is_empty() {
            return Err(DispatchError::NoColumnsSelected);
        }

        if let Some(column) = selected.iter().find(|c| !allowed.contains(c)) {
            return Err(DispatchError::ColumnNotAllowed {
                column: column.clone(),
                allowed: allowed.to_vec(),
            });
        }

        Ok(())
    }

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<()> {
        let invalid = |reason: &str| DispatchError::InvalidAddress {
            address: email.to_string(),
            reason: reason.to_string(),
        };

        let email = email.trim();
        if email.is_empty() {
            return Err(invalid("address is empty"));
        }

        if email.len() > 254 {
            return Err(invalid("too long (max 254 characters)"));
        }

        let Some((local_part, domain_part)) = email.split_once('@') else {
            return Err(invalid("must contain @ symbol"));
        };

        if domain_part.contains('@') {
            return Err(invalid("must have exactly one @ symbol"));
        }

        if local_part.is_empty() || local_part.len() > 64 {
            return Err(invalid("local part invalid"));
        }

        if domain_part.is_empty() || !domain_part.contains('.') {
            return Err(invalid("domain invalid"));
        }

        if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("contains whitespace or control characters"));
        }

        Ok(())
    }

    /// Validate a bare file or folder name used inside the output tree
    pub fn validate_plain_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(DispatchError::InvalidConfig("name cannot be empty".to_string()));
        }

        if name.contains('/') || name.contains('\\') || name == "." || name == ".." || name.contains('\0') {
            return Err(DispatchError::InvalidConfig(format!(
                "'{name}' must be a plain name without path separators"
            )));
        }

        Ok(())
    }

    /// Turn a group value into a file stem.
    ///
    /// Keeps alphanumerics, spaces, periods and underscores, then trims surrounding whitespace.
    #[must_use]
    pub fn sanitize_file_stem(value: &str) -> String {
        value
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_'))
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Normalize a name or role for matching: NFC, trimmed, lowercase
    #[must_use]
    pub fn normalize_key(text: &str) -> String {
        text.nfc().collect::<String>().trim().to_lowercase()
    }
}
