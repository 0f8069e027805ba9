//! Unit tests for validation.rs module

use proptest::prelude::*;
use sheet_dispatch::error::DispatchError;
use sheet_dispatch::validation::InputValidator;
use std::path::Path;

#[test]
fn test_sanitize_example_from_names() {
    assert_eq!(InputValidator::sanitize_file_stem("John/Doe Jr."), "JohnDoe Jr.");
}

#[test]
fn test_sanitize_keeps_unicode_letters() {
    assert_eq!(InputValidator::sanitize_file_stem("José García!"), "José García");
}

#[test]
fn test_sanitize_trims_after_filtering() {
    assert_eq!(InputValidator::sanitize_file_stem("* Alice *"), "Alice");
}

#[test]
fn test_sanitize_can_be_empty() {
    assert_eq!(InputValidator::sanitize_file_stem("/\\:*?"), "");
}

#[test]
fn test_normalize_key_ignores_case_and_padding() {
    assert_eq!(InputValidator::normalize_key(" Lead "), InputValidator::normalize_key("lead"));
    assert_eq!(InputValidator::normalize_key("AM Team Member"), "am team member");
}

#[test]
fn test_validate_email_valid() {
    assert!(InputValidator::validate_email("a@x.com").is_ok());
    assert!(InputValidator::validate_email(" user.name@example.co.uk ").is_ok());
}

#[test]
fn test_validate_email_invalid() {
    for bad in ["", "no-at-sign", "a@b@c.com", "@x.com", "a@localhost", "a b@x.com"] {
        assert!(InputValidator::validate_email(bad).is_err(), "accepted {bad:?}");
    }
}

#[test]
fn test_validate_input_file_missing() {
    let err = InputValidator::validate_input_file("Input", None).unwrap_err();
    assert!(err.is_warning());

    let err = InputValidator::validate_input_file("Input", Some(Path::new("/nonexistent/file.xlsx"))).unwrap_err();
    assert!(matches!(err, DispatchError::MissingInput(_)));
}

#[test]
fn test_validate_input_file_present() {
    let file = tempfile::NamedTempFile::new().unwrap();
    assert!(InputValidator::validate_input_file("Input", Some(file.path())).is_ok());
}

#[test]
fn test_validate_split_columns() {
    let allowed = vec!["AM Team Member".to_string(), "AM Team Lead".to_string()];

    assert!(matches!(
        InputValidator::validate_split_columns(&[], &allowed),
        Err(DispatchError::NoColumnsSelected)
    ));
    assert!(matches!(
        InputValidator::validate_split_columns(&["Region".to_string()], &allowed),
        Err(DispatchError::ColumnNotAllowed { .. })
    ));
    assert!(InputValidator::validate_split_columns(&allowed, &allowed).is_ok());
}

#[test]
fn test_validate_plain_name() {
    assert!(InputValidator::validate_plain_name("output_files").is_ok());
    assert!(InputValidator::validate_plain_name("a/b").is_err());
    assert!(InputValidator::validate_plain_name("..").is_err());
    assert!(InputValidator::validate_plain_name("  ").is_err());
}

proptest! {
    #[test]
    fn prop_sanitized_stem_has_only_allowed_chars(value in any::<String>()) {
        let stem = InputValidator::sanitize_file_stem(&value);
        prop_assert!(stem.chars().all(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_')));
        prop_assert_eq!(stem.trim(), stem.as_str());
    }

    #[test]
    fn prop_sanitize_is_idempotent(value in any::<String>()) {
        let once = InputValidator::sanitize_file_stem(&value);
        prop_assert_eq!(InputValidator::sanitize_file_stem(&once), once);
    }

    #[test]
    fn prop_normalize_ignores_surrounding_spaces(value in "[A-Za-z ]{0,20}", pad in " {0,3}") {
        let padded = format!("{pad}{value}{pad}");
        prop_assert_eq!(InputValidator::normalize_key(&padded), InputValidator::normalize_key(&value.to_uppercase()));
    }
}
