//! Integration tests for `carebridge_common::error`.
//!
//! These suites validate classification and module error delegation so the
//! storage, execution and configuration layers report failures the same way.

use std::time::Duration;

use carebridge_common::error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
use carebridge_common::{impl_error_classification, impl_error_conversion};
use thiserror::Error;

#[derive(Debug, Error)]
enum SectionError {
    #[error("section '{0}' is locked by another writer")]
    Locked(String),

    #[error("section payload rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_conversion!(SectionError, Common);

impl_error_classification!(SectionError, Common,
    Self::Locked(_) => {
        retryable: true,
        severity: ErrorSeverity::Warning,
        critical: false,
        retry_after: Some(Duration::from_millis(50)),
    },
    Self::Rejected(_) => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    }
);

fn parse_section(raw: &str) -> Result<serde_json::Value, SectionError> {
    Ok(serde_json::from_str(raw)?)
}

/// Validates that `CommonError` classification surfaces the expected
/// retryable, severity, and criticality combinations for each variant.
#[test]
fn classification_matrix_matches_expected_contract() {
    let cases = vec![
        (CommonError::config("missing base url"), false, ErrorSeverity::Error, false),
        (CommonError::serialization("JSON", "trailing comma"), false, ErrorSeverity::Error, false),
        (CommonError::persistence("disk full"), true, ErrorSeverity::Error, false),
        (
            CommonError::timeout("crm request", Duration::from_secs(3)),
            true,
            ErrorSeverity::Warning,
            false,
        ),
        (CommonError::validation("tag", "empty"), false, ErrorSeverity::Error, false),
        (
            CommonError::not_found("section", Some("offlineData".into())),
            false,
            ErrorSeverity::Info,
            false,
        ),
        (CommonError::unsupported("background-sync"), false, ErrorSeverity::Info, false),
        (CommonError::internal("broken invariant"), false, ErrorSeverity::Critical, true),
    ];

    for (err, retryable, severity, critical) in cases {
        assert_eq!(err.is_retryable(), retryable, "retryable mismatch for {err}");
        assert_eq!(err.severity(), severity, "severity mismatch for {err}");
        assert_eq!(err.is_critical(), critical, "critical mismatch for {err}");
        assert_eq!(err.retry_after(), None);
    }
}

#[test]
fn module_error_delegates_common_classification() {
    let err = SectionError::from(CommonError::timeout("write", Duration::from_secs(1)));
    assert!(err.is_retryable());
    assert_eq!(err.severity(), ErrorSeverity::Warning);
    assert_eq!(err.to_string(), "write timed out after 1s");
}

/// Validates `impl_error_classification!` behavior for module-specific
/// variants.
///
/// Assertions:
/// - Confirms `Locked` is retryable with the declared `retry_after`.
/// - Confirms `Rejected` falls back to `None` for `retry_after`.
#[test]
fn module_specific_variants_use_declared_classification() {
    let locked = SectionError::Locked("pendingActions".into());
    assert!(locked.is_retryable());
    assert_eq!(locked.retry_after(), Some(Duration::from_millis(50)));

    let rejected = SectionError::Rejected("not an array".into());
    assert!(!rejected.is_retryable());
    assert_eq!(rejected.retry_after(), None);
    assert_eq!(rejected.severity(), ErrorSeverity::Error);
}

#[test]
fn conversion_macro_routes_serde_errors_through_common() {
    let err = parse_section("{oops").unwrap_err();
    match err {
        SectionError::Common(CommonError::Serialization { format, .. }) => {
            assert_eq!(format, "JSON");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume");
    let err = SectionError::from(io);
    assert!(matches!(err, SectionError::Common(CommonError::Persistence { .. })));
}

#[test]
fn common_result_alias_propagates_with_question_mark() {
    fn load(raw: &str) -> CommonResult<serde_json::Value> {
        Ok(serde_json::from_str(raw)?)
    }

    assert!(load("[1,2,3]").is_ok());
    assert!(load("[1,2").is_err());
}

#[test]
fn severity_serializes_lowercase() {
    let encoded = serde_json::to_string(&ErrorSeverity::Critical).unwrap();
    assert_eq!(encoded, "\"critical\"");
}
