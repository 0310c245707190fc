//! Integration tests for error types

#[cfg(test)]
mod tests {
    use ota_errors::*;

    #[test]
    fn test_error_conversion() {
        let state_err = StateError::invalid_transition("IDLE", "cancel");
        let err: Error = state_err.into();
        assert!(err.is_invalid_transition());
        assert_eq!(err.user_code(), Some("state.invalid_transition"));
    }

    #[test]
    fn test_invalid_transition_display_names_state_and_action() {
        let err = StateError::invalid_transition("PAUSED", "suspend");
        assert_eq!(err.to_string(), "invalid transition: cannot suspend while PAUSED");
    }

    #[test]
    fn test_validation_failure_reason_is_stable() {
        let failure = ValidationFailure::DeviceMismatch {
            expected: "beta".into(),
            found: "alpha".into(),
        };
        assert_eq!(failure.reason(), "device mismatch");
        assert!(failure.to_string().starts_with("device mismatch"));

        let err: Error = PackageError::from(failure.clone()).into();
        assert_eq!(err.validation_failure(), Some(&failure));
        assert_eq!(err.user_code(), Some("package.device_mismatch"));
    }

    #[test]
    fn test_unsupported_compression_reason() {
        let failure = ValidationFailure::UnsupportedCompression {
            method: "Deflated".into(),
        };
        assert_eq!(failure.reason(), "unsupported payload compression");
    }

    #[test]
    fn test_engine_failure_keeps_code_and_text() {
        let err = EngineError::PayloadFailed {
            code: 60,
            text: "NOT_ENOUGH_SPACE".into(),
        };
        assert_eq!(
            err.to_string(),
            "payload application failed: NOT_ENOUGH_SPACE/60"
        );
    }

    #[test]
    fn test_error_clone() {
        let err = PackageError::NotFound {
            path: "/data/ota/update.zip".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.is_retryable());
    }
}
