//! Integration tests for error types

#[cfg(test)]
mod tests {
    use roller_errors::*;

    #[test]
    fn test_error_conversion() {
        let err: Error = UpdateError::MaxConcurrentUpdatesLimitReached.into();
        assert!(matches!(
            err,
            Error::Update(UpdateError::MaxConcurrentUpdatesLimitReached)
        ));
        assert_eq!(
            err.as_denial(),
            Some(&UpdateError::MaxConcurrentUpdatesLimitReached)
        );
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::InvalidSemver {
            version: "1.0".into(),
        };
        assert_eq!(err.to_string(), "invalid semver: 1.0");
    }

    #[test]
    fn test_denial_kinds() {
        assert_eq!(UpdateError::NoPackageFound.kind(), DenialKind::Eligibility);
        assert_eq!(UpdateError::UpdatesDisabled.kind(), DenialKind::Policy);
        assert!(!UpdateError::UpdatesDisabled.holds_instance());
        assert!(UpdateError::MaxTimedOutUpdatesLimitReached.holds_instance());
        assert!(!UpdateError::UpdateInProgressOnInstance.holds_instance());
    }

    #[test]
    fn test_user_codes_are_distinct() {
        let errors: Vec<Error> = vec![
            UpdateError::NoPackageFound.into(),
            UpdateError::NoUpdatePackageAvailable.into(),
            UpdateError::UpdateInProgressOnInstance.into(),
            UpdateError::UpdatesDisabled.into(),
            UpdateError::MaxUpdatesPerPeriodLimitReached.into(),
            UpdateError::MaxConcurrentUpdatesLimitReached.into(),
            UpdateError::MaxTimedOutUpdatesLimitReached.into(),
            ValidationError::InvalidApplicationOrGroup.into(),
            ValidationError::NoUpdateInProgress {
                instance_id: "i".into(),
            }
            .into(),
        ];
        let mut codes: Vec<&str> = errors.iter().filter_map(UserFacingError::user_code).collect();
        let before = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(before, errors.len());
        assert_eq!(codes.len(), before);
    }

    #[test]
    fn test_sqlx_error_maps_to_state() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::State(StateError::DatabaseError { .. })));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(
            err,
            Error::Io {
                kind: std::io::ErrorKind::PermissionDenied,
                ..
            }
        ));
    }
}
