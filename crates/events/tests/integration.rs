//! Integration tests for events

#[cfg(test)]
mod tests {
    use roller_errors::UpdateError;
    use roller_events::*;
    use roller_types::InstanceStatus;

    #[tokio::test]
    async fn test_event_sender_emit() {
        let (tx, mut rx) = channel();

        tx.emit_warning_with_context("activity not recorded", "database is locked");
        tx.emit_rollout(RolloutEvent::Started {
            group_id: "g".into(),
            version: "1.0.0".into(),
        });

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(
            event1,
            AppEvent::General(GeneralEvent::Warning { ref context, .. }) if context == "database is locked"
        ));

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(
            event2,
            AppEvent::Rollout(RolloutEvent::Started { .. })
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning_with_context("ignored", "no receiver");
    }

    #[test]
    fn test_log_levels() {
        let failed = AppEvent::Rollout(RolloutEvent::Failed {
            group_id: "g".into(),
            version: "1.0.0".into(),
        });
        assert_eq!(failed.log_level(), tracing::Level::ERROR);
        assert_eq!(failed.log_target(), "roller::events::rollout");

        let denied = AppEvent::Rollout(RolloutEvent::UpdateDenied {
            instance_id: "i".into(),
            group_id: "g".into(),
            failure: FailureContext::from_error(&UpdateError::UpdatesDisabled),
        });
        assert_eq!(denied.log_level(), tracing::Level::DEBUG);

        let status = AppEvent::Instance(InstanceEvent::StatusChanged {
            instance_id: "i".into(),
            application_id: "a".into(),
            status: InstanceStatus::Complete,
        });
        assert_eq!(status.log_level(), tracing::Level::INFO);
        assert_eq!(status.event_source(), EventSource::INSTANCE);
    }

    #[test]
    fn test_event_serialization() {
        let event = AppEvent::Rollout(RolloutEvent::UpdatesDisabled {
            group_id: "g".into(),
            reason: "timed out".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "rollout");
        assert_eq!(json["event"]["type"], "updates_disabled");
    }

    #[test]
    fn test_failure_context_carries_code() {
        let ctx = FailureContext::from_error(&UpdateError::MaxConcurrentUpdatesLimitReached);
        assert_eq!(
            ctx.code.as_deref(),
            Some("update.max_concurrent_updates_limit_reached")
        );
        assert!(ctx.retryable);
    }

    #[test]
    fn test_meta_carries_correlation() {
        let event = AppEvent::Rollout(RolloutEvent::Failed {
            group_id: "g1".to_string(),
            version: "2.0.0".to_string(),
        });
        let meta = event.meta();
        assert_eq!(meta.correlation_id.as_deref(), Some("g1"));
        assert_eq!(meta.level, EventLevel::Error);
        assert_eq!(meta.source, EventSource::ROLLOUT);

        let general = AppEvent::General(GeneralEvent::warning_with_context("careful", "disk"));
        assert!(general.meta().correlation_id.is_none());
        assert_eq!(general.meta().tracing_level(), tracing::Level::WARN);
    }
}
