//! Integration tests for config

#[cfg(test)]
mod tests {
    use roller_config::constants::{
        ENV_DB_PATH, ENV_INSTANCE_VALIDITY_SECS, ENV_LOG_JSON, ENV_STRICT_ADMISSION,
    };
    use roller_config::*;
    use roller_errors::{ConfigError, Error};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for var in [
            ENV_DB_PATH,
            ENV_INSTANCE_VALIDITY_SECS,
            ENV_STRICT_ADMISSION,
            ENV_LOG_JSON,
        ] {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[database]
path = "/var/lib/roller/roller.sqlite"
max_connections = 8

[rollout]
instance_validity_secs = 3600
strict_admission = false

[builtin]
app_id = "e96281a6-d1af-4bde-9a0a-97b76e56dc57"

[builtin.groups]
stable = "5b810680-e36a-4879-b98a-4f989e80b899"
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(
            config.db_path(),
            PathBuf::from("/var/lib/roller/roller.sqlite")
        );
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.database.busy_timeout_secs, 30);
        assert_eq!(config.rollout.instance_validity(), Duration::from_secs(3600));
        assert!(!config.rollout.strict_admission);
        assert_eq!(config.rollout.status_history_limit, 20);
        assert_eq!(
            config.builtin.groups.get("stable").map(String::as_str),
            Some("5b810680-e36a-4879-b98a-4f989e80b899")
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.rollout.instance_validity(), Duration::from_secs(86_400));
        assert!(config.rollout.strict_admission);
        assert_eq!(config.rollout.activity_window_days, 3);
        assert_eq!(config.logging.level, "info");
        assert!(config.builtin.app_id.is_none());
        config.validate().unwrap();
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[rollout\nstrict_admission = ").unwrap();
        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ParseError { .. })));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = Config::load_from_file(std::path::Path::new("/nonexistent/roller.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.rollout.strict_admission = false;
        config.builtin.app_id = Some("e96281a6-d1af-4bde-9a0a-97b76e56dc57".to_string());
        config.save_to_file(&path).await.unwrap();

        let loaded = Config::load_or_default(Some(&path)).await.unwrap();
        assert!(!loaded.rollout.strict_admission);
        assert_eq!(loaded.builtin, config.builtin);
    }

    #[test]
    fn test_validate_rejects_bad_builtin_ids() {
        let mut config = Config::default();
        config
            .builtin
            .groups
            .insert("beta".to_string(), "not-a-uuid".to_string());
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { field, .. }) if field == "builtin.groups.beta"
        ));
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var(ENV_DB_PATH, "/tmp/roller-env.sqlite");
        std::env::set_var(ENV_INSTANCE_VALIDITY_SECS, "120");
        std::env::set_var(ENV_STRICT_ADMISSION, "no");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.db_path(), PathBuf::from("/tmp/roller-env.sqlite"));
        assert_eq!(config.rollout.instance_validity_secs, 120);
        assert!(!config.rollout.strict_admission);

        clear_env();
    }

    #[test]
    fn test_merge_env_invalid_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var(ENV_LOG_JSON, "maybe");
        let mut config = Config::default();
        let err = config.merge_env().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { field, .. }) if field == ENV_LOG_JSON
        ));

        clear_env();
    }
}
