//! Integration tests for config

#[cfg(test)]
mod tests {
    use ota_config::*;
    use ota_types::{ColorChoice, OutputFormat};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: [&str; 7] = [
        "OTA_OUTPUT",
        "OTA_COLOR",
        "OTA_DEVICE",
        "OTA_STATE_DB",
        "OTA_PAYLOAD_ROOT",
        "OTA_PACKAGES_DIR",
        "OTA_UPDATES_URL",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
default_output = "plain"
color = "never"

[device]
product = "alpha"

[paths]
state_db = "/tmp/ota/state.sqlite"

[engine]
payload_root = "/data/media/0/ota"
simulated_step_ms = 5
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.default_output, OutputFormat::Plain);
        assert_eq!(config.general.color, ColorChoice::Never);
        assert_eq!(config.device.product.as_deref(), Some("alpha"));
        assert!(!config.device.power_control);
        assert_eq!(config.state_db_path(), PathBuf::from("/tmp/ota/state.sqlite"));
        assert_eq!(
            config.engine.payload_root,
            Some(PathBuf::from("/data/media/0/ota"))
        );
        assert_eq!(config.engine.simulated_step_ms, 5);
        assert_eq!(config.engine.simulated_chunk_bytes, 1024 * 1024);
    }

    #[tokio::test]
    async fn test_blank_product_in_file_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[device]\nproduct = \"\"").unwrap();

        let result = Config::load_from_file(temp_file.path()).await;
        match result {
            Err(ota_errors::Error::Config(ota_errors::ConfigError::InvalidValue { field, .. })) => {
                assert_eq!(field, "device.product");
            }
            other => panic!("expected invalid device.product, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_network_section() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[device]
product = "alpha"
build_time = 1714521600

[network]
updates_url = "http://127.0.0.1:8080/updates"
retry_count = 0
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.device.build_time, Some(1_714_521_600));
        assert_eq!(config.network.updates_url, "http://127.0.0.1:8080/updates");
        assert_eq!(config.network.retry_count, 0);
        assert_eq!(config.network.timeout_secs, 300);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let result = Config::load_from_file(std::path::Path::new("/nonexistent/ota.toml")).await;
        assert!(matches!(
            result,
            Err(ota_errors::Error::Config(ota_errors::ConfigError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.packages_dir(), PathBuf::from(constants::PACKAGES_DIR));
        assert_eq!(config.state_db_path(), PathBuf::from(constants::STATE_DB_PATH));
        assert_eq!(config.engine.simulated_completion_code, 0);
        assert_eq!(config.network.updates_url, constants::UPDATES_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("OTA_OUTPUT", "json");
        std::env::set_var("OTA_COLOR", "always");
        std::env::set_var("OTA_DEVICE", "beta");
        std::env::set_var("OTA_STATE_DB", "/tmp/other.sqlite");
        std::env::set_var("OTA_PACKAGES_DIR", "/tmp/packages");
        std::env::set_var("OTA_UPDATES_URL", "http://localhost/updates");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.packages_dir(), PathBuf::from("/tmp/packages"));
        assert_eq!(config.network.updates_url, "http://localhost/updates");

        assert_eq!(config.general.default_output, OutputFormat::Json);
        assert_eq!(config.general.color, ColorChoice::Always);
        assert_eq!(config.device.product.as_deref(), Some("beta"));
        assert_eq!(config.state_db_path(), PathBuf::from("/tmp/other.sqlite"));

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("OTA_OUTPUT", "invalid");

        let mut config = Config::default();
        let result = config.merge_env();
        assert!(result.is_err());

        clear_env();
    }

    #[test]
    fn test_blank_device_rejected() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("OTA_DEVICE", "  ");

        let mut config = Config::default();
        assert!(config.merge_env().is_err());

        clear_env();
    }
}
