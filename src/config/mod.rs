mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./theatre.toml",
        "~/.config/theatre/config.toml",
        "/etc/theatre/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let base = reqwest::Url::parse(&config.backend.base_url)
        .with_context(|| format!("Invalid backend base_url: {}", config.backend.base_url))?;
    if !matches!(base.scheme(), "http" | "https") {
        anyhow::bail!("Backend base_url must be http or https: {}", base);
    }

    if !config.backend.media_path.starts_with('/') {
        anyhow::bail!(
            "Backend media_path must start with '/': {}",
            config.backend.media_path
        );
    }

    if config.backend.request_timeout_secs == 0 {
        anyhow::bail!("Backend request timeout cannot be 0");
    }

    if config.scheduler.segment_size_bytes == 0 {
        anyhow::bail!("Scheduler segment size cannot be 0");
    }

    if !(config.scheduler.low_watermark_secs.is_finite() && config.scheduler.low_watermark_secs > 0.0)
    {
        anyhow::bail!(
            "Scheduler low watermark must be positive, got {}",
            config.scheduler.low_watermark_secs
        );
    }

    if config.heartbeat.interval_secs == 0 {
        anyhow::bail!("Heartbeat interval cannot be 0");
    }

    if config.keep_alive.enabled && !KEEP_ALIVE_INTERVALS.contains(&config.keep_alive.interval.as_str())
    {
        anyhow::bail!(
            "Unknown keep-alive interval '{}' (expected one of: {})",
            config.keep_alive.interval,
            KEEP_ALIVE_INTERVALS.join(", ")
        );
    }

    if config.controls.hide_after_ms == 0 {
        anyhow::bail!("Controls hide delay cannot be 0");
    }

    if !(config.controls.seek_step_secs.is_finite() && config.controls.seek_step_secs > 0.0) {
        anyhow::bail!(
            "Controls seek step must be positive, got {}",
            config.controls.seek_step_secs
        );
    }

    if config.scheduler.segment_size_bytes < 64 * 1024 {
        tracing::warn!(
            "Segment size of {} bytes is unusually small",
            config.scheduler.segment_size_bytes
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        validate_config(&config).unwrap();
        assert_eq!(config.scheduler.segment_size_bytes, 500 * 1024);
        assert_eq!(config.scheduler.low_watermark_secs, 10.0);
        assert_eq!(config.heartbeat.interval_secs, 60);
        assert_eq!(config.controls.hide_after_ms, 3000);
        assert_eq!(config.controls.seek_step_secs, 15.0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [backend]
            base_url = "http://192.168.3.200:9090"

            [scheduler]
            segment_size_bytes = 307200
            buffering = "replace_source"
            cursor_gate = "projected_bytes"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.media_path, "/video");
        assert_eq!(config.scheduler.segment_size_bytes, 300 * 1024);
        assert_eq!(config.scheduler.buffering, BufferingStrategy::ReplaceSource);
        assert_eq!(config.scheduler.cursor_gate, CursorGate::ProjectedBytes);
        assert_eq!(config.session.startup_delay_ms, 2000);
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_rejects_unknown_keep_alive_interval() {
        let mut config = Config::default();
        config.keep_alive.interval = "@every-10m".to_string();
        assert!(validate_config(&config).is_err());

        config.keep_alive.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_zero_segment_size() {
        let mut config = Config::default();
        config.scheduler.segment_size_bytes = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = Config::default();
        config.backend.base_url = "not a url".to_string();
        assert!(validate_config(&config).is_err());

        config.backend.base_url = "ftp://example.com".to_string();
        assert!(validate_config(&config).is_err());
    }
}
