//! Player configuration
//!
//! Zoom limits, prefetch width, eviction timing and tile compression
//! settings. Configuration can be loaded from a file, environment variables,
//! or created programmatically.

use crate::error::ConfigError;
use paint_preview_cache::{PngCodec, PngCompression};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Widest prefetch ring accepted by [`PlayerConfig::validate`]
pub const MAX_PREFETCH_RING: usize = 4;

/// Configuration for a frame player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Smallest zoom, as a multiple of the initial fit scale
    pub min_scale: f32,
    /// Largest zoom, as a multiple of the initial fit scale
    pub max_scale: f32,
    /// Keep decoded tile pixels after compression until they are swept
    pub retain_after_compress: bool,
    /// Width in tiles of the prefetch ring around the visible tiles
    pub prefetch_ring: usize,
    /// Delay between the last viewport movement and the eviction sweep
    pub eviction_delay_ms: u64,
    /// PNG effort used for compressed tiles
    pub png_compression: PngCompression,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.25,
            max_scale: 5.0,
            retain_after_compress: false,
            prefetch_ring: 1,
            eviction_delay_ms: 250,
            png_compression: PngCompression::Fast,
        }
    }
}

impl PlayerConfig {
    /// Sets the zoom limits relative to the initial fit scale.
    pub fn with_scale_bounds(mut self, min_scale: f32, max_scale: f32) -> Self {
        self.min_scale = min_scale;
        self.max_scale = max_scale;
        self
    }

    pub fn with_retain_after_compress(mut self, retain: bool) -> Self {
        self.retain_after_compress = retain;
        self
    }

    /// Sets the prefetch ring width in tiles.
    pub fn with_prefetch_ring(mut self, width: usize) -> Self {
        self.prefetch_ring = width;
        self
    }

    /// Sets the eviction sweep delay in milliseconds.
    pub fn with_eviction_delay_ms(mut self, ms: u64) -> Self {
        self.eviction_delay_ms = ms;
        self
    }

    pub fn with_png_compression(mut self, compression: PngCompression) -> Self {
        self.png_compression = compression;
        self
    }

    pub fn eviction_delay(&self) -> Duration {
        Duration::from_millis(self.eviction_delay_ms)
    }

    /// Codec for compressed tiles
    pub fn codec(&self) -> PngCodec {
        PngCodec::new(self.png_compression)
    }

    /// Returns the default configuration file path for the current platform.
    ///
    /// - macOS: ~/Library/Application Support/paint-preview/player.toml
    /// - Linux: ~/.config/paint-preview/player.toml
    /// - Windows: %APPDATA%\paint-preview\player.toml
    pub fn default_config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("paint-preview").join("player.toml")
        } else {
            PathBuf::from("config/paint-preview/player.toml")
        }
    }

    /// Checks that the values can drive a player.
    ///
    /// # Errors
    /// Returns [`ConfigError::OutOfRange`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            return Err(ConfigError::OutOfRange {
                key: "min_scale",
                reason: format!("must be positive, got {}", self.min_scale),
            });
        }
        if !(self.max_scale.is_finite() && self.max_scale >= self.min_scale) {
            return Err(ConfigError::OutOfRange {
                key: "max_scale",
                reason: format!(
                    "must be at least min_scale ({}), got {}",
                    self.min_scale, self.max_scale
                ),
            });
        }
        if self.prefetch_ring > MAX_PREFETCH_RING {
            return Err(ConfigError::OutOfRange {
                key: "prefetch_ring",
                reason: format!("must be at most {}, got {}", MAX_PREFETCH_RING, self.prefetch_ring),
            });
        }
        Ok(())
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PAINT_PREVIEW_MIN_SCALE` (default: 0.25)
    /// - `PAINT_PREVIEW_MAX_SCALE` (default: 5.0)
    /// - `PAINT_PREVIEW_RETAIN_AFTER_COMPRESS`: `true`/`false`/`1`/`0` (default: false)
    /// - `PAINT_PREVIEW_PREFETCH_RING` (default: 1)
    /// - `PAINT_PREVIEW_EVICTION_DELAY_MS` (default: 250)
    /// - `PAINT_PREVIEW_PNG_COMPRESSION`: `fast`, `default` or `best` (default: fast)
    ///
    /// # Errors
    /// Returns an error if any variable cannot be parsed or the result does
    /// not validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(val) = env_value("PAINT_PREVIEW_MIN_SCALE") {
            config.min_scale = parse_env("PAINT_PREVIEW_MIN_SCALE", &val)?;
        }

        if let Some(val) = env_value("PAINT_PREVIEW_MAX_SCALE") {
            config.max_scale = parse_env("PAINT_PREVIEW_MAX_SCALE", &val)?;
        }

        if let Some(val) = env_value("PAINT_PREVIEW_RETAIN_AFTER_COMPRESS") {
            config.retain_after_compress = parse_bool(&val).ok_or_else(|| {
                ConfigError::InvalidValue("PAINT_PREVIEW_RETAIN_AFTER_COMPRESS".to_string())
            })?;
        }

        if let Some(val) = env_value("PAINT_PREVIEW_PREFETCH_RING") {
            config.prefetch_ring = parse_env("PAINT_PREVIEW_PREFETCH_RING", &val)?;
        }

        if let Some(val) = env_value("PAINT_PREVIEW_EVICTION_DELAY_MS") {
            config.eviction_delay_ms = parse_env("PAINT_PREVIEW_EVICTION_DELAY_MS", &val)?;
        }

        if let Some(val) = env_value("PAINT_PREVIEW_PNG_COMPRESSION") {
            config.png_compression = parse_env("PAINT_PREVIEW_PNG_COMPRESSION", &val)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Expected file format (every key optional):
    /// ```toml
    /// min_scale = 0.25
    /// max_scale = 5.0
    /// retain_after_compress = false
    /// prefetch_ring = 1
    /// eviction_delay_ms = 250
    /// png_compression = "fast"
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from a TOML string. Missing keys keep their
    /// defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Converts configuration to TOML format.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = format!("# Paint preview player configuration\n{}", self.to_toml()?);
        fs::write(path, toml)?;
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|val| !val.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const ENV_VARS: &[&str] = &[
        "PAINT_PREVIEW_MIN_SCALE",
        "PAINT_PREVIEW_MAX_SCALE",
        "PAINT_PREVIEW_RETAIN_AFTER_COMPRESS",
        "PAINT_PREVIEW_PREFETCH_RING",
        "PAINT_PREVIEW_EVICTION_DELAY_MS",
        "PAINT_PREVIEW_PNG_COMPRESSION",
    ];

    #[test]
    fn test_default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.min_scale, 0.25);
        assert_eq!(config.max_scale, 5.0);
        assert!(!config.retain_after_compress);
        assert_eq!(config.prefetch_ring, 1);
        assert_eq!(config.eviction_delay(), Duration::from_millis(250));
        assert_eq!(config.codec().compression(), PngCompression::Fast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = PlayerConfig::default()
            .with_scale_bounds(0.5, 3.0)
            .with_retain_after_compress(true)
            .with_prefetch_ring(2)
            .with_eviction_delay_ms(1000)
            .with_png_compression(PngCompression::Best);

        assert_eq!(config.min_scale, 0.5);
        assert_eq!(config.max_scale, 3.0);
        assert!(config.retain_after_compress);
        assert_eq!(config.prefetch_ring, 2);
        assert_eq!(config.eviction_delay_ms, 1000);
        assert_eq!(config.png_compression, PngCompression::Best);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = PlayerConfig::default()
            .with_scale_bounds(0.0, 2.0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: "min_scale", .. }));

        let err = PlayerConfig::default()
            .with_scale_bounds(2.0, 1.0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: "max_scale", .. }));

        let err = PlayerConfig::default()
            .with_prefetch_ring(MAX_PREFETCH_RING + 1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: "prefetch_ring", .. }));

        // Zero ring disables prefetch but is legal
        assert!(PlayerConfig::default().with_prefetch_ring(0).validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        let path = PlayerConfig::default_config_path();
        assert!(path.ends_with("paint-preview/player.toml"));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("PAINT_PREVIEW_MIN_SCALE", "0.5");
        env::set_var("PAINT_PREVIEW_MAX_SCALE", "8");
        env::set_var("PAINT_PREVIEW_RETAIN_AFTER_COMPRESS", "1");
        env::set_var("PAINT_PREVIEW_PREFETCH_RING", "2");
        env::set_var("PAINT_PREVIEW_EVICTION_DELAY_MS", "40");
        env::set_var("PAINT_PREVIEW_PNG_COMPRESSION", "best");

        let config = PlayerConfig::from_env().unwrap();
        assert_eq!(config.min_scale, 0.5);
        assert_eq!(config.max_scale, 8.0);
        assert!(config.retain_after_compress);
        assert_eq!(config.prefetch_ring, 2);
        assert_eq!(config.eviction_delay_ms, 40);
        assert_eq!(config.png_compression, PngCompression::Best);
    }

    #[test]
    #[serial]
    fn test_from_env_partial() {
        let _guard = EnvGuard::new(ENV_VARS);

        for name in ENV_VARS {
            env::remove_var(name);
        }
        env::set_var("PAINT_PREVIEW_PREFETCH_RING", "3");

        let config = PlayerConfig::from_env().unwrap();
        assert_eq!(config.prefetch_ring, 3);
        assert_eq!(config.max_scale, 5.0); // default
        assert_eq!(config.png_compression, PngCompression::Fast); // default
    }

    #[test]
    #[serial]
    fn test_from_env_invalid() {
        let _guard = EnvGuard::new(ENV_VARS);

        for name in ENV_VARS {
            env::remove_var(name);
        }
        env::set_var("PAINT_PREVIEW_EVICTION_DELAY_MS", "soon");
        let err = PlayerConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "PAINT_PREVIEW_EVICTION_DELAY_MS"));

        env::remove_var("PAINT_PREVIEW_EVICTION_DELAY_MS");
        env::set_var("PAINT_PREVIEW_RETAIN_AFTER_COMPRESS", "maybe");
        assert!(PlayerConfig::from_env().is_err());

        env::remove_var("PAINT_PREVIEW_RETAIN_AFTER_COMPRESS");
        env::set_var("PAINT_PREVIEW_PREFETCH_RING", "9");
        assert!(matches!(
            PlayerConfig::from_env().unwrap_err(),
            ConfigError::OutOfRange { key: "prefetch_ring", .. }
        ));
    }

    // Helper to save and restore environment variables
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(var_names: &[&str]) -> Self {
            let vars = var_names
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            # Test configuration
            min_scale = 0.5
            max_scale = 4.0
            retain_after_compress = true
            prefetch_ring = 2
            eviction_delay_ms = 100
            png_compression = "default"
        "#;

        let config = PlayerConfig::from_toml(toml).unwrap();
        assert_eq!(config.min_scale, 0.5);
        assert_eq!(config.max_scale, 4.0);
        assert!(config.retain_after_compress);
        assert_eq!(config.prefetch_ring, 2);
        assert_eq!(config.eviction_delay_ms, 100);
        assert_eq!(config.png_compression, PngCompression::Default);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = PlayerConfig::from_toml("prefetch_ring = 0\n").unwrap();
        assert_eq!(config.prefetch_ring, 0);
        assert_eq!(config.min_scale, 0.25); // default
    }

    #[test]
    fn test_from_toml_errors() {
        assert!(matches!(
            PlayerConfig::from_toml("min_scale = \"tiny\"").unwrap_err(),
            ConfigError::Parse(_)
        ));
        assert!(matches!(
            PlayerConfig::from_toml("png_compression = \"ultra\"").unwrap_err(),
            ConfigError::Parse(_)
        ));
        assert!(matches!(
            PlayerConfig::from_toml("min_scale = 3.0\nmax_scale = 2.0").unwrap_err(),
            ConfigError::OutOfRange { .. }
        ));
    }

    #[test]
    fn test_file_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("player.toml");

        let config = PlayerConfig::default()
            .with_scale_bounds(0.5, 2.5)
            .with_eviction_delay_ms(75)
            .with_png_compression(PngCompression::Best);
        config.save_to_file(&config_path).unwrap();

        let loaded = PlayerConfig::from_file(&config_path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_from_file_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = PlayerConfig::from_file(temp_dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
