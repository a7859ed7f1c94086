//! Configuration loading and config file resolution
//!
//! Bootstrap configuration is a single TOML file. Every section and every key
//! is optional; anything missing takes the compiled default.
//!
//! # Config File Priority
//!
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`WAB_CONFIG`)
//! 3. Platform config directory (`<config_dir>/wab/config.toml`)
//! 4. Compiled defaults (no file)
//!
//! An explicitly requested file (1 or 2) that cannot be read is an error.
//! A missing platform default file is not: a warning is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "WAB_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub audio: AudioConfig,
    pub unlock: UnlockConfig,
    pub host: HostConfig,
    pub logging: LoggingConfig,
}

/// Output backend used to create the audio endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioBackend {
    /// System audio device through cpal
    #[default]
    Cpal,
    /// No device; the clock follows wall time and samples are discarded
    Null,
}

impl std::str::FromStr for AudioBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpal" => Ok(AudioBackend::Cpal),
            "null" => Ok(AudioBackend::Null),
            other => Err(Error::InvalidInput(format!("Unknown audio backend: {}", other))),
        }
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub backend: AudioBackend,

    /// Output device name (None = default device)
    pub device: Option<String>,

    /// Sample rate requested from the device when it supports it
    pub preferred_sample_rate: u32,

    /// Fixed device buffer size in frames (None = device default)
    pub output_buffer_frames: Option<u32>,

    /// Number of submitted blocks that may wait for playback before new ones are dropped
    pub schedule_capacity: usize,

    /// Sample rate reported by the null backend
    pub null_sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            backend: AudioBackend::Cpal,
            device: None,
            preferred_sample_rate: 44100,
            output_buffer_frames: None,
            schedule_capacity: 64,
            null_sample_rate: 44100,
        }
    }
}

/// Gesture unlock policy
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UnlockConfig {
    /// Keep output suspended until the first user gesture
    pub require_gesture: bool,
}

/// WASM host loop configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Interval between calls to the frame export
    pub frame_interval_ms: u64,

    /// Export called once after instantiation, if present
    pub start_export: String,

    /// Export called every frame interval, if present
    pub frame_export: String,

    /// Read visibility/gesture control commands from stdin
    pub control_stdin: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            start_export: "start".to_string(),
            frame_export: "frame".to_string(),
            control_stdin: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path; console logging stays on when set
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file and load it, falling back to defaults
    /// when no explicit file was requested and the platform file is absent.
    pub fn load_or_default(cli_arg: Option<&Path>) -> Result<Self> {
        let source = ConfigResolver::new().resolve(cli_arg);
        source.log();
        Self::from_source(&source)
    }

    /// Load from an already resolved source without logging.
    ///
    /// For callers that resolve configuration before tracing is set up.
    pub fn from_source(source: &ConfigSource) -> Result<Self> {
        match source {
            ConfigSource::Explicit(path) => Self::load(path),
            ConfigSource::PlatformDefault(path) if path.exists() => Self::load(path),
            ConfigSource::PlatformDefault(_) | ConfigSource::Defaults => Ok(Self::default()),
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.audio.preferred_sample_rate == 0 {
            return Err(Error::Config("audio.preferred_sample_rate must be > 0".to_string()));
        }
        if self.audio.null_sample_rate == 0 {
            return Err(Error::Config("audio.null_sample_rate must be > 0".to_string()));
        }
        if self.audio.schedule_capacity == 0 {
            return Err(Error::Config("audio.schedule_capacity must be > 0".to_string()));
        }
        if self.audio.output_buffer_frames == Some(0) {
            return Err(Error::Config("audio.output_buffer_frames must be > 0".to_string()));
        }
        if self.host.frame_interval_ms == 0 {
            return Err(Error::Config("host.frame_interval_ms must be > 0".to_string()));
        }
        if self.host.start_export.trim().is_empty() || self.host.frame_export.trim().is_empty() {
            return Err(Error::Config("host export names must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Where the configuration should come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Requested on the command line or through the environment; must exist
    Explicit(PathBuf),
    /// Platform config directory; may be absent
    PlatformDefault(PathBuf),
    /// No file location could be determined
    Defaults,
}

impl ConfigSource {
    /// Log where configuration is (or is not) coming from
    pub fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loading config from {}", path.display()),
            ConfigSource::PlatformDefault(path) if path.exists() => {
                info!("Loading config from {}", path.display())
            }
            ConfigSource::PlatformDefault(path) => warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            ),
            ConfigSource::Defaults => {
                warn!("No config directory available, using compiled defaults")
            }
        }
    }
}

/// Resolves the configuration file location
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    env_var_name: String,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::with_env_var(CONFIG_ENV_VAR)
    }

    pub fn with_env_var(env_var_name: &str) -> Self {
        Self {
            env_var_name: env_var_name.to_string(),
        }
    }

    pub fn resolve(&self, cli_arg: Option<&Path>) -> ConfigSource {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return ConfigSource::Explicit(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return ConfigSource::Explicit(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        match default_config_path() {
            Some(path) => ConfigSource::PlatformDefault(path),
            None => ConfigSource::Defaults,
        }
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Platform config file location (`~/.config/wab/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wab").join("config.toml"))
}
