//! Engine configuration and configuration-source layering.
//!
//! [`EngineConfig`] is the plain value passed explicitly into discovery and
//! execution-metadata lookups. It is produced from a [`ResolvedConfig`],
//! which records where every value came from.
//!
//! Precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`SIFT_ENGINE_ID`, `SIFT_DEFAULT_EXECUTION_MODE`)
//! 3. Config file (JSON)
//! 4. Defaults

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::metadata::ExecutionMode;

/// Default engine id used for the root `[engine:...]` segment.
pub const DEFAULT_ENGINE_ID: &str = "sift";

/// Environment variable overriding the engine id.
pub const ENV_ENGINE_ID: &str = "SIFT_ENGINE_ID";

/// Environment variable overriding the default execution mode.
pub const ENV_DEFAULT_EXECUTION_MODE: &str = "SIFT_DEFAULT_EXECUTION_MODE";

// ============================================================================
// Engine Config
// ============================================================================

/// Configuration consumed by the resolver and the execution-metadata walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Value of the root `engine` segment.
    pub engine_id: String,
    /// Display name of the root node.
    pub engine_display_name: String,
    /// Mode used when neither a node nor any ancestor declares one.
    pub default_execution_mode: ExecutionMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            engine_id: DEFAULT_ENGINE_ID.to_string(),
            engine_display_name: "Sift".to_string(),
            default_execution_mode: ExecutionMode::SameThread,
        }
    }
}

impl EngineConfig {
    /// Set the process-wide default execution mode.
    pub fn with_default_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.default_execution_mode = mode;
        self
    }

    /// Set the engine id.
    pub fn with_engine_id(mut self, engine_id: impl Into<String>) -> Self {
        self.engine_id = engine_id.into();
        self
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From the JSON config file.
    ConfigFile = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone)]
pub struct ConfigValue<T> {
    /// The actual value.
    pub value: T,
    /// Where the value came from.
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    /// Create a new config value with the given source.
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

/// Contents of a JSON config file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Engine id override.
    pub engine_id: Option<String>,
    /// Default execution mode (`same_thread` or `concurrent`).
    pub default_execution_mode: Option<String>,
}

impl ConfigFile {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<ConfigFile, ConfigurationError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigurationError::InvalidValue {
            key: "config".to_string(),
            value: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigurationError::InvalidValue {
            key: "config".to_string(),
            value: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// --engine-id flag.
    pub engine_id: Option<String>,
    /// --default-execution-mode flag.
    pub default_execution_mode: Option<String>,
}

// ============================================================================
// Resolved Config
// ============================================================================

/// Resolved configuration with precedence information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Engine id.
    pub engine_id: ConfigValue<String>,
    /// Default execution mode, still unparsed.
    pub default_execution_mode: ConfigValue<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig {
            engine_id: ConfigValue::new(DEFAULT_ENGINE_ID.to_string(), ConfigSource::Default),
            default_execution_mode: ConfigValue::new(
                ExecutionMode::SameThread.as_str().to_string(),
                ConfigSource::Default,
            ),
        }
    }
}

impl ResolvedConfig {
    /// Resolve configuration from all sources, reading the process environment.
    pub fn resolve(file: Option<&ConfigFile>, cli: &CliOverrides) -> Self {
        Self::resolve_with_env(file, cli, |key| std::env::var(key).ok())
    }

    /// Resolve configuration with an explicit environment lookup.
    pub fn resolve_with_env(
        file: Option<&ConfigFile>,
        cli: &CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut config = ResolvedConfig::default();

        if let Some(file) = file {
            config.apply(
                file.engine_id.clone(),
                file.default_execution_mode.clone(),
                ConfigSource::ConfigFile,
            );
        }

        config.apply(
            env(ENV_ENGINE_ID),
            env(ENV_DEFAULT_EXECUTION_MODE),
            ConfigSource::EnvVar,
        );

        config.apply(
            cli.engine_id.clone(),
            cli.default_execution_mode.clone(),
            ConfigSource::CliFlag,
        );

        config
    }

    fn apply(&mut self, engine_id: Option<String>, mode: Option<String>, source: ConfigSource) {
        if let Some(engine_id) = engine_id {
            self.engine_id = self
                .engine_id
                .clone()
                .merge(ConfigValue::new(engine_id, source));
        }
        if let Some(mode) = mode {
            self.default_execution_mode = self
                .default_execution_mode
                .clone()
                .merge(ConfigValue::new(mode, source));
        }
    }

    /// Validate and convert into an [`EngineConfig`].
    pub fn into_engine_config(self) -> Result<EngineConfig, ConfigurationError> {
        let engine_id = self.engine_id.value.trim().to_string();
        if engine_id.is_empty() {
            return Err(ConfigurationError::InvalidValue {
                key: "engine_id".to_string(),
                value: self.engine_id.value,
                message: "must not be blank".to_string(),
            });
        }
        let mode = ExecutionMode::parse(&self.default_execution_mode.value, "configuration")?;
        Ok(EngineConfig::default()
            .with_engine_id(engine_id)
            .with_default_execution_mode(mode))
    }
}
