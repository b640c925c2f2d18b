use annex_distance::DistanceFunction;
use annex_error::{AnnexError, ErrorCodes};
use annex_tracing::{
    global_filter_directives, init_global_filter_layer, init_stdout_layer, LogFilter,
};
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::{Layer, Registry};

use crate::quantization::{AdcError, BinaryCodeStore};

const DEFAULT_CONFIG_PATH: &str = "./annex_config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Error loading config: {0}")]
    Load(#[from] Box<figment::Error>),
}

impl AnnexError for ConfigError {
    fn code(&self) -> ErrorCodes {
        match self {
            ConfigError::Load(_) => ErrorCodes::InvalidArgument,
        }
    }
}

/// Root config for the query-time extensions. Can be part of a larger config
/// file; every section is optional.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RootConfig {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub adc: Option<AdcConfig>,
    #[serde(default)]
    pub log_filters: Vec<LogFilter>,
}

impl RootConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Reads `path` if it exists, then applies `ANNEX_` environment variables
    /// on top. Nested keys use `__`, e.g. `ANNEX_COLLECTOR__GROUPING_ENABLED`.
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        let mut f = figment::Figment::from(
            Env::prefixed("ANNEX_").map(|k| k.as_str().replace("__", ".").into()),
        );
        if std::path::Path::new(path).exists() {
            f = figment::Figment::from(Yaml::file(path)).merge(f);
        }
        let config: Self = f.extract().map_err(Box::new)?;
        tracing::debug!(
            grouping_enabled = config.collector.grouping_enabled,
            adc = ?config.adc,
            "Loaded config"
        );
        Ok(config)
    }

    /// Filter directives built from `log_filters`, used when `RUST_LOG` is
    /// not set.
    pub fn log_directives(&self) -> String {
        global_filter_directives(&self.log_filters)
    }

    /// Subscriber layers for `annex_tracing::init_tracing`: the filter built
    /// from `log_filters` and the stdout layer.
    pub fn tracing_layers(&self) -> Vec<Box<dyn Layer<Registry> + Send + Sync>> {
        vec![
            init_global_filter_layer(&self.log_filters),
            init_stdout_layer(),
        ]
    }
}

fn default_grouping_enabled() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone)]
pub struct CollectorConfig {
    /// When false, collectors ignore parent ids and every leaf is its own group.
    #[serde(default = "default_grouping_enabled")]
    pub grouping_enabled: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            grouping_enabled: default_grouping_enabled(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AdcConfig {
    pub dimension: usize,
    #[serde(default)]
    pub distance_function: DistanceFunction,
}

impl AdcConfig {
    /// Wraps `codes` as a store of the configured dimension.
    pub fn code_store<T: AsRef<[u8]>>(&self, codes: T) -> Result<BinaryCodeStore<T>, AdcError> {
        BinaryCodeStore::new(self.dimension, codes)
    }
}
