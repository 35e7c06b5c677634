//! Configuration for the vector sync

use core_config::{ConfigError, FromEnv};
use database::mongodb::MongoConfig;
use domain_vector::{OpenAIConfig, SyncSettings, VectorStoreConfig};

/// Everything both flows need. Directory credentials are loaded separately,
/// only when a sync runs.
#[derive(Debug, Clone)]
pub struct Config {
    pub mongo: MongoConfig,
    pub store: VectorStoreConfig,
    pub sync: SyncSettings,
    pub openai: OpenAIConfig,
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            mongo: MongoConfig::from_env()?,
            store: VectorStoreConfig::from_env()?,
            sync: SyncSettings::from_env()?,
            openai: OpenAIConfig::from_env()?,
        })
    }
}
