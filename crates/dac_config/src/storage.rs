use dac_storage::RetryPolicy;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Which [`dac_storage::StorageAdapter`] the node constructs at startup.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    Memory,
    RocksDb { path: String },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Validate)]
pub struct CertificatesConfig {
    #[validate(length(min = 1))]
    pub certificates_path: String,
    #[validate(length(min = 1))]
    pub private_key_path: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    pub base_delay_millis: u64,
    pub max_delay_millis: u64,
    pub max_attempts: usize,
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        RetryPolicy {
            base_delay_millis: config.base_delay_millis,
            max_delay_millis: config.max_delay_millis,
            max_attempts: config.max_attempts,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let default = RetryPolicy::default();
        RetryConfig {
            base_delay_millis: default.base_delay_millis,
            max_delay_millis: default.max_delay_millis,
            max_attempts: default.max_attempts,
        }
    }
}
