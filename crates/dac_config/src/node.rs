use std::path::Path;

use dac_types::Profile;
use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::error::{ConfigError, ConfigResult};
use crate::storage::{CertificatesConfig, RetryConfig, StorageConfig};

/// Everything a `run` invocation needs before it may touch the gateway or storage
/// (spec.md §6). Loaded once from a single JSON file; there is no CLI param-dumping layer
/// here (see DESIGN.md — out of scope per spec.md §1's external-collaborator boundary).
///
/// `tree_height` is operator-supplied (spec.md §6 lists it as its own enumerated config
/// option) but must agree with the height the chosen `profile` fixes in code (spec.md
/// §9's auxiliary-roots resolution); `validate` rejects a mismatch the same way it rejects
/// an out-of-range value, so a typo'd height can never silently diverge from the profile.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "tree_height_matches_profile"))]
pub struct NodeConfig {
    pub availability_gateway_endpoint: Url,
    pub certificates: CertificatesConfig,
    pub storage: StorageConfig,
    #[validate(range(min = 1))]
    pub polling_interval_seconds: u64,
    pub profile: Profile,
    #[validate(range(min = 1, max = 64))]
    pub tree_height: u32,
    #[validate(range(min = 1))]
    pub max_delta_size: usize,
    #[serde(default)]
    pub storage_retry: RetryConfig,
    #[validate(length(min = 1))]
    pub signer_id: String,
}

fn tree_height_matches_profile(config: &NodeConfig) -> Result<(), validator::ValidationError> {
    if config.tree_height != config.profile.state_tree_height() {
        return Err(validator::ValidationError::new(
            "tree_height must match the height fixed by profile",
        ));
    }
    Ok(())
}

impl NodeConfig {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: NodeConfig =
            serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn valid_json() -> serde_json::Value {
        serde_json::json!({
            "availability_gateway_endpoint": "https://gateway.example.com/",
            "certificates": { "certificates_path": "/etc/dac/certs", "private_key_path": "/etc/dac/key.hex" },
            "storage": { "backend": "memory" },
            "polling_interval_seconds": 5,
            "profile": "stark_ex",
            "tree_height": 31,
            "max_delta_size": 5000,
            "signer_id": "committee-member-0",
        })
    }

    fn write_config(value: &serde_json::Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(value.to_string().as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_a_valid_config() {
        let file = write_config(&valid_json());
        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.profile, Profile::StarkEx);
    }

    #[test]
    fn rejects_an_out_of_range_polling_interval() {
        let mut json = valid_json();
        json["polling_interval_seconds"] = serde_json::json!(0);
        let file = write_config(&json);
        assert!(matches!(NodeConfig::load(file.path()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_an_out_of_range_tree_height() {
        let mut json = valid_json();
        json["tree_height"] = serde_json::json!(0);
        let file = write_config(&json);
        assert!(matches!(NodeConfig::load(file.path()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_a_tree_height_that_does_not_match_the_profile() {
        let mut json = valid_json();
        json["tree_height"] = serde_json::json!(64);
        let file = write_config(&json);
        assert!(matches!(NodeConfig::load(file.path()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_a_missing_file() {
        assert!(matches!(
            NodeConfig::load(Path::new("/nonexistent/dac.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        assert!(matches!(NodeConfig::load(file.path()), Err(ConfigError::Parse { .. })));
    }
}
