use std::time::Duration;

use dac_committee_loop::CommitteeLoopConfig;
use dac_config::NodeConfig;
use dac_gateway_client::HttpGatewayClient;
use dac_signer::StaticKeySigner;

use crate::error::{NodeError, NodeResult};
use crate::storage::{self, NodeStorage};

/// Default per-call HTTP timeout for the gateway client. Not yet exposed in
/// `NodeConfig` (spec.md §6 enumerates no such field); revisit if an operator needs it
/// tuned independently of `polling_interval_seconds`.
const GATEWAY_CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_storage(config: &NodeConfig) -> NodeResult<NodeStorage> {
    storage::open(&config.storage, config.storage_retry.into())
}

fn read_cert_file(dir: &str, name: &str) -> NodeResult<Vec<u8>> {
    let path = format!("{dir}/{name}");
    std::fs::read(&path).map_err(|source| NodeError::Io { path, source })
}

/// Builds the mTLS gateway client from the certificate directory named by
/// `certificates.certificates_path` (spec.md §6: `user.crt`, `user.key`, `server.crt`).
pub fn build_gateway_client(config: &NodeConfig) -> NodeResult<HttpGatewayClient> {
    let dir = &config.certificates.certificates_path;
    let mut identity_pem = read_cert_file(dir, "user.crt")?;
    identity_pem.extend(read_cert_file(dir, "user.key")?);
    let server_root_pem = read_cert_file(dir, "server.crt")?;

    Ok(HttpGatewayClient::new(
        config.availability_gateway_endpoint.clone(),
        &identity_pem,
        &server_root_pem,
        GATEWAY_CALL_TIMEOUT,
    )?)
}

/// Loads the committee member's signing key (spec.md §6: `private_key_path`, a hex file).
pub fn build_signer(config: &NodeConfig) -> NodeResult<StaticKeySigner> {
    let path = &config.certificates.private_key_path;
    let raw = std::fs::read_to_string(path)
        .map_err(|source| NodeError::Io { path: path.clone(), source })?;
    Ok(StaticKeySigner::from_hex(raw.trim())?)
}

pub fn committee_loop_config(config: &NodeConfig) -> CommitteeLoopConfig {
    CommitteeLoopConfig {
        profile: config.profile,
        max_delta_size: config.max_delta_size,
        polling_interval: Duration::from_secs(config.polling_interval_seconds),
        // Reuses the storage retry's base delay: both are "how long to wait before
        // trying the same recoverable operation again", and NodeConfig enumerates no
        // separate knob for it (spec.md §6).
        recoverable_error_sleep: Duration::from_millis(config.storage_retry.base_delay_millis),
        signer_id: config.signer_id.clone(),
    }
}
