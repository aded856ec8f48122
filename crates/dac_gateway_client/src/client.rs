use std::time::Duration;

use async_trait::async_trait;
use dac_types::{BatchDescriptor, BatchId, Felt};
use url::Url;

use crate::error::{GatewayClientError, GatewayClientResult};
use crate::retry::GatewayRetryPolicy;
use crate::wire::{ApproveNewRootsRequest, BatchDataResponse, SignatureWire};

const GET_BATCH_DATA_PATH: &str = "availability_gateway/get_batch_data";
const GET_LAST_BATCH_ID_PATH: &str = "availability_gateway/get_last_batch_id";
const APPROVE_NEW_ROOTS_PATH: &str = "availability_gateway/approve_new_roots";

/// Operator's signature share over a batch's claimed roots, as submitted to
/// `approve_new_roots`. Deliberately a plain value type: the client has no opinion on
/// how `r`/`s` were produced (see dac_signer for that).
#[derive(Clone, Copy, Debug)]
pub struct SubmittedSignature {
    pub r: Felt,
    pub s: Felt,
}

/// Stateless façade over the availability gateway's HTTP surface (spec.md §4.5/§6).
/// [`HttpGatewayClient`] retries network faults and 5xx responses with capped exponential
/// backoff at this boundary (spec.md §4.5); 4xx responses are returned as structural
/// errors without retry.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn get_batch_info(&self, batch_id: BatchId) -> GatewayClientResult<Option<BatchDescriptor>>;

    async fn get_latest_batch_id(&self) -> GatewayClientResult<BatchId>;

    async fn send_signature(
        &self,
        batch_id: BatchId,
        claim_hash: Felt,
        signature: SubmittedSignature,
        signer_id: &str,
    ) -> GatewayClientResult<()>;
}

pub struct HttpGatewayClient {
    base_url: Url,
    client: reqwest::Client,
    timeout: Duration,
    retry: GatewayRetryPolicy,
}

impl HttpGatewayClient {
    /// Builds the underlying `reqwest::Client` with mutual TLS: `identity_pem` is the
    /// concatenated client certificate and key, `server_root_pem` pins the expected
    /// server certificate so the client trusts only the committee's own gateway.
    pub fn new(
        base_url: Url,
        identity_pem: &[u8],
        server_root_pem: &[u8],
        timeout: Duration,
    ) -> GatewayClientResult<Self> {
        let identity = reqwest::Identity::from_pem(identity_pem)?;
        let root_cert = reqwest::Certificate::from_pem(server_root_pem)?;
        let client = reqwest::Client::builder()
            .identity(identity)
            .add_root_certificate(root_cert)
            .tls_built_in_root_certs(false)
            .build()?;
        Ok(Self { base_url, client, timeout, retry: GatewayRetryPolicy::default() })
    }

    fn endpoint(&self, path: &str) -> GatewayClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayClientError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn get_batch_info(&self, batch_id: BatchId) -> GatewayClientResult<Option<BatchDescriptor>> {
        let url = self.endpoint(GET_BATCH_DATA_PATH)?;
        let body: Option<BatchDataResponse> = self
            .retry
            .run(|| async {
                let response = self
                    .client
                    .get(url.clone())
                    .query(&[("batch_id", batch_id.0)])
                    .timeout(self.timeout)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    tracing::warn!(status = %response.status(), %batch_id, "get_batch_data failed");
                    return Err(GatewayClientError::BadStatus(response.status()));
                }
                Ok(response.json().await?)
            })
            .await?;

        body.map(BatchDataResponse::into_descriptor).transpose()
    }

    async fn get_latest_batch_id(&self) -> GatewayClientResult<BatchId> {
        let url = self.endpoint(GET_LAST_BATCH_ID_PATH)?;
        let id: u64 = self
            .retry
            .run(|| async {
                let response = self.client.get(url.clone()).timeout(self.timeout).send().await?;
                if !response.status().is_success() {
                    return Err(GatewayClientError::BadStatus(response.status()));
                }
                Ok(response.json().await?)
            })
            .await?;
        Ok(BatchId(id))
    }

    async fn send_signature(
        &self,
        batch_id: BatchId,
        claim_hash: Felt,
        signature: SubmittedSignature,
        signer_id: &str,
    ) -> GatewayClientResult<()> {
        let url = self.endpoint(APPROVE_NEW_ROOTS_PATH)?;
        let request = ApproveNewRootsRequest {
            batch_id: batch_id.0,
            signature: SignatureWire { r: signature.r.to_hex(), s: signature.s.to_hex() },
            claim_hash: claim_hash.to_hex(),
            member_key: signer_id.to_string(),
        };
        self.retry
            .run(|| async {
                let response =
                    self.client.post(url.clone()).timeout(self.timeout).json(&request).send().await?;

                let status = response.status();
                if status.is_success() {
                    Ok(())
                } else if status.is_client_error() {
                    let body = response.text().await.unwrap_or_default();
                    Err(GatewayClientError::Rejected(format!("{status}: {body}")))
                } else {
                    Err(GatewayClientError::BadStatus(status))
                }
            })
            .await
    }
}
