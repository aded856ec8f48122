use async_trait::async_trait;
use dac_types::{BatchId, Felt};
use starknet_crypto::{rfc6979_generate_k, sign};
use starknet_ff::FieldElement;

use crate::attestation::{Attestation, Signature};
use crate::error::{SignerError, SignerResult};
use crate::message::attestation_message_hash;

/// Everything the committee loop is allowed to do to the signing key: produce an
/// attestation for a batch. The key itself, and raw signing over arbitrary messages, are
/// not reachable through this trait (spec.md §9 redesign hint: narrow capabilities at
/// component seams rather than exposing a generic "signer").
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait AttestationSigner: Send + Sync {
    async fn sign_attestation(&self, batch_id: BatchId, roots: Vec<Felt>) -> SignerResult<Attestation>;
}

/// Signs with a single static ECDSA key held in process memory. The nonce is derived
/// deterministically via RFC-6979 so the same `(batch_id, roots)` always produces the
/// same signature, which keeps retried attestations idempotent at the consumer.
pub struct StaticKeySigner {
    private_key: FieldElement,
}

impl StaticKeySigner {
    pub fn from_hex(hex: &str) -> SignerResult<Self> {
        let felt = Felt::from_hex(hex).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self { private_key: felt.0 })
    }
}

#[async_trait]
impl AttestationSigner for StaticKeySigner {
    async fn sign_attestation(&self, batch_id: BatchId, roots: Vec<Felt>) -> SignerResult<Attestation> {
        let message = attestation_message_hash(batch_id, &roots);
        let k = rfc6979_generate_k(&message.0, &self.private_key, None);
        let signature = sign(&self.private_key, &message.0, &k)
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;
        Ok(Attestation {
            batch_id,
            roots,
            signature: Signature { r: Felt(signature.r), s: Felt(signature.s) },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> StaticKeySigner {
        StaticKeySigner::from_hex("0x1").unwrap()
    }

    #[tokio::test]
    async fn signing_is_deterministic() {
        let signer = signer();
        let roots = vec![Felt::from_u64(7)];
        let first = signer.sign_attestation(BatchId(1), roots.clone()).await.unwrap();
        let second = signer.sign_attestation(BatchId(1), roots).await.unwrap();
        assert_eq!(first.signature, second.signature);
    }

    #[tokio::test]
    async fn different_batches_yield_different_signatures() {
        let signer = signer();
        let roots = vec![Felt::from_u64(7)];
        let first = signer.sign_attestation(BatchId(1), roots.clone()).await.unwrap();
        let second = signer.sign_attestation(BatchId(2), roots).await.unwrap();
        assert_ne!(first.signature, second.signature);
    }

    #[tokio::test]
    async fn rejects_malformed_key() {
        let bytes = [0xffu8; 40];
        let hex = format!("0x{}", hex::encode(bytes));
        assert!(StaticKeySigner::from_hex(&hex).is_err());
    }
}
