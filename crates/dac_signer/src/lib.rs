pub mod attestation;
pub mod error;
pub mod message;
pub mod signer;

pub use attestation::{Attestation, Signature};
pub use error::{SignerError, SignerResult};
pub use message::attestation_message_hash;
pub use signer::{AttestationSigner, StaticKeySigner};

#[cfg(feature = "testing")]
pub use signer::MockAttestationSigner;
