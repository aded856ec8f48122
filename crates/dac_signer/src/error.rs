#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("signing key is malformed: {0}")]
    InvalidKey(String),
    #[error("underlying ECDSA signing operation failed: {0}")]
    SigningFailed(String),
}

pub type SignerResult<T> = Result<T, SignerError>;
