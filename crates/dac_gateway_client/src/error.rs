use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum GatewayClientError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("gateway returned status {0}")]
    BadStatus(StatusCode),
    #[error("gateway response did not match the expected schema: {0}")]
    InvalidResponse(String),
    #[error("gateway rejected the submission: {0}")]
    Rejected(String),
}

impl GatewayClientError {
    /// Network errors and 5xx responses are worth retrying; 4xx responses are a
    /// structural rejection the caller must handle explicitly (spec.md §4.5).
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayClientError::Request(e) => !e.is_status() || e.is_timeout() || e.is_connect(),
            GatewayClientError::BadStatus(status) => status.is_server_error(),
            GatewayClientError::InvalidResponse(_) | GatewayClientError::Rejected(_) => false,
        }
    }
}

pub type GatewayClientResult<T> = Result<T, GatewayClientError>;
