pub mod client;
pub mod error;
pub mod retry;
pub mod wire;

pub use client::{GatewayClient, HttpGatewayClient, SubmittedSignature};
pub use error::{GatewayClientError, GatewayClientResult};
pub use retry::GatewayRetryPolicy;

#[cfg(feature = "testing")]
pub use client::MockGatewayClient;
