//! 外部协作服务的 HTTP 客户端

pub mod grading_client;
pub mod identity_client;

#[cfg(test)]
pub(crate) mod test_server;

pub use grading_client::{GradingClient, HttpGradingClient};
pub use identity_client::{HttpIdentityVerifier, IdentityVerifier};
