mod bridge;
mod session;

pub use session::WalletSession;

pub use tc_api_types::{ConnectionSnapshot, ConnectionStatus, ErrorKind, SwitchOutcome};
pub use tc_gateway::RegistryGateway;

use anyhow::Context;
use tc_api_types::AccountAddress;
use tc_gateway::GatewayError;
use tc_provider::ProviderError;
use tc_rpc::{EndpointPool, RetryPolicy};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl SessionError {
    pub fn kind(&self) -> tc_api_types::ErrorKind {
        match self {
            SessionError::Provider(err) => err.kind(),
            SessionError::Gateway(err) => err.kind(),
        }
    }
}

/// Connectivity configuration: the registry contract address plus the
/// read-only fallback pool and its retry schedule.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub registry: AccountAddress,
    pub endpoints: EndpointPool,
    pub retry: RetryPolicy,
}

impl SessionConfig {
    pub fn new(registry: AccountAddress) -> Self {
        Self {
            registry,
            endpoints: EndpointPool::from_env(),
            retry: RetryPolicy::default(),
        }
    }

    /// Registry address from `TRACECORTEX_REGISTRY`, endpoints from
    /// `TRACECORTEX_RPC_URLS`.
    pub fn from_env() -> anyhow::Result<Self> {
        let raw = std::env::var("TRACECORTEX_REGISTRY")
            .context("TRACECORTEX_REGISTRY is not set")?;
        let registry = AccountAddress::parse(&raw)
            .with_context(|| format!("invalid TRACECORTEX_REGISTRY: {raw}"))?;
        Ok(Self::new(registry))
    }
}
