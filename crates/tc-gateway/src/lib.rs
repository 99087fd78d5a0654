pub mod abi;
mod gateway;
mod methods;
mod roles;

pub use gateway::{MethodAdapter, RegistryGateway};
pub use methods::{
    ADD_SELLER, ADMIN, DECLARE_SUCCESSOR, IS_SELLER, METHODS, MethodDescriptor, MethodKind,
    PRODUCT_OWNER, REGISTER_PRODUCT, SUCCESSOR_OF, TRANSFER_PRODUCT, VERIFY_PRODUCT, descriptor,
};
pub use roles::{RoleFlags, resolve_roles};

use tc_api_types::{ErrorKind, TxHash};
use tc_provider::ProviderError;
use tc_rpc::RpcError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no signing handle bound to the gateway")]
    SigningUnavailable,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("transaction {hash} reverted on-chain")]
    Reverted { hash: TxHash },

    #[error("{method} expects {expected} arguments, got {got}")]
    Arity {
        method: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("abi decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::SigningUnavailable => ErrorKind::SigningUnavailable,
            GatewayError::Provider(err) => err.kind(),
            GatewayError::Rpc(_) => ErrorKind::RpcUnavailable,
            GatewayError::Reverted { .. } => ErrorKind::TransactionFailed,
            GatewayError::Arity { .. } | GatewayError::Decode(_) => ErrorKind::RpcUnavailable,
        }
    }
}
