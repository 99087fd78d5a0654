mod fallback;
mod node;

pub use fallback::RpcFallbackProvider;
pub use node::NodeWalletProvider;

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tc_api_types::{AccountAddress, ChainId, ErrorKind, TxHash};
use tc_rpc::{RpcError, TxReceipt, to_hex_prefixed};
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no injected wallet provider found")]
    NoWalletFound,

    #[error("user rejected the wallet request")]
    UserRejected,

    #[error("a wallet request is already pending")]
    AlreadyPending,

    #[error("no signing-capable provider available")]
    SigningUnavailable,

    #[error("wallet does not know chain {0}")]
    UnknownChain(ChainId),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::NoWalletFound => ErrorKind::NoWalletFound,
            ProviderError::UserRejected => ErrorKind::UserRejected,
            ProviderError::AlreadyPending => ErrorKind::AlreadyPending,
            ProviderError::SigningUnavailable => ErrorKind::SigningUnavailable,
            ProviderError::UnknownChain(_) => ErrorKind::NetworkUnknownToWallet,
            ProviderError::Rpc(_) | ProviderError::InvalidResponse(_) => ErrorKind::RpcUnavailable,
        }
    }
}

/// Native change notifications from the injected provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<AccountAddress>),
    ChainChanged(ChainId),
    Disconnected,
}

/// Transaction to be signed and submitted by the wallet. Registry calls
/// carry no value transfer, so `value` defaults to zero and is omitted from
/// the wire params when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: AccountAddress,
    pub to: AccountAddress,
    pub data: Vec<u8>,
    pub value: u128,
}

impl TransactionRequest {
    pub fn new(from: AccountAddress, to: AccountAddress, data: Vec<u8>) -> Self {
        Self {
            from,
            to,
            data,
            value: 0,
        }
    }

    pub fn to_params(&self) -> Value {
        let mut params = json!({
            "from": self.from.as_str(),
            "to": self.to.as_str(),
            "data": to_hex_prefixed(&self.data),
        });
        if self.value > 0 {
            params["value"] = json!(format!("0x{:x}", self.value));
        }
        params
    }
}

/// One interface over the injected wallet object or a fallback endpoint.
///
/// Implementations must treat a missing wallet as the `NoWalletFound`
/// condition and must never satisfy a signing operation through a
/// read-only path.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// The "wallet installed?" probe.
    fn is_available(&self) -> bool;

    /// Prompting authorization request.
    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError>;

    /// Silent query for accounts the wallet has already authorized.
    /// Must never prompt the user.
    async fn authorized_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError>;

    async fn chain_id(&self) -> Result<ChainId, ProviderError>;

    async fn switch_chain(&self, target: ChainId) -> Result<(), ProviderError>;

    /// A fresh handle bound to `account`. Handles are replaced wholesale on
    /// account change; callers must not cache one across accounts.
    async fn signing_handle(
        &self,
        account: &AccountAddress,
    ) -> Result<Arc<dyn SigningHandle>, ProviderError>;

    /// Read-only contract call through this provider.
    async fn read_call(
        &self,
        to: &AccountAddress,
        data: &[u8],
    ) -> Result<Vec<u8>, ProviderError>;

    /// Stream of native change notifications.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ProviderEvent>;
}

/// Signs and submits transactions for one fixed account.
#[async_trait]
pub trait SigningHandle: Send + Sync {
    fn account(&self) -> &AccountAddress;

    async fn send_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<TxHash, ProviderError>;

    /// Resolves once the transaction is included, with the provider's own
    /// confirmation semantics. No artificial timeout.
    async fn confirm(&self, hash: &TxHash) -> Result<TxReceipt, ProviderError>;

    /// Signing surface handed to the identity provider.
    async fn sign_message(&self, payload: &[u8]) -> Result<Vec<u8>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_params_omit_zero_value() {
        let from = AccountAddress::parse("0x1000000000000000000000000000000000000001").unwrap();
        let to = AccountAddress::parse("0x2000000000000000000000000000000000000002").unwrap();
        let request = TransactionRequest::new(from, to, vec![0xab, 0xcd]);

        let params = request.to_params();
        assert_eq!(params["data"], "0xabcd");
        assert!(params.get("value").is_none());

        let mut valued = request;
        valued.value = 255;
        assert_eq!(valued.to_params()["value"], "0xff");
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(ProviderError::NoWalletFound.kind(), ErrorKind::NoWalletFound);
        assert_eq!(
            ProviderError::UnknownChain(ChainId(999)).kind(),
            ErrorKind::NetworkUnknownToWallet
        );
        assert_eq!(
            ProviderError::Rpc(RpcError::Transport("boom".to_owned())).kind(),
            ErrorKind::RpcUnavailable
        );
    }
}
