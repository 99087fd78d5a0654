use crate::{ProviderError, ProviderEvent, SigningHandle, TransactionRequest, WalletProvider};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tc_api_types::{AccountAddress, ChainId, TxHash};
use tc_rpc::{RpcClient, RpcError, TxReceipt, from_hex, to_hex_prefixed};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::debug;

// EIP-1193 provider error codes.
const CODE_USER_REJECTED: i64 = 4001;
const CODE_REQUEST_PENDING: i64 = -32002;

/// Wallet adapter over a node that custodies its own accounts (a dev node,
/// or a wallet daemon speaking the same JSON-RPC surface). The node signs;
/// this adapter only routes.
pub struct NodeWalletProvider {
    url: url::Url,
    client: Arc<RpcClient>,
    poll_interval: Duration,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ProviderEvent>>>,
}

impl NodeWalletProvider {
    pub fn new(url: url::Url) -> Self {
        Self {
            url,
            client: Arc::new(RpcClient::new()),
            poll_interval: Duration::from_millis(500),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn accounts(&self, method: &str) -> Result<Vec<AccountAddress>, ProviderError> {
        let result = self
            .client
            .request(&self.url, method, json!([]))
            .await
            .map_err(map_wallet_rpc_error)?;
        parse_accounts(&result)
    }
}

#[async_trait]
impl WalletProvider for NodeWalletProvider {
    fn is_available(&self) -> bool {
        true
    }

    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        let accounts = self.accounts("eth_requestAccounts").await?;
        if accounts.is_empty() {
            // Nothing on the other side can sign.
            return Err(ProviderError::NoWalletFound);
        }
        Ok(accounts)
    }

    async fn authorized_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        self.accounts("eth_accounts").await
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        Ok(self.client.chain_id(&self.url).await?)
    }

    async fn switch_chain(&self, target: ChainId) -> Result<(), ProviderError> {
        // A single node serves a single chain.
        Err(ProviderError::UnknownChain(target))
    }

    async fn signing_handle(
        &self,
        account: &AccountAddress,
    ) -> Result<Arc<dyn SigningHandle>, ProviderError> {
        Ok(Arc::new(NodeSigningHandle {
            account: account.clone(),
            url: self.url.clone(),
            client: self.client.clone(),
            poll_interval: self.poll_interval,
        }))
    }

    async fn read_call(
        &self,
        to: &AccountAddress,
        data: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        Ok(self.client.call(&self.url, to, data).await?)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ProviderEvent> {
        // Plain nodes push no change notifications; the channel stays open
        // and silent.
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().expect("subscriber lock").push(tx);
        rx
    }
}

struct NodeSigningHandle {
    account: AccountAddress,
    url: url::Url,
    client: Arc<RpcClient>,
    poll_interval: Duration,
}

#[async_trait]
impl SigningHandle for NodeSigningHandle {
    fn account(&self) -> &AccountAddress {
        &self.account
    }

    async fn send_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<TxHash, ProviderError> {
        let result = self
            .client
            .request(&self.url, "eth_sendTransaction", json!([request.to_params()]))
            .await
            .map_err(map_wallet_rpc_error)?;
        let hash = result.as_str().ok_or_else(|| {
            ProviderError::InvalidResponse("eth_sendTransaction must return a hash".to_owned())
        })?;
        Ok(TxHash(hash.to_owned()))
    }

    async fn confirm(&self, hash: &TxHash) -> Result<TxReceipt, ProviderError> {
        loop {
            match self.client.transaction_receipt(&self.url, hash).await? {
                Some(receipt) => return Ok(receipt),
                None => {
                    debug!(tx = %hash, "transaction not yet mined");
                    sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn sign_message(&self, payload: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let params = json!([to_hex_prefixed(payload), self.account.as_str()]);
        let result = self
            .client
            .request(&self.url, "personal_sign", params)
            .await
            .map_err(map_wallet_rpc_error)?;
        let raw = result.as_str().ok_or_else(|| {
            ProviderError::InvalidResponse("personal_sign must return hex".to_owned())
        })?;
        Ok(from_hex(raw)?)
    }
}

/// Wallet-flavored JSON-RPC error codes carry user intent; everything else
/// stays an RPC-layer failure.
fn map_wallet_rpc_error(err: RpcError) -> ProviderError {
    match err {
        RpcError::Rpc {
            code: CODE_USER_REJECTED,
            ..
        } => ProviderError::UserRejected,
        RpcError::Rpc {
            code: CODE_REQUEST_PENDING,
            ..
        } => ProviderError::AlreadyPending,
        other => ProviderError::Rpc(other),
    }
}

fn parse_accounts(result: &Value) -> Result<Vec<AccountAddress>, ProviderError> {
    let entries = result.as_array().ok_or_else(|| {
        ProviderError::InvalidResponse("accounts result must be an array".to_owned())
    })?;
    let mut accounts = Vec::with_capacity(entries.len());
    for entry in entries {
        let raw = entry.as_str().ok_or_else(|| {
            ProviderError::InvalidResponse("account entry must be a string".to_owned())
        })?;
        let account = AccountAddress::parse(raw)
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;
        accounts.push(account);
    }
    Ok(accounts)
}
