use crate::{ProviderError, ProviderEvent, SigningHandle, WalletProvider};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tc_api_types::{AccountAddress, ChainId};
use tc_rpc::{EndpointPool, RetryPolicy, RpcClient};
use tokio::sync::mpsc;
use tracing::debug;

/// Read-only provider over the public endpoint pool, used when no wallet is
/// injected. It answers reads and chain identity; anything that needs user
/// authorization or a signature fails explicitly instead of degrading.
pub struct RpcFallbackProvider {
    pool: EndpointPool,
    client: RpcClient,
    retry: RetryPolicy,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ProviderEvent>>>,
}

impl RpcFallbackProvider {
    pub fn new(pool: EndpointPool, retry: RetryPolicy) -> Self {
        Self {
            pool,
            client: RpcClient::new(),
            retry,
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WalletProvider for RpcFallbackProvider {
    fn is_available(&self) -> bool {
        false
    }

    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        Err(ProviderError::NoWalletFound)
    }

    async fn authorized_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        Ok(Vec::new())
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        let client = &self.client;
        let chain = self
            .pool
            .execute_with_fallback(&self.retry, |url| async move {
                client.chain_id(&url).await
            })
            .await?;
        Ok(chain)
    }

    async fn switch_chain(&self, target: ChainId) -> Result<(), ProviderError> {
        debug!(%target, "switch_chain on read-only fallback provider");
        Err(ProviderError::NoWalletFound)
    }

    async fn signing_handle(
        &self,
        _account: &AccountAddress,
    ) -> Result<Arc<dyn SigningHandle>, ProviderError> {
        Err(ProviderError::SigningUnavailable)
    }

    async fn read_call(
        &self,
        to: &AccountAddress,
        data: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        let client = &self.client;
        let bytes = self
            .pool
            .execute_with_fallback(&self.retry, |url| async move {
                client.call(&url, to, data).await
            })
            .await?;
        Ok(bytes)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ProviderEvent> {
        // A fallback endpoint has no native notifications; the channel stays
        // open and silent.
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().expect("subscriber lock").push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> RpcFallbackProvider {
        RpcFallbackProvider::new(EndpointPool::default(), RetryPolicy::default())
    }

    #[tokio::test]
    async fn signing_paths_fail_explicitly() {
        let provider = provider();
        assert!(matches!(
            provider.request_accounts().await,
            Err(ProviderError::NoWalletFound)
        ));
        let account =
            AccountAddress::parse("0x1000000000000000000000000000000000000001").unwrap();
        assert!(matches!(
            provider.signing_handle(&account).await,
            Err(ProviderError::SigningUnavailable)
        ));
    }

    #[tokio::test]
    async fn silent_account_query_is_empty_not_an_error() {
        let provider = provider();
        assert_eq!(provider.authorized_accounts().await.unwrap(), Vec::new());
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn subscription_stays_open_without_events() {
        let provider = provider();
        let mut rx = provider.subscribe();
        assert!(rx.try_recv().is_err());
        // Sender side is retained by the provider, so the channel is not
        // reported as closed.
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Empty)
        ));
    }
}
