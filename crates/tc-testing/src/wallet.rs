use crate::registry::MockRegistry;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tc_api_types::{AccountAddress, ChainId, TxHash};
use tc_crypto::{Secp256k1Signer, SignPurpose, Signer, keccak256};
use tc_gateway::IS_SELLER;
use tc_gateway::abi;
use tc_provider::{
    ProviderError, ProviderEvent, SigningHandle, TransactionRequest, WalletProvider,
};
use tc_rpc::{RpcError, TxReceipt, to_hex_prefixed};
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Where the mock registry contract "lives".
pub const REGISTRY_ADDRESS: &str = "0x00000000000000000000000000000000000000fe";

/// Opens a gate previously installed on the mock wallet. Dropping the gate
/// without calling `open` also releases any waiters.
pub struct Gate {
    tx: watch::Sender<bool>,
}

impl Gate {
    pub fn open(&self) {
        let _ = self.tx.send(true);
    }
}

struct MockAccount {
    address: AccountAddress,
    signer: Arc<Secp256k1Signer>,
}

struct WalletInner {
    installed: bool,
    chain: ChainId,
    known_chains: HashSet<ChainId>,
    registry_address: AccountAddress,
    registry: MockRegistry,
    accounts: Vec<MockAccount>,
    authorized: Vec<AccountAddress>,
    prompt_count: usize,
    silent_count: usize,
    reject_next_prompt: bool,
    prompt_pending: bool,
    prompt_gate: Option<watch::Receiver<bool>>,
    read_gate: Option<(watch::Receiver<bool>, AccountAddress)>,
    fail_reads: bool,
    subscribers: Vec<mpsc::UnboundedSender<ProviderEvent>>,
    receipts: std::collections::HashMap<String, TxReceipt>,
    tx_counter: u64,
}

/// Scriptable injected-wallet stand-in. Behaves like a cooperative wallet
/// extension by default; tests can gate prompts and reads, script
/// rejections, and inject the native change notifications.
#[derive(Clone)]
pub struct MockWallet {
    inner: Arc<Mutex<WalletInner>>,
}

impl MockWallet {
    pub fn installed(chain: ChainId) -> Self {
        let signer = Arc::new(Secp256k1Signer::new_random());
        let address = signer.wallet_address();
        let mut known_chains = HashSet::new();
        known_chains.insert(chain);
        Self {
            inner: Arc::new(Mutex::new(WalletInner {
                installed: true,
                chain,
                known_chains,
                registry_address: AccountAddress::parse(REGISTRY_ADDRESS)
                    .expect("registry address constant parses"),
                registry: MockRegistry::default(),
                accounts: vec![MockAccount {
                    address: address.clone(),
                    signer,
                }],
                authorized: vec![address],
                prompt_count: 0,
                silent_count: 0,
                reject_next_prompt: false,
                prompt_pending: false,
                prompt_gate: None,
                read_gate: None,
                fail_reads: false,
                subscribers: Vec::new(),
                receipts: std::collections::HashMap::new(),
                tx_counter: 0,
            })),
        }
    }

    /// No wallet extension present at all.
    pub fn missing() -> Self {
        let wallet = Self::installed(ChainId(1));
        wallet.lock().installed = false;
        wallet
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WalletInner> {
        self.inner.lock().expect("mock wallet lock")
    }

    pub fn primary_account(&self) -> AccountAddress {
        self.lock().accounts[0].address.clone()
    }

    /// Generates a fresh keypair, authorizes it, and returns its address.
    pub fn add_account(&self) -> AccountAddress {
        let signer = Arc::new(Secp256k1Signer::new_random());
        let address = signer.wallet_address();
        let mut inner = self.lock();
        inner.accounts.push(MockAccount {
            address: address.clone(),
            signer,
        });
        inner.authorized.push(address.clone());
        address
    }

    pub fn set_authorized(&self, accounts: &[AccountAddress]) {
        self.lock().authorized = accounts.to_vec();
    }

    pub fn registry_address(&self) -> AccountAddress {
        self.lock().registry_address.clone()
    }

    pub fn registry<R>(&self, mutate: impl FnOnce(&mut MockRegistry) -> R) -> R {
        mutate(&mut self.lock().registry)
    }

    pub fn add_known_chain(&self, chain: ChainId) {
        self.lock().known_chains.insert(chain);
    }

    pub fn set_chain(&self, chain: ChainId) {
        self.lock().chain = chain;
    }

    pub fn reject_next_prompt(&self) {
        self.lock().reject_next_prompt = true;
    }

    /// Subsequent authorization prompts block until the gate opens.
    pub fn gate_prompts(&self) -> Gate {
        let (tx, rx) = watch::channel(false);
        self.lock().prompt_gate = Some(rx);
        Gate { tx }
    }

    /// Subsequent `isSeller` reads for `account` block until the gate opens.
    pub fn gate_reads_for(&self, account: &AccountAddress) -> Gate {
        let (tx, rx) = watch::channel(false);
        self.lock().read_gate = Some((rx, account.clone()));
        Gate { tx }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn prompt_count(&self) -> usize {
        self.lock().prompt_count
    }

    pub fn silent_count(&self) -> usize {
        self.lock().silent_count
    }

    pub fn sent_transactions(&self) -> u64 {
        self.lock().tx_counter
    }

    /// Live notification subscriptions (closed channels are pruned first).
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|subscriber| !subscriber.is_closed());
        inner.subscribers.len()
    }

    pub fn emit_accounts_changed(&self, accounts: Vec<AccountAddress>) {
        self.broadcast(ProviderEvent::AccountsChanged(accounts));
    }

    /// Switches the reported chain and notifies subscribers, as a wallet
    /// does when the user changes networks from the extension UI.
    pub fn emit_chain_changed(&self, chain: ChainId) {
        self.lock().chain = chain;
        self.broadcast(ProviderEvent::ChainChanged(chain));
    }

    pub fn emit_disconnect(&self) {
        self.broadcast(ProviderEvent::Disconnected);
    }

    fn broadcast(&self, event: ProviderEvent) {
        let mut inner = self.lock();
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn signer_for(&self, account: &AccountAddress) -> Option<Arc<Secp256k1Signer>> {
        self.lock()
            .accounts
            .iter()
            .find(|entry| entry.address == *account)
            .map(|entry| entry.signer.clone())
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn is_available(&self) -> bool {
        self.lock().installed
    }

    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        let gate = {
            let mut inner = self.lock();
            if !inner.installed {
                return Err(ProviderError::NoWalletFound);
            }
            if inner.prompt_pending {
                return Err(ProviderError::AlreadyPending);
            }
            inner.prompt_count += 1;
            if inner.reject_next_prompt {
                inner.reject_next_prompt = false;
                return Err(ProviderError::UserRejected);
            }
            inner.prompt_pending = true;
            inner.prompt_gate.clone()
        };

        if let Some(mut rx) = gate {
            let _ = rx.wait_for(|open| *open).await;
        }

        let mut inner = self.lock();
        inner.prompt_pending = false;
        Ok(inner.authorized.clone())
    }

    async fn authorized_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        let mut inner = self.lock();
        if !inner.installed {
            return Err(ProviderError::NoWalletFound);
        }
        inner.silent_count += 1;
        Ok(inner.authorized.clone())
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        let inner = self.lock();
        if !inner.installed {
            return Err(ProviderError::NoWalletFound);
        }
        Ok(inner.chain)
    }

    async fn switch_chain(&self, target: ChainId) -> Result<(), ProviderError> {
        {
            let inner = self.lock();
            if !inner.installed {
                return Err(ProviderError::NoWalletFound);
            }
            if !inner.known_chains.contains(&target) {
                return Err(ProviderError::UnknownChain(target));
            }
        }
        self.emit_chain_changed(target);
        Ok(())
    }

    async fn signing_handle(
        &self,
        account: &AccountAddress,
    ) -> Result<Arc<dyn SigningHandle>, ProviderError> {
        if !self.lock().installed {
            return Err(ProviderError::SigningUnavailable);
        }
        let signer = self.signer_for(account).ok_or_else(|| {
            ProviderError::InvalidResponse(format!("unknown account {account}"))
        })?;
        Ok(Arc::new(MockSigningHandle {
            wallet: self.clone(),
            account: account.clone(),
            signer,
        }))
    }

    async fn read_call(
        &self,
        to: &AccountAddress,
        data: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        let gate = {
            let inner = self.lock();
            if !inner.installed {
                return Err(ProviderError::NoWalletFound);
            }
            if inner.fail_reads {
                return Err(ProviderError::Rpc(RpcError::Transport(
                    "injected read failure".to_owned(),
                )));
            }
            if *to != inner.registry_address {
                return Err(ProviderError::InvalidResponse(format!(
                    "no contract at {to}"
                )));
            }
            inner
                .read_gate
                .clone()
                .filter(|(_, gated)| is_seller_query_for(data, gated))
        };

        if let Some((mut rx, gated)) = gate {
            debug!(account = %gated, "holding gated seller read");
            let _ = rx.wait_for(|open| *open).await;
        }

        let inner = self.lock();
        inner
            .registry
            .execute_view(data)
            .map_err(|reason| ProviderError::Rpc(RpcError::Rpc {
                code: 3,
                message: format!("execution reverted: {reason}"),
            }))
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ProviderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        rx
    }
}

fn is_seller_query_for(calldata: &[u8], account: &AccountAddress) -> bool {
    if calldata.len() < 4 || calldata[..4] != IS_SELLER.selector() {
        return false;
    }
    abi::decode_address_arg(&calldata[4..], 0)
        .map(|decoded| decoded == *account)
        .unwrap_or(false)
}

struct MockSigningHandle {
    wallet: MockWallet,
    account: AccountAddress,
    signer: Arc<Secp256k1Signer>,
}

#[async_trait]
impl SigningHandle for MockSigningHandle {
    fn account(&self) -> &AccountAddress {
        &self.account
    }

    async fn send_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<TxHash, ProviderError> {
        let mut inner = self.wallet.lock();
        if request.from != self.account {
            return Err(ProviderError::InvalidResponse(format!(
                "handle bound to {}, transaction from {}",
                self.account, request.from
            )));
        }
        if request.to != inner.registry_address {
            return Err(ProviderError::InvalidResponse(format!(
                "no contract at {}",
                request.to
            )));
        }

        inner.tx_counter += 1;
        let mut seed = request.data.clone();
        seed.extend_from_slice(&inner.tx_counter.to_be_bytes());
        let hash = TxHash(to_hex_prefixed(&keccak256(&seed)));

        let from = self.account.clone();
        let status = match inner.registry.execute_transact(&from, &request.data) {
            Ok(()) => true,
            Err(reason) => {
                debug!(%reason, "mock transaction reverted");
                false
            }
        };

        let block_number = Some(inner.tx_counter);
        inner.receipts.insert(
            hash.0.clone(),
            TxReceipt {
                transaction_hash: hash.clone(),
                block_number,
                status,
            },
        );
        Ok(hash)
    }

    async fn confirm(&self, hash: &TxHash) -> Result<TxReceipt, ProviderError> {
        self.wallet
            .lock()
            .receipts
            .get(&hash.0)
            .cloned()
            .ok_or_else(|| {
                ProviderError::InvalidResponse(format!("unknown transaction {hash}"))
            })
    }

    async fn sign_message(&self, payload: &[u8]) -> Result<Vec<u8>, ProviderError> {
        self.signer
            .sign(payload, SignPurpose::Auth)
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))
    }
}
