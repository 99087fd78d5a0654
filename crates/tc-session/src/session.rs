use crate::bridge;
use crate::{SessionConfig, SessionError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tc_api_types::{
    AccountAddress, ChainId, ConnectionSnapshot, ConnectionStatus, ErrorKind, SwitchOutcome,
};
use tc_gateway::{RegistryGateway, resolve_roles};
use tc_provider::{ProviderError, SigningHandle, WalletProvider};
use tc_storage::IntentStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectMode {
    /// Ask the wallet for authorization; may prompt the user.
    Prompt,
    /// Resume from already-granted authorization; must never prompt.
    Silent,
}

#[derive(Default)]
struct Inner {
    gateway: Option<Arc<RegistryGateway>>,
    handle: Option<Arc<dyn SigningHandle>>,
    bridge: Option<JoinHandle<()>>,
}

/// The connection state machine. One instance lives for the whole process;
/// every UI surface reads the same watch-channel snapshot. Only this type
/// and its event bridge write the snapshot.
pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    store: Arc<dyn IntentStore>,
    config: SessionConfig,
    state: watch::Sender<ConnectionSnapshot>,
    inner: Mutex<Inner>,
    connecting: AtomicBool,
}

impl WalletSession {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        store: Arc<dyn IntentStore>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectionSnapshot::default());
        Arc::new(Self {
            provider,
            store,
            config,
            state,
            inner: Mutex::new(Inner::default()),
            connecting: AtomicBool::new(false),
        })
    }

    /// Reactive handle onto the connection state. Consumers await changes
    /// instead of polling.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.state.borrow().clone()
    }

    /// The "wallet installed?" probe.
    pub fn wallet_available(&self) -> bool {
        self.provider.is_available()
    }

    pub fn account(&self) -> Option<AccountAddress> {
        self.state.borrow().account.clone()
    }

    pub fn gateway(&self) -> Option<Arc<RegistryGateway>> {
        self.inner.lock().expect("session lock").gateway.clone()
    }

    /// Signing surface for the identity provider; present while connected.
    pub fn signing_handle(&self) -> Option<Arc<dyn SigningHandle>> {
        self.inner.lock().expect("session lock").handle.clone()
    }

    /// Connect through the wallet's authorization prompt. Returns
    /// `AlreadyPending` instead of issuing a second prompt while one
    /// connect is in flight.
    pub async fn connect(self: &Arc<Self>) -> Result<ConnectionSnapshot, SessionError> {
        self.connect_inner(ConnectMode::Prompt).await
    }

    /// Silent resume at startup. Connects only when the user previously
    /// opted to stay connected *and* the wallet still reports an authorized
    /// account; never prompts. Returns whether a session was restored.
    pub async fn restore_if_intended(self: &Arc<Self>) -> Result<bool, SessionError> {
        let intended = match self.store.load_intent().await {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "failed to load persist intent, treating as absent");
                false
            }
        };
        if !intended {
            return Ok(false);
        }

        let authorized = match self.provider.authorized_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                debug!(%err, "no provider to resume against");
                Vec::new()
            }
        };
        if authorized.is_empty() {
            if let Err(err) = self.store.store_intent(false).await {
                warn!(%err, "failed to clear persist intent");
            }
            self.state.send_modify(|snapshot| snapshot.persist_intent = false);
            return Ok(false);
        }

        self.connect_inner(ConnectMode::Silent).await?;
        Ok(true)
    }

    /// Clears the session. Idempotent; state is cleared synchronously
    /// before any async cleanup runs.
    pub async fn disconnect(&self) {
        let bridge = {
            let mut inner = self.inner.lock().expect("session lock");
            inner.gateway = None;
            inner.handle = None;
            inner.bridge.take()
        };

        self.state
            .send_modify(|snapshot| *snapshot = ConnectionSnapshot::default());

        if let Err(err) = self.store.store_intent(false).await {
            warn!(%err, "failed to clear persist intent");
        }

        if let Some(task) = bridge {
            task.abort();
        }
    }

    /// Ask the wallet to switch chains. Adding an unknown network is left
    /// to the caller, hence the tri-state result.
    pub async fn switch_network(&self, target: ChainId) -> SwitchOutcome {
        match self.provider.switch_chain(target).await {
            Ok(()) => SwitchOutcome::Switched,
            Err(ProviderError::UnknownChain(chain)) => {
                debug!(%chain, "wallet does not know requested chain");
                self.state.send_modify(|snapshot| {
                    snapshot.last_error = Some(ErrorKind::NetworkUnknownToWallet);
                });
                SwitchOutcome::NetworkUnknownToWallet
            }
            Err(err) => {
                warn!(%err, %target, "network switch failed");
                self.state.send_modify(|snapshot| {
                    snapshot.last_error = Some(err.kind());
                });
                SwitchOutcome::Failed
            }
        }
    }

    pub(crate) async fn connect_inner(
        self: &Arc<Self>,
        mode: ConnectMode,
    ) -> Result<ConnectionSnapshot, SessionError> {
        if self.connecting.swap(true, Ordering::SeqCst) {
            return Err(SessionError::Provider(ProviderError::AlreadyPending));
        }

        let result = self.do_connect(mode).await;
        self.connecting.store(false, Ordering::SeqCst);

        match result {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                let kind = err.kind();
                warn!(%err, "connect failed");
                self.state.send_modify(|snapshot| {
                    snapshot.status = ConnectionStatus::Disconnected;
                    snapshot.account = None;
                    snapshot.chain_id = None;
                    snapshot.is_admin = false;
                    snapshot.is_seller = false;
                    snapshot.last_error = Some(kind);
                });
                Err(err)
            }
        }
    }

    async fn do_connect(
        self: &Arc<Self>,
        mode: ConnectMode,
    ) -> Result<ConnectionSnapshot, SessionError> {
        self.state.send_modify(|snapshot| {
            snapshot.status = ConnectionStatus::Connecting;
            snapshot.account = None;
            snapshot.chain_id = None;
            snapshot.is_admin = false;
            snapshot.is_seller = false;
            snapshot.last_error = None;
        });

        let accounts = match mode {
            ConnectMode::Prompt => self.provider.request_accounts().await?,
            ConnectMode::Silent => self.provider.authorized_accounts().await?,
        };
        let account = accounts
            .into_iter()
            .next()
            .ok_or(SessionError::Provider(ProviderError::UserRejected))?;

        let chain = self.provider.chain_id().await?;
        let (gateway, _) = self.bind_account(&account).await?;

        self.state.send_modify(|snapshot| {
            snapshot.status = ConnectionStatus::Connected;
            snapshot.account = Some(account.clone());
            snapshot.chain_id = Some(chain);
            snapshot.is_admin = false;
            snapshot.is_seller = false;
            snapshot.persist_intent = true;
        });

        if let Err(err) = self.store.store_intent(true).await {
            warn!(%err, "failed to record persist intent");
        }

        self.ensure_bridge();
        self.refresh_roles(&gateway, &account).await;

        Ok(self.snapshot())
    }

    /// Fresh signing handle and gateway for `account`. The previous handle
    /// is replaced wholesale; a signer bound to a stale account is never
    /// reused.
    async fn bind_account(
        &self,
        account: &AccountAddress,
    ) -> Result<(Arc<RegistryGateway>, Arc<dyn SigningHandle>), SessionError> {
        let handle = self.provider.signing_handle(account).await?;
        let gateway = Arc::new(RegistryGateway::bound(
            self.config.registry.clone(),
            self.provider.clone(),
            handle.clone(),
            self.config.endpoints.clone(),
            self.config.retry.clone(),
        ));
        let mut inner = self.inner.lock().expect("session lock");
        inner.gateway = Some(gateway.clone());
        inner.handle = Some(handle.clone());
        Ok((gateway, handle))
    }

    fn ensure_bridge(self: &Arc<Self>) {
        let mut inner = self.inner.lock().expect("session lock");
        if inner.bridge.is_some() {
            return;
        }
        let events = self.provider.subscribe();
        inner.bridge = Some(bridge::spawn(Arc::downgrade(self), events));
    }

    /// Re-resolve the role flags for `account`. The result is applied only
    /// if `account` is still the connected account when the reads return;
    /// anything else is a stale result and is dropped.
    async fn refresh_roles(&self, gateway: &RegistryGateway, account: &AccountAddress) {
        match resolve_roles(gateway, account).await {
            Ok(flags) => self.state.send_modify(|snapshot| {
                if snapshot.is_connected() && snapshot.account.as_ref() == Some(account) {
                    snapshot.is_admin = flags.is_admin;
                    snapshot.is_seller = flags.is_seller;
                } else {
                    debug!(stale_account = %account, "discarding stale role resolution");
                }
            }),
            Err(err) => {
                warn!(%err, %account, "role resolution failed, flags stay false");
                self.state.send_modify(|snapshot| {
                    if snapshot.is_connected() && snapshot.account.as_ref() == Some(account) {
                        snapshot.last_error = Some(ErrorKind::RoleResolutionFailed);
                    }
                });
            }
        }
    }

    /// Wallet reported a different active account: rebuild bindings and
    /// role flags for it without prompting.
    pub(crate) async fn rebind_account(self: &Arc<Self>, account: AccountAddress) {
        if !self.snapshot().is_connected() {
            return;
        }

        let gateway = match self.bind_account(&account).await {
            Ok((gateway, _)) => gateway,
            Err(err) => {
                warn!(%err, %account, "cannot serve switched account, disconnecting");
                self.disconnect().await;
                return;
            }
        };

        // A disconnect may have raced the rebind; don't resurrect bindings.
        if !self.snapshot().is_connected() {
            let mut inner = self.inner.lock().expect("session lock");
            inner.gateway = None;
            inner.handle = None;
            return;
        }

        self.state.send_modify(|snapshot| {
            snapshot.account = Some(account.clone());
            snapshot.is_admin = false;
            snapshot.is_seller = false;
            snapshot.last_error = None;
        });

        self.refresh_roles(&gateway, &account).await;
    }

    /// Wallet moved to another chain. Signers and contract addresses are
    /// chain-scoped, so the whole environment is rebuilt through the
    /// silent connect path; the old gateway never serves another call.
    pub(crate) async fn handle_chain_changed(self: &Arc<Self>, chain: ChainId) {
        debug!(%chain, "chain changed, rebuilding session");
        {
            let mut inner = self.inner.lock().expect("session lock");
            inner.gateway = None;
            inner.handle = None;
        }
        self.state.send_modify(|snapshot| {
            snapshot.status = ConnectionStatus::Disconnected;
            snapshot.account = None;
            snapshot.chain_id = None;
            snapshot.is_admin = false;
            snapshot.is_seller = false;
        });

        if let Err(err) = self.connect_inner(ConnectMode::Silent).await {
            warn!(%err, "reconnect after chain change failed");
        }
    }
}
