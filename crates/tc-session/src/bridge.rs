use crate::session::WalletSession;
use std::sync::Weak;
use tc_provider::ProviderEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Maps the provider's native notifications onto session transitions.
///
/// Exactly one bridge task runs per connected session; it is spawned on
/// entering `Connected` and aborted on disconnect. Events are handled in
/// arrival order.
pub(crate) fn spawn(
    session: Weak<WalletSession>,
    mut events: mpsc::UnboundedReceiver<ProviderEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(session) = session.upgrade() else {
                break;
            };
            debug!(?event, "provider notification");
            match event {
                ProviderEvent::AccountsChanged(accounts) => {
                    match accounts.into_iter().next() {
                        Some(account) => session.rebind_account(account).await,
                        None => {
                            // Wallet revoked access entirely.
                            session.disconnect().await;
                            break;
                        }
                    }
                }
                ProviderEvent::ChainChanged(chain) => {
                    session.handle_chain_changed(chain).await;
                }
                ProviderEvent::Disconnected => {
                    session.disconnect().await;
                    break;
                }
            }
        }
    })
}
