//! The view-controller: owns everything the screen shows and drives the
//! wallet and the contract proxy on the user's behalf.
//!
//! Operations never return errors. Each failure is logged and turned into a
//! single [`Notice`], and the screen always ends up interactive again.
//!
//! All operations take `&self` so several of them can be in flight on the
//! same controller, the way `initialize` drives its reads. State lives behind
//! a mutex that is only held between suspension points.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    error::PortalError,
    notice::Notice,
    portal::{TransactionHandle, WavePortal, WaveSubscription, WAVE_GAS_LIMIT},
    view::View,
    wallet::Ethereum,
    wave::Wave,
};

const NO_WALLET: &str = "Make sure you have a wallet!";
const GET_A_WALLET: &str = "Get a wallet!";
const NO_AUTHORIZED_ACCOUNT: &str = "No authorized account found";
const ERROR_GETTING_ACCOUNTS: &str = "Error getting accounts";
const CONNECTED: &str = "Connected";
const ERROR_CONNECTING_WALLET: &str = "Error connecting wallet";
const NO_PROVIDER: &str = "No ethereum provider found";
const ERROR_GETTING_TOTAL_WAVES: &str = "Error getting total waves";
const TOTAL_WAVES_UPDATED: &str = "Total Waves updated!";
const ERROR_WAVING: &str = "Error waving";

/// Which flavour of the contract is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// `wave()` without a message and no event log.
    Plain,
    /// `wave(string)`, `getAllWaves()` and `NewWave` notifications.
    #[default]
    WithMessages,
}

#[derive(Debug, Default)]
pub(crate) struct ViewState {
    pub(crate) session: Option<String>,
    pub(crate) counter: u64,
    pub(crate) waves: Vec<Wave>,
    pub(crate) last_transaction: Option<TransactionHandle>,
    pub(crate) busy: bool,
    pub(crate) message: String,
    pub(crate) notices: Vec<Notice>,
}

struct Shared {
    state: Mutex<ViewState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<R>(&self, f: impl FnOnce(&ViewState) -> R) -> R {
        f(&self.lock())
    }

    fn update<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        let result = f(&mut self.lock());
        self.revision.send_modify(|revision| *revision += 1);
        result
    }

    fn notify(&self, notice: Notice) {
        if notice.is_error() {
            warn!("{}", notice.text);
        } else {
            info!("{}", notice.text);
        }
        self.update(|state| state.notices.push(notice));
    }
}

struct Listener {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct WavePortalController {
    ethereum: Ethereum,
    variant: Variant,
    shared: Arc<Shared>,
    listener: Mutex<Option<Listener>>,
}

impl WavePortalController {
    pub fn new(ethereum: Ethereum, variant: Variant) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            ethereum,
            variant,
            shared: Arc::new(Shared {
                state: Mutex::new(ViewState::default()),
                revision,
            }),
            listener: Mutex::new(None),
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Fires on every state change.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    pub fn view(&self) -> View {
        self.shared.read(|state| View::render(state, self.variant))
    }

    pub fn session(&self) -> Option<String> {
        self.shared.read(|state| state.session.clone())
    }

    pub fn counter(&self) -> u64 {
        self.shared.read(|state| state.counter)
    }

    pub fn waves(&self) -> Vec<Wave> {
        self.shared.read(|state| state.waves.clone())
    }

    pub fn last_transaction(&self) -> Option<TransactionHandle> {
        self.shared.read(|state| state.last_transaction)
    }

    pub fn is_busy(&self) -> bool {
        self.shared.read(|state| state.busy)
    }

    /// Drain the notices produced since the last call. Draining is not a
    /// state change and does not wake [`changes`](Self::changes).
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.shared.lock().notices)
    }

    pub fn set_message(&self, message: impl Into<String>) {
        let message = message.into();
        self.shared.update(|state| state.message = message);
    }

    /// Runs the start-up reads concurrently; nothing depends on their order.
    pub async fn initialize(&self) {
        match self.variant {
            Variant::Plain => {
                tokio::join!(self.check_authorization(), self.fetch_counter());
            }
            Variant::WithMessages => {
                tokio::join!(
                    self.fetch_all_events(),
                    self.check_authorization(),
                    self.fetch_counter(),
                    self.subscribe_to_events(),
                );
            }
        }
    }

    pub async fn check_authorization(&self) {
        self.begin("check_authorization");

        match self.authorized_account().await {
            Ok(account) => {
                info!("Found an authorized account: {}", account);
                self.shared.update(|state| state.session = Some(account));
            }
            Err(text) => self.shared.notify(Notice::error(text)),
        }

        self.finish();
    }

    async fn authorized_account(&self) -> Result<String, &'static str> {
        let wallet = self.ethereum.wallet().map_err(|_| NO_WALLET)?;
        let accounts = wallet.accounts().await.map_err(|e| {
            warn!("Failed to list accounts: {}", e);
            ERROR_GETTING_ACCOUNTS
        })?;
        accounts.into_iter().next().ok_or(NO_AUTHORIZED_ACCOUNT)
    }

    pub async fn connect_wallet(&self) {
        self.begin("connect_wallet");

        match self.requested_account().await {
            Ok(account) => {
                info!("Connected to {}", account);
                self.shared.update(|state| state.session = Some(account));
                self.shared.notify(Notice::success(CONNECTED));
            }
            Err(text) => self.shared.notify(Notice::error(text)),
        }

        self.finish();
    }

    async fn requested_account(&self) -> Result<String, &'static str> {
        let wallet = self.ethereum.wallet().map_err(|_| GET_A_WALLET)?;
        let accounts = wallet.request_accounts().await.map_err(|e| {
            warn!("Wallet authorization failed: {}", e);
            ERROR_CONNECTING_WALLET
        })?;
        accounts.into_iter().next().ok_or(ERROR_CONNECTING_WALLET)
    }

    pub async fn fetch_counter(&self) {
        self.begin("fetch_counter");

        match self.ethereum.portal() {
            Err(_) => self.shared.notify(Notice::error(NO_PROVIDER)),
            Ok(portal) => match portal.total_waves().await {
                Ok(total) => {
                    debug!("Total waves: {}", total);
                    self.shared.update(|state| state.counter = total);
                }
                Err(e) => {
                    warn!("Failed to read total waves: {}", e);
                    self.shared.notify(Notice::error(ERROR_GETTING_TOTAL_WAVES));
                }
            },
        }

        self.finish();
    }

    /// Replaces the event list with the contract's full history.
    pub async fn fetch_all_events(&self) {
        let portal = match self.ethereum.portal() {
            Ok(portal) => portal,
            Err(_) => return self.shared.notify(Notice::error(NO_PROVIDER)),
        };

        let waves = portal
            .all_waves()
            .await
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                raw.into_iter()
                    .map(|wave| Wave::try_from(wave).map_err(|e| e.to_string()))
                    .collect::<Result<Vec<_>, _>>()
            });

        match waves {
            Ok(waves) => {
                debug!("Fetched {} waves", waves.len());
                self.shared.update(|state| state.waves = waves);
            }
            Err(text) => self.shared.notify(Notice::error(text)),
        }
    }

    /// Starts appending `NewWave` notifications to the event list. A previous
    /// subscription on this controller is closed first.
    pub async fn subscribe_to_events(&self) {
        let portal = match self.ethereum.portal() {
            Ok(portal) => portal,
            Err(_) => {
                debug!("No wallet, not listening for new waves");
                return;
            }
        };

        let subscription = match portal.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => return self.shared.notify(Notice::error(e.to_string())),
        };

        let listener = self.listen(subscription);
        let previous = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(listener);
        if let Some(previous) = previous {
            close(previous).await;
        }
    }

    fn listen(&self, mut subscription: WaveSubscription) -> Listener {
        let shared = self.shared.clone();
        let (cancel, mut cancelled) = oneshot::channel();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut cancelled => break,
                    next = subscription.next() => {
                        let Some(raw) = next else { break };
                        match Wave::try_from(raw) {
                            Ok(wave) => {
                                info!("NewWave from {}: {}", wave.address, wave.message);
                                shared.update(|state| state.waves.push(wave));
                            }
                            Err(e) => warn!("Ignoring NewWave notification: {}", e),
                        }
                    }
                }
            }
            subscription.close();
        });

        Listener { cancel, task }
    }

    /// Closes the live subscription, if any, and waits for its listener.
    pub async fn teardown(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            close(listener).await;
        }
    }

    pub async fn submit_wave(&self) {
        self.begin("submit_wave");

        let from = self.session();
        let message = match self.variant {
            Variant::Plain => None,
            Variant::WithMessages => Some(self.shared.read(|state| state.message.clone())),
        };

        match self.ethereum.portal() {
            Err(_) => self.shared.notify(Notice::error(NO_PROVIDER)),
            Ok(portal) => match self.wave(&**portal, from.as_deref(), message.as_deref()).await {
                Ok(()) => self.shared.notify(Notice::success(TOTAL_WAVES_UPDATED)),
                Err(e) => {
                    warn!("Wave failed: {}", e);
                    self.shared.notify(Notice::error(ERROR_WAVING));
                }
            },
        }

        self.finish();
    }

    async fn wave(
        &self,
        portal: &dyn WavePortal,
        from: Option<&str>,
        message: Option<&str>,
    ) -> Result<(), PortalError> {
        let handle = portal.send_wave(from, message, WAVE_GAS_LIMIT).await?;
        info!("Mining {}", handle);
        portal.confirm(handle).await?;
        info!("Mined {}", handle);
        self.shared.update(|state| state.last_transaction = Some(handle));

        let total = portal.total_waves().await?;
        self.shared.update(|state| state.counter = total);
        Ok(())
    }

    // The busy flag is shared by every operation: whichever finishes first
    // clears it, even if another is still running.
    fn begin(&self, operation: &str) {
        let was_busy = self.shared.update(|state| std::mem::replace(&mut state.busy, true));
        if was_busy {
            warn!("{} started while another operation is in flight", operation);
        }
    }

    fn finish(&self) {
        self.shared.update(|state| state.busy = false);
    }
}

async fn close(listener: Listener) {
    let _ = listener.cancel.send(());
    if let Err(e) = listener.task.await {
        if !e.is_cancelled() {
            warn!("Wave listener failed: {}", e);
        }
    }
}

impl Drop for WavePortalController {
    fn drop(&mut self) {
        let listener = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.task.abort();
        }
    }
}
