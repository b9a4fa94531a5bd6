//! The remote contract proxy.
//!
//! [`WavePortal`] is the typed call surface of the deployed contract: two
//! reads, one write and the `NewWave` notification stream. [`EthersPortal`]
//! implements it on top of `abigen!` bindings and whatever ethers middleware
//! the wallet provides. Every call is a single round trip; nothing is retried
//! or cached here.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use ethers::{
    providers::{Middleware, PendingTransaction},
    types::{Address, TxHash, U256, U64},
    utils::to_checksum,
};
use futures::StreamExt;
use serde::Serialize;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{error::PortalError, wave::RawWave};

/// Gas ceiling attached to every wave transaction.
pub const WAVE_GAS_LIMIT: u64 = 300_000;

pub mod bindings {
    use ethers::contract::abigen;

    abigen!(
        WavePortal,
        r#"[
            struct Wave { address waver; string message; uint256 timestamp; }
            function wave() public
            function wave(string _message) public
            function getTotalWaves() public view returns (uint256)
            function getAllWaves() public view returns (Wave[])
            event NewWave(address indexed from, uint256 timestamp, string message)
        ]"#,
        methods {
            wave() as wave_anonymous;
            wave(string) as wave_with_message;
        }
    );
}

/// Identifier of a submitted wave, resolvable to a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TransactionHandle {
    pub hash: TxHash,
}

impl fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.hash)
    }
}

impl From<TxHash> for TransactionHandle {
    fn from(hash: TxHash) -> Self {
        Self { hash }
    }
}

/// A live feed of `NewWave` notifications.
///
/// Closing the subscription (explicitly or by dropping it) stops the
/// listener feeding it.
#[derive(Debug)]
pub struct WaveSubscription {
    receiver: mpsc::UnboundedReceiver<RawWave>,
    listener: Option<JoinHandle<()>>,
}

impl WaveSubscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<RawWave>, listener: Option<JoinHandle<()>>) -> Self {
        Self { receiver, listener }
    }

    /// The next notification, or `None` once the feed has ended or been closed.
    pub async fn next(&mut self) -> Option<RawWave> {
        self.receiver.recv().await
    }

    pub fn close(&mut self) {
        self.receiver.close();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl Drop for WaveSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
pub trait WavePortal: Send + Sync {
    async fn total_waves(&self) -> Result<u64, PortalError>;

    async fn all_waves(&self) -> Result<Vec<RawWave>, PortalError>;

    /// Send a wave signed by `from`, or by the wallet's default account when
    /// no session is known. A `None` message calls the message-less `wave()`
    /// entry point.
    async fn send_wave(
        &self,
        from: Option<&str>,
        message: Option<&str>,
        gas_limit: u64,
    ) -> Result<TransactionHandle, PortalError>;

    /// Wait until the transaction is mined and check that it succeeded.
    async fn confirm(&self, handle: TransactionHandle) -> Result<(), PortalError>;

    async fn subscribe(&self) -> Result<WaveSubscription, PortalError>;
}

fn to_u64(value: U256) -> Result<u64, PortalError> {
    if value > U256::from(u64::MAX) {
        return Err(PortalError::Overflow(value.to_string()));
    }
    Ok(value.as_u64())
}

fn raw_wave(waver: Address, timestamp: U256, message: String) -> Result<RawWave, PortalError> {
    Ok(RawWave {
        waver: to_checksum(&waver, None),
        timestamp: to_u64(timestamp)?,
        message,
    })
}

/// [`WavePortal`] backed by ethers contract bindings.
#[derive(Debug)]
pub struct EthersPortal<M> {
    client: Arc<M>,
    contract: bindings::WavePortal<M>,
}

impl<M: Middleware> EthersPortal<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        let contract = bindings::WavePortal::new(address, client.clone());
        Self { client, contract }
    }

    async fn signer(&self, from: Option<&str>) -> Result<Address, PortalError> {
        if let Some(from) = from {
            return from
                .parse::<Address>()
                .map_err(|_| PortalError::InvalidSender(from.to_string()));
        }

        let accounts = self
            .client
            .get_accounts()
            .await
            .map_err(|e| PortalError::Call(e.to_string()))?;
        accounts.into_iter().next().ok_or(PortalError::NoSigner)
    }
}

#[async_trait]
impl<M> WavePortal for EthersPortal<M>
where
    M: Middleware + 'static,
{
    async fn total_waves(&self) -> Result<u64, PortalError> {
        let total = self
            .contract
            .get_total_waves()
            .call()
            .await
            .map_err(|e| PortalError::Call(e.to_string()))?;
        to_u64(total)
    }

    async fn all_waves(&self) -> Result<Vec<RawWave>, PortalError> {
        let waves = self
            .contract
            .get_all_waves()
            .call()
            .await
            .map_err(|e| PortalError::Call(e.to_string()))?;

        waves
            .into_iter()
            .map(|(waver, message, timestamp)| raw_wave(waver, timestamp, message))
            .collect()
    }

    async fn send_wave(
        &self,
        from: Option<&str>,
        message: Option<&str>,
        gas_limit: u64,
    ) -> Result<TransactionHandle, PortalError> {
        let from = self.signer(from).await?;

        let fn_call = match message {
            Some(message) => self.contract.wave_with_message(message.to_owned()),
            None => self.contract.wave_anonymous(),
        }
        .from(from)
        .gas(gas_limit);

        let tx = fn_call
            .send()
            .await
            .map_err(|e| PortalError::Call(e.to_string()))?;
        let hash = tx.tx_hash();
        debug!("Wave sent from {:?}: {:#x}", from, hash);

        Ok(TransactionHandle::from(hash))
    }

    async fn confirm(&self, handle: TransactionHandle) -> Result<(), PortalError> {
        let receipt = PendingTransaction::new(handle.hash, self.client.provider())
            .await
            .map_err(|e| PortalError::Call(e.to_string()))?;

        match receipt {
            None => Err(PortalError::Dropped(handle.to_string())),
            Some(receipt) if receipt.status == Some(U64::zero()) => {
                Err(PortalError::Reverted(handle.to_string()))
            }
            Some(receipt) => {
                debug!("Wave {} mined in block {:?}", handle, receipt.block_number);
                Ok(())
            }
        }
    }

    async fn subscribe(&self) -> Result<WaveSubscription, PortalError> {
        let contract = self.contract.clone();
        let (sender, receiver) = mpsc::unbounded_channel();
        let (installed, ready) = oneshot::channel();

        let listener = tokio::spawn(async move {
            let event = contract.new_wave_filter();
            let mut stream = match event.stream().await {
                Ok(stream) => {
                    let _ = installed.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = installed.send(Err(PortalError::Call(e.to_string())));
                    return;
                }
            };

            while let Some(item) = stream.next().await {
                let wave = match item {
                    Ok(event) => raw_wave(event.from, event.timestamp, event.message),
                    Err(e) => {
                        warn!("Failed to decode NewWave event: {}", e);
                        continue;
                    }
                };

                match wave {
                    Ok(wave) => {
                        if sender.send(wave).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping NewWave event: {}", e),
                }
            }
        });

        // The filter is installed by the listener; report its outcome here.
        match ready.await {
            Ok(Ok(())) => Ok(WaveSubscription::new(receiver, Some(listener))),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(PortalError::Call(
                "NewWave listener stopped before installing its filter".to_string(),
            )),
        }
    }
}
