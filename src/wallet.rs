use std::sync::Arc;

use async_trait::async_trait;
use ethers::{
    providers::{JsonRpcClient, Middleware, Provider, ProviderError},
    types::Address,
    utils::to_checksum,
};

use crate::{error::WalletError, portal::WavePortal};

/// Account access through the user's wallet.
#[async_trait]
pub trait WalletTransport: Send + Sync {
    /// Accounts the wallet has already authorized for this client.
    async fn accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Ask the wallet to authorize this client. The wallet may prompt the user.
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;
}

/// What the controller can reach: either a wallet together with the contract
/// proxy built on it, or nothing at all.
#[derive(Clone)]
pub enum Ethereum {
    Present {
        wallet: Arc<dyn WalletTransport>,
        portal: Arc<dyn WavePortal>,
    },
    Absent,
}

impl Ethereum {
    pub fn present(wallet: Arc<dyn WalletTransport>, portal: Arc<dyn WavePortal>) -> Self {
        Ethereum::Present { wallet, portal }
    }

    pub fn wallet(&self) -> Result<&Arc<dyn WalletTransport>, WalletError> {
        match self {
            Ethereum::Present { wallet, .. } => Ok(wallet),
            Ethereum::Absent => Err(WalletError::Missing),
        }
    }

    pub fn portal(&self) -> Result<&Arc<dyn WavePortal>, WalletError> {
        match self {
            Ethereum::Present { portal, .. } => Ok(portal),
            Ethereum::Absent => Err(WalletError::Missing),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Ethereum::Present { .. })
    }
}

/// Wallet transport over a JSON-RPC endpoint that manages its own keys
/// (a node with unlocked accounts, or a wallet bridge).
#[derive(Debug, Clone)]
pub struct EthersWallet<P> {
    provider: Provider<P>,
}

impl<P> EthersWallet<P> {
    pub fn new(provider: Provider<P>) -> Self {
        Self { provider }
    }
}

fn checksummed(accounts: Vec<Address>) -> Vec<String> {
    accounts
        .iter()
        .map(|account| to_checksum(account, None))
        .collect()
}

fn classify(error: ProviderError) -> WalletError {
    match error {
        // EIP-1193 code for "user rejected the request"
        ProviderError::JsonRpcClientError(ref inner)
            if inner
                .as_error_response()
                .is_some_and(|response| response.code == 4001) =>
        {
            WalletError::Rejected(error.to_string())
        }
        other => WalletError::Transport(other.to_string()),
    }
}

#[async_trait]
impl<P> WalletTransport for EthersWallet<P>
where
    P: JsonRpcClient + 'static,
{
    async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        let accounts = self.provider.get_accounts().await.map_err(classify)?;
        Ok(checksummed(accounts))
    }

    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let accounts: Vec<Address> = self
            .provider
            .request("eth_requestAccounts", ())
            .await
            .map_err(classify)?;
        Ok(checksummed(accounts))
    }
}
