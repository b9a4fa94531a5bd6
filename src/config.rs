use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use ethers::{
    providers::{Http, Provider},
    types::Address,
};

use crate::{
    controller::Variant,
    error::ConfigError,
    portal::EthersPortal,
    wallet::{Ethereum, EthersWallet},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Wave at a deployed WavePortal contract", long_about = None)]
pub struct Options {
    /// Address of the deployed WavePortal contract
    #[arg(long, env = "WAVEPORTAL_CONTRACT_ADDRESS")]
    pub contract_address: String,

    /// JSON-RPC endpoint of the wallet. Without one, no wallet is available.
    #[arg(long, env = "WALLET_RPC_URL")]
    pub wallet_rpc_url: Option<String>,

    /// The deployed contract is the plain one: `wave()` without a message and no event log
    #[arg(long)]
    pub plain: bool,

    /// How often the wallet endpoint is polled for new waves, in milliseconds
    #[arg(long, default_value = "4000")]
    pub poll_interval_ms: u64,

    /// Print the screen as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load and show the current state
    Status,
    /// Ask the wallet to authorize this client
    Connect,
    /// Send a wave
    Wave {
        /// Message attached to the wave
        message: Option<String>,
    },
    /// Keep the screen up to date with new waves until interrupted
    Watch,
}

impl Options {
    pub fn variant(&self) -> Variant {
        if self.plain {
            Variant::Plain
        } else {
            Variant::WithMessages
        }
    }

    pub fn contract_address(&self) -> Result<Address, ConfigError> {
        self.contract_address
            .parse::<Address>()
            .map_err(|_| ConfigError::InvalidContractAddress(self.contract_address.clone()))
    }

    /// The wallet and contract proxy this configuration points at.
    pub fn ethereum(&self) -> Result<Ethereum, ConfigError> {
        let contract_address = self.contract_address()?;

        let Some(url) = &self.wallet_rpc_url else {
            return Ok(Ethereum::Absent);
        };

        let provider = Provider::<Http>::try_from(url.as_str())
            .map_err(|e| ConfigError::InvalidWalletUrl {
                url: url.clone(),
                reason: e.to_string(),
            })?
            .interval(Duration::from_millis(self.poll_interval_ms));

        let portal = EthersPortal::new(contract_address, Arc::new(provider.clone()));
        Ok(Ethereum::present(
            Arc::new(EthersWallet::new(provider)),
            Arc::new(portal),
        ))
    }
}
