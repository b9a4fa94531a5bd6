//! Client for a deployed WavePortal contract.
//!
//! A [`WavePortalController`] holds the screen state (session, wave counter,
//! event log, last transaction, busy flag) and talks to the chain through an
//! injected [`Ethereum`] capability: a [`WalletTransport`] for accounts and a
//! [`WavePortal`] proxy for the contract calls.
//!
//! ```ignore
//! let controller = WavePortalController::new(options.ethereum()?, Variant::WithMessages);
//! controller.initialize().await;
//! controller.set_message("hi");
//! controller.submit_wave().await;
//! println!("{}", controller.view());
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod notice;
pub mod portal;
pub mod view;
pub mod wallet;
pub mod wave;

pub use config::{Command, Options};
pub use controller::{Variant, WavePortalController};
pub use error::{ConfigError, PortalError, WalletError, WaveError};
pub use notice::{Notice, NoticeLevel};
pub use portal::{
    EthersPortal, TransactionHandle, WavePortal, WaveSubscription, WAVE_GAS_LIMIT,
};
pub use view::{Screen, View};
pub use wallet::{Ethereum, EthersWallet, WalletTransport};
pub use wave::{RawWave, Wave};

use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
