use thiserror::Error;

/// Failures reported by the wallet transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No wallet available")]
    Missing,

    #[error("Wallet rejected the request: {0}")]
    Rejected(String),

    #[error("{0}")]
    Transport(String),
}

/// Failures of a call through the contract proxy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    #[error("{0}")]
    Call(String),

    #[error("No account available to sign the transaction")]
    NoSigner,

    #[error("Invalid sender address {0:?}")]
    InvalidSender(String),

    #[error("Transaction {0} reverted")]
    Reverted(String),

    #[error("Transaction {0} was dropped before confirmation")]
    Dropped(String),

    #[error("Value does not fit in 64 bits: {0}")]
    Overflow(String),
}

/// Failures converting a remote wave into a local record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaveError {
    #[error("Timestamp {0} is out of range")]
    TimestampOutOfRange(u64),
}

/// Invalid start-up configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid contract address {0:?}")]
    InvalidContractAddress(String),

    #[error("Invalid wallet endpoint {url:?}: {reason}")]
    InvalidWalletUrl { url: String, reason: String },
}
