use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::WaveError;

/// A wave as the contract reports it, either from `getAllWaves` or from a
/// `NewWave` notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWave {
    pub waver: String,
    /// Seconds since the unix epoch.
    pub timestamp: u64,
    pub message: String,
}

/// A wave as displayed in the event list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wave {
    pub address: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl TryFrom<RawWave> for Wave {
    type Error = WaveError;

    fn try_from(raw: RawWave) -> Result<Self, Self::Error> {
        let seconds =
            i64::try_from(raw.timestamp).map_err(|_| WaveError::TimestampOutOfRange(raw.timestamp))?;
        let timestamp = DateTime::from_timestamp(seconds, 0)
            .ok_or(WaveError::TimestampOutOfRange(raw.timestamp))?;

        Ok(Wave {
            address: raw.waver,
            timestamp,
            message: raw.message,
        })
    }
}
