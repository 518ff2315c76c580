use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Failure codes a geolocation provider reports, numbered like the browser's
/// `GeolocationPositionError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum PositionErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

impl TryFrom<u16> for PositionErrorCode {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(PositionErrorCode::PermissionDenied),
            2 => Ok(PositionErrorCode::PositionUnavailable),
            3 => Ok(PositionErrorCode::Timeout),
            other => Err(format!("unknown position error code {}", other)),
        }
    }
}

impl From<PositionErrorCode> for u16 {
    fn from(code: PositionErrorCode) -> Self {
        match code {
            PositionErrorCode::PermissionDenied => 1,
            PositionErrorCode::PositionUnavailable => 2,
            PositionErrorCode::Timeout => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionError {
    pub code: PositionErrorCode,
    pub message: String,
}

impl PositionError {
    pub fn new(code: PositionErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl Display for PositionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PositionError {}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Geolocation is not supported by this browser.")]
    SourceUnavailable,
    #[error("Error occurred while getting your location: {0}")]
    Sample(#[from] PositionError),
    #[error("tracking is already active")]
    AlreadyTracking,
    #[error("location source disconnected")]
    Disconnected,
}
