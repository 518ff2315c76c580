use serde::{Deserialize, Serialize};

use crate::models::error::PositionErrorCode;
use crate::models::position::PositionReport;

pub type WatchId = u64;

// Client -> server

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    Capabilities { geolocation: bool },
    Start,
    Stop,
    Position(PositionReport),
    PositionError {
        watch_id: WatchId,
        code: PositionErrorCode,
        message: String,
    },
}

// Server -> client

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    Watch { watch_id: WatchId, options: WatchOptions },
    ClearWatch { watch_id: WatchId },
    Field { field: DisplayField, value: String },
    Control { control: Control, enabled: bool },
    Alert { message: String },
    ProtocolError { message: String },
}

/// Options handed to the device's `watchPosition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchOptions {
    pub enable_high_accuracy: bool,
    /// ms; 0 forbids cached positions
    pub maximum_age: u64,
    /// ms per position request
    pub timeout: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            maximum_age: 0,
            timeout: 5000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayField {
    Latitude,
    Longitude,
    Speed,
    Distance,
    Time,
}

impl DisplayField {
    pub const ALL: [DisplayField; 5] = [
        DisplayField::Latitude,
        DisplayField::Longitude,
        DisplayField::Speed,
        DisplayField::Distance,
        DisplayField::Time,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    Start,
    Stop,
}
