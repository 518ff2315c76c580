use crate::models::error::PositionError;
use crate::models::position::PositionSample;

/// Activation of one of the two UI controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
}

/// What a location source delivers for an active watch.
#[derive(Debug, Clone)]
pub enum LocationEvent {
    Sample(PositionSample),
    Error(PositionError),
}
