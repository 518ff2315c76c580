use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::handlers::browser_source::BrowserFeed;
use crate::handlers::events::{ControlCommand, LocationEvent};
use crate::models::error::{PositionError, TrackerError};
use crate::models::position::PositionSample;
use crate::models::updates::{ClientMessage, ServerMessage};

/// Routes text frames from the browser: control activations go to the tracker
/// actor, geolocation output goes to the location feed.
pub struct InboundHandler {
    control: mpsc::Sender<ControlCommand>,
    feed: BrowserFeed,
    outbound: mpsc::UnboundedSender<ServerMessage>,
}

impl InboundHandler {
    pub fn new(control: mpsc::Sender<ControlCommand>,
               feed: BrowserFeed,
               outbound: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { control, feed, outbound }
    }

    pub async fn handle(&self, message: String) -> Result<(), TrackerError> {
        let update = match serde_json::from_str::<ClientMessage>(&message) {
            Ok(update) => update,
            Err(e) => {
                warn!("Unreadable client message: {}", e);
                let error = ServerMessage::ProtocolError {
                    message: format!("Error deserializing update: {}", e),
                };
                return self.outbound.send(error).map_err(|_| TrackerError::Disconnected);
            }
        };

        match update {
            ClientMessage::Capabilities { geolocation } => self.feed.set_geolocation(geolocation),
            ClientMessage::Start => self.command(ControlCommand::Start).await?,
            ClientMessage::Stop => self.command(ControlCommand::Stop).await?,
            ClientMessage::Position(report) => {
                let watch_id = report.watch_id;
                let sample = PositionSample::from(report);
                self.feed.deliver(watch_id, LocationEvent::Sample(sample)).await;
            }
            ClientMessage::PositionError { watch_id, code, message } => {
                let error = PositionError::new(code, message);
                self.feed.deliver(watch_id, LocationEvent::Error(error)).await;
            }
        }
        Ok(())
    }

    async fn command(&self, command: ControlCommand) -> Result<(), TrackerError> {
        debug!("Control activated: {:?}", command);
        self.control.send(command).await.map_err(|_| TrackerError::Disconnected)
    }
}
