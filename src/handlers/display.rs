use tokio::sync::mpsc;
use tracing::debug;

use crate::handlers::tracker::DisplaySurface;
use crate::models::updates::{Control, DisplayField, ServerMessage};

/// Renders tracker output as messages to the connected browser.
pub struct ChannelDisplay {
    outbound: mpsc::UnboundedSender<ServerMessage>,
}

impl ChannelDisplay {
    pub fn new(outbound: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { outbound }
    }

    fn send(&self, msg: ServerMessage) {
        if let Err(e) = self.outbound.send(msg) {
            debug!("Display update dropped, client gone: {:?}", e.0);
        }
    }
}

impl DisplaySurface for ChannelDisplay {
    fn set_field(&mut self, field: DisplayField, value: String) {
        self.send(ServerMessage::Field { field, value });
    }

    fn set_control(&mut self, control: Control, enabled: bool) {
        self.send(ServerMessage::Control { control, enabled });
    }

    fn alert(&mut self, message: String) {
        self.send(ServerMessage::Alert { message });
    }
}
