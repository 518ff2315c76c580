use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::handlers::events::{ControlCommand, LocationEvent};
use crate::handlers::tracker::{DisplaySurface, LocationSource, Tracker};
use crate::models::error::TrackerError;

/// Owns one tracker and feeds it control activations and location events,
/// one at a time, in arrival order.
pub struct TrackerActor<L, D> {
    control: mpsc::Receiver<ControlCommand>,
    tracker: Tracker<L, D>,
    events: Option<mpsc::Receiver<LocationEvent>>,
}

impl<L: LocationSource, D: DisplaySurface> TrackerActor<L, D> {
    pub fn new(control: mpsc::Receiver<ControlCommand>, tracker: Tracker<L, D>) -> Self {
        Self {
            control,
            tracker,
            events: None,
        }
    }

    pub async fn run_actor(mut self) {
        enum Message {
            Control(Option<ControlCommand>),
            Location(Option<LocationEvent>),
        }

        self.tracker.show_idle();

        loop {
            let message = select! {
                command = self.control.recv() => Message::Control(command),
                event = next_event(&mut self.events) => Message::Location(event),
            };

            match message {
                Message::Control(Some(ControlCommand::Start)) => self.start().await,
                Message::Control(Some(ControlCommand::Stop)) => {
                    self.tracker.stop().await;
                    self.events = None;
                }
                Message::Control(None) => {
                    info!("Control channel closed");
                    self.tracker.stop().await;
                    return;
                }
                Message::Location(Some(LocationEvent::Sample(sample))) => self.tracker.on_sample(sample),
                Message::Location(Some(LocationEvent::Error(error))) => self.tracker.on_error(error),
                Message::Location(None) => {
                    debug!("Location watch ended");
                    self.events = None;
                }
            }
        }
    }

    async fn start(&mut self) {
        match self.tracker.start().await {
            Ok(events) => self.events = Some(events),
            Err(TrackerError::AlreadyTracking) => debug!("Start requested while tracking"),
            Err(e) => warn!("Tracking not started: {}", e),
        }
    }
}

async fn next_event(events: &mut Option<mpsc::Receiver<LocationEvent>>) -> Option<LocationEvent> {
    match events {
        Some(events) => events.recv().await,
        None => futures::future::pending().await,
    }
}
