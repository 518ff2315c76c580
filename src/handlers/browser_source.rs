use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace};

use crate::handlers::events::LocationEvent;
use crate::handlers::tracker::{LocationSource, Watch};
use crate::models::error::TrackerError;
use crate::models::updates::{ServerMessage, WatchId, WatchOptions};

const WATCH_BUFFER: usize = 8;

struct ActiveWatch {
    id: WatchId,
    events: mpsc::Sender<LocationEvent>,
}

/// Creates the two halves of the browser geolocation bridge.
///
/// The source half is driven by the tracker and asks the browser to start or
/// clear a `watchPosition`. The feed half sits on the socket reader and pushes
/// what the browser reports into the active watch, if any.
pub fn browser_source(outbound: mpsc::UnboundedSender<ServerMessage>) -> (BrowserLocationSource, BrowserFeed) {
    let (active_tx, active_rx) = watch::channel(None);
    let (geolocation_tx, geolocation_rx) = watch::channel(false);

    let source = BrowserLocationSource {
        outbound,
        active: active_tx,
        geolocation: geolocation_rx,
        next_id: 1,
    };
    let feed = BrowserFeed {
        active: active_rx,
        geolocation: geolocation_tx,
    };
    (source, feed)
}

pub struct BrowserLocationSource {
    outbound: mpsc::UnboundedSender<ServerMessage>,
    active: watch::Sender<Option<ActiveWatch>>,
    geolocation: watch::Receiver<bool>,
    next_id: WatchId,
}

#[async_trait]
impl LocationSource for BrowserLocationSource {
    async fn watch(&mut self, options: WatchOptions) -> Result<Watch, TrackerError> {
        if !*self.geolocation.borrow() {
            return Err(TrackerError::SourceUnavailable);
        }

        let id = self.next_id;
        self.next_id += 1;
        let (events_tx, events) = mpsc::channel(WATCH_BUFFER);

        // published before the browser hears about it so no early report is lost
        self.active.send_replace(Some(ActiveWatch { id, events: events_tx }));
        if self.outbound.send(ServerMessage::Watch { watch_id: id, options }).is_err() {
            self.active.send_replace(None);
            return Err(TrackerError::Disconnected);
        }

        debug!("Requested browser watch {}", id);
        Ok(Watch { id, events })
    }

    async fn clear_watch(&mut self, id: WatchId) {
        let cleared = self.active.send_if_modified(|active| {
            if matches!(active, Some(current) if current.id == id) {
                *active = None;
                true
            } else {
                false
            }
        });
        if !cleared {
            debug!("Watch {} was not active", id);
        }

        if self.outbound.send(ServerMessage::ClearWatch { watch_id: id }).is_err() {
            debug!("Client gone before watch {} could be cleared", id);
        }
    }
}

pub struct BrowserFeed {
    active: watch::Receiver<Option<ActiveWatch>>,
    geolocation: watch::Sender<bool>,
}

impl BrowserFeed {
    pub fn set_geolocation(&self, supported: bool) {
        info!("Client geolocation support: {}", supported);
        self.geolocation.send_replace(supported);
    }

    /// Forwards an event reported for `watch_id`; reports for any other watch
    /// are dropped.
    pub async fn deliver(&self, watch_id: WatchId, event: LocationEvent) {
        let events = {
            let active = self.active.borrow();
            match &*active {
                Some(current) if current.id == watch_id => current.events.clone(),
                _ => {
                    trace!("Dropping report for inactive watch {}", watch_id);
                    return;
                }
            }
        };

        if events.send(event).await.is_err() {
            debug!("Watch {} closed while delivering", watch_id);
        }
    }
}
