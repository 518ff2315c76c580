use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::handlers::browser_source::browser_source;
use crate::handlers::display::ChannelDisplay;
use crate::handlers::event_actor::TrackerActor;
use crate::handlers::handler::InboundHandler;
use crate::handlers::sessions::SessionId;
use crate::handlers::tracker::Tracker;
use crate::models::updates::ServerMessage;

const CONTROL_BUFFER: usize = 8;

struct AutoCancelTask<T>(pub JoinHandle<T>);

impl<T> Drop for AutoCancelTask<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// One browser connection and the tracker it drives.
pub struct TrackingSession {
    id: SessionId,
    actor: AutoCancelTask<()>,
    connection: WebsocketActor,
}

impl TrackingSession {
    pub fn new(id: SessionId, socket: WebSocket) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::channel(CONTROL_BUFFER);

        let (source, feed) = browser_source(outbound_tx.clone());
        let tracker = Tracker::new(source, ChannelDisplay::new(outbound_tx.clone()));
        let actor = TrackerActor::new(control_rx, tracker);
        let inbound = InboundHandler::new(control_tx, feed, outbound_tx);

        Self {
            id,
            actor: AutoCancelTask(tokio::spawn(actor.run_actor())),
            connection: WebsocketActor::new(socket, inbound, outbound_rx),
        }
    }

    /// Runs until the socket goes away and the tracker has wound down.
    pub async fn run(self) {
        let TrackingSession { id, mut actor, mut connection } = self;
        info!("Session {} connected", id);

        connection.run_actor().await;
        // without the reader the control channel closes and the actor stops
        drop(connection);
        if let Err(e) = (&mut actor.0).await {
            error!("Tracker actor for session {} failed: {}", id, e);
        }
        info!("Session {} finished", id);
    }
}

struct WebsocketActor {
    send_task: AutoCancelTask<()>,
    recv_task: AutoCancelTask<()>,
}

impl WebsocketActor {
    pub fn new(socket: WebSocket,
               inbound: InboundHandler,
               mut outbound: mpsc::UnboundedReceiver<ServerMessage>) -> Self {
        let (mut ws_sender, mut ws_receiver) = socket.split();

        let inbound_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = ws_receiver.next().await {
                debug!("Received message from client: {:?}", msg);
                match msg {
                    Message::Text(text) => {
                        if let Err(e) = inbound.handle(text).await {
                            warn!("Dropping connection: {}", e);
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        let outbound_task = tokio::spawn(async move {
            while let Some(msg) = outbound.recv().await {
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Unable to serialize {:?}: {}", msg, e);
                        continue;
                    }
                };
                debug!("Sending message to client: {}", text);
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    return;
                }
            }
            ws_sender.send(Message::Close(None)).await.ok();
        });

        Self {
            send_task: AutoCancelTask(outbound_task),
            recv_task: AutoCancelTask(inbound_task),
        }
    }

    pub async fn run_actor(&mut self) {
        tokio::select! {
            _ = &mut self.send_task.0 => (),
            _ = &mut self.recv_task.0 => ()
        }
    }
}
