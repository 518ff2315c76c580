//! Location tracker server.
//!
//! The browser owns the device's geolocation and the page; the server owns one
//! tracker per websocket connection, turning the position stream into speed,
//! distance and elapsed time for display.

pub mod config;
pub mod handlers;
pub mod models;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Router, TypedHeader};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::info;

use crate::handlers::sessions::SessionRegistry;
use crate::handlers::websocket_actor::TrackingSession;
use crate::models::updates::ServerMessage;

pub fn app(registry: Arc<SessionRegistry>, assets_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/ws", get(tracker_ws_handler))
        .fallback_service(ServeDir::new(assets_dir))
        // logging so we can see whats going on
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .with_state(registry)
}

async fn tracker_ws_handler(
    ws: WebSocketUpgrade,
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(registry): State<Arc<SessionRegistry>>,
) -> impl IntoResponse {
    let user_agent = user_agent.map(|TypedHeader(agent)| agent.to_string());
    info!("Tracker connection from {} ({:?})", addr, user_agent);

    ws.on_upgrade(move |socket| async move {
        match registry.try_open(user_agent) {
            Some(guard) => TrackingSession::new(guard.id(), socket).run().await,
            None => reject(socket).await,
        }
    })
}

async fn reject(mut socket: WebSocket) {
    let error = ServerMessage::ProtocolError {
        message: "Too many active tracking sessions".to_string(),
    };
    if let Ok(text) = serde_json::to_string(&error) {
        socket.send(Message::Text(text)).await.ok();
    }
    socket.send(Message::Close(None)).await.ok();
}
