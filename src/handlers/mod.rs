pub mod browser_source;
pub mod display;
pub mod event_actor;
pub mod events;
pub mod handler;
pub mod sessions;
pub mod tracker;
pub mod websocket_actor;
