//! Location tracker server.
//!
//! Run the server with
//! ```not_rust
//! cargo run --bin location-tracker
//! ```
//!
//! Then open the tracker page in a browser that has geolocation
//! ```not_rust
//! firefox http://localhost:3000
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Server;
use location_tracker::config::{CONFIG, DEFAULT_LOG_FILTER};
use location_tracker::handlers::sessions::SessionRegistry;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let registry = Arc::new(SessionRegistry::new(CONFIG.max_sessions));
    let app = location_tracker::app(registry, &CONFIG.assets_dir);

    let addr = CONFIG.addr()?;
    info!("listening on {}, serving {}", addr, CONFIG.assets_dir.display());

    Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}
