//! JSON-over-HTTP surface for the press feed queries.

pub mod handlers;
pub mod models;
pub mod router;

use std::net::SocketAddr;

pub use handlers::tool_manifest;
pub use models::{ApiError, ItemResponse};
pub use router::create_router;

use crate::feed::FeedSource;
use crate::query::QueryEngine;

/// Binds `addr` and serves the API until the process is stopped.
pub async fn run_server<S: FeedSource>(
    addr: SocketAddr,
    engine: QueryEngine<S>,
) -> Result<(), std::io::Error> {
    let app = create_router(engine);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Starting server");

    axum::serve(listener, app).await
}
