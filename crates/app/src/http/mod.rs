pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::state::AppState;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Serves the quote API on `addr` until the listener fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), HttpError> {
    let app = router::build(state);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| HttpError::Bind { addr, source })?;
    info!(local_addr = %listener.local_addr()?, "http server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
