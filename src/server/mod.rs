//! Inbound HTTP server.
//!
//! A plain `hyper` 1 HTTP/1 server: one task per connection, routing in
//! [`routes`]. Every response carries permissive CORS headers.

pub mod routes;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::agents::pipeline::AgentRunner;
use crate::core::gateway::Gateway;
use crate::core::research::ResearchRotation;
use crate::error::Result;

pub use routes::{MAX_BODY_BYTES, route};

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub rotation: Arc<ResearchRotation>,
    pub runner: AgentRunner,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("research_calls", &self.rotation.calls())
            .finish_non_exhaustive()
    }
}

impl AppState {
    #[must_use]
    pub fn new(gateway: Arc<Gateway>, runner: AgentRunner) -> Self {
        Self {
            gateway,
            rotation: Arc::new(ResearchRotation::default()),
            runner,
        }
    }
}

/// Bind `addr` and serve in a background task.
///
/// Returns the bound address (useful with port 0) and the server task.
///
/// # Errors
///
/// Returns an I/O error if the address cannot be bound.
pub async fn spawn(state: AppState, addr: SocketAddr) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "HTTP server listening");
    let handle = tokio::spawn(serve(listener, Arc::new(state)));
    Ok((local, handle))
}

/// Accept connections until the task is dropped or aborted.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::error!(error = %error, "HTTP accept error");
                continue;
            }
        };

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let service = service_fn(move |request| {
                let state = Arc::clone(&state);
                async move { Ok::<_, Infallible>(route(&state, request).await) }
            });
            if let Err(error) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                if error.is_incomplete_message() {
                    tracing::debug!(%peer, error = %error, "HTTP connection closed early");
                } else {
                    tracing::warn!(%peer, error = %error, "HTTP connection ended with error");
                }
            }
        });
    }
}
