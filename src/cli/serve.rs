//! Serve command.

use std::net::{IpAddr, SocketAddr};

use crate::cli::AppContext;
use crate::cli::args::ServeArgs;
use crate::error::{NewsroomError, Result};
use crate::server::{AppState, spawn};

/// Socket address from flags, falling back to the `[server]` section.
///
/// # Errors
///
/// Returns a configuration error if the host is not an IP address.
pub fn bind_addr(ctx: &AppContext, args: &ServeArgs) -> Result<SocketAddr> {
    let server = &ctx.resolved.config.server;
    let host = args.host.as_deref().unwrap_or(&server.host);
    let ip: IpAddr = host
        .parse()
        .map_err(|_| NewsroomError::Config(format!("invalid server host \"{host}\"")))?;
    Ok(SocketAddr::new(ip, args.port.unwrap_or(server.port)))
}

/// Execute the serve command. Runs until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the store cannot be
/// opened.
pub async fn execute(ctx: &AppContext, args: &ServeArgs) -> Result<()> {
    let gateway = ctx.gateway()?;
    let runner = ctx.runner(gateway.clone(), ctx.store()?);
    let (addr, handle) = spawn(AppState::new(gateway, runner), bind_addr(ctx, args)?).await?;
    eprintln!("newsroom listening on http://{addr}");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down HTTP server");
    handle.abort();
    Ok(())
}
