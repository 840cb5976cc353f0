//! Research command.

use serde_json::json;

use crate::cli::args::ResearchArgs;
use crate::cli::{AppContext, Output};
use crate::core::gateway::ProxyResearchRequest;
use crate::core::research::{ResearchRotation, parse_items};
use crate::error::Result;
use crate::render::human::render_research;

/// Execute the research command.
///
/// Without `--provider` the call goes through the rotation with fallback and
/// never fails. With it, the single provider's error is returned as is.
///
/// # Errors
///
/// Returns gateway errors for an explicit provider.
pub async fn execute(ctx: &AppContext, args: &ResearchArgs, output: Output) -> Result<()> {
    let gateway = ctx.gateway()?;

    let items = match &args.provider {
        Some(provider) => {
            let payload = gateway
                .proxy_research(ProxyResearchRequest {
                    provider: provider.clone(),
                    query: args.query.clone(),
                    model: None,
                    endpoint: args.endpoint.clone(),
                })
                .await?;
            parse_items(&payload)
        }
        None => {
            ResearchRotation::default()
                .perform_research(&gateway, &args.query)
                .await
        }
    };

    output.emit(&json!({"query": args.query, "items": items}), || {
        render_research(&items)
    })
}
