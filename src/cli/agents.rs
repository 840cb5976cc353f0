//! Agent management commands.

use chrono::Utc;
use serde_json::{Value, json};

use crate::agents::model::{AGENTS_COLLECTION, AgentDefinition, AgentStatus};
use crate::agents::pipeline::load_agents;
use crate::cli::args::{AddAgentArgs, AgentsCommand};
use crate::cli::{AppContext, Output};
use crate::error::{NewsroomError, Result};
use crate::render::human::render_agents;
use crate::storage::store::{DataStore, Record};

/// Execute an `agents` subcommand.
///
/// # Errors
///
/// Returns store errors, `AgentNotFound` for unknown ids and
/// `InvalidRequest` for bad `add` arguments.
pub fn execute(ctx: &AppContext, command: &AgentsCommand, output: Output) -> Result<()> {
    let store = ctx.store()?;
    match command {
        AgentsCommand::List => list(store.as_ref(), output),
        AgentsCommand::Add(args) => add(store.as_ref(), args, output),
        AgentsCommand::Pause { id } => set_status(store.as_ref(), id, AgentStatus::Paused, output),
        AgentsCommand::Resume { id } => set_status(store.as_ref(), id, AgentStatus::Active, output),
        AgentsCommand::Remove { id } => remove(store.as_ref(), id, output),
    }
}

fn list(store: &dyn DataStore, output: Output) -> Result<()> {
    let now = Utc::now();
    let agents = load_agents(store)?;
    output.emit(&agents, || render_agents(&agents, now))
}

/// Build an agent from `agents add` arguments.
///
/// # Errors
///
/// Returns `InvalidRequest` if the arguments do not validate.
pub fn agent_from_args(args: &AddAgentArgs) -> Result<AgentDefinition> {
    args.validate()?;
    Ok(AgentDefinition {
        age: args.age,
        category_id: args.category_id.clone(),
        schedule: args.schedule.trim().to_lowercase(),
        perspective: args.perspective,
        use_current_events: args.current_events,
        author_id: args.author_id.clone(),
        ..AgentDefinition::new(args.name.trim(), args.category.trim(), args.niche.trim())
    })
}

fn add(store: &dyn DataStore, args: &AddAgentArgs, output: Output) -> Result<()> {
    let mut agent = agent_from_args(args)?;
    agent.id = store.insert(AGENTS_COLLECTION, agent.to_record()?)?;
    tracing::info!(agent_id = %agent.id, agent = %agent.name, "Agent created");
    output.emit(&agent, || format!("Created agent {} ({})\n", agent.name, agent.id))
}

fn set_status(store: &dyn DataStore, id: &str, status: AgentStatus, output: Output) -> Result<()> {
    if store.get(AGENTS_COLLECTION, id)?.is_none() {
        return Err(NewsroomError::AgentNotFound(id.to_string()));
    }
    let mut fields = Record::new();
    fields.insert("status".to_string(), Value::String(status.as_str().to_string()));
    store.update(AGENTS_COLLECTION, id, fields)?;
    tracing::info!(agent_id = %id, status = status.as_str(), "Agent status changed");
    output.emit(&json!({"id": id, "status": status}), || {
        format!("Agent {id} is now {}\n", status.as_str())
    })
}

fn remove(store: &dyn DataStore, id: &str, output: Output) -> Result<()> {
    if !store.delete(AGENTS_COLLECTION, id)? {
        return Err(NewsroomError::AgentNotFound(id.to_string()));
    }
    tracing::info!(agent_id = %id, "Agent removed");
    output.emit(&json!({"id": id, "removed": true}), || format!("Removed agent {id}\n"))
}
