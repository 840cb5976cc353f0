//! Due-agent selection.

use chrono::{DateTime, Utc};

use super::model::AgentDefinition;

/// Whether `agent` is active and its interval has elapsed (or it never ran).
#[must_use]
pub fn is_due(agent: &AgentDefinition, now: DateTime<Utc>) -> bool {
    if !agent.is_active() {
        return false;
    }
    agent
        .last_run_at
        .is_none_or(|last| last + agent.interval() <= now)
}

/// Pick the agent to run now.
///
/// A forced id bypasses the schedule but still requires the agent to be
/// active. Without one, the first due agent in the given order wins. `None`
/// is the common case and not an error.
#[must_use]
pub fn select_due_agent<'a>(
    agents: &'a [AgentDefinition],
    now: DateTime<Utc>,
    forced_id: Option<&str>,
) -> Option<&'a AgentDefinition> {
    if let Some(id) = forced_id {
        return agents.iter().find(|a| a.is_active() && a.id == id);
    }
    agents.iter().find(|a| is_due(a, now))
}

/// Every due agent, in order.
#[must_use]
pub fn due_agents(agents: &[AgentDefinition], now: DateTime<Utc>) -> Vec<&AgentDefinition> {
    agents.iter().filter(|a| is_due(a, now)).collect()
}
