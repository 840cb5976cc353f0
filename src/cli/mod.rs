//! CLI argument parsing and command dispatch.

pub mod agents;
pub mod args;
pub mod deploy;
pub mod generate;
pub mod research;
pub mod serve;
pub mod validate;
pub mod watch;

use std::sync::Arc;

use chrono::Duration;

use crate::agents::generator::DispatchGenerator;
use crate::agents::pipeline::AgentRunner;
use crate::core::gateway::Gateway;
use crate::core::provider::Secrets;
use crate::error::Result;
use crate::storage::config::{CliOverrides, ResolvedConfig};
use crate::storage::sqlite::SqliteStore;
use crate::storage::store::DataStore;

pub use args::{Cli, Commands, OutputFormat};

/// Output options shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl Output {
    /// Print a serializable value as JSON, or `human` otherwise.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if serialization fails.
    pub fn emit<T: serde::Serialize>(&self, value: &T, human: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", crate::render::render_json(value, self.pretty)?),
            OutputFormat::Human => print!("{}", human()),
        }
        Ok(())
    }
}

/// Configuration resolved once per invocation.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub resolved: ResolvedConfig,
}

impl AppContext {
    /// Resolve configuration from flags, environment and the config file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid config file or value.
    pub fn load(overrides: &CliOverrides) -> Result<Self> {
        let resolved = ResolvedConfig::resolve(overrides)?;
        tracing::debug!(
            timeout = ?resolved.timeout,
            timeout_source = %resolved.sources.timeout,
            db = %resolved.db_path.display(),
            db_source = %resolved.sources.db_path,
            "Resolved configuration"
        );
        Ok(Self { resolved })
    }

    /// Routing gateway using keys from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn gateway(&self) -> Result<Arc<Gateway>> {
        Gateway::from_config(&self.resolved.config, Secrets::from_env()).map(Arc::new)
    }

    /// Open the local data store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn store(&self) -> Result<Arc<dyn DataStore>> {
        let store = SqliteStore::open(&self.resolved.db_path)?
            .with_principal(self.resolved.author_id.clone());
        Ok(Arc::new(store))
    }

    /// Agent runner wired to the gateway and the store.
    #[must_use]
    pub fn runner(&self, gateway: Arc<Gateway>, store: Arc<dyn DataStore>) -> AgentRunner {
        let generator = DispatchGenerator::new(gateway, self.resolved.config.gemini.image_model.clone());
        AgentRunner::new(Arc::new(generator), store)
            .with_claim_ttl(Duration::minutes(self.resolved.config.scheduler.claim_ttl_minutes))
    }
}
