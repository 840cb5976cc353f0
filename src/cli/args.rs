//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::agents::model::ScheduleFrequency;
use crate::error::{NewsroomError, Result};
use crate::storage::config::CliOverrides;

/// Newsroom - route LLM calls across providers and run autonomous journalist agents.
#[derive(Parser, Debug)]
#[command(name = "newsroom")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Per-attempt timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Path of the SQLite data store
    #[arg(long, value_name = "PATH", global = true)]
    pub db: Option<PathBuf>,

    /// Principal recorded as the author of published articles
    #[arg(long, value_name = "ID", global = true)]
    pub author_id: Option<String>,
}

impl Cli {
    /// Resolve the effective output format.
    #[must_use]
    pub fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }

    /// Flags that override configuration values.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            timeout_seconds: self.timeout,
            db_path: self.db.clone(),
            author_id: self.author_id.clone(),
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API
    Serve(ServeArgs),

    /// Check Gemini keys and models, printing every attempt
    Validate(ValidateArgs),

    /// Run an ad-hoc Gemini generation
    Generate(GenerateArgs),

    /// Research a topic through the provider rotation
    Research(ResearchArgs),

    /// Manage journalist agents
    #[command(subcommand)]
    Agents(AgentsCommand),

    /// Run one scheduler pass
    Deploy(DeployArgs),

    /// Run the scheduler continuously until Ctrl-C
    Watch(WatchArgs),
}

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides [server] host)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to bind (overrides [server] port)
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Key to test instead of the configured ones
    #[arg(long, value_name = "KEY", env = "NEWSROOM_VALIDATE_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model candidate (repeatable)
    #[arg(long = "model", value_name = "MODEL")]
    pub models: Vec<String>,
}

/// Arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Prompt text
    pub prompt: String,

    /// Model candidate (repeatable)
    #[arg(long = "model", value_name = "MODEL")]
    pub models: Vec<String>,

    /// Ground the answer with Google Search
    #[arg(long)]
    pub search: bool,
}

/// Arguments for the `research` command.
#[derive(Args, Debug)]
pub struct ResearchArgs {
    /// Topic to research
    pub query: String,

    /// Use one provider instead of the rotation
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Endpoint override for the provider
    #[arg(long, value_name = "URL", requires = "provider")]
    pub endpoint: Option<String>,
}

/// Agent subcommands.
#[derive(Subcommand, Debug)]
pub enum AgentsCommand {
    /// List agents and whether they are due
    List,

    /// Create an agent
    Add(AddAgentArgs),

    /// Stop scheduling an agent
    Pause {
        /// Agent id
        id: String,
    },

    /// Resume scheduling an agent
    Resume {
        /// Agent id
        id: String,
    },

    /// Delete an agent
    Remove {
        /// Agent id
        id: String,
    },
}

/// Arguments for `agents add`.
#[derive(Args, Debug)]
pub struct AddAgentArgs {
    /// Display name of the journalist
    #[arg(long)]
    pub name: String,

    /// Section the agent writes for
    #[arg(long)]
    pub category: String,

    /// Beat or niche topic
    #[arg(long)]
    pub niche: String,

    /// Persona age
    #[arg(long)]
    pub age: Option<u32>,

    /// Category record id for published articles
    #[arg(long, value_name = "ID")]
    pub category_id: Option<String>,

    /// Schedule: 6h, daily, twice_weekly, weekly, semi_monthly, monthly
    #[arg(long, default_value = "daily")]
    pub schedule: String,

    /// Perspective score from -3 (far left) to 3 (far right)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub perspective: i8,

    /// Ground articles in current events via search
    #[arg(long)]
    pub current_events: bool,

    /// Author id for this agent's articles
    #[arg(long, value_name = "ID")]
    pub author_id: Option<String>,
}

impl AddAgentArgs {
    /// Validate argument values.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for blank names, unknown schedules or
    /// perspective scores outside [-3, 3].
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(NewsroomError::InvalidRequest("agent name must not be empty".to_string()));
        }
        if ScheduleFrequency::from_token(&self.schedule).is_none() {
            let valid: Vec<&str> = ScheduleFrequency::ALL.iter().map(|f| f.token()).collect();
            return Err(NewsroomError::InvalidRequest(format!(
                "unknown schedule \"{}\" (valid: {})",
                self.schedule,
                valid.join(", ")
            )));
        }
        if !(-3..=3).contains(&self.perspective) {
            return Err(NewsroomError::InvalidRequest(
                "perspective must be between -3 and 3".to_string(),
            ));
        }
        Ok(())
    }
}

/// Arguments for the `deploy` command.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Run this agent now, ignoring its schedule
    #[arg(long, value_name = "ID")]
    pub agent: Option<String>,
}

/// Arguments for the `watch` command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Minutes between scheduler passes (overrides [scheduler] interval_minutes)
    #[arg(long, value_name = "N")]
    pub interval_minutes: Option<u64>,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn add_args() -> AddAgentArgs {
        AddAgentArgs {
            name: "Ada".to_string(),
            category: "Tech".to_string(),
            niche: "chips".to_string(),
            age: None,
            category_id: None,
            schedule: "daily".to_string(),
            perspective: 0,
            current_events: false,
            author_id: None,
        }
    }

    #[test]
    fn cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_wins() {
        let cli = Cli::parse_from(["newsroom", "--json", "agents", "list"]);
        assert_eq!(cli.effective_format(), OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Agents(AgentsCommand::List)));
    }

    #[test]
    fn global_overrides_are_collected() {
        let cli = Cli::parse_from(["newsroom", "deploy", "--agent", "a1", "--timeout", "5"]);
        assert_eq!(cli.overrides().timeout_seconds, Some(5));
        match cli.command {
            Commands::Deploy(args) => assert_eq!(args.agent.as_deref(), Some("a1")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn negative_perspective_parses() {
        let cli = Cli::parse_from([
            "newsroom", "agents", "add", "--name", "Ada", "--category", "Tech", "--niche", "chips",
            "--perspective", "-2",
        ]);
        match cli.command {
            Commands::Agents(AgentsCommand::Add(args)) => assert_eq!(args.perspective, -2),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn add_args_validate() {
        assert!(add_args().validate().is_ok());
        assert!(AddAgentArgs { schedule: "hourly".to_string(), ..add_args() }.validate().is_err());
        assert!(AddAgentArgs { perspective: 4, ..add_args() }.validate().is_err());
        assert!(AddAgentArgs { name: " ".to_string(), ..add_args() }.validate().is_err());
    }
}
