//! Storage for configuration and newsroom records.

pub mod config;
pub mod paths;
pub mod sqlite;
pub mod store;

pub use config::{
    CliOverrides, Config, ConfigSource, ConfigSources, ENV_AUTHOR_ID, ENV_CONFIG, ENV_DB,
    ENV_TIMEOUT, ResolvedConfig,
};
pub use paths::AppPaths;
pub use sqlite::SqliteStore;
pub use store::{DataStore, Direction, MemoryStore, Query, Record};
