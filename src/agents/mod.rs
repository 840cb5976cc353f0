//! Autonomous journalist agents: records, scheduling, prompts and the run pipeline.

pub mod article;
pub mod generator;
pub mod model;
pub mod persona;
pub mod pipeline;
pub mod scheduler;

pub use generator::{ArticleRequest, ContentGenerator, DispatchGenerator};
pub use model::{
    AGENTS_COLLECTION, AgentDefinition, AgentStatus, ArticleStatus, GeneratedArticle,
    POSTS_COLLECTION, Perspective, ScheduleFrequency,
};
pub use pipeline::{AgentRunner, Progress, ProgressObserver, RunReport, Stage, load_agents};
pub use scheduler::{is_due, select_due_agent};
