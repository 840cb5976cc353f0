//! Agent execution pipeline.
//!
//! One run walks `Init → Claim → Scope → Draft → Image → Publish →
//! UpdateLastRun → Done`. The image stage may fail without stopping the run.
//! Any other failure aborts, leaves `lastRunAt` untouched and is reported to
//! the observer as `Failed`. The claim is always released at the end.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::article::{extract_title, sanitize_html, slug_with_suffix};
use super::generator::{ArticleRequest, ContentGenerator};
use super::model::{AGENTS_COLLECTION, AgentDefinition, ArticleStatus, GeneratedArticle, POSTS_COLLECTION};
use super::persona::{build_article_prompt, build_image_prompt, build_system_instruction};
use super::scheduler::select_due_agent;
use crate::core::provider::Provider;
use crate::error::{NewsroomError, Result};
use crate::storage::store::{DataStore, Query, Record};

/// Default age after which an unreleased claim may be taken over.
pub const DEFAULT_CLAIM_TTL_MINUTES: i64 = 30;

/// Named pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Claim,
    Scope,
    Draft,
    Image,
    Publish,
    UpdateLastRun,
    Done,
    Failed,
}

impl Stage {
    /// Rough completion estimate when the stage starts.
    #[must_use]
    pub const fn percent(self) -> u8 {
        match self {
            Self::Init => 5,
            Self::Claim => 10,
            Self::Scope => 20,
            Self::Draft => 35,
            Self::Image => 65,
            Self::Publish => 85,
            Self::UpdateLastRun => 95,
            Self::Done | Self::Failed => 100,
        }
    }
}

/// Informational progress event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub stage: Stage,
    pub message: String,
    pub percent: u8,
}

/// Observer invoked synchronously at every stage boundary.
pub type ProgressObserver<'a> = &'a (dyn Fn(&Progress) + Send + Sync);

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub agent_id: String,
    pub agent_name: String,
    pub article_id: String,
    pub title: String,
    pub slug: String,
    pub has_image: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Runs agents against a generator and a store.
#[derive(Clone)]
pub struct AgentRunner {
    generator: Arc<dyn ContentGenerator>,
    store: Arc<dyn DataStore>,
    claim_ttl: Duration,
}

impl std::fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("claim_ttl", &self.claim_ttl)
            .finish_non_exhaustive()
    }
}

struct Notifier<'a> {
    observer: Option<ProgressObserver<'a>>,
}

impl Notifier<'_> {
    fn stage(&self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(stage = ?stage, %message, "Pipeline stage");
        if let Some(observer) = self.observer {
            observer(&Progress {
                stage,
                message,
                percent: stage.percent(),
            });
        }
    }
}

impl AgentRunner {
    #[must_use]
    pub fn new(generator: Arc<dyn ContentGenerator>, store: Arc<dyn DataStore>) -> Self {
        Self {
            generator,
            store,
            claim_ttl: Duration::minutes(DEFAULT_CLAIM_TTL_MINUTES),
        }
    }

    #[must_use]
    pub const fn with_claim_ttl(mut self, claim_ttl: Duration) -> Self {
        self.claim_ttl = claim_ttl;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    /// One scheduler pass: pick the due (or forced) agent and run it.
    ///
    /// Returns `Ok(None)` when nothing is due.
    ///
    /// # Errors
    ///
    /// `AgentNotFound` when a forced id is not an active agent, otherwise
    /// whatever the run itself fails with.
    pub async fn deploy(
        &self,
        forced_id: Option<&str>,
        now: DateTime<Utc>,
        observer: Option<ProgressObserver<'_>>,
    ) -> Result<Option<RunReport>> {
        let agents = load_agents(self.store.as_ref())?;
        let Some(agent) = select_due_agent(&agents, now, forced_id) else {
            if let Some(id) = forced_id {
                return Err(NewsroomError::AgentNotFound(id.to_string()));
            }
            tracing::info!(agents = agents.len(), "No agent due");
            return Ok(None);
        };

        tracing::info!(agent_id = %agent.id, agent = %agent.name, forced = forced_id.is_some(), "Deploying agent");
        self.run(agent, now, observer).await.map(Some)
    }

    /// Run the pipeline for `agent`.
    ///
    /// # Errors
    ///
    /// Fails on missing text keys, a lost claim, text generation failure or a
    /// store failure. Image failures are not errors.
    pub async fn run(
        &self,
        agent: &AgentDefinition,
        now: DateTime<Utc>,
        observer: Option<ProgressObserver<'_>>,
    ) -> Result<RunReport> {
        let notify = Notifier { observer };

        notify.stage(Stage::Init, format!("Preparing {}", agent.name));
        if !self.generator.is_configured() {
            let error = NewsroomError::NoKeysConfigured {
                provider: Provider::Gemini.cli_name().to_string(),
            };
            return Err(Self::fail(&notify, agent, error));
        }

        notify.stage(Stage::Claim, format!("Claiming {}", agent.name));
        if let Err(error) = self.claim(agent, now) {
            return Err(Self::fail(&notify, agent, error));
        }

        let result = self.run_claimed(agent, now, &notify).await;

        if let Err(error) = self.release(agent) {
            tracing::warn!(agent_id = %agent.id, error = %error, "Failed to release agent claim");
        }

        match result {
            Ok(report) => {
                notify.stage(Stage::Done, format!("Published \"{}\"", report.title));
                Ok(report)
            }
            Err(error) => Err(Self::fail(&notify, agent, error)),
        }
    }

    fn fail(notify: &Notifier<'_>, agent: &AgentDefinition, error: NewsroomError) -> NewsroomError {
        tracing::error!(agent_id = %agent.id, error = %error, "Agent run failed");
        notify.stage(Stage::Failed, error.to_string());
        error
    }

    async fn run_claimed(
        &self,
        agent: &AgentDefinition,
        now: DateTime<Utc>,
        notify: &Notifier<'_>,
    ) -> Result<RunReport> {
        notify.stage(Stage::Scope, format!("Scoping a story on {}", agent.niche));
        let request = ArticleRequest {
            system_instruction: build_system_instruction(agent),
            prompt: build_article_prompt(agent),
            use_search: agent.use_current_events,
        };

        notify.stage(Stage::Draft, "Drafting article");
        let draft = self.generator.generate_article(&request).await?;
        let (title, body) = extract_title(&draft);

        notify.stage(Stage::Image, "Generating featured image");
        let (image, image_error) = match self.generator.generate_image(&build_image_prompt(&title)).await {
            Ok(Some(image)) => (Some(image.to_data_uri()), None),
            Ok(None) => {
                tracing::warn!(agent_id = %agent.id, "Image generation returned no image data");
                (None, Some("no image data returned".to_string()))
            }
            Err(error) => {
                tracing::warn!(agent_id = %agent.id, error = %error, "Image generation failed, publishing without image");
                (None, Some(error.to_string()))
            }
        };

        notify.stage(Stage::Publish, format!("Publishing \"{title}\""));
        let article = GeneratedArticle {
            slug: slug_with_suffix(&title, now),
            title,
            html_body: sanitize_html(&body),
            status: ArticleStatus::Published,
            author_id: self
                .store
                .current_principal()
                .or_else(|| agent.author_id.clone()),
            agent_id: agent.id.clone(),
            category_id: agent.category_id.clone(),
            featured_image_data_uri: image,
            created_at: now,
        };
        let article_id = self.store.insert(POSTS_COLLECTION, article.to_record()?)?;
        tracing::info!(agent_id = %agent.id, article_id = %article_id, slug = %article.slug, "Article published");

        notify.stage(Stage::UpdateLastRun, "Recording run");
        let mut fields = Map::new();
        fields.insert("lastRunAt".to_string(), serde_json::to_value(now)?);
        self.store.update(AGENTS_COLLECTION, &agent.id, fields)?;

        Ok(RunReport {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            article_id,
            has_image: article.featured_image_data_uri.is_some(),
            title: article.title,
            slug: article.slug,
            image_error,
            completed_at: now,
        })
    }

    /// Take the agent's claim with a conditional update.
    ///
    /// Fails with `AgentBusy` if the stored `lastRunAt` moved since the agent
    /// was read, or a claim younger than the TTL exists.
    fn claim(&self, agent: &AgentDefinition, now: DateTime<Utc>) -> Result<()> {
        let stored = self
            .store
            .get(AGENTS_COLLECTION, &agent.id)?
            .ok_or_else(|| NewsroomError::AgentNotFound(agent.id.clone()))?;

        let stored_last_run = timestamp_field(&stored, "lastRunAt");
        if stored_last_run != agent.last_run_at {
            return Err(NewsroomError::AgentBusy(agent.id.clone()));
        }
        if let Some(claimed_at) = timestamp_field(&stored, "claimedAt") {
            if now - claimed_at < self.claim_ttl {
                return Err(NewsroomError::AgentBusy(agent.id.clone()));
            }
            tracing::warn!(agent_id = %agent.id, %claimed_at, "Taking over stale claim");
        }

        let mut expected = Record::new();
        for field in ["lastRunAt", "claimedAt"] {
            expected.insert(
                field.to_string(),
                stored.get(field).cloned().unwrap_or(Value::Null),
            );
        }
        let mut fields = Record::new();
        fields.insert("claimedAt".to_string(), serde_json::to_value(now)?);

        if self.store.update_if(AGENTS_COLLECTION, &agent.id, &expected, fields)? {
            Ok(())
        } else {
            Err(NewsroomError::AgentBusy(agent.id.clone()))
        }
    }

    fn release(&self, agent: &AgentDefinition) -> Result<()> {
        let mut fields = Record::new();
        fields.insert("claimedAt".to_string(), Value::Null);
        self.store.update(AGENTS_COLLECTION, &agent.id, fields)
    }
}

fn timestamp_field(record: &Record, field: &str) -> Option<DateTime<Utc>> {
    record
        .get(field)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Every decodable agent in store order. Malformed records are skipped.
///
/// # Errors
///
/// Returns the store error if the select fails.
pub fn load_agents(store: &dyn DataStore) -> Result<Vec<AgentDefinition>> {
    let records = store.select(AGENTS_COLLECTION, &Query::new())?;
    Ok(records
        .iter()
        .filter_map(|record| match AgentDefinition::from_record(record) {
            Ok(agent) => Some(agent),
            Err(error) => {
                tracing::warn!(error = %error, "Skipping malformed agent record");
                None
            }
        })
        .collect())
}
