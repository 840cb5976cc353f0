//! Test utilities for newsroom.
//!
//! Provides fake collaborators, test data factories and assertion macros
//! for use across unit and integration tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use newsroom::test_utils::*;
//!
//! let (store, agents) = seeded_store(&[make_test_agent("Ada")]);
//! let generator = FakeGenerator::new().failing_image();
//! let dir = TestDir::new();
//! dir.create_file("config.toml", &make_test_config_toml());
//! ```

use std::fs;
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde_json::{Value, json};

use crate::agents::generator::{ArticleRequest, ContentGenerator};
use crate::agents::model::{AGENTS_COLLECTION, AgentDefinition};
use crate::core::normalize::{InlineImage, strip_code_fence};
use crate::error::{NewsroomError, Result};
use crate::storage::store::{DataStore, MemoryStore};

// =============================================================================
// Test Data Factories
// =============================================================================

/// Active daily agent that has never run.
#[must_use]
pub fn make_test_agent(name: &str) -> AgentDefinition {
    AgentDefinition::new(name, "Technology", "semiconductors")
}

/// Agent with a schedule token and last run time.
#[must_use]
pub fn make_test_agent_ran_at(
    name: &str,
    schedule: &str,
    last_run_at: Option<DateTime<Utc>>,
) -> AgentDefinition {
    AgentDefinition {
        schedule: schedule.to_string(),
        last_run_at,
        ..make_test_agent(name)
    }
}

/// Memory store holding `agents`, with the assigned ids filled in.
///
/// # Panics
///
/// Panics if an agent cannot be encoded or inserted.
#[must_use]
pub fn seeded_store(agents: &[AgentDefinition]) -> (Arc<MemoryStore>, Vec<AgentDefinition>) {
    let store = Arc::new(MemoryStore::new());
    let stored = agents
        .iter()
        .map(|agent| {
            let record = agent.to_record().expect("agent encodes");
            let id = store
                .insert(AGENTS_COLLECTION, record)
                .expect("agent inserts");
            AgentDefinition {
                id,
                ..agent.clone()
            }
        })
        .collect();
    (store, stored)
}

/// Gemini `generateContent` payload with a single text part.
#[must_use]
pub fn make_gemini_text_payload(text: &str) -> Value {
    json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
    })
}

/// Gemini payload carrying one inline PNG (base64 of "png-bytes").
#[must_use]
pub fn make_gemini_image_payload() -> Value {
    json!({
        "candidates": [{"content": {"parts": [
            {"text": "Here is your image"},
            {"inlineData": {"mimeType": "image/png", "data": "cG5nLWJ5dGVz"}}
        ]}}]
    })
}

/// Chat-completions payload with `content` as the first choice.
#[must_use]
pub fn make_chat_payload(content: &str) -> Value {
    json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
}

/// Chat payload whose content is a JSON array of research items.
#[must_use]
pub fn make_research_payload(titles: &[&str]) -> Value {
    let items: Vec<Value> = titles
        .iter()
        .map(|title| json!({"title": title, "summary": format!("About {title}"), "source": "https://news.example"}))
        .collect();
    make_chat_payload(&Value::Array(items).to_string())
}

/// Minimal config file for integration tests.
#[must_use]
pub fn make_test_config_toml() -> String {
    r#"[general]
timeout_seconds = 10

[gemini]
models = ["gemini-2.5-flash"]

[server]
host = "127.0.0.1"
port = 0

[scheduler]
interval_minutes = 5
claim_ttl_minutes = 30
"#
    .to_string()
}

// =============================================================================
// Fake Generator
// =============================================================================

/// Behaviour of [`FakeGenerator::generate_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeImage {
    /// Return a small PNG.
    Png,
    /// Return `Ok(None)`.
    Missing,
    /// Return an error.
    Fail,
}

/// Scripted [`ContentGenerator`] that never touches the network.
#[derive(Debug)]
pub struct FakeGenerator {
    configured: bool,
    article: Option<String>,
    image: FakeImage,
    article_calls: AtomicUsize,
    image_calls: AtomicUsize,
}

impl Default for FakeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGenerator {
    /// Configured generator producing a short article and an image.
    #[must_use]
    pub fn new() -> Self {
        Self {
            configured: true,
            article: Some("<h1>Test Headline</h1><p>Body text.</p>".to_string()),
            image: FakeImage::Png,
            article_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
        }
    }

    /// Generator reporting that no text key is available.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_article(mut self, html: &str) -> Self {
        self.article = Some(html.to_string());
        self
    }

    /// Text generation fails as if every provider attempt failed.
    #[must_use]
    pub fn failing_article(mut self) -> Self {
        self.article = None;
        self
    }

    #[must_use]
    pub const fn failing_image(mut self) -> Self {
        self.image = FakeImage::Fail;
        self
    }

    #[must_use]
    pub const fn without_image(mut self) -> Self {
        self.image = FakeImage::Missing;
        self
    }

    #[must_use]
    pub fn article_calls(&self) -> usize {
        self.article_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

impl ContentGenerator for FakeGenerator {
    fn is_configured(&self) -> bool {
        self.configured
    }

    fn generate_article<'a>(&'a self, _request: &'a ArticleRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.article_calls.fetch_add(1, Ordering::SeqCst);
            let Some(article) = &self.article else {
                return Err(NewsroomError::AllAttemptsFailed {
                    attempts: 1,
                    last_error: "scripted text failure".to_string(),
                });
            };
            let draft = strip_code_fence(article);
            if draft.is_empty() {
                return Err(NewsroomError::EmptyContent("fake".to_string()));
            }
            Ok(draft.to_string())
        })
    }

    fn generate_image<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<Option<InlineImage>>> {
        Box::pin(async move {
            self.image_calls.fetch_add(1, Ordering::SeqCst);
            match self.image {
                FakeImage::Png => Ok(Some(InlineImage {
                    mime_type: "image/png".to_string(),
                    data: b"png-bytes".to_vec(),
                })),
                FakeImage::Missing => Ok(None),
                FakeImage::Fail => Err(NewsroomError::AllAttemptsFailed {
                    attempts: 1,
                    last_error: "scripted image failure".to_string(),
                }),
            }
        })
    }
}

// =============================================================================
// Temporary Directories
// =============================================================================

/// Isolated temporary directory removed on drop.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file with the given content, creating parent directories.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_file(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.inner.path().join(name))
    }

    #[must_use]
    pub fn file_exists(&self, name: &str) -> bool {
        self.inner.path().join(name).exists()
    }

    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}
