//! Agent and article records.
//!
//! Agents live in the `ai_agents` collection and articles in `posts`. Field
//! names on the wire are camelCase to match the records the admin surface
//! writes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NewsroomError, Result};
use crate::storage::store::Record;

/// Collection holding agent definitions.
pub const AGENTS_COLLECTION: &str = "ai_agents";
/// Collection holding published articles.
pub const POSTS_COLLECTION: &str = "posts";

// =============================================================================
// Schedule
// =============================================================================

/// Run frequency of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleFrequency {
    #[serde(rename = "6h")]
    SixHours,
    Daily,
    TwiceWeekly,
    Weekly,
    SemiMonthly,
    Monthly,
}

impl ScheduleFrequency {
    pub const ALL: &'static [Self] = &[
        Self::SixHours,
        Self::Daily,
        Self::TwiceWeekly,
        Self::Weekly,
        Self::SemiMonthly,
        Self::Monthly,
    ];

    /// Interval used for tokens that are not in the table.
    pub const DEFAULT_INTERVAL_HOURS: i64 = 24;

    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::SixHours => "6h",
            Self::Daily => "daily",
            Self::TwiceWeekly => "twice_weekly",
            Self::Weekly => "weekly",
            Self::SemiMonthly => "semi_monthly",
            Self::Monthly => "monthly",
        }
    }

    #[must_use]
    pub const fn interval_hours(self) -> i64 {
        match self {
            Self::SixHours => 6,
            Self::Daily => 24,
            Self::TwiceWeekly => 84,
            Self::Weekly => 168,
            Self::SemiMonthly => 360,
            Self::Monthly => 720,
        }
    }

    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_lowercase();
        Self::ALL.iter().copied().find(|f| f.token() == token)
    }

    /// Interval for a raw schedule token, defaulting to 24 hours.
    #[must_use]
    pub fn interval_for_token(token: &str) -> Duration {
        let hours = Self::from_token(token).map_or(Self::DEFAULT_INTERVAL_HOURS, Self::interval_hours);
        Duration::hours(hours)
    }
}

// =============================================================================
// Perspective
// =============================================================================

/// Seven-point editorial perspective scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    FarLeft,
    Left,
    CenterLeft,
    Center,
    CenterRight,
    Right,
    FarRight,
}

impl Perspective {
    /// Map a score to the scale, clamping to [-3, 3].
    #[must_use]
    pub const fn from_score(score: i8) -> Self {
        match score {
            i8::MIN..=-3 => Self::FarLeft,
            -2 => Self::Left,
            -1 => Self::CenterLeft,
            0 => Self::Center,
            1 => Self::CenterRight,
            2 => Self::Right,
            3..=i8::MAX => Self::FarRight,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FarLeft => "Far Left",
            Self::Left => "Left",
            Self::CenterLeft => "Center-Left",
            Self::Center => "Center",
            Self::CenterRight => "Center-Right",
            Self::Right => "Right",
            Self::FarRight => "Far Right",
        }
    }
}

impl std::fmt::Display for Perspective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Agent Definition
// =============================================================================

/// Whether the scheduler may pick an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Paused,
}

impl AgentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
        }
    }
}

/// A configured autonomous journalist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub niche: String,
    /// Raw schedule token. Unknown tokens run daily.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: AgentStatus,
    /// Score on the [-3, 3] perspective scale.
    #[serde(default)]
    pub perspective: i8,
    #[serde(default)]
    pub use_current_events: bool,
    #[serde(default)]
    pub author_id: Option<String>,
}

fn default_schedule() -> String {
    ScheduleFrequency::Daily.token().to_string()
}

impl AgentDefinition {
    /// New active agent with a daily schedule and a centered perspective.
    #[must_use]
    pub fn new(name: impl Into<String>, category: impl Into<String>, niche: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            age: None,
            category: category.into(),
            category_id: None,
            niche: niche.into(),
            schedule: default_schedule(),
            last_run_at: None,
            claimed_at: None,
            status: AgentStatus::Active,
            perspective: 0,
            use_current_events: false,
            author_id: None,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        ScheduleFrequency::interval_for_token(&self.schedule)
    }

    #[must_use]
    pub const fn perspective_label(&self) -> Perspective {
        Perspective::from_score(self.perspective)
    }

    /// Decode a stored record.
    ///
    /// # Errors
    ///
    /// Returns a store error if required fields are missing or malformed.
    pub fn from_record(record: &Record) -> Result<Self> {
        serde_json::from_value(Value::Object(record.clone()))
            .map_err(|e| NewsroomError::Store(format!("invalid agent record: {e}")))
    }

    /// Encode for storage.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if serialization fails.
    pub fn to_record(&self) -> Result<Record> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(NewsroomError::Store("agent did not encode as an object".to_string())),
        }
    }
}

// =============================================================================
// Generated Article
// =============================================================================

/// Publication state of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
}

/// Article produced by one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArticle {
    pub title: String,
    pub html_body: String,
    pub status: ArticleStatus,
    pub author_id: Option<String>,
    pub agent_id: String,
    pub category_id: Option<String>,
    pub featured_image_data_uri: Option<String>,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl GeneratedArticle {
    /// Encode for storage.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if serialization fails.
    pub fn to_record(&self) -> Result<Record> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(NewsroomError::Store("article did not encode as an object".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schedule_table_matches_tokens() {
        let expected = [
            ("6h", 6),
            ("daily", 24),
            ("twice_weekly", 84),
            ("weekly", 168),
            ("semi_monthly", 360),
            ("monthly", 720),
        ];
        for (token, hours) in expected {
            assert_eq!(ScheduleFrequency::interval_for_token(token), Duration::hours(hours), "{token}");
        }
    }

    #[test]
    fn unknown_schedule_falls_back_to_daily() {
        assert_eq!(ScheduleFrequency::interval_for_token("hourly"), Duration::hours(24));
        assert_eq!(ScheduleFrequency::interval_for_token(""), Duration::hours(24));
    }

    #[test]
    fn perspective_scale_is_clamped() {
        assert_eq!(Perspective::from_score(-3).label(), "Far Left");
        assert_eq!(Perspective::from_score(0).label(), "Center");
        assert_eq!(Perspective::from_score(2).label(), "Right");
        assert_eq!(Perspective::from_score(9), Perspective::FarRight);
        assert_eq!(Perspective::from_score(-9), Perspective::FarLeft);
    }

    #[test]
    fn agent_record_uses_camel_case_and_defaults() {
        let record = json!({
            "id": "a1",
            "name": "Ada",
            "niche": "chips",
            "lastRunAt": "2026-01-01T00:00:00Z",
            "useCurrentEvents": true
        });
        let agent = AgentDefinition::from_record(record.as_object().unwrap()).unwrap();
        assert_eq!(agent.schedule, "daily");
        assert_eq!(agent.status, AgentStatus::Active);
        assert!(agent.use_current_events);
        assert!(agent.last_run_at.is_some());

        let encoded = agent.to_record().unwrap();
        assert_eq!(encoded["useCurrentEvents"], true);
        assert_eq!(encoded["claimedAt"], Value::Null);
    }

    #[test]
    fn new_agent_omits_empty_id() {
        let encoded = AgentDefinition::new("Ada", "Tech", "chips").to_record().unwrap();
        assert!(!encoded.contains_key("id"));
    }

    #[test]
    fn article_serializes_null_image() {
        let article = GeneratedArticle {
            title: "T".to_string(),
            html_body: "<p>b</p>".to_string(),
            status: ArticleStatus::Published,
            author_id: None,
            agent_id: "a1".to_string(),
            category_id: None,
            featured_image_data_uri: None,
            slug: "t-abc".to_string(),
            created_at: Utc::now(),
        };
        let record = article.to_record().unwrap();
        assert_eq!(record["featuredImageDataUri"], Value::Null);
        assert_eq!(record["status"], "published");
    }
}
