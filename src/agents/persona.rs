//! Prompt construction from an agent's persona.

use std::fmt::Write as _;

use super::model::AgentDefinition;

/// System instruction embedding the agent's persona.
#[must_use]
pub fn build_system_instruction(agent: &AgentDefinition) -> String {
    let mut out = format!("You are {}", agent.name);
    if let Some(age) = agent.age {
        let _ = write!(out, ", a {age}-year-old");
    } else {
        out.push_str(", a");
    }
    let _ = write!(
        out,
        " journalist covering {} within the {} section.",
        non_blank(&agent.niche, "general news"),
        non_blank(&agent.category, "general"),
    );
    let _ = write!(
        out,
        " Your editorial perspective is {}.",
        agent.perspective_label().label()
    );
    out.push_str(
        " Write in a confident, specific voice. Return a complete HTML article: \
one <h1> headline followed by <h2> sections and <p> paragraphs. Do not wrap the \
answer in markdown code fences.",
    );
    if agent.use_current_events {
        out.push_str(
            " Use the Google Search tool to ground the article in current events \
from the past few days and mention concrete dates and sources.",
        );
    }
    out
}

/// User prompt asking for the article itself.
#[must_use]
pub fn build_article_prompt(agent: &AgentDefinition) -> String {
    format!(
        "Write a long-form article of at least 800 words about a timely topic in {}.",
        non_blank(&agent.niche, "general news")
    )
}

/// Prompt for the companion editorial image.
#[must_use]
pub fn build_image_prompt(title: &str) -> String {
    format!(
        "Editorial illustration for a news article titled \"{title}\". \
Photorealistic, no text or lettering, wide 16:9 composition."
    )
}

fn non_blank<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value.trim()
    }
}
