//! Text formatting utilities.

/// Format a millisecond duration, switching to seconds from 1s.
#[must_use]
pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else {
        let tenths = (ms % 1_000) / 100;
        format!("{}.{tenths}s", ms / 1_000)
    }
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}
