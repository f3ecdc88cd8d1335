pub mod battle;
pub mod client;
pub mod dryrun;
pub mod error;
pub mod gemini;
pub mod orchestrator;
pub mod prompts;
pub mod provider;

use std::env;

use serde_json::{Map, Value};

pub use client::GenerationClient;
pub use error::GenerationError;
pub use orchestrator::{
    ApplyOutcome, GenerationState, GenerationStatus, InvalidTransition, Orchestrator, PromptInput,
    RequestTicket,
};
pub use provider::{
    default_provider_registry, provider_registry, ImageProvider, ImageRequest, ProviderRegistry,
    TextProvider, TextPurpose, TextRequest,
};

pub(crate) fn value_as_f64(value: Option<&Value>, default: f64, min: f64, max: f64) -> f64 {
    let parsed = value.and_then(|row| match row {
        Value::Number(num) => num.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    });
    parsed.unwrap_or(default).clamp(min, max)
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Flattens an error and its causes into one line, skipping repeats.
pub fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing: &String| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

pub(crate) fn event_payload(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{error_chain_text, truncate_text, value_as_f64};

    #[test]
    fn error_chain_text_preserves_nested_contexts() {
        let err = anyhow::anyhow!("connection reset")
            .context("Gemini request failed")
            .context("creature image");
        assert_eq!(
            error_chain_text(&err, 512),
            "creature image | caused by: Gemini request failed | caused by: connection reset"
        );
    }

    #[test]
    fn error_chain_text_truncates() {
        let err = anyhow::anyhow!("abcdefghij");
        assert_eq!(error_chain_text(&err, 4), "abcd…");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn value_as_f64_parses_and_clamps() {
        assert_eq!(value_as_f64(Some(&json!("30")), 90.0, 15.0, 300.0), 30.0);
        assert_eq!(value_as_f64(Some(&json!(1000)), 90.0, 15.0, 300.0), 300.0);
        assert_eq!(value_as_f64(Some(&json!("soon")), 90.0, 15.0, 300.0), 90.0);
        assert_eq!(value_as_f64(None, 1.2, 0.1, 10.0), 1.2);
    }
}
