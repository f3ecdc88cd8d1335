use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Text half of a battle simulation, as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleAnalysis {
    pub summary: String,
    pub log: String,
    pub winner: String,
}

impl BattleAnalysis {
    /// Substituted when the text payload does not parse.
    pub fn analysis_failed() -> Self {
        Self {
            summary: "Analysis Failed".to_string(),
            log: "Could not generate log.".to_string(),
            winner: "Unknown".to_string(),
        }
    }

    /// Substituted when the text call itself fails.
    pub fn simulation_error() -> Self {
        Self {
            summary: "Error".to_string(),
            log: "Could not run simulation.".to_string(),
            winner: "None".to_string(),
        }
    }

    /// Strict parse; blank summary or winner counts as a schema violation.
    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        let parsed =
            serde_json::from_str::<Self>(raw.trim()).map_err(|err| err.to_string())?;
        if parsed.summary.trim().is_empty() {
            return Err("summary is empty".to_string());
        }
        if parsed.winner.trim().is_empty() {
            return Err("winner is empty".to_string());
        }
        Ok(parsed)
    }

    /// Snaps the winner onto one of the contestants' names when it matches
    /// case-insensitively.
    pub fn normalize_winner(&mut self, contestants: [&str; 2]) {
        let wanted = self.winner.trim().to_lowercase();
        if let Some(name) = contestants
            .into_iter()
            .find(|name| name.trim().to_lowercase() == wanted)
        {
            self.winner = name.to_string();
        }
    }
}

/// Ephemeral outcome of one battle; never archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    pub summary: String,
    pub log: String,
    pub winner: String,
    pub image_url: Option<String>,
}

impl BattleResult {
    pub fn new(analysis: BattleAnalysis, image_url: Option<String>) -> Self {
        Self {
            summary: analysis.summary,
            log: analysis.log,
            winner: analysis.winner,
            image_url,
        }
    }
}

pub fn battle_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "log": { "type": "STRING" },
            "winner": { "type": "STRING" },
        },
        "required": ["summary", "log", "winner"],
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSpan {
    Plain(String),
    Emphasis(String),
}

/// Splits a battle log into paragraphs (blank-line separated) of plain and
/// `**emphasised**` spans. Unterminated markers stay literal.
pub fn log_paragraphs(text: &str) -> Vec<Vec<LogSpan>> {
    let normalized = text.replace("\r\n", "\n");
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();
    for line in normalized.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
            continue;
        }
        current.push(line);
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs.iter().map(|para| emphasis_spans(para)).collect()
}

fn emphasis_spans(paragraph: &str) -> Vec<LogSpan> {
    let mut spans = Vec::new();
    let mut rest = paragraph;
    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        if start > 0 {
            spans.push(LogSpan::Plain(rest[..start].to_string()));
        }
        spans.push(LogSpan::Emphasis(after[..end].to_string()));
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        spans.push(LogSpan::Plain(rest.to_string()));
    }
    spans
}
