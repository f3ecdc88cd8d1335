use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use biogen_contracts::battle::{log_paragraphs, LogSpan};
use biogen_contracts::guided::Category;
use biogen_contracts::image_ref::decode_data_url;
use biogen_contracts::{ArchiveEntry, BattleResult, CreatureRecord, GuidedSelections, Locale};
use biogen_engine::{GenerationState, GenerationStatus};
use chrono::DateTime;

const BAR_WIDTH: usize = 20;
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Display-only clamp to the nominal 0-100 range.
pub fn stat_bar(value: i64) -> String {
    let clamped = value.clamp(0, 100) as usize;
    let filled = (clamped * BAR_WIDTH + 50) / 100;
    format!(
        "{}{} {value:>3}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled)
    )
}

pub fn status_line(state: &GenerationState) -> String {
    match state.status {
        GenerationStatus::Idle => "Ready.".to_string(),
        GenerationStatus::GeneratingData => format!(
            "Sequencing genome for \"{}\"...",
            state.prompt.as_deref().unwrap_or_default()
        ),
        GenerationStatus::GeneratingImage => "Rendering specimen visual...".to_string(),
        GenerationStatus::Complete => match state.archived_id.as_deref() {
            Some(id) => format!("Complete. Archived as {id}."),
            None => "Complete.".to_string(),
        },
        GenerationStatus::Error => format!(
            "Generation failed: {}",
            state.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

pub fn visual_line(image_url: Option<&str>) -> String {
    let Some(url) = image_url else {
        return "Visual: no visual".to_string();
    };
    match decode_data_url(url) {
        Ok(image) => format!(
            "Visual: {} image, {} bytes (save with --save-image or /save_image)",
            image.mime_type,
            image.bytes.len()
        ),
        Err(_) => "Visual: unreadable image reference".to_string(),
    }
}

/// Narrative and stats of one record. The visual line is rendered
/// separately because it usually arrives later.
pub fn creature_card(record: &CreatureRecord) -> String {
    let codex = &record.codex;
    let engine = &record.engine_data;
    let mut out = String::new();
    let _ = writeln!(out, "{BOLD}{}{RESET} ({})", codex.common_name, codex.scientific_name);
    let _ = writeln!(
        out,
        "ID {} | Class {} | Diet {}",
        record.entity_id().unwrap_or("-"),
        engine.taxonomy.class,
        engine.taxonomy.diet
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", codex.biological_description.trim());
    let _ = writeln!(out);
    let _ = writeln!(out, "Ecological role: {}", codex.ecological_role.trim());
    let _ = writeln!(out);
    for (label, value) in engine.stats.labeled() {
        let _ = writeln!(out, "  {label:<12} {}", stat_bar(value));
    }
    if !engine.traits.is_empty() {
        let _ = writeln!(out, "\nTraits:");
        for item in &engine.traits {
            let _ = writeln!(out, "  - {}: {}", item.name, item.effect);
            let _ = writeln!(out, "    basis: {}", item.biological_basis);
        }
    }
    if !engine.weaknesses.is_empty() {
        let _ = writeln!(out, "\nWeaknesses:");
        for weakness in &engine.weaknesses {
            let _ = writeln!(out, "  - {weakness}");
        }
    }
    let _ = writeln!(out, "\nBehavior:");
    let _ = writeln!(out, "  idle:   {}", engine.behavior_tree.idle);
    let _ = writeln!(out, "  combat: {}", engine.behavior_tree.combat);
    let _ = write!(out, "  mating: {}", engine.behavior_tree.mating);
    out
}

pub fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

pub fn archive_table(entries: &[ArchiveEntry]) -> String {
    if entries.is_empty() {
        return "Archive is empty.".to_string();
    }
    let id_width = entries
        .iter()
        .map(|entry| entry.id.chars().count())
        .max()
        .unwrap_or(2)
        .max(2);
    let mut out = String::new();
    let _ = writeln!(out, "{:<id_width$}  {:<16}  NAME", "ID", "CREATED");
    for entry in entries {
        let _ = writeln!(
            out,
            "{:<id_width$}  {:<16}  {} ({})",
            entry.id,
            format_timestamp(entry.timestamp),
            entry.record.common_name(),
            entry.record.engine_data.taxonomy.class
        );
    }
    let _ = write!(out, "{} specimen(s).", entries.len());
    out
}

fn render_spans(spans: &[LogSpan]) -> String {
    spans
        .iter()
        .map(|span| match span {
            LogSpan::Plain(text) => text.clone(),
            LogSpan::Emphasis(text) => format!("{BOLD}{text}{RESET}"),
        })
        .collect()
}

pub fn battle_report(a: &CreatureRecord, b: &CreatureRecord, result: &BattleResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} vs {}", a.common_name(), b.common_name());
    let _ = writeln!(out, "Winner: {BOLD}{}{RESET}", result.winner);
    let _ = writeln!(out, "{}", result.summary);
    for paragraph in log_paragraphs(&result.log) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", render_spans(&paragraph));
    }
    let _ = write!(out, "\n{}", visual_line(result.image_url.as_deref()));
    out
}

pub fn options_listing(locale: Locale, selections: &GuidedSelections) -> String {
    let mut out = String::new();
    for category in Category::ALL {
        let _ = writeln!(out, "{category}:");
        for option in category.options() {
            let label = match locale {
                Locale::En => option.label_en,
                Locale::Ko => option.label_ko,
            };
            let marker = if selections.get(category) == option.id {
                "*"
            } else {
                " "
            };
            let _ = writeln!(out, " {marker} {}={}  ({label})", category.key(), option.id);
        }
    }
    out.trim_end().to_string()
}

/// Writes a data URL image to `path`, adding an extension from the MIME
/// type when the path has none.
pub fn save_image(path: &Path, image_url: &str) -> Result<PathBuf> {
    let image = decode_data_url(image_url)?;
    let target = if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(image.file_extension())
    };
    if let Some(parent) = target.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&target, &image.bytes)
        .with_context(|| format!("failed to write {}", target.display()))?;
    Ok(target)
}
