use std::io::Cursor;

use anyhow::{Context, Result};
use biogen_contracts::image_ref::InlineImage;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::provider::{ImageProvider, ImageRequest, TextProvider, TextPurpose, TextRequest};

const DRYRUN_IMAGE_SIZE: u32 = 64;

const NAME_HEADS: [&str; 8] = [
    "Glass", "Ember", "Tidal", "Hollow", "Lantern", "Spore", "Basalt", "Veil",
];
const NAME_TAILS: [&str; 8] = [
    "Strider", "Maw", "Weaver", "Drifter", "Stalker", "Crawler", "Wyrm", "Moth",
];
const CLASSES: [&str; 4] = ["Arthropod", "Cephalopod", "Synapsid", "Myco-colonial"];
const DIETS: [&str; 4] = ["Carnivore", "Herbivore", "Chemotroph", "Detritivore"];

/// Offline provider with deterministic output derived from a SHA-256 of the
/// prompt. Text payloads are schema-valid for their purpose.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryrunProvider;

impl TextProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate_text(&self, request: &TextRequest) -> Result<Option<String>> {
        let payload = match request.purpose {
            TextPurpose::CreatureData => creature_payload(&request.prompt),
            TextPurpose::BattleAnalysis => battle_payload(&request.prompt),
        };
        Ok(Some(serde_json::to_string(&payload)?))
    }
}

impl ImageProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate_image(&self, request: &ImageRequest) -> Result<Option<InlineImage>> {
        let (r, g, b) = color_from_prompt(&request.prompt);
        let mut canvas = RgbImage::new(DRYRUN_IMAGE_SIZE, DRYRUN_IMAGE_SIZE);
        for pixel in canvas.pixels_mut() {
            *pixel = Rgb([r, g, b]);
        }
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .context("dry-run image encode failed")?;
        Ok(Some(InlineImage::new(Some("image/png"), bytes)))
    }
}

fn prompt_digest(prompt: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(prompt.trim().as_bytes());
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

fn color_from_prompt(prompt: &str) -> (u8, u8, u8) {
    let digest = prompt_digest(prompt);
    (digest[0], digest[1], digest[2])
}

fn stat(byte: u8) -> i64 {
    i64::from(byte) % 101
}

fn creature_payload(prompt: &str) -> serde_json::Value {
    let digest = prompt_digest(prompt);
    let head = NAME_HEADS[usize::from(digest[4]) % NAME_HEADS.len()];
    let tail = NAME_TAILS[usize::from(digest[5]) % NAME_TAILS.len()];
    let common_name = format!("{head} {tail}");
    let scientific_name = format!("{head}us {}ensis", tail.to_ascii_lowercase());
    let seed = prompt.trim();
    json!({
        "codex": {
            "scientific_name": scientific_name,
            "common_name": common_name,
            "biological_description": format!("Dry-run organism shaped by the idea: {seed}"),
            "ecological_role": "Placeholder niche generated offline.",
        },
        "engine_data": {
            "entity_id": format!("dryrun-{}", hex::encode(&digest[..4])),
            "taxonomy": {
                "class": CLASSES[usize::from(digest[6]) % CLASSES.len()],
                "diet": DIETS[usize::from(digest[7]) % DIETS.len()],
            },
            "stats": {
                "hp": stat(digest[8]),
                "speed": stat(digest[9]),
                "intelligence": stat(digest[10]),
                "stealth": stat(digest[11]),
            },
            "traits": [{
                "name": format!("{head} Plating"),
                "effect": "Absorbs the first strike of any fight.",
                "biological_basis": "Layered chitin-analog scutes.",
            }],
            "weaknesses": [format!("{tail} molting cycle leaves it exposed")],
            "visual_generation_prompt": format!(
                "a {} {}, alien fauna, detailed anatomy",
                head.to_ascii_lowercase(),
                tail.to_ascii_lowercase()
            ),
            "behavior_tree": {
                "idle": "Grazes along thermal gradients.",
                "combat": "Charges, then retreats to cover.",
                "mating": "Exchanges patterned light pulses.",
            },
        },
    })
}

fn contestant(prompt: &str, label: &str) -> Option<String> {
    prompt
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(label))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn battle_payload(prompt: &str) -> serde_json::Value {
    let digest = prompt_digest(prompt);
    let a = contestant(prompt, "CREATURE A:").unwrap_or_else(|| "Creature A".to_string());
    let b = contestant(prompt, "CREATURE B:").unwrap_or_else(|| "Creature B".to_string());
    let (winner, loser) = if digest[0] % 2 == 0 { (a, b) } else { (b, a) };
    json!({
        "summary": format!("{winner} outlasts {loser} in a dry-run skirmish."),
        "log": format!(
            "**{winner}** opens with a probing strike.\n\n**{loser}** answers but tires first.\n\n**{winner}** presses the advantage and wins."
        ),
        "winner": winner,
    })
}
