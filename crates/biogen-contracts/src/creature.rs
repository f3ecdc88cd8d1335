use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Narrative half of a creature record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codex {
    pub scientific_name: String,
    pub common_name: String,
    pub biological_description: String,
    pub ecological_role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub class: String,
    pub diet: String,
}

/// Nominal range is 0-100; values outside it are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub hp: i64,
    pub speed: i64,
    pub intelligence: i64,
    pub stealth: i64,
}

impl Stats {
    pub fn labeled(&self) -> [(&'static str, i64); 4] {
        [
            ("HP", self.hp),
            ("Speed", self.speed),
            ("Intelligence", self.intelligence),
            ("Stealth", self.stealth),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trait {
    pub name: String,
    pub effect: String,
    pub biological_basis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorTree {
    pub idle: String,
    pub combat: String,
    pub mating: String,
}

/// Structured gameplay half of a creature record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineData {
    pub entity_id: String,
    pub taxonomy: Taxonomy,
    pub stats: Stats,
    pub traits: Vec<Trait>,
    pub weaknesses: Vec<String>,
    pub visual_generation_prompt: String,
    pub behavior_tree: BehaviorTree,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureRecord {
    pub codex: Codex,
    pub engine_data: EngineData,
}

impl CreatureRecord {
    /// Strict parse of a service payload. Every schema field must be present
    /// with the right type; unknown extra keys are ignored.
    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("empty payload".to_string());
        }
        serde_json::from_str::<Self>(trimmed).map_err(|err| err.to_string())
    }

    /// Archive key for this record, or `None` when the service left it blank.
    pub fn entity_id(&self) -> Option<&str> {
        let id = self.engine_data.entity_id.trim();
        (!id.is_empty()).then_some(id)
    }

    pub fn common_name(&self) -> &str {
        &self.codex.common_name
    }

    /// Pretty JSON of the engine half, for inspection.
    pub fn engine_data_dump(&self) -> String {
        serde_json::to_string_pretty(&self.engine_data).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Response schema for structured creature generation, in the service's
/// OpenAPI-subset dialect. Every field is required.
pub fn creature_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "codex": {
                "type": "OBJECT",
                "properties": {
                    "scientific_name": { "type": "STRING" },
                    "common_name": { "type": "STRING" },
                    "biological_description": { "type": "STRING" },
                    "ecological_role": { "type": "STRING" },
                },
                "required": ["scientific_name", "common_name", "biological_description", "ecological_role"],
            },
            "engine_data": {
                "type": "OBJECT",
                "properties": {
                    "entity_id": { "type": "STRING" },
                    "taxonomy": {
                        "type": "OBJECT",
                        "properties": {
                            "class": { "type": "STRING" },
                            "diet": { "type": "STRING" },
                        },
                        "required": ["class", "diet"],
                    },
                    "stats": {
                        "type": "OBJECT",
                        "properties": {
                            "hp": { "type": "INTEGER" },
                            "speed": { "type": "INTEGER" },
                            "intelligence": { "type": "INTEGER" },
                            "stealth": { "type": "INTEGER" },
                        },
                        "required": ["hp", "speed", "intelligence", "stealth"],
                    },
                    "traits": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "name": { "type": "STRING" },
                                "effect": { "type": "STRING" },
                                "biological_basis": { "type": "STRING" },
                            },
                            "required": ["name", "effect", "biological_basis"],
                        },
                    },
                    "weaknesses": {
                        "type": "ARRAY",
                        "items": { "type": "STRING" },
                    },
                    "visual_generation_prompt": { "type": "STRING" },
                    "behavior_tree": {
                        "type": "OBJECT",
                        "properties": {
                            "idle": { "type": "STRING" },
                            "combat": { "type": "STRING" },
                            "mating": { "type": "STRING" },
                        },
                        "required": ["idle", "combat", "mating"],
                    },
                },
                "required": [
                    "entity_id",
                    "taxonomy",
                    "stats",
                    "traits",
                    "weaknesses",
                    "visual_generation_prompt",
                    "behavior_tree",
                ],
            },
        },
        "required": ["codex", "engine_data"],
    })
}

#[cfg(test)]
pub(crate) fn sample_record(entity_id: &str, common_name: &str) -> CreatureRecord {
    CreatureRecord {
        codex: Codex {
            scientific_name: "Abyssalis vorax".to_string(),
            common_name: common_name.to_string(),
            biological_description: "A pressure-adapted ambush hunter.".to_string(),
            ecological_role: "Apex predator of the hadal zone.".to_string(),
        },
        engine_data: EngineData {
            entity_id: entity_id.to_string(),
            taxonomy: Taxonomy {
                class: "Cephalopod".to_string(),
                diet: "Carnivore".to_string(),
            },
            stats: Stats {
                hp: 70,
                speed: 40,
                intelligence: 85,
                stealth: 90,
            },
            traits: vec![Trait {
                name: "Lure Array".to_string(),
                effect: "Draws prey with pulsing light.".to_string(),
                biological_basis: "Symbiotic luminous bacteria.".to_string(),
            }],
            weaknesses: vec!["Bright surface light".to_string()],
            visual_generation_prompt: "a translucent deep-sea cephalopod with glowing lures"
                .to_string(),
            behavior_tree: BehaviorTree {
                idle: "Drifts motionless near vents.".to_string(),
                combat: "Blinds prey, then strikes.".to_string(),
                mating: "Synchronized light displays.".to_string(),
            },
        },
    }
}
