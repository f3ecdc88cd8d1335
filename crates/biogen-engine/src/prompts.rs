//! Fixed prompt templates sent to the generation service.

use biogen_contracts::{CreatureRecord, Locale};

/// Persona and output rules for structured creature generation.
pub fn creature_system_instruction(locale: Locale) -> String {
    let language = locale.instruction_name();
    format!(
        "Role Definition:
You are the 'Bio-Genesis Engine', an expert in astrobiology, evolutionary psychology, biomechanics and game design.
Design a fictional creature from the user's idea, balancing scientific plausibility against gameplay mechanics.

Core Directives:
1. Logical Consistency: no magic. Every feature needs a biological or chemical basis.
2. Evolutionary Fit: optimize the organism for its environment.
3. Game Balance: every strong advantage carries a fatal weakness.
4. Language Requirement: the user has selected **{language}**.

Process:
1. Input Analysis
2. Environmental Check
3. Biological Engineering
4. Visual Conception
5. JSON Construction

Output Rules:
- Write the 'codex' fields, 'traits', 'behavior_tree' descriptions and 'weaknesses' in {language}.
- 'taxonomy' values may use standard English terms.
- CRITICAL EXCEPTION: 'visual_generation_prompt' MUST ALWAYS be in ENGLISH, whatever the selected language.
- 'scientific_name' always uses a Latin-style binomial.

Output Format:
Return one JSON object with two sections: 'codex' (natural language) and 'engine_data' (game engine data)."
    )
}

/// Wraps a creature's visual prompt in the hologram-friendly render style.
pub fn styled_image_prompt(visual_prompt: &str) -> String {
    format!(
        "3D model character design, t-pose or dynamic pose, full body view, {}. \
         High contrast, bioluminescent details, solid black background (hex #000000), \
         volumetric lighting, unreal engine 5 render style.",
        visual_prompt.trim().trim_end_matches('.')
    )
}

fn battle_digest(label: char, record: &CreatureRecord) -> String {
    let stats = record.engine_data.stats;
    let traits = record
        .engine_data
        .traits
        .iter()
        .map(|item| item.name.as_str())
        .collect::<Vec<&str>>()
        .join(", ");
    format!(
        "CREATURE {label}: {}\n\
         - Stats: HP {}, Speed {}, Intel {}, Stealth {}\n\
         - Traits: {traits}\n\
         - Weaknesses: {}",
        record.common_name(),
        stats.hp,
        stats.speed,
        stats.intelligence,
        stats.stealth,
        record.engine_data.weaknesses.join(", "),
    )
}

pub fn battle_text_prompt(a: &CreatureRecord, b: &CreatureRecord, locale: Locale) -> String {
    format!(
        "Simulate a deadly battle between these two creatures.\n\n\
         {}\n\n\
         {}\n\n\
         Analyze their biological advantages and disadvantages. Determine a winner by logic \
         (fire beats ice, speed beats brute force).\n\n\
         OUTPUT FORMAT:\n\
         Return a JSON object with these fields:\n\
         - summary: one punchy sentence summarizing the outcome.\n\
         - log: a detailed, dramatic battle report of 3-4 paragraphs. Markdown bold and lists are allowed, headers are not.\n\
         - winner: the name of the winning creature.\n\n\
         Language: {}",
        battle_digest('A', a),
        battle_digest('B', b),
        locale.display_name(),
    )
}

pub fn battle_image_prompt(a: &CreatureRecord, b: &CreatureRecord) -> String {
    format!(
        "Cinematic action shot of a fight between two sci-fi creatures.\n\
         Creature 1: {}.\n\
         Creature 2: {}.\n\
         Action: dynamic combat pose, impact effects, dust particles, motion blur.\n\
         Style: Unreal Engine 5 render, hyper-realistic, volumetric lighting, 8k resolution, cinematic composition.",
        a.engine_data.visual_generation_prompt.trim().trim_end_matches('.'),
        b.engine_data.visual_generation_prompt.trim().trim_end_matches('.'),
    )
}

#[cfg(test)]
pub(crate) mod fixtures {
    use biogen_contracts::{
        BehaviorTree, Codex, CreatureRecord, EngineData, Stats, Taxonomy, Trait,
    };

    pub(crate) fn creature(entity_id: &str, common_name: &str) -> CreatureRecord {
        CreatureRecord {
            codex: Codex {
                scientific_name: "Vitrilepis nocturna".to_string(),
                common_name: common_name.to_string(),
                biological_description: "A moth with silica-lattice wings.".to_string(),
                ecological_role: "Nocturnal pollinator of desert cacti.".to_string(),
            },
            engine_data: EngineData {
                entity_id: entity_id.to_string(),
                taxonomy: Taxonomy {
                    class: "Insecta".to_string(),
                    diet: "Nectarivore".to_string(),
                },
                stats: Stats {
                    hp: 35,
                    speed: 80,
                    intelligence: 40,
                    stealth: 75,
                },
                traits: vec![
                    Trait {
                        name: "Glass Wings".to_string(),
                        effect: "Near-invisible in flight.".to_string(),
                        biological_basis: "Biogenic silica scales.".to_string(),
                    },
                    Trait {
                        name: "Cold Blood".to_string(),
                        effect: "Survives freezing nights.".to_string(),
                        biological_basis: "Glycerol antifreeze.".to_string(),
                    },
                ],
                weaknesses: vec!["Brittle wings".to_string(), "Daylight".to_string()],
                visual_generation_prompt: format!("a {common_name} with translucent glass wings."),
                behavior_tree: BehaviorTree {
                    idle: "Rests in rock crevices.".to_string(),
                    combat: "Flees, then dazzles.".to_string(),
                    mating: "Wing-light duets.".to_string(),
                },
            },
        }
    }
}
