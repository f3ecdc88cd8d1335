//! Guided-mode category tags and prompt synthesis.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prompt used when guided mode is submitted with nothing selected.
pub const RANDOM_CREATURE_PROMPT: &str = "A random, scientifically plausible alien creature.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Habitat,
    Diet,
    Structure,
    Trait,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Habitat,
        Category::Diet,
        Category::Structure,
        Category::Trait,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Habitat => "habitat",
            Self::Diet => "diet",
            Self::Structure => "structure",
            Self::Trait => "trait",
        }
    }

    /// Facet label as it appears inside the synthesized prompt.
    fn prompt_label(self) -> &'static str {
        match self {
            Self::Habitat => "Habitat",
            Self::Diet => "Diet",
            Self::Structure => "Biological Structure",
            Self::Trait => "Key Trait",
        }
    }

    pub fn options(self) -> &'static [GuidedOption] {
        match self {
            Self::Habitat => HABITAT_OPTIONS,
            Self::Diet => DIET_OPTIONS,
            Self::Structure => STRUCTURE_OPTIONS,
            Self::Trait => TRAIT_OPTIONS,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lowered = raw.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.key() == lowered)
            .ok_or_else(|| format!("unknown guided category '{lowered}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuidedOption {
    pub id: &'static str,
    pub label_en: &'static str,
    pub label_ko: &'static str,
}

const fn opt(id: &'static str, label_en: &'static str, label_ko: &'static str) -> GuidedOption {
    GuidedOption {
        id,
        label_en,
        label_ko,
    }
}

const HABITAT_OPTIONS: &[GuidedOption] = &[
    opt("Forest", "Jungle/Forest", "밀림/숲"),
    opt("Ocean", "Deep Ocean", "심해"),
    opt("Desert", "Desert", "사막"),
    opt("Tundra", "Frozen Tundra", "설원"),
    opt("Volcano", "Volcanic", "화산 지대"),
    opt("Space", "Zero-G Space", "무중력 우주"),
    opt("Urban", "Ruined City", "폐허 도시"),
];

const DIET_OPTIONS: &[GuidedOption] = &[
    opt("Carnivore", "Carnivore", "육식"),
    opt("Herbivore", "Herbivore", "초식"),
    opt("Omnivore", "Omnivore", "잡식"),
    opt("Photosynthesis", "Photosynthesis", "광합성"),
    opt("Energy", "Energy Feeder", "에너지 섭취"),
    opt("Scavenger", "Scavenger", "청소 동물"),
];

const STRUCTURE_OPTIONS: &[GuidedOption] = &[
    opt("Mammalian", "Mammalian", "포유류형"),
    opt("Reptilian", "Reptilian", "파충류형"),
    opt("Insectoid", "Insectoid", "곤충형"),
    opt("Avian", "Avian", "조류형"),
    opt("Amorphous", "Amorphous", "점액/무형"),
    opt("Silicon", "Crystalline", "수정/광물형"),
    opt("Mechanical", "Bio-Mechanical", "기계/생체공학"),
];

const TRAIT_OPTIONS: &[GuidedOption] = &[
    opt("Bioluminescent", "Bioluminescence", "생체 발광"),
    opt("Armored", "Heavy Armor", "중장갑"),
    opt("Speed", "Supersonic", "초고속"),
    opt("Stealth", "Camouflage", "위장/은신"),
    opt("Toxic", "Venomous", "맹독"),
    opt("Psionic", "Psionic", "정신 감응"),
];

/// One selected tag (or none) per category. Empty strings mean unselected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidedSelections {
    #[serde(default)]
    pub habitat: String,
    #[serde(default)]
    pub diet: String,
    #[serde(default)]
    pub structure: String,
    #[serde(default, rename = "trait")]
    pub trait_tag: String,
}

impl GuidedSelections {
    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::Habitat => &self.habitat,
            Category::Diet => &self.diet,
            Category::Structure => &self.structure,
            Category::Trait => &self.trait_tag,
        }
    }

    fn slot_mut(&mut self, category: Category) -> &mut String {
        match category {
            Category::Habitat => &mut self.habitat,
            Category::Diet => &mut self.diet,
            Category::Structure => &mut self.structure,
            Category::Trait => &mut self.trait_tag,
        }
    }

    pub fn set(&mut self, category: Category, value: &str) {
        *self.slot_mut(category) = value.trim().to_string();
    }

    /// Selecting the current tag again clears it.
    pub fn toggle(&mut self, category: Category, value: &str) {
        let value = value.trim();
        let slot = self.slot_mut(category);
        if slot == value {
            slot.clear();
        } else {
            *slot = value.to_string();
        }
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL
            .into_iter()
            .all(|category| self.get(category).trim().is_empty())
    }

    /// Toggles each `key=value` pair, e.g. `habitat=Ocean diet=Carnivore`.
    /// Nothing changes unless every pair parses.
    pub fn toggle_pairs<'a>(
        &mut self,
        pairs: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), String> {
        let mut parsed = Vec::new();
        for pair in pairs {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(format!("expected category=value, got '{pair}'"));
            };
            parsed.push((key.parse::<Category>()?, value));
        }
        for (category, value) in parsed {
            self.toggle(category, value);
        }
        Ok(())
    }

    pub fn synthesize_prompt(&self) -> String {
        let parts = Category::ALL
            .into_iter()
            .filter_map(|category| {
                let value = self.get(category).trim();
                (!value.is_empty()).then(|| format!("{}: {value}", category.prompt_label()))
            })
            .collect::<Vec<String>>();
        if parts.is_empty() {
            return RANDOM_CREATURE_PROMPT.to_string();
        }
        format!(
            "Design a scientifically plausible creature with these characteristics: {}. Ensure it fits its environment perfectly.",
            parts.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, GuidedSelections, RANDOM_CREATURE_PROMPT};

    #[test]
    fn prompt_mentions_only_selected_facets() {
        let selections = GuidedSelections {
            habitat: "Ocean".to_string(),
            diet: "Carnivore".to_string(),
            structure: String::new(),
            trait_tag: String::new(),
        };
        let prompt = selections.synthesize_prompt();
        assert_eq!(
            prompt,
            "Design a scientifically plausible creature with these characteristics: Habitat: Ocean, Diet: Carnivore. Ensure it fits its environment perfectly."
        );
        assert!(!prompt.contains("Biological Structure"));
        assert!(!prompt.contains("Key Trait"));
    }

    #[test]
    fn no_selection_uses_random_creature_prompt() {
        assert_eq!(
            GuidedSelections::default().synthesize_prompt(),
            RANDOM_CREATURE_PROMPT
        );
        let blank = GuidedSelections {
            habitat: "  ".to_string(),
            ..GuidedSelections::default()
        };
        assert!(blank.is_empty());
        assert_eq!(blank.synthesize_prompt(), RANDOM_CREATURE_PROMPT);
    }

    #[test]
    fn toggle_clears_repeated_selection() {
        let mut selections = GuidedSelections::default();
        selections.toggle(Category::Trait, "Toxic");
        assert_eq!(selections.get(Category::Trait), "Toxic");
        selections.toggle(Category::Trait, "Psionic");
        assert_eq!(selections.get(Category::Trait), "Psionic");
        selections.toggle(Category::Trait, "Psionic");
        assert!(selections.is_empty());
    }

    #[test]
    fn toggles_key_value_pairs() -> Result<(), String> {
        let mut selections = GuidedSelections::default();
        selections.toggle_pairs(["habitat=Volcano", "TRAIT=Armored"])?;
        assert_eq!(selections.habitat, "Volcano");
        assert_eq!(selections.trait_tag, "Armored");
        assert!(selections.synthesize_prompt().contains("Key Trait: Armored"));

        selections.toggle_pairs(["trait=Armored", "diet=Carnivore"])?;
        assert_eq!(selections.trait_tag, "");
        assert_eq!(selections.diet, "Carnivore");
        assert_eq!(selections.habitat, "Volcano");
        Ok(())
    }

    #[test]
    fn bad_pair_leaves_selections_untouched() {
        let mut selections = GuidedSelections::default();
        selections.set(Category::Habitat, "Ocean");
        let err = selections
            .toggle_pairs(["diet=Carnivore", "color=red"])
            .unwrap_err();
        assert_eq!(err, "unknown guided category 'color'");
        assert!(selections.toggle_pairs(["Ocean"]).is_err());
        assert_eq!(selections.habitat, "Ocean");
        assert_eq!(selections.diet, "");
    }

    #[test]
    fn every_category_has_options() {
        for category in Category::ALL {
            assert!(!category.options().is_empty(), "{category} has no options");
        }
        assert!(Category::Habitat
            .options()
            .iter()
            .any(|option| option.id == "Ocean" && option.label_en == "Deep Ocean"));
    }
}
