use std::thread;
use std::time::Instant;

use biogen_contracts::battle::battle_response_schema;
use biogen_contracts::{BattleAnalysis, BattleResult, CreatureRecord, Locale};

use crate::client::GenerationClient;
use crate::prompts::{battle_image_prompt, battle_text_prompt};
use crate::provider::{ImageRequest, TextPurpose, TextRequest};

pub(crate) const BATTLE_TEMPERATURE: f64 = 0.8;

impl GenerationClient {
    /// Narrated mock battle between two stored creatures. The analysis and
    /// the versus image are requested concurrently and degrade
    /// independently, so this never fails.
    pub fn simulate_battle(
        &self,
        a: &CreatureRecord,
        b: &CreatureRecord,
        locale: Locale,
    ) -> BattleResult {
        let (analysis, image_url) = thread::scope(|scope| {
            let text = scope.spawn(|| self.battle_analysis(a, b, locale));
            let image = scope.spawn(|| self.battle_image(a, b));
            (
                text.join()
                    .unwrap_or_else(|_| BattleAnalysis::simulation_error()),
                image.join().ok().flatten(),
            )
        });
        BattleResult::new(analysis, image_url)
    }

    fn battle_analysis(
        &self,
        a: &CreatureRecord,
        b: &CreatureRecord,
        locale: Locale,
    ) -> BattleAnalysis {
        let request = TextRequest {
            model: self.text_model.clone(),
            purpose: TextPurpose::BattleAnalysis,
            system_instruction: None,
            prompt: battle_text_prompt(a, b, locale),
            response_schema: battle_response_schema(),
            temperature: BATTLE_TEMPERATURE,
        };
        let started = Instant::now();
        let outcome = self.text.generate_text(&request);
        self.record_call(
            "battle analysis",
            self.text.name(),
            &self.text_model,
            started,
            &outcome,
        );

        let raw = match outcome {
            Ok(Some(raw)) => raw,
            Ok(None) => return BattleAnalysis::analysis_failed(),
            Err(_) => return BattleAnalysis::simulation_error(),
        };
        match BattleAnalysis::from_json_str(&raw) {
            Ok(mut analysis) => {
                analysis.normalize_winner([a.common_name(), b.common_name()]);
                analysis
            }
            Err(detail) => {
                eprintln!("biogen: battle analysis payload rejected: {detail}");
                BattleAnalysis::analysis_failed()
            }
        }
    }

    fn battle_image(&self, a: &CreatureRecord, b: &CreatureRecord) -> Option<String> {
        let request = ImageRequest {
            model: self.image_model.clone(),
            prompt: battle_image_prompt(a, b),
        };
        let started = Instant::now();
        let outcome = self.image.generate_image(&request);
        self.record_call(
            "battle image",
            self.image.name(),
            &self.image_model,
            started,
            &outcome,
        );
        outcome.ok().flatten().map(|image| image.to_data_url())
    }
}
