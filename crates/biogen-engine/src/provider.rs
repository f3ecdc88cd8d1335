use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use biogen_contracts::image_ref::InlineImage;
use serde_json::Value;

use crate::dryrun::DryrunProvider;
use crate::gemini::{GeminiProvider, GeminiSettings};

/// What a structured text call is for. Real providers only log it; the
/// dry-run provider uses it to pick a payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPurpose {
    CreatureData,
    BattleAnalysis,
}

impl TextPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatureData => "creature data",
            Self::BattleAnalysis => "battle analysis",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextRequest {
    pub model: String,
    pub purpose: TextPurpose,
    pub system_instruction: Option<String>,
    pub prompt: String,
    pub response_schema: Value,
    pub temperature: f64,
}

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
}

/// Schema-constrained text generation.
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &str;
    /// Raw JSON text of the response, `None` when the service sent no text.
    fn generate_text(&self, request: &TextRequest) -> Result<Option<String>>;
}

pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;
    /// `None` when the service answered without an image payload.
    fn generate_image(&self, request: &ImageRequest) -> Result<Option<InlineImage>>;
}

#[derive(Default)]
pub struct ProviderRegistry {
    text: BTreeMap<String, Arc<dyn TextProvider>>,
    image: BTreeMap<String, Arc<dyn ImageProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_text(&mut self, provider: Arc<dyn TextProvider>) {
        self.text.insert(provider.name().to_string(), provider);
    }

    pub fn register_image(&mut self, provider: Arc<dyn ImageProvider>) {
        self.image.insert(provider.name().to_string(), provider);
    }

    pub fn text(&self, name: &str) -> Option<Arc<dyn TextProvider>> {
        self.text.get(name).cloned()
    }

    pub fn image(&self, name: &str) -> Option<Arc<dyn ImageProvider>> {
        self.image.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names = self
            .text
            .keys()
            .chain(self.image.keys())
            .cloned()
            .collect::<Vec<String>>();
        names.sort();
        names.dedup();
        names
    }
}

/// Gemini plus the offline dry-run provider, with Gemini settings taken from
/// the process environment.
pub fn default_provider_registry() -> ProviderRegistry {
    provider_registry(GeminiSettings::from_env())
}

pub fn provider_registry(gemini: GeminiSettings) -> ProviderRegistry {
    let mut providers = ProviderRegistry::new();
    let gemini = Arc::new(GeminiProvider::new(gemini));
    providers.register_text(gemini.clone());
    providers.register_image(gemini);
    let dryrun = Arc::new(DryrunProvider);
    providers.register_text(dryrun.clone());
    providers.register_image(dryrun);
    providers
}
