use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use biogen_contracts::creature::creature_response_schema;
use biogen_contracts::events::EventWriter;
use biogen_contracts::models::ModelSpec;
use biogen_contracts::{CreatureRecord, Locale};
use serde_json::Value;

use crate::error::GenerationError;
use crate::event_payload;
use crate::prompts::{creature_system_instruction, styled_image_prompt};
use crate::provider::{
    ImageProvider, ImageRequest, ProviderRegistry, TextProvider, TextPurpose, TextRequest,
};

pub(crate) const CREATURE_TEMPERATURE: f64 = 0.7;

/// The remote generation service as the rest of the app sees it: one text
/// model and one image model, each behind its provider.
#[derive(Clone)]
pub struct GenerationClient {
    pub(crate) text: Arc<dyn TextProvider>,
    pub(crate) text_model: String,
    pub(crate) image: Arc<dyn ImageProvider>,
    pub(crate) image_model: String,
    pub(crate) events: EventWriter,
}

impl GenerationClient {
    pub fn new(
        text: Arc<dyn TextProvider>,
        text_model: impl Into<String>,
        image: Arc<dyn ImageProvider>,
        image_model: impl Into<String>,
    ) -> Self {
        Self {
            text,
            text_model: text_model.into(),
            image,
            image_model: image_model.into(),
            events: EventWriter::discard(),
        }
    }

    /// Wires the providers named by two selected models.
    pub fn from_models(
        providers: &ProviderRegistry,
        text_model: &ModelSpec,
        image_model: &ModelSpec,
    ) -> Result<Self> {
        let text = providers.text(&text_model.provider).ok_or_else(|| {
            anyhow!(
                "no text provider '{}' for model '{}'",
                text_model.provider,
                text_model.name
            )
        })?;
        let image = providers.image(&image_model.provider).ok_or_else(|| {
            anyhow!(
                "no image provider '{}' for model '{}'",
                image_model.provider,
                image_model.name
            )
        })?;
        Ok(Self::new(text, &text_model.name, image, &image_model.name))
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = events;
        self
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    /// One structured creature record for `prompt`, narrative text in
    /// `locale`.
    pub fn generate_creature_data(
        &self,
        prompt: &str,
        locale: Locale,
    ) -> Result<CreatureRecord, GenerationError> {
        const OPERATION: &str = "creature data";
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        let request = TextRequest {
            model: self.text_model.clone(),
            purpose: TextPurpose::CreatureData,
            system_instruction: Some(creature_system_instruction(locale)),
            prompt: prompt.to_string(),
            response_schema: creature_response_schema(),
            temperature: CREATURE_TEMPERATURE,
        };

        let started = Instant::now();
        let outcome = self.text.generate_text(&request);
        self.record_call(OPERATION, self.text.name(), &self.text_model, started, &outcome);

        let raw = outcome
            .map_err(|err| GenerationError::from_provider(&err))?
            .ok_or(GenerationError::EmptyPayload {
                operation: OPERATION,
            })?;
        CreatureRecord::from_json_str(&raw).map_err(|detail| GenerationError::InvalidPayload {
            operation: OPERATION,
            detail,
        })
    }

    /// Illustration for a record's visual prompt as a data URL. `Ok(None)`
    /// means the service answered without an image.
    pub fn generate_creature_image(
        &self,
        visual_prompt: &str,
    ) -> Result<Option<String>, GenerationError> {
        let request = ImageRequest {
            model: self.image_model.clone(),
            prompt: styled_image_prompt(visual_prompt),
        };
        let started = Instant::now();
        let outcome = self.image.generate_image(&request);
        self.record_call(
            "creature image",
            self.image.name(),
            &self.image_model,
            started,
            &outcome,
        );
        let image = outcome.map_err(|err| GenerationError::from_provider(&err))?;
        Ok(image.map(|image| image.to_data_url()))
    }

    pub(crate) fn record_call<T>(
        &self,
        operation: &str,
        provider: &str,
        model: &str,
        started: Instant,
        outcome: &Result<Option<T>>,
    ) {
        let status = match outcome {
            Ok(Some(_)) => "ok",
            Ok(None) => "empty",
            Err(_) => "failed",
        };
        let mut payload = event_payload([
            ("operation", Value::String(operation.to_string())),
            ("provider", Value::String(provider.to_string())),
            ("model", Value::String(model.to_string())),
            ("status", Value::String(status.to_string())),
            ("elapsed_ms", Value::from(started.elapsed().as_millis() as u64)),
        ]);
        if let Err(err) = outcome {
            payload.insert(
                "error".to_string(),
                Value::String(crate::error_chain_text(err, 512)),
            );
        }
        self.events.record("provider_call", payload);
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use biogen_contracts::image_ref::InlineImage;

    use crate::provider::{ImageProvider, ImageRequest, TextProvider, TextRequest};

    /// One queued answer of a scripted provider.
    #[derive(Debug, Clone)]
    pub(crate) enum Reply<T> {
        Value(T),
        Nothing,
        Fail(String),
    }

    /// In-memory provider that answers from a queue and records requests.
    #[derive(Default)]
    pub(crate) struct Scripted {
        pub(crate) texts: Mutex<VecDeque<Reply<String>>>,
        pub(crate) images: Mutex<VecDeque<Reply<InlineImage>>>,
        pub(crate) text_requests: Mutex<Vec<TextRequest>>,
        pub(crate) image_requests: Mutex<Vec<ImageRequest>>,
    }

    impl Scripted {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn push_text(&self, reply: Reply<String>) -> &Self {
            if let Ok(mut queue) = self.texts.lock() {
                queue.push_back(reply);
            }
            self
        }

        pub(crate) fn push_image(&self, reply: Reply<InlineImage>) -> &Self {
            if let Ok(mut queue) = self.images.lock() {
                queue.push_back(reply);
            }
            self
        }

        pub(crate) fn seen_text(&self) -> Vec<TextRequest> {
            self.text_requests
                .lock()
                .map(|rows| rows.clone())
                .unwrap_or_default()
        }

        pub(crate) fn seen_images(&self) -> Vec<ImageRequest> {
            self.image_requests
                .lock()
                .map(|rows| rows.clone())
                .unwrap_or_default()
        }
    }

    fn answer<T>(queue: &Mutex<VecDeque<Reply<T>>>) -> Result<Option<T>> {
        let next = queue
            .lock()
            .map_err(|_| anyhow!("scripted queue poisoned"))?
            .pop_front();
        match next {
            Some(Reply::Value(value)) => Ok(Some(value)),
            Some(Reply::Nothing) => Ok(None),
            Some(Reply::Fail(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted provider ran out of replies")),
        }
    }

    impl TextProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate_text(&self, request: &TextRequest) -> Result<Option<String>> {
            if let Ok(mut rows) = self.text_requests.lock() {
                rows.push(request.clone());
            }
            answer(&self.texts)
        }
    }

    impl ImageProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate_image(&self, request: &ImageRequest) -> Result<Option<InlineImage>> {
            if let Ok(mut rows) = self.image_requests.lock() {
                rows.push(request.clone());
            }
            answer(&self.images)
        }
    }
}
