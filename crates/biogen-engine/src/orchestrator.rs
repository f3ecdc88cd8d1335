use std::fmt;

use biogen_contracts::archive::{ArchiveEntry, ArchiveStore};
use biogen_contracts::events::EventWriter;
use biogen_contracts::guided::GuidedSelections;
use biogen_contracts::{CreatureRecord, Locale};
use serde_json::Value;

use crate::client::GenerationClient;
use crate::error::GenerationError;
use crate::event_payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationStatus {
    #[default]
    Idle,
    GeneratingData,
    GeneratingImage,
    Complete,
    Error,
}

impl GenerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::GeneratingData => "generating_data",
            Self::GeneratingImage => "generating_image",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// Edge table of the generation machine. A new request may restart from
    /// any state; everything else moves forward only.
    pub fn can_transition_to(self, next: Self) -> bool {
        use GenerationStatus::*;
        match (self, next) {
            (_, GeneratingData) => true,
            (GeneratingData, GeneratingImage) => true,
            (GeneratingData, Error) | (GeneratingImage, Error) => true,
            (GeneratingImage, Complete) => true,
            _ => false,
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid generation transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: GenerationStatus,
    pub to: GenerationStatus,
}

/// Sequence number of one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn sequence(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The ticket was superseded; the result was dropped.
    Stale,
}

/// What the user sees: status plus whatever the current request produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationState {
    pub status: GenerationStatus,
    pub prompt: Option<String>,
    pub record: Option<CreatureRecord>,
    pub image_url: Option<String>,
    pub error: Option<String>,
    /// Archive id of the persisted pair, once saved.
    pub archived_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptInput {
    Direct(String),
    Guided(GuidedSelections),
}

impl PromptInput {
    /// Prompt actually sent, or `None` for blank direct text. Guided input
    /// always resolves, falling back to the random-creature prompt.
    pub fn resolve(&self) -> Option<String> {
        match self {
            Self::Direct(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Guided(selections) => Some(selections.synthesize_prompt()),
        }
    }
}

/// Drives one creation at a time through the generation machine and
/// persists complete results.
pub struct Orchestrator {
    state: GenerationState,
    sequence: u64,
    current: Option<RequestTicket>,
    archive: ArchiveStore,
    events: EventWriter,
}

impl Orchestrator {
    pub fn new(archive: ArchiveStore, events: EventWriter) -> Self {
        Self {
            state: GenerationState::default(),
            sequence: 0,
            current: None,
            archive,
            events,
        }
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    pub fn status(&self) -> GenerationStatus {
        self.state.status
    }

    pub fn archive(&self) -> &ArchiveStore {
        &self.archive
    }

    fn transition(&mut self, next: GenerationStatus) -> Result<(), InvalidTransition> {
        let from = self.state.status;
        if !from.can_transition_to(next) {
            return Err(InvalidTransition { from, to: next });
        }
        self.state.status = next;
        Ok(())
    }

    fn is_current(&self, ticket: RequestTicket) -> bool {
        self.current == Some(ticket)
    }

    fn discard_stale(&self, ticket: RequestTicket, stage: &str) -> ApplyOutcome {
        self.events.record(
            "stale_result_discarded",
            event_payload([
                ("ticket", Value::from(ticket.sequence())),
                ("stage", Value::String(stage.to_string())),
            ]),
        );
        ApplyOutcome::Stale
    }

    /// Starts a request. Blank direct text is rejected without a transition
    /// and yields `None`.
    pub fn begin(&mut self, input: &PromptInput) -> Result<Option<RequestTicket>, InvalidTransition> {
        let Some(prompt) = input.resolve() else {
            return Ok(None);
        };
        self.transition(GenerationStatus::GeneratingData)?;
        self.sequence += 1;
        let ticket = RequestTicket(self.sequence);
        self.current = Some(ticket);
        self.state = GenerationState {
            status: GenerationStatus::GeneratingData,
            prompt: Some(prompt.clone()),
            ..GenerationState::default()
        };
        self.events.record(
            "generation_started",
            event_payload([
                ("ticket", Value::from(ticket.sequence())),
                ("prompt", Value::String(prompt)),
                (
                    "mode",
                    Value::String(
                        match input {
                            PromptInput::Direct(_) => "direct",
                            PromptInput::Guided(_) => "guided",
                        }
                        .to_string(),
                    ),
                ),
            ]),
        );
        Ok(Some(ticket))
    }

    pub fn apply_data(
        &mut self,
        ticket: RequestTicket,
        result: Result<CreatureRecord, GenerationError>,
    ) -> Result<ApplyOutcome, InvalidTransition> {
        if !self.is_current(ticket) {
            return Ok(self.discard_stale(ticket, "data"));
        }
        match result {
            Ok(record) => {
                self.transition(GenerationStatus::GeneratingImage)?;
                self.events.record(
                    "creature_data_ready",
                    event_payload([
                        ("ticket", Value::from(ticket.sequence())),
                        ("entity_id", Value::String(record.engine_data.entity_id.clone())),
                        ("common_name", Value::String(record.common_name().to_string())),
                    ]),
                );
                self.state.record = Some(record);
            }
            Err(err) => self.fail(ticket, err)?,
        }
        Ok(ApplyOutcome::Applied)
    }

    pub fn apply_image(
        &mut self,
        ticket: RequestTicket,
        result: Result<Option<String>, GenerationError>,
    ) -> Result<ApplyOutcome, InvalidTransition> {
        if !self.is_current(ticket) {
            return Ok(self.discard_stale(ticket, "image"));
        }
        // A failed image call degrades to "no visual"; the record stands.
        let image_url = match result {
            Ok(image_url) => image_url,
            Err(err) => {
                let message = err.to_string();
                eprintln!("biogen: creature image unavailable: {message}");
                self.events.record(
                    "image_unavailable",
                    event_payload([
                        ("ticket", Value::from(ticket.sequence())),
                        ("error", Value::String(message)),
                    ]),
                );
                None
            }
        };
        self.transition(GenerationStatus::Complete)?;
        self.state.image_url = image_url;
        self.persist_complete();
        self.events.record(
            "generation_complete",
            event_payload([
                ("ticket", Value::from(ticket.sequence())),
                ("has_image", Value::Bool(self.state.image_url.is_some())),
                (
                    "archived_id",
                    self.state
                        .archived_id
                        .clone()
                        .map(Value::String)
                        .unwrap_or(Value::Null),
                ),
            ]),
        );
        Ok(ApplyOutcome::Applied)
    }

    fn fail(&mut self, ticket: RequestTicket, err: GenerationError) -> Result<(), InvalidTransition> {
        self.transition(GenerationStatus::Error)?;
        let message = err.to_string();
        self.events.record(
            "generation_failed",
            event_payload([
                ("ticket", Value::from(ticket.sequence())),
                ("error", Value::String(message.clone())),
            ]),
        );
        self.state.error = Some(message);
        Ok(())
    }

    /// Best-effort save of a complete pair; failures are logged only.
    fn persist_complete(&mut self) {
        let (Some(record), Some(image_url)) = (&self.state.record, &self.state.image_url) else {
            return;
        };
        match self.archive.save(record, image_url) {
            Ok(entry) => {
                self.events.record(
                    "archive_saved",
                    event_payload([("id", Value::String(entry.id.clone()))]),
                );
                self.state.archived_id = Some(entry.id);
            }
            Err(err) => {
                let message = format!("{err:#}");
                eprintln!("biogen: archive save failed: {message}");
                self.events.record(
                    "archive_write_failed",
                    event_payload([
                        ("entity_id", Value::String(record.engine_data.entity_id.clone())),
                        ("error", Value::String(message)),
                    ]),
                );
            }
        }
    }

    /// Shows a stored entry as a finished result. Any in-flight request is
    /// superseded so its late results are discarded.
    pub fn load_archived(&mut self, entry: &ArchiveEntry) {
        self.sequence += 1;
        self.current = None;
        self.state = GenerationState {
            status: GenerationStatus::Complete,
            prompt: None,
            record: Some(entry.record.clone()),
            image_url: Some(entry.image_url.clone()),
            error: None,
            archived_id: Some(entry.id.clone()),
        };
        self.events.record(
            "archive_loaded",
            event_payload([("id", Value::String(entry.id.clone()))]),
        );
    }

    /// Runs one full request: data, then image. `observe` sees the state
    /// after every transition so narrative can render before the image.
    pub fn run(
        &mut self,
        client: &GenerationClient,
        input: &PromptInput,
        locale: Locale,
        mut observe: impl FnMut(&GenerationState),
    ) -> Result<GenerationStatus, InvalidTransition> {
        let Some(ticket) = self.begin(input)? else {
            return Ok(self.status());
        };
        observe(&self.state);

        let prompt = self.state.prompt.clone().unwrap_or_default();
        let data = client.generate_creature_data(&prompt, locale);
        self.apply_data(ticket, data)?;
        observe(&self.state);
        if self.status() != GenerationStatus::GeneratingImage {
            return Ok(self.status());
        }

        let visual_prompt = self
            .state
            .record
            .as_ref()
            .map(|record| record.engine_data.visual_generation_prompt.clone())
            .unwrap_or_default();
        let image = client.generate_creature_image(&visual_prompt);
        self.apply_image(ticket, image)?;
        observe(&self.state);
        Ok(self.status())
    }
}
