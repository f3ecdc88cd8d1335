/// Failure of a remote generation call that the orchestrator surfaces to the
/// user. The display text is shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation prompt is empty")]
    EmptyPrompt,
    #[error("{operation}: service returned no payload")]
    EmptyPayload { operation: &'static str },
    #[error("{operation}: payload does not match the expected schema ({detail})")]
    InvalidPayload {
        operation: &'static str,
        detail: String,
    },
    #[error("{0}")]
    Service(String),
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Configuration(String),
}

impl GenerationError {
    /// Classifies a provider error chain.
    pub fn from_provider(err: &anyhow::Error) -> Self {
        if let Some(known) = err.downcast_ref::<GenerationError>() {
            return known.clone();
        }
        let message = crate::error_chain_text(err, 512);
        let is_transport = err
            .chain()
            .any(|cause| cause.downcast_ref::<reqwest::Error>().is_some());
        if is_transport {
            Self::Transport(message)
        } else {
            Self::Service(message)
        }
    }
}
