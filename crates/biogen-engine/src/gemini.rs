use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use biogen_contracts::image_ref::InlineImage;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

use crate::error::GenerationError;
use crate::provider::{ImageProvider, ImageRequest, TextProvider, TextRequest};
use crate::{non_empty_env, truncate_text, value_as_f64};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Connection settings for the Gemini REST transport.
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiSettings {
    pub api_base: String,
    pub api_key: Option<String>,
    pub request_timeout_s: f64,
    pub transport_retries: usize,
    pub retry_backoff_s: f64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            api_key: None,
            request_timeout_s: 90.0,
            transport_retries: 2,
            retry_backoff_s: 1.2,
        }
    }
}

impl GeminiSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    /// Reads settings through `lookup`, which returns trimmed non-empty
    /// values or `None`. Numeric settings are clamped to sane bounds.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let numeric = |key: &str| lookup(key).map(Value::String);
        Self {
            api_base: lookup("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            api_key: lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")),
            request_timeout_s: value_as_f64(
                numeric("GEMINI_REQUEST_TIMEOUT").as_ref(),
                90.0,
                15.0,
                300.0,
            ),
            transport_retries: value_as_f64(
                numeric("GEMINI_TRANSPORT_RETRIES").as_ref(),
                2.0,
                0.0,
                4.0,
            )
            .round() as usize,
            retry_backoff_s: value_as_f64(
                numeric("GEMINI_RETRY_BACKOFF").as_ref(),
                1.2,
                0.1,
                10.0,
            ),
        }
    }
}

pub struct GeminiProvider {
    settings: GeminiSettings,
    http: HttpClient,
}

impl GeminiProvider {
    pub fn new(settings: GeminiSettings) -> Self {
        Self {
            settings,
            http: HttpClient::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(GeminiSettings::from_env())
    }

    fn api_key(&self) -> Result<&str> {
        match self.settings.api_key.as_deref() {
            Some(key) => Ok(key),
            None => Err(GenerationError::Configuration(
                "GEMINI_API_KEY or GOOGLE_API_KEY not set".to_string(),
            )
            .into()),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.settings.api_base, model_path)
    }

    fn post_with_transport_retries(&self, endpoint: &str, payload: &Value) -> Result<Value> {
        let api_key = self.api_key()?;
        let max_retries = self.settings.transport_retries;
        for attempt in 0..=max_retries {
            let response = self
                .http
                .post(endpoint)
                .query(&[("key", api_key)])
                .timeout(Duration::from_secs_f64(self.settings.request_timeout_s))
                .json(payload)
                .send();

            match response {
                Ok(ok) => return response_json_or_error(ok),
                Err(raw) => {
                    let err = anyhow::Error::new(raw)
                        .context(format!("Gemini request failed ({endpoint})"));
                    if !is_retryable_transport_error(&err) || attempt >= max_retries {
                        return Err(err);
                    }
                    eprintln!(
                        "biogen: Gemini transport retry {}/{} after transient request failure.",
                        attempt + 1,
                        max_retries
                    );
                    let delay_s = self.settings.retry_backoff_s * (attempt as f64 + 1.0);
                    thread::sleep(Duration::from_secs_f64(delay_s));
                }
            }
        }

        bail!("Gemini transport retry loop exhausted ({endpoint})")
    }
}

impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_text(&self, request: &TextRequest) -> Result<Option<String>> {
        let endpoint = self.endpoint_for_model(&request.model);
        let response = self
            .post_with_transport_retries(&endpoint, &text_payload(request))
            .with_context(|| format!("Gemini {} call failed", request.purpose.as_str()))?;
        Ok(extract_text(&response))
    }
}

impl ImageProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_image(&self, request: &ImageRequest) -> Result<Option<InlineImage>> {
        let endpoint = self.endpoint_for_model(&request.model);
        let response = self
            .post_with_transport_retries(&endpoint, &image_payload(request))
            .context("Gemini image call failed")?;
        extract_inline_image(&response)
    }
}

pub(crate) fn text_payload(request: &TextRequest) -> Value {
    let mut payload = Map::new();
    payload.insert(
        "contents".to_string(),
        json!([{ "role": "user", "parts": [{ "text": request.prompt }] }]),
    );
    if let Some(instruction) = request
        .system_instruction
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        payload.insert(
            "systemInstruction".to_string(),
            json!({ "parts": [{ "text": instruction }] }),
        );
    }
    payload.insert(
        "generationConfig".to_string(),
        json!({
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema,
            "temperature": request.temperature,
        }),
    );
    Value::Object(payload)
}

pub(crate) fn image_payload(request: &ImageRequest) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
        "generationConfig": {
            "candidateCount": 1,
            "responseModalities": ["IMAGE"],
        },
    })
}

fn first_candidate_parts(response: &Value) -> Vec<Value> {
    response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Concatenated text of the first candidate, skipping thought parts.
pub(crate) fn extract_text(response: &Value) -> Option<String> {
    let text = first_candidate_parts(response)
        .iter()
        .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<String>();
    (!text.trim().is_empty()).then_some(text)
}

/// First inline image of the first candidate. Both the camelCase and
/// snake_case field spellings occur in the wild.
pub(crate) fn extract_inline_image(response: &Value) -> Result<Option<InlineImage>> {
    for part in first_candidate_parts(response) {
        let Some(inline) = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object)
        else {
            continue;
        };
        let data = inline
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        let bytes = BASE64
            .decode(data.as_bytes())
            .context("Gemini image base64 decode failed")?;
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str);
        return Ok(Some(InlineImage::new(mime_type, bytes)));
    }
    Ok(None)
}

fn response_json_or_error(response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .context("Gemini response body read failed")?;
    if !status.is_success() {
        bail!("Gemini request failed ({code}): {}", truncate_text(&body, 512));
    }
    let parsed: Value =
        serde_json::from_str(&body).context("Gemini returned invalid JSON payload")?;
    Ok(parsed)
}

fn is_retryable_transport_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .map(|reqwest_err| {
                reqwest_err.is_timeout() || reqwest_err.is_connect() || reqwest_err.is_request()
            })
            .unwrap_or(false)
    })
}
