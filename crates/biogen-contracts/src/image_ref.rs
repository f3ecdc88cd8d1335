use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Decoded inline image payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    pub fn new(mime_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let mime_type = mime_type
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string();
        Self { mime_type, bytes }
    }

    pub fn to_data_url(&self) -> String {
        data_url_from_base64(&self.mime_type, &BASE64.encode(&self.bytes))
    }

    pub fn file_extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }
}

/// Builds a data URL from an already base64-encoded payload.
pub fn data_url_from_base64(mime_type: &str, payload: &str) -> String {
    let mime_type = if mime_type.trim().is_empty() {
        DEFAULT_IMAGE_MIME
    } else {
        mime_type.trim()
    };
    format!("data:{mime_type};base64,{}", payload.trim())
}

pub fn decode_data_url(value: &str) -> Result<InlineImage> {
    let (meta, payload) = value
        .trim()
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("invalid data URL image payload"))?;
    let mime = meta
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| anyhow::anyhow!("image reference is not a data URL"))?
        .split(';')
        .next()
        .map(str::trim)
        .filter(|item| !item.is_empty());
    let bytes = BASE64
        .decode(payload.trim().as_bytes())
        .context("image data URL base64 decode failed")?;
    Ok(InlineImage::new(mime, bytes))
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    let lowered = mime.to_ascii_lowercase();
    if lowered.contains("jpeg") || lowered.contains("jpg") {
        return "jpg";
    }
    if lowered.contains("webp") {
        return "webp";
    }
    "png"
}
