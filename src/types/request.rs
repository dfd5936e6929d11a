//! Incoming image payloads for `/predict`

use crate::error::PredictError;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::Deserialize;

/// Standard alphabet, padding optional
const BASE64_IMAGE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// JSON body accepted by `/predict`
#[derive(Debug, Deserialize)]
pub struct JsonImageRequest {
    /// Base64 image, optionally behind a `data:<mime>;base64,` header
    #[serde(default)]
    pub image: Option<serde_json::Value>,
}

/// Image data as it arrived over the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Raw file bytes from a multipart field
    Raw(Vec<u8>),
    /// Base64 text from a JSON body
    Base64(String),
}

impl ImagePayload {
    /// Parse a JSON request body.
    ///
    /// A body that is not JSON, has no `image` key, or whose `image` is not a
    /// non-empty string carries no usable image.
    pub fn from_json_body(body: &[u8]) -> Result<Self, PredictError> {
        let request: JsonImageRequest =
            serde_json::from_slice(body).map_err(|_| PredictError::MissingImage)?;

        match request.image {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(Self::Base64(s)),
            _ => Err(PredictError::MissingImage),
        }
    }

    /// Decode the payload into encoded image bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>, PredictError> {
        let bytes = match self {
            Self::Raw(bytes) => bytes,
            Self::Base64(text) => decode_base64_image(&text)?,
        };

        if bytes.is_empty() {
            return Err(PredictError::MissingImage);
        }
        Ok(bytes)
    }

    /// Transport encoding, for logging
    pub fn encoding(&self) -> &'static str {
        match self {
            Self::Raw(_) => "multipart",
            Self::Base64(_) => "base64",
        }
    }
}

/// Drop a data-URL header (`data:image/png;base64,`) if present.
///
/// Everything up to and including the first comma is removed.
pub fn strip_data_url(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    }
}

/// Decode a base64 image string, with or without a data-URL header.
///
/// ASCII whitespace is ignored so line-wrapped payloads decode.
pub fn decode_base64_image(payload: &str) -> Result<Vec<u8>, PredictError> {
    let data = strip_data_url(payload.trim());
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(BASE64_IMAGE.decode(compact)?)
}
