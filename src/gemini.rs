//! Client for the Generative Language `generateContent` endpoint.
//!
//! One call per user action: a text instruction plus inline images in, plain
//! text out. Failures come back as [`ProviderError`] and are shown to the user
//! as they are; nothing here retries.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::{ApiKey, AppConfig};
use crate::constants::API_KEY_HEADER;
use crate::error::PhotoDiaryError;
use crate::ingest::UploadedImage;

/// Everything that can go wrong talking to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The request never got an answer: connect failure, timeout, broken transfer.
    Network(String),
    /// The provider answered with a non-success status.
    Api {
        /// HTTP status code.
        status: u16,
        /// The provider's own message, or the raw body.
        message: String,
    },
    /// The provider refused to answer for content reasons.
    Blocked(String),
    /// The answer had no text in it.
    EmptyResponse,
    /// The answer couldn't be parsed.
    Decode(String),
    /// There was nothing to send.
    NoImages,
    /// An image couldn't be prepared for sending.
    Image(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(cause) => write!(f, "could not reach the AI service: {cause}"),
            Self::Api { status, message } => {
                write!(f, "the AI service returned an error ({status}): {message}")
            }
            Self::Blocked(reason) => write!(f, "the AI service declined the request: {reason}"),
            Self::EmptyResponse => write!(f, "the AI service returned no text"),
            Self::Decode(cause) => write!(f, "could not read the AI service response: {cause}"),
            Self::NoImages => write!(f, "no photos to send"),
            Self::Image(cause) => write!(f, "could not prepare a photo for sending: {cause}"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest hides the interesting part (connection refused, timed out) in the source chain
        let mut message = if err.is_timeout() {
            format!("request timed out ({err})")
        } else {
            err.to_string()
        };
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = std::error::Error::source(inner);
        }
        ProviderError::Network(message)
    }
}

/// Request body of `generateContent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    /// Conversation turns; we only ever send one.
    pub contents: Vec<Content>,
}

/// A content turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// `user` on the way in, `model` on the way out.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,
    /// Ordered parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Text or inline media. Variant order matters for untagged decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// Base64 encoded media.
    InlineData {
        /// The payload.
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64 payload with its media type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// Media type, eg `image/jpeg`.
    pub mime_type: String,
    /// Base64 content.
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Text the model wrote, plus how the photo cap played out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedNarrative {
    /// The text as returned.
    pub text: String,
    /// Photos sent along.
    pub images_sent: usize,
    /// Photos left out by the cap.
    pub images_omitted: usize,
}

/// A built request and how many photos didn't fit.
#[derive(Debug, Clone)]
pub struct NarrativeRequest {
    /// Body to POST.
    pub body: GenerateContentRequest,
    /// Photos included.
    pub images_sent: usize,
    /// Photos left out because of `image_cap`.
    pub images_omitted: usize,
}

/// Builds the request body: the instruction first, then the first `image_cap` photos in order.
pub fn build_request(
    prompt: &str,
    images: &[UploadedImage],
    image_cap: usize,
) -> Result<NarrativeRequest, ProviderError> {
    if images.is_empty() || image_cap == 0 {
        return Err(ProviderError::NoImages);
    }
    let included = &images[..images.len().min(image_cap)];

    let mut parts = Vec::with_capacity(included.len() + 1);
    parts.push(Part::Text {
        text: prompt.to_string(),
    });
    for image in included {
        let data = image
            .to_base64()
            .map_err(|err| ProviderError::Image(format!("{}: {err}", image.file_name())))?;
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: image.media_type().to_string(),
                data,
            },
        });
    }

    Ok(NarrativeRequest {
        body: GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        },
        images_sent: included.len(),
        images_omitted: images.len() - included.len(),
    })
}

/// Pulls the answer text out of a successful response body.
fn parse_response(bytes: &[u8]) -> Result<String, ProviderError> {
    let parsed: GenerateContentResponse =
        serde_json::from_slice(bytes).map_err(|err| ProviderError::Decode(err.to_string()))?;

    if let Some(reason) = parsed
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(ProviderError::Blocked(reason));
    }

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or(ProviderError::EmptyResponse)?;
    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| match part {
                    Part::Text { text } => Some(text),
                    Part::InlineData { .. } => None,
                })
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                Err(ProviderError::Blocked(reason.to_string()))
            }
            _ => Err(ProviderError::EmptyResponse),
        };
    }
    Ok(text)
}

/// Turns an error body into a readable message, falling back to the raw text.
fn api_error(status: u16, bytes: &[u8]) -> ProviderError {
    let message = match serde_json::from_slice::<ErrorEnvelope>(bytes) {
        Ok(envelope) => match envelope.error.status {
            Some(code) if !envelope.error.message.is_empty() => {
                format!("{code}: {}", envelope.error.message)
            }
            _ => envelope.error.message,
        },
        Err(_) => String::from_utf8_lossy(bytes).trim().to_string(),
    };
    ProviderError::Api { status, message }
}

/// Talks to one model with one key.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: ApiKey,
    endpoint: Url,
    model: String,
    image_cap: usize,
}

impl GeminiClient {
    /// Builds a client from the startup config.
    pub fn new(config: &AppConfig) -> Result<Self, PhotoDiaryError> {
        let endpoint = config
            .api_base_url
            .join(&format!("v1beta/models/{}:generateContent", config.model))
            .map_err(|err| {
                PhotoDiaryError::Configuration(format!(
                    "Can't build the endpoint for model {:?}: {err}",
                    config.model
                ))
            })?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| PhotoDiaryError::InternalServerError(err.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            endpoint,
            model: config.model.clone(),
            image_cap: config.narrative_image_cap,
        })
    }

    /// The full `generateContent` URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// How many photos go along with each call.
    pub fn image_cap(&self) -> usize {
        self.image_cap
    }

    /// Sends the instruction and photos, returning whatever text comes back.
    pub async fn generate(
        &self,
        prompt: &str,
        images: &[UploadedImage],
    ) -> Result<GeneratedNarrative, ProviderError> {
        let request = build_request(prompt, images, self.image_cap)?;
        if request.images_omitted > 0 {
            info!(
                "Sending the first {} of {} photos to {}",
                request.images_sent,
                images.len(),
                self.model
            );
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(&request.body)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!("{} answered {} with {} bytes", self.model, status, bytes.len());

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &bytes));
        }

        Ok(GeneratedNarrative {
            text: parse_response(&bytes)?,
            images_sent: request.images_sent,
            images_omitted: request.images_omitted,
        })
    }
}
