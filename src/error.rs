//! Error handling

use std::fmt;

use axum::response::IntoResponse;
use tracing::{info, warn};

use crate::animation::AnimationError;
use crate::gemini::ProviderError;
use crate::ingest::UploadError;

/// definitions for the photo-diary application.
#[derive(Debug)]
pub enum PhotoDiaryError {
    /// When you didn't do the right thing
    BadRequest(String),
    /// Startup configuration is missing or invalid
    Configuration(String),
    /// The AI provider call failed
    Provider(ProviderError),
    /// Resizing or encoding the animation failed
    Animation(AnimationError),
    /// An uploaded file could not be used
    Upload(UploadError),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl fmt::Display for PhotoDiaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest(message) => write!(f, "Bad request: {message}"),
            Self::Configuration(message) => write!(f, "Configuration error: {message}"),
            Self::Provider(err) => write!(f, "AI provider error: {err}"),
            Self::Animation(err) => write!(f, "Animation error: {err}"),
            Self::Upload(err) => write!(f, "Upload error: {err}"),
            Self::InternalServerError(message) => write!(f, "Internal server error: {message}"),
        }
    }
}

impl std::error::Error for PhotoDiaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Provider(err) => Some(err),
            Self::Animation(err) => Some(err),
            Self::Upload(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProviderError> for PhotoDiaryError {
    fn from(err: ProviderError) -> Self {
        PhotoDiaryError::Provider(err)
    }
}

impl From<AnimationError> for PhotoDiaryError {
    fn from(err: AnimationError) -> Self {
        PhotoDiaryError::Animation(err)
    }
}

impl From<UploadError> for PhotoDiaryError {
    fn from(err: UploadError) -> Self {
        PhotoDiaryError::Upload(err)
    }
}

impl From<std::io::Error> for PhotoDiaryError {
    fn from(err: std::io::Error) -> Self {
        PhotoDiaryError::InternalServerError(err.to_string())
    }
}

impl From<axum::http::Error> for PhotoDiaryError {
    fn from(err: axum::http::Error) -> Self {
        PhotoDiaryError::InternalServerError(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for PhotoDiaryError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        PhotoDiaryError::BadRequest(err.body_text())
    }
}

impl From<tokio::task::JoinError> for PhotoDiaryError {
    fn from(err: tokio::task::JoinError) -> Self {
        PhotoDiaryError::InternalServerError(err.to_string())
    }
}

impl PhotoDiaryError {
    /// The HTTP status this error is reported with.
    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            PhotoDiaryError::BadRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            PhotoDiaryError::Configuration(_) => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            PhotoDiaryError::Provider(_) => axum::http::StatusCode::BAD_GATEWAY,
            PhotoDiaryError::Animation(_) | PhotoDiaryError::Upload(_) => {
                axum::http::StatusCode::UNPROCESSABLE_ENTITY
            }
            PhotoDiaryError::InternalServerError(_) => {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn text_response(status: axum::http::StatusCode, body: String) -> axum::response::Response {
    let mut response = axum::response::Response::new(axum::body::Body::from(body));
    *response.status_mut() = status;
    response
}

impl IntoResponse for PhotoDiaryError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        match self {
            PhotoDiaryError::BadRequest(message) => {
                info!("Bad request received: {message}");
                text_response(status, format!("Bad Request: {message}"))
            }
            PhotoDiaryError::Configuration(message) => {
                tracing::error!("Configuration error: {message}");
                text_response(status, message)
            }
            PhotoDiaryError::Provider(err) => {
                warn!("AI provider error: {err}");
                text_response(status, err.to_string())
            }
            PhotoDiaryError::Animation(err) => {
                info!("Animation failed: {err}");
                text_response(status, err.to_string())
            }
            PhotoDiaryError::Upload(err) => {
                info!("Upload rejected: {err}");
                text_response(status, err.to_string())
            }
            PhotoDiaryError::InternalServerError(message) => {
                tracing::error!("Internal server error: {}", message);
                text_response(status, "Internal server error".to_string())
            }
        }
    }
}
