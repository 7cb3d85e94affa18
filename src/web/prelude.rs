pub(crate) use crate::error::PhotoDiaryError;
pub(crate) use crate::web::AppState;
pub(crate) use askama::Template;
pub(crate) use askama_web::WebTemplate;
pub(crate) use axum::extract::{Multipart, Query, State};
pub(crate) use axum::http::StatusCode;
pub(crate) use axum::response::{IntoResponse, Response};
pub(crate) use chrono::Local;
pub(crate) use serde::Deserialize;
pub(crate) use tracing::{info, warn};
