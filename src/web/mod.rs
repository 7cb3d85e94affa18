//! HTTP front end for the diary and the album.

use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{StatusCode, header::CONTENT_TYPE};
use axum::response::IntoResponse;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::PhotoDiaryError;
use crate::gemini::GeminiClient;

mod album;
mod diary;
mod prelude;
mod upload;
mod views;

use album::{album_handler, animation_handler, download_handler, gallery_handler, narrative_handler};
use diary::{diary_page, diary_submit};
use views::{ConfigErrorTemplate, home_handler};

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    config: Arc<AppConfig>,
    gemini: GeminiClient,
}

impl AppState {
    pub(crate) fn new(config: AppConfig) -> Result<Self, PhotoDiaryError> {
        let gemini = GeminiClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            gemini,
        })
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(home_handler))
        .route("/static/styles.css", axum::routing::get(styles_handler))
        .route(
            "/diary",
            axum::routing::get(diary_page).post(diary_submit),
        )
        .route("/album", axum::routing::get(album_handler))
        .route("/album/narrative", axum::routing::post(narrative_handler))
        .route("/album/animation", axum::routing::post(animation_handler))
        .route(
            "/album/animation/download",
            axum::routing::post(download_handler),
        )
        .route("/album/gallery", axum::routing::post(gallery_handler))
}

fn build_app(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;
    create_router()
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Clone, Debug)]
struct ConfigErrorState {
    message: String,
}

async fn config_error_handler(State(state): State<ConfigErrorState>) -> impl IntoResponse {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        ConfigErrorTemplate {
            message: state.message,
        },
    )
}

/// Every page answers with the configuration error; nothing else is reachable.
fn config_error_app(message: String) -> Router {
    Router::new()
        .route("/static/styles.css", axum::routing::get(styles_handler))
        .fallback(config_error_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(ConfigErrorState { message })
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

/// Picks the app for the loaded config: the real one, or the error page when
/// startup configuration failed.
fn app_for(config: Result<AppConfig, PhotoDiaryError>) -> Router {
    let state = config.and_then(AppState::new);
    match state {
        Ok(state) => build_app(state),
        Err(err) => {
            warn!("Only the configuration error page will be served");
            let message = match err {
                PhotoDiaryError::Configuration(message) => message,
                other => other.to_string(),
            };
            config_error_app(message)
        }
    }
}

/// Binds the listener and serves until the process is stopped.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    config: Result<AppConfig, PhotoDiaryError>,
) -> Result<(), anyhow::Error> {
    let app = app_for(config);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
    Ok(())
}
