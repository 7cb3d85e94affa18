//! Album composer: class letter, animated GIF and photo grid over one set of uploads.

use super::prelude::*;
use super::upload::{PHOTOS_FIELD, UploadForm};
use super::views::{
    AlbumTab, AlbumTemplate, AnimationView, NarrativeView, photo_views, rejected_views,
};
use crate::animation::{AnimationArtifact, AnimationRequest, LoopCount, assemble};
use crate::config::AppConfig;
use crate::constants::{
    DEFAULT_FRAME_DURATION_SECS, MAX_FRAME_DURATION_SECS, MAX_REQUEST_FRAME_WIDTH,
    MIN_FRAME_DURATION_SECS,
};
use crate::ingest::{ImageSequence, IngestOutcome, ingest_uploads};
use crate::prompts::CLASS_LETTER_PROMPT;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};

const NO_PHOTOS: &str = "Please choose at least one jpg, jpeg or png photo.";

#[derive(Deserialize)]
pub(crate) struct AlbumQuery {
    tab: Option<String>,
}

/// Playback settings as submitted on the animation form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct AnimationSettings {
    pub(crate) frame_width: u32,
    pub(crate) duration_secs: f32,
    pub(crate) loop_count: LoopCount,
}

impl AnimationSettings {
    /// Reads `duration`, `frame_width` and `loop_count`, falling back to defaults
    /// for anything left blank.
    pub(crate) fn from_form(form: &UploadForm, config: &AppConfig) -> Result<Self, PhotoDiaryError> {
        let duration_secs = match form.field("duration") {
            Some(value) => value.parse::<f32>().map_err(|_| {
                PhotoDiaryError::BadRequest(format!("\"{value}\" is not a frame duration"))
            })?,
            None => DEFAULT_FRAME_DURATION_SECS,
        };
        if !(MIN_FRAME_DURATION_SECS..=MAX_FRAME_DURATION_SECS).contains(&duration_secs) {
            return Err(PhotoDiaryError::BadRequest(format!(
                "frame duration must be between {MIN_FRAME_DURATION_SECS} and {MAX_FRAME_DURATION_SECS} seconds"
            )));
        }

        let frame_width = match form.field("frame_width") {
            Some(value) => value.parse::<u32>().map_err(|_| {
                PhotoDiaryError::BadRequest(format!("\"{value}\" is not a frame width"))
            })?,
            None => config.frame_width,
        };
        if !(1..=MAX_REQUEST_FRAME_WIDTH).contains(&frame_width) {
            return Err(PhotoDiaryError::BadRequest(format!(
                "frame width must be between 1 and {MAX_REQUEST_FRAME_WIDTH} pixels"
            )));
        }

        let loop_count = match form.field("loop_count") {
            Some(value) => LoopCount(value.parse::<u16>().map_err(|_| {
                PhotoDiaryError::BadRequest(format!("\"{value}\" is not a loop count"))
            })?),
            None => LoopCount::INFINITE,
        };

        Ok(Self {
            frame_width,
            duration_secs,
            loop_count,
        })
    }
}

/// Runs the pipeline off the async workers.
async fn animate(
    sequence: ImageSequence,
    settings: AnimationSettings,
) -> Result<AnimationArtifact, PhotoDiaryError> {
    let request = AnimationRequest::new(
        sequence,
        settings.frame_width,
        settings.duration_secs,
        settings.loop_count,
    )?;
    let artifact = tokio::task::spawn_blocking(move || assemble(&request)).await??;
    Ok(artifact)
}

async fn read_album(
    state: &AppState,
    multipart: Multipart,
) -> Result<(UploadForm, IngestOutcome), PhotoDiaryError> {
    let mut form = UploadForm::read(multipart, PHOTOS_FIELD).await?;
    let files = std::mem::take(&mut form.files);
    let outcome = ingest_uploads(files, state.config.max_uploads);
    Ok((form, outcome))
}

fn album_page(state: &AppState, tab: AlbumTab, outcome: &IngestOutcome) -> AlbumTemplate {
    let mut page = AlbumTemplate::new(state, tab);
    page.uploaded_count = outcome.sequence.len();
    page.rejected = rejected_views(&outcome.rejected);
    page
}

/// handles the /album GET
pub(crate) async fn album_handler(
    State(state): State<AppState>,
    Query(query): Query<AlbumQuery>,
) -> AlbumTemplate {
    AlbumTemplate::new(&state, AlbumTab::from_query(query.tab.as_deref()))
}

/// handles the /album/narrative POST
pub(crate) async fn narrative_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, PhotoDiaryError> {
    let (_, outcome) = read_album(&state, multipart).await?;
    let mut page = album_page(&state, AlbumTab::Narrative, &outcome);
    if outcome.sequence.is_empty() {
        return Ok(page.with_error(&PhotoDiaryError::BadRequest(NO_PHOTOS.to_string())));
    }

    match state
        .gemini
        .generate(CLASS_LETTER_PROMPT, outcome.sequence.images())
        .await
    {
        Ok(narrative) => {
            info!(
                "Class letter written from {} of {} photos",
                narrative.images_sent,
                outcome.sequence.len()
            );
            page.narrative = Some(NarrativeView::from(narrative));
            Ok(page.into_response())
        }
        Err(err) => {
            warn!("Class letter generation failed: {err}");
            Ok(page.with_error(&PhotoDiaryError::from(err)))
        }
    }
}

/// handles the /album/animation POST
pub(crate) async fn animation_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, PhotoDiaryError> {
    let (form, outcome) = read_album(&state, multipart).await?;
    let mut page = album_page(&state, AlbumTab::Animation, &outcome);
    if let Some(value) = form.field("duration") {
        page.duration_value = value.to_string();
    }

    let settings = match AnimationSettings::from_form(&form, &state.config) {
        Ok(settings) => settings,
        Err(err) => return Ok(page.with_error(&err)),
    };
    page.frame_width = settings.frame_width;
    page.loop_count = settings.loop_count.0;

    if outcome.sequence.is_empty() {
        return Ok(page.with_error(&PhotoDiaryError::BadRequest(NO_PHOTOS.to_string())));
    }

    match animate(outcome.sequence, settings).await {
        Ok(artifact) => {
            info!(
                "Animation built: {} frames, {} bytes",
                artifact.frame_count(),
                artifact.bytes.len()
            );
            page.animation = Some(AnimationView::from(&artifact));
            Ok(page.into_response())
        }
        Err(err) => {
            warn!("Animation failed: {err}");
            Ok(page.with_error(&err))
        }
    }
}

/// handles the /album/animation/download POST
pub(crate) async fn download_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, PhotoDiaryError> {
    let (form, outcome) = read_album(&state, multipart).await?;
    let settings = AnimationSettings::from_form(&form, &state.config)?;
    if outcome.sequence.is_empty() {
        return Err(PhotoDiaryError::BadRequest(NO_PHOTOS.to_string()));
    }

    let artifact = animate(outcome.sequence, settings).await?;
    let response = axum::response::Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, artifact.media_type)
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.file_name),
        )
        .body(axum::body::Body::from(artifact.bytes))?;
    Ok(response)
}

/// handles the /album/gallery POST
pub(crate) async fn gallery_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, PhotoDiaryError> {
    let (_, outcome) = read_album(&state, multipart).await?;
    let mut page = album_page(&state, AlbumTab::Gallery, &outcome);
    if outcome.sequence.is_empty() {
        return Ok(page.with_error(&PhotoDiaryError::BadRequest(NO_PHOTOS.to_string())));
    }
    page.photos = photo_views(&outcome.sequence);
    Ok(page.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_config;
    use std::collections::HashMap;
    use url::Url;

    fn form_with(fields: &[(&str, &str)]) -> UploadForm {
        UploadForm {
            files: Vec::new(),
            fields: fields
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn config() -> AppConfig {
        test_config(Url::parse("http://127.0.0.1:9/").expect("url"))
    }

    #[test]
    fn settings_default_when_blank() {
        let settings =
            AnimationSettings::from_form(&form_with(&[("duration", " ")]), &config())
                .expect("settings");
        assert_eq!(
            settings,
            AnimationSettings {
                frame_width: 400,
                duration_secs: 0.5,
                loop_count: LoopCount::INFINITE,
            }
        );
    }

    #[test]
    fn settings_read_every_field() {
        let settings = AnimationSettings::from_form(
            &form_with(&[("duration", "1.5"), ("frame_width", "320"), ("loop_count", "2")]),
            &config(),
        )
        .expect("settings");
        assert_eq!(settings.frame_width, 320);
        assert_eq!(settings.duration_secs, 1.5);
        assert_eq!(settings.loop_count, LoopCount(2));
    }

    #[test]
    fn settings_reject_out_of_range_or_garbage() {
        for fields in [
            vec![("duration", "0.1")],
            vec![("duration", "2.5")],
            vec![("duration", "fast")],
            vec![("frame_width", "-3")],
            vec![("frame_width", "0")],
            vec![("frame_width", "65535")],
            vec![("frame_width", "1921")],
            vec![("loop_count", "forever")],
        ] {
            let result = AnimationSettings::from_form(&form_with(&fields), &config());
            assert!(
                matches!(result, Err(PhotoDiaryError::BadRequest(_))),
                "{fields:?}"
            );
        }
    }

    #[test]
    fn widest_form_frame_is_accepted() {
        let settings =
            AnimationSettings::from_form(&form_with(&[("frame_width", "1920")]), &config())
                .expect("settings");
        assert_eq!(settings.frame_width, MAX_REQUEST_FRAME_WIDTH);
    }

    #[test]
    fn slider_bounds_are_accepted() {
        for value in ["0.2", "2.0", "2"] {
            assert!(
                AnimationSettings::from_form(&form_with(&[("duration", value)]), &config())
                    .is_ok(),
                "{value}"
            );
        }
    }
}
