use super::prelude::*;
use crate::animation::AnimationArtifact;
use crate::constants::{
    DEFAULT_FRAME_DURATION_SECS, FRAME_DURATION_STEP_SECS, MAX_FRAME_DURATION_SECS,
    MAX_REQUEST_FRAME_WIDTH, MIN_FRAME_DURATION_SECS, UPLOAD_ACCEPT,
};
use crate::gemini::GeneratedNarrative;
use crate::ingest::{ImageSequence, RejectedUpload, UploadedImage};

#[derive(Clone, Debug)]
pub(crate) struct PhotoView {
    pub(crate) file_name: String,
    pub(crate) data_url: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl PhotoView {
    fn from_image(image: &UploadedImage) -> Option<Self> {
        match image.data_url() {
            Ok(data_url) => Some(Self {
                file_name: image.file_name().to_string(),
                data_url,
                width: image.width(),
                height: image.height(),
            }),
            Err(err) => {
                warn!("Can't show {} inline: {}", image.file_name(), err);
                None
            }
        }
    }
}

pub(crate) fn photo_views(sequence: &ImageSequence) -> Vec<PhotoView> {
    sequence
        .images()
        .iter()
        .filter_map(PhotoView::from_image)
        .collect()
}

#[derive(Clone, Debug)]
pub(crate) struct RejectedView {
    pub(crate) file_name: String,
    pub(crate) reason: String,
}

pub(crate) fn rejected_views(rejected: &[RejectedUpload]) -> Vec<RejectedView> {
    rejected
        .iter()
        .map(|upload| RejectedView {
            file_name: upload.file_name.clone(),
            reason: upload.reason.to_string(),
        })
        .collect()
}

#[derive(Clone, Debug)]
pub(crate) struct NarrativeView {
    pub(crate) paragraphs: Vec<String>,
    pub(crate) images_sent: usize,
    pub(crate) images_omitted: usize,
}

impl From<GeneratedNarrative> for NarrativeView {
    fn from(narrative: GeneratedNarrative) -> Self {
        let paragraphs = narrative
            .text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            paragraphs,
            images_sent: narrative.images_sent,
            images_omitted: narrative.images_omitted,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct AnimationView {
    pub(crate) data_url: String,
    pub(crate) file_name: String,
    pub(crate) frame_count: usize,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) duration_label: String,
    pub(crate) loop_label: String,
}

impl From<&AnimationArtifact> for AnimationView {
    fn from(artifact: &AnimationArtifact) -> Self {
        Self {
            data_url: artifact.data_url(),
            file_name: artifact.file_name.to_string(),
            frame_count: artifact.frame_count(),
            width: artifact.canvas_size.0,
            height: artifact.canvas_size.1,
            duration_label: format!(
                "{:.2}",
                f64::from(artifact.frame_duration.millis()) / 1000.0
            ),
            loop_label: if artifact.loop_count.is_infinite() {
                "forever".to_string()
            } else {
                format!("{} times", artifact.loop_count.0)
            },
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub(crate) struct HomeTemplate {
    pub(crate) max_uploads: usize,
}

#[derive(Template, WebTemplate)]
#[template(path = "config_error.html")]
pub(crate) struct ConfigErrorTemplate {
    pub(crate) message: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "diary.html")]
pub(crate) struct DiaryTemplate {
    pub(crate) accept: &'static str,
    pub(crate) photo: Option<PhotoView>,
    pub(crate) diary: Option<NarrativeView>,
    pub(crate) date_label: String,
    pub(crate) error: Option<String>,
    pub(crate) rejected: Vec<RejectedView>,
}

impl DiaryTemplate {
    pub(crate) fn new() -> Self {
        Self {
            accept: UPLOAD_ACCEPT,
            photo: None,
            diary: None,
            date_label: Local::now().format("%Y-%m-%d").to_string(),
            error: None,
            rejected: Vec::new(),
        }
    }
}

/// The three album views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AlbumTab {
    Narrative,
    Animation,
    Gallery,
}

impl AlbumTab {
    pub(crate) fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("animation") => Self::Animation,
            Some("gallery") => Self::Gallery,
            _ => Self::Narrative,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Narrative => "narrative",
            Self::Animation => "animation",
            Self::Gallery => "gallery",
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "album.html")]
pub(crate) struct AlbumTemplate {
    pub(crate) active_tab: &'static str,
    pub(crate) accept: &'static str,
    pub(crate) max_uploads: usize,
    pub(crate) narrative_cap: usize,
    pub(crate) uploaded_count: usize,
    pub(crate) photos: Vec<PhotoView>,
    pub(crate) rejected: Vec<RejectedView>,
    pub(crate) narrative: Option<NarrativeView>,
    pub(crate) animation: Option<AnimationView>,
    pub(crate) error: Option<String>,
    pub(crate) duration_value: String,
    pub(crate) duration_min: String,
    pub(crate) duration_max: String,
    pub(crate) duration_step: String,
    pub(crate) frame_width: u32,
    pub(crate) max_frame_width: u32,
    pub(crate) loop_count: u16,
}

impl AlbumTemplate {
    pub(crate) fn new(state: &AppState, tab: AlbumTab) -> Self {
        Self {
            active_tab: tab.as_str(),
            accept: UPLOAD_ACCEPT,
            max_uploads: state.config.max_uploads,
            narrative_cap: state.gemini.image_cap(),
            uploaded_count: 0,
            photos: Vec::new(),
            rejected: Vec::new(),
            narrative: None,
            animation: None,
            error: None,
            duration_value: format!("{:.1}", DEFAULT_FRAME_DURATION_SECS),
            duration_min: format!("{:.1}", MIN_FRAME_DURATION_SECS),
            duration_max: format!("{:.1}", MAX_FRAME_DURATION_SECS),
            duration_step: format!("{:.1}", FRAME_DURATION_STEP_SECS),
            frame_width: state.config.frame_width,
            max_frame_width: MAX_REQUEST_FRAME_WIDTH,
            loop_count: 0,
        }
    }

    /// Shows the page with an error banner and a matching status.
    pub(crate) fn with_error(mut self, err: &PhotoDiaryError) -> Response {
        self.error = Some(err.to_string());
        (err.status_code(), self).into_response()
    }
}

/// handles the / GET
pub(crate) async fn home_handler(State(state): State<AppState>) -> HomeTemplate {
    HomeTemplate {
        max_uploads: state.config.max_uploads,
    }
}
