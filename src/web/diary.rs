//! Single-photo captioner: one photo in, one short diary entry out.

use super::prelude::*;
use super::upload::{PHOTO_FIELD, UploadForm};
use super::views::{DiaryTemplate, NarrativeView, photo_views, rejected_views};
use crate::ingest::ingest_uploads;
use crate::prompts::DIARY_PROMPT;

/// handles the /diary GET
pub(crate) async fn diary_page() -> DiaryTemplate {
    DiaryTemplate::new()
}

/// handles the /diary POST
pub(crate) async fn diary_submit(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, PhotoDiaryError> {
    let form = UploadForm::read(multipart, PHOTO_FIELD).await?;
    let outcome = ingest_uploads(form.files, 1);

    let mut page = DiaryTemplate::new();
    page.rejected = rejected_views(&outcome.rejected);
    page.photo = photo_views(&outcome.sequence).into_iter().next();

    if outcome.sequence.is_empty() {
        page.error = Some("Please choose a jpg, jpeg or png photo first.".to_string());
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    match state
        .gemini
        .generate(DIARY_PROMPT, outcome.sequence.images())
        .await
    {
        Ok(narrative) => {
            info!("Diary written ({} chars)", narrative.text.chars().count());
            page.diary = Some(NarrativeView::from(narrative));
            Ok(page.into_response())
        }
        Err(err) => {
            warn!("Diary generation failed: {err}");
            let err = PhotoDiaryError::from(err);
            page.error = Some(err.to_string());
            Ok((err.status_code(), page).into_response())
        }
    }
}
