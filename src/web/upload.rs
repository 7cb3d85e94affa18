//! Reading multipart forms into files and plain fields.

use std::collections::HashMap;

use axum::extract::Multipart;
use tracing::debug;

use crate::error::PhotoDiaryError;
use crate::ingest::UploadedFile;

/// Field carrying the captioner's single photo.
pub(crate) const PHOTO_FIELD: &str = "photo";
/// Field carrying the album's photos.
pub(crate) const PHOTOS_FIELD: &str = "photos";

/// A submitted form: the files of one field, in order, and every other field as text.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub(crate) files: Vec<UploadedFile>,
    pub(crate) fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drains the multipart stream. Parts of `file_field` become files, empty
    /// selections are skipped, and everything else is read as text.
    pub(crate) async fn read(
        mut multipart: Multipart,
        file_field: &str,
    ) -> Result<Self, PhotoDiaryError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let field_name = field.name().unwrap_or_default().to_string();
            if field_name == file_field {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if file_name.is_empty() && bytes.is_empty() {
                    // browsers send an empty part when nothing was picked
                    continue;
                }
                debug!("Received {} ({} bytes)", file_name, bytes.len());
                form.files.push(UploadedFile::new(file_name, bytes));
            } else {
                let value = field.text().await?;
                form.fields.insert(field_name, value);
            }
        }

        Ok(form)
    }

    /// A trimmed, non-empty text field.
    pub(crate) fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}
