//! Turning uploaded files into decoded images.
//!
//! Files are checked against the extension allow-list, sniffed, and decoded one
//! by one. A file that can't be used is rejected on its own; the rest carry on.

use std::borrow::Cow;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

use axum::body::Bytes;
use base64::Engine;
use base64::engine::general_purpose;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::constants::ALLOWED_EXTENSIONS;

/// A file as it arrived from the client, before decoding.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    /// Client supplied file name.
    pub file_name: String,
    /// Raw content.
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Wraps a named byte buffer.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Reasons a single upload was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// The file name has no extension at all.
    MissingExtension,
    /// The extension is not one of jpg, jpeg or png.
    UnsupportedExtension(String),
    /// The content isn't JPEG or PNG, whatever the name says.
    UnsupportedFormat(String),
    /// The content couldn't be decoded as an image.
    Decode(String),
    /// More files than the form accepts.
    TooManyFiles {
        /// The configured limit.
        limit: usize,
    },
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingExtension => write!(f, "file has no extension; use jpg, jpeg or png"),
            Self::UnsupportedExtension(ext) => {
                write!(f, "\".{ext}\" files are not accepted; use jpg, jpeg or png")
            }
            Self::UnsupportedFormat(format) => {
                write!(f, "content is {format}, only JPEG and PNG images are accepted")
            }
            Self::Decode(cause) => write!(f, "could not read the image: {cause}"),
            Self::TooManyFiles { limit: 1 } => write!(f, "only one photo is used"),
            Self::TooManyFiles { limit } => {
                write!(f, "only the first {limit} photos are used")
            }
        }
    }
}

impl std::error::Error for UploadError {}

/// A decoded image plus what we know about where it came from.
#[derive(Clone, Debug)]
pub struct UploadedImage {
    file_name: String,
    format: ImageFormat,
    source: Option<Bytes>,
    image: DynamicImage,
}

impl UploadedImage {
    /// Wraps pixels that never had a file behind them. They get re-encoded as
    /// PNG when bytes are needed.
    pub fn from_image(file_name: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            file_name: file_name.into(),
            format: ImageFormat::Png,
            source: None,
            image,
        }
    }

    /// Client supplied file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Media type of [`Self::encoded`].
    pub fn media_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Decoded width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Decoded height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Decoded pixels.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// The bytes as uploaded, or a PNG encoding for in-memory images.
    pub fn encoded(&self) -> Result<Cow<'_, [u8]>, image::ImageError> {
        if let Some(source) = &self.source {
            return Ok(Cow::Borrowed(source.as_ref()));
        }
        let mut output = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
        Ok(Cow::Owned(output))
    }

    /// Base64 of [`Self::encoded`].
    pub fn to_base64(&self) -> Result<String, image::ImageError> {
        Ok(general_purpose::STANDARD.encode(self.encoded()?))
    }

    /// A `data:` URL for showing the image inline.
    pub fn data_url(&self) -> Result<String, image::ImageError> {
        Ok(format!("data:{};base64,{}", self.media_type(), self.to_base64()?))
    }
}

/// Photos of one interaction in upload order. Earlier photos win whenever a cap applies.
#[derive(Clone, Debug, Default)]
pub struct ImageSequence {
    images: Vec<UploadedImage>,
}

impl ImageSequence {
    /// Wraps images, keeping their order.
    pub fn new(images: Vec<UploadedImage>) -> Self {
        Self { images }
    }

    /// All images in order.
    pub fn images(&self) -> &[UploadedImage] {
        &self.images
    }

    /// At most `cap` images from the front.
    pub fn first(&self, cap: usize) -> &[UploadedImage] {
        &self.images[..self.images.len().min(cap)]
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// True when nothing was accepted.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// A file that didn't make it into the sequence, and why.
#[derive(Clone, Debug)]
pub struct RejectedUpload {
    /// Client supplied file name.
    pub file_name: String,
    /// What was wrong with it.
    pub reason: UploadError,
}

impl fmt::Display for RejectedUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file_name, self.reason)
    }
}

/// Result of ingesting a batch of uploads.
#[derive(Clone, Debug, Default)]
pub struct IngestOutcome {
    /// Accepted images, in submission order.
    pub sequence: ImageSequence,
    /// Files that were turned away, in submission order.
    pub rejected: Vec<RejectedUpload>,
}

fn check_extension(file_name: &str) -> Result<(), UploadError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(UploadError::MissingExtension)?
        .to_ascii_lowercase();
    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(UploadError::UnsupportedExtension(extension))
    }
}

/// Decodes one upload, checking the allow-list first.
pub fn decode_upload(file: UploadedFile) -> Result<UploadedImage, UploadError> {
    check_extension(&file.file_name)?;

    let reader = image::ImageReader::new(Cursor::new(file.bytes.as_ref()))
        .with_guessed_format()
        .map_err(|err| {
            debug!("Failed to guess image format of {}: {}", file.file_name, err);
            UploadError::Decode(err.to_string())
        })?;
    let format = match reader.format() {
        Some(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => format,
        Some(other) => return Err(UploadError::UnsupportedFormat(format!("{other:?}"))),
        None => {
            return Err(UploadError::Decode(
                "unrecognised image content".to_string(),
            ));
        }
    };
    let image = reader.decode().map_err(|err| {
        debug!("Failed to decode {}: {}", file.file_name, err);
        UploadError::Decode(err.to_string())
    })?;

    Ok(UploadedImage {
        file_name: file.file_name,
        format,
        source: Some(file.bytes),
        image,
    })
}

/// Decodes every upload in order, keeping at most `max_files` images.
pub fn ingest_uploads(files: Vec<UploadedFile>, max_files: usize) -> IngestOutcome {
    let mut images = Vec::with_capacity(files.len().min(max_files));
    let mut rejected = Vec::new();

    for (index, file) in files.into_iter().enumerate() {
        if index >= max_files {
            rejected.push(RejectedUpload {
                file_name: file.file_name,
                reason: UploadError::TooManyFiles { limit: max_files },
            });
            continue;
        }
        let file_name = file.file_name.clone();
        match decode_upload(file) {
            Ok(image) => images.push(image),
            Err(reason) => {
                debug!("Rejected upload {file_name}: {reason}");
                rejected.push(RejectedUpload { file_name, reason });
            }
        }
    }

    IngestOutcome {
        sequence: ImageSequence::new(images),
        rejected,
    }
}
