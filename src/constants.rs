//! Shared constants/defaults for things
//!

/// Model used for both the diary and the class letter.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Base URL of the hosted Generative Language API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/";

/// Header carrying the API key on every provider call.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// File extensions accepted at the upload boundary, lowercase.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Value for the `accept` attribute of the upload inputs.
pub const UPLOAD_ACCEPT: &str = ".jpg,.jpeg,.png";

/// How many photos the album composer takes in one go.
pub const DEFAULT_MAX_UPLOADS: usize = 20;

/// How many of the album photos are sent along for the class letter.
pub const DEFAULT_NARRATIVE_IMAGE_CAP: usize = 10;

/// Width every animation frame is scaled to, in pixels.
pub const DEFAULT_FRAME_WIDTH: u32 = 400;

/// GIFs store sizes as u16.
pub const MAX_FRAME_SIDE: u32 = u16::MAX as u32;

/// Widest frame the album form accepts, in pixels.
pub const MAX_REQUEST_FRAME_WIDTH: u32 = 1920;

/// Pixels one animation may hold across all of its frames (64 Mpx, 256 MiB as RGBA).
pub const MAX_ANIMATION_PIXELS: u64 = 64 * 1024 * 1024;

/// Per-frame duration preselected on the animation slider, in seconds.
pub const DEFAULT_FRAME_DURATION_SECS: f32 = 0.5;

/// Lower bound of the animation slider, in seconds.
pub const MIN_FRAME_DURATION_SECS: f32 = 0.2;

/// Upper bound of the animation slider, in seconds.
pub const MAX_FRAME_DURATION_SECS: f32 = 2.0;

/// Slider step, in seconds.
pub const FRAME_DURATION_STEP_SECS: f32 = 0.1;

/// Suggested file name of the downloadable animation.
pub const ANIMATION_FILE_NAME: &str = "class_memory.gif";

/// Media type of the downloadable animation.
pub const ANIMATION_MEDIA_TYPE: &str = "image/gif";

/// Default request body limit, in MiB. Twenty phone photos fit comfortably.
pub const DEFAULT_MAX_BODY_MB: usize = 100;

/// Speed passed to the GIF quantizer, 1 (best) to 30 (fastest).
pub const GIF_ENCODER_SPEED: i32 = 10;
