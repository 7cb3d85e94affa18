//! Config handling

use std::fmt;
use std::time::Duration;

use tracing::log::LevelFilter;
use url::Url;

use crate::cli::CliOptions;
use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_FRAME_WIDTH, DEFAULT_MAX_BODY_MB, DEFAULT_MAX_UPLOADS,
    DEFAULT_MODEL, DEFAULT_NARRATIVE_IMAGE_CAP, MAX_REQUEST_FRAME_WIDTH,
};
use crate::error::PhotoDiaryError;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// The shared secret for the AI provider. Never printed.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Resolves the credential, treating a missing or blank value as a configuration error.
    pub fn new(value: Option<&str>) -> Result<Self, PhotoDiaryError> {
        match value.map(str::trim) {
            Some(key) if !key.is_empty() => Ok(Self(key.to_string())),
            _ => Err(PhotoDiaryError::Configuration(
                "The GOOGLE_API_KEY secret is not set. Configure it and restart the server."
                    .to_string(),
            )),
        }
    }

    /// The raw key, for the request header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Everything the handlers need, loaded once at startup and never mutated.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Provider credential.
    pub api_key: ApiKey,
    /// Model identifier for `generateContent`.
    pub model: String,
    /// Base URL of the provider API, always ending in `/`.
    pub api_base_url: Url,
    /// How many album photos are sent for the class letter.
    pub narrative_image_cap: usize,
    /// Default animation frame width in pixels.
    pub frame_width: u32,
    /// Maximum photos per album submission.
    pub max_uploads: usize,
    /// Request body limit in bytes.
    pub max_body_bytes: usize,
    /// Optional timeout for provider calls.
    pub request_timeout: Option<Duration>,
}

impl AppConfig {
    /// Builds a config with defaults for everything but the key.
    pub fn new(api_key: ApiKey) -> Result<Self, PhotoDiaryError> {
        Ok(Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_base_url: parse_base_url(DEFAULT_API_BASE_URL)?,
            narrative_image_cap: DEFAULT_NARRATIVE_IMAGE_CAP,
            frame_width: DEFAULT_FRAME_WIDTH,
            max_uploads: DEFAULT_MAX_UPLOADS,
            max_body_bytes: DEFAULT_MAX_BODY_MB * 1024 * 1024,
            request_timeout: None,
        })
    }

    /// Validates the parsed command line into a config.
    pub fn from_cli(cli: &CliOptions) -> Result<Self, PhotoDiaryError> {
        let api_key = ApiKey::new(cli.google_api_key.as_deref())?;

        let model = cli.model.trim();
        if model.is_empty() {
            return Err(PhotoDiaryError::Configuration(
                "The model identifier must not be empty.".to_string(),
            ));
        }
        let frame_width = cli.frame_width;
        if frame_width > MAX_REQUEST_FRAME_WIDTH {
            return Err(PhotoDiaryError::Configuration(format!(
                "Frame width {frame_width} is larger than the limit of {MAX_REQUEST_FRAME_WIDTH} pixels."
            )));
        }

        Ok(Self {
            api_key,
            model: model.to_string(),
            api_base_url: parse_base_url(&cli.api_base_url)?,
            narrative_image_cap: cli.narrative_image_cap,
            frame_width,
            max_uploads: cli.max_uploads,
            max_body_bytes: cli.max_body_mb.saturating_mul(1024 * 1024),
            request_timeout: cli
                .request_timeout_secs
                .map(|secs| Duration::from_secs(secs.get())),
        })
    }
}

/// Parses the API base URL, making sure relative joins land under its path.
pub fn parse_base_url(value: &str) -> Result<Url, PhotoDiaryError> {
    let mut url = Url::parse(value.trim()).map_err(|err| {
        PhotoDiaryError::Configuration(format!("Invalid API base URL {value:?}: {err}"))
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
