//! CLI parser
use clap::Parser;
use clap::builder::RangedU64ValueParser;
use std::num::{NonZeroU16, NonZeroU64};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_FRAME_WIDTH, DEFAULT_MAX_BODY_MB, DEFAULT_MAX_UPLOADS,
    DEFAULT_MODEL, DEFAULT_NARRATIVE_IMAGE_CAP,
};

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "PHOTO_DIARY_DEBUG")]
    /// Enable debug logging. Env: PHOTO_DIARY_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "PHOTO_DIARY_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: PHOTO_DIARY_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "PHOTO_DIARY_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: PHOTO_DIARY_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    /// Key for the Generative Language API. Without it only an error page is served.
    /// Env: GOOGLE_API_KEY
    pub google_api_key: Option<String>,

    #[clap(long, default_value = DEFAULT_MODEL, env = "PHOTO_DIARY_MODEL")]
    /// Model identifier, defaults to `gemini-1.5-flash`.
    /// Env: PHOTO_DIARY_MODEL
    pub model: String,

    #[clap(long, default_value = DEFAULT_API_BASE_URL, env = "PHOTO_DIARY_API_BASE_URL")]
    /// Base URL of the Generative Language API.
    /// Env: PHOTO_DIARY_API_BASE_URL
    pub api_base_url: String,

    #[clap(
        long,
        default_value_t = DEFAULT_NARRATIVE_IMAGE_CAP,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..),
        env = "PHOTO_DIARY_NARRATIVE_IMAGE_CAP"
    )]
    /// How many album photos are sent for the class letter, earliest first.
    /// Env: PHOTO_DIARY_NARRATIVE_IMAGE_CAP
    pub narrative_image_cap: usize,

    #[clap(
        long,
        default_value_t = DEFAULT_FRAME_WIDTH,
        value_parser = clap::value_parser!(u32).range(1..),
        env = "PHOTO_DIARY_FRAME_WIDTH"
    )]
    /// Default width of animation frames, in pixels.
    /// Env: PHOTO_DIARY_FRAME_WIDTH
    pub frame_width: u32,

    #[clap(
        long,
        default_value_t = DEFAULT_MAX_UPLOADS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..),
        env = "PHOTO_DIARY_MAX_UPLOADS"
    )]
    /// Maximum photos per album submission.
    /// Env: PHOTO_DIARY_MAX_UPLOADS
    pub max_uploads: usize,

    #[clap(
        long,
        default_value_t = DEFAULT_MAX_BODY_MB,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..),
        env = "PHOTO_DIARY_MAX_BODY_MB"
    )]
    /// Request body limit in MiB.
    /// Env: PHOTO_DIARY_MAX_BODY_MB
    pub max_body_mb: usize,

    #[clap(long, env = "PHOTO_DIARY_REQUEST_TIMEOUT_SECS")]
    /// Timeout for provider calls, in seconds. Unset means reqwest's default (none).
    /// Env: PHOTO_DIARY_REQUEST_TIMEOUT_SECS
    pub request_timeout_secs: Option<NonZeroU64>,
}
