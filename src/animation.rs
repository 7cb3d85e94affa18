//! Animation assembly: scale every photo to one width and encode a looping GIF.
//!
//! The pipeline is a single synchronous call. It either returns a complete
//! artifact or an error; nothing partial is ever produced.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose;
use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{Delay, Frame, Rgba, RgbaImage};
use tracing::debug;

use crate::constants::{
    ANIMATION_FILE_NAME, ANIMATION_MEDIA_TYPE, GIF_ENCODER_SPEED, MAX_ANIMATION_PIXELS,
    MAX_FRAME_SIDE,
};
use crate::ingest::{ImageSequence, UploadedImage};

/// Ways the pipeline can fail.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// There were no images to animate.
    EmptySequence,
    /// Target width was zero or beyond what GIF can store.
    InvalidWidth(u32),
    /// Frame duration was zero, negative, not a number, or too long for GIF.
    InvalidDuration(f32),
    /// An input image has no pixels on one axis.
    ZeroDimension {
        /// The offending file.
        file_name: String,
        /// Its width.
        width: u32,
        /// Its height.
        height: u32,
    },
    /// A resized frame would be taller than GIF allows.
    FrameTooLarge {
        /// The offending file.
        file_name: String,
        /// Computed frame height.
        height: u64,
    },
    /// The frames together would need more pixels than one animation may use.
    TooManyPixels {
        /// Pixels the frames would need.
        pixels: u64,
        /// The budget.
        limit: u64,
    },
    /// The GIF encoder failed.
    Encode(String),
}

impl fmt::Display for AnimationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySequence => write!(f, "at least one photo is needed to make an animation"),
            Self::InvalidWidth(width) => write!(
                f,
                "frame width must be between 1 and {MAX_FRAME_SIDE} pixels, got {width}"
            ),
            Self::InvalidDuration(secs) => {
                write!(f, "frame duration must be a positive number of seconds, got {secs}")
            }
            Self::ZeroDimension {
                file_name,
                width,
                height,
            } => write!(
                f,
                "{file_name} is {width}x{height} pixels and can't be resized"
            ),
            Self::FrameTooLarge { file_name, height } => write!(
                f,
                "{file_name} would be {height} pixels tall after resizing, GIF frames are limited to {MAX_FRAME_SIDE}"
            ),
            Self::TooManyPixels { pixels, limit } => write!(
                f,
                "the animation would need {pixels} pixels, the limit is {limit}; use a smaller frame width or fewer photos"
            ),
            Self::Encode(cause) => write!(f, "failed to encode the GIF: {cause}"),
        }
    }
}

impl std::error::Error for AnimationError {}

/// How long each frame stays on screen. GIF counts in hundredths of a second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDuration {
    centiseconds: u16,
}

impl FrameDuration {
    /// Rounds to the nearest centisecond, never below one.
    pub fn from_secs_f32(secs: f32) -> Result<Self, AnimationError> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(AnimationError::InvalidDuration(secs));
        }
        let centiseconds = (f64::from(secs) * 100.0).round();
        if centiseconds > f64::from(u16::MAX) {
            return Err(AnimationError::InvalidDuration(secs));
        }
        let centiseconds = (centiseconds as u16).max(1);
        Ok(Self { centiseconds })
    }

    /// Duration in hundredths of a second, as stored in the GIF.
    pub fn centiseconds(self) -> u16 {
        self.centiseconds
    }

    /// Duration in milliseconds.
    pub fn millis(self) -> u32 {
        u32::from(self.centiseconds) * 10
    }

    fn delay(self) -> Delay {
        Delay::from_numer_denom_ms(self.millis(), 1)
    }
}

/// How often the animation repeats. Zero loops forever; otherwise the value is
/// written as the NETSCAPE2.0 repeat count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopCount(pub u16);

impl LoopCount {
    /// Loop forever.
    pub const INFINITE: LoopCount = LoopCount(0);

    /// True for the endless loop.
    pub fn is_infinite(self) -> bool {
        self.0 == 0
    }

    fn repeat(self) -> Repeat {
        if self.is_infinite() {
            Repeat::Infinite
        } else {
            Repeat::Finite(self.0)
        }
    }
}

/// One animation job: the photos plus how to play them.
#[derive(Debug, Clone)]
pub struct AnimationRequest {
    sequence: ImageSequence,
    frame_width: u32,
    frame_duration: FrameDuration,
    loop_count: LoopCount,
}

impl AnimationRequest {
    /// Validates the parameters. The sequence itself is checked when the pipeline runs.
    pub fn new(
        sequence: ImageSequence,
        frame_width: u32,
        frame_duration_secs: f32,
        loop_count: LoopCount,
    ) -> Result<Self, AnimationError> {
        if frame_width == 0 || frame_width > MAX_FRAME_SIDE {
            return Err(AnimationError::InvalidWidth(frame_width));
        }
        Ok(Self {
            sequence,
            frame_width,
            frame_duration: FrameDuration::from_secs_f32(frame_duration_secs)?,
            loop_count,
        })
    }

    /// The photos, in frame order.
    pub fn sequence(&self) -> &ImageSequence {
        &self.sequence
    }

    /// Target width of every frame.
    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    /// Display time of every frame.
    pub fn frame_duration(&self) -> FrameDuration {
        self.frame_duration
    }

    /// Loop directive.
    pub fn loop_count(&self) -> LoopCount {
        self.loop_count
    }
}

/// Fill for the bands around frames shorter than the canvas.
const LETTERBOX_FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// The finished GIF and how to offer it.
#[derive(Debug, Clone)]
pub struct AnimationArtifact {
    /// Encoded GIF.
    pub bytes: Vec<u8>,
    /// Suggested download name.
    pub file_name: &'static str,
    /// Media type of `bytes`.
    pub media_type: &'static str,
    /// Size of each resized photo, in input order.
    pub frame_sizes: Vec<(u32, u32)>,
    /// Size of the GIF canvas. Photos shorter than the tallest one are centred on it.
    pub canvas_size: (u32, u32),
    /// Display time of every frame.
    pub frame_duration: FrameDuration,
    /// Loop directive written to the file.
    pub loop_count: LoopCount,
}

impl AnimationArtifact {
    /// Number of frames in the file.
    pub fn frame_count(&self) -> usize {
        self.frame_sizes.len()
    }

    /// A `data:` URL for previewing inline.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Height that keeps the aspect ratio at `target_width`: `round(target_width * height / width)`,
/// rounding halves up. A result of zero becomes one so the frame still exists.
pub fn resized_height(width: u32, height: u32, target_width: u32) -> Option<u64> {
    if width == 0 || height == 0 {
        return None;
    }
    let (width, height, target_width) = (u64::from(width), u64::from(height), u64::from(target_width));
    Some(((2 * target_width * height + width) / (2 * width)).max(1))
}

fn check_pixels(pixels: u64) -> Result<(), AnimationError> {
    if pixels > MAX_ANIMATION_PIXELS {
        return Err(AnimationError::TooManyPixels {
            pixels,
            limit: MAX_ANIMATION_PIXELS,
        });
    }
    Ok(())
}

/// Height of `image` once scaled to `target_width`, checked against the GIF
/// side limit and the pixel budget before anything is allocated.
pub fn frame_height(image: &UploadedImage, target_width: u32) -> Result<u32, AnimationError> {
    if target_width == 0 || target_width > MAX_FRAME_SIDE {
        return Err(AnimationError::InvalidWidth(target_width));
    }
    let height = resized_height(image.width(), image.height(), target_width).ok_or_else(|| {
        AnimationError::ZeroDimension {
            file_name: image.file_name().to_string(),
            width: image.width(),
            height: image.height(),
        }
    })?;
    let height = u32::try_from(height)
        .ok()
        .filter(|height| *height <= MAX_FRAME_SIDE)
        .ok_or_else(|| AnimationError::FrameTooLarge {
            file_name: image.file_name().to_string(),
            height,
        })?;
    check_pixels(u64::from(target_width) * u64::from(height))?;
    Ok(height)
}

/// Scales one photo to `target_width`, keeping its aspect ratio.
pub fn resize_frame(image: &UploadedImage, target_width: u32) -> Result<RgbaImage, AnimationError> {
    let height = frame_height(image, target_width)?;
    Ok(image
        .image()
        .resize_exact(target_width, height, FilterType::Lanczos3)
        .to_rgba8())
}

/// Centres a frame vertically on a canvas of `canvas_height`.
fn letterbox(frame: RgbaImage, canvas_height: u32) -> RgbaImage {
    if frame.height() >= canvas_height {
        return frame;
    }
    let mut canvas = RgbaImage::from_pixel(frame.width(), canvas_height, LETTERBOX_FILL);
    let top = (canvas_height - frame.height()) / 2;
    image::imageops::replace(&mut canvas, &frame, 0, i64::from(top));
    canvas
}

/// Runs the whole pipeline: resize every photo, then encode them in order into one GIF.
pub fn assemble(request: &AnimationRequest) -> Result<AnimationArtifact, AnimationError> {
    let images = request.sequence.images();
    if images.is_empty() {
        return Err(AnimationError::EmptySequence);
    }

    // size every frame before allocating any of them
    let heights = images
        .iter()
        .map(|image| frame_height(image, request.frame_width))
        .collect::<Result<Vec<_>, _>>()?;
    // GIF frames share one logical screen, so mixed aspect ratios get letterboxed
    let canvas_height = heights.iter().copied().max().unwrap_or(1);
    check_pixels(
        u64::from(request.frame_width) * u64::from(canvas_height) * images.len() as u64,
    )?;

    let frames = images
        .iter()
        .zip(&heights)
        .map(|(image, height)| {
            image
                .image()
                .resize_exact(request.frame_width, *height, FilterType::Lanczos3)
                .to_rgba8()
        })
        .collect::<Vec<_>>();
    let frame_sizes = frames.iter().map(RgbaImage::dimensions).collect::<Vec<_>>();
    debug!(
        "Encoding {} frames at {}px wide, {}cs each",
        frames.len(),
        request.frame_width,
        request.frame_duration.centiseconds()
    );

    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut bytes, GIF_ENCODER_SPEED);
        encoder
            .set_repeat(request.loop_count.repeat())
            .map_err(|err| AnimationError::Encode(err.to_string()))?;
        let delay = request.frame_duration.delay();
        encoder
            .encode_frames(
                frames.into_iter().map(|buffer| {
                    Frame::from_parts(letterbox(buffer, canvas_height), 0, 0, delay)
                }),
            )
            .map_err(|err| AnimationError::Encode(err.to_string()))?;
        // the trailer is written when the encoder drops
    }

    Ok(AnimationArtifact {
        bytes,
        file_name: ANIMATION_FILE_NAME,
        media_type: ANIMATION_MEDIA_TYPE,
        frame_sizes,
        canvas_size: (request.frame_width, canvas_height),
        frame_duration: request.frame_duration,
        loop_count: request.loop_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{png_upload, solid};
    use image::AnimationDecoder;
    use image::codecs::gif::GifDecoder;
    use std::io::Cursor;

    fn decode_frames(bytes: &[u8]) -> Vec<Frame> {
        GifDecoder::new(Cursor::new(bytes))
            .expect("gif decoder")
            .into_frames()
            .collect_frames()
            .expect("decode frames")
    }

    /// Repeat count from the NETSCAPE2.0 block.
    fn netscape_loop_count(bytes: &[u8]) -> Option<u16> {
        let marker = b"NETSCAPE2.0";
        let start = bytes
            .windows(marker.len())
            .position(|window| window == marker)?;
        // sub-block: size 3, id 1, little-endian count
        let block = bytes.get(start + marker.len()..start + marker.len() + 4)?;
        assert_eq!(&block[..2], &[3, 1]);
        Some(u16::from_le_bytes([block[2], block[3]]))
    }

    fn frame_millis(frame: &Frame) -> u32 {
        let (numer, denom) = frame.delay().numer_denom_ms();
        numer / denom
    }

    #[test]
    fn resized_height_rounds() {
        assert_eq!(resized_height(800, 600, 400), Some(300));
        assert_eq!(resized_height(1200, 900, 400), Some(300));
        assert_eq!(resized_height(3, 2, 400), Some(267)); // 266.67
        assert_eq!(resized_height(4, 1, 2), Some(1)); // 0.5 rounds up
        assert_eq!(resized_height(300, 100, 400), Some(133)); // 133.33
        assert_eq!(resized_height(10_000, 1, 400), Some(1)); // 0.04 clamps to 1
        assert_eq!(resized_height(0, 600, 400), None);
        assert_eq!(resized_height(800, 0, 400), None);
    }

    #[test]
    fn resize_frame_matches_target_width() {
        for (width, height) in [(800, 600), (123, 457), (401, 400), (50, 50)] {
            let image = UploadedImage::from_image("frame.png", solid(width, height, [10, 20, 30]));
            let frame = resize_frame(&image, 400).expect("resize");
            let expected = resized_height(width, height, 400).expect("height");
            assert_eq!(frame.dimensions(), (400, expected as u32));
        }
    }

    #[test]
    fn zero_width_is_a_descriptive_error() {
        let image = UploadedImage::from_image("empty.png", solid(0, 10, [0, 0, 0]));
        let err = resize_frame(&image, 400).expect_err("should fail");
        assert_eq!(
            err,
            AnimationError::ZeroDimension {
                file_name: "empty.png".to_string(),
                width: 0,
                height: 10,
            }
        );
        assert!(err.to_string().contains("empty.png"));

        let request = AnimationRequest::new(
            ImageSequence::new(vec![png_upload("ok.png", 4, 4, [1, 1, 1]), image]),
            400,
            0.5,
            LoopCount::INFINITE,
        )
        .expect("request");
        assert!(matches!(
            assemble(&request),
            Err(AnimationError::ZeroDimension { .. })
        ));
    }

    #[test]
    fn oversized_width_is_refused_before_allocating() {
        let photo = || png_upload("wide.png", 4, 3, [9, 9, 9]);
        let request = AnimationRequest::new(
            ImageSequence::new(vec![photo()]),
            MAX_FRAME_SIDE,
            0.5,
            LoopCount::INFINITE,
        )
        .expect("request");
        assert_eq!(
            assemble(&request).expect_err("should fail"),
            AnimationError::TooManyPixels {
                pixels: u64::from(MAX_FRAME_SIDE) * 49_151,
                limit: MAX_ANIMATION_PIXELS,
            }
        );
        assert!(matches!(
            resize_frame(&photo(), MAX_FRAME_SIDE),
            Err(AnimationError::TooManyPixels { .. })
        ));
    }

    #[test]
    fn pixel_budget_counts_every_frame() {
        // one 4096x3072 frame fits, twenty of them don't
        let frames = |count: usize| {
            ImageSequence::new(
                (0..count)
                    .map(|idx| UploadedImage::from_image(format!("{idx}.png"), solid(4, 3, [1, 2, 3])))
                    .collect(),
            )
        };
        assert!(
            frame_height(&UploadedImage::from_image("one.png", solid(4, 3, [0, 0, 0])), 4096)
                .is_ok()
        );
        let request =
            AnimationRequest::new(frames(20), 4096, 0.5, LoopCount::INFINITE).expect("request");
        assert!(matches!(
            assemble(&request),
            Err(AnimationError::TooManyPixels { .. })
        ));
    }

    #[test]
    fn empty_sequence_is_refused() {
        let request =
            AnimationRequest::new(ImageSequence::default(), 400, 0.5, LoopCount::INFINITE)
                .expect("request");
        assert_eq!(
            assemble(&request).expect_err("should fail"),
            AnimationError::EmptySequence
        );
    }

    #[test]
    fn request_validation() {
        assert_eq!(
            AnimationRequest::new(ImageSequence::default(), 0, 0.5, LoopCount::INFINITE).err(),
            Some(AnimationError::InvalidWidth(0))
        );
        assert_eq!(
            AnimationRequest::new(ImageSequence::default(), 70_000, 0.5, LoopCount::INFINITE)
                .err(),
            Some(AnimationError::InvalidWidth(70_000))
        );
        assert!(matches!(
            AnimationRequest::new(ImageSequence::default(), 400, 0.0, LoopCount::INFINITE),
            Err(AnimationError::InvalidDuration(_))
        ));
        assert!(matches!(
            AnimationRequest::new(ImageSequence::default(), 400, -1.0, LoopCount::INFINITE),
            Err(AnimationError::InvalidDuration(_))
        ));
        assert!(matches!(
            AnimationRequest::new(ImageSequence::default(), 400, f32::NAN, LoopCount::INFINITE),
            Err(AnimationError::InvalidDuration(_))
        ));
    }

    #[test]
    fn frame_duration_rounds_to_centiseconds() {
        assert_eq!(FrameDuration::from_secs_f32(0.5).expect("d").centiseconds(), 50);
        assert_eq!(FrameDuration::from_secs_f32(0.2).expect("d").centiseconds(), 20);
        assert_eq!(FrameDuration::from_secs_f32(2.0).expect("d").millis(), 2000);
        assert_eq!(FrameDuration::from_secs_f32(0.001).expect("d").centiseconds(), 1);
        assert!(FrameDuration::from_secs_f32(1000.0).is_err());
    }

    #[test]
    fn three_photos_become_three_uniform_frames() {
        let sequence = ImageSequence::new(vec![
            png_upload("a.png", 800, 600, [255, 0, 0]),
            png_upload("b.png", 400, 300, [0, 255, 0]),
            png_upload("c.png", 1200, 900, [0, 0, 255]),
        ]);
        let request =
            AnimationRequest::new(sequence, 400, 0.5, LoopCount::INFINITE).expect("request");
        let artifact = assemble(&request).expect("assemble");

        assert_eq!(artifact.file_name, "class_memory.gif");
        assert_eq!(artifact.media_type, "image/gif");
        assert_eq!(artifact.frame_count(), 3);
        assert_eq!(artifact.frame_sizes, vec![(400, 300); 3]);
        assert_eq!(artifact.canvas_size, (400, 300));
        assert!(artifact.bytes.starts_with(b"GIF89a"));

        let frames = decode_frames(&artifact.bytes);
        assert_eq!(frames.len(), 3);
        for frame in &frames {
            assert_eq!(frame.buffer().dimensions(), (400, 300));
            assert_eq!(frame_millis(frame), 500);
        }
        assert_eq!(netscape_loop_count(&artifact.bytes), Some(0));

        // frames keep input order: red, green, blue
        let expected = [0usize, 1, 2];
        for (frame, channel) in frames.iter().zip(expected) {
            let pixel = frame.buffer().get_pixel(200, 150);
            assert!(pixel[channel] > 200, "pixel {pixel:?} channel {channel}");
            for other in (0..3).filter(|c| *c != channel) {
                assert!(pixel[other] < 60, "pixel {pixel:?} channel {other}");
            }
        }
    }

    #[test]
    fn finite_loop_count_and_duration_are_written() {
        let sequence = ImageSequence::new(vec![
            png_upload("a.png", 40, 20, [200, 10, 10]),
            png_upload("b.png", 20, 40, [10, 200, 10]),
        ]);
        let request = AnimationRequest::new(sequence, 40, 1.3, LoopCount(3)).expect("request");
        let artifact = assemble(&request).expect("assemble");
        assert_eq!(artifact.frame_sizes, vec![(40, 20), (40, 80)]);
        assert_eq!(artifact.canvas_size, (40, 80));
        assert_eq!(netscape_loop_count(&artifact.bytes), Some(3));
        let frames = decode_frames(&artifact.bytes);
        assert_eq!(frames.len(), 2);
        for frame in &frames {
            assert_eq!(frame.buffer().dimensions(), (40, 80));
            assert_eq!(frame_millis(frame), 1300);
        }
        // the short first frame sits in the middle of the canvas
        let top = frames[0].buffer().get_pixel(20, 2);
        let middle = frames[0].buffer().get_pixel(20, 40);
        assert!(top[0] < 60, "band {top:?}");
        assert!(middle[0] > 150, "photo {middle:?}");
    }

    #[test]
    fn single_photo_still_animates() {
        let sequence = ImageSequence::new(vec![png_upload("solo.png", 30, 30, [5, 5, 5])]);
        let request = AnimationRequest::new(sequence, 60, 0.2, LoopCount::INFINITE).expect("request");
        let artifact = assemble(&request).expect("assemble");
        assert_eq!(decode_frames(&artifact.bytes).len(), 1);
        assert_eq!(artifact.frame_sizes, vec![(60, 60)]);
    }

    #[test]
    fn output_is_deterministic() {
        let build = || {
            let sequence = ImageSequence::new(vec![
                png_upload("a.png", 64, 48, [250, 120, 10]),
                png_upload("b.png", 48, 64, [10, 120, 250]),
            ]);
            let request =
                AnimationRequest::new(sequence, 32, 0.7, LoopCount::INFINITE).expect("request");
            assemble(&request).expect("assemble").bytes
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn data_url_is_gif() {
        let sequence = ImageSequence::new(vec![png_upload("a.png", 8, 8, [1, 2, 3])]);
        let request = AnimationRequest::new(sequence, 8, 0.5, LoopCount::INFINITE).expect("request");
        let artifact = assemble(&request).expect("assemble");
        assert!(artifact.data_url().starts_with("data:image/gif;base64,R0lGODlh"));
    }
}
