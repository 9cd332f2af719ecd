//! Bridge between the live video element and the symbol decoder.
//!
//! Acquires the camera stream and, per tick, draws the current frame into a
//! hidden canvas, converts it to luma and runs it through `rxing`. A frame
//! without a readable symbol is the expected steady state, not an error.

use std::collections::HashMap;

use gloo::utils::window;
use rxing::Exceptions;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, HtmlCanvasElement, HtmlVideoElement, MediaStream,
    MediaStreamConstraints, MediaTrackConstraints, VideoFacingModeEnum,
};

use crate::error::CameraError;

/// Decoding above this edge length costs more than it helps.
const MAX_DECODE_EDGE: u32 = 800;
const IDEAL_WIDTH: u32 = 1280;
const IDEAL_HEIGHT: u32 = 720;
const FRAME_RATE: u32 = 20;

/// Camera selection hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraFacing {
    User,
    #[default]
    Environment,
}

impl CameraFacing {
    fn as_constraint(&self) -> VideoFacingModeEnum {
        match self {
            CameraFacing::User => VideoFacingModeEnum::User,
            CameraFacing::Environment => VideoFacingModeEnum::Environment,
        }
    }
}

/// Request camera access honoring the facing preference and an ideal
/// resolution target. Surfaces `UnsupportedBrowser` before any permission
/// prompt when the capture API is absent.
pub async fn open_camera(facing: CameraFacing) -> Result<MediaStream, CameraError> {
    let devices = window()
        .navigator()
        .media_devices()
        .map_err(|_| CameraError::UnsupportedBrowser)?;

    let mut constraints = MediaStreamConstraints::new();
    let mut video_constraints = MediaTrackConstraints::new();
    video_constraints
        .facing_mode(&facing.as_constraint().into())
        .width(&IDEAL_WIDTH.into())
        .height(&IDEAL_HEIGHT.into())
        .frame_rate(&FRAME_RATE.into());
    constraints.video(&video_constraints);

    let promise = devices
        .get_user_media_with_constraints(&constraints)
        .map_err(|err| CameraError::from_js(&err))?;
    let stream = JsFuture::from(promise)
        .await
        .map_err(|err| CameraError::from_js(&err))?;
    Ok(stream.unchecked_into())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Decoded(String),
    /// No symbol in this frame; keep scanning.
    NoSymbol,
}

/// Decode one frame of the running video. Canvas or context failures are
/// genuine errors; decoder rejections are per-frame noise.
pub fn decode_video_frame(
    video: &HtmlVideoElement,
    canvas: &HtmlCanvasElement,
) -> Result<DecodeOutcome, CameraError> {
    let (width, height) =
        clamped_resolution(video.video_width(), video.video_height(), MAX_DECODE_EDGE);
    if width == 0 || height == 0 {
        // First frames before metadata arrives.
        return Ok(DecodeOutcome::NoSymbol);
    }
    canvas.set_width(width);
    canvas.set_height(height);

    let context = canvas
        .get_context("2d")
        .map_err(|err| CameraError::from_js(&err))?
        .ok_or_else(|| CameraError::Unknown("canvas 2d context unavailable".to_string()))?
        .unchecked_into::<CanvasRenderingContext2d>();

    context
        .draw_image_with_html_video_element_and_dw_and_dh(
            video,
            0.0,
            0.0,
            width as f64,
            height as f64,
        )
        .map_err(|err| CameraError::from_js(&err))?;
    let image_data = context
        .get_image_data(0.0, 0.0, width as f64, height as f64)
        .map_err(|err| CameraError::from_js(&err))?;

    let luma = luma_from_rgba(image_data.data().as_ref());
    match decode_luma(luma, image_data.width(), image_data.height()) {
        Ok(result) => Ok(DecodeOutcome::Decoded(result.getText().to_string())),
        Err(err) if matches!(err, Exceptions::NotFoundException { .. }) => {
            Ok(DecodeOutcome::NoSymbol)
        }
        Err(err) => {
            log::debug!("frame rejected by decoder: {err}");
            Ok(DecodeOutcome::NoSymbol)
        }
    }
}

/// Stop every track of a stream. Safe on an already-stopped stream.
pub fn stop_tracks(stream: &MediaStream) {
    for track in stream.get_tracks().iter() {
        if let Ok(track) = track.dyn_into::<web_sys::MediaStreamTrack>() {
            track.stop();
        }
    }
}

fn decode_luma(
    data: Vec<u8>,
    width: u32,
    height: u32,
) -> Result<rxing::RXingResult, Exceptions> {
    let mut hints: rxing::DecodingHintDictionary = HashMap::new();
    hints.insert(
        rxing::DecodeHintType::TRY_HARDER,
        rxing::DecodeHintValue::TryHarder(true),
    );
    rxing::helpers::detect_in_luma_with_hints(data, width, height, None, &mut hints)
}

/// Convert canvas RGBA data into 8-bit luma.
fn luma_from_rgba(data: &[u8]) -> Vec<u8> {
    let mut luma_data = Vec::with_capacity(data.len() / 4);
    for src_pixel in data.chunks_exact(4) {
        let [red, green, blue, alpha] = src_pixel else {
            continue;
        };
        let pixel = if *alpha == 0 {
            // white, so we know its luminance is 255
            0xFF
        } else {
            // .299R + 0.587G + 0.114B (YUV/YIQ for PAL and NTSC),
            // (306*R) >> 10 is approximately equal to R*0.299, and so on.
            // 0x200 >> 10 is 0.5, it implements rounding.
            ((306 * (*red as u64) + 601 * (*green as u64) + 117 * (*blue as u64) + 0x200) >> 10)
                as u8
        };
        luma_data.push(pixel);
    }
    luma_data
}

/// Scale the video resolution down so neither edge exceeds `max_edge`,
/// preserving the aspect ratio.
fn clamped_resolution(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width <= max_edge && height <= max_edge {
        return (width, height);
    }
    let ratio = width as f64 / height as f64;
    if height > width {
        ((max_edge as f64 * ratio) as u32, max_edge)
    } else {
        (max_edge, (max_edge as f64 / ratio) as u32)
    }
}
