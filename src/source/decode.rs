use std::io::Cursor;
use std::sync::Arc;

use image::{AnimationDecoder, ImageFormat, RgbaImage, codecs::gif::GifDecoder};

use crate::foundation::error::{GifloomError, GifloomResult};

/// One independently looping input, decoded to straight-alpha RGBA frames.
///
/// Immutable once built. Every non-empty frame has the native dimensions; a frame with a zero
/// dimension is kept in place (so indices stay aligned) and treated as blank when drawn.
#[derive(Clone, Debug)]
pub struct AnimationSource {
    label: String,
    width: u32,
    height: u32,
    frames: Vec<RgbaImage>,
    delays_ms: Vec<u32>,
    encoded: Option<Arc<Vec<u8>>>,
    truncated: bool,
}

/// Summary of a decoded source, as reported by `probe`.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SourceInfo {
    /// Source label.
    pub label: String,
    /// Native frame count.
    pub frame_count: u32,
    /// Native width.
    pub width: u32,
    /// Native height.
    pub height: u32,
    /// Mean per-frame delay, when the encoding carried timing.
    pub mean_delay_ms: Option<u32>,
    /// The stream broke off after `frame_count` frames.
    pub truncated: bool,
}

impl AnimationSource {
    /// Build a source from already decoded frames.
    pub fn from_frames(label: impl Into<String>, frames: Vec<RgbaImage>) -> GifloomResult<Self> {
        let label = label.into();
        let (width, height) = native_dimensions(&label, &frames)?;
        Ok(Self {
            label,
            width,
            height,
            frames,
            delays_ms: Vec::new(),
            encoded: None,
            truncated: false,
        })
    }

    /// Human-readable identity used in logs and errors.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Native frame count (always >= 1).
    pub fn frame_count(&self) -> u32 {
        self.frames.len() as u32
    }

    /// Native width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Native height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Native frame `idx`, or `None` when it is out of range or has no pixels.
    pub fn frame(&self, idx: u32) -> Option<&RgbaImage> {
        self.frames
            .get(idx as usize)
            .filter(|f| f.width() > 0 && f.height() > 0)
    }

    /// `true` when the encoded stream broke off and only its leading frames were kept.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Original encoded bytes, when the source was decoded from a complete file.
    pub fn encoded(&self) -> Option<&[u8]> {
        self.encoded.as_deref().map(Vec::as_slice)
    }

    /// Summary used by `probe` and the plan output.
    pub fn info(&self) -> SourceInfo {
        let mean_delay_ms = if self.delays_ms.is_empty() {
            None
        } else {
            let sum: u64 = self.delays_ms.iter().map(|&d| u64::from(d)).sum();
            Some((sum / self.delays_ms.len() as u64) as u32)
        };
        SourceInfo {
            label: self.label.clone(),
            frame_count: self.frame_count(),
            width: self.width,
            height: self.height,
            mean_delay_ms,
            truncated: self.truncated,
        }
    }
}

fn native_dimensions(label: &str, frames: &[RgbaImage]) -> GifloomResult<(u32, u32)> {
    let mut dims = None;
    for (idx, f) in frames.iter().enumerate() {
        if f.width() == 0 || f.height() == 0 {
            continue;
        }
        match dims {
            None => dims = Some(f.dimensions()),
            Some(d) if d != f.dimensions() => {
                return Err(GifloomError::decode(
                    label,
                    format!(
                        "frame {idx} is {}x{}, expected {}x{}",
                        f.width(),
                        f.height(),
                        d.0,
                        d.1
                    ),
                ));
            }
            Some(_) => {}
        }
    }
    dims.ok_or_else(|| GifloomError::decode(label, "source has no non-empty frames"))
}

/// Decode an animated GIF (or a single still image, as a one-frame loop).
#[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decode_animation(label: &str, bytes: Vec<u8>) -> GifloomResult<AnimationSource> {
    let format = image::guess_format(&bytes)
        .map_err(|e| GifloomError::decode(label, format!("unrecognised image data: {e}")))?;

    let mut truncated = false;
    let (frames, delays_ms) = if format == ImageFormat::Gif {
        let decoder = GifDecoder::new(Cursor::new(bytes.as_slice()))
            .map_err(|e| GifloomError::decode(label, format!("gif header: {e}")))?;
        let mut frames = Vec::new();
        let mut delays = Vec::new();
        for next in decoder.into_frames() {
            match next {
                Ok(frame) => {
                    let (num, den) = frame.delay().numer_denom_ms();
                    delays.push(if den == 0 { 0 } else { num / den });
                    frames.push(frame.into_buffer());
                }
                Err(e) if frames.is_empty() => {
                    return Err(GifloomError::decode(label, format!("gif frames: {e}")));
                }
                Err(e) => {
                    tracing::warn!(
                        label,
                        kept = frames.len(),
                        error = %e,
                        "gif stream ended early, keeping the frames decoded so far"
                    );
                    truncated = true;
                    break;
                }
            }
        }
        (frames, delays)
    } else {
        let img = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| GifloomError::decode(label, format!("{format:?}: {e}")))?;
        (vec![img.to_rgba8()], Vec::new())
    };

    if frames.is_empty() {
        return Err(GifloomError::decode(label, "animation contains no frames"));
    }

    let (width, height) = native_dimensions(label, &frames)?;
    tracing::debug!(frames = frames.len(), width, height, truncated, "decoded source");
    Ok(AnimationSource {
        label: label.to_string(),
        width,
        height,
        frames,
        delays_ms,
        encoded: (!truncated).then(|| Arc::new(bytes)),
        truncated,
    })
}

/// Decode a still image (used for backgrounds).
pub fn decode_still(label: &str, bytes: &[u8]) -> GifloomResult<RgbaImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| GifloomError::decode(label, format!("still image: {e}")))?;
    Ok(img.to_rgba8())
}

#[cfg(test)]
#[path = "../../tests/unit/source/decode.rs"]
mod tests;
