use std::time::Instant;

use image::RgbaImage;
use image::imageops::{self, FilterType};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, FrameIndex, PixelBox, Verbosity};
use crate::foundation::error::{GifloomError, GifloomResult};
use crate::layout::placement::{Placement, resolve_placement};
use crate::source::decode::AnimationSource;
use crate::timeline::reconcile::Timeline;

/// One source and where it is drawn.
#[derive(Clone, Debug)]
pub struct Layer {
    /// Decoded source animation.
    pub source: AnimationSource,
    /// Placement on the canvas.
    pub placement: Placement,
}

impl Layer {
    /// Resolved draw box.
    pub fn draw_box(&self) -> PixelBox {
        resolve_placement(&self.placement, self.source.width(), self.source.height())
    }
}

/// A whole compositing job with every input already decoded.
#[derive(Clone, Debug)]
pub struct CompositeSpec {
    /// Output canvas.
    pub canvas: Canvas,
    /// Layers in draw order; later layers draw over earlier ones.
    pub layers: Vec<Layer>,
    /// Background still, scaled to the canvas. `None` composites onto transparency.
    pub background: Option<RgbaImage>,
}

impl CompositeSpec {
    /// Check the job invariants: positive canvas, at least one layer, drawable placements.
    pub fn validate(&self) -> GifloomResult<()> {
        self.canvas.validate()?;
        if self.layers.is_empty() {
            return Err(GifloomError::input("composite needs at least one layer"));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.source.frame_count() == 0 {
                return Err(GifloomError::input(format!(
                    "layer {i} ({}) has no frames",
                    layer.source.label()
                )));
            }
            layer
                .placement
                .validate()
                .map_err(|e| GifloomError::input(format!("layer {i}: {e}")))?;
        }
        if let Some(bg) = &self.background
            && (bg.width() == 0 || bg.height() == 0)
        {
            return Err(GifloomError::input("background image is empty"));
        }
        Ok(())
    }

    /// Number of layers decoded from a stream that broke off early.
    pub fn truncated_sources(&self) -> usize {
        self.layers.iter().filter(|l| l.source.truncated()).count()
    }

    /// Native frame count of every layer, in order.
    pub fn native_counts(&self) -> Vec<u32> {
        self.layers.iter().map(|l| l.source.frame_count()).collect()
    }
}

/// Compositor parallelism.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorThreading {
    /// Composite frames on a rayon pool.
    pub parallel: bool,
    /// Frames composited per batch before they are handed to the sink in order.
    pub chunk_size: usize,
    /// Pool size; `None` uses rayon's default.
    pub threads: Option<usize>,
}

impl Default for CompositorThreading {
    fn default() -> Self {
        Self {
            parallel: true,
            chunk_size: 16,
            threads: None,
        }
    }
}

impl CompositorThreading {
    /// Reject `threads == Some(0)`.
    pub fn validate(&self) -> GifloomResult<()> {
        if self.threads == Some(0) {
            return Err(GifloomError::input(
                "compositor threads must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

/// Counters reported by [`composite_into`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CompositeStats {
    /// Output frames produced.
    pub frames_total: u64,
    /// Layer draws skipped because the sampled native frame was missing or empty.
    pub frames_substituted: u64,
    /// Layers in the job.
    pub layers: usize,
    /// Layers whose source stream broke off and lost its trailing frames.
    pub truncated_sources: usize,
}

/// One layer with every native frame already resized to its draw box.
struct PreparedLayer {
    draw: PixelBox,
    /// `None` marks a native frame that could not be used.
    frames: Vec<Option<RgbaImage>>,
}

/// Background scaled to the canvas, or a fully transparent canvas.
pub fn base_canvas(canvas: Canvas, background: Option<&RgbaImage>) -> RgbaImage {
    match background {
        Some(bg) if bg.dimensions() == (canvas.width, canvas.height) => bg.clone(),
        Some(bg) => imageops::resize(bg, canvas.width, canvas.height, FilterType::Nearest),
        None => RgbaImage::new(canvas.width, canvas.height),
    }
}

fn prepare_frame(layer_idx: usize, layer: &Layer, draw: PixelBox, idx: u32) -> Option<RgbaImage> {
    let Some(frame) = layer.source.frame(idx) else {
        tracing::warn!(
            layer = layer_idx,
            label = layer.source.label(),
            frame = idx,
            "native frame missing or empty, drawing nothing"
        );
        return None;
    };
    if frame.dimensions() == (draw.width, draw.height) {
        return Some(frame.clone());
    }
    Some(imageops::resize(
        frame,
        draw.width,
        draw.height,
        FilterType::Nearest,
    ))
}

fn prepare_layers(spec: &CompositeSpec, pool: Option<&rayon::ThreadPool>) -> Vec<PreparedLayer> {
    spec.layers
        .iter()
        .enumerate()
        .map(|(i, layer)| {
            let draw = layer.draw_box();
            if draw.is_empty() {
                return PreparedLayer {
                    draw,
                    frames: Vec::new(),
                };
            }
            let count = layer.source.frame_count();
            let frames: Vec<Option<RgbaImage>> = match pool {
                Some(pool) => pool.install(|| {
                    (0..count)
                        .into_par_iter()
                        .map(|f| prepare_frame(i, layer, draw, f))
                        .collect()
                }),
                None => (0..count).map(|f| prepare_frame(i, layer, draw, f)).collect(),
            };
            PreparedLayer { draw, frames }
        })
        .collect()
}

/// Composite output frame `frame`. Returns the image and the number of layer draws skipped.
fn composite_frame(
    base: &RgbaImage,
    layers: &[PreparedLayer],
    timeline: &Timeline,
    frame: FrameIndex,
) -> (RgbaImage, u64) {
    let mut out = base.clone();
    let mut substituted = 0;
    for (i, layer) in layers.iter().enumerate() {
        if layer.draw.is_empty() {
            continue;
        }
        let sprite = timeline
            .sample(i, frame)
            .and_then(|idx| layer.frames.get(idx as usize))
            .and_then(Option::as_ref);
        match sprite {
            Some(sprite) => imageops::overlay(&mut out, sprite, layer.draw.x, layer.draw.y),
            None => substituted += 1,
        }
    }
    (out, substituted)
}

fn build_thread_pool(threads: Option<usize>) -> GifloomResult<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| GifloomError::resource(format!("failed to build rayon thread pool: {e}")))
}

/// Composite every frame of `timeline` and push it to `sink` in timeline order.
///
/// A missing or empty native frame never fails the job: that layer is left out of the
/// affected output frames and the skip is counted in [`CompositeStats::frames_substituted`].
pub fn composite_into(
    spec: &CompositeSpec,
    timeline: &Timeline,
    threading: &CompositorThreading,
    verbosity: Verbosity,
    sink: &mut dyn FrameSink,
) -> GifloomResult<CompositeStats> {
    spec.validate()?;
    threading.validate()?;
    if timeline.tracks.len() != spec.layers.len() {
        return Err(GifloomError::input(format!(
            "timeline has {} tracks for {} layers",
            timeline.tracks.len(),
            spec.layers.len()
        )));
    }

    let t0 = Instant::now();
    let pool = if threading.parallel {
        Some(build_thread_pool(threading.threads)?)
    } else {
        None
    };
    let base = base_canvas(spec.canvas, spec.background.as_ref());
    let layers = prepare_layers(spec, pool.as_ref());
    tracing::debug!(
        layers = layers.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "layers prepared"
    );

    let total = timeline.frame_count;
    sink.begin(SinkConfig {
        width: spec.canvas.width,
        height: spec.canvas.height,
        frame_count: total,
    })?;

    let mut stats = CompositeStats {
        layers: spec.layers.len(),
        truncated_sources: spec.truncated_sources(),
        ..CompositeStats::default()
    };
    let chunk_size = threading.chunk_size.max(1);
    let frames: Vec<FrameIndex> = timeline.frames().collect();
    for chunk in frames.chunks(chunk_size) {
        let rendered: Vec<(RgbaImage, u64)> = match &pool {
            Some(pool) => pool.install(|| {
                chunk
                    .par_iter()
                    .map(|&f| composite_frame(&base, &layers, timeline, f))
                    .collect()
            }),
            None => chunk
                .iter()
                .map(|&f| composite_frame(&base, &layers, timeline, f))
                .collect(),
        };
        for (&f, (img, substituted)) in chunk.iter().zip(rendered) {
            sink.push_frame(f, &img)?;
            stats.frames_total += 1;
            stats.frames_substituted += substituted;
            if verbosity == Verbosity::Progress {
                tracing::info!(frame = f.0 + 1, total, "composited frame");
            }
        }
    }
    sink.end()?;

    let elapsed_ms = t0.elapsed().as_millis() as u64;
    match verbosity {
        Verbosity::Quiet => tracing::debug!(?stats, elapsed_ms, "composite finished"),
        Verbosity::Normal | Verbosity::Progress => {
            tracing::info!(
                frames = stats.frames_total,
                substituted = stats.frames_substituted,
                truncated_sources = stats.truncated_sources,
                elapsed_ms,
                "composite finished"
            );
        }
    }
    Ok(stats)
}

#[cfg(test)]
#[path = "../../tests/unit/composite/compositor.rs"]
mod tests;
