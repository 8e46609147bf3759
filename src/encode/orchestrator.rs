use std::ffi::OsString;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context as _;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};

use crate::encode::ffmpeg::{self, EncoderConfig};
use crate::encode::filter_graph::{OverlayPlan, overlay_graph};
use crate::encode::scratch::ScratchDir;
use crate::encode::sink::FRAME_PATTERN;
use crate::encode::tool::run_tool;
use crate::foundation::core::{Canvas, PixelBox};
use crate::foundation::error::{GifloomError, GifloomResult};
use crate::source::decode::AnimationSource;

const OUTPUT: &str = "output.gif";
const OPTIMIZED: &str = "optimized.gif";

/// Turn the PNG sequence in `frame_dir` into the final GIF bytes.
///
/// Runs inside `scratch`; the caller owns its cleanup.
pub fn encode_png_sequence(
    cfg: &EncoderConfig,
    scratch: &ScratchDir,
    frame_dir: &Path,
    delay_ms: u32,
) -> GifloomResult<Vec<u8>> {
    let out = scratch.join(OUTPUT);
    let args = ffmpeg::frames_args(cfg, &frame_dir.join(FRAME_PATTERN), delay_ms, &out);
    let t0 = Instant::now();
    invoke(cfg, "ffmpeg", &cfg.ffmpeg, &args)?;
    tracing::debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "png sequence encoded");
    finish(cfg, scratch, out)
}

/// One source fed to the single-pass overlay encode.
#[derive(Clone, Copy, Debug)]
pub struct LoopInput<'a> {
    /// Decoded source; its original bytes are staged when available.
    pub source: &'a AnimationSource,
    /// How many native loops make up the shared timeline.
    pub repeats: u32,
    /// Resolved draw box on the canvas.
    pub draw: PixelBox,
}

/// Inputs of [`encode_filter_graph`].
#[derive(Clone, Copy, Debug)]
pub struct OverlayJob<'a> {
    /// Output canvas.
    pub canvas: Canvas,
    /// Background still, scaled to the canvas by ffmpeg.
    pub background: Option<&'a RgbaImage>,
    /// Layers in draw order.
    pub inputs: &'a [LoopInput<'a>],
    /// Output frame count.
    pub frame_count: u32,
    /// Keep every `frame_skip`-th native frame.
    pub frame_skip: u32,
}

/// Stage every source, loop-extend each to the shared timeline and overlay them in one ffmpeg
/// pass.
///
/// Layers whose draw box is empty are left out of the graph.
pub fn encode_filter_graph(
    cfg: &EncoderConfig,
    scratch: &ScratchDir,
    job: &OverlayJob<'_>,
) -> GifloomResult<Vec<u8>> {
    let t0 = Instant::now();
    let mut loops = Vec::new();
    let mut boxes = Vec::new();
    for (i, input) in job.inputs.iter().enumerate() {
        if input.draw.is_empty() {
            tracing::warn!(layer = i, label = input.source.label(), "empty draw box, layer skipped");
            continue;
        }
        let staged = stage_source(scratch, i, input.source, cfg.frame_delay_ms)?;
        let looped = scratch.join(format!("loop_{i}.gif"));
        let args = ffmpeg::loop_args(cfg, &staged, input.repeats, &looped);
        invoke(cfg, "ffmpeg", &cfg.ffmpeg, &args)?;
        loops.push(looped);
        boxes.push(input.draw);
    }
    tracing::debug!(
        loops = loops.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "sources loop-extended"
    );

    let background = job
        .background
        .map(|bg| stage_background(scratch, bg))
        .transpose()?;

    let plan = OverlayPlan {
        canvas: job.canvas,
        has_background: background.is_some(),
        boxes: &boxes,
        frame_ms: cfg.effective_delay_ms(job.frame_skip),
        frame_skip: job.frame_skip,
    };
    let graph = overlay_graph(&plan, &cfg.palette_opts());
    let out = scratch.join(OUTPUT);
    let args = ffmpeg::overlay_args(
        cfg,
        background.as_deref(),
        &loops,
        &graph,
        job.frame_count,
        &out,
    );
    let t1 = Instant::now();
    invoke(cfg, "ffmpeg", &cfg.ffmpeg, &args)?;
    tracing::debug!(elapsed_ms = t1.elapsed().as_millis() as u64, "overlay encoded");
    finish(cfg, scratch, out)
}

/// Run the optional gifsicle pass over `encoded`, then read the final bytes.
fn finish(cfg: &EncoderConfig, scratch: &ScratchDir, encoded: PathBuf) -> GifloomResult<Vec<u8>> {
    let result = match cfg.lossy {
        Some(level) => {
            let optimized = scratch.join(OPTIMIZED);
            let args = ffmpeg::gifsicle_args(cfg, level, &encoded, &optimized);
            invoke(cfg, "gifsicle", &cfg.gifsicle, &args)?;
            optimized
        }
        None => encoded,
    };
    std::fs::read(&result)
        .with_context(|| format!("failed to read encoded output '{}'", result.display()))
        .map_err(GifloomError::from)
}

fn invoke(
    cfg: &EncoderConfig,
    tool: &str,
    program: &Path,
    args: &[OsString],
) -> GifloomResult<()> {
    let out = run_tool(tool, program, args, cfg.timeout())?;
    let diagnostics = String::from_utf8_lossy(&out.stderr);
    if !diagnostics.trim().is_empty() {
        tracing::warn!(
            tool,
            stdout_len = out.stdout.len(),
            stderr = %diagnostics.trim(),
            "tool reported diagnostics"
        );
    }
    Ok(())
}

fn stage_source(
    scratch: &ScratchDir,
    idx: usize,
    source: &AnimationSource,
    delay_ms: u32,
) -> GifloomResult<PathBuf> {
    let path = scratch.join(format!("src_{idx}.gif"));
    if let Some(bytes) = source.encoded() {
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to stage '{}'", path.display()))?;
        return Ok(path);
    }

    let file = File::create(&path).with_context(|| format!("failed to create '{}'", path.display()))?;
    let mut enc = GifEncoder::new(BufWriter::new(file));
    enc.set_repeat(Repeat::Infinite)
        .context("failed to set gif repeat")?;
    let blank = RgbaImage::new(source.width(), source.height());
    let frames = (0..source.frame_count()).map(|f| {
        let img = source
            .frame(f)
            .filter(|img| img.dimensions() == blank.dimensions())
            .unwrap_or(&blank);
        Frame::from_parts(img.clone(), 0, 0, Delay::from_numer_denom_ms(delay_ms, 1))
    });
    enc.encode_frames(frames)
        .with_context(|| format!("failed to encode staged source '{}'", source.label()))?;
    Ok(path)
}

fn stage_background(scratch: &ScratchDir, bg: &RgbaImage) -> GifloomResult<PathBuf> {
    let path = scratch.join("background.png");
    bg.save_with_format(&path, image::ImageFormat::Png)
        .with_context(|| format!("failed to stage background '{}'", path.display()))?;
    Ok(path)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/orchestrator.rs"]
mod tests;
