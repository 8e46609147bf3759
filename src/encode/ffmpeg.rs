use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encode::filter_graph::{FilterGraph, Label, PaletteOpts};
use crate::foundation::error::{GifloomError, GifloomResult};

/// GIF frame disposal applied to the encoded output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposal {
    /// Leave the previous frame in place.
    None,
    /// Clear each frame's area to the background before drawing the next one.
    ///
    /// Required for transparent canvases, otherwise old sprite pixels show through.
    #[default]
    Background,
}

impl Disposal {
    fn gifsicle_name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Background => "background",
        }
    }
}

/// External encoder settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// `ffmpeg` executable.
    pub ffmpeg: PathBuf,
    /// `gifsicle` executable, only used when `lossy` is set.
    pub gifsicle: PathBuf,
    /// Delay between native source frames in milliseconds.
    ///
    /// The written delay is `frame_delay_ms * frame_skip`, so skipping frames shortens the
    /// output without changing playback speed.
    pub frame_delay_ms: u32,
    /// Palette size, 2..=256.
    pub palette_size: u32,
    /// Reserve one palette index for transparency.
    pub reserve_transparent: bool,
    /// Alpha below which a pixel becomes transparent.
    pub alpha_threshold: u8,
    /// GIF loop count; 0 loops forever.
    pub loop_count: u16,
    /// `gifsicle --lossy` level. `None` skips the gifsicle pass.
    pub lossy: Option<u32>,
    /// Disposal mode.
    ///
    /// ffmpeg picks the disposal of each frame itself. On the ffmpeg path this knob only
    /// toggles whole-frame updates (`-gifflags -offsetting-transdiff`); the mode is written
    /// into the file only when the gifsicle pass runs (`lossy` is set).
    pub disposal: Disposal,
    /// Kill any single tool invocation after this many seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            gifsicle: PathBuf::from("gifsicle"),
            frame_delay_ms: 50,
            palette_size: 256,
            reserve_transparent: true,
            alpha_threshold: 128,
            loop_count: 0,
            lossy: None,
            disposal: Disposal::Background,
            timeout_secs: None,
        }
    }
}

impl EncoderConfig {
    /// Reject values no encoder run could honour.
    pub fn validate(&self) -> GifloomResult<()> {
        if self.frame_delay_ms == 0 {
            return Err(GifloomError::input("frame_delay_ms must be > 0"));
        }
        if !(2..=256).contains(&self.palette_size) {
            return Err(GifloomError::input(format!(
                "palette_size must be in 2..=256, got {}",
                self.palette_size
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(GifloomError::input("timeout_secs must be > 0 when set"));
        }
        if self.ffmpeg.as_os_str().is_empty() {
            return Err(GifloomError::input("ffmpeg path must be non-empty"));
        }
        Ok(())
    }

    /// Palette knobs for filter graphs.
    pub fn palette_opts(&self) -> PaletteOpts {
        PaletteOpts {
            max_colors: self.palette_size,
            reserve_transparent: self.reserve_transparent,
            alpha_threshold: self.alpha_threshold,
        }
    }

    /// Output frame delay for a timeline sampled every `frame_skip` native frames.
    pub fn effective_delay_ms(&self, frame_skip: u32) -> u32 {
        self.frame_delay_ms.saturating_mul(frame_skip.max(1))
    }

    /// Per-invocation timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn head() -> Vec<OsString> {
    ["-hide_banner", "-loglevel", "error", "-nostdin", "-y"]
        .into_iter()
        .map(OsString::from)
        .collect()
}

fn tail(cfg: &EncoderConfig, out: &Path) -> Vec<OsString> {
    let mut args = Vec::new();
    if cfg.disposal == Disposal::Background {
        // Keep whole-frame updates so disposal-to-background clears stale pixels.
        args.push("-gifflags".into());
        args.push("-offsetting-transdiff".into());
    }
    args.push("-loop".into());
    args.push(cfg.loop_count.to_string().into());
    args.push("-f".into());
    args.push("gif".into());
    args.push(out.as_os_str().to_owned());
    args
}

fn palette_only(cfg: &EncoderConfig) -> String {
    let mut g = FilterGraph::new();
    g.push_palette_tail(Label::input(0), &cfg.palette_opts());
    g.render()
}

/// Encode a numbered PNG sequence (`pattern` is a `%06d`-style path) into one GIF.
pub fn frames_args(cfg: &EncoderConfig, pattern: &Path, delay_ms: u32, out: &Path) -> Vec<OsString> {
    let mut args = head();
    args.push("-framerate".into());
    args.push(format!("1000/{}", delay_ms.max(1)).into());
    args.push("-start_number".into());
    args.push("0".into());
    args.push("-i".into());
    args.push(pattern.as_os_str().to_owned());
    args.push("-filter_complex".into());
    args.push(palette_only(cfg).into());
    args.extend(tail(cfg, out));
    args
}

/// Repeat `input` `repeats` times back to back and re-quantise it.
pub fn loop_args(cfg: &EncoderConfig, input: &Path, repeats: u32, out: &Path) -> Vec<OsString> {
    let mut args = head();
    args.push("-stream_loop".into());
    args.push(repeats.saturating_sub(1).to_string().into());
    args.push("-i".into());
    args.push(input.as_os_str().to_owned());
    args.push("-filter_complex".into());
    args.push(palette_only(cfg).into());
    args.extend(tail(cfg, out));
    args
}

/// Single-pass overlay of `loops` on an optional still `background` through `graph`, capped
/// at `frame_count` output frames.
pub fn overlay_args(
    cfg: &EncoderConfig,
    background: Option<&Path>,
    loops: &[PathBuf],
    graph: &FilterGraph,
    frame_count: u32,
    out: &Path,
) -> Vec<OsString> {
    let mut args = head();
    if let Some(bg) = background {
        args.push("-loop".into());
        args.push("1".into());
        args.push("-i".into());
        args.push(bg.as_os_str().to_owned());
    }
    for l in loops {
        args.push("-i".into());
        args.push(l.as_os_str().to_owned());
    }
    args.push("-filter_complex".into());
    args.push(graph.render().into());
    args.push("-frames:v".into());
    args.push(frame_count.to_string().into());
    args.extend(tail(cfg, out));
    args
}

/// `gifsicle` lossy optimisation of `input` into `out`.
pub fn gifsicle_args(cfg: &EncoderConfig, lossy: u32, input: &Path, out: &Path) -> Vec<OsString> {
    let loopcount = if cfg.loop_count == 0 {
        "--loopcount=forever".to_string()
    } else {
        format!("--loopcount={}", cfg.loop_count)
    };
    vec![
        "-O3".into(),
        format!("--lossy={lossy}").into(),
        format!("--colors={}", cfg.palette_size).into(),
        loopcount.into(),
        format!("--disposal={}", cfg.disposal.gifsicle_name()).into(),
        input.as_os_str().to_owned(),
        "-o".into(),
        out.as_os_str().to_owned(),
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
