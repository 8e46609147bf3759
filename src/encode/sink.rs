use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{GifloomError, GifloomResult};

/// `printf`-style pattern matching [`frame_file_name`], as understood by ffmpeg's image2
/// demuxer.
pub const FRAME_PATTERN: &str = "frame_%06d.png";

/// Zero-padded file name of composited frame `idx`, so lexical order equals numeric order.
pub fn frame_file_name(idx: FrameIndex) -> String {
    format!("frame_{:06}.png", idx.0)
}

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Number of frames that will be pushed.
    pub frame_count: u32,
}

/// Consumer of composited frames.
///
/// Ordering contract: `push_frame` is called in strictly increasing [`FrameIndex`] order.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> GifloomResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &RgbaImage) -> GifloomResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> GifloomResult<()>;
}

/// Writes every frame as a PNG into a directory, named with [`frame_file_name`].
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    written: u32,
}

impl PngSequenceSink {
    /// Sink writing into `dir` (created on `begin`).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cfg: None,
            last_idx: None,
            written: 0,
        }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Frames written so far.
    pub fn written(&self) -> u32 {
        self.written
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> GifloomResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            GifloomError::resource(format!(
                "failed to create frame dir '{}': {e}",
                self.dir.display()
            ))
        })?;
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.written = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RgbaImage) -> GifloomResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| GifloomError::resource("png sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(GifloomError::resource(
                "png sink received out-of-order frame index",
            ));
        }
        if frame.dimensions() != (cfg.width, cfg.height) {
            return Err(GifloomError::resource(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                cfg.width,
                cfg.height
            )));
        }

        let path = self.dir.join(frame_file_name(idx));
        frame
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| {
                GifloomError::resource(format!("failed to write '{}': {e}", path.display()))
            })?;
        self.last_idx = Some(idx);
        self.written += 1;
        Ok(())
    }

    fn end(&mut self) -> GifloomResult<()> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| GifloomError::resource("png sink not started"))?;
        if self.written != cfg.frame_count {
            return Err(GifloomError::resource(format!(
                "png sink wrote {} frames, expected {}",
                self.written, cfg.frame_count
            )));
        }
        Ok(())
    }
}

/// Keeps composited frames in memory instead of writing them out.
///
/// Holds the same ordering and size contract as [`PngSequenceSink`].
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, RgbaImage)>,
}

impl InMemorySink {
    /// Empty sink; call [`FrameSink::begin`] before pushing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Captured frames in timeline order.
    pub fn frames(&self) -> &[(FrameIndex, RgbaImage)] {
        &self.frames
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> GifloomResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RgbaImage) -> GifloomResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| GifloomError::resource("memory sink not started"))?;
        if let Some((last, _)) = self.frames.last()
            && idx.0 <= last.0
        {
            return Err(GifloomError::resource(format!(
                "memory sink got frame {} after frame {}",
                idx.0, last.0
            )));
        }
        if frame.dimensions() != (cfg.width, cfg.height) {
            return Err(GifloomError::resource(format!(
                "memory sink frame is {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                cfg.width,
                cfg.height
            )));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> GifloomResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
