use crate::foundation::error::{GifloomError, GifloomResult};

/// Index of a frame on the shared output timeline.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u32);

/// Output canvas size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Build a canvas, rejecting zero dimensions.
    pub fn new(width: u32, height: u32) -> GifloomResult<Self> {
        let canvas = Self { width, height };
        canvas.validate()?;
        Ok(canvas)
    }

    /// Check that both dimensions are positive.
    pub fn validate(&self) -> GifloomResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GifloomError::input("canvas width/height must be > 0"));
        }
        Ok(())
    }
}

/// Pixel rectangle on the canvas. The origin may lie outside the canvas; drawing clips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct PixelBox {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Width in pixels (may be zero, which draws nothing).
    pub width: u32,
    /// Height in pixels (may be zero, which draws nothing).
    pub height: u32,
}

impl PixelBox {
    /// `true` when the box covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// How much progress the pipeline reports while compositing.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Warnings only.
    Quiet,
    /// One summary event per stage.
    #[default]
    Normal,
    /// An event for every composited frame.
    Progress,
}
