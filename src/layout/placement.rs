use crate::foundation::core::PixelBox;
use crate::foundation::error::{GifloomError, GifloomResult};

/// How large a source is drawn on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sizing {
    /// Fixed pixel size.
    Explicit {
        /// Target width.
        width: u32,
        /// Target height.
        height: u32,
    },
    /// Native size scaled per axis.
    Multiplier {
        /// Horizontal factor.
        x: f64,
        /// Vertical factor.
        y: f64,
    },
    /// Native size.
    #[default]
    Native,
}

/// Which point of the sprite the placement coordinate refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// `(x, y)` is the top-left corner.
    #[default]
    TopLeft,
    /// `(x, y)` is the bottom-center point (feet of a standing sprite).
    BottomCenter,
}

/// Where and how large one source is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    /// Reference x coordinate.
    pub x: i64,
    /// Reference y coordinate.
    pub y: i64,
    /// Sizing mode.
    #[serde(default)]
    pub size: Sizing,
    /// Anchoring rule applied to `(x, y)`.
    #[serde(default)]
    pub anchor: Anchor,
}

impl Placement {
    /// Reject sizes that cannot produce a drawable box.
    pub fn validate(&self) -> GifloomResult<()> {
        match self.size {
            Sizing::Explicit { width, height } if width == 0 || height == 0 => Err(
                GifloomError::input("explicit placement width/height must be > 0"),
            ),
            Sizing::Multiplier { x, y } if !(x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0) => {
                Err(GifloomError::input(
                    "placement multipliers must be finite and > 0",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Resolve the draw box of a source with native size `native_w x native_h`.
///
/// Sizing precedence is explicit size, then multiplier, then native size. With
/// [`Anchor::BottomCenter`] the origin becomes `(x - width / 2, y - height)`.
pub fn resolve_placement(placement: &Placement, native_w: u32, native_h: u32) -> PixelBox {
    let (width, height) = match placement.size {
        Sizing::Explicit { width, height } => (width, height),
        Sizing::Multiplier { x, y } => (scale_dim(native_w, x), scale_dim(native_h, y)),
        Sizing::Native => (native_w, native_h),
    };

    let (x, y) = match placement.anchor {
        Anchor::TopLeft => (placement.x, placement.y),
        Anchor::BottomCenter => (
            placement.x - i64::from(width / 2),
            placement.y - i64::from(height),
        ),
    };

    PixelBox {
        x,
        y,
        width,
        height,
    }
}

fn scale_dim(native: u32, factor: f64) -> u32 {
    let v = (f64::from(native) * factor).round();
    if v.is_finite() && v > 0.0 {
        v.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/placement.rs"]
mod tests;
