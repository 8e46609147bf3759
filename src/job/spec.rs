use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::core::Canvas;
use crate::foundation::error::{GifloomError, GifloomResult};
use crate::layout::placement::{Anchor, Placement, Sizing};
use crate::source::fetch::MediaRef;

/// One layer of a job: a source reference plus its placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Where the source animation comes from.
    pub source: MediaRef,
    /// Reference x coordinate.
    pub x: i64,
    /// Reference y coordinate.
    pub y: i64,
    /// Sizing mode.
    #[serde(default)]
    pub size: Sizing,
    /// Anchoring rule.
    #[serde(default)]
    pub anchor: Anchor,
}

impl LayerSpec {
    /// Placement part of the layer.
    pub fn placement(&self) -> Placement {
        Placement {
            x: self.x,
            y: self.y,
            size: self.size,
            anchor: self.anchor,
        }
    }
}

/// Raw bytes behind every [`MediaRef`] of a job, as fetched.
///
/// The cache key is derived from these, so two jobs that name the same path relative to
/// different roots never share an artifact.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobInputs {
    /// Layer sources, in layer order.
    pub layers: Vec<Vec<u8>>,
    /// Background still, when the job has one.
    pub background: Option<Vec<u8>>,
}

/// Serializable description of a compositing job, before anything is fetched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Output canvas.
    pub canvas: Canvas,
    /// Optional background still.
    #[serde(default)]
    pub background: Option<MediaRef>,
    /// Layers in draw order.
    pub layers: Vec<LayerSpec>,
}

impl JobSpec {
    /// Reject malformed jobs before any IO.
    pub fn validate(&self) -> GifloomResult<()> {
        self.canvas.validate()?;
        if self.layers.is_empty() {
            return Err(GifloomError::input("job needs at least one layer"));
        }
        if let Some(bg) = &self.background {
            bg.validate()?;
        }
        for (i, layer) in self.layers.iter().enumerate() {
            layer
                .source
                .validate()
                .and_then(|()| layer.placement().validate())
                .map_err(|e| GifloomError::input(format!("layer {i}: {e}")))?;
        }
        Ok(())
    }

    /// Parse and validate a JSON job file.
    pub fn load(path: &Path) -> GifloomResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read job file '{}'", path.display()))?;
        let job: Self = serde_json::from_str(&text)
            .map_err(|e| GifloomError::input(format!("invalid job '{}': {e}", path.display())))?;
        job.validate()?;
        Ok(job)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/spec.rs"]
mod tests;
