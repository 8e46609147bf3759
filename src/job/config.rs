use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::composite::compositor::CompositorThreading;
use crate::encode::ffmpeg::EncoderConfig;
use crate::foundation::core::Verbosity;
use crate::foundation::error::{GifloomError, GifloomResult};
use crate::timeline::reconcile::ReconcileConfig;

/// How composited frames reach the encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    /// Composite every frame in-process, then encode the PNG sequence.
    #[default]
    Frames,
    /// Loop-extend each source with ffmpeg and overlay them in a single filter graph.
    FilterGraph,
}

/// Everything that tunes one compositing job.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Period reconciliation.
    pub reconcile: ReconcileConfig,
    /// External encoder.
    pub encoder: EncoderConfig,
    /// In-process compositor parallelism.
    pub threading: CompositorThreading,
    /// Compositing strategy.
    pub mode: CompositeMode,
    /// Parent of the per-job scratch directory; the system temp dir when unset.
    pub scratch_root: Option<PathBuf>,
    /// Progress reporting.
    pub verbosity: Verbosity,
}

impl JobConfig {
    /// Validate every section.
    pub fn validate(&self) -> GifloomResult<()> {
        self.reconcile.validate()?;
        self.encoder.validate()?;
        self.threading.validate()?;
        Ok(())
    }

    /// Load a JSON config file; missing fields take their defaults.
    pub fn load(path: &Path) -> GifloomResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| GifloomError::input(format!("invalid config '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/config.rs"]
mod tests;
