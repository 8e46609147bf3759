use crate::foundation::math::Fnv1a64;
use crate::job::config::{CompositeMode, JobConfig};
use crate::foundation::error::{GifloomError, GifloomResult};
use crate::job::spec::{JobInputs, JobSpec};
use crate::layout::placement::{Anchor, Sizing};

/// Content address of a composite, derived from everything that changes its bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(pub u64);

impl CacheKey {
    /// Digest of the fetched input bytes, the placements and the output-affecting config knobs.
    ///
    /// Sources are keyed by content, not by reference: the same path under two fetch roots
    /// yields two keys, and one file reached by two references yields one. Threading,
    /// verbosity, tool paths, timeouts and the scratch root do not change the output and are
    /// excluded.
    pub fn for_job(job: &JobSpec, inputs: &JobInputs, config: &JobConfig) -> GifloomResult<Self> {
        if inputs.layers.len() != job.layers.len()
            || inputs.background.is_some() != job.background.is_some()
        {
            return Err(GifloomError::cache(format!(
                "fetched inputs ({} layers, background: {}) do not match the job ({} layers, background: {})",
                inputs.layers.len(),
                inputs.background.is_some(),
                job.layers.len(),
                job.background.is_some()
            )));
        }

        let mut h = Fnv1a64::new_default();
        h.write_str("gifloom-composite-v2");

        h.write_u32(job.canvas.width);
        h.write_u32(job.canvas.height);
        match &inputs.background {
            Some(bg) => {
                h.write_u8(1);
                h.write_blob(bg);
            }
            None => h.write_u8(0),
        }

        h.write_u64(job.layers.len() as u64);
        for (layer, bytes) in job.layers.iter().zip(&inputs.layers) {
            h.write_blob(bytes);
            h.write_i64(layer.x);
            h.write_i64(layer.y);
            match layer.size {
                Sizing::Explicit { width, height } => {
                    h.write_u8(0);
                    h.write_u32(width);
                    h.write_u32(height);
                }
                Sizing::Multiplier { x, y } => {
                    h.write_u8(1);
                    h.write_u64(x.to_bits());
                    h.write_u64(y.to_bits());
                }
                Sizing::Native => h.write_u8(2),
            }
            h.write_u8(match layer.anchor {
                Anchor::TopLeft => 0,
                Anchor::BottomCenter => 1,
            });
        }

        let r = &config.reconcile;
        h.write_str(&format!("{:?}", r.strategy));
        h.write_u32(r.max_total_frames);
        h.write_u64(r.max_drift.to_bits());
        h.write_u8(u8::from(r.even_rounding));
        h.write_u32(r.frame_skip);

        let e = &config.encoder;
        h.write_u32(e.frame_delay_ms);
        h.write_u32(e.palette_size);
        h.write_u8(u8::from(e.reserve_transparent));
        h.write_u8(e.alpha_threshold);
        h.write_u32(u32::from(e.loop_count));
        match e.lossy {
            Some(level) => {
                h.write_u8(1);
                h.write_u32(level);
            }
            None => h.write_u8(0),
        }
        h.write_str(&format!("{:?}", e.disposal));
        h.write_u8(match config.mode {
            CompositeMode::Frames => 0,
            CompositeMode::FilterGraph => 1,
        });

        Ok(Self(h.finish()))
    }

    /// Object name, `composite-<16 hex digits>.gif`.
    pub fn file_name(&self) -> String {
        format!("composite-{:016x}.gif", self.0)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.file_name())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/key.rs"]
mod tests;
