use crate::foundation::core::FrameIndex;
use crate::foundation::error::{GifloomError, GifloomResult};
use crate::foundation::math::{lcm_checked, round_to_even};

/// How the shared timeline length is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStrategy {
    /// Smallest multiple of the longest loop that every other loop divides within
    /// `max_drift`, falling back to the longest multiple under the ceiling.
    #[default]
    BoundedDrift,
    /// Least common multiple of all (optionally even-rounded) loop lengths. Exact, but grows
    /// quickly for mutually prime counts, so it is opt-in.
    ExactLcm,
}

/// Period reconciliation knobs.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Search strategy.
    pub strategy: ReconcileStrategy,
    /// Hard ceiling on the shared timeline length, in native frames.
    pub max_total_frames: u32,
    /// Accepted loop-boundary error, as a fraction of one source loop. Must be in `(0, 0.5]`.
    pub max_drift: f64,
    /// Round every loop length up to an even count before reconciling.
    pub even_rounding: bool,
    /// Native frames advanced per output frame. Values above 1 shorten the output and speed up
    /// playback unless the frame delay is scaled by the same factor (the encoder does this).
    ///
    /// When the skip does not divide the shared length the output wraps early: with 10 native
    /// frames and a skip of 3 the output samples 0, 3, 6, 9 and then 0 again, so the seam is a
    /// one-frame step instead of three. Only the stride is preserved modulo the skip.
    pub frame_skip: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            strategy: ReconcileStrategy::BoundedDrift,
            max_total_frames: 240,
            max_drift: 0.1,
            even_rounding: true,
            frame_skip: 1,
        }
    }
}

impl ReconcileConfig {
    /// Reject knob values the reconciler cannot honour.
    pub fn validate(&self) -> GifloomResult<()> {
        if self.max_total_frames == 0 {
            return Err(GifloomError::input("max_total_frames must be > 0"));
        }
        if !self.max_drift.is_finite() || self.max_drift <= 0.0 || self.max_drift > 0.5 {
            return Err(GifloomError::input("max_drift must be in (0, 0.5]"));
        }
        if self.frame_skip == 0 {
            return Err(GifloomError::input("frame_skip must be > 0"));
        }
        Ok(())
    }
}

/// Per-source view of the reconciled timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct TrackTiming {
    /// Frame count of the source as decoded.
    pub native_count: u32,
    /// Loop length used for reconciliation (even-rounded when enabled).
    pub period: u32,
    /// Whole native loops needed to cover the timeline, rounded up (at least 1). This is the
    /// repeat count the filter-graph encoder uses.
    pub loop_multiplier: u32,
    /// Distance, in native frames, between the timeline end and the nearest loop boundary.
    pub end_drift: u32,
}

/// Result of period reconciliation.
///
/// Every source is sampled with `(f * frame_skip) mod native_count`, so each source is
/// periodic in its own native count and the sampled index is always in range.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Timeline {
    /// Shared timeline length in native frames (`T`).
    pub native_total: u32,
    /// Native frames advanced per output frame.
    pub frame_skip: u32,
    /// Number of frames in the output animation, `ceil(T / frame_skip)`.
    pub frame_count: u32,
    /// One entry per source, in input order.
    pub tracks: Vec<TrackTiming>,
}

impl Timeline {
    /// Native frame index of source `track` at output frame `frame`.
    pub fn sample(&self, track: usize, frame: FrameIndex) -> Option<u32> {
        let timing = self.tracks.get(track)?;
        let pos = u64::from(frame.0) * u64::from(self.frame_skip);
        Some((pos % u64::from(timing.native_count)) as u32)
    }

    /// Output frame indices in encoding order.
    pub fn frames(&self) -> impl Iterator<Item = FrameIndex> + use<> {
        (0..self.frame_count).map(FrameIndex)
    }
}

/// Compute the shared timeline for sources with the given native frame counts.
///
/// Pure function of its inputs. Fails only on contract violations (no sources, a zero count, or
/// invalid configuration).
pub fn reconcile(counts: &[u32], cfg: &ReconcileConfig) -> GifloomResult<Timeline> {
    cfg.validate()?;
    if counts.is_empty() {
        return Err(GifloomError::input("at least one source is required"));
    }
    if let Some(idx) = counts.iter().position(|&c| c == 0) {
        return Err(GifloomError::input(format!(
            "source {idx} has a native frame count of 0"
        )));
    }

    let ceiling = cfg.max_total_frames;
    let periods: Vec<u32> = counts
        .iter()
        .map(|&c| {
            if cfg.even_rounding && counts.len() > 1 {
                round_to_even(c)
            } else {
                c
            }
        })
        .collect();

    let wanted = if counts.len() == 1 {
        u64::from(counts[0])
    } else {
        match cfg.strategy {
            ReconcileStrategy::BoundedDrift => bounded_drift_total(&periods, ceiling, cfg.max_drift),
            ReconcileStrategy::ExactLcm => exact_lcm_total(&periods, ceiling),
        }
    };

    let native_total = if wanted > u64::from(ceiling) {
        tracing::warn!(
            wanted,
            ceiling,
            "shared timeline exceeds max_total_frames; clamping and accepting drift"
        );
        ceiling
    } else {
        wanted as u32
    };

    let tracks = counts
        .iter()
        .zip(&periods)
        .map(|(&native_count, &period)| {
            let rem = native_total % native_count;
            TrackTiming {
                native_count,
                period,
                loop_multiplier: native_total.div_ceil(native_count).max(1),
                end_drift: rem.min(native_count - rem),
            }
        })
        .collect();

    Ok(Timeline {
        native_total,
        frame_skip: cfg.frame_skip,
        frame_count: native_total.div_ceil(cfg.frame_skip).max(1),
        tracks,
    })
}

fn bounded_drift_total(periods: &[u32], ceiling: u32, max_drift: f64) -> u64 {
    let longest = u64::from(periods.iter().copied().max().unwrap_or(1));
    let ceiling = u64::from(ceiling);

    let mut k = 1u64;
    while k * longest <= ceiling {
        let total = k * longest;
        if periods.iter().all(|&p| within_drift(total, p, max_drift)) {
            return total;
        }
        k += 1;
    }

    tracing::debug!(longest, ceiling, "no multiple within drift; using longest fit");
    longest_fit(longest, ceiling)
}

fn exact_lcm_total(periods: &[u32], ceiling: u32) -> u64 {
    let wide: Vec<u64> = periods.iter().map(|&p| u64::from(p)).collect();
    let longest = wide.iter().copied().max().unwrap_or(1);
    match lcm_checked(&wide) {
        Some(total) if total <= u64::from(ceiling) => total,
        other => {
            tracing::warn!(
                lcm = ?other,
                ceiling,
                "exact lcm exceeds max_total_frames; falling back to longest fit"
            );
            longest_fit(longest, u64::from(ceiling))
        }
    }
}

/// Largest multiple of `longest` not above `ceiling`, never below one loop.
fn longest_fit(longest: u64, ceiling: u64) -> u64 {
    (ceiling / longest).max(1) * longest
}

fn within_drift(total: u64, period: u32, max_drift: f64) -> bool {
    let period = u64::from(period);
    let rem = total % period;
    if rem == 0 {
        return true;
    }
    let p = period as f64;
    (rem as f64) / p < max_drift || ((period - rem) as f64) / p < max_drift
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/reconcile.rs"]
mod tests;
