use std::time::Instant;

use serde::Serialize;

use crate::cache::key::CacheKey;
use crate::cache::store::ArtifactStore;
use crate::composite::compositor::{CompositeSpec, CompositeStats, Layer, composite_into};
use crate::encode::orchestrator::{
    LoopInput, OverlayJob, encode_filter_graph, encode_png_sequence,
};
use crate::encode::scratch::{ScratchDir, with_scratch};
use crate::encode::sink::PngSequenceSink;
use crate::foundation::error::{GifloomError, GifloomResult};
use crate::job::config::{CompositeMode, JobConfig};
use crate::job::spec::{JobInputs, JobSpec};
use crate::source::decode::{SourceInfo, decode_animation, decode_still};
use crate::source::fetch::{Fetcher, MediaRef};
use crate::timeline::reconcile::{ReconcileConfig, Timeline, reconcile};

/// A finished composite.
#[derive(Clone, Debug)]
pub struct CompositeOutput {
    /// Encoded GIF.
    pub bytes: Vec<u8>,
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
    /// Output frame count.
    pub frame_count: u32,
    /// Timeline the output was built from.
    pub timeline: Timeline,
    /// Compositor counters.
    pub stats: CompositeStats,
}

/// Result of [`compose_cached`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CachedComposite {
    /// Object name in the store.
    pub key: String,
    /// Public URL of the artifact.
    pub url: String,
    /// `true` when the artifact already existed and nothing was rendered.
    pub hit: bool,
}

/// Fetch the raw bytes of every input of `job`.
#[tracing::instrument(skip_all, fields(layers = job.layers.len()))]
pub fn fetch_inputs(job: &JobSpec, fetcher: &dyn Fetcher) -> GifloomResult<JobInputs> {
    job.validate()?;
    let t0 = Instant::now();
    let layers = job
        .layers
        .iter()
        .map(|layer| fetcher.fetch(&layer.source))
        .collect::<GifloomResult<Vec<_>>>()?;
    let background = job
        .background
        .as_ref()
        .map(|bg| fetcher.fetch(bg))
        .transpose()?;
    tracing::debug!(
        bytes = layers.iter().map(Vec::len).sum::<usize>(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "inputs fetched"
    );
    Ok(JobInputs { layers, background })
}

/// Decode already fetched inputs into a [`CompositeSpec`].
///
/// Decode failures name the layer index and source.
pub fn decode_inputs(job: &JobSpec, inputs: JobInputs) -> GifloomResult<CompositeSpec> {
    if inputs.layers.len() != job.layers.len() {
        return Err(GifloomError::input(format!(
            "{} inputs fetched for {} layers",
            inputs.layers.len(),
            job.layers.len()
        )));
    }
    let mut layers = Vec::with_capacity(job.layers.len());
    for (i, (layer, bytes)) in job.layers.iter().zip(inputs.layers).enumerate() {
        let label = format!("layer {i} ({})", layer.source);
        let source = decode_animation(&label, bytes)?;
        layers.push(Layer {
            source,
            placement: layer.placement(),
        });
    }

    let background = match (&job.background, &inputs.background) {
        (Some(bg), Some(bytes)) => Some(decode_still(&format!("background ({bg})"), bytes)?),
        (None, _) => None,
        (Some(bg), None) => {
            return Err(GifloomError::input(format!(
                "background ({bg}) was not fetched"
            )));
        }
    };

    Ok(CompositeSpec {
        canvas: job.canvas,
        layers,
        background,
    })
}

/// Fetch and decode every input of `job`.
pub fn prepare(job: &JobSpec, fetcher: &dyn Fetcher) -> GifloomResult<CompositeSpec> {
    let inputs = fetch_inputs(job, fetcher)?;
    decode_inputs(job, inputs)
}

/// Reconcile the loop lengths of `spec`. Pure.
pub fn plan(spec: &CompositeSpec, cfg: &ReconcileConfig) -> GifloomResult<Timeline> {
    spec.validate()?;
    reconcile(&spec.native_counts(), cfg)
}

/// Composite and encode `spec`.
///
/// The scratch directory is removed before this returns, on success and on every failure.
#[tracing::instrument(skip_all, fields(mode = ?config.mode, layers = spec.layers.len()))]
pub fn compose(spec: &CompositeSpec, config: &JobConfig) -> GifloomResult<CompositeOutput> {
    config.validate()?;
    let timeline = plan(spec, &config.reconcile)?;
    tracing::info!(
        native_total = timeline.native_total,
        frames = timeline.frame_count,
        frame_skip = timeline.frame_skip,
        "timeline reconciled"
    );

    let t0 = Instant::now();
    let (bytes, stats) =
        with_scratch(config.scratch_root.as_deref(), |scratch| match config.mode {
            CompositeMode::Frames => compose_frames(spec, &timeline, config, scratch),
            CompositeMode::FilterGraph => compose_filter_graph(spec, &timeline, config, scratch),
        })?;
    tracing::info!(
        len = bytes.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "composite encoded"
    );

    Ok(CompositeOutput {
        bytes,
        width: spec.canvas.width,
        height: spec.canvas.height,
        frame_count: timeline.frame_count,
        timeline,
        stats,
    })
}

fn compose_frames(
    spec: &CompositeSpec,
    timeline: &Timeline,
    config: &JobConfig,
    scratch: &ScratchDir,
) -> GifloomResult<(Vec<u8>, CompositeStats)> {
    let frame_dir = scratch.join("frames");
    let mut sink = PngSequenceSink::new(&frame_dir);
    let stats = composite_into(
        spec,
        timeline,
        &config.threading,
        config.verbosity,
        &mut sink,
    )?;
    let delay = config.encoder.effective_delay_ms(timeline.frame_skip);
    let bytes = encode_png_sequence(&config.encoder, scratch, &frame_dir, delay)?;
    Ok((bytes, stats))
}

fn compose_filter_graph(
    spec: &CompositeSpec,
    timeline: &Timeline,
    config: &JobConfig,
    scratch: &ScratchDir,
) -> GifloomResult<(Vec<u8>, CompositeStats)> {
    let inputs: Vec<LoopInput<'_>> = spec
        .layers
        .iter()
        .zip(&timeline.tracks)
        .map(|(layer, track)| LoopInput {
            source: &layer.source,
            repeats: track.loop_multiplier,
            draw: layer.draw_box(),
        })
        .collect();
    let job = OverlayJob {
        canvas: spec.canvas,
        background: spec.background.as_ref(),
        inputs: &inputs,
        frame_count: timeline.frame_count,
        frame_skip: timeline.frame_skip,
    };
    let bytes = encode_filter_graph(&config.encoder, scratch, &job)?;
    let stats = CompositeStats {
        frames_total: u64::from(timeline.frame_count),
        frames_substituted: 0,
        layers: spec.layers.len(),
        truncated_sources: spec.truncated_sources(),
    };
    Ok((bytes, stats))
}

/// [`prepare`] then [`compose`].
pub fn compose_job(
    job: &JobSpec,
    config: &JobConfig,
    fetcher: &dyn Fetcher,
) -> GifloomResult<CompositeOutput> {
    config.validate()?;
    let spec = prepare(job, fetcher)?;
    compose(&spec, config)
}

/// Return the stored composite for `job`, rendering and storing it first on a miss.
///
/// Inputs are always fetched because the key is derived from their bytes; decoding and
/// encoding only happen on a miss.
#[tracing::instrument(skip_all)]
pub fn compose_cached(
    job: &JobSpec,
    config: &JobConfig,
    fetcher: &dyn Fetcher,
    store: &dyn ArtifactStore,
) -> GifloomResult<CachedComposite> {
    config.validate()?;
    let inputs = fetch_inputs(job, fetcher)?;
    let key = CacheKey::for_job(job, &inputs, config)?;
    if store.exists(&key)? {
        tracing::info!(key = %key, "cache hit");
        return Ok(CachedComposite {
            key: key.file_name(),
            url: store.public_url(&key),
            hit: true,
        });
    }

    tracing::info!(key = %key, "cache miss, composing");
    let spec = decode_inputs(job, inputs)?;
    let out = compose(&spec, config)?;
    store.put(&key, &out.bytes)?;
    Ok(CachedComposite {
        key: key.file_name(),
        url: store.public_url(&key),
        hit: false,
    })
}

/// Fetch and decode one source and report its frame count and native size.
pub fn probe(media: &MediaRef, fetcher: &dyn Fetcher) -> GifloomResult<SourceInfo> {
    media.validate()?;
    let bytes = fetcher.fetch(media)?;
    let source = decode_animation(&media.to_string(), bytes)?;
    Ok(source.info())
}

/// Short user-facing summary of a failed job.
pub fn failure_summary(err: &GifloomError) -> String {
    format!("composite failed at the {} stage", err.stage())
}

#[cfg(test)]
#[path = "../../tests/unit/job/pipeline.rs"]
mod tests;
