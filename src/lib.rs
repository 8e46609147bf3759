//! gifloom composites several independently looping animations onto one canvas and encodes
//! the result as a single seamlessly looping GIF.
//!
//! The pipeline is:
//!
//! - Describe a job with a [`JobSpec`] and tune it with a [`JobConfig`]
//! - [`prepare`] fetches and decodes every input into a [`CompositeSpec`]
//! - [`plan`] reconciles the loop lengths into a shared [`Timeline`]
//! - [`compose`] composites and encodes inside a scratch directory that is always removed
//!
//! [`compose_cached`] memoizes finished composites in an [`ArtifactStore`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod cache;
pub(crate) mod composite;
/// Frame sinks, the typed ffmpeg filter graph and external encoder invocation.
pub mod encode;
pub(crate) mod job;
pub(crate) mod layout;
pub(crate) mod source;
pub(crate) mod timeline;

pub use crate::foundation::core::{Canvas, FrameIndex, PixelBox, Verbosity};
pub use crate::foundation::error::{GifloomError, GifloomResult};

pub use crate::cache::key::CacheKey;
pub use crate::cache::store::{ArtifactStore, DirArtifactStore, InMemoryArtifactStore};
pub use crate::composite::compositor::{
    CompositeSpec, CompositeStats, CompositorThreading, Layer, base_canvas, composite_into,
};
pub use crate::encode::ffmpeg::{Disposal, EncoderConfig};
pub use crate::encode::filter_graph::{FilterGraph, FilterOp, Label};
pub use crate::encode::sink::{FrameSink, InMemorySink, PngSequenceSink, SinkConfig};
pub use crate::encode::tool::is_tool_on_path;
pub use crate::job::config::{CompositeMode, JobConfig};
pub use crate::job::pipeline::{
    CachedComposite, CompositeOutput, compose, compose_cached, compose_job, decode_inputs,
    failure_summary, fetch_inputs, plan, prepare, probe,
};
pub use crate::job::spec::{JobInputs, JobSpec, LayerSpec};
pub use crate::layout::placement::{Anchor, Placement, Sizing, resolve_placement};
pub use crate::source::decode::{AnimationSource, SourceInfo, decode_animation, decode_still};
pub use crate::source::fetch::{FetchOpts, Fetcher, HttpFetcher, MediaRef, StaticFetcher};
pub use crate::timeline::reconcile::{
    ReconcileConfig, ReconcileStrategy, Timeline, TrackTiming, reconcile,
};

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
pub(crate) mod test_support;
