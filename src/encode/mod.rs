//! Encoding: frame sinks, the ffmpeg filter-graph model, external tool invocation and the
//! scratch directory that holds intermediate files.

/// `ffmpeg`/`gifsicle` configuration and argument builders.
pub mod ffmpeg;
/// Typed ffmpeg filter graph.
pub mod filter_graph;
/// End-to-end encode steps run inside a scratch directory.
pub mod orchestrator;
/// Scoped scratch directory.
pub mod scratch;
/// Frame sink trait and built-in sinks.
pub mod sink;
pub(crate) mod tool;
