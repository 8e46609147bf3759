pub(crate) mod config;
pub(crate) mod pipeline;
pub(crate) mod spec;
