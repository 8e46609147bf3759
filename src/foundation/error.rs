/// Convenience result type used across gifloom.
pub type GifloomResult<T> = Result<T, GifloomError>;

/// Top-level error taxonomy for a compositing job.
///
/// Single-frame problems (a missing or empty native frame) are not represented here: they are
/// recovered inside the compositor and only show up in [`crate::CompositeStats`].
#[derive(thiserror::Error, Debug)]
pub enum GifloomError {
    /// Malformed job description or configuration, rejected before any IO.
    #[error("input error: {0}")]
    Input(String),

    /// Remote or local retrieval of a source failed.
    #[error("fetch error for '{url}': {message}")]
    Fetch {
        /// URL or path that was being fetched.
        url: String,
        /// Failure description.
        message: String,
    },

    /// A source could not be decoded as an animation.
    #[error("decode error for {layer}: {message}")]
    Decode {
        /// Source identity (layer index and label).
        layer: String,
        /// Failure description.
        message: String,
    },

    /// An external tool exited unsuccessfully.
    #[error("{tool} exited with status {status}: {stderr}")]
    Encode {
        /// Tool name (`ffmpeg`, `gifsicle`).
        tool: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Verbatim diagnostic output of the tool.
        stderr: String,
    },

    /// An external tool exceeded its configured time budget and was killed.
    #[error("{tool} timed out after {seconds:.1}s")]
    Timeout {
        /// Tool name.
        tool: String,
        /// Budget that was exceeded.
        seconds: f64,
    },

    /// Scratch directory could not be created or removed.
    #[error("resource error: {0}")]
    Resource(String),

    /// Artifact store failure.
    #[error("cache error: {0}")]
    Cache(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GifloomError {
    /// Build a [`GifloomError::Input`] value.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Build a [`GifloomError::Fetch`] value.
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Build a [`GifloomError::Decode`] value.
    pub fn decode(layer: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            layer: layer.into(),
            message: msg.into(),
        }
    }

    /// Build a [`GifloomError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`GifloomError::Cache`] value.
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Short pipeline stage name, suitable for a user-facing "job failed" message.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Fetch { .. } => "fetch",
            Self::Decode { .. } => "decode",
            Self::Encode { .. } | Self::Timeout { .. } => "encode",
            Self::Resource(_) => "resource",
            Self::Cache(_) => "cache",
            Self::Other(_) => "internal",
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
