use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::foundation::error::{GifloomError, GifloomResult};

/// Reference to an input image: remote URL or local file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaRef {
    /// `http(s)://` URL.
    Url(String),
    /// Local path, resolved against the fetcher root when relative.
    Path(PathBuf),
}

impl MediaRef {
    /// Reject empty references and non-http URLs.
    pub fn validate(&self) -> GifloomResult<()> {
        match self {
            Self::Url(u) => {
                if !(u.starts_with("http://") || u.starts_with("https://")) {
                    return Err(GifloomError::input(format!(
                        "media url '{u}' must use http or https"
                    )));
                }
            }
            Self::Path(p) => {
                if p.as_os_str().is_empty() {
                    return Err(GifloomError::input("media path must be non-empty"));
                }
            }
        }
        Ok(())
    }

    /// Parse a CLI argument: anything with an http(s) scheme is a URL, the rest a path.
    pub fn parse(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            Self::Url(arg.to_string())
        } else {
            Self::Path(PathBuf::from(arg))
        }
    }
}

impl std::fmt::Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(u) => f.write_str(u),
            Self::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Retrieves the raw bytes behind a [`MediaRef`]. Failures are not retried.
pub trait Fetcher: Send + Sync {
    /// Fetch the full contents of `media`.
    fn fetch(&self, media: &MediaRef) -> GifloomResult<Vec<u8>>;
}

/// Options for [`HttpFetcher`].
#[derive(Clone, Debug)]
pub struct FetchOpts {
    /// Base directory for relative [`MediaRef::Path`] values.
    pub root: PathBuf,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl Default for FetchOpts {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Fetcher backed by a blocking HTTP client and the local filesystem.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    root: PathBuf,
}

impl HttpFetcher {
    /// Build a fetcher with the given timeouts and path root.
    pub fn new(opts: FetchOpts) -> GifloomResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(opts.connect_timeout)
            .timeout(opts.timeout)
            .build()
            .map_err(|e| GifloomError::input(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            root: opts.root,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Fetcher for HttpFetcher {
    #[tracing::instrument(skip(self), fields(media = %media))]
    fn fetch(&self, media: &MediaRef) -> GifloomResult<Vec<u8>> {
        match media {
            MediaRef::Url(url) => {
                let resp = self
                    .client
                    .get(url)
                    .send()
                    .map_err(|e| GifloomError::fetch(url, e.to_string()))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(GifloomError::fetch(url, format!("http status {status}")));
                }
                let bytes = resp
                    .bytes()
                    .map_err(|e| GifloomError::fetch(url, format!("reading body: {e}")))?;
                tracing::debug!(len = bytes.len(), "fetched");
                Ok(bytes.to_vec())
            }
            MediaRef::Path(path) => {
                let full = self.resolve(path);
                std::fs::read(&full)
                    .map_err(|e| GifloomError::fetch(full.display().to_string(), e.to_string()))
            }
        }
    }
}

/// In-memory fetcher for tests and embedding callers that already hold the bytes.
#[derive(Clone, Debug, Default)]
pub struct StaticFetcher {
    entries: HashMap<MediaRef, Arc<Vec<u8>>>,
}

impl StaticFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under `media`, replacing any previous entry.
    pub fn insert(&mut self, media: MediaRef, bytes: Vec<u8>) -> &mut Self {
        self.entries.insert(media, Arc::new(bytes));
        self
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, media: &MediaRef) -> GifloomResult<Vec<u8>> {
        self.entries
            .get(media)
            .map(|b| b.as_ref().clone())
            .ok_or_else(|| GifloomError::fetch(media.to_string(), "not registered"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/fetch.rs"]
mod tests;
