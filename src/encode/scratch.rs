use std::path::{Path, PathBuf};

use crate::foundation::error::{GifloomError, GifloomResult};

/// Uniquely named temporary directory holding one job's intermediate files.
///
/// [`ScratchDir::close`] removes it and reports failure; dropping it removes it best-effort.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<tempfile::TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh `gifloom-*` directory under `root`, or under the system temp dir.
    pub fn create(root: Option<&Path>) -> GifloomResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("gifloom-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(|e| {
                    GifloomError::resource(format!(
                        "failed to create scratch root '{}': {e}",
                        root.display()
                    ))
                })?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| GifloomError::resource(format!("failed to create scratch dir: {e}")))?;

        let path = dir.path().to_path_buf();
        tracing::debug!(path = %path.display(), "scratch dir created");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `name` inside the directory.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Recursively remove the directory.
    pub fn close(mut self) -> GifloomResult<()> {
        match self.dir.take() {
            Some(dir) => dir.close().map_err(|e| {
                GifloomError::resource(format!(
                    "failed to remove scratch dir '{}': {e}",
                    self.path.display()
                ))
            }),
            None => Ok(()),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take()
            && let Err(e) = dir.close()
        {
            tracing::warn!(path = %self.path.display(), error = %e, "scratch cleanup failed");
        }
    }
}

/// Run `f` inside a fresh scratch directory and remove the directory before returning.
///
/// A cleanup failure turns a successful run into [`GifloomError::Resource`]. When `f` itself
/// failed, its error wins and the cleanup failure is only logged.
pub fn with_scratch<T>(
    root: Option<&Path>,
    f: impl FnOnce(&ScratchDir) -> GifloomResult<T>,
) -> GifloomResult<T> {
    let scratch = ScratchDir::create(root)?;
    let result = f(&scratch);
    match (result, scratch.close()) {
        (Ok(v), Ok(())) => Ok(v),
        (Ok(_), Err(cleanup)) => Err(cleanup),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup)) => {
            tracing::warn!(error = %cleanup, "scratch cleanup failed after job error");
            Err(e)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/scratch.rs"]
mod tests;
