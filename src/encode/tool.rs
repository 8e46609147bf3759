use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::foundation::error::{GifloomError, GifloomResult};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured output of a successful tool run.
#[derive(Debug, Default)]
pub(crate) struct ToolOutput {
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
}

/// Return `true` when `program -version` can be run.
pub fn is_tool_on_path(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run `program args...` to completion.
///
/// Non-zero exit becomes [`GifloomError::Encode`] with stderr attached verbatim. When `timeout`
/// elapses the child is killed and [`GifloomError::Timeout`] is returned. Never retried.
pub(crate) fn run_tool(
    tool: &str,
    program: &Path,
    args: &[OsString],
    timeout: Option<Duration>,
) -> GifloomResult<ToolOutput> {
    tracing::debug!(tool, program = %program.display(), ?args, "running external tool");
    let started = Instant::now();

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| GifloomError::Encode {
            tool: tool.to_string(),
            status: "not started".to_string(),
            stderr: format!("failed to spawn '{}': {e}", program.display()),
        })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match timeout {
        None => child
            .wait()
            .map_err(|e| GifloomError::resource(format!("failed to wait for {tool}: {e}")))?,
        Some(limit) => loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= limit => {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = join(tool, stdout);
                    let _ = join(tool, stderr);
                    return Err(GifloomError::Timeout {
                        tool: tool.to_string(),
                        seconds: limit.as_secs_f64(),
                    });
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(GifloomError::resource(format!(
                        "failed to poll {tool}: {e}"
                    )));
                }
            }
        },
    };

    let out = ToolOutput {
        stdout: join(tool, stdout)?,
        stderr: join(tool, stderr)?,
    };
    tracing::debug!(tool, %status, elapsed_ms = started.elapsed().as_millis() as u64, "tool finished");

    if !status.success() {
        return Err(GifloomError::Encode {
            tool: tool.to_string(),
            status: status.to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }
    Ok(out)
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        pipe.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
}

fn join(
    tool: &str,
    handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
) -> GifloomResult<Vec<u8>> {
    match handle {
        Some(h) => h
            .join()
            .map_err(|_| GifloomError::resource(format!("{tool} output drain thread panicked")))?
            .map_err(|e| GifloomError::resource(format!("{tool} output read failed: {e}"))),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/tool.rs"]
mod tests;
