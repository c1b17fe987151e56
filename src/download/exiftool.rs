//! Metadata embedding through the external `exiftool` binary.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Writes title, description and keywords from a sidecar into a file.
///
/// The returned string is the tool's combined report; anything other than
/// whitespace means the embedding failed.
#[async_trait]
pub trait MetadataEmbedder: Send + Sync {
    async fn embed(&self, target: &Path, sidecar: &Path) -> io::Result<String>;
}

/// `exiftool` invoked as
/// `-q -q -overwrite_original "-FileModifyDate<DateTimeOriginal" -j=<sidecar> <target>`.
#[derive(Debug, Clone)]
pub struct ExifTool {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl ExifTool {
    pub fn new(binary: PathBuf) -> Self {
        Self {
            binary,
            timeout: None,
        }
    }

    /// Find `exiftool` on `PATH`.
    pub fn locate() -> Option<Self> {
        which::which("exiftool").ok().map(Self::new)
    }

    /// Kill the tool and report failure if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, target: &Path, sidecar: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-q")
            .arg("-q")
            .arg("-overwrite_original")
            .arg("-FileModifyDate<DateTimeOriginal")
            .arg(format!("-j={}", sidecar.display()))
            .arg(target);
        cmd
    }
}

#[async_trait]
impl MetadataEmbedder for ExifTool {
    async fn embed(&self, target: &Path, sidecar: &Path) -> io::Result<String> {
        tracing::debug!(
            binary = %self.binary.display(),
            target = %target.display(),
            "Running exiftool"
        );
        run_captured(self.command(target, sidecar), self.timeout).await
    }
}

/// Run `cmd` without a console window and return stdout followed by
/// stderr.
///
/// Both pipes are drained by their own task while the parent waits, so a
/// child that fills one pipe cannot stall on it. With a `timeout` the child
/// is killed when it expires and `ErrorKind::TimedOut` is returned.
pub async fn run_captured(mut cmd: Command, timeout: Option<Duration>) -> io::Result<String> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = cmd.spawn()?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr was not captured"))?;

    let out_reader = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).await.map(|_| buf)
    });
    let err_reader = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr.read_to_end(&mut buf).await.map(|_| buf)
    });

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                let _ = child.kill().await;
                out_reader.abort();
                err_reader.abort();
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("timed out after {}s", limit.as_secs()),
                ));
            }
        },
        None => child.wait().await?,
    };

    let out = out_reader.await.map_err(io::Error::other)??;
    let err = err_reader.await.map_err(io::Error::other)??;
    tracing::debug!(?status, stdout = out.len(), stderr = err.len(), "Tool exited");

    let mut report = String::from_utf8_lossy(&out).into_owned();
    report.push_str(&String::from_utf8_lossy(&err));
    Ok(report)
}
