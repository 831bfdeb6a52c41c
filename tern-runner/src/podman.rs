//! Container runtime gateway
//!
//! Thin capability layer over a container engine CLI. Each operation maps to a
//! single engine invocation:
//! - Ensuring an image is present locally (pulling it if needed)
//! - Creating and starting a step container with the source tree mounted
//! - Streaming the container's combined output line by line
//! - Waiting for the container to exit
//! - Removing the container
//!
//! `PodmanGateway` holds no mutable state, so one instance is shared by all
//! concurrent runs.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("image {image} is unavailable: {reason}")]
    ImageUnavailable { image: String, reason: String },

    #[error("failed to start container: {0}")]
    ContainerStartFailed(String),

    #[error("failed to stream container output: {0}")]
    StreamFailed(String),

    #[error("failed to wait for container: {0}")]
    WaitFailed(String),

    #[error("failed to remove container: {0}")]
    RemoveFailed(String),
}

/// Everything needed to create and start one step container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// Shell command executed through `/bin/sh -c`
    pub command: String,
    /// Host directory bind-mounted read-write at `workdir`
    pub source_dir: PathBuf,
    pub workdir: String,
}

/// Opaque reference to a started container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
}

/// Finite, non-restartable sequence of output lines of one container
#[async_trait]
pub trait OutputStream: Send {
    /// Next line of combined stdout/stderr, or `None` once the output closed
    async fn next_line(&mut self) -> Result<Option<String>, GatewayError>;
}

/// Capabilities the engine needs from a container runtime
#[async_trait]
pub trait ContainerGateway: Send + Sync {
    async fn ensure_image(&self, image: &str) -> Result<(), GatewayError>;

    async fn run_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle, GatewayError>;

    async fn stream_output(
        &self,
        handle: &ContainerHandle,
    ) -> Result<Box<dyn OutputStream>, GatewayError>;

    async fn wait_for_exit(&self, handle: &ContainerHandle) -> Result<i64, GatewayError>;

    async fn remove_container(&self, handle: &ContainerHandle) -> Result<(), GatewayError>;
}

/// Gateway backed by the `podman` CLI
///
/// Any engine with a podman-compatible command line (e.g. `docker`) works.
pub struct PodmanGateway {
    engine: String,
}

impl PodmanGateway {
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
        }
    }

    /// Checks that the engine binary is installed and answering
    pub async fn check_available(&self) -> anyhow::Result<()> {
        use anyhow::Context;

        let output = self
            .command()
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("Failed to execute '{} --version'", self.engine))?;

        if !output.status.success() {
            anyhow::bail!("{} is not working correctly", self.engine);
        }

        let version = String::from_utf8_lossy(&output.stdout);
        info!("Container engine is available: {}", version.trim());

        Ok(())
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.engine);
        command.stdin(Stdio::null()).kill_on_drop(true);
        command
    }
}

#[async_trait]
impl ContainerGateway for PodmanGateway {
    async fn ensure_image(&self, image: &str) -> Result<(), GatewayError> {
        let unavailable = |reason: String| GatewayError::ImageUnavailable {
            image: image.to_string(),
            reason,
        };

        let present = self
            .command()
            .args(["image", "inspect", image])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if present.success() {
            debug!("Image {} already present", image);
            return Ok(());
        }

        info!("Pulling image {}", image);

        // `output()` drains the whole pull progress stream before returning
        let pull = self
            .command()
            .args(["pull", image])
            .output()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !pull.status.success() {
            return Err(unavailable(failure_message(&pull)));
        }

        info!("Image {} pulled", image);
        Ok(())
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle, GatewayError> {
        info!("Creating container {} for image {}", spec.name, spec.image);

        let output = self
            .command()
            .arg("run")
            .arg("--detach")
            .arg("--tty") // merges stderr into stdout in emission order
            .arg("--name")
            .arg(&spec.name)
            .arg("--entrypoint")
            .arg("/bin/sh")
            .arg("--workdir")
            .arg(&spec.workdir)
            .arg("--volume")
            .arg(format!("{}:{}", spec.source_dir.display(), spec.workdir))
            .arg(&spec.image)
            .arg("-c")
            .arg(&spec.command)
            .output()
            .await
            .map_err(|e| GatewayError::ContainerStartFailed(e.to_string()))?;

        if !output.status.success() {
            let message = failure_message(&output);
            // The engine may have created the container before failing to start it
            match self
                .command()
                .args(["rm", "--force", spec.name.as_str()])
                .output()
                .await
            {
                Ok(rm) if rm.status.success() => {}
                Ok(rm) => warn!(
                    "Failed to remove container {} after failed start: {}",
                    spec.name,
                    failure_message(&rm)
                ),
                Err(e) => warn!(
                    "Failed to remove container {} after failed start: {}",
                    spec.name, e
                ),
            }
            return Err(GatewayError::ContainerStartFailed(message));
        }

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(GatewayError::ContainerStartFailed(
                "engine returned no container id".to_string(),
            ));
        }

        debug!("Container {} started with ID: {}", spec.name, id);

        Ok(ContainerHandle {
            id,
            name: spec.name.clone(),
        })
    }

    async fn stream_output(
        &self,
        handle: &ContainerHandle,
    ) -> Result<Box<dyn OutputStream>, GatewayError> {
        let mut child = self
            .command()
            .args(["logs", "--follow", handle.id.as_str()])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GatewayError::StreamFailed(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GatewayError::StreamFailed("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| GatewayError::StreamFailed("stderr not captured".to_string()))?;

        Ok(Box::new(EngineLogStream {
            child,
            stdout: Some(LineReader::new(stdout)),
            stderr: Some(LineReader::new(stderr)),
        }))
    }

    async fn wait_for_exit(&self, handle: &ContainerHandle) -> Result<i64, GatewayError> {
        let output = self
            .command()
            .args(["wait", handle.id.as_str()])
            .output()
            .await
            .map_err(|e| GatewayError::WaitFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(GatewayError::WaitFailed(failure_message(&output)));
        }

        parse_exit_code(&String::from_utf8_lossy(&output.stdout))
    }

    async fn remove_container(&self, handle: &ContainerHandle) -> Result<(), GatewayError> {
        let output = self
            .command()
            .args(["rm", "--force", handle.id.as_str()])
            .output()
            .await
            .map_err(|e| GatewayError::RemoveFailed(e.to_string()))?;

        if !output.status.success() {
            let message = failure_message(&output);
            warn!("Failed to remove container {}: {}", handle.name, message);
            return Err(GatewayError::RemoveFailed(message));
        }

        debug!("Container {} removed", handle.name);
        Ok(())
    }
}

/// Output of a running `<engine> logs --follow`
struct EngineLogStream {
    child: Child,
    stdout: Option<LineReader<ChildStdout>>,
    stderr: Option<LineReader<ChildStderr>>,
}

impl EngineLogStream {
    async fn finish(&mut self) -> Result<Option<String>, GatewayError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| GatewayError::StreamFailed(e.to_string()))?;

        if !status.success() {
            return Err(GatewayError::StreamFailed(format!(
                "log follower exited with {}",
                status
            )));
        }

        Ok(None)
    }
}

#[async_trait]
impl OutputStream for EngineLogStream {
    async fn next_line(&mut self) -> Result<Option<String>, GatewayError> {
        loop {
            let (line, from_stdout) = match (self.stdout.as_mut(), self.stderr.as_mut()) {
                (None, None) => return self.finish().await,
                (Some(out), None) => (out.read_line().await, true),
                (None, Some(err)) => (err.read_line().await, false),
                (Some(out), Some(err)) => tokio::select! {
                    line = out.read_line() => (line, true),
                    line = err.read_line() => (line, false),
                },
            };

            match line.map_err(|e| GatewayError::StreamFailed(e.to_string()))? {
                Some(line) => return Ok(Some(line)),
                None if from_stdout => self.stdout = None,
                None => self.stderr = None,
            }
        }
    }
}

/// Longest line handed out; longer output is split at this size
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Reads one line at a time, keeping partial reads across cancelled calls
///
/// A line ends at `\n`, `\r\n` or a lone `\r` (progress bars on a tty), or
/// when it reaches `MAX_LINE_BYTES`.
struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    after_cr: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
            after_cr: false,
        }
    }

    async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            // Bytes are moved out of the reader without awaiting in between,
            // so a cancelled call loses nothing
            let available = self.reader.fill_buf().await?;

            if available.is_empty() {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            if self.after_cr && available[0] == b'\n' {
                self.after_cr = false;
                self.reader.consume(1);
                continue;
            }
            self.after_cr = false;

            let room = MAX_LINE_BYTES - self.buf.len();
            let window = &available[..available.len().min(room)];

            match window.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(pos) => {
                    self.after_cr = window[pos] == b'\r';
                    self.buf.extend_from_slice(&window[..pos]);
                    self.reader.consume(pos + 1);
                    return Ok(Some(self.take_line()));
                }
                None => {
                    let taken = window.len();
                    self.buf.extend_from_slice(window);
                    self.reader.consume(taken);

                    if self.buf.len() >= MAX_LINE_BYTES {
                        return Ok(Some(self.take_line()));
                    }
                }
            }
        }
    }

    fn take_line(&mut self) -> String {
        let line = decode_line(&self.buf);
        self.buf.clear();
        line
    }
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

fn parse_exit_code(stdout: &str) -> Result<i64, GatewayError> {
    let trimmed = stdout.trim();
    trimmed
        .lines()
        .last()
        .and_then(|line| line.trim().parse::<i64>().ok())
        .ok_or_else(|| GatewayError::WaitFailed(format!("unexpected wait output: '{}'", trimmed)))
}

fn failure_message(output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("engine exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_strips_tty_line_endings() {
        assert_eq!(decode_line(b"hello\r\n"), "hello");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[test]
    fn test_decode_line_tolerates_invalid_utf8() {
        assert_eq!(decode_line(b"bad \xff byte\n"), "bad \u{fffd} byte");
    }

    #[test]
    fn test_parse_exit_code() {
        assert_eq!(parse_exit_code("0\n").unwrap(), 0);
        assert_eq!(parse_exit_code("  137 ").unwrap(), 137);
        assert!(matches!(
            parse_exit_code("no such container"),
            Err(GatewayError::WaitFailed(_))
        ));
        assert!(matches!(parse_exit_code(""), Err(GatewayError::WaitFailed(_))));
    }

    #[tokio::test]
    async fn test_line_reader_yields_lines_then_none() {
        let input: &[u8] = b"first\r\nsecond\nlast";
        let mut reader = LineReader::new(input);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("last"));
        assert_eq!(reader.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_reader_splits_on_carriage_return() {
        let input: &[u8] = b"10%\r50%\r100%\r\ndone\n";
        let mut reader = LineReader::new(input);

        let mut lines = Vec::new();
        while let Some(line) = reader.read_line().await.unwrap() {
            lines.push(line);
        }

        assert_eq!(lines, vec!["10%", "50%", "100%", "done"]);
    }

    #[tokio::test]
    async fn test_line_reader_caps_unterminated_output() {
        let input = vec![b'x'; 3 * MAX_LINE_BYTES + 100];
        let mut reader = LineReader::new(input.as_slice());

        let mut sizes = Vec::new();
        while let Some(line) = reader.read_line().await.unwrap() {
            sizes.push(line.len());
        }

        assert_eq!(
            sizes,
            vec![MAX_LINE_BYTES, MAX_LINE_BYTES, MAX_LINE_BYTES, 100]
        );
    }

    #[tokio::test]
    async fn test_line_reader_progress_bar_stays_bounded() {
        let frame = b"progress 99%...\r";
        let input: Vec<u8> = frame.repeat(8 * 1024 * 1024 / frame.len());
        let mut reader = LineReader::new(input.as_slice());

        let mut count = 0;
        while let Some(line) = reader.read_line().await.unwrap() {
            assert_eq!(line, "progress 99%...");
            count += 1;
        }

        assert_eq!(count, 8 * 1024 * 1024 / frame.len());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_start_still_removes_container() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let calls = dir.path().join("calls.log");
        let engine = dir.path().join("fake-engine");
        std::fs::write(
            &engine,
            format!(
                "#!/bin/sh\necho \"$1\" >> '{}'\necho \"$1 refused\" >&2\nexit 125\n",
                calls.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o755)).unwrap();

        let gateway = PodmanGateway::new(engine.to_string_lossy());
        let spec = ContainerSpec {
            name: "tern-test-step-1".to_string(),
            image: "alpine".to_string(),
            command: "true".to_string(),
            source_dir: dir.path().to_path_buf(),
            workdir: "/app".to_string(),
        };

        let result = gateway.run_container(&spec).await;

        match result {
            Err(GatewayError::ContainerStartFailed(message)) => assert_eq!(message, "run refused"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(std::fs::read_to_string(&calls).unwrap(), "run\nrm\n");
    }

    #[tokio::test]
    async fn test_missing_engine_is_image_unavailable() {
        let gateway = PodmanGateway::new("tern-test-no-such-engine");
        let result = gateway.ensure_image("alpine").await;
        assert!(matches!(result, Err(GatewayError::ImageUnavailable { .. })));
    }
}
