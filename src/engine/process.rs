use super::types::ToolDiag;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("spawning {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    #[error("{tool} exceeded timeout ({timeout:?}); stderr: {stderr}")]
    Timeout {
        tool: String,
        timeout: Duration,
        stderr: String,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{tool} i/o: {source}")]
    Io {
        tool: String,
        source: std::io::Error,
    },
}

/// Runs a tool to completion, optionally feeding `stdin`, and returns its
/// output when it exits successfully.
pub fn run_tool(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    timeout: Option<Duration>,
) -> Result<Output, ToolError> {
    let tool = cmd.get_program().to_string_lossy().into_owned();
    debug!("spawn {} timeout={:?}", tool, timeout);

    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|source| ToolError::Spawn {
        tool: tool.clone(),
        source,
    })?;

    let output = wait_with_timeout(&mut child, &tool, stdin, timeout)?;

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    if !output.stderr.is_empty() {
        debug!(
            "{} stderr: {}",
            tool,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(output)
}

/// Best-effort version probe: first non-empty line the tool prints for
/// `arg`, whatever its exit status.
pub fn probe_version(name: &str, exe: &Path, arg: &str) -> ToolDiag {
    let executable = exe.display().to_string();
    let mut cmd = Command::new(exe);
    cmd.arg(arg);
    match cmd.stdin(Stdio::null()).output() {
        Ok(out) => {
            let text = format!(
                "{}\n{}",
                String::from_utf8_lossy(&out.stdout),
                String::from_utf8_lossy(&out.stderr)
            );
            let version = text
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string);
            ToolDiag {
                tool: name.to_string(),
                executable,
                ok: version.is_some(),
                version,
                error: None,
            }
        }
        Err(err) => ToolDiag {
            tool: name.to_string(),
            executable,
            version: None,
            ok: false,
            error: Some(err.to_string()),
        },
    }
}

fn wait_with_timeout(
    child: &mut Child,
    tool: &str,
    stdin: Option<&[u8]>,
    timeout: Option<Duration>,
) -> Result<Output, ToolError> {
    let io_err = |source| ToolError::Io {
        tool: tool.to_string(),
        source,
    };

    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf)?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf)?;
        }
        Ok(buf)
    });

    // A tool that exits without reading all of stdin closes the pipe; its
    // exit status is what gets reported then, not the broken pipe.
    let stdin_pipe = child.stdin.take();
    let input = stdin.map(<[u8]>::to_vec);
    let stdin_thread = std::thread::spawn(move || -> std::io::Result<()> {
        if let (Some(mut pipe), Some(bytes)) = (stdin_pipe, input) {
            match pipe.write_all(&bytes).and_then(|()| pipe.flush()) {
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                other => other?,
            }
        }
        Ok(())
    });

    let join = |handle: std::thread::JoinHandle<std::io::Result<Vec<u8>>>| {
        handle
            .join()
            .map_err(|_| std::io::Error::other("pipe reader thread panicked"))
            .and_then(|r| r)
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(io_err)? {
            let written = stdin_thread
                .join()
                .map_err(|_| std::io::Error::other("stdin writer thread panicked"))
                .and_then(|r| r);
            let stdout = join(stdout_thread).map_err(io_err)?;
            let stderr = join(stderr_thread).map_err(io_err)?;
            if status.success() {
                written.map_err(io_err)?;
            }
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if let Some(limit) = timeout {
            if start.elapsed() > limit {
                warn!("{} timed out after {:?}", tool, limit);
                let _ = child.kill();
                child.wait().map_err(io_err)?;
                let _ = stdin_thread.join();
                let _ = join(stdout_thread);
                let stderr = join(stderr_thread).unwrap_or_default();
                return Err(ToolError::Timeout {
                    tool: tool.to_string(),
                    timeout: limit,
                    stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
                });
            }
        }

        std::thread::sleep(Duration::from_millis(20));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn pipes_stdin_through() {
        let out = run_tool(Command::new("cat"), Some(b"png bytes"), None).unwrap();
        assert_eq!(out.stdout, b"png bytes");
    }

    #[test]
    fn nonzero_exit_is_failure_with_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo broken >&2; exit 3"]);
        match run_tool(cmd, None, None) {
            Err(ToolError::Failed { stderr, status, .. }) => {
                assert_eq!(stderr, "broken");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn slow_tool_is_killed() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let started = Instant::now();
        let err = run_tool(cmd, None, Some(Duration::from_millis(100))).unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn early_exit_reports_status_not_broken_pipe() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo 'bad tessdata' >&2; exit 1"]);
        let input = vec![0u8; 4 * 1024 * 1024];
        match run_tool(cmd, Some(&input), Some(Duration::from_secs(10))) {
            Err(ToolError::Failed { stderr, status, .. }) => {
                assert_eq!(stderr, "bad tessdata");
                assert_eq!(status.code(), Some(1));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn timeout_applies_while_stdin_is_unread() {
        let mut cmd = Command::new("sleep");
        cmd.arg("4");
        let input = vec![0u8; 4 * 1024 * 1024];
        let started = Instant::now();
        let err = run_tool(cmd, Some(&input), Some(Duration::from_millis(200))).unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn missing_executable() {
        let err = run_tool(Command::new("/nonexistent/pdftoppm"), None, None).unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));

        let diag = probe_version("pdftoppm", Path::new("/nonexistent/pdftoppm"), "-v");
        assert!(!diag.ok);
        assert!(diag.error.is_some());
    }
}
