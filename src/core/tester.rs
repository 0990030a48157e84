//! Overlap-test primitive
//!
//! [`OverlapTester`] is the only seam to the external statistics engine.
//! [`BedtoolsFisher`] runs `bedtools fisher` as a subprocess; tests
//! substitute their own implementation.

use super::error::{ConfigError, FamilyError, FamilyResultOf};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Interval between exit checks while a timeout is armed
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured output of one primitive invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawReport {
    /// Report text, parsed downstream
    pub stdout: String,
    /// Diagnostics, kept for logging only
    pub stderr: String,
}

/// Runs a Fisher's exact overlap test between two interval files
pub trait OverlapTester: Sync {
    /// Test `query` (the `a` side) against `subject` (the `b` side)
    /// over the genome described by `genome`
    fn run_overlap_test(&self, genome: &Path, query: &Path, subject: &Path) -> FamilyResultOf<RawReport>;
}

/// `bedtools fisher` subprocess
#[derive(Debug, Clone)]
pub struct BedtoolsFisher {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for BedtoolsFisher {
    fn default() -> Self {
        Self::new("bedtools")
    }
}

impl BedtoolsFisher {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the subprocess after `timeout`; `None` waits indefinitely
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check that `<program> --version` runs
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Fail with a configuration error when the program cannot be run
    pub fn ensure_available(&self) -> Result<(), ConfigError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(ConfigError::ToolNotFound(self.program.clone()))
        }
    }

    fn command(&self, genome: &Path, query: &Path, subject: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("fisher")
            .arg("-a")
            .arg(query)
            .arg("-b")
            .arg(subject)
            .arg("-g")
            .arg(genome)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout can reach wrapper-script descendants
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }
}

/// Read a pipe to completion on its own thread so the child never blocks
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<String>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

fn collect(handle: Option<JoinHandle<io::Result<String>>>) -> io::Result<String> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "pipe reader thread panicked"))?,
        None => Ok(String::new()),
    }
}

/// Kill the child and, on unix, every process in its group
fn kill_tree(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        // The child leads its own group, so the group id is its pid
        let group = format!("-{}", child.id());
        match Command::new("kill")
            .args(["-KILL", "--", group.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if !status.success() => log::debug!("kill {} exited with {}", group, status),
            Err(e) => log::debug!("Could not signal process group {}: {}", group, e),
            Ok(_) => {}
        }
    }
    // The child is not reaped yet, so this succeeds even after the group kill
    child.kill()
}

/// Wait for the child, killing its process tree once `timeout` has elapsed
fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> FamilyResultOf<ExitStatus> {
    let Some(timeout) = timeout else {
        return Ok(child.wait()?);
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            kill_tree(child)?;
            child.wait()?;
            return Err(FamilyError::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl OverlapTester for BedtoolsFisher {
    fn run_overlap_test(&self, genome: &Path, query: &Path, subject: &Path) -> FamilyResultOf<RawReport> {
        let mut cmd = self.command(genome, query, subject);
        log::debug!("Running {:?}", cmd);

        let mut child = cmd.spawn().map_err(|source| FamilyError::Spawn {
            tool: self.program.display().to_string(),
            source,
        })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        // On timeout the reader threads are left detached: a descendant that
        // escaped the kill may still hold the pipes open
        let status = wait_with_timeout(&mut child, self.timeout)?;
        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        if !status.success() {
            return Err(FamilyError::ExitStatus {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(RawReport { stdout, stderr })
    }
}
