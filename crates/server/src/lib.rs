//! Lifecycle of the debug server process.
//!
//! The debug server is a separate executable shipped next to the adapter. It
//! takes the HTTP port as its only argument and is killed when the session
//! ends.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use eyre::WrapErr;
use tokio::process::{Child, Command};

/// File name of the debug server for the current platform.
pub fn platform_executable_name() -> &'static str {
    if cfg!(windows) {
        "DebugServer.exe"
    } else {
        "DebugServerLinux"
    }
}

/// The debug server shipped alongside the running adapter binary.
pub fn default_executable() -> eyre::Result<PathBuf> {
    let current = std::env::current_exe().wrap_err("locating adapter executable")?;
    let dir = current
        .parent()
        .ok_or_else(|| eyre::eyre!("adapter executable has no parent directory"))?;
    Ok(dir.join(platform_executable_name()))
}

/// Bare names are looked up in `PATH`, anything with a directory component
/// must exist as given.
fn resolve_executable(executable: &Path) -> eyre::Result<PathBuf> {
    if executable.components().count() > 1 {
        if !executable.is_file() {
            eyre::bail!("debug server not found at {}", executable.display());
        }
        return Ok(executable.to_path_buf());
    }

    which::which(executable)
        .map_err(|_| eyre::eyre!("{} not found in PATH", executable.display()))
}

/// A running debug server.
///
/// Dropping it sends the kill signal without waiting; the runtime reaps the
/// process in the background. [`terminate`](Self::terminate) also waits for
/// the exit.
pub struct BackendProcess {
    child: Child,
    executable: PathBuf,
}

impl BackendProcess {
    /// Must be called from within a tokio runtime.
    pub fn spawn(executable: impl AsRef<Path>, port: u16) -> eyre::Result<Self> {
        let executable = resolve_executable(executable.as_ref())?;
        tracing::debug!(executable = %executable.display(), port, "starting debug server");

        // stdout may be the protocol channel to the editor
        let child = Command::new(&executable)
            .arg(port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .wrap_err_with(|| format!("spawning {}", executable.display()))?;

        tracing::debug!(pid = child.id(), "debug server started");
        Ok(Self { child, executable })
    }

    /// `None` once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// False once the process has exited, for whatever reason.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Kill the process and wait for it to exit.
    pub async fn terminate(mut self) {
        if !self.is_running() {
            return;
        }

        tracing::debug!(pid = self.child.id(), "terminating debug server");
        if let Err(e) = self.child.start_kill() {
            tracing::warn!(error = %e, "could not terminate debug server");
            return;
        }
        match self.child.wait().await {
            Ok(status) => tracing::debug!(%status, "debug server terminated"),
            Err(e) => tracing::warn!(error = %e, "waiting for debug server to exit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::IsTerminal;

    use tracing_subscriber::EnvFilter;

    use super::*;

    fn init_test_logger() {
        let in_ci = std::env::var("CI")
            .map(|val| val == "true")
            .unwrap_or(false);

        if std::io::stderr().is_terminal() || in_ci {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .try_init();
        } else {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .json()
                .try_init();
        }

        let _ = color_eyre::install();
    }

    #[cfg(unix)]
    async fn is_alive(pid: u32) -> bool {
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stderr(Stdio::null())
            .status()
            .await
            .unwrap()
            .success()
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn terminate_kills_and_reaps() {
        init_test_logger();

        // `sleep <port>` stays alive long enough and proves the argument is passed
        let mut process = BackendProcess::spawn("sleep", 51237).unwrap();
        assert!(process.is_running());
        assert!(process.executable().ends_with("sleep"));

        let pid = process.id().unwrap();
        process.terminate().await;
        assert!(!is_alive(pid).await, "process {pid} still alive");
    }

    // zombies count as dead: the kill is sent on drop, reaping happens later
    #[cfg(target_os = "linux")]
    fn is_running_pid(pid: u32) -> bool {
        std::fs::read_to_string(format!("/proc/{pid}/stat"))
            .ok()
            .and_then(|stat| {
                let (_, rest) = stat.rsplit_once(')')?;
                rest.trim_start().chars().next()
            })
            .is_some_and(|state| state != 'Z' && state != 'X')
    }

    #[tokio::test]
    #[cfg(target_os = "linux")]
    async fn dropped_process_is_killed() {
        init_test_logger();

        let process = BackendProcess::spawn("sleep", 51237).unwrap();
        let pid = process.id().unwrap();
        drop(process);

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        while is_running_pid(pid) {
            assert!(tokio::time::Instant::now() < deadline, "process {pid} still alive");
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn terminate_after_exit_is_harmless() {
        init_test_logger();

        let mut process = BackendProcess::spawn("true", 1).unwrap();
        while process.is_running() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        process.terminate().await;
    }

    #[test]
    fn missing_executable_is_an_error() {
        init_test_logger();

        let err = BackendProcess::spawn("definitely-not-a-debug-server", 51237)
            .err()
            .unwrap();
        assert!(err.to_string().contains("not found in PATH"), "{err}");

        let err = BackendProcess::spawn("/nonexistent/dir/DebugServerLinux", 51237)
            .err()
            .unwrap();
        assert!(err.to_string().contains("debug server not found"), "{err}");
    }

    #[test]
    fn default_executable_sits_next_to_the_adapter() {
        let path = default_executable().unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(platform_executable_name())
        );
    }
}
