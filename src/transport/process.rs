//! Ownership of the spawned browser process.

// ============================================================================
// Imports
// ============================================================================

use tokio::process::{Child, ChildStderr};
use tracing::{debug, info};

// ============================================================================
// ProcessGuard
// ============================================================================

/// Guards a child process and ensures it is killed when dropped.
pub struct ProcessGuard {
    /// The child process handle; `None` once terminated.
    child: Option<Child>,
    /// Process ID for logging.
    pid: u32,
}

impl ProcessGuard {
    /// Creates a new process guard.
    pub(crate) fn new(child: Child) -> Self {
        let pid = child.id().unwrap_or(0);
        debug!(pid, "Process guard created");
        Self {
            child: Some(child),
            pid,
        }
    }

    /// Returns the process ID.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns `true` while the process is owned and has not exited.
    #[must_use]
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Sends a kill signal without waiting.
    ///
    /// The handle is kept so a later [`ProcessGuard::kill`] can reap it.
    pub(crate) fn start_kill(&mut self) {
        if let Some(child) = self.child.as_mut()
            && matches!(child.try_wait(), Ok(None))
            && let Err(e) = child.start_kill()
        {
            debug!(pid = self.pid, error = %e, "Failed to send kill signal");
        }
    }

    /// Takes the piped stderr handle, if any.
    pub(crate) fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.as_mut().and_then(|child| child.stderr.take())
    }

    /// Takes the child out of the guard, disarming it.
    pub(crate) fn take(&mut self) -> Option<Child> {
        self.child.take()
    }

    /// Kills the process, if still running, and waits for it to exit.
    pub(crate) async fn kill(&mut self) {
        if let Some(child) = self.take() {
            terminate(child, self.pid).await;
        }
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take()
            && let Err(e) = child.start_kill()
        {
            debug!(pid = self.pid, error = %e, "Failed to send kill signal in Drop");
        }
    }
}

/// Kills `child` unless it already exited, then reaps it.
pub(crate) async fn terminate(mut child: Child, pid: u32) {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(pid, ?status, "Process already exited");
            return;
        }
        Ok(None) => {
            debug!(pid, "Killing Chrome process");
            if let Err(e) = child.kill().await {
                debug!(pid, error = %e, "Failed to kill process");
            }
        }
        Err(e) => debug!(pid, error = %e, "Failed to poll process status"),
    }
    if let Err(e) = child.wait().await {
        debug!(pid, error = %e, "Failed to wait for process");
    }
    info!(pid, "Process terminated");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use std::process::Stdio;
    use tokio::process::Command;

    /// Polls `kill -0` until `pid` no longer exists or is a zombie.
    async fn wait_until_gone(pid: u32) -> bool {
        for _ in 0..100 {
            let alive = Command::new("sh")
                .arg("-c")
                .arg(format!("kill -0 {pid} 2>/dev/null && ! grep -q '^State:.*Z' /proc/{pid}/status 2>/dev/null"))
                .status()
                .await
                .map(|status| status.success())
                .unwrap_or(false);
            if !alive {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        false
    }

    fn sleeper() -> Child {
        Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .spawn()
            .expect("spawn sleep")
    }

    #[tokio::test]
    async fn test_kill_running_process() {
        let mut guard = ProcessGuard::new(sleeper());
        assert!(guard.pid() > 0);
        assert!(guard.is_running());

        guard.kill().await;
        assert!(!guard.is_running());
    }

    #[tokio::test]
    async fn test_kill_twice_is_noop() {
        let mut guard = ProcessGuard::new(sleeper());
        guard.kill().await;
        guard.kill().await;
        assert!(guard.take().is_none());
    }

    #[tokio::test]
    async fn test_take_stderr_once() {
        let child = Command::new("sleep")
            .arg("30")
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn sleep");
        let mut guard = ProcessGuard::new(child);

        assert!(guard.take_stderr().is_some());
        assert!(guard.take_stderr().is_none());
        guard.kill().await;
    }

    #[tokio::test]
    async fn test_take_stderr_without_pipe_then_drop_kills() {
        let mut guard = ProcessGuard::new(sleeper());
        let pid = guard.pid();
        assert!(guard.take_stderr().is_none());
        drop(guard);

        assert!(wait_until_gone(pid).await, "process {pid} survived guard drop");
    }

    #[tokio::test]
    async fn test_start_kill_then_reap() {
        let mut guard = ProcessGuard::new(sleeper());
        guard.start_kill();
        guard.kill().await;
        assert!(!guard.is_running());
    }
}
