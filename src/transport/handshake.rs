//! Browser launch and debugging-endpoint discovery.
//!
//! The browser is started with `--remote-debugging-port=0`, which makes it
//! pick a free port and announce the endpoint on stderr:
//!
//! ```text
//! DevTools listening on ws://127.0.0.1:40573/devtools/browser/5b0e...
//! ```
//!
//! The first matching line wins. Everything after it is drained so the
//! browser never blocks on a full pipe.

// ============================================================================
// Imports
// ============================================================================

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::process::{ChildStderr, Command};
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace};
use url::Url;

use crate::error::{Error, Result};

use super::process::ProcessGuard;

// ============================================================================
// Types
// ============================================================================

/// WebSocket stream to the browser endpoint.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Matches the endpoint announcement line.
static LISTENING_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^DevTools listening on (ws://.*?)\r?$").ok());

// ============================================================================
// Spawn
// ============================================================================

/// Starts the browser with stderr piped for endpoint discovery.
///
/// # Errors
///
/// Returns [`Error::ProcessLaunchFailed`] if the binary cannot be started.
pub(crate) fn spawn<I, S>(binary: &Path, args: I) -> Result<(ProcessGuard, ChildStderr)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(Error::process_launch_failed)?;

    // Dropping the guard on the error path kills the child.
    let mut guard = ProcessGuard::new(child);
    let stderr = guard
        .take_stderr()
        .ok_or_else(|| Error::handshake("browser stderr is not captured"))?;

    info!(pid = guard.pid(), binary = %binary.display(), "Browser process started");
    Ok((guard, stderr))
}

// ============================================================================
// Endpoint Discovery
// ============================================================================

/// Extracts the endpoint from one stderr line.
#[must_use]
pub fn parse_endpoint(line: &str) -> Option<&str> {
    let re = LISTENING_RE.as_ref()?;
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Reads `stderr` until the endpoint line appears.
///
/// # Errors
///
/// - [`Error::HandshakeTimeout`] if no endpoint within `wait`
/// - [`Error::Handshake`] if the stream ends first or the URL is invalid
pub(crate) async fn await_endpoint<R>(stderr: R, wait: Duration) -> Result<Url>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(stderr);

    let endpoint = timeout(wait, read_endpoint(&mut reader))
        .await
        .map_err(|_| Error::handshake_timeout(wait.as_millis() as u64))??;

    // Keep draining so the browser never blocks writing stderr.
    tokio::spawn(async move {
        let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
    });

    let url = Url::parse(&endpoint)
        .map_err(|e| Error::handshake(format!("invalid endpoint {endpoint}: {e}")))?;
    debug!(%url, "DevTools endpoint discovered");
    Ok(url)
}

async fn read_endpoint<R>(reader: &mut BufReader<R>) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            return Err(Error::handshake(
                "browser exited before announcing the DevTools endpoint",
            ));
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.strip_suffix('\n').unwrap_or(&line);
        trace!(line, "Browser stderr");

        if let Some(endpoint) = parse_endpoint(line) {
            return Ok(endpoint.to_string());
        }
    }
}

// ============================================================================
// Connect
// ============================================================================

/// Opens the WebSocket to the discovered endpoint.
///
/// # Errors
///
/// Returns [`Error::Connection`] if the upgrade fails.
pub(crate) async fn connect(url: &Url) -> Result<WsStream> {
    let (ws, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| Error::connection(format!("failed to connect to {url}: {e}")))?;
    debug!(%url, "WebSocket connected");
    Ok(ws)
}

// ============================================================================
// Tests
// ============================================================================
