//! In-process stand-in for a browser's DevTools endpoint.
//!
//! [`MockBrowser`] accepts one websocket connection, answers target
//! discovery and attach, acks every `Target.sendMessageToTarget`, and
//! replies to the wrapped session command through a responder closure.
//! The "browser process" is `/bin/sh` printing the endpoint line to
//! stderr and then sleeping.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use devtools_bridge::{Chrome, Connection, ConnectionSettings, Result};

pub const TARGET: &str = "TARGET-PAGE-1";
pub const SESSION: &str = "SESSION-1";

/// Produces the reply body for a session command, or `None` to stay silent.
pub type Responder = Arc<dyn Fn(&str, &Value) -> Option<Value> + Send + Sync>;

/// A session command the mock received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

pub struct MockBrowser {
    port: u16,
    commands: Arc<Mutex<Vec<Recorded>>>,
    inject_tx: mpsc::UnboundedSender<Message>,
    task: JoinHandle<()>,
}

impl MockBrowser {
    /// Starts a mock that answers every command with [`default_reply`].
    pub async fn start() -> Self {
        Self::with_responder(|method, params| Some(default_reply(method, params))).await
    }

    /// Starts a mock with a custom responder.
    pub async fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        Self::spawn(Arc::new(responder), None).await
    }

    /// Starts a mock whose attach reply carries `error`.
    pub async fn rejecting_attach(error: Value) -> Self {
        Self::spawn(
            Arc::new(|method: &str, params: &Value| Some(default_reply(method, params))),
            Some(error),
        )
        .await
    }

    async fn spawn(responder: Responder, attach_error: Option<Value>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let (inject_tx, inject_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(serve(
            listener,
            responder,
            attach_error,
            Arc::clone(&commands),
            inject_rx,
        ));

        Self {
            port,
            commands,
            inject_tx,
            task,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/devtools/browser/mock", self.port)
    }

    /// Arguments for `/bin/sh` that announce this mock and then idle.
    pub fn launch_args(&self) -> Vec<String> {
        vec![
            "-c".to_string(),
            format!(
                "echo 'noise before the endpoint' >&2; \
                 echo 'DevTools listening on {}' >&2; exec sleep 60",
                self.ws_url()
            ),
        ]
    }

    /// Like [`MockBrowser::launch_args`], but the stand-in first writes its
    /// pid to `pid_file`.
    pub fn launch_args_recording_pid(&self, pid_file: &Path) -> Vec<String> {
        vec![
            "-c".to_string(),
            format!(
                "echo $$ > '{}'; echo 'DevTools listening on {}' >&2; exec sleep 60",
                pid_file.display(),
                self.ws_url()
            ),
        ]
    }

    pub async fn chrome(&self) -> Chrome {
        Chrome::with_args("/bin/sh", self.launch_args())
            .await
            .expect("launch against mock")
    }

    pub async fn connection(&self, settings: ConnectionSettings) -> Result<Connection> {
        Connection::open(Path::new("/bin/sh"), self.launch_args(), settings).await
    }

    /// Sends a raw top-level frame.
    pub fn inject(&self, frame: Value) {
        let _ = self.inject_tx.send(Message::Text(frame.to_string().into()));
    }

    /// Sends `message` as if it came from the attached session.
    pub fn inject_session(&self, message: Value) {
        self.inject_session_as(SESSION, message);
    }

    /// Sends `message` as if it came from `session`.
    pub fn inject_session_as(&self, session: &str, message: Value) {
        self.inject(forwarded(session, &message));
    }

    pub fn commands(&self) -> Vec<Recorded> {
        self.commands.lock().clone()
    }

    pub fn commands_named(&self, method: &str) -> Vec<Recorded> {
        self.commands()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    /// Polls until a recorded command matches `pred`.
    pub async fn wait_for<P>(&self, pred: P) -> Recorded
    where
        P: Fn(&Recorded) -> bool,
    {
        let found = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(found) = self.commands().into_iter().find(|c| pred(c)) {
                    return found;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        found.expect("command never arrived")
    }

    /// Waits for a `Runtime.evaluate` whose expression equals `expression`.
    pub async fn wait_for_eval(&self, expression: &str) -> Recorded {
        self.wait_for(|c| c.method == "Runtime.evaluate" && c.params["expression"] == expression)
            .await
    }
}

impl Drop for MockBrowser {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Wraps a session message the way the browser forwards it.
pub fn forwarded(session: &str, message: &Value) -> Value {
    json!({
        "method": "Target.receivedMessageFromTarget",
        "params": {
            "sessionId": session,
            "message": message.to_string(),
            "targetId": TARGET,
        }
    })
}

/// Successful reply for any command: `undefined` for evaluations.
pub fn default_reply(method: &str, _params: &Value) -> Value {
    match method {
        "Runtime.evaluate" => json!({"result": {"result": {"type": "undefined"}}}),
        _ => json!({"result": {}}),
    }
}

/// Reply carrying an evaluated value.
pub fn value_reply(value: Value) -> Value {
    let kind = match &value {
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Bool(_) => "boolean",
        _ => "object",
    };
    json!({"result": {"result": {"type": kind, "value": value}}})
}

/// Reads the pid a stand-in wrote with `echo $$`.
pub fn recorded_pid(pid_file: &Path) -> u32 {
    std::fs::read_to_string(pid_file)
        .expect("pid file")
        .trim()
        .parse()
        .expect("pid")
}

/// Waits up to two seconds for `pid` to exit; zombies count as exited.
pub async fn process_gone(pid: u32) -> bool {
    for _ in 0..100 {
        let alive = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(format!(
                "kill -0 {pid} 2>/dev/null && ! grep -q '^State:.*Z' /proc/{pid}/status 2>/dev/null"
            ))
            .status()
            .await
            .expect("run sh")
            .success();
        if !alive {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Initialises test logging once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Server
// ============================================================================

async fn serve(
    listener: TcpListener,
    responder: Responder,
    attach_error: Option<Value>,
    commands: Arc<Mutex<Vec<Recorded>>>,
    mut inject_rx: mpsc::UnboundedReceiver<Message>,
) {
    let Ok((stream, _)) = listener.accept().await else {
        return;
    };
    let Ok(ws) = accept_async(stream).await else {
        return;
    };
    let (mut sink, mut source) = ws.split();

    loop {
        tokio::select! {
            frame = source.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };
                let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                for reply in respond(&frame, &responder, attach_error.as_ref(), &commands) {
                    if sink.send(Message::Text(reply.to_string().into())).await.is_err() {
                        return;
                    }
                }
            }

            Some(message) = inject_rx.recv() => {
                if sink.send(message).await.is_err() {
                    break;
                }
            }
        }
    }
}

fn respond(
    frame: &Value,
    responder: &Responder,
    attach_error: Option<&Value>,
    commands: &Mutex<Vec<Recorded>>,
) -> Vec<Value> {
    let id = frame["id"].clone();

    match frame["method"].as_str().unwrap_or_default() {
        "Target.setDiscoverTargets" => vec![
            json!({"id": id, "result": {}}),
            json!({
                "method": "Target.targetCreated",
                "params": {"targetInfo": {"targetId": "TARGET-WORKER", "type": "service_worker"}}
            }),
            json!({
                "method": "Target.targetCreated",
                "params": {"targetInfo": {"targetId": TARGET, "type": "page"}}
            }),
        ],

        "Target.attachToTarget" => match attach_error {
            Some(error) => vec![json!({"id": id, "error": error})],
            None => vec![json!({"id": id, "result": {"sessionId": SESSION}})],
        },

        "Target.sendMessageToTarget" => {
            let mut replies = vec![json!({"id": id, "result": {}})];

            let Some(inner) = frame["params"]["message"]
                .as_str()
                .and_then(|m| serde_json::from_str::<Value>(m).ok())
            else {
                return replies;
            };
            let method = inner["method"].as_str().unwrap_or_default().to_string();
            let params = inner["params"].clone();
            let inner_id = inner["id"].as_u64().unwrap_or_default();

            commands.lock().push(Recorded {
                id: inner_id,
                method: method.clone(),
                params: params.clone(),
            });

            if let Some(mut reply) = responder(&method, &params) {
                reply["id"] = json!(inner_id);
                replies.push(forwarded(SESSION, &reply));
            }
            replies
        }

        _ => vec![json!({"id": id, "result": {}})],
    }
}
