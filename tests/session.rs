//! End-to-end session behavior against a mock DevTools endpoint.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use common::{MockBrowser, SESSION, TARGET, default_reply, init_tracing, value_reply};
use devtools_bridge::{
    BindingHandler, Bounds, ConnectionSettings, Error, Result, SessionEvent, WindowState,
};

// ============================================================================
// Evaluation
// ============================================================================

#[tokio::test]
async fn test_eval_returns_value_and_clears_pending() {
    init_tracing();
    let mock = MockBrowser::with_responder(|method, params| match params["expression"].as_str() {
        Some("1 + 2") => Some(value_reply(json!(3))),
        _ => Some(default_reply(method, params)),
    })
    .await;
    let chrome = mock.chrome().await;

    assert_eq!(chrome.eval("1 + 2").await.expect("eval"), json!(3));
    assert_eq!(chrome.connection().pending_count(), 0);

    let recorded = mock.wait_for_eval("1 + 2").await;
    assert!(recorded.id >= 3);
    assert_eq!(recorded.params["awaitPromise"], json!(true));
    assert_eq!(recorded.params["returnByValue"], json!(true));

    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_startup_enables_domains_in_order() {
    let mock = MockBrowser::start().await;
    let chrome = mock.chrome().await;

    let methods: Vec<String> = mock.commands().into_iter().map(|c| c.method).collect();
    assert_eq!(
        &methods[..7],
        [
            "Page.enable",
            "Target.setAutoAttach",
            "Network.enable",
            "Runtime.enable",
            "Security.enable",
            "Performance.enable",
            "Log.enable",
        ]
    );

    let ids: Vec<u64> = mock.commands().iter().map(|c| c.id).collect();
    assert_eq!(ids[0], 3);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(chrome.session_id().as_str(), SESSION);
    assert_eq!(chrome.target_id().as_str(), TARGET);

    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_concurrent_evals_with_reversed_replies() {
    let mock = MockBrowser::with_responder(|method, params| match params["expression"].as_str() {
        Some("first") | Some("second") => None,
        _ => Some(default_reply(method, params)),
    })
    .await;
    let chrome = mock.chrome().await;

    let first = tokio::spawn({
        let chrome = chrome.clone();
        async move { chrome.eval("first").await }
    });
    let second = tokio::spawn({
        let chrome = chrome.clone();
        async move { chrome.eval("second").await }
    });

    let first_id = mock.wait_for_eval("first").await.id;
    let second_id = mock.wait_for_eval("second").await.id;
    assert_ne!(first_id, second_id);

    let mut reply = value_reply(json!("two"));
    reply["id"] = json!(second_id);
    mock.inject_session(reply);
    let mut reply = value_reply(json!("one"));
    reply["id"] = json!(first_id);
    mock.inject_session(reply);

    assert_eq!(second.await.expect("join").expect("second"), json!("two"));
    assert_eq!(first.await.expect("join").expect("first"), json!("one"));
    assert_eq!(chrome.connection().pending_count(), 0);

    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_eval_error_messages() {
    let mock = MockBrowser::with_responder(|method, params| {
        let reply = match params["expression"].as_str() {
            Some("Promise.reject('foo')") => json!({"result": {
                "result": {"type": "string", "value": "foo"},
                "exceptionDetails": {"text": "Uncaught (in promise)", "exception": {"type": "string", "value": "foo"}}
            }}),
            Some("throw 'bar'") => json!({"result": {
                "result": {"type": "string", "value": "bar"},
                "exceptionDetails": {"text": "Uncaught", "exception": {"type": "string", "value": "bar"}}
            }}),
            Some("2+") => json!({"result": {
                "result": {"type": "object", "subtype": "error", "description": "SyntaxError: Unexpected end of input"},
                "exceptionDetails": {"text": "Uncaught"}
            }}),
            _ => default_reply(method, params),
        };
        Some(reply)
    })
    .await;
    let chrome = mock.chrome().await;

    let err = chrome.eval("Promise.reject('foo')").await.expect_err("rejected");
    assert_eq!(err.to_string(), "\"foo\"");

    let err = chrome.eval("throw 'bar'").await.expect_err("thrown");
    assert_eq!(err.to_string(), "\"bar\"");

    let err = chrome.eval("2+").await.expect_err("syntax");
    assert!(err.to_string().starts_with("SyntaxError"));
    assert!(matches!(err, Error::Remote { .. }));

    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_protocol_error_reply() {
    let mock = MockBrowser::with_responder(|method, params| match method {
        "Page.navigate" => Some(json!({"error": {"code": -32000, "message": "Cannot navigate to invalid URL"}})),
        _ => Some(default_reply(method, params)),
    })
    .await;
    let chrome = mock.chrome().await;

    let err = chrome.load("not a url").await.expect_err("navigate");
    assert_eq!(err.to_string(), "Cannot navigate to invalid URL");

    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_reply_from_stale_session_is_ignored() {
    let mock = MockBrowser::with_responder(|method, params| match params["expression"].as_str() {
        Some("wait") => None,
        _ => Some(default_reply(method, params)),
    })
    .await;
    let chrome = mock.chrome().await;

    let pending = tokio::spawn({
        let chrome = chrome.clone();
        async move { chrome.eval("wait").await }
    });
    let id = mock.wait_for_eval("wait").await.id;

    let mut stale = value_reply(json!("stale"));
    stale["id"] = json!(id);
    mock.inject_session_as("SESSION-OLD", stale);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!pending.is_finished());
    assert_eq!(chrome.connection().pending_count(), 1);

    let mut fresh = value_reply(json!("fresh"));
    fresh["id"] = json!(id);
    mock.inject_session(fresh);

    assert_eq!(pending.await.expect("join").expect("eval"), json!("fresh"));
    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_command_timeout_cleans_up() {
    let mock = MockBrowser::with_responder(|method, params| match params["expression"].as_str() {
        Some("never") => None,
        _ => Some(default_reply(method, params)),
    })
    .await;
    let connection = mock
        .connection(ConnectionSettings {
            command_timeout: Some(Duration::from_millis(100)),
            ..ConnectionSettings::default()
        })
        .await
        .expect("open");

    let err = connection
        .send("Runtime.evaluate", json!({"expression": "never"}))
        .await
        .expect_err("timeout");
    assert!(matches!(err, Error::RequestTimeout { .. }));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(connection.pending_count(), 0);

    connection.close().await;
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test]
async fn test_target_destroyed_wakes_pending_callers() {
    let mock = MockBrowser::with_responder(|method, params| match params["expression"].as_str() {
        Some("hang") => None,
        _ => Some(default_reply(method, params)),
    })
    .await;
    let chrome = mock.chrome().await;

    let pending = tokio::spawn({
        let chrome = chrome.clone();
        async move { chrome.eval("hang").await }
    });
    mock.wait_for_eval("hang").await;

    mock.inject(json!({
        "method": "Target.targetDestroyed",
        "params": {"targetId": TARGET}
    }));

    let result = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .expect("woken")
        .expect("join");
    assert!(matches!(result, Err(Error::ConnectionClosed)));

    tokio::time::timeout(Duration::from_secs(5), chrome.done())
        .await
        .expect("done resolves");
    assert!(chrome.is_closed());

    let err = chrome.eval("1").await.expect_err("closed");
    assert!(matches!(err, Error::ConnectionClosed));

    chrome.close().await.expect("close after teardown");
}

#[tokio::test]
async fn test_other_target_destroyed_is_ignored() {
    let mock = MockBrowser::start().await;
    let chrome = mock.chrome().await;

    mock.inject(json!({
        "method": "Target.targetDestroyed",
        "params": {"targetId": "SOME-OTHER-TARGET"}
    }));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!chrome.is_closed());
    chrome.eval("1").await.expect("still alive");
    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_double_close() {
    let mock = MockBrowser::start().await;
    let chrome = mock.chrome().await;
    let profile = chrome.user_data_dir();
    assert!(profile.is_none());

    chrome.close().await.expect("first close");
    chrome.close().await.expect("second close");
    assert!(chrome.is_closed());
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_event_handler_receives_session_events() {
    let mock = MockBrowser::start().await;
    let chrome = mock.chrome().await;

    let seen = Arc::new(Mutex::new(Vec::<SessionEvent>::new()));
    let sink = Arc::clone(&seen);
    chrome.set_event_handler(Box::new(move |event| sink.lock().push(event.clone())));

    mock.inject_session(json!({
        "method": "Runtime.consoleAPICalled",
        "params": {"type": "log", "args": [{"type": "string", "value": "hello"}, {"type": "number", "value": 2}]}
    }));
    mock.inject_session(json!({
        "method": "Page.loadEventFired",
        "params": {"timestamp": 1.0}
    }));

    tokio::time::timeout(Duration::from_secs(5), async {
        while seen.lock().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("events delivered");

    let events = seen.lock().clone();
    assert!(events[0].is_console());
    assert_eq!(events[0].console_text(), "hello 2");
    assert_eq!(events[1].method, "Page.loadEventFired");

    chrome.close().await.expect("close");
}

// ============================================================================
// Bindings
// ============================================================================

fn binding_call(name: &str, seq: u64, args: Value, context: i64) -> Value {
    json!({
        "method": "Runtime.bindingCalled",
        "params": {
            "name": name,
            "payload": json!({"name": name, "seq": seq, "args": args}).to_string(),
            "executionContextId": context
        }
    })
}

#[tokio::test]
async fn test_binding_settles_page_promise() {
    let mock = MockBrowser::start().await;
    let chrome = mock.chrome().await;

    chrome
        .bind_fn("add", |(a, b): (i64, i64)| -> Result<i64> { Ok(a + b) })
        .await
        .expect("bind");

    assert_eq!(mock.commands_named("Runtime.addBinding")[0].params, json!({"name": "add"}));
    let installed = mock.commands_named("Page.addScriptToEvaluateOnNewDocument");
    assert!(
        installed[0].params["source"]
            .as_str()
            .expect("source")
            .contains(r#"const bindingName = "add";"#)
    );

    mock.inject_session(binding_call("add", 1, json!([2, 3]), 11));

    let settle = mock
        .wait_for(|c| c.method == "Runtime.evaluate" && c.params["contextId"] == json!(11))
        .await;
    let expression = settle.params["expression"].as_str().expect("expression");
    assert!(expression.contains(r#"window["add"]['callbacks'].get(1)(5);"#));
    assert!(expression.contains(r#"window["add"]['errors'].delete(1);"#));

    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_binding_arity_mismatch_rejects() {
    let mock = MockBrowser::start().await;
    let chrome = mock.chrome().await;

    chrome
        .bind_fn("add", |(a, b): (i64, i64)| -> Result<i64> { Ok(a + b) })
        .await
        .expect("bind");

    mock.inject_session(binding_call("add", 4, json!([1]), 12));

    let settle = mock
        .wait_for(|c| c.method == "Runtime.evaluate" && c.params["contextId"] == json!(12))
        .await;
    let expression = settle.params["expression"].as_str().expect("expression");
    assert!(expression.contains(
        r#"window["add"]['errors'].get(4)("function arguments mismatch: expected 2, got 1");"#
    ));

    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_rebinding_swaps_handler_without_reinstalling() {
    let mock = MockBrowser::start().await;
    let chrome = mock.chrome().await;

    chrome
        .bind_fn("calc", |(a, b): (i64, i64)| -> Result<i64> { Ok(a + b) })
        .await
        .expect("bind");
    chrome
        .bind_fn("calc", |(a, b): (i64, i64)| -> Result<i64> { Ok(a * b) })
        .await
        .expect("rebind");

    assert_eq!(mock.commands_named("Runtime.addBinding").len(), 1);
    assert_eq!(mock.commands_named("Page.addScriptToEvaluateOnNewDocument").len(), 1);
    let shim_evals = mock
        .commands_named("Runtime.evaluate")
        .into_iter()
        .filter(|c| {
            c.params["expression"]
                .as_str()
                .is_some_and(|e| e.contains(r#"const bindingName = "calc";"#))
        })
        .count();
    assert_eq!(shim_evals, 1);

    mock.inject_session(binding_call("calc", 1, json!([4, 5]), 21));

    let settle = mock
        .wait_for(|c| c.method == "Runtime.evaluate" && c.params["contextId"] == json!(21))
        .await;
    let expression = settle.params["expression"].as_str().expect("expression");
    assert!(expression.contains(r#"window["calc"]['callbacks'].get(1)(20);"#));

    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_failed_binding_install_can_be_retried() {
    let refuse = Arc::new(AtomicBool::new(true));
    let mock = MockBrowser::with_responder({
        let refuse = Arc::clone(&refuse);
        move |method, params| match method {
            "Runtime.addBinding" if refuse.load(Ordering::SeqCst) => {
                Some(json!({"error": {"code": -32000, "message": "binding refused"}}))
            }
            _ => Some(default_reply(method, params)),
        }
    })
    .await;
    let chrome = mock.chrome().await;

    let err = chrome
        .bind_fn("add", |(a, b): (i64, i64)| -> Result<i64> { Ok(a + b) })
        .await
        .expect_err("refused");
    assert_eq!(err.to_string(), "binding refused");
    assert!(mock.commands_named("Page.addScriptToEvaluateOnNewDocument").is_empty());

    refuse.store(false, Ordering::SeqCst);
    chrome
        .bind_fn("add", |(a, b): (i64, i64)| -> Result<i64> { Ok(a + b) })
        .await
        .expect("retry");
    assert_eq!(mock.commands_named("Runtime.addBinding").len(), 2);
    assert_eq!(mock.commands_named("Page.addScriptToEvaluateOnNewDocument").len(), 1);

    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_unbound_name_is_ignored() {
    let mock = MockBrowser::start().await;
    let chrome = mock.chrome().await;

    mock.inject_session(binding_call("missing", 1, json!([]), 13));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(
        mock.commands()
            .iter()
            .all(|c| c.params["contextId"] != json!(13))
    );
    assert_eq!(chrome.connection().running_bindings(), 0);

    chrome.close().await.expect("close");
}

struct SlowHandler;

#[async_trait]
impl BindingHandler for SlowHandler {
    async fn call(&self, _args: Vec<Value>) -> Result<Value> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn test_no_binding_tasks_survive_close() {
    let mock = MockBrowser::start().await;
    let chrome = mock.chrome().await;

    chrome.bind("slow", SlowHandler).await.expect("bind");
    mock.inject_session(binding_call("slow", 1, json!([]), 14));

    tokio::time::timeout(Duration::from_secs(5), async {
        while chrome.connection().running_bindings() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("handler started");

    chrome.close().await.expect("close");
    assert_eq!(chrome.connection().running_bindings(), 0);
}

// ============================================================================
// Window and navigation
// ============================================================================

#[tokio::test]
async fn test_set_bounds_sends_state_only() {
    let mock = MockBrowser::with_responder(|method, params| match method {
        "Browser.getWindowForTarget" => Some(json!({"result": {
            "windowId": 9,
            "bounds": {"left": 0, "top": 0, "width": 800, "height": 600, "windowState": "normal"}
        }})),
        "Browser.getWindowBounds" => Some(json!({"result": {
            "bounds": {"left": 5, "top": 6, "width": 700, "height": 500, "windowState": "normal"}
        }})),
        _ => Some(default_reply(method, params)),
    })
    .await;
    let chrome = mock.chrome().await;

    chrome
        .set_bounds(Bounds::with_state(WindowState::Maximized))
        .await
        .expect("set bounds");
    chrome
        .set_bounds(Bounds::new(1, 2, 640, 480))
        .await
        .expect("set bounds");

    let sent = mock.commands_named("Browser.setWindowBounds");
    assert_eq!(
        sent[0].params,
        json!({"windowId": 9, "bounds": {"windowState": "maximized"}})
    );
    assert_eq!(
        sent[1].params,
        json!({"windowId": 9, "bounds": {
            "left": 1, "top": 2, "width": 640, "height": 480, "windowState": "normal"
        }})
    );
    assert_eq!(mock.commands_named("Browser.getWindowForTarget").len(), 1);

    let bounds = chrome.bounds().await.expect("bounds");
    assert_eq!(bounds, Bounds::new(5, 6, 700, 500));

    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_back_and_forward_use_history() {
    let mock = MockBrowser::with_responder(|method, params| match method {
        "Page.getNavigationHistory" => Some(json!({"result": {
            "currentIndex": 1,
            "entries": [{"id": 10}, {"id": 11}, {"id": 12}]
        }})),
        _ => Some(default_reply(method, params)),
    })
    .await;
    let chrome = mock.chrome().await;

    chrome.back().await.expect("back");
    chrome.forward().await.expect("forward");

    let entries: Vec<Value> = mock
        .commands_named("Page.navigateToHistoryEntry")
        .into_iter()
        .map(|c| c.params["entryId"].clone())
        .collect();
    assert_eq!(entries, [json!(10), json!(12)]);

    chrome.close().await.expect("close");
}

#[tokio::test]
async fn test_load_html_navigates_to_data_url() {
    let mock = MockBrowser::start().await;
    let chrome = mock.chrome().await;

    chrome.load_html("<h1>Hi</h1>").await.expect("load");

    let navigate = mock.commands_named("Page.navigate");
    assert_eq!(
        navigate[0].params["url"],
        json!("data:text/html,%3Ch1%3EHi%3C%2Fh1%3E")
    );

    chrome.close().await.expect("close");
}
