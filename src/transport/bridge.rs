//! Host side of the page-to-host function bridge.
//!
//! Page code calls an injected wrapper, which forwards
//! `{name, seq, args}` through a raw binding. The dispatcher decodes the
//! call and spawns [`invoke`], which runs the handler and settles the
//! page-side promise by evaluating a small script in the caller's
//! execution context.

// ============================================================================
// Imports
// ============================================================================

use std::mem;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::protocol::{BindingCall, Command, RuntimeCommand};

use super::correlator::Correlator;

// ============================================================================
// BindingHandler
// ============================================================================

/// Host function reachable from page script.
///
/// Arguments arrive as decoded JSON values. `Ok` resolves the page-side
/// promise with the returned value; `Err` rejects it with the error's
/// display text.
///
/// Plain closures implement this trait:
///
/// ```ignore
/// chrome.bind("sum", |args: Vec<Value>| -> Result<Value> {
///     Ok(json!(args.iter().filter_map(Value::as_i64).sum::<i64>()))
/// }).await?;
/// ```
#[async_trait]
pub trait BindingHandler: Send + Sync + 'static {
    /// Handles one call.
    async fn call(&self, args: Vec<Value>) -> Result<Value>;
}

#[async_trait]
impl<F> BindingHandler for F
where
    F: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value> {
        self(args)
    }
}

// ============================================================================
// BindingRegistry
// ============================================================================

/// Registered handlers and their in-flight invocations.
#[derive(Default)]
pub(crate) struct BindingRegistry {
    handlers: Mutex<FxHashMap<String, Arc<dyn BindingHandler>>>,
    tasks: Mutex<JoinSet<()>>,
}

impl BindingRegistry {
    /// Registers `handler` under `name`, replacing any previous one.
    ///
    /// Returns `true` if a handler was replaced.
    pub(crate) fn insert(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn BindingHandler>,
    ) -> bool {
        let name = name.into();
        let replaced = self.handlers.lock().insert(name.clone(), handler).is_some();
        if replaced {
            debug!(name, "Binding handler replaced");
        }
        replaced
    }

    /// Removes the handler for `name`.
    pub(crate) fn remove(&self, name: &str) -> bool {
        self.handlers.lock().remove(name).is_some()
    }

    /// Looks up the handler for `name`.
    pub(crate) fn get(&self, name: &str) -> Option<Arc<dyn BindingHandler>> {
        self.handlers.lock().get(name).cloned()
    }

    /// Spawns an invocation, reaping finished ones first.
    pub(crate) fn spawn(
        &self,
        handler: Arc<dyn BindingHandler>,
        call: BindingCall,
        correlator: Correlator,
    ) {
        let mut tasks = self.tasks.lock();
        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished
                && e.is_panic()
            {
                warn!(error = %e, "Binding task panicked");
            }
        }
        tasks.spawn(invoke(handler, call, correlator));
    }

    /// Returns the number of invocations not yet reaped.
    pub(crate) fn running(&self) -> usize {
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    /// Aborts every in-flight invocation without waiting.
    pub(crate) fn abort_all(&self) {
        self.tasks.lock().abort_all();
    }

    /// Aborts every in-flight invocation and waits for them to finish.
    pub(crate) async fn shutdown(&self) {
        let mut tasks = mem::take(&mut *self.tasks.lock());
        tasks.shutdown().await;
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// Runs one binding call and settles the page-side promise.
pub(crate) async fn invoke(
    handler: Arc<dyn BindingHandler>,
    call: BindingCall,
    correlator: Correlator,
) {
    trace!(name = %call.name, seq = call.seq, args = call.args.len(), "Binding invoked");

    let outcome = handler.call(call.args).await;
    if let Err(e) = &outcome {
        debug!(name = %call.name, seq = call.seq, error = %e, "Binding returned error");
    }

    let script = settle_script(&call.name, call.seq, &outcome);
    let command = Command::Runtime(RuntimeCommand::evaluate_in(script, call.context_id));
    if let Err(e) = correlator.execute(command).await {
        warn!(name = %call.name, seq = call.seq, error = %e, "Failed to settle binding call");
    }
}

/// Builds the script that resolves or rejects call `seq` of binding `name`.
///
/// Any error rejects, including one with an empty message.
pub(crate) fn settle_script(name: &str, seq: u64, outcome: &Result<Value>) -> String {
    let binding = format!("window[{}]", js_string(name));
    let settle = match outcome {
        Ok(value) => format!("{binding}['callbacks'].get({seq})({value});"),
        Err(e) => format!(
            "{binding}['errors'].get({seq})({});",
            js_string(&e.to_string())
        ),
    };

    format!(
        "{settle} \
         {binding}['callbacks'].delete({seq}); \
         {binding}['errors'].delete({seq});"
    )
}

/// Quotes `s` as a JavaScript string literal.
#[inline]
pub(crate) fn js_string(s: &str) -> String {
    Value::from(s).to_string()
}

// ============================================================================
// Tests
// ============================================================================
