//! Host functions callable from page script.
//!
//! A binding is exposed to the page as an async function on `window`.
//! Each call returns a promise that the host settles with the handler's
//! result.
//!
//! | Method | Handler contract |
//! |--------|------------------|
//! | [`Chrome::bind`] | `Vec<Value>` in, `Result<Value>` out |
//! | [`Chrome::bind_fn`] | Typed tuple in (checked arity), any `Serialize` out |

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Command, PageCommand, RuntimeCommand};
use crate::transport::BindingHandler;
use crate::transport::bridge::js_string;

use super::Chrome;

// ============================================================================
// Chrome - Bindings
// ============================================================================

impl Chrome {
    /// Exposes `handler` to page script as `window[name]`.
    ///
    /// The binding survives navigation. Binding the same name again
    /// only replaces the handler; the page side is installed once.
    ///
    /// # Example
    ///
    /// ```ignore
    /// chrome.bind("add", |args: Vec<Value>| -> Result<Value> {
    ///     let a = args[0].as_i64().unwrap_or(0);
    ///     let b = args[1].as_i64().unwrap_or(0);
    ///     Ok(json!(a + b))
    /// }).await?;
    ///
    /// assert_eq!(chrome.eval("window.add(2, 3)").await?, json!(5));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the binding or its page shim cannot be installed.
    pub async fn bind<H>(&self, name: &str, handler: H) -> Result<()>
    where
        H: BindingHandler,
    {
        self.bind_handler(name, Arc::new(handler)).await
    }

    /// Exposes a typed function to page script.
    ///
    /// Arguments are decoded into the tuple `A`; a call with the wrong
    /// number of arguments rejects with [`Error::ArgumentMismatch`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// chrome.bind_fn("greet", |(name,): (String,)| -> Result<String> {
    ///     Ok(format!("Hello, {name}"))
    /// }).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// See [`Chrome::bind`].
    pub async fn bind_fn<A, R, F>(&self, name: &str, f: F) -> Result<()>
    where
        A: BindingArgs + 'static,
        R: Serialize + 'static,
        F: Fn(A) -> Result<R> + Send + Sync + 'static,
    {
        self.bind_handler(name, Arc::new(TypedBinding::<A, R, F>::new(f))).await
    }

    async fn bind_handler(&self, name: &str, handler: Arc<dyn BindingHandler>) -> Result<()> {
        if self.inner.connection.register_binding(name, handler) {
            debug!(name, "Binding already installed, handler swapped");
            return Ok(());
        }

        debug!(name, "Installing binding");
        if let Err(e) = self.install_binding(name).await {
            // Leave nothing registered so a later bind retries the install.
            self.inner.connection.unregister_binding(name);
            return Err(e);
        }
        Ok(())
    }

    async fn install_binding(&self, name: &str) -> Result<()> {
        self.execute(Command::Runtime(RuntimeCommand::AddBinding {
            name: name.to_string(),
        }))
        .await?;

        let script = shim_script(name);
        self.execute(Command::Page(PageCommand::AddScriptToEvaluateOnNewDocument {
            source: script.clone(),
        }))
        .await?;
        self.eval(&script).await?;
        Ok(())
    }
}

/// Builds the page script that wraps the raw binding `name`.
///
/// The wrapper allocates a sequence number per call, parks the promise's
/// resolve and reject functions under it, and forwards
/// `{name, seq, args}` as a JSON string.
pub(crate) fn shim_script(name: &str) -> String {
    format!(
        r"(() => {{
  const bindingName = {name};
  const binding = window[bindingName];
  window[bindingName] = async (...args) => {{
    const me = window[bindingName];
    let errors = me['errors'];
    let callbacks = me['callbacks'];
    if (!callbacks) {{
      callbacks = new Map();
      me['callbacks'] = callbacks;
    }}
    if (!errors) {{
      errors = new Map();
      me['errors'] = errors;
    }}
    const seq = (me['lastSeq'] || 0) + 1;
    me['lastSeq'] = seq;
    const promise = new Promise((resolve, reject) => {{
      callbacks.set(seq, resolve);
      errors.set(seq, reject);
    }});
    binding(JSON.stringify({{name: bindingName, seq, args}}));
    return promise;
  }};
}})();",
        name = js_string(name)
    )
}

// ============================================================================
// BindingArgs
// ============================================================================

/// Argument tuples a typed binding can be called with.
pub trait BindingArgs: Sized + Send {
    /// Number of arguments the tuple expects.
    const ARITY: usize;

    /// Decodes call arguments.
    ///
    /// # Errors
    ///
    /// - [`Error::ArgumentMismatch`] if `args.len()` differs from [`Self::ARITY`]
    /// - [`Error::Json`] if an argument has the wrong type
    fn from_args(args: Vec<Value>) -> Result<Self>;
}

macro_rules! impl_binding_args {
    ($arity:expr $(, $ty:ident)*) => {
        impl<$($ty,)*> BindingArgs for ($($ty,)*)
        where
            $($ty: DeserializeOwned + Send,)*
        {
            const ARITY: usize = $arity;

            #[allow(unused_mut, unused_variables)]
            fn from_args(args: Vec<Value>) -> Result<Self> {
                if args.len() != Self::ARITY {
                    return Err(Error::argument_mismatch(Self::ARITY, args.len()));
                }
                let mut args = args.into_iter();
                Ok(($(
                    serde_json::from_value::<$ty>(args.next().unwrap_or_default())?,
                )*))
            }
        }
    };
}

impl_binding_args!(0);
impl_binding_args!(1, A1);
impl_binding_args!(2, A1, A2);
impl_binding_args!(3, A1, A2, A3);
impl_binding_args!(4, A1, A2, A3, A4);
impl_binding_args!(5, A1, A2, A3, A4, A5);
impl_binding_args!(6, A1, A2, A3, A4, A5, A6);

// ============================================================================
// TypedBinding
// ============================================================================

/// Adapts a typed function to [`BindingHandler`].
struct TypedBinding<A, R, F> {
    f: F,
    _marker: PhantomData<fn(A) -> R>,
}

impl<A, R, F> TypedBinding<A, R, F> {
    fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<A, R, F> BindingHandler for TypedBinding<A, R, F>
where
    A: BindingArgs + 'static,
    R: Serialize + 'static,
    F: Fn(A) -> Result<R> + Send + Sync + 'static,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value> {
        let args = A::from_args(args)?;
        let result = (self.f)(args)?;
        Ok(serde_json::to_value(result)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
