//! Script bridge: host functions exposed to page script as promises.
//!
//! Page script calls a bound name, which posts
//! `{"id": <seq>, "method": <name>, "params": [...]}` to the host. The host
//! looks the name up, decodes each parameter into the bound function's
//! argument type, runs it and answers with a resolve or reject script keyed
//! by the same sequence number.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("unknown method {0:?}")]
    UnknownMethod(String),

    #[error("function arguments mismatch: expected {expected}, got {got}")]
    ArgumentMismatch { expected: Arity, got: usize },

    #[error("argument {index} is invalid: {message}")]
    InvalidArgument { index: usize, message: String },

    #[error("result could not be serialized: {0}")]
    Serialize(String),

    /// The bound function itself reported an error.
    #[error("{0}")]
    Host(String),

    #[error("malformed message: {0}")]
    Malformed(String),
}

/// How many parameters a binding accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub required: usize,
    /// Accept any number of extra trailing parameters.
    pub variadic: bool,
}

impl Arity {
    pub const fn exactly(required: usize) -> Self {
        Self {
            required,
            variadic: false,
        }
    }

    pub const fn at_least(required: usize) -> Self {
        Self {
            required,
            variadic: true,
        }
    }

    pub fn accepts(&self, supplied: usize) -> bool {
        if self.variadic {
            supplied >= self.required
        } else {
            supplied == self.required
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variadic {
            write!(f, "at least {}", self.required)
        } else {
            write!(f, "{}", self.required)
        }
    }
}

/// Conversion of a host function's return value into the promise outcome.
///
/// `()` resolves to `null`, plain values resolve to their JSON form, and
/// `Result<T, E>` resolves with `T` or rejects with `E`'s message.
pub trait IntoReply {
    fn into_reply(self) -> Result<Value, BridgeError>;
}

fn to_json<T: Serialize>(value: T) -> Result<Value, BridgeError> {
    serde_json::to_value(value).map_err(|e| BridgeError::Serialize(e.to_string()))
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Value, BridgeError> {
        Ok(Value::Null)
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> Result<Value, BridgeError> {
        Ok(self)
    }
}

macro_rules! impl_into_reply {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReply for $ty {
                fn into_reply(self) -> Result<Value, BridgeError> {
                    to_json(self)
                }
            }
        )*
    };
}

impl_into_reply!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, char, String,
    &'static str,
);

impl<T: Serialize> IntoReply for Vec<T> {
    fn into_reply(self) -> Result<Value, BridgeError> {
        to_json(self)
    }
}

impl<T: Serialize> IntoReply for Option<T> {
    fn into_reply(self) -> Result<Value, BridgeError> {
        to_json(self)
    }
}

impl<T: Serialize> IntoReply for HashMap<String, T> {
    fn into_reply(self) -> Result<Value, BridgeError> {
        to_json(self)
    }
}

impl<T: Serialize> IntoReply for BTreeMap<String, T> {
    fn into_reply(self) -> Result<Value, BridgeError> {
        to_json(self)
    }
}

/// Wraps any serializable value, such as a user-defined struct.
pub struct Json<T>(pub T);

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Result<Value, BridgeError> {
        to_json(self.0)
    }
}

impl<T: Serialize, E: fmt::Display> IntoReply for Result<T, E> {
    fn into_reply(self) -> Result<Value, BridgeError> {
        match self {
            Ok(value) => to_json(value),
            Err(e) => Err(BridgeError::Host(e.to_string())),
        }
    }
}

fn decode<T: DeserializeOwned>(index: usize, value: Value) -> Result<T, BridgeError> {
    serde_json::from_value(value).map_err(|e| BridgeError::InvalidArgument {
        index,
        message: e.to_string(),
    })
}

/// A host function callable with positional JSON parameters.
///
/// Implemented for closures of up to six arguments whose parameters are
/// deserializable and whose return type implements [`IntoReply`].
pub trait HostFunction<Args>: Send + Sync + 'static {
    const ARITY: usize;

    /// Call with exactly `ARITY` parameters.
    fn invoke(&self, params: Vec<Value>) -> Result<Value, BridgeError>;
}

macro_rules! count {
    () => { 0usize };
    ($head:tt $($tail:tt)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_host_function {
    ($($ty:ident $var:ident $idx:tt),*) => {
        impl<F, R, $($ty,)*> HostFunction<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: IntoReply,
            $($ty: DeserializeOwned,)*
        {
            const ARITY: usize = count!($($idx)*);

            #[allow(unused_mut, unused_variables)]
            fn invoke(&self, params: Vec<Value>) -> Result<Value, BridgeError> {
                let mut params = params.into_iter();
                $(
                    let $var: $ty = decode($idx, params.next().unwrap_or(Value::Null))?;
                )*
                (self)($($var),*).into_reply()
            }
        }
    };
}

impl_host_function!();
impl_host_function!(A0 a0 0);
impl_host_function!(A0 a0 0, A1 a1 1);
impl_host_function!(A0 a0 0, A1 a1 1, A2 a2 2);
impl_host_function!(A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3);
impl_host_function!(A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4);
impl_host_function!(A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5);

type Handler = Box<dyn Fn(Vec<Value>) -> Result<Value, BridgeError> + Send + Sync>;

/// A host function adapted to the uniform JSON calling convention.
pub struct Binding {
    arity: Arity,
    handler: Handler,
}

impl Binding {
    /// Adapt a typed closure, e.g. `Binding::new(|a: i64, b: i64| a + b)`.
    pub fn new<F, Args>(f: F) -> Self
    where
        F: HostFunction<Args>,
        Args: 'static,
    {
        Self {
            arity: Arity::exactly(F::ARITY),
            handler: Box::new(move |params| f.invoke(params)),
        }
    }

    /// Accept any number of parameters of one type.
    pub fn variadic<T, R, F>(f: F) -> Self
    where
        T: DeserializeOwned,
        R: IntoReply,
        F: Fn(Vec<T>) -> R + Send + Sync + 'static,
    {
        Self {
            arity: Arity::at_least(0),
            handler: Box::new(move |params| {
                let args = params
                    .into_iter()
                    .enumerate()
                    .map(|(index, value)| decode(index, value))
                    .collect::<Result<Vec<T>, _>>()?;
                f(args).into_reply()
            }),
        }
    }

    /// Take the raw parameter list.
    pub fn raw<F>(arity: Arity, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, BridgeError> + Send + Sync + 'static,
    {
        Self {
            arity,
            handler: Box::new(f),
        }
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn call(&self, params: Vec<Value>) -> Result<Value, BridgeError> {
        if !self.arity.accepts(params.len()) {
            return Err(BridgeError::ArgumentMismatch {
                expected: self.arity,
                got: params.len(),
            });
        }
        (self.handler)(params)
    }
}

/// A call posted by page script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcCall {
    pub id: i64,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// Page-to-host messages that are not RPC calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    Navigate {
        url: String,
    },
    StateChange {
        #[serde(default)]
        loading: bool,
        #[serde(default)]
        url: String,
        #[serde(default)]
        title: String,
    },
}

/// Anything the page may post to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Rpc(RpcCall),
    Control(ControlMessage),
}

impl Inbound {
    pub fn parse(text: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(text).map_err(|e| BridgeError::Malformed(e.to_string()))
    }
}

/// The outcome of one call, ready to be sent back to the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub id: i64,
    pub outcome: Result<Value, BridgeError>,
}

impl Reply {
    /// Script settling the page-side promise and releasing its slot.
    pub fn script(&self) -> String {
        let id = self.id;
        match &self.outcome {
            Ok(value) => format!(
                "window._rpc[{id}].resolve({value}); window._rpc[{id}] = undefined"
            ),
            Err(e) => format!(
                "window._rpc[{id}].reject({}); window._rpc[{id}] = undefined",
                Value::String(e.to_string())
            ),
        }
    }
}

/// Init script defining `window[name]` as a promise-returning stub.
pub fn binding_stub(name: &str) -> String {
    format!(
        r#"(function() {{ var name = {};
    var RPC = window._rpc = (window._rpc || {{nextSeq: 1}});
    window[name] = function() {{
        var seq = RPC.nextSeq++;
        var promise = new Promise(function(resolve, reject) {{
            RPC[seq] = {{ resolve: resolve, reject: reject }};
        }});
        window.external.invoke(JSON.stringify({{
            id: seq,
            method: name,
            params: Array.prototype.slice.call(arguments),
        }}));
        return promise;
    }};
}})()"#,
        Value::String(name.to_string())
    )
}

/// Name to binding table for one window.
#[derive(Default)]
pub struct ScriptBridge {
    bindings: Mutex<HashMap<String, Arc<Binding>>>,
}

impl ScriptBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether an existing binding was replaced.
    pub fn bind(&self, name: &str, binding: Binding) -> bool {
        debug!("Binding {} ({} params)", name, binding.arity());
        self.bindings
            .lock()
            .insert(name.to_string(), Arc::new(binding))
            .is_some()
    }

    pub fn unbind(&self, name: &str) -> bool {
        self.bindings.lock().remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.lock().contains_key(name)
    }

    pub fn clear(&self) {
        self.bindings.lock().clear();
    }

    /// Run a call. The binding executes without the table locked, so it may
    /// bind or unbind names itself.
    pub fn invoke(&self, call: RpcCall) -> Reply {
        let binding = self.bindings.lock().get(&call.method).cloned();
        let outcome = match binding {
            Some(binding) => binding.call(call.params),
            None => Err(BridgeError::UnknownMethod(call.method.clone())),
        };
        if let Err(e) = &outcome {
            warn!("Call {} to {} failed: {}", call.id, call.method, e);
        }
        Reply {
            id: call.id,
            outcome,
        }
    }
}
