//! Hierarchical variable scope passed down the action tree.
//!
//! A [`Context`] is an immutable chain of frames. Combinators that introduce
//! a binding (a loop variable, a caught fault) derive a child frame scoped to
//! the subtree they drive; the parent is never mutated. Because frames are
//! read-only once published, concurrent branches share ancestor frames
//! without locks.

use crate::error::PerformError;
use std::collections::HashMap;
use std::sync::Arc;

/// Variable name the Attempt combinator binds a caught failure under, so a
/// recovery action can inspect the cause.
pub const FAULT_VAR: &str = "fault";

/// A variable payload: structured data or a caught failure.
#[derive(Debug, Clone)]
pub enum Value {
    Data(serde_json::Value),
    Fault(PerformError),
}

impl Value {
    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Data(data) => Some(data),
            Value::Fault(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(|d| d.as_str())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_data().and_then(|d| d.as_i64())
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_data().and_then(|d| d.as_bool())
    }

    pub fn as_fault(&self) -> Option<&PerformError> {
        match self {
            Value::Fault(err) => Some(err),
            Value::Data(_) => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(data: serde_json::Value) -> Self {
        Value::Data(data)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Data(serde_json::Value::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Data(serde_json::Value::String(s))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Data(serde_json::Value::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Data(serde_json::Value::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Data(serde_json::Value::Bool(b))
    }
}

impl From<PerformError> for Value {
    fn from(err: PerformError) -> Self {
        Value::Fault(err)
    }
}

#[derive(Debug)]
struct Frame {
    vars: HashMap<String, Value>,
    parent: Option<Arc<Frame>>,
}

/// An immutable variable scope with a parent chain.
///
/// Cloning a `Context` is cheap (one `Arc` bump) and shares the frame chain;
/// there is no mutation operation, so shared chains are safe across threads.
#[derive(Debug, Clone)]
pub struct Context {
    frame: Arc<Frame>,
}

impl Context {
    /// The empty root scope.
    pub fn root() -> Self {
        Context {
            frame: Arc::new(Frame {
                vars: HashMap::new(),
                parent: None,
            }),
        }
    }

    /// A root scope with initial bindings.
    pub fn with_vars(bindings: impl IntoIterator<Item = (String, Value)>) -> Self {
        Context {
            frame: Arc::new(Frame {
                vars: bindings.into_iter().collect(),
                parent: None,
            }),
        }
    }

    /// Derive a child scope that additionally binds one variable.
    ///
    /// The receiver is untouched; chain two calls to bind two variables.
    pub fn child(&self, name: impl Into<String>, value: impl Into<Value>) -> Context {
        let mut vars = HashMap::with_capacity(1);
        vars.insert(name.into(), value.into());
        Context {
            frame: Arc::new(Frame {
                vars,
                parent: Some(Arc::clone(&self.frame)),
            }),
        }
    }

    /// Resolve a variable by walking from this scope toward the root.
    ///
    /// An unresolved name is a [`PerformError::Unbound`] failure.
    pub fn value_of(&self, name: &str) -> Result<Value, PerformError> {
        let mut frame = Some(&self.frame);
        while let Some(current) = frame {
            if let Some(value) = current.vars.get(name) {
                return Ok(value.clone());
            }
            frame = current.parent.as_ref();
        }
        Err(PerformError::Unbound(name.to_string()))
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::root()
    }
}
