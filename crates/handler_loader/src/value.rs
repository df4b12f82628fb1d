//! Dynamic values carried by handler modules
//!
//! A loaded module exposes its exports as [`PropertyValue`]s. Handler
//! candidates are objects of those values, validated at runtime before they
//! are turned into listeners.

use crate::error::BoxError;
use compact_str::CompactString;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

/// Result returned by every handler function
pub type HandlerResult = Result<(), BoxError>;

type SyncFn = dyn Fn(&[Value]) -> HandlerResult + Send + Sync;
type AsyncFn = dyn Fn(Vec<Value>) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// Unique, non-string event identifier.
///
/// Equality and hashing follow identity only, so two symbols with the same
/// description are still different events.
#[derive(Clone)]
pub struct Symbol {
    id: Uuid,
    description: Option<CompactString>,
}

impl Symbol {
    /// Create a fresh symbol
    pub fn new(description: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.map(CompactString::new),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description.as_deref().unwrap_or(""))
    }
}

/// Event key a handler is bound under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    Name(CompactString),
    Symbol(Symbol),
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventName::Name(name) => f.write_str(name),
            EventName::Symbol(symbol) => write!(f, "{symbol}"),
        }
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        EventName::Name(CompactString::new(name))
    }
}

impl From<Symbol> for EventName {
    fn from(symbol: Symbol) -> Self {
        EventName::Symbol(symbol)
    }
}

/// A handler's `execute` function.
///
/// The variant is fixed when the function is built: `Async` functions are
/// awaited by the listener that wraps them, `Sync` ones never are, even if
/// their result happens to be a future-like value.
#[derive(Clone)]
pub enum Execute {
    Sync(Arc<SyncFn>),
    Async(Arc<AsyncFn>),
}

impl Execute {
    /// Wrap a synchronous function
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        Execute::Sync(Arc::new(f))
    }

    /// Wrap an asynchronous function
    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Execute::Async(Arc::new(
            move |args: Vec<Value>| -> BoxFuture<'static, HandlerResult> { Box::pin(f(args)) },
        ))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Execute::Async(_))
    }
}

impl fmt::Debug for Execute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Execute::Sync(_) => f.write_str("[Function]"),
            Execute::Async(_) => f.write_str("[AsyncFunction]"),
        }
    }
}

/// A single export value or property of a handler module
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Symbol(Symbol),
    List(Vec<PropertyValue>),
    Object(HandlerCandidate),
    Function(Execute),
}

impl PropertyValue {
    /// `null`, `false`, `0`, `NaN` and the empty string
    pub fn is_falsy(&self) -> bool {
        match self {
            PropertyValue::Null => true,
            PropertyValue::Bool(b) => !b,
            PropertyValue::Number(n) => *n == 0.0 || n.is_nan(),
            PropertyValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "boolean",
            PropertyValue::Number(_) => "number",
            PropertyValue::String(_) => "string",
            PropertyValue::Symbol(_) => "symbol",
            PropertyValue::List(_) => "list",
            PropertyValue::Object(_) => "object",
            PropertyValue::Function(_) => "function",
        }
    }

    pub fn as_object(&self) -> Option<&HandlerCandidate> {
        match self {
            PropertyValue::Object(candidate) => Some(candidate),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => f.write_str("null"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::String(s) => write!(f, "{s:?}"),
            PropertyValue::Symbol(symbol) => write!(f, "{symbol}"),
            PropertyValue::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            PropertyValue::Object(candidate) => {
                let keys: Vec<&str> = candidate.keys().collect();
                write!(f, "{{ {} }}", keys.join(", "))
            }
            PropertyValue::Function(execute) => write!(f, "{execute:?}"),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<Symbol> for PropertyValue {
    fn from(value: Symbol) -> Self {
        PropertyValue::Symbol(value)
    }
}

impl From<Execute> for PropertyValue {
    fn from(value: Execute) -> Self {
        PropertyValue::Function(value)
    }
}

impl From<HandlerCandidate> for PropertyValue {
    fn from(value: HandlerCandidate) -> Self {
        PropertyValue::Object(value)
    }
}

/// Object-shaped export tentatively treated as an event handler
#[derive(Debug, Clone, Default)]
pub struct HandlerCandidate {
    properties: BTreeMap<String, PropertyValue>,
}

impl HandlerCandidate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<PropertyValue>) {
        self.properties.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Own-property check
    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
