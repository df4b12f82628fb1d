//! Listener adapter
//!
//! Wraps a validated `execute` function into the callback that is handed to
//! the target emitter.

use crate::value::{Execute, HandlerResult};
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Callback registered on a [`TargetEmitter`](crate::emitter::TargetEmitter).
///
/// Prepended arguments are shared by every listener created in the same load
/// call and always come before the emitted ones.
#[derive(Clone)]
pub struct Listener {
    execute: Execute,
    prepend_args: Arc<[Value]>,
}

/// Outcome of calling a [`Listener`]
pub enum Invocation {
    /// A synchronous function already ran
    Ready(HandlerResult),
    /// An asynchronous function is running; the emitter decides whether to await it
    Pending(BoxFuture<'static, HandlerResult>),
}

impl Invocation {
    pub fn is_pending(&self) -> bool {
        matches!(self, Invocation::Pending(_))
    }

    /// Wait for the handler to finish
    pub async fn settle(self) -> HandlerResult {
        match self {
            Invocation::Ready(result) => result,
            Invocation::Pending(pending) => pending.await,
        }
    }
}

impl Listener {
    /// Build a listener around `execute`
    pub fn new(execute: Execute, prepend_args: Arc<[Value]>) -> Self {
        Self {
            execute,
            prepend_args,
        }
    }

    /// Whether calls return [`Invocation::Pending`]
    pub fn is_async(&self) -> bool {
        self.execute.is_async()
    }

    /// Invoke the handler with the arguments of one emission
    pub fn call(&self, args: &[Value]) -> Invocation {
        match &self.execute {
            Execute::Sync(f) if self.prepend_args.is_empty() => Invocation::Ready(f(args)),
            Execute::Sync(f) => Invocation::Ready(f(&self.merge(args))),
            Execute::Async(f) => Invocation::Pending(f(self.merge(args))),
        }
    }

    fn merge(&self, args: &[Value]) -> Vec<Value> {
        let mut merged = Vec::with_capacity(self.prepend_args.len() + args.len());
        merged.extend_from_slice(&self.prepend_args);
        merged.extend_from_slice(args);
        merged
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("execute", &self.execute)
            .field("prepend_args", &self.prepend_args.len())
            .finish()
    }
}
