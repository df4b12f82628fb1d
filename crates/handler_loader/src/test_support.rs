//! Node-style emitter used by the unit tests

use crate::emitter::TargetEmitter;
use crate::listener::{Invocation, Listener};
use crate::value::{EventName, HandlerResult};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Clone)]
struct Registered {
    listener: Listener,
    once: bool,
}

/// Listener lists per event with append/prepend and self-removing entries
#[derive(Default)]
pub(crate) struct NodeEmitter {
    listeners: Mutex<HashMap<EventName, Vec<Registered>>>,
    registrations: Mutex<Vec<(&'static str, EventName)>>,
    pending: Mutex<Vec<BoxFuture<'static, HandlerResult>>>,
    errors: Mutex<Vec<String>>,
}

impl NodeEmitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn register(&self, method: &'static str, event: EventName, listener: Listener, once: bool, prepend: bool) {
        self.registrations.lock().unwrap().push((method, event.clone()));
        let mut listeners = self.listeners.lock().unwrap();
        let list = listeners.entry(event).or_default();
        let entry = Registered { listener, once };
        if prepend {
            list.insert(0, entry);
        } else {
            list.push(entry);
        }
    }

    /// Registration calls in the order they were made
    pub(crate) fn registrations(&self) -> Vec<(&'static str, EventName)> {
        self.registrations.lock().unwrap().clone()
    }

    pub(crate) fn listener_count(&self, event: impl Into<EventName>) -> usize {
        self.listeners
            .lock()
            .unwrap()
            .get(&event.into())
            .map_or(0, Vec::len)
    }

    /// Call every listener of `event`; once-listeners are removed before they run
    pub(crate) fn emit(&self, event: impl Into<EventName>, args: &[Value]) -> bool {
        let snapshot = {
            let mut listeners = self.listeners.lock().unwrap();
            let Some(list) = listeners.get_mut(&event.into()) else {
                return false;
            };
            let snapshot = list.clone();
            list.retain(|entry| !entry.once);
            snapshot
        };

        for entry in &snapshot {
            match entry.listener.call(args) {
                Invocation::Ready(Ok(())) => {}
                Invocation::Ready(Err(e)) => self.errors.lock().unwrap().push(e.to_string()),
                Invocation::Pending(pending) => self.pending.lock().unwrap().push(pending),
            }
        }
        !snapshot.is_empty()
    }

    /// Await every asynchronous listener started by previous emissions
    pub(crate) async fn settle(&self) {
        let pending = std::mem::take(&mut *self.pending.lock().unwrap());
        for future in pending {
            if let Err(e) = future.await {
                self.errors.lock().unwrap().push(e.to_string());
            }
        }
    }

    /// Errors returned by listeners so far
    pub(crate) fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl TargetEmitter for NodeEmitter {
    fn on(&self, event: EventName, listener: Listener) {
        self.register("on", event, listener, false, false);
    }

    fn add_listener(&self, event: EventName, listener: Listener) {
        self.register("addListener", event, listener, false, false);
    }

    fn once(&self, event: EventName, listener: Listener) {
        self.register("once", event, listener, true, false);
    }

    fn prepend_listener(&self, event: EventName, listener: Listener) {
        self.register("prependListener", event, listener, false, true);
    }

    fn prepend_once_listener(&self, event: EventName, listener: Listener) {
        self.register("prependOnceListener", event, listener, true, true);
    }
}
