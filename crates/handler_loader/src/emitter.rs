//! Capability required from the object handlers are bound onto

use crate::listener::Listener;
use crate::value::EventName;
use std::sync::Arc;

/// An event emitter that exposes the five registration methods.
///
/// The loader never emits events or reads listener lists; it only issues one
/// of these calls per handler. Implementations use interior mutability so a
/// shared reference is enough to register.
pub trait TargetEmitter: Send + Sync {
    /// Append a listener
    fn on(&self, event: EventName, listener: Listener);

    /// Alias of [`on`](Self::on) on most emitters
    fn add_listener(&self, event: EventName, listener: Listener);

    /// Append a listener that removes itself after its first call
    fn once(&self, event: EventName, listener: Listener);

    /// Insert a listener ahead of the existing ones
    fn prepend_listener(&self, event: EventName, listener: Listener);

    /// Insert a self-removing listener ahead of the existing ones
    fn prepend_once_listener(&self, event: EventName, listener: Listener);
}

impl<T: TargetEmitter + ?Sized> TargetEmitter for Arc<T> {
    fn on(&self, event: EventName, listener: Listener) {
        (**self).on(event, listener)
    }

    fn add_listener(&self, event: EventName, listener: Listener) {
        (**self).add_listener(event, listener)
    }

    fn once(&self, event: EventName, listener: Listener) {
        (**self).once(event, listener)
    }

    fn prepend_listener(&self, event: EventName, listener: Listener) {
        (**self).prepend_listener(event, listener)
    }

    fn prepend_once_listener(&self, event: EventName, listener: Listener) {
        (**self).prepend_once_listener(event, listener)
    }
}
