//! Binding validated handlers onto a target emitter

use crate::emitter::TargetEmitter;
use crate::error::BoxError;
use crate::listener::Listener;
use crate::validate::NormalizedHandler;
use crate::value::PropertyValue;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Registration method chosen for a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindMethod {
    On,
    Once,
    PrependListener,
    PrependOnceListener,
}

impl BindMethod {
    /// Pick the registration method for a pair of flags
    pub fn select(once: bool, prepend: bool) -> Self {
        match (once, prepend) {
            (true, true) => BindMethod::PrependOnceListener,
            (true, false) => BindMethod::Once,
            (false, true) => BindMethod::PrependListener,
            (false, false) => BindMethod::On,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BindMethod::On => "on",
            BindMethod::Once => "once",
            BindMethod::PrependListener => "prependListener",
            BindMethod::PrependOnceListener => "prependOnceListener",
        }
    }
}

impl fmt::Display for BindMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Register `listener` on `target` with exactly one registration call
pub fn bind<T>(target: &T, handler: &NormalizedHandler, listener: Listener) -> BindMethod
where
    T: TargetEmitter + ?Sized,
{
    let method = BindMethod::select(handler.once, handler.prepend);
    let event = handler.event_name.clone();
    match method {
        BindMethod::PrependOnceListener => target.prepend_once_listener(event, listener),
        BindMethod::Once => target.once(event, listener),
        BindMethod::PrependListener => target.prepend_listener(event, listener),
        BindMethod::On => target.on(event, listener),
    }
    method
}

/// Replaces validation and binding for every handler candidate.
///
/// The loader awaits the override once per candidate and never looks at the
/// candidate itself.
#[async_trait]
pub trait BindOverride<T: ?Sized + Sync>: Send + Sync {
    async fn bind(
        &self,
        target: &T,
        candidate: PropertyValue,
        source: &Path,
        prepend_args: &[Value],
    ) -> Result<(), BoxError>;
}

/// Adapts a synchronous closure into a [`BindOverride`]
pub struct FnOverride<F>(pub F);

#[async_trait]
impl<T, F> BindOverride<T> for FnOverride<F>
where
    T: ?Sized + Sync,
    F: Fn(&T, PropertyValue, &Path, &[Value]) -> Result<(), BoxError> + Send + Sync,
{
    async fn bind(
        &self,
        target: &T,
        candidate: PropertyValue,
        source: &Path,
        prepend_args: &[Value],
    ) -> Result<(), BoxError> {
        (self.0)(target, candidate, source, prepend_args)
    }
}
