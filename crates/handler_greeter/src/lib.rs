//! Sample handler module built as a dynamic library.
//!
//! Exports four handlers:
//!
//! - default: greets every `player_connected` event
//! - `eventHandler`: answers `player_chat` asynchronously
//! - `farewell`: runs once, ahead of other `shutdown` listeners
//! - `announcement`: relays the next `server_announcement`, failing when it
//!   carries no text

use handler_loader::{
    export_handler_module, Execute, HandlerCandidate, HandlerResult, ModuleNamespace,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Player name from the first object argument, if any
fn player_name(args: &[Value]) -> &str {
    args.iter()
        .find_map(|arg| arg.get("name").and_then(Value::as_str))
        .unwrap_or("stranger")
}

fn greeter() -> HandlerCandidate {
    let welcome_count = Arc::new(AtomicU32::new(0));
    HandlerCandidate::new()
        .with("name", "player_connected")
        .with(
            "execute",
            Execute::sync(move |args| {
                let count = welcome_count.fetch_add(1, Ordering::Relaxed) + 1;
                info!("👋 Welcome, {}! (player #{})", player_name(args), count);
                Ok(())
            }),
        )
}

fn chat_responder() -> HandlerCandidate {
    HandlerCandidate::new()
        .with("name", "player_chat")
        .with(
            "execute",
            Execute::asynchronous(|args: Vec<Value>| async move {
                let message = args
                    .iter()
                    .find_map(|arg| arg.get("message").and_then(Value::as_str))
                    .ok_or("chat event without a message")?;
                debug!("💬 {} said: {}", player_name(&args), message);
                HandlerResult::Ok(())
            }),
        )
}

fn farewell() -> HandlerCandidate {
    HandlerCandidate::new()
        .with("name", "shutdown")
        .with("isOnce", true)
        .with("isPrepend", true)
        .with(
            "execute",
            Execute::sync(|_| {
                info!("👋 Goodbye from the greeter module");
                Ok(())
            }),
        )
}

fn announcement() -> HandlerCandidate {
    HandlerCandidate::new()
        .with("name", "server_announcement")
        .with("isOnce", true)
        .with(
            "execute",
            Execute::sync(|args| {
                let text = args
                    .iter()
                    .find_map(|arg| arg.get("text").and_then(Value::as_str))
                    .ok_or_else(|| format!("announcement without text ({} argument(s))", args.len()))?;
                info!("📢 {}", text);
                Ok(())
            }),
        )
}

/// Namespace handed to the loader
pub fn module() -> ModuleNamespace {
    ModuleNamespace::new()
        .with_default(greeter())
        .with_export("eventHandler", chat_responder())
        .with_export("farewell", farewell())
        .with_export("announcement", announcement())
}

export_handler_module!(module);
