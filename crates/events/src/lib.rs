#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in deskbuild
//!
//! All orchestration progress flows through events: the resolver, store,
//! builder, and driver emit domain events on an unbounded channel and the
//! CLI (or any other front end) drains the receiver. No crate below the CLI
//! logs or prints directly.

pub mod events;
pub use events::{AppEvent, BuildEvent, GeneralEvent, PatchEvent, ResolverEvent};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout deskbuild
///
/// Implementors hold an optional sender; emission is best-effort and a
/// dropped receiver never fails the operation that emitted.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            let _ = sender.send(event);
        }
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
