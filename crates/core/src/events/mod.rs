//! Change events module.
//!
//! Provides the four change-event names the backend pushes and the
//! notification-source trait the synchronizer subscribes through. The live
//! WebSocket client implements the trait; tests use the in-memory source.

mod change_event;
mod source;

pub use change_event::*;
pub use source::*;
