//! Todo Dashboard Core - data model, fetching, and live-refresh synchronization.
//!
//! This crate owns everything the dashboard knows about its backend without
//! depending on a concrete transport. The HTTP transport lives in
//! `todo-dashboard-client` and the push channel in `todo-dashboard-live`;
//! both plug into the traits defined here.
//!
//! # Architecture
//!
//! ```text
//! CollectionSource ──► DataFetcher ──► Synchronizer ──► watch::Receiver<DashboardState>
//!  (HTTP transport)    (redaction,        ▲  (coalesced reloads)        (presentation)
//!                       typed decode)     │
//!                             NotificationSource (change events)
//! ```

pub mod constants;
pub mod dashboard;
pub mod errors;
pub mod events;
pub mod sync;

pub use dashboard::*;
pub use events::*;
pub use sync::*;

// Re-export error types
pub use errors::{MalformedRecord, TransportError};
