//! Dashboard state synchronization.
//!
//! The [`Synchronizer`] owns the snapshot the presentation layer renders and
//! decides when it is reloaded:
//!
//! ```text
//!            mount / change event
//!   Idle ─────────────────────────► Refreshing ──all four ok──► Idle
//!    ▲                                  │  ▲
//!    │                         any fail │  │ change event
//!    │                                  ▼  │
//!    └──────── next success ───────── Degraded
//! ```
//!
//! At most one reload cycle is in flight. Triggers that arrive while one is
//! running set a single rerun flag, so any burst of events costs exactly one
//! extra cycle after the current one completes.

mod mount;
mod sync_model;
mod synchronizer;

#[cfg(test)]
mod tests;

pub use mount::DashboardMount;
pub use sync_model::{DashboardState, ReloadOutcome, SyncStatus};
pub use synchronizer::Synchronizer;
