//! Todo Dashboard Client - HTTP transport for the dashboard read API.
//!
//! Reads whole collections from `GET {base_url}/dashboard/{collection}` and
//! plugs into the core as a [`CollectionSource`](todo_dashboard_core::CollectionSource).
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use todo_dashboard_client::DashboardClient;
//! use todo_dashboard_core::DataFetcher;
//!
//! let client = DashboardClient::new("http://localhost:3000")?;
//! let fetcher = DataFetcher::new(Arc::new(client));
//! let snapshot = fetcher.fetch_snapshot().await?;
//! ```

mod client;
mod error;

pub use client::{DashboardClient, DEFAULT_TIMEOUT};
pub use error::{ClientError, Result};
