use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{redact_workspace, Collection, CollectionSource, Member, Snapshot, Task, Team, Workspace};
use crate::errors::{Result, TransportError};

/// Typed reads of the four dashboard collections.
///
/// This is the redaction boundary: workspace records are stripped of their
/// secrets here, before decoding, so nothing past the fetcher can observe
/// them.
#[derive(Clone)]
pub struct DataFetcher {
    source: Arc<dyn CollectionSource>,
}

impl DataFetcher {
    pub fn new(source: Arc<dyn CollectionSource>) -> Self {
        Self { source }
    }

    pub async fn fetch_teams(&self) -> Result<Vec<Team>> {
        self.fetch_typed(Collection::Teams, |record| record).await
    }

    pub async fn fetch_members(&self) -> Result<Vec<Member>> {
        self.fetch_typed(Collection::Members, |record| record).await
    }

    pub async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        self.fetch_typed(Collection::Tasks, |record| record).await
    }

    pub async fn fetch_workspaces(&self) -> Result<Vec<Workspace>> {
        self.fetch_typed(Collection::Workspaces, redact_workspace)
            .await
    }

    /// Fetches all four collections concurrently.
    ///
    /// Either every collection arrives and a complete snapshot is returned,
    /// or the first failure is returned and all other results are dropped.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let (teams, members, tasks, workspaces) = futures::try_join!(
            self.fetch_teams(),
            self.fetch_members(),
            self.fetch_tasks(),
            self.fetch_workspaces(),
        )?;

        Ok(Snapshot {
            teams,
            members,
            tasks,
            workspaces,
        })
    }

    async fn fetch_typed<T, F>(&self, collection: Collection, prepare: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(Value) -> Value,
    {
        let records = self.source.fetch_collection(collection).await?;
        debug!("Fetched {} {} record(s)", records.len(), collection);

        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                if !record.is_object() {
                    return Err(TransportError::decode(
                        collection,
                        format!("element {} is not an object", index),
                    ));
                }
                serde_json::from_value(prepare(record)).map_err(|e| {
                    TransportError::decode(collection, format!("element {}: {}", index, e))
                })
            })
            .collect()
    }
}
