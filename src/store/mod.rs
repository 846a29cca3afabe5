mod postgres_store;
mod redb_store;

use crate::configuration::{Settings, StoreBackend};
use crate::domain::{ChatId, NewQuery, NewSubscriber, Query, Subscriber};
use async_trait::async_trait;
use std::sync::Arc;

pub use postgres_store::PostgresStore;
pub use redb_store::RedbStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No subscriber with chat id {0}.")]
    NotFound(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence for subscribers and their saved queries.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Inserts or overwrites the subscriber keyed by chat id and marks it active.
    async fn upsert_subscriber(&self, subscriber: NewSubscriber) -> Result<Subscriber, StoreError>;

    async fn get_subscriber(&self, chat_id: &ChatId) -> Result<Subscriber, StoreError>;

    /// Active subscribers, oldest first.
    async fn list_active_subscribers(&self) -> Result<Vec<Subscriber>, StoreError>;

    /// Soft delete: the record is kept with `is_active = false`.
    async fn deactivate_subscriber(&self, chat_id: &ChatId) -> Result<(), StoreError>;

    /// Saves a query and returns its id.
    async fn add_query(&self, query: NewQuery) -> Result<String, StoreError>;

    /// Queries of one subscriber, oldest first.
    async fn list_queries(&self, chat_id: &ChatId) -> Result<Vec<Query>, StoreError>;
}

/// Opens the backend selected by `store.backend`.
pub async fn open_store(settings: &Settings) -> Result<Arc<dyn SubscriberStore>, StoreError> {
    let store: Arc<dyn SubscriberStore> = match settings.store.backend {
        StoreBackend::Embedded => {
            let path = settings.store.embedded_path.clone();
            let store = tokio::task::spawn_blocking(move || RedbStore::open(path))
                .await
                .map_err(anyhow::Error::from)??;
            Arc::new(store)
        }
        StoreBackend::Postgres => {
            let connection_string = settings.database.connection_string();
            let store =
                tokio::task::spawn_blocking(move || PostgresStore::connect(&connection_string))
                    .await
                    .map_err(anyhow::Error::from)??;
            Arc::new(store)
        }
    };
    tracing::info!(backend = ?settings.store.backend, "Subscriber store ready");
    Ok(store)
}

/// Runs a blocking store operation off the async executor.
async fn run_blocking<F, T>(operation: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| StoreError::Backend(anyhow::Error::from(e).context("Store task failed.")))?
}
