//! Embedded backend: one redb file, `&str` keys, JSON encoded values.

use super::{run_blocking, StoreError, SubscriberStore};
use crate::domain::{
    format_bound, ChatId, DateRange, LocationFilter, NewQuery, NewSubscriber, Query, Subscriber,
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

/// Subscribers keyed by chat id.
const SUBSCRIBERS: TableDefinition<&str, &[u8]> = TableDefinition::new("subscribers");

/// Saved queries keyed by query id.
const QUERIES: TableDefinition<&str, &[u8]> = TableDefinition::new("queries");

/// Stored form of a [`Query`].
#[derive(serde::Serialize, serde::Deserialize)]
struct QueryRecord {
    id: String,
    chat_id: ChatId,
    refuge: String,
    date_from: String,
    date_to: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl QueryRecord {
    fn into_query(self) -> anyhow::Result<Query> {
        Ok(Query {
            id: self.id,
            chat_id: self.chat_id,
            location: LocationFilter::parse(&self.refuge).map_err(anyhow::Error::msg)?,
            range: DateRange::parse(&self.date_from, &self.date_to).map_err(anyhow::Error::msg)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Opens or creates the database file and its tables. Blocking.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let db = Database::create(path)
            .with_context(|| format!("Failed to open redb file {}", path.display()))?;

        let txn = db.begin_write().context("Failed to begin write transaction")?;
        txn.open_table(SUBSCRIBERS)
            .context("Failed to create subscribers table")?;
        txn.open_table(QUERIES)
            .context("Failed to create queries table")?;
        txn.commit().context("Failed to commit table creation")?;

        Ok(Self { db: Arc::new(db) })
    }
}

fn read_subscriber(db: &Database, chat_id: &str) -> anyhow::Result<Option<Subscriber>> {
    let txn = db.begin_read()?;
    let table = txn.open_table(SUBSCRIBERS)?;
    let value = table.get(chat_id)?;
    value
        .map(|v| serde_json::from_slice(v.value()).context("Corrupt subscriber record"))
        .transpose()
}

/// Reads, changes and writes back one subscriber inside a single write transaction.
/// Nothing is written when `change` fails.
fn modify_subscriber(
    db: &Database,
    chat_id: &str,
    change: impl FnOnce(Option<Subscriber>) -> Result<Subscriber, StoreError>,
) -> Result<Subscriber, StoreError> {
    let txn = db
        .begin_write()
        .context("Failed to begin write transaction")?;
    let subscriber = {
        let mut table = txn
            .open_table(SUBSCRIBERS)
            .context("Failed to open subscribers table")?;
        let existing = match table.get(chat_id).context("Failed to read subscriber")? {
            Some(value) => Some(
                serde_json::from_slice::<Subscriber>(value.value())
                    .context("Corrupt subscriber record")?,
            ),
            None => None,
        };
        let subscriber = change(existing)?;
        let bytes = serde_json::to_vec(&subscriber).context("Failed to encode subscriber")?;
        table
            .insert(chat_id, bytes.as_slice())
            .context("Failed to save subscriber")?;
        subscriber
    };
    txn.commit().context("Failed to commit subscriber")?;
    Ok(subscriber)
}

#[async_trait]
impl SubscriberStore for RedbStore {
    #[tracing::instrument(name = "Upsert subscriber (redb)", skip(self, subscriber), fields(chat_id = %subscriber.chat_id))]
    async fn upsert_subscriber(&self, subscriber: NewSubscriber) -> Result<Subscriber, StoreError> {
        let db = self.db.clone();
        run_blocking(move || {
            let chat_id = subscriber.chat_id.clone();
            modify_subscriber(&db, chat_id.as_ref(), |existing| {
                Ok(subscriber.into_subscriber(existing, Utc::now()))
            })
        })
        .await
    }

    async fn get_subscriber(&self, chat_id: &ChatId) -> Result<Subscriber, StoreError> {
        let db = self.db.clone();
        let chat_id = chat_id.clone();
        run_blocking(move || {
            read_subscriber(&db, chat_id.as_ref())?
                .ok_or_else(|| StoreError::NotFound(chat_id.to_string()))
        })
        .await
    }

    async fn list_active_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        let db = self.db.clone();
        run_blocking(move || {
            let txn = db.begin_read().map_err(anyhow::Error::from)?;
            let table = txn.open_table(SUBSCRIBERS).map_err(anyhow::Error::from)?;
            let mut subscribers = Vec::new();
            for entry in table.iter().map_err(anyhow::Error::from)? {
                let (_, value) = entry.map_err(anyhow::Error::from)?;
                let subscriber: Subscriber =
                    serde_json::from_slice(value.value()).context("Corrupt subscriber record")?;
                if subscriber.is_active {
                    subscribers.push(subscriber);
                }
            }
            subscribers.sort_by_key(|s| s.created_at);
            Ok(subscribers)
        })
        .await
    }

    #[tracing::instrument(name = "Deactivate subscriber (redb)", skip(self))]
    async fn deactivate_subscriber(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        let db = self.db.clone();
        let chat_id = chat_id.clone();
        run_blocking(move || {
            modify_subscriber(&db, chat_id.as_ref(), |existing| {
                let mut subscriber =
                    existing.ok_or_else(|| StoreError::NotFound(chat_id.to_string()))?;
                subscriber.is_active = false;
                subscriber.updated_at = Utc::now();
                Ok(subscriber)
            })?;
            Ok(())
        })
        .await
    }

    #[tracing::instrument(name = "Add query (redb)", skip(self, query), fields(chat_id = %query.chat_id))]
    async fn add_query(&self, query: NewQuery) -> Result<String, StoreError> {
        let db = self.db.clone();
        run_blocking(move || {
            let now = Utc::now();
            let id = query.id_or_generate(now);
            let record = QueryRecord {
                id: id.clone(),
                chat_id: query.chat_id,
                refuge: query.location.as_str().to_string(),
                date_from: format_bound(query.range.from),
                date_to: format_bound(query.range.to),
                created_at: now,
                updated_at: now,
            };
            let bytes = serde_json::to_vec(&record).context("Failed to encode query")?;
            let txn = db.begin_write().map_err(anyhow::Error::from)?;
            {
                let mut table = txn.open_table(QUERIES).map_err(anyhow::Error::from)?;
                table
                    .insert(id.as_str(), bytes.as_slice())
                    .map_err(anyhow::Error::from)?;
            }
            txn.commit().context("Failed to save query")?;
            Ok(id)
        })
        .await
    }

    async fn list_queries(&self, chat_id: &ChatId) -> Result<Vec<Query>, StoreError> {
        let db = self.db.clone();
        let chat_id = chat_id.clone();
        run_blocking(move || {
            let txn = db.begin_read().map_err(anyhow::Error::from)?;
            let table = txn.open_table(QUERIES).map_err(anyhow::Error::from)?;
            let mut queries = Vec::new();
            for entry in table.iter().map_err(anyhow::Error::from)? {
                let (_, value) = entry.map_err(anyhow::Error::from)?;
                let record: QueryRecord =
                    serde_json::from_slice(value.value()).context("Corrupt query record")?;
                if record.chat_id == chat_id {
                    queries.push(record.into_query()?);
                }
            }
            queries.sort_by_key(|q| q.created_at);
            Ok(queries)
        })
        .await
    }
}
