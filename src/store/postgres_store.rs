use super::{run_blocking, StoreError, SubscriberStore};
use crate::domain::{ChatId, NewQuery, NewSubscriber, Plan, Query, Subscriber};
use crate::models::{NewQueryRow, NewSubscriberRow, QueryRow, SubscriberRow};
use crate::schema::{subscribers, subscription_queries};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use secrecy::{ExposeSecret, Secret};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

type PgPool = Pool<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Builds the pool and applies pending migrations. Blocking.
    pub fn connect(connection_string: &Secret<String>) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(connection_string.expose_secret());
        let pool = Pool::builder()
            .build(manager)
            .context("Failed to connect to Postgres")?;
        let mut conn = pool.get().context("Failed to check out a connection")?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!(e).context("Failed to migrate the database"))?;
        Ok(Self { pool })
    }

    fn conn(pool: &PgPool) -> anyhow::Result<PooledConnection<ConnectionManager<PgConnection>>> {
        pool.get().context("Failed to check out a connection")
    }
}

fn into_subscriber(row: SubscriberRow) -> anyhow::Result<Subscriber> {
    Subscriber::try_from(row).map_err(anyhow::Error::msg)
}

fn into_query(row: QueryRow) -> anyhow::Result<Query> {
    Query::try_from(row).map_err(anyhow::Error::msg)
}

#[async_trait]
impl SubscriberStore for PostgresStore {
    #[tracing::instrument(name = "Upsert subscriber (postgres)", skip(self, subscriber), fields(chat_id = %subscriber.chat_id))]
    async fn upsert_subscriber(&self, subscriber: NewSubscriber) -> Result<Subscriber, StoreError> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut conn = Self::conn(&pool)?;
            let now = Utc::now();
            let row = diesel::insert_into(subscribers::table)
                .values(NewSubscriberRow {
                    chat_id: subscriber.chat_id.as_ref(),
                    username: subscriber.username.as_deref(),
                    first_name: subscriber.first_name.as_deref(),
                    last_name: subscriber.last_name.as_deref(),
                    language: subscriber.language.as_str(),
                    plan: Plan::Free.as_str(),
                    is_active: true,
                    created_at: &now,
                    updated_at: &now,
                })
                .on_conflict(subscribers::chat_id)
                .do_update()
                .set((
                    subscribers::username.eq(excluded(subscribers::username)),
                    subscribers::first_name.eq(excluded(subscribers::first_name)),
                    subscribers::last_name.eq(excluded(subscribers::last_name)),
                    subscribers::language.eq(excluded(subscribers::language)),
                    subscribers::is_active.eq(true),
                    subscribers::updated_at.eq(excluded(subscribers::updated_at)),
                ))
                .returning(SubscriberRow::as_returning())
                .get_result(&mut conn)
                .context("Failed to upsert subscriber")?;
            Ok(into_subscriber(row)?)
        })
        .await
    }

    async fn get_subscriber(&self, chat_id: &ChatId) -> Result<Subscriber, StoreError> {
        let pool = self.pool.clone();
        let chat_id = chat_id.clone();
        run_blocking(move || {
            let mut conn = Self::conn(&pool)?;
            let row = subscribers::table
                .find(chat_id.as_ref())
                .select(SubscriberRow::as_select())
                .first(&mut conn)
                .optional()
                .context("Failed to load subscriber")?
                .ok_or_else(|| StoreError::NotFound(chat_id.to_string()))?;
            Ok(into_subscriber(row)?)
        })
        .await
    }

    async fn list_active_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut conn = Self::conn(&pool)?;
            let rows = subscribers::table
                .filter(subscribers::is_active.eq(true))
                .order(subscribers::created_at.asc())
                .select(SubscriberRow::as_select())
                .load(&mut conn)
                .context("Failed to list subscribers")?;
            Ok(rows
                .into_iter()
                .map(into_subscriber)
                .collect::<anyhow::Result<Vec<_>>>()?)
        })
        .await
    }

    #[tracing::instrument(name = "Deactivate subscriber (postgres)", skip(self))]
    async fn deactivate_subscriber(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let chat_id = chat_id.clone();
        run_blocking(move || {
            let mut conn = Self::conn(&pool)?;
            let updated = diesel::update(subscribers::table.find(chat_id.as_ref()))
                .set((
                    subscribers::is_active.eq(false),
                    subscribers::updated_at.eq(Utc::now()),
                ))
                .execute(&mut conn)
                .context("Failed to deactivate subscriber")?;
            match updated {
                0 => Err(StoreError::NotFound(chat_id.to_string())),
                _ => Ok(()),
            }
        })
        .await
    }

    #[tracing::instrument(name = "Add query (postgres)", skip(self, query), fields(chat_id = %query.chat_id))]
    async fn add_query(&self, query: NewQuery) -> Result<String, StoreError> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut conn = Self::conn(&pool)?;
            let now = Utc::now();
            let id = query.id_or_generate(now);
            diesel::insert_into(subscription_queries::table)
                .values(NewQueryRow {
                    id: &id,
                    chat_id: query.chat_id.as_ref(),
                    refuge: query.location.as_str(),
                    date_from: query.range.from,
                    date_to: query.range.to,
                    created_at: &now,
                    updated_at: &now,
                })
                .execute(&mut conn)
                .context("Failed to save query")?;
            Ok(id)
        })
        .await
    }

    async fn list_queries(&self, chat_id: &ChatId) -> Result<Vec<Query>, StoreError> {
        let pool = self.pool.clone();
        let chat_id = chat_id.clone();
        run_blocking(move || {
            let mut conn = Self::conn(&pool)?;
            let rows = subscription_queries::table
                .filter(subscription_queries::chat_id.eq(chat_id.as_ref()))
                .order(subscription_queries::created_at.asc())
                .select(QueryRow::as_select())
                .load(&mut conn)
                .context("Failed to list queries")?;
            Ok(rows
                .into_iter()
                .map(into_query)
                .collect::<anyhow::Result<Vec<_>>>()?)
        })
        .await
    }
}
