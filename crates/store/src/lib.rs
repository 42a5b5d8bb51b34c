pub mod learning;
pub mod messages;
pub mod model;
pub mod sessions;
pub mod skills;
pub mod tasks;

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

fn map_sqlx(e: sqlx::Error) -> acontext_domain::Error {
    match &e {
        sqlx::Error::RowNotFound => acontext_domain::Error::NotFound(e.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            acontext_domain::Error::Conflict(db.to_string())
        }
        _ => acontext_domain::Error::Transient(e.to_string()),
    }
}

/// Owns the connection pool. Reads that don't need transactional scope (the
/// distillation consumer, each skill-agent iteration's "fresh DB session")
/// go straight through `pool()`; writes that must be atomic go through
/// `begin()`.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub async fn connect(database_url: &str, max_connections: u32) -> acontext_domain::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(map_sqlx)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Opens the single transaction that backs one task-agent iteration
    /// (§4.2.3): every tool-call effect in that iteration is dispatched
    /// against this same handle.
    pub async fn begin(&self) -> acontext_domain::Result<Tx<'_>> {
        let inner = self.pool.begin().await.map_err(map_sqlx)?;
        Ok(Tx { inner })
    }
}

pub struct Tx<'c> {
    inner: Transaction<'c, Postgres>,
}

impl<'c> Tx<'c> {
    pub async fn commit(self) -> acontext_domain::Result<()> {
        self.inner.commit().await.map_err(map_sqlx)
    }

    pub async fn rollback(self) -> acontext_domain::Result<()> {
        self.inner.rollback().await.map_err(map_sqlx)
    }

    /// Borrow the underlying connection to pass as an executor to the repo
    /// functions in `tasks`/`messages`/`skills`/`learning`.
    pub fn conn(&mut self) -> &mut sqlx::PgConnection {
        &mut self.inner
    }
}
