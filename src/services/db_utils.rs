use actix::{Actor, Addr, SyncContext};
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

use crate::allocation::BookingPolicy;
use crate::auth::AuthConfig;
use crate::errors::DomainError;
use crate::services::memory_store::MemoryDb;
use crate::services::pg_handling::PgStore;
use crate::services::store::{Store, StoreResult};
use crate::types::PoolInitializationError;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Where the booking data lives.
#[derive(Clone)]
pub enum Backend {
    Postgres(PgPool),
    Memory(MemoryDb),
}

impl Backend {
    /// Runs `work` as one transaction: all of its writes land, or none do.
    pub fn run<T>(&self, work: impl FnOnce(&mut dyn Store) -> StoreResult<T>) -> StoreResult<T> {
        match self {
            Backend::Postgres(pool) => {
                let mut conn = establish_connection(pool)?;
                conn.build_transaction()
                    .run(|trx_conn| work(&mut PgStore(trx_conn)))
            }
            Backend::Memory(db) => db.run(work),
        }
    }

    /// Like [`Backend::run`] for work that only reads.
    pub fn read<T>(&self, work: impl FnOnce(&mut dyn Store) -> StoreResult<T>) -> StoreResult<T> {
        match self {
            Backend::Postgres(_) => self.run(work),
            Backend::Memory(db) => db.read(work),
        }
    }
}

pub struct DbActor(pub Backend);

impl Actor for DbActor {
    type Context = SyncContext<Self>;
}

pub struct AppState {
    pub db: Addr<DbActor>,
    pub redis_db: Option<redis::Client>,
    pub auth: AuthConfig,
    pub policy: BookingPolicy,
    pub layout_ttl_s: u64,
}

pub fn get_db_pool(db_url: &str) -> Result<PgPool, PoolInitializationError> {
    let manager: ConnectionManager<PgConnection> = ConnectionManager::<PgConnection>::new(db_url);
    match Pool::builder().build(manager) {
        Ok(val) => Ok(val),
        Err(err) => Err(PoolInitializationError(err.to_string()))
    }
}

fn establish_connection(pool: &PgPool) -> Result<PooledConnection<ConnectionManager<PgConnection>>, DomainError> {
    pool.get().map_err(|err| {
        tracing::error!(error = %err, "failed to check out a database connection");
        DomainError::from(err)
    })
}
