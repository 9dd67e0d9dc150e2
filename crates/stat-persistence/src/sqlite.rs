//! `KeyValueStore` durable sobre SQLite (Diesel + r2d2).
//!
//! - Una fila por clave en `kv_entries`; el valor es JSON serializado.
//! - `replace_prefix` y `remove_many` corren en una transacción `IMMEDIATE`
//!   (todo o nada).
//! - Errores transitorios (`database is locked`, pool) se reintentan con
//!   backoff corto.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use serde_json::Value;

use crate::config::DbConfig;
use crate::error::StorageError;
use crate::kv::KeyValueStore;
use crate::migrations::run_pending_migrations;
use crate::schema::kv_entries;

pub type SqlitePool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type SqlitePooledConnection = r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;

/// Proveedor abstracto de conexiones (inyectable en tests).
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<SqlitePooledConnection, StorageError>;
}

pub struct PoolProvider {
    pub pool: SqlitePool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<SqlitePooledConnection, StorageError> {
        self.pool.get().map_err(|e| StorageError::TransientIo(format!("pool error: {e}")))
    }
}

/// PRAGMAs por conexión: espera ante bloqueo y WAL para lectores concurrentes.
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .map_err(r2d2::Error::QueryError)
    }
}

fn is_retryable(e: &StorageError) -> bool {
    match e {
        StorageError::TransientIo(_) => true,
        StorageError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("database is locked") || m.contains("database table is locked") || m.contains("busy")
        }
        _ => false,
    }
}

/// Hasta 3 reintentos con backoff de 15, 30 y 45 ms.
fn with_retry<F, T>(mut f: F) -> Result<T, StorageError>
    where F: FnMut() -> Result<T, StorageError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable storage error (attempt {}): {:?} -> sleeping {}ms", attempts + 1, e, delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

fn decode(key: &str, raw: &str) -> Result<Value, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Corrupt { key: key.to_string(), message: e.to_string() })
}

pub struct SqliteKvStore<P: ConnectionProvider = PoolProvider> {
    provider: P,
}

impl<P: ConnectionProvider> SqliteKvStore<P> {
    pub fn new(provider: P) -> Self { Self { provider } }
}

impl SqliteKvStore<PoolProvider> {
    /// Abre (o crea) la base en `url` y corre las migraciones pendientes.
    pub fn open(url: &str, min: u32, max: u32) -> Result<Self, StorageError> {
        Ok(Self::new(PoolProvider { pool: build_pool(url, min, max)? }))
    }

    pub fn from_config(cfg: &DbConfig) -> Result<Self, StorageError> {
        Self::open(&cfg.url, cfg.min_connections, cfg.max_connections)
    }
}

impl<P: ConnectionProvider> KeyValueStore for SqliteKvStore<P> {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let raw: Option<String> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            kv_entries::table
                .find(key)
                .select(kv_entries::value)
                .first::<String>(&mut conn)
                .optional()
                .map_err(StorageError::from)
        })?;
        raw.map(|r| decode(key, &r)).transpose()
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::replace_into(kv_entries::table)
                .values((kv_entries::key.eq(key), kv_entries::value.eq(&text)))
                .execute(&mut conn)
                .map(|_| ())
                .map_err(StorageError::from)
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::delete(kv_entries::table.find(key)).execute(&mut conn).map(|_| ()).map_err(StorageError::from)
        })
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.immediate_transaction(|c| {
                diesel::delete(kv_entries::table.filter(kv_entries::key.eq_any(keys.to_vec()))).execute(c)?;
                Ok(())
            })
        })
    }

    fn replace_prefix(&self, prefix: &str, entries: &[(&str, Value)]) -> Result<(), StorageError> {
        let texts: Vec<(&str, String)> =
            entries.iter().map(|(k, v)| Ok((*k, serde_json::to_string(v)?))).collect::<Result<_, StorageError>>()?;
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.immediate_transaction(|c| {
                let stale: Vec<String> = kv_entries::table
                    .select(kv_entries::key)
                    .load::<String>(c)?
                    .into_iter()
                    .filter(|k| k.starts_with(prefix))
                    .collect();
                let removed = diesel::delete(kv_entries::table.filter(kv_entries::key.eq_any(stale))).execute(c)?;
                for (k, v) in &texts {
                    diesel::replace_into(kv_entries::table)
                        .values((kv_entries::key.eq(*k), kv_entries::value.eq(v)))
                        .execute(c)?;
                }
                debug!("replace_prefix {prefix}: removed {removed} entries, wrote {}", texts.len());
                Ok(())
            })
        })
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            kv_entries::table
                .select(kv_entries::key)
                .order(kv_entries::key.asc())
                .load::<String>(&mut conn)
                .map_err(StorageError::from)
        })
    }

    fn clear(&self) -> Result<(), StorageError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::delete(kv_entries::table).execute(&mut conn).map(|_| ()).map_err(StorageError::from)
        })
    }
}

/// Construye el pool y corre las migraciones en el primer checkout.
///
/// Si `min_size > max_size` se usa `min = max`; tamaños 0 se elevan a 1.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<SqlitePool, StorageError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), using min=max");
    }
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .min_idle(Some(validated_min.min(validated_max)))
        .max_size(validated_max)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .map_err(|e| StorageError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get().map_err(|e| StorageError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Carga `.env`, lee `DbConfig` y abre el store ya migrado.
pub fn open_from_env() -> Result<SqliteKvStore, StorageError> {
    crate::config::init_dotenv();
    SqliteKvStore::from_config(&DbConfig::from_env())
}
