//! stat-persistence
//!
//! Caché durable de artefactos. Un `KeyValueStore` (en memoria o SQLite vía
//! Diesel + r2d2) y encima `ArtifactCache`, dueño exclusivo de los registros
//! persistidos y del fingerprint del dataset.
//!
//! Módulos:
//! - `kv`: contrato clave/valor + implementación en memoria.
//! - `sqlite`: implementación durable, pool y reintentos.
//! - `cache`: `ArtifactCache` (invalidación atómica por fingerprint).
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel.

pub mod cache;
pub mod config;
pub mod error;
pub mod kv;
pub mod migrations;
pub mod schema;
pub mod sqlite;

pub use cache::ArtifactCache;
pub use config::{init_dotenv, DbConfig};
pub use error::StorageError;
pub use kv::{InMemoryKvStore, KeyValueStore};
pub use sqlite::{build_pool, open_from_env, ConnectionProvider, PoolProvider, SqliteKvStore, SqlitePool};
