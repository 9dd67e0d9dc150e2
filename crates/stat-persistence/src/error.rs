//! Errores de almacenamiento.
//! Mapea errores de Diesel / pool / serialización a variantes semánticas. Los
//! llamadores los tratan como cache-miss, nunca como datos válidos.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("corrupt entry at {key}: {message}")]
    Corrupt { key: String, message: String },
    #[error("rejected write: {0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for StorageError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::SerializationFailure => Self::TransientIo(info.message().to_string()),
                DatabaseErrorKind::ClosedConnection => Self::TransientIo("closed connection".into()),
                other => Self::Unknown(format!("db error kind {other:?}: {}", info.message())),
            },
            DieselError::DeserializationError(e) => Self::Serialization(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Serialization(format!("ser: {e}")),
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self { Self::Serialization(err.to_string()) }
}
