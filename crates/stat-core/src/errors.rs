//! Errores de forma/contenido del modelo de datos.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DataError {
    #[error("shape mismatch: {0}")] Shape(String),
    #[error("duplicate column label: {0}")] DuplicateColumn(String),
    #[error("label mismatch: {0}")] LabelMismatch(String),
    #[error("internal: {0}")] Internal(String),
}
