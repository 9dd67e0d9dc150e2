//! Errores de los kernels numéricos.
//!
//! - `Validation`: entrada con forma/tipo inválido (fatal para esa llamada).
//! - `Empty`: el kernel no puede producir un resultado útil para este
//!   dataset (señal distinta de un fallo: no se reintenta).
//! - `Cancelled`: el contexto pidió abortar entre etapas.

use serde::{Deserialize, Serialize};
use stat_core::DataError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelError {
    #[error("invalid input: {0}")] Validation(String),
    #[error("cannot compute for this dataset: {0}")] Empty(String),
    #[error("computation cancelled")] Cancelled,
}

impl From<DataError> for KernelError {
    fn from(e: DataError) -> Self { KernelError::Validation(e.to_string()) }
}
