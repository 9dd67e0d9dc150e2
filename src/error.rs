//! Errores de la capa de aplicación (CLI y armado de componentes).
use stat_core::DataError;
use stat_engine::PipelineError;
use stat_persistence::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("usage: {0}")]
    Usage(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid dataset: {0}")]
    Dataset(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<DataError> for AppError {
    fn from(e: DataError) -> Self { AppError::Dataset(e.to_string()) }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self { AppError::Dataset(e.to_string()) }
}

impl AppError {
    /// Código de salida del binario.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Usage(_) => 2,
            AppError::Io(_) | AppError::Dataset(_) => 3,
            AppError::Pipeline(PipelineError::Validation(_)) => 3,
            AppError::Storage(_) | AppError::Pipeline(_) => 5,
        }
    }
}
