//! Contrato de mensajes con el backend de cómputo.
//!
//! - Pedido: `{jobName, payload}`.
//! - Respuesta: exactamente uno de `{result}` o `{error}`.
//! - Progreso: cero o más `{<jobName>-progress, {progress, message, type}}`
//!   antes de la respuesta terminal.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stat_kernels::KernelError;
use thiserror::Error;

use crate::progress::Progress;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub job_name: String,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobResponse {
    Result(Value),
    Error(JobFailure),
}

impl JobResponse {
    pub fn into_result(self) -> Result<Value, JobFailure> {
        match self {
            JobResponse::Result(v) => Ok(v),
            JobResponse::Error(e) => Err(e),
        }
    }
}

impl From<Result<Value, JobFailure>> for JobResponse {
    fn from(r: Result<Value, JobFailure>) -> Self {
        match r {
            Ok(v) => JobResponse::Result(v),
            Err(e) => JobResponse::Error(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub name: String,
    pub data: Progress,
}

impl ProgressEvent {
    pub fn new(job_name: &str, data: Progress) -> Self { Self { name: progress_event_name(job_name), data } }
}

pub fn progress_event_name(job_name: &str) -> String { format!("{job_name}-progress") }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureClass {
    /// Entrada malformada (no se reintenta).
    Validation,
    /// El kernel no puede producir resultado para este dataset.
    Empty,
    /// Falla técnica.
    Internal,
}

/// Error terminal estructurado de un job.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{class:?}: {message}")]
pub struct JobFailure {
    pub class: FailureClass,
    pub message: String,
}

impl JobFailure {
    pub fn validation(message: impl Into<String>) -> Self { Self { class: FailureClass::Validation, message: message.into() } }
    pub fn empty(message: impl Into<String>) -> Self { Self { class: FailureClass::Empty, message: message.into() } }
    pub fn internal(message: impl Into<String>) -> Self { Self { class: FailureClass::Internal, message: message.into() } }
}

/// Resultado no exitoso de `ComputeBackend::run`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("job failed: {0}")]
    Failed(JobFailure),
    /// Contexto de ejecución destruido o job cancelado: sin resultado.
    #[error("job cancelled")]
    Cancelled,
}

impl From<KernelError> for BackendError {
    fn from(e: KernelError) -> Self {
        match e {
            KernelError::Validation(m) => BackendError::Failed(JobFailure::validation(m)),
            KernelError::Empty(m) => BackendError::Failed(JobFailure::empty(m)),
            KernelError::Cancelled => BackendError::Cancelled,
        }
    }
}

impl From<JobFailure> for BackendError {
    fn from(f: JobFailure) -> Self { BackendError::Failed(f) }
}
