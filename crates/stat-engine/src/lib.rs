//! stat-engine: ejecución y orquestación de los artefactos.
//!
//! - `protocol`: mensajes `{jobName, payload}` / `{result | error}` y eventos
//!   de progreso.
//! - `jobs`: despacho por nombre hacia `stat-kernels`.
//! - `backend`: `ComputeBackend` con variantes inline y worker.
//! - `orchestrator`: single-flight, caché por fingerprint y progreso
//!   agregado.
pub mod backend;
pub mod event;
pub mod jobs;
pub mod orchestrator;
pub mod progress;
pub mod protocol;

pub use backend::{ComputeBackend, InlineBackend, WorkerBackend};
pub use event::{EventStore, InMemoryEventStore, PipelineEvent, PipelineEventKind};
pub use jobs::{run_job, JobInput};
pub use orchestrator::{CorrelationBundle, Outcome, PipelineError, PipelineOrchestrator};
pub use progress::{NoProgress, Progress, ProgressScope, ProgressSink, ProgressType, RecordingSink};
pub use protocol::{BackendError, FailureClass, JobFailure, JobRequest, JobResponse, ProgressEvent};
