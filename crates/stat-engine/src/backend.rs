//! Backends de cómputo: ejecutan un `JobRequest` y relevan su progreso.
//!
//! Contrato común:
//! - exactamente una resolución terminal por `run` (resultado, falla o
//!   cancelación);
//! - progreso no decreciente dentro de un job (`MonotonicClamp`);
//! - el resultado es idéntico al de `run_job` llamado en el mismo hilo.
//!
//! `WorkerBackend` corre los jobs en un hilo dedicado por sesión. `reset`
//! destruye la sesión: los jobs en curso y encolados terminan como
//! `Cancelled` y se levanta un hilo nuevo.

use std::sync::mpsc as std_mpsc;
use std::sync::Mutex;
use std::thread;

use async_trait::async_trait;
use log::{debug, error, warn};
use serde_json::Value;
use stat_core::ArtifactKind;
use stat_kernels::KernelContext;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::jobs::run_job;
use crate::progress::{MonotonicClamp, Progress, ProgressScope};
use crate::protocol::{BackendError, JobFailure, JobRequest, ProgressEvent};

#[async_trait]
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Ejecuta un job. `cancel` aborta sólo este job; el progreso local
    /// `[0, 1]` se reporta a través de `progress`.
    async fn run(
        &self,
        request: JobRequest,
        progress: ProgressScope,
        cancel: CancellationToken,
    ) -> Result<Value, BackendError>;

    /// Destruye el contexto de ejecución actual (cancelación dura).
    fn reset(&self) {}
}

/// `KernelContext` de un job: filtra el progreso y observa dos tokens
/// (el de la sesión y el del pedido).
struct JobContext<F: Fn(f64) + Sync> {
    emit: F,
    clamp: MonotonicClamp,
    session: CancellationToken,
    job: CancellationToken,
}

impl<F: Fn(f64) + Sync> JobContext<F> {
    fn new(emit: F, session: CancellationToken, job: CancellationToken) -> Self {
        Self { emit, clamp: MonotonicClamp::new(), session, job }
    }
}

impl<F: Fn(f64) + Sync> KernelContext for JobContext<F> {
    fn progress(&self, fraction: f64) {
        if let Some(v) = self.clamp.advance(fraction) {
            (self.emit)(v);
        }
    }

    fn is_cancelled(&self) -> bool { self.session.is_cancelled() || self.job.is_cancelled() }
}

/// Texto de progreso: `Computing <artefacto>... (NN%)`.
fn progress_message(job_name: &str, fraction: f64) -> String {
    let label = ArtifactKind::from_job_name(job_name).map(|k| k.to_string()).unwrap_or_else(|| job_name.to_string());
    format!("Computing {label}... ({:.0}%)", fraction * 100.0)
}

fn lock_token(token: &Mutex<CancellationToken>) -> CancellationToken {
    token.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Corre cada job en el pool blocking de tokio, sin hilo propio.
#[derive(Default)]
pub struct InlineBackend {
    session: Mutex<CancellationToken>,
}

impl InlineBackend {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl ComputeBackend for InlineBackend {
    fn name(&self) -> &str { "inline" }

    async fn run(
        &self,
        request: JobRequest,
        progress: ProgressScope,
        cancel: CancellationToken,
    ) -> Result<Value, BackendError> {
        let session = lock_token(&self.session);
        let task = tokio::task::spawn_blocking(move || {
            let name = request.job_name.as_str();
            let ctx =
                JobContext::new(|v| progress.report(&Progress::info(v, progress_message(name, v))), session, cancel);
            run_job(&request, &ctx)
        });
        task.await.map_err(|e| BackendError::Failed(JobFailure::internal(format!("job task aborted: {e}"))))?
    }

    fn reset(&self) {
        let mut token = self.session.lock().unwrap_or_else(|e| e.into_inner());
        token.cancel();
        *token = CancellationToken::new();
    }
}

struct WorkerJob {
    request: JobRequest,
    cancel: CancellationToken,
    progress: mpsc::UnboundedSender<ProgressEvent>,
    done: oneshot::Sender<Result<Value, BackendError>>,
}

struct Session {
    jobs: std_mpsc::Sender<WorkerJob>,
    token: CancellationToken,
    generation: u64,
}

impl Session {
    fn spawn(generation: u64) -> Self {
        let (tx, rx) = std_mpsc::channel::<WorkerJob>();
        let token = CancellationToken::new();
        let worker_token = token.clone();
        let spawned = thread::Builder::new()
            .name(format!("statflow-worker-{generation}"))
            .spawn(move || worker_loop(rx, worker_token));
        if let Err(e) = spawned {
            // sin hilo el receptor se descarta y cada `run` falla de inmediato
            error!("worker {generation}: could not spawn thread: {e}");
        }
        Self { jobs: tx, token, generation }
    }
}

fn worker_loop(rx: std_mpsc::Receiver<WorkerJob>, session: CancellationToken) {
    while let Ok(job) = rx.recv() {
        let WorkerJob { request, cancel, progress, done } = job;
        if session.is_cancelled() || cancel.is_cancelled() {
            let _ = done.send(Err(BackendError::Cancelled));
            continue;
        }
        let name = request.job_name.clone();
        let ctx = JobContext::new(
            |v| {
                let _ = progress.send(ProgressEvent::new(&name, Progress::info(v, progress_message(&name, v))));
            },
            session.clone(),
            cancel,
        );
        let result = run_job(&request, &ctx);
        if done.send(result).is_err() {
            debug!("worker: result of {name} dropped, caller is gone");
        }
    }
    debug!("worker: channel closed, exiting");
}

/// Backend con un hilo worker por sesión; los jobs independientes se
/// encolan en orden de llegada.
pub struct WorkerBackend {
    session: Mutex<Session>,
}

impl Default for WorkerBackend {
    fn default() -> Self { Self::new() }
}

impl WorkerBackend {
    pub fn new() -> Self { Self { session: Mutex::new(Session::spawn(0)) } }

    pub fn generation(&self) -> u64 { self.session.lock().unwrap_or_else(|e| e.into_inner()).generation }
}

#[async_trait]
impl ComputeBackend for WorkerBackend {
    fn name(&self) -> &str { "worker" }

    async fn run(
        &self,
        request: JobRequest,
        progress: ProgressScope,
        cancel: CancellationToken,
    ) -> Result<Value, BackendError> {
        let expected = crate::protocol::progress_event_name(&request.job_name);
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let (done_tx, mut done_rx) = oneshot::channel();
        let (jobs, session_token) = {
            let s = self.session.lock().unwrap_or_else(|e| e.into_inner());
            (s.jobs.clone(), s.token.clone())
        };
        let job = WorkerJob { request, cancel: cancel.clone(), progress: progress_tx, done: done_tx };
        if jobs.send(job).is_err() {
            return Err(BackendError::Failed(JobFailure::internal("worker is not running")));
        }

        let forward = |ev: ProgressEvent| {
            if ev.name == expected {
                progress.report(&ev.data);
            }
        };
        loop {
            tokio::select! {
                Some(ev) = progress_rx.recv() => forward(ev),
                res = &mut done_rx => {
                    while let Ok(ev) = progress_rx.try_recv() {
                        forward(ev);
                    }
                    return match res {
                        Ok(r) => r,
                        Err(_) if session_token.is_cancelled() || cancel.is_cancelled() => Err(BackendError::Cancelled),
                        Err(_) => {
                            warn!("worker: job ended without a response");
                            Err(BackendError::Failed(JobFailure::internal("worker terminated without a response")))
                        }
                    };
                }
                _ = session_token.cancelled() => return Err(BackendError::Cancelled),
                _ = cancel.cancelled() => return Err(BackendError::Cancelled),
            }
        }
    }

    fn reset(&self) {
        let mut s = self.session.lock().unwrap_or_else(|e| e.into_inner());
        s.token.cancel();
        let next = s.generation + 1;
        debug!("worker: session {} destroyed, starting {next}", s.generation);
        *s = Session::spawn(next);
    }
}
