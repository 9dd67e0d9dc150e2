//! `PipelineOrchestrator`: resuelve un artefacto pedido junto con su cadena
//! de prerrequisitos.
//!
//! Por pedido:
//! 1. fingerprint (override o hash del dataset) → `set_fingerprint`; un
//!    fingerprint nuevo abre una sesión nueva (reset del backend y
//!    cancelación de todo lo que esté en vuelo);
//! 2. single-flight: a lo sumo un handle por `ArtifactKind`;
//! 3. hit de caché bajo el fingerprint vigente → sin cómputo ni progreso;
//! 4. prerrequisitos en orden, cada uno con su tramo de progreso;
//! 5. backend; el resultado sólo se persiste si la sesión y el fingerprint
//!    con los que empezó siguen vigentes.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info, warn};
use stat_core::{Artifact, ArtifactKind, Dataset, Fingerprint, NumericFrame, Settings};
use stat_persistence::ArtifactCache;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::backend::ComputeBackend;
use crate::event::{EventStore, InMemoryEventStore, PipelineEventKind};
use crate::jobs::{build_request, JobInput};
use crate::progress::{ProgressScope, ProgressSink};
use crate::protocol::{BackendError, FailureClass};

/// Resultado de un pedido que no es una falla técnica.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T = Artifact> {
    Ready(T),
    /// Ya hay un cómputo en vuelo para ese kind; reintentar más tarde.
    AlreadyComputing,
    /// Sin resultado (reset, dataset nuevo o prerrequisito cancelado).
    Cancelled,
    /// El dataset no admite este artefacto (mensaje descriptivo).
    CannotCompute(String),
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self.split() {
            Ok(t) => Outcome::Ready(f(t)),
            Err(other) => other,
        }
    }

    /// `Ok` con el valor listo, o el mismo estado no listo re-tipado.
    pub fn split<U>(self) -> Result<T, Outcome<U>> {
        match self {
            Outcome::Ready(t) => Ok(t),
            Outcome::AlreadyComputing => Err(Outcome::AlreadyComputing),
            Outcome::Cancelled => Err(Outcome::Cancelled),
            Outcome::CannotCompute(m) => Err(Outcome::CannotCompute(m)),
        }
    }

    pub fn ready(self) -> Option<T> { self.split::<()>().ok() }

    pub fn is_ready(&self) -> bool { matches!(self, Outcome::Ready(_)) }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{kind} failed: {message}")]
    Failed { kind: ArtifactKind, message: String },
    #[error("{kind} returned an unreadable payload: {message}")]
    Decode { kind: ArtifactKind, message: String },
}

/// Correlaciones regular y parcial más p-values, pedidas juntas.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationBundle {
    pub regular: NumericFrame,
    pub partial: NumericFrame,
    pub p_values: NumericFrame,
}

struct Handle {
    id: Uuid,
    session: Uuid,
    token: CancellationToken,
}

struct SessionState {
    id: Uuid,
    fingerprint: Option<Fingerprint>,
}

/// Datos fijos durante un pedido de nivel superior.
struct RequestCtx<'a> {
    session: Uuid,
    fingerprint: Fingerprint,
    dataset: &'a Dataset,
    settings: Settings,
}

/// Libera el handle al terminar, salvo que ya lo haya reemplazado otra
/// sesión.
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<ArtifactKind, Handle>,
    kind: ArtifactKind,
    id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) { self.in_flight.remove_if(&self.kind, |_, h| h.id == self.id); }
}

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<Outcome, PipelineError>> + Send + 'a>>;

pub struct PipelineOrchestrator {
    cache: ArtifactCache,
    backend: Arc<dyn ComputeBackend>,
    events: Arc<dyn EventStore>,
    in_flight: DashMap<ArtifactKind, Handle>,
    session: Mutex<SessionState>,
}

impl PipelineOrchestrator {
    pub fn new(cache: ArtifactCache, backend: Arc<dyn ComputeBackend>) -> Self {
        Self::with_events(cache, backend, Arc::new(InMemoryEventStore::new()))
    }

    pub fn with_events(cache: ArtifactCache, backend: Arc<dyn ComputeBackend>, events: Arc<dyn EventStore>) -> Self {
        Self {
            cache,
            backend,
            events,
            in_flight: DashMap::new(),
            session: Mutex::new(SessionState { id: Uuid::new_v4(), fingerprint: None }),
        }
    }

    pub fn cache(&self) -> &ArtifactCache { &self.cache }

    pub fn events(&self) -> &Arc<dyn EventStore> { &self.events }

    pub fn session_id(&self) -> Uuid { self.lock_session().id }

    pub fn is_computing(&self, kind: ArtifactKind) -> bool { self.in_flight.contains_key(&kind) }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, session: Uuid, kind: PipelineEventKind) { self.events.append_kind(session, kind); }

    /// Pide `kind` para `dataset`. `Err` es sólo la falla técnica; el resto
    /// de los estados viaja en `Outcome`.
    pub async fn request(
        &self,
        kind: ArtifactKind,
        dataset: &Dataset,
        sink: Arc<dyn ProgressSink>,
        fingerprint_override: Option<&str>,
    ) -> Result<Outcome, PipelineError> {
        self.request_in(kind, dataset, ProgressScope::root(sink), fingerprint_override).await
    }

    async fn request_in(
        &self,
        kind: ArtifactKind,
        dataset: &Dataset,
        scope: ProgressScope,
        fingerprint_override: Option<&str>,
    ) -> Result<Outcome, PipelineError> {
        let fingerprint = Fingerprint::resolve(dataset, fingerprint_override);
        let session = self.enter(&fingerprint, dataset);
        self.emit(session, PipelineEventKind::ArtifactRequested { kind });
        let settings = self.cache.settings().unwrap_or_else(|e| {
            warn!("orchestrator: settings unavailable ({e}), using defaults");
            Settings::default()
        });
        let rq = RequestCtx { session, fingerprint, dataset, settings };
        self.resolve(kind, &rq, scope).await
    }

    /// Correlación regular, parcial y p-values con el rango en tercios. Si
    /// alguno no queda listo, el paquete devuelve ese estado.
    pub async fn request_correlation_bundle(
        &self,
        dataset: &Dataset,
        sink: Arc<dyn ProgressSink>,
        fingerprint_override: Option<&str>,
    ) -> Result<Outcome<CorrelationBundle>, PipelineError> {
        let root = ProgressScope::root(sink);
        let kinds = [ArtifactKind::RegularCorrelations, ArtifactKind::PartialCorrelations, ArtifactKind::PValues];
        let mut frames = Vec::with_capacity(kinds.len());
        for (i, kind) in kinds.into_iter().enumerate() {
            let scope = root.sub(i as f64 / 3.0, (i + 1) as f64 / 3.0);
            let outcome = self.request_in(kind, dataset, scope, fingerprint_override).await?;
            let artifact = match outcome.split() {
                Ok(a) => a,
                Err(other) => return Ok(other),
            };
            let frame = artifact
                .as_numeric_frame()
                .cloned()
                .ok_or_else(|| PipelineError::Decode { kind, message: "expected a numeric frame".into() })?;
            frames.push(frame);
        }
        let mut it = frames.into_iter();
        match (it.next(), it.next(), it.next()) {
            (Some(regular), Some(partial), Some(p_values)) => {
                Ok(Outcome::Ready(CorrelationBundle { regular, partial, p_values }))
            }
            _ => Err(PipelineError::Failed {
                kind: ArtifactKind::RegularCorrelations,
                message: "incomplete correlation bundle".into(),
            }),
        }
    }

    /// Sesión nueva: cancela todo lo que esté en vuelo y recrea el backend.
    /// El fingerprint vigente se conserva (la caché sigue válida).
    pub fn reset_session(&self) -> Uuid {
        let mut s = self.lock_session();
        let fingerprint = s.fingerprint.clone();
        self.start_session(&mut s, fingerprint, true);
        s.id
    }

    fn enter(&self, fingerprint: &Fingerprint, dataset: &Dataset) -> Uuid {
        let mut s = self.lock_session();
        let changed = match self.cache.set_fingerprint(fingerprint, dataset) {
            Ok(changed) => changed,
            Err(e) => {
                warn!("orchestrator: could not record fingerprint {fingerprint}: {e}");
                false
            }
        };
        if changed || s.fingerprint.as_ref() != Some(fingerprint) {
            let had_session = s.fingerprint.is_some();
            self.start_session(&mut s, Some(fingerprint.clone()), had_session);
        }
        s.id
    }

    fn start_session(&self, s: &mut SessionState, fingerprint: Option<Fingerprint>, reset_backend: bool) {
        for entry in self.in_flight.iter() {
            debug!("orchestrator: cancelling {} from session {}", entry.key(), entry.value().session);
            entry.value().token.cancel();
        }
        self.in_flight.clear();
        if reset_backend {
            self.backend.reset();
        }
        s.id = Uuid::new_v4();
        s.fingerprint = fingerprint;
        let label = s.fingerprint.as_ref().map(|f| f.as_str().to_string()).unwrap_or_default();
        info!("orchestrator: session {} started for fingerprint {label}", s.id);
        self.emit(s.id, PipelineEventKind::SessionStarted { fingerprint: label });
    }

    fn is_current(&self, rq: &RequestCtx<'_>) -> bool {
        let s = self.lock_session();
        s.id == rq.session && s.fingerprint.as_ref() == Some(&rq.fingerprint)
    }

    fn resolve<'a>(&'a self, kind: ArtifactKind, rq: &'a RequestCtx<'a>, scope: ProgressScope) -> ResolveFuture<'a> {
        Box::pin(async move {
            let token = CancellationToken::new();
            let id = Uuid::new_v4();
            match self.in_flight.entry(kind) {
                Entry::Occupied(_) => {
                    debug!("orchestrator: {kind} already in flight");
                    self.emit(rq.session, PipelineEventKind::SingleFlightRejected { kind });
                    return Ok(Outcome::AlreadyComputing);
                }
                Entry::Vacant(v) => {
                    v.insert(Handle { id, session: rq.session, token: token.clone() });
                }
            }
            let _guard = InFlightGuard { in_flight: &self.in_flight, kind, id };
            if !self.is_current(rq) {
                return Ok(Outcome::Cancelled);
            }

            match self.cache.get_artifact(kind, &rq.fingerprint) {
                Ok(Some(artifact)) => {
                    self.emit(rq.session, PipelineEventKind::CacheHit { kind });
                    return Ok(Outcome::Ready(artifact));
                }
                Ok(None) => {}
                Err(e) => warn!("orchestrator: cache read for {kind} failed, recomputing: {e}"),
            }

            let prerequisites = kind.prerequisites();
            let final_weight = kind.final_stage_weight();
            let share = if prerequisites.is_empty() { 0.0 } else { (1.0 - final_weight) / prerequisites.len() as f64 };
            let mut inputs = Vec::with_capacity(prerequisites.len());
            for (i, p) in prerequisites.iter().enumerate() {
                let sub = scope.sub(share * i as f64, share * (i + 1) as f64);
                match self.resolve(*p, rq, sub).await? {
                    Outcome::Ready(a) => inputs.push(a),
                    Outcome::CannotCompute(reason) => return Ok(Outcome::CannotCompute(reason)),
                    Outcome::Cancelled | Outcome::AlreadyComputing => {
                        self.emit(rq.session, PipelineEventKind::StageCancelled {
                            kind,
                            reason: format!("prerequisite {p} did not complete"),
                        });
                        return Ok(Outcome::Cancelled);
                    }
                }
            }

            let input = JobInput::for_kind(kind, rq.dataset, &inputs, &rq.settings);
            let request = build_request(kind, &input).map_err(|e| PipelineError::Failed { kind, message: e.to_string() })?;
            self.emit(rq.session, PipelineEventKind::StageStarted { kind });
            debug!("orchestrator: running {kind} on {}", self.backend.name());
            let stage = scope.sub(1.0 - final_weight, 1.0);
            let result = tokio::select! {
                r = self.backend.run(request, stage, token.clone()) => r,
                _ = token.cancelled() => Err(BackendError::Cancelled),
            };
            self.settle(kind, rq, &token, result)
        })
    }

    fn settle(
        &self,
        kind: ArtifactKind,
        rq: &RequestCtx<'_>,
        token: &CancellationToken,
        result: Result<serde_json::Value, BackendError>,
    ) -> Result<Outcome, PipelineError> {
        let cancelled = |reason: &str| -> Result<Outcome, PipelineError> {
            debug!("orchestrator: {kind} cancelled ({reason})");
            self.emit(rq.session, PipelineEventKind::StageCancelled { kind, reason: reason.to_string() });
            Ok(Outcome::Cancelled)
        };
        let failed = |message: String| -> String {
            self.emit(rq.session, PipelineEventKind::StageFailed { kind, message: message.clone() });
            message
        };
        match result {
            Ok(payload) => {
                let artifact = Artifact::from_payload(kind, &payload)
                    .map_err(|e| PipelineError::Decode { kind, message: failed(e.to_string()) })?;
                if token.is_cancelled() || !self.is_current(rq) {
                    return cancelled("session changed before commit");
                }
                if let Err(e) = self.cache.set(&rq.fingerprint, &artifact) {
                    warn!("orchestrator: could not store {kind}: {e}");
                }
                self.emit(rq.session, PipelineEventKind::StageFinished { kind });
                Ok(Outcome::Ready(artifact))
            }
            Err(BackendError::Cancelled) => cancelled("backend cancelled"),
            Err(BackendError::Failed(f)) => {
                let message = failed(f.message);
                match f.class {
                    FailureClass::Empty => Ok(Outcome::CannotCompute(message)),
                    FailureClass::Validation => Err(PipelineError::Validation(message)),
                    FailureClass::Internal => Err(PipelineError::Failed { kind, message }),
                }
            }
        }
    }
}
