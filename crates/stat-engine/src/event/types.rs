//! Tipos de evento de una sesión y estructura `PipelineEvent`.
//!
//! Rol:
//! - El orquestador emite un evento por cada transición observable de un
//!   pedido (hit de caché, etapa iniciada/terminada/cancelada).
//! - Los tests verifican idempotencia y single-flight contando eventos en
//!   lugar de inspeccionar estado interno.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stat_core::ArtifactKind;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineEventKind {
    /// Primer evento de una sesión: fija el fingerprint vigente.
    SessionStarted { fingerprint: String },
    ArtifactRequested { kind: ArtifactKind },
    /// Resuelto desde la caché, sin cómputo ni progreso.
    CacheHit { kind: ArtifactKind },
    StageStarted { kind: ArtifactKind },
    /// Cómputo terminado y persistido.
    StageFinished { kind: ArtifactKind },
    /// El cómputo terminó sin resultado (reset, cambio de dataset o
    /// prerrequisito cancelado).
    StageCancelled { kind: ArtifactKind, reason: String },
    StageFailed { kind: ArtifactKind, message: String },
    /// Pedido rechazado porque ya había un cómputo en vuelo para `kind`.
    SingleFlightRejected { kind: ArtifactKind },
}

impl PipelineEventKind {
    pub fn artifact(&self) -> Option<ArtifactKind> {
        match self {
            PipelineEventKind::SessionStarted { .. } => None,
            PipelineEventKind::ArtifactRequested { kind }
            | PipelineEventKind::CacheHit { kind }
            | PipelineEventKind::StageStarted { kind }
            | PipelineEventKind::StageFinished { kind }
            | PipelineEventKind::StageCancelled { kind, .. }
            | PipelineEventKind::StageFailed { kind, .. }
            | PipelineEventKind::SingleFlightRejected { kind } => Some(*kind),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub seq: u64, // orden de append dentro de la sesión
    pub session: Uuid,
    pub kind: PipelineEventKind,
    pub ts: DateTime<Utc>,
}
