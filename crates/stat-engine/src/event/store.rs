use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use super::{PipelineEvent, PipelineEventKind};

/// Almacenamiento de eventos append-only, compartido entre tareas.
pub trait EventStore: Send + Sync {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con seq y ts).
    fn append_kind(&self, session: Uuid, kind: PipelineEventKind) -> PipelineEvent;
    /// Lista eventos de una sesión (orden ascendente por seq).
    fn list(&self, session: Uuid) -> Vec<PipelineEvent>;
}

#[derive(Default)]
pub struct InMemoryEventStore {
    inner: Mutex<HashMap<Uuid, Vec<PipelineEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self { Self::default() }
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&self, session: Uuid, kind: PipelineEventKind) -> PipelineEvent {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let vec = inner.entry(session).or_default();
        let ev = PipelineEvent { seq: vec.len() as u64, session, kind, ts: Utc::now() };
        vec.push(ev.clone());
        ev
    }

    fn list(&self, session: Uuid) -> Vec<PipelineEvent> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).get(&session).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stat_core::ArtifactKind;

    #[test]
    fn seq_is_per_session() {
        let store = InMemoryEventStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.append_kind(a, PipelineEventKind::SessionStarted { fingerprint: "x".into() });
        let ev = store.append_kind(a, PipelineEventKind::CacheHit { kind: ArtifactKind::PValues });
        let other = store.append_kind(b, PipelineEventKind::SessionStarted { fingerprint: "y".into() });
        assert_eq!(ev.seq, 1);
        assert_eq!(other.seq, 0);
        assert_eq!(store.list(a).len(), 2);
        assert_eq!(ev.kind.artifact(), Some(ArtifactKind::PValues));
    }
}
