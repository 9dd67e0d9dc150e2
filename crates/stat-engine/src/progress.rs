//! Progreso normalizado `[0, 1]` y re-mapeo a sub-rangos.
//!
//! Cada etapa recibe un `ProgressScope` que traduce su `[0, 1]` local al tramo
//! que el orquestador le asignó dentro del pedido de nivel superior.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressType {
    #[default]
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub progress: f64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ProgressType,
}

impl Progress {
    pub fn info(progress: f64, message: impl Into<String>) -> Self {
        Self { progress, message: message.into(), kind: ProgressType::Info }
    }
}

/// Destino de los eventos de progreso de un pedido.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &Progress);
}

impl<F> ProgressSink for F
    where F: Fn(&Progress) + Send + Sync
{
    fn report(&self, progress: &Progress) { self(progress) }
}

/// Sink que descarta todo.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: &Progress) {}
}

/// Sink que acumula los eventos (diagnóstico y tests).
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Progress>>,
}

impl RecordingSink {
    pub fn new() -> Self { Self::default() }

    pub fn events(&self) -> Vec<Progress> { self.events.lock().map(|e| e.clone()).unwrap_or_default() }

    pub fn values(&self) -> Vec<f64> { self.events().into_iter().map(|p| p.progress).collect() }
}

impl ProgressSink for RecordingSink {
    fn report(&self, progress: &Progress) {
        if let Ok(mut e) = self.events.lock() {
            e.push(progress.clone());
        }
    }
}

/// Tramo `[start, end]` del progreso total.
#[derive(Clone)]
pub struct ProgressScope {
    sink: Arc<dyn ProgressSink>,
    start: f64,
    end: f64,
}

impl ProgressScope {
    pub fn root(sink: Arc<dyn ProgressSink>) -> Self { Self { sink, start: 0.0, end: 1.0 } }

    /// Sub-tramo `[a, b]` (fracciones locales de este tramo).
    pub fn sub(&self, a: f64, b: f64) -> Self {
        let width = self.end - self.start;
        Self { sink: self.sink.clone(), start: self.start + width * a.clamp(0.0, 1.0), end: self.start + width * b.clamp(0.0, 1.0) }
    }

    pub fn bounds(&self) -> (f64, f64) { (self.start, self.end) }

    /// Reporta un progreso local `[0, 1]` re-mapeado al tramo.
    pub fn report(&self, local: &Progress) {
        let f = if local.progress.is_nan() { 0.0 } else { local.progress.clamp(0.0, 1.0) };
        let mapped = Progress { progress: self.start + (self.end - self.start) * f, ..local.clone() };
        self.sink.report(&mapped);
    }
}

/// Filtro que garantiza progreso no decreciente dentro de un job.
#[derive(Debug, Default)]
pub struct MonotonicClamp {
    last: Mutex<Option<f64>>,
}

impl MonotonicClamp {
    pub fn new() -> Self { Self::default() }

    /// Valor a emitir, o `None` si no avanza respecto del último emitido.
    pub fn advance(&self, value: f64) -> Option<f64> {
        let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(prev) if v <= prev => None,
            _ => {
                *last = Some(v);
                Some(v)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_scopes_compose() {
        let rec = Arc::new(RecordingSink::new());
        let root = ProgressScope::root(rec.clone());
        let inner = root.sub(0.5, 1.0).sub(0.0, 0.5);
        inner.report(&Progress::info(0.0, "a"));
        inner.report(&Progress::info(1.0, "b"));
        inner.report(&Progress::info(7.0, "c"));
        assert_eq!(rec.values(), vec![0.5, 0.75, 0.75]);
    }

    #[test]
    fn clamp_drops_regressions() {
        let c = MonotonicClamp::new();
        assert_eq!(c.advance(0.2), Some(0.2));
        assert_eq!(c.advance(0.1), None);
        assert_eq!(c.advance(0.2), None);
        assert_eq!(c.advance(1.5), Some(1.0));
    }
}
