//! Contexto de ejecución de un kernel: progreso y cancelación cooperativa.
//!
//! Los kernels reportan progreso en `[0, 1]` y consultan `checkpoint` entre
//! etapas costosas. `()` es el contexto nulo (sin progreso, nunca cancela).

use crate::error::KernelError;

pub trait KernelContext: Sync {
    /// Progreso del kernel en `[0, 1]`.
    fn progress(&self, fraction: f64);

    fn is_cancelled(&self) -> bool { false }

    /// Devuelve `Err(Cancelled)` si el contexto fue cancelado.
    fn checkpoint(&self) -> Result<(), KernelError> {
        if self.is_cancelled() {
            Err(KernelError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl KernelContext for () {
    fn progress(&self, _fraction: f64) {}
}

/// Re-mapea el progreso de un sub-kernel al tramo `[start, end]` del padre.
pub struct SubRange<'a> {
    parent: &'a dyn KernelContext,
    start: f64,
    end: f64,
}

impl<'a> SubRange<'a> {
    pub fn new(parent: &'a dyn KernelContext, start: f64, end: f64) -> Self { Self { parent, start, end } }
}

impl KernelContext for SubRange<'_> {
    fn progress(&self, fraction: f64) {
        let f = fraction.clamp(0.0, 1.0);
        self.parent.progress(self.start + (self.end - self.start) * f);
    }

    fn is_cancelled(&self) -> bool { self.parent.is_cancelled() }
}
