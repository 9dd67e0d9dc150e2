//! p-values por pares de columnas (test t de Welch de dos muestras).
//!
//! La diagonal de la matriz queda en 1: se usa como mapa de calor de
//! significancia, no como identidad estadística estricta.

use stat_core::NumericFrame;

use crate::context::KernelContext;
use crate::correlation::ensure_columns;
use crate::error::KernelError;
use crate::math::special::student_t_two_tailed;
use crate::math::stats::{drop_nan_pairwise, mean, variance};

/// p-value bilateral entre `a` y `b`, descartando pares con NaN. NaN si
/// quedan menos de dos pares.
pub fn p_value(a: &[f64], b: &[f64]) -> f64 {
    let (a, b) = drop_nan_pairwise(a, b);
    let n = a.len() as f64;
    if a.len() < 2 {
        return f64::NAN;
    }
    let diff = mean(&a) - mean(&b);
    let (va, vb) = (variance(&a, 1) / n, variance(&b, 1) / n);
    let se = (va + vb).sqrt();
    if se == 0.0 {
        return if diff == 0.0 { 1.0 } else { 0.0 };
    }
    let t = diff / se;
    // Welch–Satterthwaite
    let df = (va + vb).powi(2) / (va.powi(2) / (n - 1.0) + vb.powi(2) / (n - 1.0));
    student_t_two_tailed(t, df)
}

/// Matriz simétrica de p-values. `cols[j]` es la columna `j`.
pub fn p_value_matrix(cols: &[Vec<f64>], ctx: &dyn KernelContext) -> Result<Vec<Vec<f64>>, KernelError> {
    ensure_columns(cols)?;
    let p = cols.len();
    let mut out: Vec<Vec<f64>> = (0..p).map(|i| (0..p).map(|j| if i == j { 1.0 } else { 0.0 }).collect()).collect();
    let total = (p * (p - 1) / 2) as f64;
    let mut done = 0usize;
    for i in 0..p {
        ctx.checkpoint()?;
        for j in (i + 1)..p {
            let v = p_value(&cols[i], &cols[j]);
            out[i][j] = v;
            out[j][i] = v;
            done += 1;
            ctx.progress(done as f64 / total);
        }
    }
    ctx.progress(1.0);
    Ok(out)
}

pub fn p_value_frame(frame: &NumericFrame, ctx: &dyn KernelContext) -> Result<NumericFrame, KernelError> {
    let m = p_value_matrix(&frame.columns_data(), ctx)?;
    Ok(NumericFrame::square(frame.columns().to_vec(), m)?)
}
