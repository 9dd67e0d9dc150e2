//! Matrices de correlación (regular y parcial).
//!
//! La correlación regular centra cada columna por su media sin NaN y luego
//! trata los NaN como aporte 0, de modo que no arrastran la covarianza:
//!
//! ```text
//! Z = X − media(X)          (NaN → 0)
//! C = Zᵀ Z / (n − 1)
//! R = D⁻¹ C D⁻¹             (D = diag(sqrt(C_ii)), división sin NaN)
//! R = clip((R + Rᵀ) / 2, −1, 1)
//! ```
//!
//! La parcial invierte `R` vía SVD (`V · diag(1/s) · Uᵀ`) y toma
//! `r_ij = −P_ij / sqrt(P_ii · P_jj)` con diagonal 1.

use stat_core::NumericFrame;

use crate::context::KernelContext;
use crate::error::KernelError;
use crate::math::linalg::{from_columns, from_rows, pseudo_inverse, symmetrize};
use crate::math::stats::{div_no_nan, mean};

const STEPS: f64 = 8.0;

pub(crate) fn ensure_columns(cols: &[Vec<f64>]) -> Result<usize, KernelError> {
    let n = cols.first().map(|c| c.len()).ok_or_else(|| KernelError::Empty("no numeric columns".into()))?;
    if cols.iter().any(|c| c.len() != n) {
        return Err(KernelError::Validation("columns must all have the same length".into()));
    }
    if cols.len() < 2 {
        return Err(KernelError::Empty("at least two numeric columns are required".into()));
    }
    if n < 2 {
        return Err(KernelError::Empty("at least two rows are required".into()));
    }
    Ok(n)
}

/// Correlación de todas las columnas entre sí. `cols[j]` es la columna `j`.
pub fn correlation_matrix(cols: &[Vec<f64>], ctx: &dyn KernelContext) -> Result<Vec<Vec<f64>>, KernelError> {
    let n = ensure_columns(cols)?;
    let p = cols.len();
    ctx.checkpoint()?;

    let centered: Vec<Vec<f64>> = cols
        .iter()
        .map(|c| {
            let m = mean(c);
            c.iter()
                .map(|v| {
                    let d = v - m;
                    if d.is_nan() { 0.0 } else { d }
                })
                .collect()
        })
        .collect();
    ctx.progress(1.0 / STEPS);

    let z = from_columns(&centered);
    ctx.progress(2.0 / STEPS);
    ctx.checkpoint()?;

    let cov = (z.transpose() * &z).map(|v| div_no_nan(v, (n - 1) as f64));
    ctx.progress(4.0 / STEPS);
    ctx.checkpoint()?;

    let sd: Vec<f64> = (0..p).map(|i| cov[(i, i)].max(0.0).sqrt()).collect();
    ctx.progress(5.0 / STEPS);

    let inv_sd: Vec<f64> = sd.iter().map(|s| div_no_nan(1.0, *s)).collect();
    let mut r: Vec<Vec<f64>> =
        (0..p).map(|i| (0..p).map(|j| cov[(i, j)] * inv_sd[i] * inv_sd[j]).collect()).collect();
    ctx.progress(6.0 / STEPS);

    symmetrize(&mut r);
    ctx.progress(7.0 / STEPS);

    for (i, row) in r.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = if i == j {
                if sd[i] > 0.0 { 1.0 } else { 0.0 }
            } else {
                v.clamp(-1.0, 1.0)
            };
        }
    }
    ctx.progress(1.0);
    Ok(r)
}

/// Correlaciones parciales a partir de la inversa de la matriz de correlación.
/// Las entradas no definidas (inversa no finita) quedan en NaN.
pub fn partial_correlation_matrix(cols: &[Vec<f64>], ctx: &dyn KernelContext) -> Result<Vec<Vec<f64>>, KernelError> {
    let corr = correlation_matrix(cols, &crate::context::SubRange::new(ctx, 0.0, 0.5))?;
    ctx.checkpoint()?;
    let p = corr.len();

    let inv = match pseudo_inverse(&from_rows(&corr)) {
        Some(m) => m,
        None => {
            let nan = (0..p).map(|i| (0..p).map(|j| if i == j { 1.0 } else { f64::NAN }).collect()).collect();
            ctx.progress(1.0);
            return Ok(nan);
        }
    };
    ctx.progress(0.75);

    let mut out: Vec<Vec<f64>> = (0..p)
        .map(|i| {
            (0..p)
                .map(|j| {
                    if i == j {
                        return 1.0;
                    }
                    let r = -inv[(i, j)] / (inv[(i, i)] * inv[(j, j)]).sqrt();
                    if r.is_finite() { r.clamp(-1.0, 1.0) } else { f64::NAN }
                })
                .collect()
        })
        .collect();
    symmetrize(&mut out);
    ctx.progress(1.0);
    Ok(out)
}

/// Versión etiquetada: filas y columnas = variables del frame.
pub fn correlation_frame(frame: &NumericFrame, ctx: &dyn KernelContext) -> Result<NumericFrame, KernelError> {
    let r = correlation_matrix(&frame.columns_data(), ctx)?;
    Ok(NumericFrame::square(frame.columns().to_vec(), r)?)
}

pub fn partial_correlation_frame(frame: &NumericFrame, ctx: &dyn KernelContext) -> Result<NumericFrame, KernelError> {
    let r = partial_correlation_matrix(&frame.columns_data(), ctx)?;
    Ok(NumericFrame::square(frame.columns().to_vec(), r)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::math::stats::pearson;

    fn sample() -> Vec<Vec<f64>> {
        let x: Vec<f64> = (0..50).map(|i| (i as f64 * 0.37).sin() * 3.0 + i as f64 * 0.1).collect();
        let z: Vec<f64> = (0..50).map(|i| (i as f64 * 1.7).cos()).collect();
        let y: Vec<f64> =
            x.iter().zip(&z).enumerate().map(|(i, (a, b))| 0.5 * a + 2.0 * b + ((i * 7) % 5) as f64 * 0.3).collect();
        vec![x, y, z]
    }

    #[test]
    fn matches_pairwise_pearson_without_nan() {
        let cols = sample();
        let r = correlation_matrix(&cols, &()).unwrap();
        for i in 0..3 {
            assert_eq!(r[i][i], 1.0);
            for j in 0..3 {
                if i != j {
                    assert_relative_eq!(r[i][j], pearson(&cols[i], &cols[j]), epsilon = 1e-10);
                    assert_eq!(r[i][j], r[j][i]);
                }
            }
        }
    }

    #[test]
    fn zero_variance_column_has_zero_correlations() {
        let r = correlation_matrix(&[vec![1.0, 2.0, 3.0], vec![5.0, 5.0, 5.0]], &()).unwrap();
        assert_eq!(r[1][1], 0.0);
        assert_eq!(r[0][1], 0.0);
    }

    #[test]
    fn single_column_is_empty() {
        let err = correlation_matrix(&[vec![1.0, 2.0, 3.0]], &()).unwrap_err();
        assert!(matches!(err, KernelError::Empty(_)));
        assert!(matches!(partial_correlation_matrix(&[vec![1.0, 2.0, 3.0]], &()), Err(KernelError::Empty(_))));
    }

    #[test]
    fn ragged_input_is_a_validation_error() {
        let err = correlation_matrix(&[vec![1.0, 2.0], vec![1.0]], &()).unwrap_err();
        assert!(matches!(err, KernelError::Validation(_)));
    }

    #[test]
    fn partial_matches_three_variable_closed_form() {
        let cols = sample();
        let r = correlation_matrix(&cols, &()).unwrap();
        let pc = partial_correlation_matrix(&cols, &()).unwrap();
        // r_xy·z = (r_xy − r_xz r_yz) / sqrt((1 − r_xz²)(1 − r_yz²))
        let expected = (r[0][1] - r[0][2] * r[1][2]) / ((1.0 - r[0][2].powi(2)) * (1.0 - r[1][2].powi(2))).sqrt();
        assert_relative_eq!(pc[0][1], expected, epsilon = 1e-8);
        assert_eq!(pc[2][2], 1.0);
    }
}
