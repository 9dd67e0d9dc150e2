//! PCA sobre la matriz de correlación de los datos recortados y normalizados.
//!
//! Cargas = vectores singulares izquierdos; autovalores = s² para s > 0.

use stat_core::{NumericFrame, PcaLoadings};

use crate::clip::{clip_outliers, DEFAULT_MAX_SCORE};
use crate::context::{KernelContext, SubRange};
use crate::correlation::correlation_matrix;
use crate::error::KernelError;
use crate::math::linalg::{from_rows, svd};
use crate::normalize::normalize;

/// Máximo de componentes reportados.
pub const MAX_COMPONENTS: usize = 5;

#[derive(Debug, Clone)]
pub struct PcaOutput {
    /// `loadings[i][k]`: carga de la variable `i` en el componente `k`.
    pub loadings: Vec<Vec<f64>>,
    /// Autovalores (descendentes) de los componentes con s > 0.
    pub eigenvalues: Vec<f64>,
}

pub fn pca(cols: &[Vec<f64>], ctx: &dyn KernelContext) -> Result<PcaOutput, KernelError> {
    let prepared: Vec<Vec<f64>> = cols.iter().map(|c| normalize(&clip_outliers(c, DEFAULT_MAX_SCORE))).collect();
    ctx.progress(0.1);
    let corr = correlation_matrix(&prepared, &SubRange::new(ctx, 0.1, 0.6))?;
    ctx.checkpoint()?;

    let d = svd(&from_rows(&corr)).ok_or_else(|| KernelError::Empty("PCA loadings are undefined for this dataset".into()))?;
    let kept: Vec<usize> = (0..d.s.len()).filter(|&k| d.s[k] > 0.0).collect();
    if kept.is_empty() {
        return Err(KernelError::Empty("no component has positive variance".into()));
    }
    let eigenvalues = kept.iter().map(|&k| d.s[k] * d.s[k]).collect();
    let loadings = (0..d.u.nrows()).map(|i| kept.iter().map(|&k| d.u[(i, k)]).collect()).collect();
    ctx.progress(1.0);
    Ok(PcaOutput { loadings, eigenvalues })
}

/// Cantidad de componentes que "importan": autovalor > 2 y > 5% de la suma de
/// los anteriores; al menos 1 y como mucho `MAX_COMPONENTS`.
pub fn select_component_count(eigenvalues: &[f64]) -> usize {
    let mut prev_sum = 0.0;
    let mut count = 0;
    for &v in eigenvalues {
        // con prev_sum = 0 el cociente es +inf (el primero siempre pasa el 5%)
        if v > 2.0 && v / prev_sum > 0.05 {
            count += 1;
        }
        prev_sum += v;
    }
    count.clamp(1, MAX_COMPONENTS).min(eigenvalues.len().max(1))
}

/// PCA etiquetado: filas = variables, columnas = `Factor 1..k`.
pub fn pca_loadings(frame: &NumericFrame, ctx: &dyn KernelContext) -> Result<PcaLoadings, KernelError> {
    if frame.shape().1 == 0 {
        return Err(KernelError::Empty("no numeric columns".into()));
    }
    let out = pca(&frame.columns_data(), ctx)?;
    let k = select_component_count(&out.eigenvalues).min(out.loadings.first().map(|r| r.len()).unwrap_or(0));
    let columns = (1..=k).map(|i| format!("Factor {i}")).collect();
    let values = out.loadings.iter().map(|r| r[..k].to_vec()).collect();
    let loadings = NumericFrame::new(columns, frame.columns().to_vec(), values)?;
    Ok(PcaLoadings { loadings, eigenvalues: out.eigenvalues })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn two_variables_have_closed_form_eigenvalues() {
        let x: Vec<f64> = (0..40).map(|i| (i as f64 * 0.5).sin()).collect();
        let y: Vec<f64> = x.iter().enumerate().map(|(i, v)| v + (i as f64 * 2.3).cos() * 0.5).collect();
        let r = correlation_matrix(&[normalize(&clip_outliers(&x, 5.0)), normalize(&clip_outliers(&y, 5.0))], &()).unwrap()[0][1];
        let out = pca(&[x, y], &()).unwrap();
        // autovalores de la correlación 2x2: 1 ± r ; s = autovalor => s² = (1 ± r)²
        assert_relative_eq!(out.eigenvalues[0].sqrt(), 1.0 + r.abs(), epsilon = 1e-8);
        assert_relative_eq!(out.loadings[0][0].abs(), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-8);
    }

    #[test]
    fn five_variables_match_symmetric_eigen_of_the_correlation() {
        let base: Vec<f64> = (0..200).map(|i| (i as f64 * 0.21).sin() * 3.0).collect();
        let cols: Vec<Vec<f64>> = vec![
            base.clone(),
            (0..200).map(|i| base[i] * 0.8 + (i as f64 * 1.3).cos()).collect(),
            (0..200).map(|i| ((i * 17) % 23) as f64 * 0.4).collect(),
            (0..200).map(|i| (i as f64 * 0.05).powi(2) - base[i] * 0.3).collect(),
            (0..200).map(|i| (i as f64 * 2.7).sin() + ((i * 7) % 5) as f64 * 0.6).collect(),
        ];
        let prepared: Vec<Vec<f64>> =
            cols.iter().map(|c| normalize(&clip_outliers(c, DEFAULT_MAX_SCORE))).collect();
        let corr = correlation_matrix(&prepared, &()).unwrap();
        let eig = nalgebra::SymmetricEigen::new(nalgebra::DMatrix::from_fn(5, 5, |i, j| corr[i][j]));
        let mut order: Vec<usize> = (0..5).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

        let out = pca(&cols, &()).unwrap();
        assert_eq!(out.eigenvalues.len(), 5);
        for (k, &e) in order.iter().enumerate() {
            // s = λ para una matriz simétrica semidefinida
            assert_relative_eq!(out.eigenvalues[k].sqrt(), eig.eigenvalues[e], epsilon = 1e-7);
            for i in 0..5 {
                assert_relative_eq!(out.loadings[i][k].abs(), eig.eigenvectors[(i, e)].abs(), epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn selection_bounds() {
        assert_eq!(select_component_count(&[1.5, 0.5]), 1);
        assert_eq!(select_component_count(&[5.0, 3.0, 0.1]), 2);
        assert_eq!(select_component_count(&[9.0; 8]), 5);
    }
}
