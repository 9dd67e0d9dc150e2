//! Álgebra lineal sobre nalgebra: SVD ordenada y pseudo-inversa.

use nalgebra::DMatrix;

/// Matriz `filas x columnas` a partir de filas.
pub fn from_rows(rows: &[Vec<f64>]) -> DMatrix<f64> {
    let nrows = rows.len();
    let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
    DMatrix::from_fn(nrows, ncols, |i, j| rows[i][j])
}

/// Matriz `n x p` a partir de `p` columnas de largo `n`.
pub fn from_columns(cols: &[Vec<f64>]) -> DMatrix<f64> {
    let ncols = cols.len();
    let nrows = cols.first().map(|c| c.len()).unwrap_or(0);
    DMatrix::from_fn(nrows, ncols, |i, j| cols[j][i])
}

pub fn to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..m.nrows()).map(|i| (0..m.ncols()).map(|j| m[(i, j)]).collect()).collect()
}

/// Descomposición `A = U · diag(s) · Vᵀ` con `s` en orden descendente.
#[derive(Debug, Clone)]
pub struct Svd {
    pub u: DMatrix<f64>,
    pub s: Vec<f64>,
    pub v: DMatrix<f64>,
}

/// SVD de una matriz cuadrada. `None` si la entrada contiene valores no
/// finitos o la descomposición no converge.
pub fn svd(m: &DMatrix<f64>) -> Option<Svd> {
    if m.iter().any(|v| !v.is_finite()) || m.is_empty() {
        return None;
    }
    let decomposition = m.clone().try_svd(true, true, f64::EPSILON, 10_000)?;
    let u = decomposition.u?;
    let v_t = decomposition.v_t?;
    let s = decomposition.singular_values;

    let mut order: Vec<usize> = (0..s.len()).collect();
    order.sort_by(|&a, &b| s[b].total_cmp(&s[a]));

    let u_sorted = DMatrix::from_fn(u.nrows(), order.len(), |i, j| u[(i, order[j])]);
    let v_sorted = DMatrix::from_fn(v_t.ncols(), order.len(), |i, j| v_t[(order[j], i)]);
    Some(Svd { u: u_sorted, s: order.iter().map(|&k| s[k]).collect(), v: v_sorted })
}

/// Pseudo-inversa de Moore-Penrose `V · diag(1/s) · Uᵀ`. Los valores
/// singulares por debajo de la tolerancia numérica se tratan como cero.
pub fn pseudo_inverse(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let Svd { u, s, v } = svd(m)?;
    let max_s = s.first().copied().unwrap_or(0.0);
    let tol = max_s * (m.nrows().max(m.ncols()) as f64) * f64::EPSILON;
    let inv_s = DMatrix::from_fn(s.len(), s.len(), |i, j| if i == j && s[i] > tol { 1.0 / s[i] } else { 0.0 });
    Some(v * inv_s * u.transpose())
}

/// Promedio de la matriz con su transpuesta.
pub fn symmetrize(m: &mut [Vec<f64>]) {
    let n = m.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = (m[i][j] + m[j][i]) / 2.0;
            m[i][j] = avg;
            m[j][i] = avg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn svd_is_sorted_and_reconstructs() {
        let m = from_rows(&[vec![1.0, 0.0], vec![0.0, 3.0]]);
        let d = svd(&m).expect("svd");
        assert_relative_eq!(d.s[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(d.s[1], 1.0, epsilon = 1e-12);
        let rebuilt = &d.u * DMatrix::from_diagonal(&nalgebra::DVector::from_vec(d.s.clone())) * d.v.transpose();
        for (a, b) in rebuilt.iter().zip(m.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn svd_rejects_nan() {
        assert!(svd(&from_rows(&[vec![f64::NAN]])).is_none());
    }

    #[test]
    fn pinv_of_invertible_is_inverse() {
        let m = from_rows(&[vec![2.0, 1.0], vec![1.0, 3.0]]);
        let p = pseudo_inverse(&m).unwrap();
        let id = &m * &p;
        assert_relative_eq!(id[(0, 0)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(id[(0, 1)], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn pinv_of_singular_is_finite() {
        let m = from_rows(&[vec![1.0, 1.0], vec![1.0, 1.0]]);
        let p = pseudo_inverse(&m).unwrap();
        assert!(p.iter().all(|v| v.is_finite()));
        assert_relative_eq!(p[(0, 0)], 0.25, epsilon = 1e-10);
    }
}
