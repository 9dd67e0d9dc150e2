//! Estadísticos básicos que ignoran NaN.

/// Valores no-NaN.
pub fn finite_values(x: &[f64]) -> Vec<f64> { x.iter().copied().filter(|v| !v.is_nan()).collect() }

/// Media ignorando NaN (NaN si no hay valores).
pub fn mean(x: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in x.iter().filter(|v| !v.is_nan()) {
        sum += v;
        n += 1;
    }
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Mediana ignorando NaN (NaN si no hay valores).
pub fn median(x: &[f64]) -> f64 {
    let mut v = finite_values(x);
    if v.is_empty() {
        return f64::NAN;
    }
    v.sort_by(|a, b| a.total_cmp(b));
    let mid = v.len() / 2;
    if v.len() % 2 == 0 { (v[mid - 1] + v[mid]) / 2.0 } else { v[mid] }
}

/// Desviación absoluta mediana respecto de `center`.
pub fn median_absolute_deviation(x: &[f64], center: f64) -> f64 {
    let dev: Vec<f64> = x.iter().filter(|v| !v.is_nan()).map(|v| (v - center).abs()).collect();
    median(&dev)
}

/// Varianza (poblacional si `ddof == 0`, muestral si `ddof == 1`) ignorando NaN.
pub fn variance(x: &[f64], ddof: usize) -> f64 {
    let v = finite_values(x);
    if v.len() <= ddof {
        return f64::NAN;
    }
    let m = mean(&v);
    v.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (v.len() - ddof) as f64
}

pub fn stdev(x: &[f64], ddof: usize) -> f64 { variance(x, ddof).sqrt() }

/// División que devuelve 0 cuando el resultado no es finito (divNoNan).
pub fn div_no_nan(a: f64, b: f64) -> f64 {
    let r = a / b;
    if r.is_finite() { r } else { 0.0 }
}

/// Descarta las posiciones donde alguno de los dos vectores es NaN.
pub fn drop_nan_pairwise(a: &[f64], b: &[f64]) -> (Vec<f64>, Vec<f64>) {
    a.iter().zip(b).filter(|(x, y)| !x.is_nan() && !y.is_nan()).map(|(x, y)| (*x, *y)).unzip()
}

/// Correlación de Pearson sobre pares completos (NaN si no está definida).
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let (a, b) = drop_nan_pairwise(a, b);
    if a.len() < 2 {
        return f64::NAN;
    }
    let (ma, mb) = (mean(&a), mean(&b));
    let mut num = 0.0;
    let mut da = 0.0;
    let mut db = 0.0;
    for (x, y) in a.iter().zip(&b) {
        num += (x - ma) * (y - mb);
        da += (x - ma).powi(2);
        db += (y - mb).powi(2);
    }
    num / (da * db).sqrt()
}
