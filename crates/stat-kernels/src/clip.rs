//! Recorte robusto de outliers (mediana ± k·MAD).

use crate::math::stats::{median, median_absolute_deviation};

/// Puntaje máximo por defecto.
pub const DEFAULT_MAX_SCORE: f64 = 5.0;

/// Vector binario: todos sus valores en {0, 1} y sin NaN.
pub fn is_binary(x: &[f64]) -> bool { x.iter().all(|&v| v == 0.0 || v == 1.0) }

/// Recorta cada valor a `[m − k·mad, m + k·mad]`. Los vectores binarios se
/// devuelven sin cambios; las posiciones NaN siguen siendo NaN.
pub fn clip_outliers(x: &[f64], max_score: f64) -> Vec<f64> {
    if is_binary(x) {
        return x.to_vec();
    }
    let m = median(x);
    let mad = median_absolute_deviation(x, m);
    if m.is_nan() || mad.is_nan() {
        return x.to_vec();
    }
    let (low, high) = (m - max_score * mad, m + max_score * mad);
    x.iter().map(|&v| if v.is_nan() { v } else { v.clamp(low, high) }).collect()
}
