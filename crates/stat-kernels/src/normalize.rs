//! Normalización z-score (desvío poblacional), ignorando NaN.

use crate::math::stats::{div_no_nan, mean, stdev};

pub fn normalize(x: &[f64]) -> Vec<f64> {
    let m = mean(x);
    let s = stdev(x, 0);
    x.iter().map(|&v| if v.is_nan() { v } else { div_no_nan(v - m, s) }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_mean_unit_variance() {
        let z = normalize(&[1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(z.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(z.iter().map(|v| v * v).sum::<f64>() / 4.0, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_column_maps_to_zero() {
        assert_eq!(normalize(&[3.0, 3.0, f64::NAN])[..2], [0.0, 0.0]);
    }
}
