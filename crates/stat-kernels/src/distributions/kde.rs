//! Estimación de densidad por núcleo gaussiano.

use std::f64::consts::PI;

/// Puntos de la serie muestreada.
pub const SERIES_POINTS: usize = 250;
/// Margen a cada lado del rango de datos (fracción del rango).
const RANGE_MARGIN: f64 = 0.15;
/// Ventana de evaluación en múltiplos del ancho de banda.
const WINDOW: f64 = 2.0;

fn gaussian(x: f64) -> f64 { (-x * x / 2.0).exp() / (2.0 * PI).sqrt() }

/// KDE sobre valores finitos.
pub struct Kde {
    sorted: Vec<f64>,
    bandwidth: f64,
}

impl Kde {
    /// Ancho de banda `(max − min) / 10`, con piso 1e-16.
    pub fn new(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let range = match (sorted.first(), sorted.last()) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0.0,
        };
        Self { sorted, bandwidth: (range / 10.0).max(1e-16) }
    }

    pub fn bandwidth(&self) -> f64 { self.bandwidth }

    /// Densidad en `x` sumando los puntos a menos de `WINDOW` anchos de banda.
    pub fn density(&self, x: f64) -> f64 {
        let n = self.sorted.len();
        if n == 0 {
            return 0.0;
        }
        let lo = self.sorted.partition_point(|v| *v < x - WINDOW * self.bandwidth);
        let hi = self.sorted.partition_point(|v| *v <= x + WINDOW * self.bandwidth);
        let norm = n as f64 * self.bandwidth;
        self.sorted[lo..hi].iter().map(|xi| gaussian((x - xi) / self.bandwidth) / norm).sum()
    }

    /// Serie `(x, densidad)` de `count` puntos equiespaciados en
    /// `[min − 0.15·rango, max + 0.15·rango)`, normalizada a pico 1.
    pub fn series(&self, count: usize) -> Vec<(f64, f64)> {
        let (min, max) = match (self.sorted.first(), self.sorted.last()) {
            (Some(a), Some(b)) => (*a, *b),
            _ => return Vec::new(),
        };
        let margin = (max - min) * RANGE_MARGIN;
        let (a, b) = (min - margin, max + margin);
        let step = (b - a) / count as f64;
        let mut points: Vec<(f64, f64)> = (0..count)
            .map(|i| {
                let x = if step > 0.0 { a + step * i as f64 } else { a };
                (x, self.density(x))
            })
            .collect();
        let peak = points.iter().map(|p| p.1).fold(0.0, f64::max);
        if peak > 0.0 {
            for p in &mut points {
                p.1 /= peak;
            }
        }
        points
    }
}
