//! t-SNE exacto (O(n²) por iteración) con búsqueda binaria de la precisión
//! por punto, exageración temprana, momento y ganancias adaptativas.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::Rng;
use stat_core::settings::TsneSettings;

use crate::context::KernelContext;
use crate::error::KernelError;

const EXAGGERATION: f64 = 4.0;
const EXAGGERATION_ITERS: usize = 100;
const MOMENTUM_SWITCH: usize = 250;
const MIN_GAIN: f64 = 0.01;
const P_FLOOR: f64 = 1e-12;

fn gaussian(rng: &mut StdRng) -> f64 {
    // Box-Muller
    let u: f64 = rng.gen_range(f64::EPSILON..1.0);
    let v: f64 = rng.gen();
    (-2.0 * u.ln()).sqrt() * (2.0 * std::f64::consts::PI * v).cos()
}

fn squared_distances(x: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = x.len();
    let mut d = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let v: f64 = x[i].iter().zip(&x[j]).map(|(a, b)| (a - b) * (a - b)).sum();
            d[i][j] = v;
            d[j][i] = v;
        }
    }
    d
}

/// Afinidades conjuntas simétricas P (suma 1).
fn joint_probabilities(d: &[Vec<f64>], perplexity: f64) -> Vec<Vec<f64>> {
    let n = d.len();
    let target = perplexity.ln();
    let mut p = vec![vec![0.0; n]; n];
    for i in 0..n {
        let (mut beta, mut lo, mut hi) = (1.0, f64::NEG_INFINITY, f64::INFINITY);
        let mut row = vec![0.0; n];
        for _ in 0..50 {
            let mut sum = 0.0;
            for j in 0..n {
                row[j] = if i == j { 0.0 } else { (-d[i][j] * beta).exp() };
                sum += row[j];
            }
            let sum = sum.max(f64::MIN_POSITIVE);
            let mut entropy = 0.0;
            for v in row.iter_mut() {
                *v /= sum;
                if *v > 1e-7 {
                    entropy -= *v * v.ln();
                }
            }
            let diff = entropy - target;
            if diff.abs() < 1e-5 {
                break;
            }
            if diff > 0.0 {
                lo = beta;
                beta = if hi.is_infinite() { beta * 2.0 } else { (beta + hi) / 2.0 };
            } else {
                hi = beta;
                beta = if lo.is_infinite() { beta / 2.0 } else { (beta + lo) / 2.0 };
            }
        }
        p[i] = row;
    }
    let scale = 2.0 * n as f64;
    let mut joint = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            joint[i][j] = ((p[i][j] + p[j][i]) / scale).max(P_FLOOR);
        }
    }
    joint
}

/// Incrusta las filas de `x` en `settings.dimensions` dimensiones. Se detiene
/// al agotar iteraciones o el presupuesto de tiempo.
pub fn tsne(
    x: &[Vec<f64>],
    settings: &TsneSettings,
    rng: &mut StdRng,
    ctx: &dyn KernelContext,
) -> Result<Vec<Vec<f64>>, KernelError> {
    let n = x.len();
    let dims = settings.dimensions.max(1);
    if n <= 1 {
        ctx.progress(1.0);
        return Ok(vec![vec![0.0; dims]; n]);
    }
    // la perplejidad efectiva no puede superar (n − 1) / 3
    let perplexity = settings.perplexity.min((n - 1) as f64 / 3.0).max(1.0);
    let p = joint_probabilities(&squared_distances(x), perplexity);
    ctx.checkpoint()?;

    let mut y: Vec<Vec<f64>> = (0..n).map(|_| (0..dims).map(|_| gaussian(rng) * 1e-4).collect()).collect();
    let mut update = vec![vec![0.0; dims]; n];
    let mut gains = vec![vec![1.0f64; dims]; n];

    let started = Instant::now();
    let budget = (settings.max_time_ms > 0).then(|| Duration::from_millis(settings.max_time_ms));
    let iterations = settings.max_iterations.max(1);

    for iter in 0..iterations {
        if iter % 10 == 0 {
            ctx.checkpoint()?;
            ctx.progress(iter as f64 / iterations as f64);
        }
        if budget.map(|b| started.elapsed() > b).unwrap_or(false) {
            break;
        }
        let exaggeration = if iter < EXAGGERATION_ITERS { EXAGGERATION } else { 1.0 };
        let momentum = if iter < MOMENTUM_SWITCH { 0.5 } else { 0.8 };

        let mut num = vec![vec![0.0; n]; n];
        let mut sum_num = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let d: f64 = y[i].iter().zip(&y[j]).map(|(a, b)| (a - b) * (a - b)).sum();
                let q = 1.0 / (1.0 + d);
                num[i][j] = q;
                num[j][i] = q;
                sum_num += 2.0 * q;
            }
        }
        let sum_num = sum_num.max(f64::MIN_POSITIVE);

        for i in 0..n {
            let mut grad = vec![0.0; dims];
            for j in 0..n {
                if i == j {
                    continue;
                }
                let q = (num[i][j] / sum_num).max(P_FLOOR);
                let mult = 4.0 * (exaggeration * p[i][j] - q) * num[i][j];
                for (g, (a, b)) in grad.iter_mut().zip(y[i].iter().zip(&y[j])) {
                    *g += mult * (a - b);
                }
            }
            for d in 0..dims {
                let same_sign = (grad[d] > 0.0) == (update[i][d] > 0.0);
                gains[i][d] = if same_sign { (gains[i][d] * 0.8).max(MIN_GAIN) } else { gains[i][d] + 0.2 };
                update[i][d] = momentum * update[i][d] - settings.learning_rate * gains[i][d] * grad[d];
            }
        }

        for d in 0..dims {
            let mut center = 0.0;
            for i in 0..n {
                y[i][d] += update[i][d];
                center += y[i][d];
            }
            center /= n as f64;
            for row in y.iter_mut() {
                row[d] -= center;
            }
        }
    }
    ctx.progress(1.0);
    Ok(y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn settings() -> TsneSettings { TsneSettings { max_iterations: 300, max_time_ms: 0, ..Default::default() } }

    #[test]
    fn tiny_inputs() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(tsne(&[], &settings(), &mut rng, &()).unwrap().is_empty());
        assert_eq!(tsne(&[vec![1.0, 2.0]], &settings(), &mut rng, &()).unwrap(), vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn separated_groups_stay_apart() {
        let x: Vec<Vec<f64>> =
            (0..20).map(|i| if i < 10 { vec![i as f64 * 0.01, 0.0] } else { vec![50.0 + i as f64 * 0.01, 50.0] }).collect();
        let mut rng = StdRng::seed_from_u64(11);
        let y = tsne(&x, &settings(), &mut rng, &()).unwrap();
        assert_eq!(y.len(), 20);
        assert!(y.iter().all(|r| r.len() == 2 && r.iter().all(|v| v.is_finite())));
        let dist = |a: &[f64], b: &[f64]| ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt();
        let within = dist(&y[0], &y[1]);
        let across = dist(&y[0], &y[15]);
        assert!(across > within);
    }

    #[test]
    fn seeded_runs_repeat_in_three_dimensions() {
        let x: Vec<Vec<f64>> = (0..15).map(|i| vec![(i as f64).sin(), (i as f64 * 0.3).cos(), i as f64 * 0.1]).collect();
        let s = TsneSettings { dimensions: 3, max_iterations: 60, ..settings() };
        let a = tsne(&x, &s, &mut StdRng::seed_from_u64(5), &()).unwrap();
        let b = tsne(&x, &s, &mut StdRng::seed_from_u64(5), &()).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|r| r.len() == 3 && r.iter().all(|v| v.is_finite())));
    }
}
