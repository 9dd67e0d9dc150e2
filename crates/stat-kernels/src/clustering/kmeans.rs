//! K-means (Lloyd con inicialización k-means++) y el meta-modelo que elige k
//! por silueta sobre una partición de prueba.

use std::time::{Duration, Instant};

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use stat_core::settings::KMeansSettings;

use crate::context::KernelContext;
use crate::error::KernelError;
use crate::math::stats::{mean, stdev};

fn sq_dist(a: &[f64], b: &[f64]) -> f64 { a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum() }

/// Escalado z por columna. Columnas sin varianza quedan con escala 1.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let p = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut mean_v = Vec::with_capacity(p);
        let mut scale = Vec::with_capacity(p);
        for j in 0..p {
            let col: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            mean_v.push(mean(&col));
            let sd = stdev(&col, 0);
            scale.push(if sd > 0.0 && sd.is_finite() { sd } else { 1.0 });
        }
        Self { mean: mean_v, scale }
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|r| r.iter().enumerate().map(|(j, v)| (v - self.mean[j]) / self.scale[j]).collect())
            .collect()
    }

    pub fn inverse_transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|r| r.iter().enumerate().map(|(j, v)| v * self.scale[j] + self.mean[j]).collect())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct KMeansModel {
    pub centroids: Vec<Vec<f64>>,
    /// Suma de distancias cuadradas al centroide asignado.
    pub inertia: f64,
}

impl KMeansModel {
    pub fn k(&self) -> usize { self.centroids.len() }

    pub fn predict(&self, row: &[f64]) -> usize {
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (c, centroid) in self.centroids.iter().enumerate() {
            let d = sq_dist(row, centroid);
            if d < best_d {
                best = c;
                best_d = d;
            }
        }
        best
    }

    pub fn predict_all(&self, rows: &[Vec<f64>]) -> Vec<usize> { rows.iter().map(|r| self.predict(r)).collect() }
}

fn init_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = vec![data[rng.gen_range(0..data.len())].clone()];
    let mut d2: Vec<f64> = data.iter().map(|r| sq_dist(r, &centroids[0])).collect();
    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = data.len() - 1;
            for (i, w) in d2.iter().enumerate() {
                if target < *w {
                    pick = i;
                    break;
                }
                target -= w;
            }
            pick
        } else {
            rng.gen_range(0..data.len())
        };
        let c = data[next].clone();
        for (i, r) in data.iter().enumerate() {
            d2[i] = d2[i].min(sq_dist(r, &c));
        }
        centroids.push(c);
    }
    centroids
}

fn lloyd(data: &[Vec<f64>], k: usize, max_iterations: usize, tolerance: f64, rng: &mut StdRng) -> KMeansModel {
    let p = data[0].len();
    let mut model = KMeansModel { centroids: init_plus_plus(data, k, rng), inertia: f64::INFINITY };
    for _ in 0..max_iterations.max(1) {
        let labels = model.predict_all(data);
        let mut sums = vec![vec![0.0; p]; k];
        let mut counts = vec![0usize; k];
        for (row, &c) in data.iter().zip(&labels) {
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(row) {
                *s += v;
            }
        }
        let mut shift: f64 = 0.0;
        for c in 0..k {
            // cluster vacío: conserva el centroide anterior
            if counts[c] == 0 {
                continue;
            }
            let updated: Vec<f64> = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            shift = shift.max(sq_dist(&updated, &model.centroids[c]));
            model.centroids[c] = updated;
        }
        if shift <= tolerance * tolerance {
            break;
        }
    }
    model.inertia = data.iter().map(|r| sq_dist(r, &model.centroids[model.predict(r)])).sum();
    model
}

/// Límites de un ajuste: iteraciones de Lloyd, reinicios y tiempo total de
/// los reinicios.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitBudget {
    pub max_iterations: usize,
    pub restarts: usize,
    pub tolerance: f64,
    /// `None` = sin límite. Al menos un reinicio corre siempre.
    pub max_time: Option<Duration>,
}

impl FitBudget {
    fn from_millis(max_iterations: usize, restarts: usize, tolerance: f64, max_time_ms: u64) -> Self {
        Self { max_iterations, restarts, tolerance, max_time: (max_time_ms > 0).then(|| Duration::from_millis(max_time_ms)) }
    }

    /// Presupuesto de cada k candidato.
    pub fn search(settings: &KMeansSettings) -> Self {
        Self::from_millis(settings.max_iterations, settings.max_restarts, settings.tolerance, settings.max_time_ms)
    }

    /// Presupuesto del ajuste final con el k elegido.
    pub fn last(settings: &KMeansSettings) -> Self {
        Self::from_millis(
            settings.final_max_iterations,
            settings.final_max_restarts,
            settings.tolerance,
            settings.final_max_time_ms,
        )
    }
}

/// Mejor de `budget.restarts` corridas de Lloyd (menor inercia). Deja de
/// reiniciar al agotar `budget.max_time`.
pub fn fit_kmeans(
    data: &[Vec<f64>],
    k: usize,
    budget: &FitBudget,
    rng: &mut StdRng,
    ctx: &dyn KernelContext,
) -> Result<KMeansModel, KernelError> {
    if data.is_empty() || k == 0 || k > data.len() {
        return Err(KernelError::Validation(format!("cannot fit {k} clusters on {} rows", data.len())));
    }
    let started = Instant::now();
    let mut best: Option<KMeansModel> = None;
    for restart in 0..budget.restarts.max(1) {
        if best.is_some() && budget.max_time.is_some_and(|t| started.elapsed() >= t) {
            debug!("k-means: k={k} stopped after {restart} restarts (time budget)");
            break;
        }
        ctx.checkpoint()?;
        let m = lloyd(data, k, budget.max_iterations, budget.tolerance, rng);
        if best.as_ref().map(|b| m.inertia < b.inertia).unwrap_or(true) {
            best = Some(m);
        }
    }
    best.ok_or_else(|| KernelError::Empty("k-means produced no model".into()))
}

/// Silueta media. Puntos solos en su cluster aportan 0; con menos de dos
/// clusters ocupados la silueta es 0.
pub fn silhouette(data: &[Vec<f64>], labels: &[usize], k: usize) -> f64 {
    let mut counts = vec![0usize; k];
    for &l in labels {
        counts[l] += 1;
    }
    if counts.iter().filter(|&&c| c > 0).count() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for (i, row) in data.iter().enumerate() {
        let own = labels[i];
        if counts[own] < 2 {
            continue;
        }
        let mut sums = vec![0.0; k];
        for (j, other) in data.iter().enumerate() {
            if i != j {
                sums[labels[j]] += sq_dist(row, other).sqrt();
            }
        }
        let a = sums[own] / (counts[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && counts[c] > 0)
            .map(|c| sums[c] / counts[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    total / data.len() as f64
}

/// Resultado del meta-modelo.
#[derive(Debug, Clone)]
pub struct MetaFit {
    pub model: KMeansModel,
    pub scaler: Option<StandardScaler>,
    /// `(k, silueta)` de cada candidato evaluado.
    pub scores: Vec<(usize, f64)>,
}

impl MetaFit {
    /// Filas en el espacio del modelo (escaladas si corresponde).
    pub fn prepare(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        match &self.scaler {
            Some(s) => s.transform(rows),
            None => rows.to_vec(),
        }
    }
}

/// Elige k entre `settings.ks` por silueta sobre una partición de prueba y
/// reentrena con todos los datos y el presupuesto final.
pub fn fit_meta(
    rows: &[Vec<f64>],
    settings: &KMeansSettings,
    rng: &mut StdRng,
    ctx: &dyn KernelContext,
) -> Result<MetaFit, KernelError> {
    let n = rows.len();
    let scaler = settings.normalize.then(|| StandardScaler::fit(rows));
    let data = match &scaler {
        Some(s) => s.transform(rows),
        None => rows.to_vec(),
    };

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let test_len = ((n as f64) * settings.test_size.clamp(0.0, 1.0)).ceil() as usize;
    let (test_idx, train_idx) = order.split_at(test_len.min(n));
    let candidates: Vec<usize> = settings.ks.iter().copied().filter(|&k| k >= 2 && k < n).collect();
    if candidates.is_empty() {
        return Err(KernelError::Empty(format!("not enough rows ({n}) to cluster")));
    }
    let max_k = candidates.iter().copied().max().unwrap_or(2);
    // partición demasiado chica: se puntúa sobre todos los datos
    let (train, test): (Vec<Vec<f64>>, Vec<Vec<f64>>) = if test_idx.len() < 2 || train_idx.len() < max_k {
        (data.clone(), data.clone())
    } else {
        (train_idx.iter().map(|&i| data[i].clone()).collect(), test_idx.iter().map(|&i| data[i].clone()).collect())
    };

    let search = FitBudget::search(settings);
    let steps = candidates.len() as f64 + 1.0;
    let mut scores = Vec::with_capacity(candidates.len());
    for (step, &k) in candidates.iter().enumerate() {
        ctx.progress(step as f64 / steps);
        let model = fit_kmeans(&train, k, &search, rng, ctx)?;
        let score = silhouette(&test, &model.predict_all(&test), k);
        debug!("k-means: k={k} silhouette={score:.4}");
        scores.push((k, score));
    }

    let mut best = scores[0];
    for &(k, s) in &scores[1..] {
        if s > best.1 {
            best = (k, s);
        }
    }
    ctx.progress((steps - 1.0) / steps);
    let model = fit_kmeans(&data, best.0, &FitBudget::last(settings), rng, ctx)?;
    ctx.progress(1.0);
    Ok(MetaFit { model, scaler, scores })
}
