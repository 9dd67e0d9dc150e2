//! Artefacto `KMeansResults`: meta-modelo K-means sobre los datos numéricos
//! recortados y proyección 2-D (t-SNE) de filas y centroides.
//!
//! Progreso: ajuste 0 – 0.75, proyección 0.75 – 1.

pub mod kmeans;
pub mod tsne;

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use stat_core::settings::{KMeansSettings, TsneSettings};
use stat_core::{KMeansResults, NumericFrame};

use crate::clip::{clip_outliers, DEFAULT_MAX_SCORE};
use crate::context::{KernelContext, SubRange};
use crate::error::KernelError;
use kmeans::fit_meta;
use tsne::tsne;

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

fn projection_columns(dims: usize) -> Vec<String> {
    const NAMES: [&str; 3] = ["x", "y", "z"];
    (0..dims).map(|d| NAMES.get(d).map(|s| s.to_string()).unwrap_or_else(|| format!("d{d}"))).collect()
}

pub fn cluster_label(i: usize) -> String { format!("Cluster{i}") }

pub fn k_means_results(
    frame: &NumericFrame,
    kmeans_settings: &KMeansSettings,
    tsne_settings: &TsneSettings,
    ctx: &dyn KernelContext,
) -> Result<KMeansResults, KernelError> {
    let kept: Vec<usize> = (0..frame.shape().0).filter(|&i| frame.values()[i].iter().all(|v| !v.is_nan())).collect();
    if kept.is_empty() || frame.shape().1 == 0 {
        return Err(KernelError::Empty("no complete numeric rows to cluster".into()));
    }
    let subset = frame.select_rows(&kept);
    let clipped_cols: Vec<Vec<f64>> =
        subset.columns_data().iter().map(|c| clip_outliers(c, DEFAULT_MAX_SCORE)).collect();
    let rows: Vec<Vec<f64>> =
        (0..kept.len()).map(|i| clipped_cols.iter().map(|c| c[i]).collect()).collect();

    let mut rng = rng_for(kmeans_settings.seed);
    let fit = fit_meta(&rows, kmeans_settings, &mut rng, &SubRange::new(ctx, 0.0, 0.75))?;
    let labels = fit.model.predict_all(&fit.prepare(&rows));
    let k = fit.model.k();
    debug!("k-means: selected k={k} over {} rows", rows.len());

    let cluster_index: Vec<String> = (0..k).map(cluster_label).collect();
    let learned = fit.model.centroids.clone();
    let transformed = match &fit.scaler {
        Some(s) => s.inverse_transform(&learned),
        None => learned.clone(),
    };

    let mut embed_input = rows;
    embed_input.extend(transformed.iter().cloned());
    let mut tsne_rng = rng_for(tsne_settings.seed.or(kmeans_settings.seed));
    let mut embedded = tsne(&embed_input, tsne_settings, &mut tsne_rng, &SubRange::new(ctx, 0.75, 1.0))?;
    let centroid_points = embedded.split_off(kept.len());

    let axes = projection_columns(tsne_settings.dimensions.max(1));
    let columns = subset.columns().to_vec();
    Ok(KMeansResults {
        labels,
        centroids_learned: NumericFrame::new(columns.clone(), cluster_index.clone(), learned)?,
        centroids_transformed: NumericFrame::new(columns, cluster_index.clone(), transformed)?,
        centroids_projected: NumericFrame::new(axes.clone(), cluster_index, centroid_points)?,
        data_projected: NumericFrame::new(axes, subset.index().to_vec(), embedded)?,
    })
}
