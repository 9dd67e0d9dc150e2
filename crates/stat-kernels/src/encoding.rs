//! Proyección numérica del dataset (`NumbersOnly`).
//!
//! Etapas y tramos de progreso:
//! 1. Columnas (0 – 0.5): booleanos → {0, 1}; fechas → epoch ms; números tal
//!    cual; columnas nulas descartadas; texto/objeto de baja cardinalidad →
//!    one-hot (k − 1 indicadores), el resto descartado.
//! 2. Duplicados (0.5 – 0.75): una columna casi perfectamente correlacionada
//!    con otra anterior se descarta.
//! 3. Filas (0.75 – 1): se descartan columnas sin ningún número y luego las
//!    filas con algún NaN restante.

use indexmap::IndexMap;
use log::debug;
use stat_core::settings::EncodingSettings;
use stat_core::{Dataset, NumericFrame};

use crate::context::{KernelContext, SubRange};
use crate::correlation::correlation_matrix;
use crate::error::KernelError;
use crate::math::stats::pearson;
use crate::types::{infer_column, ColumnKind, InferredColumn};

/// Cobertura mínima de los `max_unique_values` valores más frecuentes para
/// codificar una columna categórica.
const ONE_HOT_COVERAGE: f64 = 0.9;

pub fn to_numbers_only(
    dataset: &Dataset,
    settings: &EncodingSettings,
    ctx: &dyn KernelContext,
) -> Result<NumericFrame, KernelError> {
    let (_, ncols) = dataset.shape();
    let mut out: IndexMap<String, Vec<f64>> = IndexMap::new();

    for j in 0..ncols {
        ctx.checkpoint()?;
        ctx.progress(0.5 * j as f64 / ncols.max(1) as f64);
        let name = &dataset.columns()[j];
        let col = infer_column(&dataset.column(j));
        match col.kind {
            ColumnKind::Null => debug!("numbers-only: column '{name}' is empty, dropped"),
            ColumnKind::Boolean | ColumnKind::Date | ColumnKind::Number => {
                out.insert(name.clone(), col.numeric());
            }
            ColumnKind::String | ColumnKind::Object => encode_categorical(name, &col, settings, &mut out),
        }
    }
    ctx.progress(0.5);

    let names: Vec<String> = out.keys().cloned().collect();
    let cols: Vec<Vec<f64>> = out.into_values().collect();

    let duplicates = find_duplicates(&cols, settings.max_correlation_threshold, &SubRange::new(ctx, 0.5, 0.75))?;
    ctx.checkpoint()?;

    let keep_cols: Vec<usize> =
        (0..cols.len()).filter(|&j| !duplicates[j] && cols[j].iter().any(|v| !v.is_nan())).collect();
    let nrows = dataset.shape().0;
    let mut keep_rows = Vec::new();
    for i in 0..nrows {
        if i % 256 == 0 {
            ctx.progress(0.75 + 0.25 * i as f64 / nrows.max(1) as f64);
        }
        if keep_cols.iter().all(|&j| !cols[j][i].is_nan()) {
            keep_rows.push(i);
        }
    }

    let columns = keep_cols.iter().map(|&j| names[j].clone()).collect();
    let index = keep_rows.iter().map(|&i| dataset.index()[i].clone()).collect();
    let values = keep_rows.iter().map(|&i| keep_cols.iter().map(|&j| cols[j][i]).collect()).collect();
    ctx.progress(1.0);
    Ok(NumericFrame::new(columns, index, values)?)
}

fn encode_categorical(
    name: &str,
    col: &InferredColumn,
    settings: &EncodingSettings,
    out: &mut IndexMap<String, Vec<f64>>,
) {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for v in col.values.iter().filter(|v| !v.is_missing()) {
        *counts.entry(v.group_key()).or_insert(0) += 1;
    }
    let present: usize = counts.values().sum();
    if present == 0 {
        return;
    }
    let mut sorted: Vec<usize> = counts.values().copied().collect();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let top: usize = sorted.iter().take(settings.max_unique_values).sum();
    if (top as f64) / (present as f64) < ONE_HOT_COVERAGE {
        debug!("numbers-only: column '{name}' has too many distinct values, dropped");
        return;
    }
    if counts.len() < 2 {
        return;
    }

    let mut levels: Vec<&String> = counts.keys().collect();
    levels.sort();
    // k − 1 indicadores: el último nivel queda implícito
    for level in &levels[..levels.len() - 1] {
        let indicator: Vec<f64> = col
            .values
            .iter()
            .map(|v| if v.is_missing() { f64::NAN } else if &v.group_key() == *level { 1.0 } else { 0.0 })
            .collect();
        let redundant = out.iter().find(|(_, other)| pearson(&indicator, other) > settings.max_correlation_threshold);
        if let Some((other, _)) = redundant {
            debug!("numbers-only: indicator '{name}_{level}' duplicates '{other}', dropped");
            continue;
        }
        out.insert(format!("{name}_{level}"), indicator);
    }
}

/// `true` para cada columna casi idéntica a alguna anterior.
fn find_duplicates(cols: &[Vec<f64>], threshold: f64, ctx: &dyn KernelContext) -> Result<Vec<bool>, KernelError> {
    let mut dup = vec![false; cols.len()];
    if cols.len() < 2 || cols[0].len() < 2 {
        return Ok(dup);
    }
    let corr = correlation_matrix(cols, ctx)?;
    for i in 0..cols.len() {
        for j in 0..i {
            if !dup[j] && corr[i][j] > threshold {
                dup[i] = true;
                break;
            }
        }
    }
    Ok(dup)
}
