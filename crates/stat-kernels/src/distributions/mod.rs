//! Distribuciones por variable (discretas o continuas) y su orden de salida.
//!
//! Orden final: demográficas (alfabético), continuas (cadena por
//! similitud sobre su matriz de correlación), discretas (alfabético).

pub mod chain_sort;
pub mod kde;

use std::collections::HashMap;

use indexmap::IndexMap;
use stat_core::settings::DistributionSettings;
use stat_core::{
    CellValue, DataType, Dataset, DistributionPoint, DistributionType, TypeFrame, TypedCell, VariableDistribution,
};

use crate::context::{KernelContext, SubRange};
use crate::correlation::correlation_matrix;
use crate::error::KernelError;
use crate::math::linalg::symmetrize;
use chain_sort::chain_sort;
use kde::{Kde, SERIES_POINTS};

/// Frases que marcan una variable como demográfica (coincidencia por
/// subcadena, sin distinguir mayúsculas).
pub const DEMOGRAPHIC_PHRASES: &[&str] = &[
    "age", "agnostic", "atheist", "buddh", "child", "children", "christ", "city", "college", "country",
    "date of birth", "dependents", "education", "employed", "employment", "ethnicity", "female", "gender", "hindu",
    "income", "islam", "jew", "job", "location", "male", "marital", "married", "muslim", "pay", "race",
    "relationship", "religion", "religious", "salary", "sex", "sikh", "trans", "wealth", "year of birth",
    "years old", "yob", "zip",
];

/// Cobertura mínima de los `top_n` valores más frecuentes para tratar una
/// variable como de pocos valores.
const FEW_UNIQUE_SHARE: f64 = 0.95;
/// Rótulo del balde de valores restantes.
const OTHER_LABEL: &str = "Other";

pub fn is_demographic(name: &str) -> bool {
    let lower = name.to_lowercase();
    DEMOGRAPHIC_PHRASES.iter().any(|p| lower.contains(p))
}

/// Conteos por valor, ordenados por frecuencia descendente (empates: orden
/// de aparición).
fn value_counts(values: &[CellValue]) -> Vec<(CellValue, usize)> {
    let mut counts: IndexMap<String, (CellValue, usize)> = IndexMap::new();
    for v in values.iter().filter(|v| !v.is_missing()) {
        counts.entry(v.group_key()).or_insert_with(|| (v.clone(), 0)).1 += 1;
    }
    let mut out: Vec<(CellValue, usize)> = counts.into_values().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

/// `true` si los `n` valores más frecuentes cubren al menos `share` del total
/// de valores presentes.
pub fn has_few_unique_values(values: &[CellValue], n: usize, share: f64) -> bool {
    let counts = value_counts(values);
    let total: usize = counts.iter().map(|c| c.1).sum();
    if total == 0 {
        return false;
    }
    let top: usize = counts.iter().take(n).map(|c| c.1).sum();
    top as f64 / total as f64 >= share
}

fn discrete(name: &str, data_type: DataType, values: &[CellValue], top_n: usize) -> VariableDistribution {
    let counts = value_counts(values);
    let total: usize = counts.iter().map(|c| c.1).sum();
    let mut kept = Vec::new();
    let mut others = 0usize;
    let mut share = 0.0;
    let mut done = false;
    for (i, (value, count)) in counts.into_iter().enumerate() {
        share += count as f64 / total as f64;
        if done {
            others += count;
            continue;
        }
        if share > FEW_UNIQUE_SHARE || i >= top_n {
            done = true;
        }
        kept.push((value, count));
    }
    if data_type.is_numeric_like() {
        kept.sort_by(|a, b| {
            let (x, y) = (a.0.as_f64().unwrap_or(f64::NAN), b.0.as_f64().unwrap_or(f64::NAN));
            x.total_cmp(&y)
        });
    } else {
        kept.sort_by(|a, b| b.1.cmp(&a.1));
    }
    let mut points: Vec<DistributionPoint> = kept.into_iter().map(|(v, c)| DistributionPoint(v, c as f64)).collect();
    if others > 0 {
        points.push(DistributionPoint(CellValue::Text(OTHER_LABEL.into()), others as f64));
    }
    VariableDistribution {
        name: name.to_string(),
        points,
        data_type,
        distribution_type: DistributionType::Discrete,
        is_demographic: false,
    }
}

fn continuous(name: &str, data_type: DataType, values: &[f64]) -> VariableDistribution {
    let points = Kde::new(values)
        .series(SERIES_POINTS)
        .into_iter()
        .map(|(x, y)| DistributionPoint(CellValue::Number(x), y))
        .collect();
    VariableDistribution {
        name: name.to_string(),
        points,
        data_type,
        distribution_type: DistributionType::Continuous,
        is_demographic: false,
    }
}

/// Valor de la celda leído como `data_type` (`Missing` si no encaja). Fechas
/// como epoch ms; enteros truncados.
fn cast_typed(cell: &TypedCell, data_type: DataType) -> CellValue {
    match (data_type, cell.data_type, &cell.value) {
        (_, DataType::Null, _) => CellValue::Missing,
        (DataType::Integer, DataType::Integer | DataType::Float, v) => {
            v.as_f64().map(|x| CellValue::Number(x.trunc())).unwrap_or(CellValue::Missing)
        }
        (DataType::Float, DataType::Integer | DataType::Float, v) => v.clone(),
        (DataType::Date, DataType::Date, v) => v.as_f64().map(CellValue::Number).unwrap_or(CellValue::Missing),
        (DataType::Boolean, DataType::Boolean, v) => v.clone(),
        (DataType::Object, DataType::Object, v) => v.clone(),
        (DataType::String, _, v) => CellValue::Text(v.group_key()),
        _ => CellValue::Missing,
    }
}

pub fn variable_distributions(
    dataset: &Dataset,
    types: &TypeFrame,
    settings: &DistributionSettings,
    ctx: &dyn KernelContext,
) -> Result<Vec<VariableDistribution>, KernelError> {
    types.ensure_matches(dataset)?;
    let top_n = settings.top_n_to_count.max(1);
    let ncols = dataset.shape().1;

    let mut demographic = Vec::new();
    let mut continuous_vars = Vec::new();
    let mut discrete_vars = Vec::new();
    let mut continuous_data: HashMap<String, Vec<f64>> = HashMap::new();

    for j in 0..ncols {
        ctx.checkpoint()?;
        ctx.progress(0.9 * j as f64 / ncols.max(1) as f64);
        let name = &dataset.columns()[j];
        let data_type = types.dominant_type(j);
        if data_type == DataType::Null {
            continue;
        }
        let cast: Vec<CellValue> = types.column(j).into_iter().map(|c| cast_typed(c, data_type)).collect();
        let present: Vec<CellValue> = cast.iter().filter(|v| !v.is_missing()).cloned().collect();
        if present.is_empty() {
            continue;
        }

        let few = has_few_unique_values(&present, top_n, FEW_UNIQUE_SHARE);
        let mut result = match data_type {
            DataType::Boolean => discrete(name, data_type, &present, top_n),
            DataType::Date | DataType::Integer | DataType::Float if few => discrete(name, data_type, &present, top_n),
            DataType::Date | DataType::Integer | DataType::Float => {
                let numeric: Vec<f64> = present.iter().filter_map(|v| v.as_f64()).collect();
                continuous_data.insert(name.clone(), cast.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect());
                continuous(name, data_type, &numeric)
            }
            DataType::String | DataType::Object if few => discrete(name, data_type, &present, top_n),
            _ => continue,
        };

        if is_demographic(name) {
            result.is_demographic = true;
            demographic.push(result);
        } else if result.distribution_type == DistributionType::Continuous {
            continuous_vars.push(result);
        } else {
            discrete_vars.push(result);
        }
    }

    demographic.sort_by(|a, b| a.name.cmp(&b.name));
    discrete_vars.sort_by(|a, b| a.name.cmp(&b.name));

    if continuous_vars.len() > 1 {
        let cols: Vec<Vec<f64>> =
            continuous_vars.iter().map(|v| continuous_data.remove(&v.name).unwrap_or_default()).collect();
        let mut corr = correlation_matrix(&cols, &SubRange::new(ctx, 0.9, 1.0))?;
        symmetrize(&mut corr);
        let order = chain_sort(&corr);
        let mut slots: Vec<Option<VariableDistribution>> = continuous_vars.into_iter().map(Some).collect();
        continuous_vars = order.into_iter().filter_map(|i| slots[i].take()).collect();
    }

    ctx.progress(1.0);
    let mut out = demographic;
    out.extend(continuous_vars);
    out.extend(discrete_vars);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::data_types;

    fn run(d: &Dataset) -> Vec<VariableDistribution> {
        let t = data_types(d, &()).unwrap();
        variable_distributions(d, &t, &DistributionSettings::default(), &()).unwrap()
    }

    #[test]
    fn boolean_column_with_nulls() {
        let values: Vec<CellValue> = (0..1000)
            .map(|i| match i % 10 {
                0 => CellValue::Missing,
                1..=6 => CellValue::Bool(true),
                _ => CellValue::Bool(false),
            })
            .collect();
        let d = Dataset::from_columns(vec![("flag".into(), values)]).unwrap();
        let out = run(&d);
        assert_eq!(out.len(), 1);
        let dist = &out[0];
        assert_eq!(dist.data_type, DataType::Boolean);
        assert_eq!(dist.distribution_type, DistributionType::Discrete);
        assert_eq!(dist.points.len(), 2);
        let total: f64 = dist.points.iter().map(|p| p.1).sum();
        assert_eq!(total, 900.0);
        // ordenado por valor: false antes que true
        assert_eq!(dist.points[0].0, CellValue::Bool(false));
    }

    #[test]
    fn many_unique_numbers_are_continuous() {
        let values: Vec<CellValue> = (0..300).map(|i| CellValue::Number((i as f64 * 0.731).sin() * 10.0)).collect();
        let d = Dataset::from_columns(vec![("score".into(), values)]).unwrap();
        let out = run(&d);
        assert_eq!(out[0].distribution_type, DistributionType::Continuous);
        assert_eq!(out[0].points.len(), SERIES_POINTS);
        assert!(out[0].points.iter().any(|p| p.1 == 1.0));
    }

    #[test]
    fn high_cardinality_text_is_skipped_and_tail_goes_to_other() {
        let d = Dataset::from_columns(vec![
            ("id".into(), (0..100).map(|i| CellValue::Text(format!("user-{i}"))).collect()),
            (
                "tier".into(),
                (0..100)
                    .map(|i| CellValue::Text(if i < 90 { "gold".into() } else { format!("t{i}") }))
                    .collect(),
            ),
        ])
        .unwrap();
        let out = run(&d);
        assert_eq!(out.len(), 1);
        let tier = &out[0];
        assert_eq!(tier.points[0], DistributionPoint("gold".into(), 90.0));
        let last = tier.points.last().unwrap();
        assert_eq!(last.0, CellValue::Text("Other".into()));
    }

    #[test]
    fn demographic_variables_come_first() {
        let mk = |f: fn(usize) -> f64| (0..120).map(|i| CellValue::Number(f(i))).collect::<Vec<_>>();
        let d = Dataset::from_columns(vec![
            ("zeta".into(), mk(|i| (i % 3) as f64)),
            ("Income".into(), mk(|i| i as f64 * 1.5)),
            ("alpha".into(), mk(|i| (i % 2) as f64)),
        ])
        .unwrap();
        let names: Vec<String> = run(&d).into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["Income", "alpha", "zeta"]);
    }
}
