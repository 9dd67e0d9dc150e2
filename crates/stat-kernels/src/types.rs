//! Inferencia de tipos por celda y por columna.

use stat_core::model::{dominant_type, infer_cell};
use stat_core::{CellValue, DataType, Dataset, TypeFrame, TypedCell};

use crate::context::KernelContext;
use crate::error::KernelError;

/// Tipo por celda para todo el dataset (misma forma y etiquetas).
pub fn data_types(dataset: &Dataset, ctx: &dyn KernelContext) -> Result<TypeFrame, KernelError> {
    let rows = dataset.rows();
    let total = rows.len().max(1) as f64;
    let mut out = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        if i % 256 == 0 {
            ctx.checkpoint()?;
            ctx.progress(i as f64 / total);
        }
        out.push(row.iter().map(infer_cell).collect());
    }
    ctx.progress(1.0);
    Ok(TypeFrame::new(dataset.columns().to_vec(), dataset.index().to_vec(), out)?)
}

/// Tipo de columna para codificación: enteros y flotantes cuentan juntos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Boolean,
    Date,
    Number,
    String,
    Object,
    Null,
}

/// Columna inferida: tipo dominante (entre celdas no nulas) y valores
/// convertidos a ese tipo (las celdas que no encajan quedan `Missing`).
#[derive(Debug, Clone)]
pub struct InferredColumn {
    pub kind: ColumnKind,
    pub values: Vec<CellValue>,
}

impl InferredColumn {
    /// Valores como `f64` (NaN donde falta o no es numérico).
    pub fn numeric(&self) -> Vec<f64> { self.values.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect() }
}

fn column_kind(t: DataType) -> ColumnKind {
    match t {
        DataType::Boolean => ColumnKind::Boolean,
        DataType::Date => ColumnKind::Date,
        DataType::Integer | DataType::Float => ColumnKind::Number,
        DataType::String => ColumnKind::String,
        DataType::Object => ColumnKind::Object,
        DataType::Null => ColumnKind::Null,
    }
}

pub fn infer_column(values: &[CellValue]) -> InferredColumn {
    let typed: Vec<TypedCell> = values.iter().map(infer_cell).collect();
    let non_null: Vec<DataType> = typed
        .iter()
        .map(|t| match t.data_type {
            DataType::Float => DataType::Integer,
            other => other,
        })
        .filter(|t| *t != DataType::Null)
        .collect();
    let kind = column_kind(dominant_type(non_null.iter()));
    let values = typed.into_iter().map(|t| cast_cell(kind, t)).collect();
    InferredColumn { kind, values }
}

fn cast_cell(kind: ColumnKind, cell: TypedCell) -> CellValue {
    match (kind, cell.data_type) {
        (_, DataType::Null) => CellValue::Missing,
        (ColumnKind::Boolean, DataType::Boolean)
        | (ColumnKind::Date, DataType::Date)
        | (ColumnKind::Number, DataType::Integer | DataType::Float)
        | (ColumnKind::Object, DataType::Object) => cell.value,
        // en columnas de texto cualquier valor presente se lee como texto
        (ColumnKind::String, _) => CellValue::Text(cell.value.group_key()),
        _ => CellValue::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_frame_keeps_shape_and_labels() {
        let d = Dataset::from_columns(vec![
            ("a".into(), vec!["1".into(), "yes".into()]),
            ("b".into(), vec![CellValue::Missing, 2.5.into()]),
        ])
        .unwrap();
        let t = data_types(&d, &()).unwrap();
        t.ensure_matches(&d).unwrap();
        assert_eq!(t.rows()[0][0].data_type, DataType::Integer);
        assert_eq!(t.rows()[1][0].data_type, DataType::Boolean);
        assert_eq!(t.rows()[0][1].data_type, DataType::Null);
    }

    #[test]
    fn mixed_numeric_column_is_number() {
        let col = infer_column(&[1.0.into(), "2.5".into(), "x".into(), CellValue::Missing]);
        assert_eq!(col.kind, ColumnKind::Number);
        let n = col.numeric();
        assert_eq!(&n[..2], &[1.0, 2.5]);
        assert!(n[2].is_nan() && n[3].is_nan());
    }

    #[test]
    fn all_missing_column_is_null() {
        assert_eq!(infer_column(&[CellValue::Missing, "".into()]).kind, ColumnKind::Null);
    }
}
