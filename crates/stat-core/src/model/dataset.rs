//! Dataset fuente: matriz de celdas + etiquetas de columnas y filas.
//!
//! Invariantes (verificadas en construcción y al deserializar):
//! - `index.len() == values.len()`.
//! - Cada fila tiene `columns.len()` celdas.
//! - Las etiquetas de columna son únicas.
//!
//! Es inmutable una vez construido; los kernels reciben `&Dataset`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::cell::CellValue;
use crate::errors::DataError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    columns: Vec<String>,
    index: Vec<String>,
    values: Vec<Vec<CellValue>>,
}

#[derive(Deserialize)]
struct RawDataset {
    columns: Vec<String>,
    #[serde(default)]
    index: Option<Vec<String>>,
    values: Vec<Vec<CellValue>>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = DataError;

    fn try_from(raw: RawDataset) -> Result<Self, Self::Error> {
        let index = raw.index.unwrap_or_else(|| default_index(raw.values.len()));
        Dataset::new(raw.columns, index, raw.values)
    }
}

/// Etiquetas de fila por defecto: `row0`, `row1`, ...
pub fn default_index(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("row{i}")).collect()
}

impl Dataset {
    pub fn new(columns: Vec<String>, index: Vec<String>, values: Vec<Vec<CellValue>>) -> Result<Self, DataError> {
        if index.len() != values.len() {
            return Err(DataError::Shape(format!("{} row labels for {} rows", index.len(), values.len())));
        }
        if let Some((i, row)) = values.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(DataError::Shape(format!("row {i} has {} cells, expected {}", row.len(), columns.len())));
        }
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c.as_str()) {
                return Err(DataError::DuplicateColumn(c.clone()));
            }
        }
        Ok(Self { columns, index, values })
    }

    /// Construye desde columnas `(nombre, valores)`; todas deben tener el mismo largo.
    pub fn from_columns(cols: Vec<(String, Vec<CellValue>)>) -> Result<Self, DataError> {
        let n = cols.first().map(|(_, v)| v.len()).unwrap_or(0);
        if let Some((name, v)) = cols.iter().find(|(_, v)| v.len() != n) {
            return Err(DataError::Shape(format!("column {name} has {} values, expected {n}", v.len())));
        }
        let columns: Vec<String> = cols.iter().map(|(c, _)| c.clone()).collect();
        let values = (0..n).map(|i| cols.iter().map(|(_, v)| v[i].clone()).collect()).collect();
        Self::new(columns, default_index(n), values)
    }

    pub fn columns(&self) -> &[String] { &self.columns }
    pub fn index(&self) -> &[String] { &self.index }
    pub fn rows(&self) -> &[Vec<CellValue>] { &self.values }

    /// `(filas, columnas)`
    pub fn shape(&self) -> (usize, usize) { (self.values.len(), self.columns.len()) }

    pub fn is_empty(&self) -> bool { self.values.is_empty() || self.columns.is_empty() }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.values.get(row).and_then(|r| r.get(col))
    }

    /// Copia de la columna `j` (vacía si no existe).
    pub fn column(&self, j: usize) -> Vec<CellValue> {
        self.values.iter().filter_map(|r| r.get(j).cloned()).collect()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_ragged_rows() {
        let err = Dataset::new(vec!["a".into(), "b".into()], default_index(1), vec![vec![1.0.into()]]);
        assert!(matches!(err, Err(DataError::Shape(_))));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let err = Dataset::new(vec!["a".into(), "a".into()], vec![], vec![]);
        assert_eq!(err, Err(DataError::DuplicateColumn("a".into())));
    }

    #[test]
    fn deserializes_with_default_index() {
        let d: Dataset = serde_json::from_value(json!({
            "columns": ["x", "y"],
            "values": [[1, "a"], [null, true]]
        }))
        .unwrap();
        assert_eq!(d.index(), &["row0".to_string(), "row1".to_string()]);
        assert_eq!(d.cell(1, 0), Some(&CellValue::Missing));
        assert_eq!(d.shape(), (2, 2));
    }

    #[test]
    fn invalid_payload_fails_deserialization() {
        let r: Result<Dataset, _> = serde_json::from_value(json!({
            "columns": ["x"], "index": ["a", "b"], "values": [[1]]
        }));
        assert!(r.is_err());
    }
}
