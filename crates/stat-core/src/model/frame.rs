//! Frames etiquetados producidos por los kernels.
//!
//! - `NumericFrame`: matriz `f64` (fila-mayor) con etiquetas. Se usa para la
//!   proyección numérica del dataset y para matrices de correlación /
//!   p-values (en ese caso `columns == index`).
//! - `TypeFrame`: misma forma que el dataset, con el tipo inferido por celda.
//!
//! Los `f64` no finitos se serializan como `null` y vuelven como `NaN`
//! (JSON no tiene NaN).

use serde::{Deserialize, Serialize};

use super::cell::{dominant_type, DataType, TypedCell};
use super::dataset::Dataset;
use crate::errors::DataError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNumericFrame")]
pub struct NumericFrame {
    columns: Vec<String>,
    index: Vec<String>,
    #[serde(serialize_with = "nan_safe::serialize_matrix")]
    values: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct RawNumericFrame {
    columns: Vec<String>,
    index: Vec<String>,
    #[serde(deserialize_with = "nan_safe::deserialize_matrix")]
    values: Vec<Vec<f64>>,
}

impl TryFrom<RawNumericFrame> for NumericFrame {
    type Error = DataError;
    fn try_from(raw: RawNumericFrame) -> Result<Self, Self::Error> { NumericFrame::new(raw.columns, raw.index, raw.values) }
}

impl NumericFrame {
    pub fn new(columns: Vec<String>, index: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self, DataError> {
        if index.len() != values.len() {
            return Err(DataError::Shape(format!("{} row labels for {} rows", index.len(), values.len())));
        }
        if let Some((i, row)) = values.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(DataError::Shape(format!("row {i} has {} values, expected {}", row.len(), columns.len())));
        }
        Ok(Self { columns, index, values })
    }

    /// Matriz cuadrada con las mismas etiquetas en filas y columnas.
    pub fn square(labels: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self, DataError> {
        Self::new(labels.clone(), labels, values)
    }

    /// Construye desde columnas; `cols[j]` es la columna `j`.
    pub fn from_columns(columns: Vec<String>, index: Vec<String>, cols: &[Vec<f64>]) -> Result<Self, DataError> {
        if cols.len() != columns.len() {
            return Err(DataError::Shape(format!("{} labels for {} columns", columns.len(), cols.len())));
        }
        let n = index.len();
        if let Some(j) = cols.iter().position(|c| c.len() != n) {
            return Err(DataError::Shape(format!("column {j} has {} values, expected {n}", cols[j].len())));
        }
        let values = (0..n).map(|i| cols.iter().map(|c| c[i]).collect()).collect();
        Self::new(columns, index, values)
    }

    pub fn columns(&self) -> &[String] { &self.columns }
    pub fn index(&self) -> &[String] { &self.index }
    pub fn values(&self) -> &[Vec<f64>] { &self.values }
    pub fn shape(&self) -> (usize, usize) { (self.values.len(), self.columns.len()) }
    pub fn is_empty(&self) -> bool { self.values.is_empty() || self.columns.is_empty() }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> { self.values.get(row).and_then(|r| r.get(col)).copied() }

    pub fn column(&self, j: usize) -> Vec<f64> { self.values.iter().map(|r| r[j]).collect() }

    /// Todas las columnas (transpuesta).
    pub fn columns_data(&self) -> Vec<Vec<f64>> { (0..self.columns.len()).map(|j| self.column(j)).collect() }

    pub fn is_square_labeled(&self) -> bool { self.columns == self.index }

    /// Subconjunto de filas (en el orden dado).
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            index: rows.iter().map(|&i| self.index[i].clone()).collect(),
            values: rows.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }
}

/// Frame de tipos inferidos por celda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeFrame {
    columns: Vec<String>,
    index: Vec<String>,
    values: Vec<Vec<TypedCell>>,
}

impl TypeFrame {
    pub fn new(columns: Vec<String>, index: Vec<String>, values: Vec<Vec<TypedCell>>) -> Result<Self, DataError> {
        if index.len() != values.len() || values.iter().any(|r| r.len() != columns.len()) {
            return Err(DataError::Shape("type frame rows/columns do not match labels".into()));
        }
        Ok(Self { columns, index, values })
    }

    pub fn columns(&self) -> &[String] { &self.columns }
    pub fn index(&self) -> &[String] { &self.index }
    pub fn rows(&self) -> &[Vec<TypedCell>] { &self.values }
    pub fn shape(&self) -> (usize, usize) { (self.values.len(), self.columns.len()) }

    pub fn column(&self, j: usize) -> Vec<&TypedCell> { self.values.iter().map(|r| &r[j]).collect() }

    /// Tipo más frecuente de la columna `j`.
    pub fn dominant_type(&self, j: usize) -> DataType { dominant_type(self.values.iter().map(|r| &r[j].data_type)) }

    /// Verifica que forma y etiquetas coinciden con las del dataset.
    pub fn ensure_matches(&self, dataset: &Dataset) -> Result<(), DataError> {
        if self.shape() != dataset.shape() {
            return Err(DataError::Shape(format!("types {:?} vs dataset {:?}", self.shape(), dataset.shape())));
        }
        if self.columns != dataset.columns() {
            return Err(DataError::LabelMismatch("column labels differ from dataset".into()));
        }
        if self.index != dataset.index() {
            return Err(DataError::LabelMismatch("row labels differ from dataset".into()));
        }
        Ok(())
    }
}

/// (De)serialización de `f64` tolerante a NaN/inf (→ `null` → NaN).
pub mod nan_safe {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde::ser::SerializeSeq;

    fn finite(v: f64) -> Option<f64> {
        if v.is_finite() { Some(v) } else { None }
    }

    pub fn serialize_vec<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(v.len()))?;
        for x in v {
            seq.serialize_element(&finite(*x))?;
        }
        seq.end()
    }

    pub fn deserialize_vec<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        let raw: Vec<Option<f64>> = Vec::deserialize(d)?;
        Ok(raw.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect())
    }

    pub fn serialize_matrix<S: Serializer>(m: &[Vec<f64>], s: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<Vec<Option<f64>>> = m.iter().map(|r| r.iter().map(|x| finite(*x)).collect()).collect();
        s.collect_seq(rows)
    }

    pub fn deserialize_matrix<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<f64>>, D::Error> {
        let raw: Vec<Vec<Option<f64>>> = Vec::deserialize(d)?;
        Ok(raw.into_iter().map(|r| r.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_becomes_null_and_back() {
        let f = NumericFrame::square(vec!["a".into(), "b".into()], vec![vec![1.0, f64::NAN], vec![f64::NAN, 1.0]]).unwrap();
        let json = serde_json::to_value(&f).unwrap();
        assert!(json["values"][0][1].is_null());
        let back: NumericFrame = serde_json::from_value(json).unwrap();
        assert!(back.get(0, 1).unwrap().is_nan());
        assert_eq!(back.get(1, 1), Some(1.0));
    }

    #[test]
    fn from_columns_transposes() {
        let f = NumericFrame::from_columns(vec!["a".into(), "b".into()], vec!["r0".into(), "r1".into()], &[vec![1.0, 2.0], vec![3.0, 4.0]])
            .unwrap();
        assert_eq!(f.values(), &[vec![1.0, 3.0], vec![2.0, 4.0]]);
        assert_eq!(f.column(1), vec![3.0, 4.0]);
    }
}
