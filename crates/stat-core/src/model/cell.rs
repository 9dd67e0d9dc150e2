//! Valores de celda y su inferencia de tipo.
//!
//! `CellValue` es la unión etiquetada de todo lo que puede aparecer en un
//! dataset de entrada. `infer_cell` descubre el tipo "real" de una celda
//! (p.ej. el texto `"12"` es un entero, `"yes"` un booleano) y devuelve el
//! valor ya convertido; sobre ella se construye el artefacto `DataTypes`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Clave usada para serializar fechas como objeto `{"$date": "<rfc3339>"}`.
const DATE_TAG: &str = "$date";

/// Valor de una celda del dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
    Object(Value),
}

/// Tipos que la inferencia puede asignar a una celda o columna.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Date,
    Integer,
    Float,
    Null,
    Object,
    String,
}

impl DataType {
    /// Tipos cuyos valores admiten orden numérico (booleanos y fechas incluidos).
    pub fn is_numeric_like(self) -> bool {
        matches!(self, DataType::Boolean | DataType::Date | DataType::Integer | DataType::Float)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Null => "null",
            DataType::Object => "object",
            DataType::String => "string",
        }
    }
}

/// Resultado de inferir una celda: tipo + valor ya convertido a ese tipo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedCell {
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub value: CellValue,
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Missing => true,
            CellValue::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Representación numérica directa (sin parsear texto). Fechas como epoch ms.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Number(n) if !n.is_nan() => Some(*n),
            CellValue::Date(d) => Some(d.timestamp_millis() as f64),
            _ => None,
        }
    }

    /// Clave textual estable para contar/agrupar valores.
    pub fn group_key(&self) -> String {
        match self {
            CellValue::Missing => "null".to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Date(d) => d.to_rfc3339(),
            CellValue::Object(v) => crate::hashing::to_canonical_json(v),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Missing => Value::Null,
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Number(n) => serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Date(d) => {
                let mut map = Map::new();
                map.insert(DATE_TAG.to_string(), Value::String(d.to_rfc3339()));
                Value::Object(map)
            }
            CellValue::Object(v) => v.clone(),
        }
    }

    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => CellValue::Missing,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Missing),
            Value::String(s) => CellValue::Text(s),
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(Value::String(s)) = map.get(DATE_TAG) {
                        if let Ok(d) = DateTime::parse_from_rfc3339(s) {
                            return CellValue::Date(d.with_timezone(&Utc));
                        }
                    }
                }
                CellValue::Object(Value::Object(map))
            }
            other => CellValue::Object(other),
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self { CellValue::Number(v) }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self { CellValue::Bool(v) }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self { CellValue::Text(v.to_string()) }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(CellValue::from_json)
    }
}

/// Infiere el tipo de una celda y devuelve el valor convertido.
pub fn infer_cell(cell: &CellValue) -> TypedCell {
    let (data_type, value) = match cell {
        CellValue::Missing => (DataType::Null, CellValue::Missing),
        CellValue::Bool(b) => (DataType::Boolean, CellValue::Bool(*b)),
        CellValue::Number(n) if n.is_nan() => (DataType::Null, CellValue::Missing),
        CellValue::Number(n) => (number_type(*n), CellValue::Number(*n)),
        CellValue::Date(d) => (DataType::Date, CellValue::Date(*d)),
        CellValue::Object(v) => (DataType::Object, CellValue::Object(v.clone())),
        CellValue::Text(s) => infer_text(s),
    };
    TypedCell { data_type, value }
}

fn number_type(n: f64) -> DataType {
    if n.is_finite() && n.fract() == 0.0 {
        DataType::Integer
    } else {
        DataType::Float
    }
}

fn infer_text(raw: &str) -> (DataType, CellValue) {
    let s = raw.trim();
    let lower = s.to_lowercase();
    match lower.as_str() {
        "" | "null" | "undefined" | "nan" | "none" => return (DataType::Null, CellValue::Missing),
        "true" | "yes" => return (DataType::Boolean, CellValue::Bool(true)),
        "false" | "no" => return (DataType::Boolean, CellValue::Bool(false)),
        _ => {}
    }
    if let Ok(n) = s.parse::<f64>() {
        if !n.is_nan() {
            return (number_type(n), CellValue::Number(n));
        }
    }
    if let Some(d) = parse_date(s) {
        return (DataType::Date, CellValue::Date(d));
    }
    if s.starts_with('{') || s.starts_with('[') {
        if let Ok(v @ (Value::Object(_) | Value::Array(_))) = serde_json::from_str::<Value>(s) {
            return (DataType::Object, CellValue::Object(v));
        }
    }
    (DataType::String, CellValue::Text(raw.to_string()))
}

/// Fechas reconocidas: RFC 3339, `YYYY-MM-DDTHH:MM:SS` y `YYYY-MM-DD` (UTC).
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(d) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(d.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)).map(|d| d.and_utc())
}

/// Tipo dominante (más frecuente) de una secuencia de tipos. Empate: el
/// primero en aparecer. Secuencia vacía: `Null`.
pub fn dominant_type<'a, I>(types: I) -> DataType
    where I: IntoIterator<Item = &'a DataType>
{
    let mut counts: Vec<(DataType, usize)> = Vec::new();
    for t in types {
        match counts.iter_mut().find(|(k, _)| k == t) {
            Some((_, c)) => *c += 1,
            None => counts.push((*t, 1)),
        }
    }
    let mut best: Option<(DataType, usize)> = None;
    for (t, c) in counts {
        if best.map(|(_, bc)| c > bc).unwrap_or(true) {
            best = Some((t, c));
        }
    }
    best.map(|(t, _)| t).unwrap_or(DataType::Null)
}
