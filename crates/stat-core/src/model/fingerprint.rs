//! Fingerprint de contenido del dataset.
//!
//! `Fingerprint::of(dataset)` = blake3(JSON canónico de
//! `{"schema": CACHE_SCHEMA_VERSION, "dataset": dataset}`). Dos datasets con el
//! mismo fingerprint se consideran idénticos para la caché.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::dataset::Dataset;
use crate::constants::CACHE_SCHEMA_VERSION;
use crate::hashing::hash_value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(dataset: &Dataset) -> Self {
        // Serializar un Dataset no falla: sólo contiene strings, números y Values.
        let data = serde_json::to_value(dataset).unwrap_or_default();
        Self(hash_value(&json!({ "schema": CACHE_SCHEMA_VERSION, "dataset": data })))
    }

    /// Fingerprint provisto por el llamador (se usa tal cual).
    pub fn from_override(value: impl Into<String>) -> Self { Self(value.into()) }

    /// Override si existe; si no, hash del dataset.
    pub fn resolve(dataset: &Dataset, override_value: Option<&str>) -> Self {
        match override_value {
            Some(v) => Self::from_override(v),
            None => Self::of(dataset),
        }
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;

    fn ds(v: f64) -> Dataset {
        Dataset::from_columns(vec![("a".into(), vec![CellValue::Number(v), CellValue::Missing])]).unwrap()
    }

    #[test]
    fn equal_content_equal_fingerprint() {
        assert_eq!(Fingerprint::of(&ds(1.0)), Fingerprint::of(&ds(1.0)));
        assert_ne!(Fingerprint::of(&ds(1.0)), Fingerprint::of(&ds(2.0)));
        assert_eq!(Fingerprint::of(&ds(1.0)).as_str().len(), 64);
    }

    #[test]
    fn override_wins() {
        assert_eq!(Fingerprint::resolve(&ds(1.0), Some("abc")).as_str(), "abc");
    }
}
