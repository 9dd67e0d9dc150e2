//! `ArtifactCache`: registros de artefactos + fingerprint del dataset fuente
//! sobre un `KeyValueStore`.
//!
//! Claves (ver `ArtifactKind::store_key`):
//! - `/data/core-data`, `/data/core-data-hash`: dataset y su fingerprint.
//! - `/data/<kind>`: `ArtifactRecord` serializado.
//! - `/settings`: configuración de usuario (sobrevive a la invalidación).
//!
//! Invariante: cambiar el fingerprint borra TODAS las claves `/data/*` y
//! escribe dataset + hash nuevos en una sola operación atómica.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};
use stat_core::constants::{CORE_DATA_HASH_KEY, CORE_DATA_KEY, DATA_PREFIX, SETTINGS_KEY};
use stat_core::{Artifact, ArtifactKind, ArtifactRecord, Dataset, Fingerprint, Settings};

use crate::error::StorageError;
use crate::kv::{InMemoryKvStore, KeyValueStore};

#[derive(Clone)]
pub struct ArtifactCache {
    store: Arc<dyn KeyValueStore>,
}

impl ArtifactCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self { Self { store } }

    pub fn in_memory() -> Self { Self::new(Arc::new(InMemoryKvStore::new())) }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> { &self.store }

    /// Registro persistido para `kind`, sin importar su fingerprint.
    pub fn get(&self, kind: ArtifactKind) -> Result<Option<ArtifactRecord>, StorageError> {
        let key = kind.store_key();
        match self.store.get(key)? {
            None => Ok(None),
            Some(v) => serde_json::from_value(v)
                .map(Some)
                .map_err(|e| StorageError::Corrupt { key: key.to_string(), message: e.to_string() }),
        }
    }

    /// Artefacto decodificado sólo si fue calculado para `fingerprint`.
    pub fn get_artifact(&self, kind: ArtifactKind, fingerprint: &Fingerprint) -> Result<Option<Artifact>, StorageError> {
        let record = match self.get(kind)? {
            Some(r) if &r.fingerprint == fingerprint => r,
            Some(r) => {
                debug!("cache: {kind} stored for {} but current is {fingerprint}", r.fingerprint);
                return Ok(None);
            }
            None => return Ok(None),
        };
        Artifact::from_payload(kind, &record.payload)
            .map(Some)
            .map_err(|e| StorageError::Corrupt { key: kind.store_key().to_string(), message: e.to_string() })
    }

    pub fn set(&self, fingerprint: &Fingerprint, artifact: &Artifact) -> Result<ArtifactRecord, StorageError> {
        let kind = artifact.kind();
        if let Artifact::DataTypes(types) = artifact {
            if let Some(dataset) = self.get_dataset()? {
                types.ensure_matches(&dataset).map_err(|e| StorageError::Validation(e.to_string()))?;
            }
        }
        let payload = artifact.to_payload().map_err(|e| StorageError::Serialization(e.to_string()))?;
        let record = ArtifactRecord { kind, fingerprint: fingerprint.clone(), payload, stored_at: Utc::now() };
        self.store.set(kind.store_key(), &serde_json::to_value(&record)?)?;
        debug!("cache: stored {kind} for {fingerprint}");
        Ok(record)
    }

    pub fn get_fingerprint(&self) -> Result<Option<Fingerprint>, StorageError> {
        match self.store.get(CORE_DATA_HASH_KEY)? {
            None => Ok(None),
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
        }
    }

    /// Registra `fingerprint` como vigente. Si difiere del guardado, borra
    /// todos los datos derivados y escribe dataset + hash de forma atómica.
    /// Devuelve `true` si hubo cambio.
    pub fn set_fingerprint(&self, fingerprint: &Fingerprint, dataset: &Dataset) -> Result<bool, StorageError> {
        if self.get_fingerprint()?.as_ref() == Some(fingerprint) {
            return Ok(false);
        }
        let entries = [
            (CORE_DATA_KEY, serde_json::to_value(dataset)?),
            (CORE_DATA_HASH_KEY, serde_json::to_value(fingerprint)?),
        ];
        self.store.replace_prefix(DATA_PREFIX, &entries)?;
        debug!("cache: fingerprint changed to {fingerprint}, derived data cleared");
        Ok(true)
    }

    /// Borra todos los artefactos derivados (conserva dataset y hash).
    pub fn invalidate_all(&self) -> Result<(), StorageError> {
        let keys: Vec<&str> = ArtifactKind::ALL.iter().map(|k| k.store_key()).collect();
        self.store.remove_many(&keys)
    }

    pub fn get_dataset(&self) -> Result<Option<Dataset>, StorageError> {
        match self.store.get(CORE_DATA_KEY)? {
            None => Ok(None),
            Some(v) => serde_json::from_value(v)
                .map(Some)
                .map_err(|e| StorageError::Corrupt { key: CORE_DATA_KEY.to_string(), message: e.to_string() }),
        }
    }

    /// Configuración guardada o la de por defecto. Una entrada ilegible se
    /// ignora con un aviso.
    pub fn settings(&self) -> Result<Settings, StorageError> {
        match self.store.get(SETTINGS_KEY)? {
            None => Ok(Settings::default()),
            Some(v) => Ok(serde_json::from_value(v).unwrap_or_else(|e| {
                warn!("cache: unreadable settings ({e}), using defaults");
                Settings::default()
            })),
        }
    }

    pub fn set_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        self.store.set(SETTINGS_KEY, &serde_json::to_value(settings)?)
    }

    /// Borra todo el contenido del store (datos y configuración).
    pub fn clear(&self) -> Result<(), StorageError> { self.store.clear() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stat_core::model::infer_cell;
    use stat_core::{CellValue, NumericFrame, TypeFrame};

    fn dataset(shift: f64) -> Dataset {
        Dataset::from_columns(vec![("a".into(), vec![CellValue::Number(1.0 + shift), CellValue::Number(2.0)])]).unwrap()
    }

    fn frame() -> NumericFrame {
        NumericFrame::new(vec!["a".into()], vec!["row0".into(), "row1".into()], vec![vec![1.0], vec![2.0]]).unwrap()
    }

    #[test]
    fn artifact_is_only_returned_for_its_fingerprint() {
        let cache = ArtifactCache::in_memory();
        let d = dataset(0.0);
        let fp = Fingerprint::of(&d);
        assert!(cache.set_fingerprint(&fp, &d).unwrap());
        assert!(!cache.set_fingerprint(&fp, &d).unwrap());
        cache.set(&fp, &Artifact::NumbersOnly(frame())).unwrap();
        assert!(cache.get_artifact(ArtifactKind::NumbersOnly, &fp).unwrap().is_some());
        let other = Fingerprint::from_override("other");
        assert!(cache.get_artifact(ArtifactKind::NumbersOnly, &other).unwrap().is_none());
    }

    #[test]
    fn new_fingerprint_clears_derived_keys_but_not_settings() {
        let cache = ArtifactCache::in_memory();
        let d1 = dataset(0.0);
        let fp1 = Fingerprint::of(&d1);
        cache.set_fingerprint(&fp1, &d1).unwrap();
        cache.set(&fp1, &Artifact::NumbersOnly(frame())).unwrap();
        let mut s = Settings::default();
        s.distributions.top_n_to_count = 3;
        cache.set_settings(&s).unwrap();

        let d2 = dataset(1.0);
        let fp2 = Fingerprint::of(&d2);
        assert!(cache.set_fingerprint(&fp2, &d2).unwrap());
        assert!(cache.get(ArtifactKind::NumbersOnly).unwrap().is_none());
        assert_eq!(cache.get_fingerprint().unwrap(), Some(fp2));
        assert_eq!(cache.get_dataset().unwrap(), Some(d2));
        assert_eq!(cache.settings().unwrap().distributions.top_n_to_count, 3);
    }

    #[test]
    fn mismatched_types_frame_is_rejected() {
        let cache = ArtifactCache::in_memory();
        let d = dataset(0.0);
        let fp = Fingerprint::of(&d);
        cache.set_fingerprint(&fp, &d).unwrap();
        let cell = infer_cell(&CellValue::Number(1.0));
        let t = TypeFrame::new(vec!["zzz".into()], vec!["row0".into(), "row1".into()], vec![vec![cell.clone()], vec![cell]])
            .unwrap();
        assert!(matches!(cache.set(&fp, &Artifact::DataTypes(t)), Err(StorageError::Validation(_))));
    }
}
