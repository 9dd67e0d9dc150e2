//! Almacén clave/valor durable sobre el que se apoya la caché.
//!
//! Contrato mínimo `get/set/remove/clear` más dos operaciones atómicas:
//! `remove_many` y `replace_prefix` (borra todo un prefijo y escribe las
//! entradas nuevas en la misma transacción).

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::error::StorageError;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    /// Borra todas las claves dadas de forma atómica.
    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError>;
    /// Borra todas las claves que empiezan con `prefix` y luego escribe
    /// `entries`, todo o nada.
    fn replace_prefix(&self, prefix: &str, entries: &[(&str, Value)]) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Implementación en memoria (tests y uso efímero).
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self { Self::default() }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Value>>, StorageError> {
        self.entries.read().map_err(|_| StorageError::Unknown("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Value>>, StorageError> {
        self.entries.write().map_err(|_| StorageError::Unknown("in-memory store lock poisoned".into()))
    }
}

impl KeyValueStore for InMemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> { Ok(self.read()?.get(key).cloned()) }

    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.write()?.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.write()?.remove(key);
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut map = self.write()?;
        for k in keys {
            map.remove(*k);
        }
        Ok(())
    }

    fn replace_prefix(&self, prefix: &str, entries: &[(&str, Value)]) -> Result<(), StorageError> {
        let mut map = self.write()?;
        map.retain(|k, _| !k.starts_with(prefix));
        for (k, v) in entries {
            map.insert((*k).to_string(), v.clone());
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> { Ok(self.read()?.keys().cloned().collect()) }

    fn clear(&self) -> Result<(), StorageError> {
        self.write()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replace_prefix_keeps_other_keys() {
        let s = InMemoryKvStore::new();
        s.set("/data/a", &json!(1)).unwrap();
        s.set("/data/b", &json!(2)).unwrap();
        s.set("/settings", &json!({})).unwrap();
        s.replace_prefix("/data/", &[("/data/c", json!(3))]).unwrap();
        assert_eq!(s.keys().unwrap(), vec!["/data/c".to_string(), "/settings".into()]);
    }
}
