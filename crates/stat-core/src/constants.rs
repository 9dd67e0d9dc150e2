//! Constantes del pipeline.
//!
//! `CACHE_SCHEMA_VERSION` participa en el fingerprint del dataset: al cambiarla
//! todas las cachés existentes quedan invalidadas de forma determinista aunque
//! los datos no cambien.

/// Versión lógica del formato de caché. Incrementar sólo ante cambios
/// incompatibles en los payloads persistidos.
pub const CACHE_SCHEMA_VERSION: &str = "C1.0";

/// Prefijo común de todas las claves derivadas del dataset.
pub const DATA_PREFIX: &str = "/data/";
/// Clave del dataset fuente.
pub const CORE_DATA_KEY: &str = "/data/core-data";
/// Clave del fingerprint del dataset fuente.
pub const CORE_DATA_HASH_KEY: &str = "/data/core-data-hash";
/// Clave de la configuración de usuario (no se borra al invalidar).
pub const SETTINGS_KEY: &str = "/settings";
