//! Tipado fuerte de payloads de artefactos.
//!
//! Cada tipo de payload declara los `ArtifactKind` que puede representar y su
//! versión de esquema. El payload persistido es un sobre
//! `{"schema_version": N, "data": <payload>}`; al decodificar se verifica kind,
//! versión y la validación semántica del tipo.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::ArtifactKind;

/// Errores posibles al codificar/decodificar un artefacto tipado.
#[derive(Debug, Error, PartialEq)]
pub enum ArtifactDecodeError {
    #[error("payload type cannot represent kind {found}")]
    KindMismatch { found: ArtifactKind },
    #[error("schema version mismatch: expected {expected}, found {found:?}")]
    VersionMismatch { expected: u32, found: Option<u32> },
    #[error("deserialize: {0}")]
    Deserialize(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Especificación de un payload de artefacto.
pub trait ArtifactSpec: Sized + Serialize + DeserializeOwned {
    /// Kinds que este tipo puede representar.
    const KINDS: &'static [ArtifactKind];
    /// Versión de esquema (incrementar en cambios incompatibles).
    const SCHEMA_VERSION: u32 = 1;

    /// Validación semántica ligera (sin efectos secundarios). Opcional.
    fn validate(&self, _kind: ArtifactKind) -> Result<(), String> { Ok(()) }

    fn encode(&self, kind: ArtifactKind) -> Result<Value, ArtifactDecodeError> {
        if !Self::KINDS.contains(&kind) {
            return Err(ArtifactDecodeError::KindMismatch { found: kind });
        }
        self.validate(kind).map_err(ArtifactDecodeError::Validation)?;
        let data = serde_json::to_value(self).map_err(|e| ArtifactDecodeError::Deserialize(e.to_string()))?;
        Ok(json!({ "schema_version": Self::SCHEMA_VERSION, "data": data }))
    }

    fn decode(kind: ArtifactKind, payload: &Value) -> Result<Self, ArtifactDecodeError> {
        if !Self::KINDS.contains(&kind) {
            return Err(ArtifactDecodeError::KindMismatch { found: kind });
        }
        let found = payload.get("schema_version").and_then(|v| v.as_u64()).map(|v| v as u32);
        if found != Some(Self::SCHEMA_VERSION) {
            return Err(ArtifactDecodeError::VersionMismatch { expected: Self::SCHEMA_VERSION, found });
        }
        let data = payload.get("data").cloned().unwrap_or(Value::Null);
        let decoded: Self = serde_json::from_value(data).map_err(|e| ArtifactDecodeError::Deserialize(e.to_string()))?;
        decoded.validate(kind).map_err(ArtifactDecodeError::Validation)?;
        Ok(decoded)
    }
}
