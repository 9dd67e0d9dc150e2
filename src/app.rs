//! Armado de componentes y carga de datasets para el binario.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use stat_core::{CellValue, Dataset};
use stat_engine::{ComputeBackend, InlineBackend, PipelineOrchestrator, WorkerBackend};
use stat_persistence::{ArtifactCache, SqliteKvStore};

use crate::config::{AppConfig, BackendKind};
use crate::error::AppError;

pub fn backend_for(kind: BackendKind) -> Arc<dyn ComputeBackend> {
    match kind {
        BackendKind::Worker => Arc::new(WorkerBackend::new()),
        BackendKind::Inline => Arc::new(InlineBackend::new()),
    }
}

/// Caché SQLite (migrada) según `config.database`.
pub fn open_cache(config: &AppConfig) -> Result<ArtifactCache, AppError> {
    let store = SqliteKvStore::from_config(&config.database)?;
    Ok(ArtifactCache::new(Arc::new(store)))
}

pub fn build_orchestrator(config: &AppConfig) -> Result<PipelineOrchestrator, AppError> {
    Ok(PipelineOrchestrator::new(open_cache(config)?, backend_for(config.backend)))
}

/// Dataset desde JSON. Acepta la forma `{columns, index?, values}` o una
/// lista de registros `[{col: valor, ...}, ...]`; en los registros las
/// columnas siguen el orden de primera aparición y las ausentes quedan
/// como faltantes.
pub fn parse_dataset(json: &str) -> Result<Dataset, AppError> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Array(records) => from_records(records),
        other => Ok(serde_json::from_value(other)?),
    }
}

fn from_records(records: Vec<Value>) -> Result<Dataset, AppError> {
    let mut columns: IndexMap<String, Vec<CellValue>> = IndexMap::new();
    for (i, record) in records.into_iter().enumerate() {
        let Value::Object(fields) = record else {
            return Err(AppError::Dataset(format!("record {i} is not an object")));
        };
        for (name, v) in fields {
            let col = columns.entry(name).or_insert_with(|| vec![CellValue::Missing; i]);
            col.push(CellValue::from_json(v));
        }
        for col in columns.values_mut() {
            if col.len() == i {
                col.push(CellValue::Missing);
            }
        }
    }
    Ok(Dataset::from_columns(columns.into_iter().collect())?)
}

pub fn load_dataset(path: &Path) -> Result<Dataset, AppError> {
    let text = std::fs::read_to_string(path)?;
    parse_dataset(&text)
}
