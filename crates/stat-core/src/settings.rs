//! Configuración de usuario persistida en `/settings`.
//!
//! No forma parte del fingerprint: cambiar un ajuste no invalida la caché
//! salvo que el llamador lo incluya explícitamente como override.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationMode {
    #[default]
    End,
    Middle,
    Start,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub truncation_mode: TruncationMode,
    pub k_means: KMeansSettings,
    pub tsne: TsneSettings,
    pub distributions: DistributionSettings,
    pub numbers_only: EncodingSettings,
}

/// Parámetros del meta-modelo K-means (selección de k por silueta).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansSettings {
    /// k candidatos.
    pub ks: Vec<usize>,
    pub max_iterations: usize,
    pub max_restarts: usize,
    pub final_max_iterations: usize,
    pub final_max_restarts: usize,
    /// Presupuesto en ms de los reinicios de cada k candidato; 0 = sin límite.
    pub max_time_ms: u64,
    /// Presupuesto en ms de los reinicios del ajuste final; 0 = sin límite.
    pub final_max_time_ms: u64,
    /// Fracción de filas reservada para puntuar cada k.
    pub test_size: f64,
    pub tolerance: f64,
    pub normalize: bool,
    /// Semilla opcional (reproducibilidad en tests).
    pub seed: Option<u64>,
}

impl Default for KMeansSettings {
    fn default() -> Self {
        Self {
            ks: (2..15).collect(),
            max_iterations: 50,
            max_restarts: 25,
            final_max_iterations: 100,
            final_max_restarts: 50,
            max_time_ms: 3000,
            final_max_time_ms: 1000,
            test_size: 0.25,
            tolerance: 1e-4,
            normalize: true,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsneSettings {
    pub dimensions: usize,
    pub learning_rate: f64,
    pub max_iterations: usize,
    pub perplexity: f64,
    /// Presupuesto de tiempo en ms; 0 = sin límite.
    pub max_time_ms: u64,
    pub seed: Option<u64>,
}

impl Default for TsneSettings {
    fn default() -> Self {
        Self { dimensions: 2, learning_rate: 100.0, max_iterations: 1000, perplexity: 30.0, max_time_ms: 3000, seed: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionSettings {
    pub top_n_to_count: usize,
}

impl Default for DistributionSettings {
    fn default() -> Self { Self { top_n_to_count: 7 } }
}

/// Parámetros de la codificación a datos numéricos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingSettings {
    pub max_unique_values: usize,
    /// Umbral de correlación por encima del cual una columna se considera
    /// redundante (ajustable, no una ley).
    pub max_correlation_threshold: f64,
}

impl Default for EncodingSettings {
    fn default() -> Self { Self { max_unique_values: 7, max_correlation_threshold: 1.0 - 1e-5 } }
}
