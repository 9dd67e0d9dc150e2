//! Tipos de artefacto, grafo estático de dependencias y registro persistido.
//!
//! El grafo es fijo y pequeño:
//!
//! ```text
//! DataTypes ──────────────────────────────► VariableDistributions
//! NumbersOnly ──► RegularCorrelations | PartialCorrelations | PValues
//!             └─► PcaLoadings | KMeansResults
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fingerprint::Fingerprint;
use super::frame::{NumericFrame, TypeFrame};
use super::payload::{KMeansResults, PcaLoadings, VariableDistribution};
use super::typed_artifact::{ArtifactDecodeError, ArtifactSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    DataTypes,
    NumbersOnly,
    RegularCorrelations,
    PartialCorrelations,
    PValues,
    PcaLoadings,
    KMeansResults,
    VariableDistributions,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 8] = [
        ArtifactKind::DataTypes,
        ArtifactKind::NumbersOnly,
        ArtifactKind::RegularCorrelations,
        ArtifactKind::PartialCorrelations,
        ArtifactKind::PValues,
        ArtifactKind::PcaLoadings,
        ArtifactKind::KMeansResults,
        ArtifactKind::VariableDistributions,
    ];

    /// Prerrequisitos directos (en orden de resolución).
    pub fn prerequisites(self) -> &'static [ArtifactKind] {
        match self {
            ArtifactKind::DataTypes | ArtifactKind::NumbersOnly => &[],
            ArtifactKind::RegularCorrelations
            | ArtifactKind::PartialCorrelations
            | ArtifactKind::PValues
            | ArtifactKind::PcaLoadings
            | ArtifactKind::KMeansResults => &[ArtifactKind::NumbersOnly],
            ArtifactKind::VariableDistributions => &[ArtifactKind::DataTypes],
        }
    }

    /// Fracción del rango de progreso asignada a la etapa final; el resto se
    /// reparte en partes iguales entre los prerrequisitos. Constantes medidas:
    /// la etapa K-means + embedding domina (~90%).
    pub fn final_stage_weight(self) -> f64 {
        match self {
            ArtifactKind::KMeansResults => 0.9,
            ArtifactKind::RegularCorrelations | ArtifactKind::PartialCorrelations | ArtifactKind::PValues => 2.0 / 3.0,
            _ if self.prerequisites().is_empty() => 1.0,
            _ => 0.5,
        }
    }

    /// Clave lógica en el store persistente.
    pub fn store_key(self) -> &'static str {
        match self {
            ArtifactKind::DataTypes => "/data/core-data-types",
            ArtifactKind::NumbersOnly => "/data/numbers-only-core-data",
            ArtifactKind::RegularCorrelations => "/data/regular-correlations",
            ArtifactKind::PartialCorrelations => "/data/partial-correlations",
            ArtifactKind::PValues => "/data/p-values",
            ArtifactKind::PcaLoadings => "/data/pca-loadings",
            ArtifactKind::KMeansResults => "/data/k-means-results",
            ArtifactKind::VariableDistributions => "/data/variable-distributions",
        }
    }

    /// Nombre de job en el protocolo del backend.
    pub fn job_name(self) -> &'static str {
        match self {
            ArtifactKind::DataTypes => "get-data-types",
            ArtifactKind::NumbersOnly => "get-numbers-only-data",
            ArtifactKind::RegularCorrelations => "get-regular-correlations",
            ArtifactKind::PartialCorrelations => "get-partial-correlations",
            ArtifactKind::PValues => "get-p-values",
            ArtifactKind::PcaLoadings => "get-pca-loadings",
            ArtifactKind::KMeansResults => "get-k-means-results",
            ArtifactKind::VariableDistributions => "get-variable-distributions",
        }
    }

    pub fn from_job_name(name: &str) -> Option<Self> { Self::ALL.into_iter().find(|k| k.job_name() == name) }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::DataTypes => "data_types",
            ArtifactKind::NumbersOnly => "numbers_only",
            ArtifactKind::RegularCorrelations => "regular_correlations",
            ArtifactKind::PartialCorrelations => "partial_correlations",
            ArtifactKind::PValues => "p_values",
            ArtifactKind::PcaLoadings => "pca_loadings",
            ArtifactKind::KMeansResults => "k_means_results",
            ArtifactKind::VariableDistributions => "variable_distributions",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let norm = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|k| k.as_str() == norm)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Registro persistido de un artefacto calculado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub kind: ArtifactKind,
    pub fingerprint: Fingerprint,
    pub payload: Value,
    pub stored_at: DateTime<Utc>,
}

/// Artefacto tipado (payload ya decodificado).
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    DataTypes(TypeFrame),
    NumbersOnly(NumericFrame),
    RegularCorrelations(NumericFrame),
    PartialCorrelations(NumericFrame),
    PValues(NumericFrame),
    PcaLoadings(PcaLoadings),
    KMeansResults(KMeansResults),
    VariableDistributions(Vec<VariableDistribution>),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::DataTypes(_) => ArtifactKind::DataTypes,
            Artifact::NumbersOnly(_) => ArtifactKind::NumbersOnly,
            Artifact::RegularCorrelations(_) => ArtifactKind::RegularCorrelations,
            Artifact::PartialCorrelations(_) => ArtifactKind::PartialCorrelations,
            Artifact::PValues(_) => ArtifactKind::PValues,
            Artifact::PcaLoadings(_) => ArtifactKind::PcaLoadings,
            Artifact::KMeansResults(_) => ArtifactKind::KMeansResults,
            Artifact::VariableDistributions(_) => ArtifactKind::VariableDistributions,
        }
    }

    /// Payload sobre (con versión de esquema) listo para persistir.
    pub fn to_payload(&self) -> Result<Value, ArtifactDecodeError> {
        let kind = self.kind();
        match self {
            Artifact::DataTypes(t) => t.encode(kind),
            Artifact::NumbersOnly(f)
            | Artifact::RegularCorrelations(f)
            | Artifact::PartialCorrelations(f)
            | Artifact::PValues(f) => f.encode(kind),
            Artifact::PcaLoadings(p) => p.encode(kind),
            Artifact::KMeansResults(k) => k.encode(kind),
            Artifact::VariableDistributions(v) => v.encode(kind),
        }
    }

    pub fn from_payload(kind: ArtifactKind, payload: &Value) -> Result<Self, ArtifactDecodeError> {
        Ok(match kind {
            ArtifactKind::DataTypes => Artifact::DataTypes(TypeFrame::decode(kind, payload)?),
            ArtifactKind::NumbersOnly => Artifact::NumbersOnly(NumericFrame::decode(kind, payload)?),
            ArtifactKind::RegularCorrelations => Artifact::RegularCorrelations(NumericFrame::decode(kind, payload)?),
            ArtifactKind::PartialCorrelations => Artifact::PartialCorrelations(NumericFrame::decode(kind, payload)?),
            ArtifactKind::PValues => Artifact::PValues(NumericFrame::decode(kind, payload)?),
            ArtifactKind::PcaLoadings => Artifact::PcaLoadings(PcaLoadings::decode(kind, payload)?),
            ArtifactKind::KMeansResults => Artifact::KMeansResults(KMeansResults::decode(kind, payload)?),
            ArtifactKind::VariableDistributions => {
                Artifact::VariableDistributions(Vec::<VariableDistribution>::decode(kind, payload)?)
            }
        })
    }

    pub fn as_numeric_frame(&self) -> Option<&NumericFrame> {
        match self {
            Artifact::NumbersOnly(f)
            | Artifact::RegularCorrelations(f)
            | Artifact::PartialCorrelations(f)
            | Artifact::PValues(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_type_frame(&self) -> Option<&TypeFrame> {
        match self {
            Artifact::DataTypes(t) => Some(t),
            _ => None,
        }
    }
}
