//! stat-core: modelo de datos del pipeline de artefactos estadísticos.
//!
//! Contiene los tipos que viajan entre capas (dataset, frames numéricos,
//! tipos inferidos, payloads de artefactos), el grafo estático de
//! dependencias entre `ArtifactKind`s y el cálculo de fingerprints.
//! No depende de persistencia ni de ejecución.
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod model;
pub mod settings;

pub use errors::DataError;
pub use model::{
    Artifact, ArtifactDecodeError, ArtifactKind, ArtifactRecord, ArtifactSpec, CellValue, DataType, Dataset,
    DistributionPoint, DistributionType, Fingerprint, KMeansResults, NumericFrame, PcaLoadings, TypeFrame,
    TypedCell, VariableDistribution,
};
pub use settings::Settings;
