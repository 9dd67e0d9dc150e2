pub mod artifact;
pub mod cell;
pub mod dataset;
pub mod fingerprint;
pub mod frame;
pub mod payload;
pub mod typed_artifact;

pub use artifact::{Artifact, ArtifactKind, ArtifactRecord};
pub use cell::{dominant_type, infer_cell, parse_date, CellValue, DataType, TypedCell};
pub use dataset::{default_index, Dataset};
pub use fingerprint::Fingerprint;
pub use frame::{nan_safe, NumericFrame, TypeFrame};
pub use payload::{DistributionPoint, DistributionType, KMeansResults, PcaLoadings, VariableDistribution};
pub use typed_artifact::{ArtifactDecodeError, ArtifactSpec};
