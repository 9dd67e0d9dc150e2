//! Payloads de los artefactos compuestos y sus especificaciones.

use serde::{Deserialize, Serialize};

use super::cell::{CellValue, DataType};
use super::frame::{nan_safe, NumericFrame, TypeFrame};
use super::typed_artifact::ArtifactSpec;
use super::ArtifactKind;

/// Cargas factoriales de PCA.
///
/// `loadings`: filas = variables, columnas = `Factor 1..k` (sólo los
/// componentes seleccionados). `eigenvalues`: todos los autovalores
/// positivos, en orden descendente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaLoadings {
    pub loadings: NumericFrame,
    #[serde(serialize_with = "nan_safe::serialize_vec", deserialize_with = "nan_safe::deserialize_vec")]
    pub eigenvalues: Vec<f64>,
}

/// Resultado de K-means + proyección 2-D.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansResults {
    /// Etiqueta de cluster por fila retenida (mismo orden que `data_projected`).
    pub labels: Vec<usize>,
    /// Centroides en el espacio normalizado del modelo (`Cluster0..`).
    pub centroids_learned: NumericFrame,
    /// Centroides devueltos al espacio original de las variables.
    pub centroids_transformed: NumericFrame,
    /// Proyección 2-D (`x`, `y`) de los centroides.
    pub centroids_projected: NumericFrame,
    /// Proyección 2-D (`x`, `y`) de las filas de datos.
    pub data_projected: NumericFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionType {
    Discrete,
    Continuous,
}

/// Punto `(valor, peso)`: conteo en discretas, densidad normalizada en continuas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionPoint(pub CellValue, pub f64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDistribution {
    pub name: String,
    pub points: Vec<DistributionPoint>,
    pub data_type: DataType,
    pub distribution_type: DistributionType,
    pub is_demographic: bool,
}

impl ArtifactSpec for TypeFrame {
    const KINDS: &'static [ArtifactKind] = &[ArtifactKind::DataTypes];
}

impl ArtifactSpec for NumericFrame {
    const KINDS: &'static [ArtifactKind] = &[
        ArtifactKind::NumbersOnly,
        ArtifactKind::RegularCorrelations,
        ArtifactKind::PartialCorrelations,
        ArtifactKind::PValues,
    ];

    fn validate(&self, kind: ArtifactKind) -> Result<(), String> {
        if kind != ArtifactKind::NumbersOnly && !self.is_square_labeled() {
            return Err(format!("{kind} must be a square matrix labelled by variable"));
        }
        Ok(())
    }
}

impl ArtifactSpec for PcaLoadings {
    const KINDS: &'static [ArtifactKind] = &[ArtifactKind::PcaLoadings];

    fn validate(&self, _kind: ArtifactKind) -> Result<(), String> {
        if self.loadings.shape().1 > self.eigenvalues.len() {
            return Err("more factors than eigenvalues".into());
        }
        Ok(())
    }
}

impl ArtifactSpec for KMeansResults {
    const KINDS: &'static [ArtifactKind] = &[ArtifactKind::KMeansResults];

    fn validate(&self, _kind: ArtifactKind) -> Result<(), String> {
        if self.labels.len() != self.data_projected.shape().0 {
            return Err("labels and projected rows differ".into());
        }
        if self.centroids_learned.shape().0 != self.centroids_projected.shape().0 {
            return Err("centroid count differs between frames".into());
        }
        Ok(())
    }
}

impl ArtifactSpec for Vec<VariableDistribution> {
    const KINDS: &'static [ArtifactKind] = &[ArtifactKind::VariableDistributions];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Artifact, ArtifactDecodeError};
    use serde_json::json;

    #[test]
    fn correlation_payload_must_be_square() {
        let f = NumericFrame::new(vec!["a".into()], vec!["r".into()], vec![vec![1.0]]).unwrap();
        let err = Artifact::RegularCorrelations(f.clone()).to_payload().unwrap_err();
        assert!(matches!(err, ArtifactDecodeError::Validation(_)));
        assert!(Artifact::NumbersOnly(f).to_payload().is_ok());
    }

    #[test]
    fn payload_round_trip_checks_version() {
        let d = vec![VariableDistribution {
            name: "x".into(),
            points: vec![DistributionPoint(CellValue::Bool(true), 3.0), DistributionPoint("Other".into(), 1.0)],
            data_type: DataType::Boolean,
            distribution_type: DistributionType::Discrete,
            is_demographic: false,
        }];
        let art = Artifact::VariableDistributions(d);
        let payload = art.to_payload().unwrap();
        assert_eq!(payload["schema_version"], json!(1));
        assert_eq!(Artifact::from_payload(ArtifactKind::VariableDistributions, &payload).unwrap(), art);

        let stale = json!({"schema_version": 0, "data": []});
        assert!(matches!(
            Artifact::from_payload(ArtifactKind::VariableDistributions, &stale),
            Err(ArtifactDecodeError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let payload = json!({"schema_version": 1, "data": []});
        assert!(matches!(PcaLoadings::decode(ArtifactKind::PValues, &payload), Err(ArtifactDecodeError::KindMismatch { .. })));
    }
}
