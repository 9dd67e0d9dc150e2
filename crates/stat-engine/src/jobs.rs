//! Despacho de jobs por nombre hacia los kernels.
//!
//! Los jobs son funciones puras de su entrada: reciben un `JobInput`
//! serializado y devuelven el payload del artefacto (sobre versionado). El
//! mismo código corre en el backend inline y en el worker.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stat_core::{Artifact, ArtifactKind, Dataset, NumericFrame, Settings, TypeFrame};
use stat_kernels::{
    correlation_frame, data_types, k_means_results, p_value_frame, partial_correlation_frame, pca_loadings,
    to_numbers_only, variable_distributions, KernelContext,
};

use crate::protocol::{BackendError, JobFailure, JobRequest};

/// Entrada de un job: sólo se completan los campos que el job necesita.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<Dataset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numbers: Option<NumericFrame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<TypeFrame>,
    #[serde(default)]
    pub settings: Settings,
}

impl JobInput {
    /// Arma la entrada de `kind` a partir del dataset y los prerrequisitos ya
    /// resueltos.
    pub fn for_kind(kind: ArtifactKind, dataset: &Dataset, prerequisites: &[Artifact], settings: &Settings) -> Self {
        let mut input = JobInput { settings: settings.clone(), ..Default::default() };
        match kind {
            ArtifactKind::DataTypes | ArtifactKind::NumbersOnly => input.dataset = Some(dataset.clone()),
            ArtifactKind::VariableDistributions => {
                input.dataset = Some(dataset.clone());
                input.types = prerequisites.iter().find_map(|a| a.as_type_frame().cloned());
            }
            _ => {
                input.numbers = prerequisites.iter().find_map(|a| match a {
                    Artifact::NumbersOnly(f) => Some(f.clone()),
                    _ => None,
                });
            }
        }
        input
    }

    fn dataset(&self) -> Result<&Dataset, BackendError> {
        self.dataset.as_ref().ok_or_else(|| JobFailure::validation("job input is missing the dataset").into())
    }

    fn numbers(&self) -> Result<&NumericFrame, BackendError> {
        self.numbers.as_ref().ok_or_else(|| JobFailure::validation("job input is missing the numeric data").into())
    }

    fn types(&self) -> Result<&TypeFrame, BackendError> {
        self.types.as_ref().ok_or_else(|| JobFailure::validation("job input is missing the data types").into())
    }
}

pub fn build_request(kind: ArtifactKind, input: &JobInput) -> Result<JobRequest, BackendError> {
    let payload = serde_json::to_value(input).map_err(|e| JobFailure::internal(format!("encode job input: {e}")))?;
    Ok(JobRequest { job_name: kind.job_name().to_string(), payload })
}

pub fn compute(kind: ArtifactKind, input: &JobInput, ctx: &dyn KernelContext) -> Result<Artifact, BackendError> {
    let s = &input.settings;
    Ok(match kind {
        ArtifactKind::DataTypes => Artifact::DataTypes(data_types(input.dataset()?, ctx)?),
        ArtifactKind::NumbersOnly => Artifact::NumbersOnly(to_numbers_only(input.dataset()?, &s.numbers_only, ctx)?),
        ArtifactKind::RegularCorrelations => Artifact::RegularCorrelations(correlation_frame(input.numbers()?, ctx)?),
        ArtifactKind::PartialCorrelations => {
            Artifact::PartialCorrelations(partial_correlation_frame(input.numbers()?, ctx)?)
        }
        ArtifactKind::PValues => Artifact::PValues(p_value_frame(input.numbers()?, ctx)?),
        ArtifactKind::PcaLoadings => Artifact::PcaLoadings(pca_loadings(input.numbers()?, ctx)?),
        ArtifactKind::KMeansResults => {
            Artifact::KMeansResults(k_means_results(input.numbers()?, &s.k_means, &s.tsne, ctx)?)
        }
        ArtifactKind::VariableDistributions => Artifact::VariableDistributions(variable_distributions(
            input.dataset()?,
            input.types()?,
            &s.distributions,
            ctx,
        )?),
    })
}

/// Ejecuta un pedido completo: nombre → kernel → payload del artefacto.
pub fn run_job(request: &JobRequest, ctx: &dyn KernelContext) -> Result<Value, BackendError> {
    let kind = ArtifactKind::from_job_name(&request.job_name)
        .ok_or_else(|| JobFailure::validation(format!("unknown job '{}'", request.job_name)))?;
    let input: JobInput = serde_json::from_value(request.payload.clone())
        .map_err(|e| JobFailure::validation(format!("malformed payload for {}: {e}", request.job_name)))?;
    let artifact = compute(kind, &input, ctx)?;
    ctx.checkpoint()?;
    artifact.to_payload().map_err(|e| JobFailure::internal(format!("encode {kind}: {e}")).into())
}
