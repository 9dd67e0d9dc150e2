//! stat-kernels: cálculos puros de cada artefacto.
//!
//! Cada kernel recibe su entrada ya resuelta (dataset o frame numérico) y un
//! `KernelContext` para progreso y cancelación. No conocen la caché ni el
//! orquestador.
pub mod clip;
pub mod clustering;
pub mod context;
pub mod correlation;
pub mod distributions;
pub mod encoding;
pub mod error;
pub mod math;
pub mod normalize;
pub mod pca;
pub mod pvalue;
pub mod types;

pub use clustering::k_means_results;
pub use context::{KernelContext, SubRange};
pub use correlation::{correlation_frame, partial_correlation_frame};
pub use distributions::variable_distributions;
pub use encoding::to_numbers_only;
pub use error::KernelError;
pub use pca::pca_loadings;
pub use pvalue::p_value_frame;
pub use types::data_types;
