//! Utilidades numéricas compartidas por los kernels.
pub mod linalg;
pub mod special;
pub mod stats;
