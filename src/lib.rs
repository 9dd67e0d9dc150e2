//! statflow: caché incremental de artefactos estadísticos.
//!
//! Fachada sobre las capas del workspace más la configuración y el armado
//! que usa el binario.
pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use stat_core as core;
pub use stat_engine as engine;
pub use stat_kernels as kernels;
pub use stat_persistence as persistence;

pub use app::{backend_for, build_orchestrator, load_dataset, open_cache, parse_dataset};
pub use config::{AppConfig, BackendKind, CONFIG};
pub use error::AppError;
