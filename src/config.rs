//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una sola vez y expone `CONFIG`, inmutable.
use std::env;
use std::str::FromStr;

use once_cell::sync::Lazy;
use stat_persistence::{init_dotenv, DbConfig};

/// Dónde corren los jobs de cómputo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Hilo worker dedicado, recreado en cada reset de sesión.
    #[default]
    Worker,
    /// Pool blocking de tokio, sin hilo propio.
    Inline,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "worker" => Ok(BackendKind::Worker),
            "inline" => Ok(BackendKind::Inline),
            other => Err(format!("unknown backend '{other}' (expected worker|inline)")),
        }
    }
}

/// Configuración global de la aplicación.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DbConfig,
    pub backend: BackendKind,
    /// Nivel de log del binario (`STATFLOW_LOG`).
    pub log_level: log::LevelFilter,
}

impl AppConfig {
    pub fn from_env() -> Self {
        init_dotenv();
        let backend = match env::var("STATFLOW_BACKEND") {
            Ok(v) => v.parse().unwrap_or_else(|e: String| {
                log::warn!("{e}, using worker");
                BackendKind::Worker
            }),
            Err(_) => BackendKind::default(),
        };
        let log_level =
            env::var("STATFLOW_LOG").ok().and_then(|v| v.parse().ok()).unwrap_or(log::LevelFilter::Info);
        Self { database: DbConfig::from_env(), backend, log_level }
    }
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_parses_case_insensitively() {
        assert_eq!("Inline".parse::<BackendKind>(), Ok(BackendKind::Inline));
        assert_eq!(" worker ".parse::<BackendKind>(), Ok(BackendKind::Worker));
        assert!("gpu".parse::<BackendKind>().is_err());
    }
}
