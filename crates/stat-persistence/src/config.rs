//! Configuración de conexión desde variables de entorno (`.env` opcional).

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

/// Ruta por defecto del archivo SQLite.
pub const DEFAULT_DATABASE_URL: &str = "statflow.db";

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self { Self { url: DEFAULT_DATABASE_URL.to_string(), min_connections: 1, max_connections: 4 } }
}

impl DbConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let defaults = Self::default();
        let url = env::var("STATFLOW_DATABASE_URL").unwrap_or(defaults.url);
        let min_connections =
            env::var("STATFLOW_DB_MIN_CONNECTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.min_connections);
        let max_connections =
            env::var("STATFLOW_DB_MAX_CONNECTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.max_connections);
        Self { url, min_connections, max_connections }
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas.
pub fn init_dotenv() { Lazy::force(&DOTENV_LOADED); }
