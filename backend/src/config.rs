//! Runtime configuration from the environment (`.env` supported).
//!
//! | Variable                   | Default                                   |
//! |----------------------------|-------------------------------------------|
//! | `CADASTRO_UPSTREAM_URL`    | `http://homolog.controleembarque.com.br`  |
//! | `CADASTRO_MUNICIPIOS_PATH` | embedded dataset                          |
//! | `CADASTRO_PORT`            | `3001`                                    |

use std::env;
use std::path::PathBuf;

use crate::error::{ConfigError, MunicipalityError};
use crate::transform::municipality::MunicipalityTable;

/// Homologation endpoint of the cadastro API.
pub const DEFAULT_UPSTREAM_URL: &str = "http://homolog.controleembarque.com.br";

/// Default HTTP API port.
pub const DEFAULT_PORT: u16 = 3001;

pub const UPSTREAM_URL_VAR: &str = "CADASTRO_UPSTREAM_URL";
pub const MUNICIPIOS_PATH_VAR: &str = "CADASTRO_MUNICIPIOS_PATH";
pub const PORT_VAR: &str = "CADASTRO_PORT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL documents are posted to.
    pub upstream_url: String,
    /// External municipality dataset, replacing the embedded one.
    pub municipios_path: Option<PathBuf>,
    /// HTTP API port.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            municipios_path: None,
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try loading .env file
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = non_blank(lookup(UPSTREAM_URL_VAR)) {
            config.upstream_url = url;
        }

        config.municipios_path = non_blank(lookup(MUNICIPIOS_PATH_VAR)).map(PathBuf::from);

        if let Some(port) = non_blank(lookup(PORT_VAR)) {
            config.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                name: PORT_VAR.to_string(),
                value: port.clone(),
            })?;
        }

        Ok(config)
    }

    /// Municipality table: the configured file, or the embedded dataset.
    pub fn municipality_table(&self) -> Result<MunicipalityTable, MunicipalityError> {
        match &self.municipios_path {
            Some(path) => MunicipalityTable::from_path(path),
            None => Ok(MunicipalityTable::embedded()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.upstream_url, "http://homolog.controleembarque.com.br");
        assert_eq!(config.port, 3001);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("CADASTRO_UPSTREAM_URL", "https://api.example.com/"),
            ("CADASTRO_MUNICIPIOS_PATH", "/tmp/m.json"),
            ("CADASTRO_PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(config.upstream_url, "https://api.example.com/");
        assert_eq!(config.municipios_path, Some(PathBuf::from("/tmp/m.json")));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = Config::from_lookup(lookup(&[("CADASTRO_UPSTREAM_URL", "  ")])).unwrap();
        assert_eq!(config.upstream_url, DEFAULT_UPSTREAM_URL);
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup(&[("CADASTRO_PORT", "abc")])).unwrap_err();
        assert!(err.to_string().contains("CADASTRO_PORT"));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_municipality_table_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"nome": "Cidade Teste", "codigo_ibge": 1234567}}]"#).unwrap();

        let config = Config {
            municipios_path: Some(file.path().to_path_buf()),
            ..Config::default()
        };
        let table = config.municipality_table().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("cidade teste"), Some(1234567));
    }

    #[test]
    fn test_missing_municipality_file() {
        let config = Config {
            municipios_path: Some(PathBuf::from("/nonexistent/municipios.json")),
            ..Config::default()
        };
        assert!(config.municipality_table().is_err());
    }
}
