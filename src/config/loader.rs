//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{GatewayConfig, RouteConfig, RouteFile};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `auth.signing_key`.
pub const SIGNING_KEY_ENV: &str = "GATEWAY_SIGNING_KEY";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to parse route file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Load and validate configuration from a TOML file.
///
/// When `routes_file` is set, the route table is read from that JSON file and
/// the field is rewritten to its resolved path.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: GatewayConfig = toml::from_str(&content).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    apply_signing_key_override(&mut config, std::env::var(SIGNING_KEY_ENV).ok());

    if let Some(routes_file) = config.routes_file.take() {
        if !config.routes.is_empty() {
            return Err(ConfigError::Validation(vec![ValidationError::AmbiguousRouteSource]));
        }
        let resolved = resolve_relative(path, &routes_file);
        config.routes = load_routes(&resolved)?;
        config.routes_file = Some(resolved);
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Read a JSON route file.
pub fn load_routes(path: &Path) -> Result<Vec<RouteConfig>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: RouteFile = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.into_routes())
}

/// Replace the configured signing key with a non-empty override.
pub fn apply_signing_key_override(config: &mut GatewayConfig, key: Option<String>) {
    if let Some(key) = key.filter(|k| !k.is_empty()) {
        config.auth.signing_key = key;
    }
}

fn resolve_relative(config_path: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        return target.to_path_buf();
    }
    match config_path.parent() {
        Some(dir) => dir.join(target),
        None => target.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_replaces_key_only_when_non_empty() {
        let mut config = GatewayConfig::default();
        config.auth.signing_key = "from-file".into();

        apply_signing_key_override(&mut config, Some(String::new()));
        assert_eq!(config.auth.signing_key, "from-file");

        apply_signing_key_override(&mut config, None);
        assert_eq!(config.auth.signing_key, "from-file");

        apply_signing_key_override(&mut config, Some("from-env".into()));
        assert_eq!(config.auth.signing_key, "from-env");
    }

    #[test]
    fn relative_route_file_resolves_next_to_config() {
        let resolved = resolve_relative(Path::new("/etc/gateway/gateway.toml"), Path::new("routes.json"));
        assert_eq!(resolved, PathBuf::from("/etc/gateway/routes.json"));

        let absolute = resolve_relative(Path::new("/etc/gateway/gateway.toml"), Path::new("/srv/routes.json"));
        assert_eq!(absolute, PathBuf::from("/srv/routes.json"));
    }
}
