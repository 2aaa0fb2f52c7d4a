use axum::http::{HeaderValue, Uri};
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

pub const SERVICE_NAME: &str = "comment-service";

#[derive(Debug, Clone)]
pub struct CommentConfig {
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub store: StoreConfig,
    /// Base used for `Location` headers, e.g. `https://api.example.com`.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MongoDb,
    Memory,
}

impl CommentConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Builds the service settings from a variable lookup.
    ///
    /// In `ENVIRONMENT=prod` every variable must be set explicitly.
    pub fn from_lookup<F>(mut common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("LOG_LEVEL") {
            common.log_level = level;
        }
        if let Some(endpoint) = lookup("OTLP_ENDPOINT").filter(|e| !e.is_empty()) {
            common.otlp_endpoint = Some(endpoint);
        }

        let is_prod = lookup("ENVIRONMENT").as_deref() == Some("prod");
        let get = |key: &str, default: Option<&str>| get_var(&lookup, key, default, is_prod);

        let backend: StoreBackend = get("STORE_BACKEND", Some("mongodb"))?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        // The URI is only mandatory when MongoDB actually backs the store.
        let uri = match backend {
            StoreBackend::MongoDb => get("MONGODB_URI", Some("mongodb://localhost:27017"))?,
            StoreBackend::Memory => lookup("MONGODB_URI").unwrap_or_default(),
        };

        Ok(CommentConfig {
            common,
            mongodb: MongoConfig {
                uri: Secret::new(uri),
                database: get("MONGODB_DATABASE", Some("comment_db"))?,
            },
            store: StoreConfig { backend },
            public_url: lookup("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty())
                .map(validate_public_url)
                .transpose()?,
        })
    }
}

/// `PUBLIC_URL` prefixes every `Location` header, so it must be an absolute
/// http(s) URL that is also a valid header value.
fn validate_public_url(url: String) -> Result<String, AppError> {
    let invalid = |reason: &str| {
        AppError::ConfigError(anyhow::anyhow!("Invalid PUBLIC_URL {:?}: {}", url, reason))
    };

    let uri: Uri = url.parse().map_err(|_| invalid("not a URL"))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        _ => return Err(invalid("scheme must be http or https")),
    }
    if uri.authority().is_none() {
        return Err(invalid("missing host"));
    }
    if uri.query().is_some() || url.contains('#') {
        return Err(invalid("query and fragment are not allowed"));
    }
    HeaderValue::from_str(&url).map_err(|_| invalid("not a valid header value"))?;

    Ok(url)
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::MongoDb => "mongodb",
            StoreBackend::Memory => "memory",
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StoreBackend::MongoDb),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

fn get_var<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<CommentConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CommentConfig::from_lookup(core_config::Config::default(), |key| vars.get(key).cloned())
    }

    #[test]
    fn dev_defaults_point_at_local_mongodb() {
        let config = load(&[]).unwrap();
        assert_eq!(config.store.backend, StoreBackend::MongoDb);
        assert_eq!(config.mongodb.uri.expose_secret(), "mongodb://localhost:27017");
        assert_eq!(config.mongodb.database, "comment_db");
        assert!(config.public_url.is_none());
    }

    #[test]
    fn memory_backend_needs_no_uri() {
        let config = load(&[
            ("ENVIRONMENT", "prod"),
            ("STORE_BACKEND", "memory"),
            ("MONGODB_DATABASE", "x"),
        ])
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn prod_requires_explicit_uri() {
        let err = load(&[("ENVIRONMENT", "prod"), ("STORE_BACKEND", "mongodb")]).unwrap_err();
        assert!(err.to_string().contains("MONGODB_URI"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(load(&[("STORE_BACKEND", "arangodb")]).is_err());
        assert_eq!("MEMORY".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
    }

    #[test]
    fn public_url_loses_trailing_slash() {
        let config = load(&[("PUBLIC_URL", "https://api.example.com/")]).unwrap();
        assert_eq!(config.public_url.as_deref(), Some("https://api.example.com"));
    }

    #[test]
    fn public_url_keeps_path_prefix() {
        let config = load(&[("PUBLIC_URL", "http://gateway:8080/api/")]).unwrap();
        assert_eq!(config.public_url.as_deref(), Some("http://gateway:8080/api"));
    }

    #[test]
    fn malformed_public_url_fails_at_load() {
        for url in [
            "api.example.com",
            "/comments",
            "ftp://api.example.com",
            "https://api.example.com/?x=1",
            "https://api.example.com/#top",
            "https://api example.com",
        ] {
            let err = load(&[("PUBLIC_URL", url)]).unwrap_err();
            assert!(err.to_string().contains("PUBLIC_URL"), "{}", url);
        }
    }

    #[test]
    fn logging_variables_override_common_section() {
        let config = load(&[("LOG_LEVEL", "debug"), ("OTLP_ENDPOINT", "http://tempo:4317")]).unwrap();
        assert_eq!(config.common.log_level, "debug");
        assert_eq!(config.common.otlp_endpoint.as_deref(), Some("http://tempo:4317"));
    }
}
