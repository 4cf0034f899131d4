//! Configuration management using Figment
//!
//! Sources, highest precedence first:
//! 1. Environment variables prefixed `RESTVIEWS_`, nested with `__`
//!    (`RESTVIEWS_FEATURES__ENABLE_ERROR_HANDLERS=false`)
//! 2. Legacy flat variables: `ERROR_HANDLERS_ENABLE`, `PROMETHEUS_MIDDLEWARE_ENABLE`,
//!    `MAX_PAGE_SIZE`
//! 3. `./config.toml`
//! 4. `~/.config/restviews/{service_name}/config.toml`
//! 5. `/etc/restviews/{service_name}/config.toml`
//! 6. Defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::middleware::RequestTrackingConfig;

const APP_DIR: &str = "restviews";
const ENV_PREFIX: &str = "RESTVIEWS_";

const LEGACY_ENV: [(&str, &str); 3] = [
    ("ERROR_HANDLERS_ENABLE", "features.enable_error_handlers"),
    ("PROMETHEUS_MIDDLEWARE_ENABLE", "features.enable_metrics_middleware"),
    ("MAX_PAGE_SIZE", "pagination.max_page_size"),
];

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub features: FeaturesConfig,

    #[serde(default)]
    pub healthcheck: HealthcheckConfig,

    #[serde(default)]
    pub middleware: MiddlewareConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// `EnvFilter` directive (trace, debug, info, warn, error, or per-target)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// dev, staging, production
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Application metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub title: String,
    pub version: String,
    /// Unhandled errors carry their message in `detail`
    pub debug: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            version: "0.1.0".to_string(),
            debug: false,
        }
    }
}

/// Feature switches for `configure_app`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Problem-details fallbacks for unmatched routes and panics
    pub enable_error_handlers: bool,
    pub enable_metrics_middleware: bool,
    /// `false` prefixes every operation id with its route path
    pub simplify_operation_ids: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            enable_error_handlers: true,
            enable_metrics_middleware: true,
            simplify_operation_ids: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthcheckConfig {
    pub enabled: bool,
    pub path: String,
    pub timeout_secs: u64,
}

impl Default for HealthcheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/healthz".to_string(),
            timeout_secs: 10,
        }
    }
}

impl HealthcheckConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Middleware configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Maximum request body size in MB
    pub body_limit_mb: usize,

    /// Render panics as 500 problem bodies
    pub catch_panic: bool,

    pub compression: bool,

    /// Responses smaller than this many bytes are sent uncompressed
    pub compression_min_size: u16,

    /// permissive, restrictive, disabled
    pub cors_mode: String,

    pub request_tracking: RequestTrackingConfig,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: 10,
            catch_panic: true,
            compression: true,
            compression_min_size: 500,
            cors_mode: "permissive".to_string(),
            request_tracking: RequestTrackingConfig::default(),
        }
    }
}

impl MiddlewareConfig {
    #[must_use]
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Upper bound for a requested page size
    pub max_page_size: u32,
    /// Page size when the client asks for none
    pub default_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_page_size: 500,
            default_page_size: 50,
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

impl Config {
    /// Load configuration for the running binary
    ///
    /// The service name used in the search paths is the executable's file stem.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| APP_DIR.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration searching the paths of `service_name`
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::named(service_name)));

        for path in Self::find_config_paths(service_name).iter().rev() {
            if path.exists() {
                tracing::info!(path = %path.display(), "loading configuration");
                figment = figment.merge(Toml::file(path));
            }
        }

        Ok(with_env(figment).extract()?)
    }

    /// Load configuration from one file, skipping the search
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()));

        Ok(with_env(figment).extract()?)
    }

    /// Search paths, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let relative = Path::new(service_name).join("config.toml");
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(path) = xdg::BaseDirectories::with_prefix(APP_DIR).find_config_file(&relative) {
            paths.push(path);
        }

        paths.push(Path::new("/etc").join(APP_DIR).join(relative));
        paths
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    fn named(service_name: &str) -> Self {
        let mut config = Self::default();
        config.service.name = service_name.to_string();
        config
    }
}

fn with_env(figment: Figment) -> Figment {
    let legacy = Env::raw()
        .only(&LEGACY_ENV.map(|(name, _)| name))
        .map(|key| {
            LEGACY_ENV
                .iter()
                .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
                .map_or_else(|| key.into(), |(_, path)| (*path).into())
        });

    figment
        .merge(legacy)
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: APP_DIR.to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            api: ApiConfig::default(),
            features: FeaturesConfig::default(),
            healthcheck: HealthcheckConfig::default(),
            middleware: MiddlewareConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.port, 8080);
        assert_eq!(config.service.log_level, "info");
        assert!(config.features.enable_error_handlers);
        assert!(config.features.simplify_operation_ids);
        assert_eq!(config.healthcheck.path, "/healthz");
        assert_eq!(config.pagination.max_page_size, 500);
        assert_eq!(config.middleware.body_limit_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_load_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "orders.toml",
                r#"
[service]
name = "orders"
port = 9000

[api]
debug = true

[healthcheck]
path = "/health"
"#,
            )?;

            let config = Config::load_from("orders.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.service.name, "orders");
            assert_eq!(config.service.port, 9000);
            assert_eq!(config.service.timeout_secs, 30);
            assert!(config.api.debug);
            assert_eq!(config.healthcheck.path, "/health");
            assert_eq!(config.healthcheck.timeout_secs, 10);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
            let config =
                Config::load_from(dir.path().join("absent.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        Jail::expect_with(|_jail| {
            let mut file = tempfile::NamedTempFile::new().map_err(|e| e.to_string())?;
            writeln!(file, "[service]\nport = \"not a port\"").map_err(|e| e.to_string())?;
            let err = Config::load_from(file.path()).unwrap_err();
            assert!(matches!(err, crate::error::Error::Config(_)));
            Ok(())
        });
    }

    #[test]
    fn test_environment_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("RESTVIEWS_SERVICE__PORT", "7000");
            jail.set_env("RESTVIEWS_FEATURES__SIMPLIFY_OPERATION_IDS", "false");
            jail.set_env("ERROR_HANDLERS_ENABLE", "false");
            jail.set_env("MAX_PAGE_SIZE", "25");

            let config = Config::load_from("missing.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.service.port, 7000);
            assert!(!config.features.simplify_operation_ids);
            assert!(!config.features.enable_error_handlers);
            assert_eq!(config.pagination.max_page_size, 25);
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_beats_legacy() {
        Jail::expect_with(|jail| {
            jail.set_env("PROMETHEUS_MIDDLEWARE_ENABLE", "false");
            jail.set_env("RESTVIEWS_FEATURES__ENABLE_METRICS_MIDDLEWARE", "true");

            let config = Config::load_from("missing.toml").map_err(|e| e.to_string())?;
            assert!(config.features.enable_metrics_middleware);
            Ok(())
        });
    }
}
