//! Configuration module for frontend-infra
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - User configuration (~/.config/frontend-infra/config.toml)
//! - Project configuration (./frontend-infra.toml, ./.frontend-infra.toml)
//! - Environment variables
//! - Command-line arguments (applied by the binary)

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::resources::cloudfront::PriceClass;
use crate::stack::Environment;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Naming and synthesis settings
    pub app: AppConfig,

    /// Account and region every stack deploys to
    pub target: TargetConfig,

    /// Distribution settings
    pub delivery: DeliveryConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Naming and synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// First part of every resource prefix (`{prefix_base}-{env}`)
    pub prefix_base: String,

    /// Environment used when no `env` context value is given
    pub default_environment: String,

    /// Where `synth` writes the cloud assembly
    pub output_dir: PathBuf,

    /// Default context values
    pub context: IndexMap<String, String>,

    /// Colored terminal output
    pub color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            prefix_base: "testpy".to_string(),
            default_environment: "dev".to_string(),
            output_dir: PathBuf::from("cdk.out"),
            context: IndexMap::new(),
            color: true,
        }
    }
}

/// Deployment target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub account: String,
    pub region: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            account: "180294218712".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

/// Distribution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Route the origin through the access identity and block public access
    pub private_origin: bool,

    pub price_class: PriceClass,

    /// ACM certificate for custom domain names
    pub certificate_arn: Option<String>,

    pub domain_names: Vec<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            private_origin: false,
            price_class: PriceClass::PriceClass100,
            certificate_arn: None,
            domain_names: Vec::new(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when neither `RUST_LOG` nor `-v` is given
    pub log_level: String,

    /// Emit logs as JSON lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json: false,
        }
    }
}

/// The values one configuration file sets. Anything left out keeps the
/// value of the earlier layers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    app: AppLayer,
    target: TargetLayer,
    delivery: DeliveryLayer,
    logging: LoggingLayer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AppLayer {
    prefix_base: Option<String>,
    default_environment: Option<String>,
    output_dir: Option<PathBuf>,
    context: Option<IndexMap<String, String>>,
    color: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TargetLayer {
    account: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct DeliveryLayer {
    private_origin: Option<bool>,
    price_class: Option<PriceClass>,
    certificate_arn: Option<String>,
    domain_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LoggingLayer {
    log_level: Option<String>,
    json: Option<bool>,
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            } else if config_path == Some(&path) {
                anyhow::bail!("Config file not found: {}", path.display());
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        // Explicit path takes priority
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        let mut paths = Vec::new();

        // User config
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("frontend-infra/config.toml"));
        }

        // Project config (current directory)
        paths.push(PathBuf::from("frontend-infra.toml"));
        paths.push(PathBuf::from(".frontend-infra.toml"));

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        // Determine format based on extension
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let layer: ConfigLayer = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(self.merge(layer))
    }

    /// Merge a file layer into this config; every value the layer sets wins,
    /// including values equal to the defaults.
    fn merge(&self, layer: ConfigLayer) -> Config {
        let mut merged = self.clone();

        let app = layer.app;
        if let Some(prefix_base) = app.prefix_base {
            merged.app.prefix_base = prefix_base;
        }
        if let Some(default_environment) = app.default_environment {
            merged.app.default_environment = default_environment;
        }
        if let Some(output_dir) = app.output_dir {
            merged.app.output_dir = output_dir;
        }
        if let Some(context) = app.context {
            merged.app.context.extend(context);
        }
        if let Some(color) = app.color {
            merged.app.color = color;
        }

        if let Some(account) = layer.target.account {
            merged.target.account = account;
        }
        if let Some(region) = layer.target.region {
            merged.target.region = region;
        }

        let delivery = layer.delivery;
        if let Some(private_origin) = delivery.private_origin {
            merged.delivery.private_origin = private_origin;
        }
        if let Some(price_class) = delivery.price_class {
            merged.delivery.price_class = price_class;
        }
        if let Some(certificate_arn) = delivery.certificate_arn {
            merged.delivery.certificate_arn = Some(certificate_arn);
        }
        if let Some(domain_names) = delivery.domain_names {
            merged.delivery.domain_names = domain_names;
        }

        if let Some(log_level) = layer.logging.log_level {
            merged.logging.log_level = log_level;
        }
        if let Some(json) = layer.logging.json {
            merged.logging.json = json;
        }

        merged
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // FRONTEND_INFRA_ENV
        if let Ok(env) = std::env::var("FRONTEND_INFRA_ENV") {
            self.app
                .context
                .insert(crate::app::ENV_CONTEXT_KEY.to_string(), env);
        }

        // FRONTEND_INFRA_ACCOUNT
        if let Ok(account) = std::env::var("FRONTEND_INFRA_ACCOUNT") {
            self.target.account = account;
        }

        // FRONTEND_INFRA_REGION
        if let Ok(region) = std::env::var("FRONTEND_INFRA_REGION") {
            self.target.region = region;
        }

        // FRONTEND_INFRA_OUTPUT_DIR
        if let Ok(dir) = std::env::var("FRONTEND_INFRA_OUTPUT_DIR") {
            self.app.output_dir = PathBuf::from(dir);
        }

        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() {
            self.app.color = false;
        }
    }

    /// Reject values no stack could be built from.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.app.prefix_base.is_empty() {
            return Err(Error::invalid_config("app.prefix_base", "must not be empty"));
        }
        if self.app.default_environment.is_empty() {
            return Err(Error::invalid_config(
                "app.default_environment",
                "must not be empty",
            ));
        }
        if self.target.account.len() != 12 || !self.target.account.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_config(
                "target.account",
                format!("'{}' is not a 12-digit account id", self.target.account),
            ));
        }
        if self.target.region.is_empty() {
            return Err(Error::invalid_config("target.region", "must not be empty"));
        }
        if !self.delivery.domain_names.is_empty() && self.delivery.certificate_arn.is_none() {
            return Err(Error::invalid_config(
                "delivery.domain_names",
                "require delivery.certificate_arn",
            ));
        }
        Ok(())
    }

    /// Resource prefix for an environment name, e.g. `testpy-dev`.
    pub fn prefix(&self, environment: &str) -> String {
        format!("{}-{}", self.app.prefix_base, environment)
    }

    /// Account and region the stacks deploy to.
    pub fn target_environment(&self) -> Environment {
        Environment::new(&self.target.account, &self.target.region)
    }

    /// Load from a specific file, without environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }
}
