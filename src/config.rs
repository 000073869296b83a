//! Configuration schema for infradiag.
//!
//! The configuration is optional. Every key has a default matching a stock
//! Terragrunt/Terraform layout rendered with blast-radius.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::InfraError;
use crate::score::thresholds;

/// Config file names searched for in the project root.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["infradiag.yaml", ".infradiag.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Output directory for diagrams, sidecars and the report (relative to the project root).
    pub diagrams_dir: PathBuf,
    /// Directory under the project root holding `{region}/{environment}` trees.
    pub providers_dir: String,
    /// Per-module configuration file that anchors metadata extraction.
    pub sentinel_file: String,
    /// File extensions that make a directory count as an environment.
    pub infra_extensions: Vec<String>,
    pub toolchain: ToolchainConfig,
    pub renderer: RendererConfig,
    pub env_vars: EnvVarNames,
    pub report: ReportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            diagrams_dir: PathBuf::from("diagrams"),
            providers_dir: "aws".to_string(),
            sentinel_file: "terragrunt.hcl".to_string(),
            infra_extensions: vec!["hcl".to_string(), "tf".to_string()],
            toolchain: ToolchainConfig::default(),
            renderer: RendererConfig::default(),
            env_vars: EnvVarNames::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load the explicit config, or the first default-named file in `root`,
    /// or fall back to defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::parse_file(path);
        }
        match discover(root) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using config file");
                Self::parse_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Whether a file extension marks infrastructure configuration.
    pub fn is_infra_extension(&self, ext: &str) -> bool {
        self.infra_extensions.iter().any(|e| e == ext)
    }
}

/// Find a default-named config file in `root`.
pub fn discover(root: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

/// One toolchain flavor: a program plus its init and plan argument lists.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ToolchainCommand {
    pub program: String,
    #[serde(default)]
    pub init: Vec<String>,
    #[serde(default)]
    pub plan: Vec<String>,
}

/// Toolchain settings for both flavors.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Used when the environment root holds the sentinel file.
    pub orchestrated: ToolchainCommand,
    /// Used otherwise.
    pub plain: ToolchainCommand,
    /// Plan file written by the plan step and removed after rendering.
    pub plan_artifact: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            orchestrated: ToolchainCommand {
                program: "terragrunt".to_string(),
                init: strings(&["init", "--terragrunt-non-interactive"]),
                plan: strings(&["plan", "-out=tfplan", "--terragrunt-non-interactive"]),
            },
            plain: ToolchainCommand {
                program: "terraform".to_string(),
                init: strings(&["init", "-backend=false"]),
                plan: strings(&["plan", "-out=tfplan"]),
            },
            plan_artifact: "tfplan".to_string(),
        }
    }
}

/// The external diagram renderer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RendererConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Extension of the image written by the renderer.
    pub extension: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "blast-radius".to_string(),
            args: strings(&["--svg"]),
            extension: "svg".to_string(),
        }
    }
}

/// Names of the environment variables exported to subprocesses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvVarNames {
    pub region: String,
    pub environment: String,
}

impl Default for EnvVarNames {
    fn default() -> Self {
        Self {
            region: "AWS_REGION".to_string(),
            environment: "ENVIRONMENT".to_string(),
        }
    }
}

/// Summary report settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Project name stamped into the report.
    pub project: String,
    pub file_name: String,
    /// Fewer distinct shared-module sources than this triggers a recommendation.
    pub min_shared_modules: usize,
    /// Environments scoring above this are flagged for review.
    pub complexity_threshold: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            project: "Infrastructure".to_string(),
            file_name: "infrastructure-report.json".to_string(),
            min_shared_modules: thresholds::MIN_SHARED_MODULES,
            complexity_threshold: thresholds::COMPLEXITY,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Validate a configuration.
pub fn validate(config: &Config) -> Result<(), InfraError> {
    if config.providers_dir.trim().is_empty() {
        return Err(InfraError::Config("providers_dir must not be empty".into()));
    }
    if config.sentinel_file.trim().is_empty() {
        return Err(InfraError::Config("sentinel_file must not be empty".into()));
    }
    if config.infra_extensions.is_empty() {
        return Err(InfraError::Config(
            "infra_extensions must list at least one extension".into(),
        ));
    }
    for (label, program) in [
        ("toolchain.orchestrated.program", &config.toolchain.orchestrated.program),
        ("toolchain.plain.program", &config.toolchain.plain.program),
        ("renderer.program", &config.renderer.program),
    ] {
        if program.trim().is_empty() {
            return Err(InfraError::Config(format!("{} must not be empty", label)));
        }
    }
    if config.report.file_name.trim().is_empty() {
        return Err(InfraError::Config("report.file_name must not be empty".into()));
    }
    if config.env_vars.region.is_empty() || config.env_vars.environment.is_empty() {
        return Err(InfraError::Config("env_vars names must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sentinel_file, "terragrunt.hcl");
        assert!(config.is_infra_extension("tf"));
        assert!(config.is_infra_extension("hcl"));
        assert!(!config.is_infra_extension("yaml"));
        assert_eq!(config.toolchain.orchestrated.program, "terragrunt");
        assert_eq!(config.renderer.program, "blast-radius");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
diagrams_dir: out
renderer:
  program: my-renderer
report:
  complexity_threshold: 20
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.diagrams_dir, PathBuf::from("out"));
        assert_eq!(config.renderer.program, "my-renderer");
        assert_eq!(config.renderer.extension, "svg");
        assert_eq!(config.report.complexity_threshold, 20);
        assert_eq!(config.report.min_shared_modules, 3);
        assert_eq!(config.providers_dir, "aws");
    }

    #[test]
    fn test_validate_rejects_empty_program() {
        let mut config = Config::default();
        config.renderer.program = " ".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("renderer.program"));
    }

    #[test]
    fn test_load_discovers_default_name() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".infradiag.yaml"), "providers_dir: gcp\n").unwrap();

        let config = Config::load(temp.path(), None).unwrap();
        assert_eq!(config.providers_dir, "gcp");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(temp.path(), None).unwrap();
        assert_eq!(config.providers_dir, "aws");
    }
}
