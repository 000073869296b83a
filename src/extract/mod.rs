//! Metadata extraction for a single environment.
//!
//! Every sentinel configuration file in the environment subtree is scraped
//! with the patterns in [`patterns`]. Unreadable files are skipped and
//! reported as warnings; the call itself never fails.

mod patterns;

pub use patterns::{extract_dependencies, extract_source, extract_text_facts, TextFacts};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::config::Config;
use crate::outcome::{Issue, IssueKind, Outcome};

/// A module source declared by one configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    pub source: String,
    /// Declaring file, relative to the environment directory.
    pub file: String,
}

/// Facts extracted from one environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentMetadata {
    pub environment: String,
    pub region: String,
    pub modules: Vec<ModuleRef>,
    /// Dependency paths in file-visitation order. Not deduplicated.
    pub dependencies: Vec<String>,
    /// Reserved for collaborators; always empty here.
    pub tags: IndexMap<String, serde_json::Value>,
    /// Reserved for collaborators; always empty here.
    pub costs: IndexMap<String, serde_json::Value>,
    pub last_analyzed: DateTime<Utc>,
}

impl EnvironmentMetadata {
    /// Empty metadata for the environment at `env_path`.
    ///
    /// The environment and region come from the last two path components.
    pub fn empty(env_path: &Path) -> Self {
        Self {
            environment: file_name(Some(env_path)),
            region: file_name(env_path.parent()),
            modules: Vec::new(),
            dependencies: Vec::new(),
            tags: IndexMap::new(),
            costs: IndexMap::new(),
            last_analyzed: Utc::now(),
        }
    }

    /// Copy of this metadata with a fresh timestamp.
    pub fn refreshed(&self) -> Self {
        Self {
            last_analyzed: Utc::now(),
            ..self.clone()
        }
    }
}

/// Extract metadata from the environment at `env_path`.
///
/// Files are visited depth-first in directory-listing order. Repeated calls
/// re-read the files; nothing is cached.
pub fn extract(env_path: &Path, config: &Config) -> Outcome<EnvironmentMetadata> {
    let mut metadata = EnvironmentMetadata::empty(env_path);
    let mut issues = Vec::new();

    for entry in WalkDir::new(env_path) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_else(|| env_path.to_string_lossy().to_string());
                tracing::warn!(%path, error = %e, "skipping unreadable entry");
                issues.push(
                    Issue::new(IssueKind::ExtractionWarning, format!("could not walk: {}", e))
                        .with_path(path),
                );
                continue;
            }
        };

        if !entry.file_type().is_file() || entry.file_name() != config.sentinel_file.as_str() {
            continue;
        }

        let path = entry.path();
        let rel_path = relative_path(path, env_path);

        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "could not parse configuration file");
                issues.push(
                    Issue::new(IssueKind::ExtractionWarning, format!("could not parse: {}", e))
                        .with_path(rel_path),
                );
                continue;
            }
        };

        let facts = extract_text_facts(&content);
        if let Some(source) = facts.source {
            metadata.modules.push(ModuleRef {
                source,
                file: rel_path,
            });
        }
        metadata.dependencies.extend(facts.dependencies);
    }

    tracing::debug!(
        environment = %metadata.environment,
        region = %metadata.region,
        modules = metadata.modules.len(),
        dependencies = metadata.dependencies.len(),
        "extracted metadata"
    );

    Outcome::from_parts(metadata, issues)
}

fn file_name(path: Option<&Path>) -> String {
    path.and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn relative_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_single_module_with_dependency() {
        let temp = TempDir::new().unwrap();
        let env = temp.path().join("aws/eu1/dev");
        write(
            &env.join("terragrunt.hcl"),
            b"terraform {\n  source = \"git::modA\"\n}\ndependencies = {\n  paths = [\"../shared\"]\n}\n",
        );

        let outcome = extract(&env, &Config::default());
        let Outcome::Ok(metadata) = outcome else {
            panic!("expected clean extraction");
        };
        assert_eq!(metadata.environment, "dev");
        assert_eq!(metadata.region, "eu1");
        assert_eq!(
            metadata.modules,
            vec![ModuleRef {
                source: "git::modA".to_string(),
                file: "terragrunt.hcl".to_string(),
            }]
        );
        assert_eq!(metadata.dependencies, vec!["../shared"]);
        assert!(metadata.tags.is_empty());
        assert!(metadata.costs.is_empty());
    }

    #[test]
    fn test_only_sentinel_files_are_scanned() {
        let temp = TempDir::new().unwrap();
        let env = temp.path().join("aws/eu1/dev");
        write(&env.join("main.tf"), b"module \"x\" { source = \"./x\" }\n");
        write(&env.join("vpc/terragrunt.hcl"), b"source = \"../modules/vpc\"\n");

        let metadata = extract(&env, &Config::default()).into_value().unwrap();
        assert_eq!(metadata.modules.len(), 1);
        assert_eq!(metadata.modules[0].source, "../modules/vpc");
        assert_eq!(metadata.modules[0].file, "vpc/terragrunt.hcl");
    }

    #[test]
    fn test_unreadable_file_is_a_warning() {
        let temp = TempDir::new().unwrap();
        let env = temp.path().join("aws/eu1/dev");
        write(&env.join("a/terragrunt.hcl"), &[0xff, 0xfe, 0x00, 0x9f]);
        write(&env.join("b/terragrunt.hcl"), b"source = \"git::modB\"\n");

        match extract(&env, &Config::default()) {
            Outcome::Warning(metadata, issues) => {
                assert_eq!(metadata.modules.len(), 1);
                assert_eq!(metadata.modules[0].source, "git::modB");
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].kind, IssueKind::ExtractionWarning);
                assert_eq!(issues[0].path.as_deref(), Some("a/terragrunt.hcl"));
            }
            other => panic!("expected warning outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_dependencies_are_not_deduplicated() {
        let temp = TempDir::new().unwrap();
        let env = temp.path().join("aws/eu1/dev");
        write(&env.join("a/terragrunt.hcl"), b"dependencies = { paths = [\"../vpc\"] }\n");
        write(&env.join("b/terragrunt.hcl"), b"dependencies = { paths = [\"../vpc\"] }\n");

        let metadata = extract(&env, &Config::default()).into_value().unwrap();
        assert_eq!(metadata.dependencies, vec!["../vpc", "../vpc"]);
        assert!(metadata.modules.is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let env = temp.path().join("aws/eu1/dev");
        write(&env.join("a/terragrunt.hcl"), b"source = \"git::a\"\ndependencies = { p = [\"../b\"] }\n");
        write(&env.join("b/terragrunt.hcl"), b"source = \"git::b\"\n");

        let config = Config::default();
        let first = extract(&env, &config).into_value().unwrap();
        let second = extract(&env, &config).into_value().unwrap();
        assert_eq!(first.modules, second.modules);
        assert_eq!(first.dependencies, second.dependencies);
    }

    #[test]
    fn test_refreshed_keeps_content() {
        let temp = TempDir::new().unwrap();
        let env = temp.path().join("aws/eu1/dev");
        write(&env.join("terragrunt.hcl"), b"source = \"git::a\"\n");

        let metadata = extract(&env, &Config::default()).into_value().unwrap();
        let refreshed = metadata.refreshed();
        assert_eq!(refreshed.modules, metadata.modules);
        assert!(refreshed.last_analyzed >= metadata.last_analyzed);
    }
}
