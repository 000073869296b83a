//! Environment discovery.
//!
//! Environments live exactly two levels below the providers directory:
//! `{root}/{providers_dir}/{region}/{environment}`. A directory at the second
//! level qualifies when its subtree holds at least one infrastructure file.
//!
//! Entries are returned in directory-listing order, which is filesystem
//! dependent. Callers needing stable output must sort themselves.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::outcome::{Issue, IssueKind, Outcome};

/// One deployable region and environment pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Environment {
    pub environment: String,
    pub region: String,
    /// Path relative to the project root.
    pub path: String,
    pub full_path: PathBuf,
    /// `{environment}-{region}`, unique across a discovery pass.
    pub name: String,
}

impl Environment {
    pub fn new(root: &Path, providers_dir: &str, region: &str, environment: &str) -> Self {
        Self {
            environment: environment.to_string(),
            region: region.to_string(),
            path: format!("{}/{}/{}", providers_dir, region, environment),
            full_path: root.join(providers_dir).join(region).join(environment),
            name: env_name(environment, region),
        }
    }

    /// Whether this environment matches an `{environment, region}` filter.
    pub fn matches(&self, environment: &str, region: &str) -> bool {
        self.environment == environment && self.region == region
    }
}

/// Composite key for an environment.
pub fn env_name(environment: &str, region: &str) -> String {
    format!("{}-{}", environment, region)
}

/// Discover every environment under `root`.
///
/// A missing providers directory yields an empty `Ok`. Region or environment
/// directories that cannot be listed are skipped and reported as warnings.
pub fn discover(root: &Path, config: &Config) -> Outcome<Vec<Environment>> {
    let mut environments = Vec::new();
    let mut issues = Vec::new();

    let providers = root.join(&config.providers_dir);
    if !providers.is_dir() {
        return Outcome::Ok(environments);
    }

    let regions = match fs::read_dir(&providers) {
        Ok(entries) => entries,
        Err(e) => {
            issues.push(listing_issue(&providers, &e));
            return Outcome::from_parts(environments, issues);
        }
    };

    for region_entry in regions.flatten() {
        let region_path = region_entry.path();
        if !region_path.is_dir() {
            continue;
        }
        let region = region_entry.file_name().to_string_lossy().to_string();

        let envs = match fs::read_dir(&region_path) {
            Ok(entries) => entries,
            Err(e) => {
                issues.push(listing_issue(&region_path, &e));
                continue;
            }
        };

        for env_entry in envs.flatten() {
            let env_path = env_entry.path();
            if !env_path.is_dir() {
                continue;
            }
            if !has_infrastructure_files(&env_path, config) {
                continue;
            }
            let environment = env_entry.file_name().to_string_lossy().to_string();
            environments.push(Environment::new(
                root,
                &config.providers_dir,
                &region,
                &environment,
            ));
        }
    }

    tracing::debug!(count = environments.len(), "discovered environments");
    Outcome::from_parts(environments, issues)
}

/// Check whether any file in the subtree has an infrastructure extension.
pub fn has_infrastructure_files(dir: &Path, config: &Config) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .any(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| config.is_infra_extension(ext))
                .unwrap_or(false)
        })
}

fn listing_issue(path: &Path, err: &std::io::Error) -> Issue {
    tracing::warn!(path = %path.display(), error = %err, "cannot list directory");
    Issue::new(IssueKind::ExtractionWarning, format!("cannot list directory: {}", err))
        .with_path(path.to_string_lossy())
}
