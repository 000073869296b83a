//! Cross-environment dependency analysis.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::discover::Environment;
use crate::extract;
use crate::outcome::Issue;

/// Module and dependency counts for one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complexity {
    pub modules: usize,
    pub dependencies: usize,
}

impl Complexity {
    /// Unweighted complexity score.
    pub fn score(&self) -> usize {
        self.modules + self.dependencies
    }
}

/// Restricts analysis to a single environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFilter {
    pub environment: String,
    pub region: String,
}

impl EnvFilter {
    pub fn new(environment: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            region: region.into(),
        }
    }

    /// Build a filter only when both parts are given.
    pub fn from_parts(environment: Option<&str>, region: Option<&str>) -> Option<Self> {
        match (environment, region) {
            (Some(e), Some(r)) => Some(Self::new(e, r)),
            _ => None,
        }
    }
}

/// Aggregate statistics over a set of environments.
///
/// Maps keep insertion order, which is discovery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyAnalysis {
    pub total_environments: usize,
    pub dependencies: IndexMap<String, Vec<String>>,
    /// Module source to the names of the environments declaring it. An
    /// environment appears once per declaring file.
    pub shared_modules: IndexMap<String, Vec<String>>,
    pub environment_complexity: IndexMap<String, Complexity>,
    pub analysis_date: DateTime<Utc>,
    /// Extraction warnings collected during the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Issue>,
}

impl DependencyAnalysis {
    pub fn new() -> Self {
        Self {
            total_environments: 0,
            dependencies: IndexMap::new(),
            shared_modules: IndexMap::new(),
            environment_complexity: IndexMap::new(),
            analysis_date: Utc::now(),
            warnings: Vec::new(),
        }
    }
}

impl Default for DependencyAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs metadata extraction over environments and aggregates the results.
pub struct Analyzer<'a> {
    config: &'a Config,
    filter: Option<EnvFilter>,
}

impl<'a> Analyzer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            filter: None,
        }
    }

    /// Narrow the analysis to one environment.
    pub fn filter(mut self, filter: Option<EnvFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Analyze the environments in scope. Every call re-reads from disk.
    pub fn analyze(&self, environments: &[Environment]) -> DependencyAnalysis {
        let mut analysis = DependencyAnalysis::new();

        let in_scope: Vec<&Environment> = environments
            .iter()
            .filter(|env| match &self.filter {
                Some(f) => env.matches(&f.environment, &f.region),
                None => true,
            })
            .collect();
        analysis.total_environments = in_scope.len();

        for env in in_scope {
            let outcome = extract::extract(&env.full_path, self.config);
            analysis.warnings.extend(outcome.issues().iter().cloned());
            let Some(metadata) = outcome.into_value() else {
                continue;
            };

            analysis.environment_complexity.insert(
                env.name.clone(),
                Complexity {
                    modules: metadata.modules.len(),
                    dependencies: metadata.dependencies.len(),
                },
            );

            for module in &metadata.modules {
                analysis
                    .shared_modules
                    .entry(module.source.clone())
                    .or_default()
                    .push(env.name.clone());
            }

            analysis
                .dependencies
                .insert(env.name.clone(), metadata.dependencies);
        }

        tracing::info!(
            environments = analysis.total_environments,
            shared_modules = analysis.shared_modules.len(),
            "dependency analysis complete"
        );

        analysis
    }
}

/// Analyze `environments`, optionally narrowed by `filter`.
pub fn analyze(
    environments: &[Environment],
    filter: Option<EnvFilter>,
    config: &Config,
) -> DependencyAnalysis {
    Analyzer::new(config).filter(filter).analyze(environments)
}
