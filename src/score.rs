//! Complexity scoring and recommendation rules.
//!
//! An environment's complexity score is its module count plus its dependency
//! count, unweighted. Recommendations come from two fixed, independent rules
//! evaluated in order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analyze::Complexity;
use crate::config::ReportConfig;

/// Recommendation emitted when too few shared modules exist.
pub const MORE_SHARED_MODULES: &str =
    "Consider creating more shared modules to reduce code duplication";

/// Prefix of the recommendation naming high-complexity environments.
pub const REVIEW_COMPLEXITY_PREFIX: &str = "Review complexity in environments: ";

/// Default rule thresholds.
pub mod thresholds {
    pub const MIN_SHARED_MODULES: usize = 3;
    pub const COMPLEXITY: usize = 10;
}

/// Thresholds used by the recommendation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Rule 1 fires below this many distinct shared-module sources.
    pub min_shared_modules: usize,
    /// Rule 2 flags environments scoring strictly above this.
    pub complexity: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_shared_modules: thresholds::MIN_SHARED_MODULES,
            complexity: thresholds::COMPLEXITY,
        }
    }
}

impl From<&ReportConfig> for Thresholds {
    fn from(config: &ReportConfig) -> Self {
        Self {
            min_shared_modules: config.min_shared_modules,
            complexity: config.complexity_threshold,
        }
    }
}

/// Scored complexity for one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentScore {
    pub modules: usize,
    pub dependencies: usize,
    pub complexity_score: usize,
}

impl From<Complexity> for EnvironmentScore {
    fn from(c: Complexity) -> Self {
        Self {
            modules: c.modules,
            dependencies: c.dependencies,
            complexity_score: c.score(),
        }
    }
}

/// Score every environment, keeping the input order.
pub fn score_environments(
    complexity: &IndexMap<String, Complexity>,
) -> IndexMap<String, EnvironmentScore> {
    complexity
        .iter()
        .map(|(name, c)| (name.clone(), EnvironmentScore::from(*c)))
        .collect()
}

/// Mean complexity score; zero for an empty set.
pub fn average_complexity(scores: &IndexMap<String, EnvironmentScore>) -> f64 {
    let total: usize = scores.values().map(|s| s.complexity_score).sum();
    total as f64 / scores.len().max(1) as f64
}

/// Names of environments scoring above the threshold, in map order.
pub fn high_complexity(
    scores: &IndexMap<String, EnvironmentScore>,
    threshold: usize,
) -> Vec<String> {
    scores
        .iter()
        .filter(|(_, s)| s.complexity_score > threshold)
        .map(|(name, _)| name.clone())
        .collect()
}

/// Apply the recommendation rules.
pub fn recommendations(
    shared_module_count: usize,
    scores: &IndexMap<String, EnvironmentScore>,
    thresholds: Thresholds,
) -> Vec<String> {
    let mut recs = Vec::new();

    if shared_module_count < thresholds.min_shared_modules {
        recs.push(MORE_SHARED_MODULES.to_string());
    }

    let flagged = high_complexity(scores, thresholds.complexity);
    if !flagged.is_empty() {
        recs.push(format!("{}{}", REVIEW_COMPLEXITY_PREFIX, flagged.join(", ")));
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(entries: &[(&str, usize, usize)]) -> IndexMap<String, EnvironmentScore> {
        let complexity: IndexMap<String, Complexity> = entries
            .iter()
            .map(|(name, m, d)| {
                (
                    name.to_string(),
                    Complexity {
                        modules: *m,
                        dependencies: *d,
                    },
                )
            })
            .collect();
        score_environments(&complexity)
    }

    #[test]
    fn test_score_is_additive() {
        let s = scores(&[("dev-eu1", 3, 4), ("prod-eu1", 0, 0)]);
        assert_eq!(s["dev-eu1"].complexity_score, 7);
        assert_eq!(s["prod-eu1"].complexity_score, 0);
    }

    #[test]
    fn test_average_complexity() {
        let s = scores(&[("a", 2, 2), ("b", 5, 3)]);
        assert!((average_complexity(&s) - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_complexity_empty() {
        assert_eq!(average_complexity(&IndexMap::new()), 0.0);
    }

    #[test]
    fn test_shared_module_rule_boundary() {
        let s = IndexMap::new();
        let at_two = recommendations(2, &s, Thresholds::default());
        assert_eq!(at_two, vec![MORE_SHARED_MODULES.to_string()]);

        let at_three = recommendations(3, &s, Thresholds::default());
        assert!(at_three.is_empty());
    }

    #[test]
    fn test_complexity_rule_is_strictly_greater() {
        let s = scores(&[("dev-eu1", 5, 5), ("prod-eu1", 6, 5), ("qa-eu1", 11, 0)]);
        let recs = recommendations(5, &s, Thresholds::default());
        assert_eq!(
            recs,
            vec!["Review complexity in environments: prod-eu1, qa-eu1".to_string()]
        );
    }

    #[test]
    fn test_rules_are_independent_and_ordered() {
        let s = scores(&[("prod-eu1", 20, 0)]);
        let recs = recommendations(0, &s, Thresholds::default());
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0], MORE_SHARED_MODULES);
        assert!(recs[1].starts_with(REVIEW_COMPLEXITY_PREFIX));
    }

    #[test]
    fn test_thresholds_from_config() {
        let config = ReportConfig {
            min_shared_modules: 1,
            complexity_threshold: 50,
            ..Default::default()
        };
        let t = Thresholds::from(&config);
        assert_eq!(t.min_shared_modules, 1);
        assert_eq!(t.complexity, 50);
    }
}
