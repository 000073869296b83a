//! Tagged outcomes for discovery, extraction and orchestration.
//!
//! Each stage reports one of three shapes instead of swallowing errors at the
//! call site:
//!
//! - `Ok(value)`: the stage ran cleanly.
//! - `Warning(value, issues)`: a usable, possibly partial value plus the
//!   problems encountered along the way.
//! - `Fatal(issue)`: nothing usable was produced.

use serde::{Deserialize, Serialize};

/// Severity levels for issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Kinds of issues a stage can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// The requested environment path does not exist.
    #[serde(rename = "not_found")]
    NotFound,
    /// A configuration file could not be read.
    #[serde(rename = "extraction_warning")]
    ExtractionWarning,
    /// The toolchain or renderer failed, or the output artifact is missing or empty.
    #[serde(rename = "orchestration_failure")]
    OrchestrationFailure,
    /// Any other runtime fault during orchestration.
    #[serde(rename = "unexpected")]
    Unexpected,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::NotFound => "not_found",
            IssueKind::ExtractionWarning => "extraction_warning",
            IssueKind::OrchestrationFailure => "orchestration_failure",
            IssueKind::Unexpected => "unexpected",
        }
    }

    /// Default severity for this kind of issue.
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::ExtractionWarning => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single problem encountered by a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
    /// File or directory the issue refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub severity: Severity,
}

impl Issue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: None,
            severity: kind.severity(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {} ({})", self.kind, self.message, path),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Result of a stage that may succeed partially.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Warning(T, Vec<Issue>),
    Fatal(Issue),
}

impl<T> Outcome<T> {
    /// Build an outcome from a value and the issues collected while producing it.
    pub fn from_parts(value: T, issues: Vec<Issue>) -> Self {
        if issues.is_empty() {
            Outcome::Ok(value)
        } else {
            Outcome::Warning(value, issues)
        }
    }

    /// Issues attached to this outcome.
    pub fn issues(&self) -> &[Issue] {
        match self {
            Outcome::Ok(_) => &[],
            Outcome::Warning(_, issues) => issues,
            Outcome::Fatal(issue) => std::slice::from_ref(issue),
        }
    }

    /// Consume the outcome, keeping only the value.
    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Ok(v) | Outcome::Warning(v, _) => Some(v),
            Outcome::Fatal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_without_issues_is_ok() {
        let outcome = Outcome::from_parts(3, Vec::new());
        assert_eq!(outcome, Outcome::Ok(3));
        assert!(outcome.issues().is_empty());
    }

    #[test]
    fn test_from_parts_with_issues_is_warning() {
        let issue = Issue::new(IssueKind::ExtractionWarning, "bad utf-8").with_path("a/terragrunt.hcl");
        let outcome = Outcome::from_parts(vec![1], vec![issue.clone()]);
        assert_eq!(outcome.issues(), &[issue]);
        assert!(matches!(outcome, Outcome::Warning(..)));
        assert_eq!(outcome.into_value(), Some(vec![1]));
    }

    #[test]
    fn test_fatal_has_no_value() {
        let outcome: Outcome<()> = Outcome::Fatal(Issue::new(IssueKind::NotFound, "missing"));
        assert_eq!(outcome.issues().len(), 1);
        assert_eq!(outcome.issues()[0].severity, Severity::Error);
        assert!(outcome.into_value().is_none());
    }

    #[test]
    fn test_issue_display() {
        let issue = Issue::new(IssueKind::ExtractionWarning, "unreadable").with_path("x.hcl");
        assert_eq!(issue.to_string(), "extraction_warning: unreadable (x.hcl)");
        assert_eq!(issue.severity, Severity::Warning);
    }
}
