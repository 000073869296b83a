//! infradiag - infrastructure topology diagrams and dependency reports.
//!
//! infradiag inventories a tree of Terragrunt/Terraform environments laid out
//! as `{root}/aws/{region}/{environment}`, scrapes lightweight metadata from
//! each (module sources, inter-module dependencies), renders a topology
//! diagram per environment through external tools, and produces aggregate
//! reports: shared-module usage, complexity scores and recommendations.
//!
//! # Architecture
//!
//! Data flows leaf to root:
//!
//! - `discover`: finds environment directories
//! - `extract`: best-effort textual extraction of module facts
//! - `analyze`: cross-environment aggregation
//! - `render`: drives the init/plan/render toolchain for one environment
//! - `score` and `report`: complexity scoring and the summary report
//! - `outcome`: the `Ok | Warning | Fatal` result shape shared by the stages

pub mod analyze;
pub mod cli;
pub mod config;
pub mod discover;
pub mod error;
pub mod extract;
pub mod outcome;
pub mod render;
pub mod report;
pub mod score;

pub use analyze::{analyze, Analyzer, Complexity, DependencyAnalysis, EnvFilter};
pub use config::Config;
pub use discover::{discover, Environment};
pub use error::InfraError;
pub use extract::{extract, EnvironmentMetadata, ModuleRef};
pub use outcome::{Issue, IssueKind, Outcome, Severity};
pub use render::{CommandRunner, Orchestrator, RenderSummary, SystemRunner};
pub use report::{build_report, SummaryReport};
pub use score::EnvironmentScore;
