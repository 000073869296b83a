//! Summary report construction and output.
//!
//! The report is always persisted as JSON under the diagrams directory. On the
//! terminal it can be shown as:
//! - Pretty: colored output for human readability
//! - JSON: the persisted document, for programmatic consumption

use chrono::{DateTime, Utc};
use colored::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyze::DependencyAnalysis;
use crate::config::ReportConfig;
use crate::error::InfraError;
use crate::score::{self, EnvironmentScore, Thresholds};

/// Headline numbers of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_environments: usize,
    pub total_shared_modules: usize,
    pub average_complexity: f64,
}

/// The aggregate report over all analyzed environments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub project: String,
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
    pub environments: IndexMap<String, EnvironmentScore>,
    pub shared_modules: IndexMap<String, Vec<String>>,
    pub recommendations: Vec<String>,
}

/// Build the report for an analysis.
pub fn build_report(analysis: &DependencyAnalysis, config: &ReportConfig) -> SummaryReport {
    let environments = score::score_environments(&analysis.environment_complexity);
    let recommendations = score::recommendations(
        analysis.shared_modules.len(),
        &environments,
        Thresholds::from(config),
    );

    SummaryReport {
        project: config.project.clone(),
        generated_at: Utc::now(),
        summary: Summary {
            total_environments: analysis.total_environments,
            total_shared_modules: analysis.shared_modules.len(),
            average_complexity: score::average_complexity(&environments),
        },
        environments,
        shared_modules: analysis.shared_modules.clone(),
        recommendations,
    }
}

/// Persist the report as pretty JSON into `dir`, returning the file path.
pub fn save_report(
    report: &SummaryReport,
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf, InfraError> {
    fs::create_dir_all(dir).map_err(|e| InfraError::io(dir, e))?;
    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json).map_err(|e| InfraError::io(&path, e))?;
    Ok(path)
}

/// Write the report as JSON to stdout.
pub fn write_json(report: &SummaryReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}

/// Write the report in pretty (human-readable) format.
pub fn write_pretty(report: &SummaryReport, saved_to: &Path, complexity_threshold: usize) {
    println!();
    print!("  ");
    print!("{}", "infradiag".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Project:  ".dimmed());
    println!("{}", report.project);
    print!("  {}", "Report:   ".dimmed());
    println!("{}", saved_to.display());
    println!();

    println!(
        "  Environments: {}  Shared modules: {}  Average complexity: {}",
        report.summary.total_environments.to_string().bold(),
        report.summary.total_shared_modules.to_string().bold(),
        format!("{:.2}", report.summary.average_complexity).bold()
    );
    println!();

    if !report.environments.is_empty() {
        write_environments(&report.environments, complexity_threshold);
        println!();
    }

    if !report.shared_modules.is_empty() {
        write_shared_modules(&report.shared_modules);
        println!();
    }

    write_recommendations(&report.recommendations);
    println!();
}

fn write_environments(environments: &IndexMap<String, EnvironmentScore>, threshold: usize) {
    println!("  {} ({}):", "Environments".bold(), environments.len());

    for (name, s) in environments {
        print!("    {:<32}", name.blue());
        print!("{:>3} modules  {:>3} dependencies  score ", s.modules, s.dependencies);
        write_colored_score(s.complexity_score, threshold);
        println!();
    }
}

fn write_colored_score(score: usize, threshold: usize) {
    match score {
        s if s > threshold => print!("{}", s.to_string().red()),
        s if s * 2 > threshold => print!("{}", s.to_string().yellow()),
        s => print!("{}", s.to_string().green()),
    }
}

fn write_shared_modules(shared: &IndexMap<String, Vec<String>>) {
    println!("  {} ({}):", "Modules".bold(), shared.len());

    for (source, envs) in shared {
        let count = envs.len();
        let plural = if count != 1 { "s" } else { "" };
        println!("    {}", source);
        println!(
            "            {}",
            format!("{} use{}: {}", count, plural, envs.join(", ")).dimmed()
        );
    }
}

fn write_recommendations(recommendations: &[String]) {
    if recommendations.is_empty() {
        println!("  {}", "✓ No recommendations".green());
        return;
    }

    println!("  {} ({}):", "Recommendations".bold(), recommendations.len());
    for rec in recommendations {
        println!("    {} {}", "→".yellow(), rec);
    }
}
