//! Command-line interface for infradiag.

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyze::{self, EnvFilter};
use crate::config::{self, Config};
use crate::discover::{self, Environment};
use crate::render::Orchestrator;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;

/// Infrastructure diagrams and dependency reports for Terragrunt/Terraform trees.
///
/// Environments are discovered under `{project-root}/aws/{region}/{environment}`.
/// Diagrams are rendered by an external tool; metadata and reports are
/// extracted from the environments' configuration files.
#[derive(Parser)]
#[command(name = "infradiag")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project root directory
    #[arg(long, global = true, default_value = ".")]
    pub project_root: PathBuf,

    /// Path to config YAML file (default: auto-discover in the project root)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log progress at info level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log at debug level
    #[arg(long, global = true)]
    pub debug: bool,
}

impl GlobalArgs {
    /// Log filter implied by the flags, used when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the diagram and metadata for one environment
    Generate(GenerateArgs),
    /// Generate diagrams for every discovered environment
    GenerateAll,
    /// Analyze dependencies and shared modules across environments
    Analyze(AnalyzeArgs),
    /// List discovered environments
    Metadata(MetadataArgs),
    /// Build the infrastructure summary report
    Report(ReportArgs),
}

/// Arguments for the generate command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Environment name (e.g. dev, staging, prod)
    #[arg(short, long)]
    pub environment: Option<String>,

    /// Region (e.g. eu-central-2, us-east-1)
    #[arg(short, long)]
    pub region: Option<String>,
}

/// Arguments for the analyze command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Restrict to this environment (requires --region)
    #[arg(short, long)]
    pub environment: Option<String>,

    /// Restrict to this region (requires --environment)
    #[arg(short, long)]
    pub region: Option<String>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the metadata command.
#[derive(Args, Debug)]
pub struct MetadataArgs {
    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the report command.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Terminal output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Discovered environments plus project context.
#[derive(Serialize)]
struct MetadataDocument<'a> {
    environments: &'a [Environment],
    project_root: String,
    generated_at: DateTime<Utc>,
}

/// Loaded configuration bound to a project root.
pub struct Workspace {
    pub root: PathBuf,
    pub config: Config,
}

impl Workspace {
    /// Load and validate the configuration, and create the diagrams directory.
    pub fn load(global: &GlobalArgs) -> anyhow::Result<Self> {
        let root = global.project_root.clone();
        let config = Config::load(&root, global.config.as_deref())?;
        config::validate(&config)?;

        let diagrams_dir = root.join(&config.diagrams_dir);
        fs::create_dir_all(&diagrams_dir).map_err(|e| {
            anyhow::anyhow!("creating diagrams directory {}: {}", diagrams_dir.display(), e)
        })?;

        Ok(Self { root, config })
    }

    pub fn diagrams_dir(&self) -> PathBuf {
        self.root.join(&self.config.diagrams_dir)
    }

    fn environments(&self) -> Vec<Environment> {
        let outcome = discover::discover(&self.root, &self.config);
        for issue in outcome.issues() {
            tracing::warn!("{}", issue);
        }
        outcome.into_value().unwrap_or_default()
    }
}

/// Dispatch a parsed command line.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    let workspace = Workspace::load(&cli.global)?;

    match &cli.command {
        Commands::Generate(args) => run_generate(&workspace, args),
        Commands::GenerateAll => run_generate_all(&workspace),
        Commands::Analyze(args) => run_analyze(&workspace, args),
        Commands::Metadata(args) => run_metadata(&workspace, args),
        Commands::Report(args) => run_report(&workspace, args),
    }
}

/// Run the generate command.
pub fn run_generate(workspace: &Workspace, args: &GenerateArgs) -> anyhow::Result<i32> {
    let (Some(environment), Some(region)) = (&args.environment, &args.region) else {
        eprintln!("Error: --environment and --region required for generate command");
        return Ok(EXIT_FAILED);
    };

    let orchestrator = Orchestrator::new(&workspace.root, &workspace.config);
    let name = discover::env_name(environment, region);
    println!("Generating enhanced diagram for {}...", name);

    if orchestrator.render(environment, region) {
        println!("Generated metadata: {}", orchestrator.metadata_path(&name).display());
        Ok(EXIT_SUCCESS)
    } else {
        eprintln!("{} {}", "✗ Failed to generate diagram for".red(), name);
        Ok(EXIT_FAILED)
    }
}

/// Run the generate-all command.
pub fn run_generate_all(workspace: &Workspace) -> anyhow::Result<i32> {
    let orchestrator = Orchestrator::new(&workspace.root, &workspace.config);

    let environments = workspace.environments();
    println!("Discovered {} environments", environments.len());

    let summary = orchestrator.render_all_with(|env, ok| {
        if ok {
            println!("{} {}", "✓ Generated diagram for".green(), env.name);
        } else {
            println!("{} {}", "✗ Failed to generate diagram for".red(), env.name);
        }
    });

    println!(
        "Generated {}/{} diagrams successfully",
        summary.succeeded(),
        summary.total()
    );

    if summary.all_succeeded() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the analyze command.
pub fn run_analyze(workspace: &Workspace, args: &AnalyzeArgs) -> anyhow::Result<i32> {
    let environments = workspace.environments();
    let filter = EnvFilter::from_parts(args.environment.as_deref(), args.region.as_deref());
    let analysis = analyze::analyze(&environments, filter, &workspace.config);

    let json = serde_json::to_string_pretty(&analysis)?;
    match &args.output {
        Some(path) => {
            write_output(path, &json)?;
            println!("Analysis saved to: {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(EXIT_SUCCESS)
}

/// Run the metadata command.
pub fn run_metadata(workspace: &Workspace, args: &MetadataArgs) -> anyhow::Result<i32> {
    let environments = workspace.environments();
    let document = MetadataDocument {
        environments: &environments,
        project_root: workspace.root.to_string_lossy().to_string(),
        generated_at: Utc::now(),
    };

    let json = serde_json::to_string_pretty(&document)?;
    match &args.output {
        Some(path) => {
            write_output(path, &json)?;
            println!("Metadata saved to: {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(EXIT_SUCCESS)
}

/// Run the report command.
pub fn run_report(workspace: &Workspace, args: &ReportArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_FAILED);
    }

    let environments = workspace.environments();
    let analysis = analyze::analyze(&environments, None, &workspace.config);
    let summary = report::build_report(&analysis, &workspace.config.report);
    let path = report::save_report(
        &summary,
        &workspace.diagrams_dir(),
        &workspace.config.report.file_name,
    )?;

    match args.format.as_str() {
        "json" => report::write_json(&summary)?,
        _ => {
            report::write_pretty(
                &summary,
                &path,
                workspace.config.report.complexity_threshold,
            );
            println!("Generated infrastructure report: {}", path.display());
        }
    }

    Ok(EXIT_SUCCESS)
}

/// Write command output, creating the parent directory if needed.
fn write_output(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)
        .map_err(|e| anyhow::anyhow!("writing {}: {}", path.display(), e))?;
    Ok(())
}
