//! Diagram orchestration.
//!
//! Rendering one environment walks through a fixed sequence of stages:
//!
//! ```text
//! Start -> MetadataExtracted -> PlanGenerated -> DiagramWritten -> Success | Failed
//! ```
//!
//! The init and plan steps are preconditions only; their exit codes are
//! logged and otherwise ignored. Success requires the renderer to exit zero
//! and leave a non-empty image behind. Failures never escape a single render,
//! so a batch always runs to the end.

mod process;
#[cfg(any(test, feature = "testing"))]
mod testing;
mod toolchain;

pub use process::{CommandRunner, Invocation, ProcessOutput, StdoutTarget, SystemRunner};
#[cfg(any(test, feature = "testing"))]
pub use testing::{RecordingRunner, ScriptedResult};
pub use toolchain::{plan_sequence, ToolchainFlavor};

use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::discover::{self, env_name, Environment};
use crate::error::InfraError;
use crate::extract::{self, EnvironmentMetadata};
use crate::outcome::{Issue, IssueKind, Outcome};

/// Stages of a single render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Start,
    MetadataExtracted,
    PlanGenerated,
    DiagramWritten,
    Success,
    Failed,
}

impl std::fmt::Display for RenderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RenderStage::Start => "start",
            RenderStage::MetadataExtracted => "metadata_extracted",
            RenderStage::PlanGenerated => "plan_generated",
            RenderStage::DiagramWritten => "diagram_written",
            RenderStage::Success => "success",
            RenderStage::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Files produced by a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    pub name: String,
    pub diagram: PathBuf,
    pub metadata: PathBuf,
}

/// Per-environment results of a batch render, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub results: IndexMap<String, bool>,
}

impl RenderSummary {
    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|ok| **ok).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded() == self.total()
    }
}

/// Removes the plan artifact when dropped.
struct PlanArtifact(PathBuf);

impl Drop for PlanArtifact {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = fs::remove_file(&self.0) {
                tracing::warn!(path = %self.0.display(), error = %e, "could not remove plan artifact");
            }
        }
    }
}

/// Drives the external toolchain for environments under a project root.
pub struct Orchestrator<'a, R: CommandRunner = SystemRunner> {
    root: PathBuf,
    diagrams_dir: PathBuf,
    config: &'a Config,
    runner: R,
}

impl<'a> Orchestrator<'a, SystemRunner> {
    /// Orchestrator that spawns real processes.
    pub fn new<P: AsRef<Path>>(root: P, config: &'a Config) -> Self {
        Self::with_runner(root, config, SystemRunner)
    }
}

impl<'a, R: CommandRunner> Orchestrator<'a, R> {
    pub fn with_runner<P: AsRef<Path>>(root: P, config: &'a Config, runner: R) -> Self {
        let root = root.as_ref().to_path_buf();
        let diagrams_dir = root.join(&config.diagrams_dir);
        Self {
            root,
            diagrams_dir,
            config,
            runner,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn diagrams_dir(&self) -> &Path {
        &self.diagrams_dir
    }

    /// Path of the rendered image for an environment.
    pub fn diagram_path(&self, name: &str) -> PathBuf {
        self.diagrams_dir
            .join(format!("{}.{}", name, self.config.renderer.extension))
    }

    /// Path of the metadata sidecar for an environment.
    pub fn metadata_path(&self, name: &str) -> PathBuf {
        self.diagrams_dir.join(format!("{}-metadata.json", name))
    }

    /// Render one environment; `true` on success.
    pub fn render(&self, environment: &str, region: &str) -> bool {
        match self.try_render(environment, region) {
            Outcome::Fatal(issue) => {
                tracing::error!(%environment, %region, "{}", issue);
                false
            }
            _ => true,
        }
    }

    /// Render one environment and report what happened.
    ///
    /// A missing environment fails before any side effect. Metadata is only
    /// persisted after a successful render.
    pub fn try_render(&self, environment: &str, region: &str) -> Outcome<RenderedDiagram> {
        let env_path = self
            .root
            .join(&self.config.providers_dir)
            .join(region)
            .join(environment);
        let name = env_name(environment, region);

        if !env_path.exists() {
            let err = InfraError::EnvironmentNotFound(env_path.clone());
            return Outcome::Fatal(
                Issue::new(IssueKind::NotFound, err.to_string())
                    .with_path(env_path.to_string_lossy()),
            );
        }

        tracing::info!(%name, "generating diagram");
        let mut stage = RenderStage::Start;

        let extracted = extract::extract(&env_path, self.config);
        let issues = extracted.issues().to_vec();
        let metadata = extracted
            .into_value()
            .unwrap_or_else(|| EnvironmentMetadata::empty(&env_path));
        advance(&name, &mut stage, RenderStage::MetadataExtracted);

        match self.run_pipeline(&env_path, environment, region, &name, &mut stage) {
            Ok(rendered) => {
                if let Err(e) = self.write_metadata(&rendered.metadata, &metadata) {
                    advance(&name, &mut stage, RenderStage::Failed);
                    return Outcome::Fatal(
                        Issue::new(IssueKind::Unexpected, e.to_string())
                            .with_path(rendered.metadata.to_string_lossy()),
                    );
                }
                advance(&name, &mut stage, RenderStage::Success);
                tracing::info!(metadata = %rendered.metadata.display(), "generated metadata");
                Outcome::from_parts(rendered, issues)
            }
            Err(issue) => {
                tracing::debug!(%name, failed_after = %stage, "render failed");
                advance(&name, &mut stage, RenderStage::Failed);
                Outcome::Fatal(issue)
            }
        }
    }

    /// Init, plan and render. The plan artifact is removed on every path.
    fn run_pipeline(
        &self,
        env_path: &Path,
        environment: &str,
        region: &str,
        name: &str,
        stage: &mut RenderStage,
    ) -> Result<RenderedDiagram, Issue> {
        let unexpected = |e: InfraError| Issue::new(IssueKind::Unexpected, e.to_string());

        let env = vec![
            (self.config.env_vars.region.clone(), region.to_string()),
            (self.config.env_vars.environment.clone(), environment.to_string()),
        ];

        let _plan_artifact = PlanArtifact(env_path.join(&self.config.toolchain.plan_artifact));

        let flavor = ToolchainFlavor::detect(env_path, self.config);
        tracing::debug!(%name, %flavor, "detected toolchain");
        for step in plan_sequence(flavor, env_path, &env, self.config) {
            let output = self.runner.run(&step).map_err(unexpected)?;
            tracing::debug!(
                command = %step.display(),
                exit_code = ?output.exit_code,
                "toolchain step finished"
            );
        }
        advance(name, stage, RenderStage::PlanGenerated);

        fs::create_dir_all(&self.diagrams_dir)
            .map_err(|e| unexpected(InfraError::io(&self.diagrams_dir, e)))?;
        let diagram = self.diagram_path(name);
        let render = Invocation::new(
            &self.config.renderer.program,
            &self.config.renderer.args,
            env_path,
        )
        .envs(&env)
        .stdout_to(&diagram);

        let output = self.runner.run(&render).map_err(unexpected)?;
        advance(name, stage, RenderStage::DiagramWritten);

        let size = fs::metadata(&diagram).map(|m| m.len()).unwrap_or(0);
        if !output.success() || size == 0 {
            let reason = if !output.success() {
                format!(
                    "renderer exited with {}",
                    output
                        .exit_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".to_string())
                )
            } else {
                "renderer produced an empty diagram".to_string()
            };
            if !output.stderr.trim().is_empty() {
                tracing::debug!(stderr = %output.stderr.trim(), "renderer stderr");
            }
            return Err(Issue::new(IssueKind::OrchestrationFailure, reason)
                .with_path(diagram.to_string_lossy()));
        }

        Ok(RenderedDiagram {
            name: name.to_string(),
            metadata: self.metadata_path(name),
            diagram,
        })
    }

    fn write_metadata(&self, path: &Path, metadata: &EnvironmentMetadata) -> Result<(), InfraError> {
        let json = serde_json::to_string_pretty(&metadata.refreshed())?;
        fs::write(path, json).map_err(|e| InfraError::io(path, e))
    }

    /// Render every discovered environment, one after another.
    pub fn render_all(&self) -> RenderSummary {
        self.render_all_with(|_, _| {})
    }

    /// Like [`render_all`](Self::render_all), calling `on_result` after each environment.
    pub fn render_all_with<F>(&self, mut on_result: F) -> RenderSummary
    where
        F: FnMut(&Environment, bool),
    {
        let environments = discover::discover(&self.root, self.config)
            .into_value()
            .unwrap_or_default();
        tracing::info!(count = environments.len(), "discovered environments");

        let mut summary = RenderSummary::default();
        for env in &environments {
            let ok = self.render(&env.environment, &env.region);
            summary.results.insert(env.name.clone(), ok);
            on_result(env, ok);
        }
        summary
    }
}

fn advance(name: &str, stage: &mut RenderStage, next: RenderStage) {
    tracing::debug!(%name, from = %stage, to = %next, "render stage");
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_env(root: &Path, region: &str, env: &str) -> PathBuf {
        let dir = root.join("aws").join(region).join(env);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("terragrunt.hcl"), "source = \"git::modA\"\n").unwrap();
        dir
    }

    #[test]
    fn test_missing_environment_fails_without_side_effects() {
        let temp = TempDir::new().unwrap();
        let config = Config::default();
        let orchestrator = Orchestrator::with_runner(temp.path(), &config, RecordingRunner::new());

        let outcome = orchestrator.try_render("prod", "nowhere");
        match outcome {
            Outcome::Fatal(issue) => assert_eq!(issue.kind, IssueKind::NotFound),
            other => panic!("expected fatal outcome, got {:?}", other),
        }
        assert!(orchestrator.runner().calls().is_empty());
        assert!(!orchestrator.metadata_path("prod-nowhere").exists());
        assert!(!orchestrator.diagrams_dir().exists());
    }

    #[test]
    fn test_successful_render_writes_sidecar() {
        let temp = TempDir::new().unwrap();
        let env_dir = setup_env(temp.path(), "eu1", "dev");
        let config = Config::default();
        let runner = RecordingRunner::new()
            .script("blast-radius", ScriptedResult::exit(0).with_stdout(b"<svg/>"));
        let orchestrator = Orchestrator::with_runner(temp.path(), &config, runner);

        assert!(orchestrator.render("dev", "eu1"));

        let calls = orchestrator.runner().calls();
        let commands: Vec<String> = calls.iter().map(|c| c.display()).collect();
        assert_eq!(
            commands,
            vec![
                "terragrunt init --terragrunt-non-interactive",
                "terragrunt plan -out=tfplan --terragrunt-non-interactive",
                "blast-radius --svg",
            ]
        );
        for call in &calls {
            assert_eq!(call.cwd, env_dir);
            assert!(call.env.contains(&("AWS_REGION".to_string(), "eu1".to_string())));
            assert!(call.env.contains(&("ENVIRONMENT".to_string(), "dev".to_string())));
        }

        let sidecar = orchestrator.metadata_path("dev-eu1");
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(sidecar).unwrap()).unwrap();
        assert_eq!(json["environment"], "dev");
        assert_eq!(json["region"], "eu1");
        assert_eq!(json["modules"][0]["source"], "git::modA");
        assert_eq!(
            fs::read(orchestrator.diagram_path("dev-eu1")).unwrap(),
            b"<svg/>"
        );
    }

    #[test]
    fn test_empty_diagram_is_failure() {
        let temp = TempDir::new().unwrap();
        setup_env(temp.path(), "eu1", "dev");
        let config = Config::default();
        let orchestrator = Orchestrator::with_runner(temp.path(), &config, RecordingRunner::new());

        match orchestrator.try_render("dev", "eu1") {
            Outcome::Fatal(issue) => {
                assert_eq!(issue.kind, IssueKind::OrchestrationFailure);
                assert!(issue.message.contains("empty"));
            }
            other => panic!("expected fatal outcome, got {:?}", other),
        }
        assert!(!orchestrator.metadata_path("dev-eu1").exists());
    }

    #[test]
    fn test_nonzero_renderer_exit_is_failure() {
        let temp = TempDir::new().unwrap();
        setup_env(temp.path(), "eu1", "dev");
        let config = Config::default();
        let runner = RecordingRunner::new()
            .script("blast-radius", ScriptedResult::exit(1).with_stdout(b"<svg/>"));
        let orchestrator = Orchestrator::with_runner(temp.path(), &config, runner);

        assert!(!orchestrator.render("dev", "eu1"));
        assert!(!orchestrator.metadata_path("dev-eu1").exists());
    }

    #[test]
    fn test_toolchain_failures_do_not_stop_render() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("aws/eu1/dev");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("main.tf"), "").unwrap();
        let config = Config::default();
        let runner = RecordingRunner::new()
            .script("terraform", ScriptedResult::exit(1))
            .script("terraform", ScriptedResult::exit(1))
            .script("blast-radius", ScriptedResult::exit(0).with_stdout(b"<svg/>"));
        let orchestrator = Orchestrator::with_runner(temp.path(), &config, runner);

        assert!(orchestrator.render("dev", "eu1"));
        assert_eq!(orchestrator.runner().calls()[0].program, "terraform");
    }

    #[test]
    fn test_plan_artifact_removed() {
        let temp = TempDir::new().unwrap();
        let env_dir = setup_env(temp.path(), "eu1", "dev");
        fs::write(env_dir.join("tfplan"), "plan").unwrap();
        let config = Config::default();
        let orchestrator = Orchestrator::with_runner(temp.path(), &config, RecordingRunner::new());

        assert!(!orchestrator.render("dev", "eu1"));
        assert!(!env_dir.join("tfplan").exists());
    }

    #[test]
    fn test_render_all_continues_after_failure() {
        let temp = TempDir::new().unwrap();
        setup_env(temp.path(), "eu1", "dev");
        setup_env(temp.path(), "eu1", "prod");
        let config = Config::default();
        let runner = RecordingRunner::new()
            .script("blast-radius", ScriptedResult::exit(1))
            .script("blast-radius", ScriptedResult::exit(0).with_stdout(b"<svg/>"));
        let orchestrator = Orchestrator::with_runner(temp.path(), &config, runner);

        let mut seen = Vec::new();
        let summary = orchestrator.render_all_with(|env, ok| seen.push((env.name.clone(), ok)));

        assert_eq!(summary.total(), 2);
        assert_eq!(summary.succeeded(), 1);
        assert!(!summary.all_succeeded());
        assert_eq!(seen.len(), 2);
        assert!(!seen[0].1);
        assert!(seen[1].1);
    }

    #[test]
    fn test_renderer_spawn_failure_is_unexpected() {
        let temp = TempDir::new().unwrap();
        let env_dir = setup_env(temp.path(), "eu1", "dev");
        fs::write(env_dir.join("tfplan"), "plan").unwrap();
        let config = Config::default();
        let runner = RecordingRunner::new().script("blast-radius", ScriptedResult::spawn_failure());
        let orchestrator = Orchestrator::with_runner(temp.path(), &config, runner);

        match orchestrator.try_render("dev", "eu1") {
            Outcome::Fatal(issue) => {
                assert_eq!(issue.kind, IssueKind::Unexpected);
                assert!(issue.message.contains("blast-radius"));
            }
            other => panic!("expected fatal outcome, got {:?}", other),
        }
        assert!(!orchestrator.metadata_path("dev-eu1").exists());
        assert!(!env_dir.join("tfplan").exists());
    }

    #[test]
    fn test_toolchain_spawn_failure_skips_renderer() {
        let temp = TempDir::new().unwrap();
        setup_env(temp.path(), "eu1", "dev");
        let config = Config::default();
        let runner = RecordingRunner::new().script("terragrunt", ScriptedResult::spawn_failure());
        let orchestrator = Orchestrator::with_runner(temp.path(), &config, runner);

        assert!(!orchestrator.render("dev", "eu1"));
        let programs: Vec<String> = orchestrator
            .runner()
            .calls()
            .iter()
            .map(|c| c.program.clone())
            .collect();
        assert_eq!(programs, vec!["terragrunt"]);
        assert!(!orchestrator.diagram_path("dev-eu1").exists());
    }

    #[test]
    fn test_render_all_empty_project() {
        let temp = TempDir::new().unwrap();
        let config = Config::default();
        let orchestrator = Orchestrator::with_runner(temp.path(), &config, RecordingRunner::new());
        let summary = orchestrator.render_all();
        assert_eq!(summary.total(), 0);
        assert!(summary.all_succeeded());
    }
}
