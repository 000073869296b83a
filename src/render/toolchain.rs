//! Toolchain flavor detection and the init/plan command sequence.

use std::path::Path;

use crate::config::{Config, ToolchainCommand};

use super::process::Invocation;

/// Which infrastructure CLI drives an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainFlavor {
    /// The environment root holds the orchestration config file.
    Orchestrated,
    /// Plain infrastructure files only.
    Plain,
}

impl ToolchainFlavor {
    /// Detect the flavor from the environment root.
    pub fn detect(env_path: &Path, config: &Config) -> Self {
        if env_path.join(&config.sentinel_file).exists() {
            ToolchainFlavor::Orchestrated
        } else {
            ToolchainFlavor::Plain
        }
    }

    pub fn command<'c>(&self, config: &'c Config) -> &'c ToolchainCommand {
        match self {
            ToolchainFlavor::Orchestrated => &config.toolchain.orchestrated,
            ToolchainFlavor::Plain => &config.toolchain.plain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainFlavor::Orchestrated => "orchestrated",
            ToolchainFlavor::Plain => "plain",
        }
    }
}

impl std::fmt::Display for ToolchainFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The init and plan invocations, in order.
pub fn plan_sequence(
    flavor: ToolchainFlavor,
    env_path: &Path,
    env: &[(String, String)],
    config: &Config,
) -> [Invocation; 2] {
    let cmd = flavor.command(config);
    [
        Invocation::new(&cmd.program, &cmd.init, env_path).envs(env),
        Invocation::new(&cmd.program, &cmd.plan, env_path).envs(env),
    ]
}
