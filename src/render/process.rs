//! Subprocess invocation.
//!
//! Every invocation carries its own working directory and environment
//! variables, so the process-wide current directory is never touched.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{InfraError, Result};

/// Where a subprocess writes its standard output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdoutTarget {
    /// Capture and discard.
    Capture,
    /// Redirect into a file, truncating it first.
    File(PathBuf),
}

/// A fully specified subprocess call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Variables added on top of the inherited environment.
    pub env: Vec<(String, String)>,
    pub stdout: StdoutTarget,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: &[String], cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
            env: Vec::new(),
            stdout: StdoutTarget::Capture,
        }
    }

    pub fn envs(mut self, env: &[(String, String)]) -> Self {
        self.env = env.to_vec();
        self
    }

    pub fn stdout_to(mut self, path: &Path) -> Self {
        self.stdout = StdoutTarget::File(path.to_path_buf());
        self
    }

    /// Command line for log output.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs subprocesses to completion.
pub trait CommandRunner {
    /// Run `invocation` and wait for it. Errors only when the process cannot
    /// be started or its output file cannot be created.
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;
}

/// Runs real processes via `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stderr(Stdio::piped());

        match &invocation.stdout {
            StdoutTarget::Capture => {
                cmd.stdout(Stdio::piped());
            }
            StdoutTarget::File(path) => {
                let file = File::create(path).map_err(|e| InfraError::io(path, e))?;
                cmd.stdout(Stdio::from(file));
            }
        }

        let output = cmd.output().map_err(|source| InfraError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        (**self).run(invocation)
    }
}
