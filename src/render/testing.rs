//! Scripted command runner for exercising the orchestrator without the
//! external toolchain. Built for unit tests and behind the `testing` feature.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;

use super::process::{CommandRunner, Invocation, ProcessOutput, StdoutTarget};
use crate::error::{InfraError, Result};

/// A scripted response for [`RecordingRunner`].
#[derive(Debug, Clone)]
pub struct ScriptedResult {
    pub exit_code: i32,
    /// Bytes written to the stdout file, when the invocation redirects to one.
    pub stdout: Vec<u8>,
    /// Fail as if the program could not be started.
    pub spawn_failure: bool,
}

impl ScriptedResult {
    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: code,
            stdout: Vec::new(),
            spawn_failure: false,
        }
    }

    pub fn spawn_failure() -> Self {
        Self {
            spawn_failure: true,
            ..Self::exit(0)
        }
    }

    pub fn with_stdout(mut self, bytes: &[u8]) -> Self {
        self.stdout = bytes.to_vec();
        self
    }
}

/// Records invocations and replays scripted results instead of spawning.
///
/// Unscripted calls exit zero with no output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<Invocation>>,
    script: RefCell<VecDeque<(String, ScriptedResult)>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for the next call to `program`.
    pub fn script(self, program: &str, result: ScriptedResult) -> Self {
        self.script
            .borrow_mut()
            .push_back((program.to_string(), result));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    fn next_result(&self, program: &str) -> ScriptedResult {
        let mut script = self.script.borrow_mut();
        match script.iter().position(|(p, _)| p == program) {
            Some(idx) => script.remove(idx).map(|(_, r)| r).unwrap_or(ScriptedResult::exit(0)),
            None => ScriptedResult::exit(0),
        }
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        let result = self.next_result(&invocation.program);

        if result.spawn_failure {
            return Err(InfraError::Spawn {
                program: invocation.program.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "program not found"),
            });
        }

        if let StdoutTarget::File(path) = &invocation.stdout {
            std::fs::write(path, &result.stdout).map_err(|e| InfraError::io(path, e))?;
        }

        Ok(ProcessOutput {
            exit_code: Some(result.exit_code),
            stderr: String::new(),
        })
    }
}
