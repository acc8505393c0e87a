//! Isolation by re-executing the harness binary once per attempt.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::trace;

use super::{Isolator, Termination};
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::outcome::Attempt;
use crate::probe;

/// Spawns `program probe ...` for every attempt and waits for it.
#[derive(Debug, Clone)]
pub struct ProcessIsolator {
    program: PathBuf,
}

impl ProcessIsolator {
    /// `program` must understand the `probe` subcommand.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use the configured probe binary, or the running executable.
    pub fn from_config(config: &HarnessConfig) -> Result<Self, HarnessError> {
        match &config.probe_bin {
            Some(path) => Ok(Self::new(path)),
            None => std::env::current_exe()
                .map(Self::new)
                .map_err(|source| HarnessError::Spawn {
                    program: "<current executable>".to_string(),
                    source,
                }),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Isolator for ProcessIsolator {
    fn invoke(&self, attempt: &Attempt) -> Result<Termination, HarnessError> {
        let args = probe::to_args(attempt);
        trace!(program = %self.program.display(), ?args, "spawning probe");
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| HarnessError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;
        Ok(termination_from(&output))
    }
}

fn termination_from(output: &Output) -> Termination {
    let diagnostic = String::from_utf8_lossy(&output.stderr).into_owned();
    if let Some(code) = output.status.code() {
        return Termination::exited(code, diagnostic);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = output.status.signal() {
            return Termination::signaled(signal, diagnostic);
        }
    }
    Termination {
        abnormal: true,
        exit_code: None,
        signal: None,
        diagnostic,
    }
}
