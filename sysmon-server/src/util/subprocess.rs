//! Short-lived helper commands whose stdout is parsed by the collectors.

use std::process::{Command, Stdio};

use crate::collector::SourceError;

/// Builder for running an external command and capturing its stdout.
pub struct SubprocessBuilder {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl SubprocessBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run to completion and return stdout. A missing binary or a non-zero
    /// exit is a [`SourceError::Command`].
    pub fn output(self) -> Result<String, SourceError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        let out = cmd.output().map_err(|e| SourceError::Command {
            program: self.program.clone(),
            reason: e.to_string(),
        })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(SourceError::Command {
                program: self.program,
                reason: format!("{} ({})", out.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_output_captures_stdout() {
        let out = SubprocessBuilder::new("sh")
            .args(["-c", "echo hello"])
            .output()
            .unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn test_output_passes_env() {
        let out = SubprocessBuilder::new("sh")
            .args(["-c", "printf %s \"$SYSMON_PROBE\""])
            .env("SYSMON_PROBE", "42")
            .output()
            .unwrap();
        assert_eq!(out, "42");
    }

    #[test]
    fn test_non_zero_exit_is_error() {
        let err = SubprocessBuilder::new("sh")
            .args(["-c", "echo boom >&2; exit 3"])
            .output()
            .unwrap_err();
        match err {
            SourceError::Command { program, reason } => {
                assert_eq!(program, "sh");
                assert!(reason.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_binary_is_error() {
        let err = SubprocessBuilder::new("sysmon-no-such-binary")
            .output()
            .unwrap_err();
        assert!(matches!(err, SourceError::Command { .. }));
    }
}
