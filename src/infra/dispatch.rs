use crate::domain::{CommandSpec, Handoff, Job, JobReport};
use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::Sender;
use std::thread;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to run {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} exited with {status}")]
    Failed {
        command: String,
        status: ExitStatus,
        output: String,
    },
}

impl DispatchError {
    /// Captured output of a failed command, empty for launch failures.
    pub fn output(&self) -> &str {
        match self {
            Self::Launch { .. } => "",
            Self::Failed { output, .. } => output,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    /// Stdout followed by stderr.
    pub text: String,
}

fn build(spec: &CommandSpec) -> Command {
    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    if let Some(dir) = &spec.cwd {
        command.current_dir(dir);
    }
    command
}

/// Run without a terminal and collect output. Only a launch failure is an
/// error here; the exit status is left to the caller.
pub fn run_captured(spec: &CommandSpec) -> Result<CapturedOutput, DispatchError> {
    let output = build(spec)
        .stdin(Stdio::null())
        .env("NO_COLOR", "1")
        .env("FORCE_COLOR", "0")
        .output()
        .map_err(|source| DispatchError::Launch {
            program: spec.program.clone(),
            source,
        })?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }

    Ok(CapturedOutput {
        status: output.status,
        text,
    })
}

/// Like [`run_captured`], treating a non-zero exit as an error.
pub fn run_checked(spec: &CommandSpec) -> Result<String, DispatchError> {
    let captured = run_captured(spec)?;
    if !captured.status.success() {
        return Err(DispatchError::Failed {
            command: spec.to_string(),
            status: captured.status,
            output: captured.text,
        });
    }
    Ok(captured.text)
}

/// Run `job` on a worker thread and deliver its report on `tx`.
pub fn spawn_job(job: Job, tx: Sender<JobReport>) {
    thread::spawn(move || {
        let report = crate::infra::run_job(&job);
        let _ = tx.send(report);
    });
}

/// Run hand-off steps with the terminal attached. Every step but the last
/// must succeed; the last step's failure is reported too.
pub fn run_foreground(handoff: &Handoff) -> Result<(), DispatchError> {
    for spec in &handoff.steps {
        tracing::info!(event = "dispatch.handoff_step", command = %spec);
        let status = build(spec)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| DispatchError::Launch {
                program: spec.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(DispatchError::Failed {
                command: spec.to_string(),
                status,
                output: String::new(),
            });
        }
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn captures_stdout_then_stderr() {
        let captured = run_captured(&sh("echo out; echo err >&2")).expect("run");
        assert!(captured.status.success());
        assert_eq!(captured.text, "out\nerr\n");
    }

    #[test]
    fn non_zero_exit_is_reported_with_output() {
        let error = run_checked(&sh("echo broken; exit 3")).expect_err("fails");
        assert!(matches!(error, DispatchError::Failed { .. }));
        assert_eq!(error.output(), "broken\n");
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let error = run_checked(&CommandSpec::new("commandy-no-such-program")).expect_err("fails");
        assert!(matches!(error, DispatchError::Launch { .. }));
    }

    #[test]
    fn runs_in_requested_directory() {
        let dir = tempdir().expect("tempdir");
        let output = run_checked(&sh("pwd").in_dir(dir.path())).expect("run");
        let reported = std::fs::canonicalize(output.trim()).expect("canonicalize");
        let expected = std::fs::canonicalize(dir.path()).expect("canonicalize");
        assert_eq!(reported, expected);
    }

    #[test]
    fn foreground_stops_at_failing_step() {
        let handoff = Handoff {
            steps: vec![sh("exit 1"), sh("exit 0")],
        };
        assert!(run_foreground(&handoff).is_err());
    }
}
