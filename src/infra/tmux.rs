use crate::domain::has_session_command;
use std::collections::BTreeSet;
use std::io;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionQueryError {
    #[error("failed to run tmux: {0}")]
    Launch(#[from] io::Error),

    #[error("tmux exited with {0}")]
    Status(String),
}

/// Active session names. Every call asks tmux; nothing is cached.
pub fn query_sessions() -> Result<BTreeSet<String>, SessionQueryError> {
    let output = Command::new("tmux")
        .args(["list-sessions", "-F", "#{session_name}"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()?;
    if !output.status.success() {
        return Err(SessionQueryError::Status(output.status.to_string()));
    }
    Ok(parse_session_list(&String::from_utf8_lossy(&output.stdout)))
}

/// Like [`query_sessions`], with no tmux server counting as no sessions.
pub fn list_sessions() -> BTreeSet<String> {
    match query_sessions() {
        Ok(sessions) => sessions,
        Err(error) => {
            tracing::debug!(event = "tmux.list_failed", error = %error);
            BTreeSet::new()
        }
    }
}

/// Whether a session named exactly `name` is running.
pub fn session_exists(name: &str) -> bool {
    let query = has_session_command(name);
    Command::new(&query.program)
        .args(&query.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

pub fn parse_session_list(stdout: &str) -> BTreeSet<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}
