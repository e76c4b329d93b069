use crate::domain::{CommandSpec, Handoff};
use std::path::Path;

const SESSION_MANAGER: &str = "tmux";

/// Map a project name to a name tmux accepts.
///
/// tmux treats `.` and `:` as target separators, so both become `-`. The
/// substitute is never itself replaced, which keeps the mapping idempotent.
pub fn sanitize_session_name(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            '.' | ':' => '-',
            other => other,
        })
        .collect()
}

/// `-t` argument naming exactly `session`. A bare name would also match
/// any session it is a prefix of.
pub fn exact_session_target(session: &str) -> String {
    format!("={session}")
}

/// How to get the user into a named session.
#[derive(Clone, Debug)]
pub struct SessionRequest<'a> {
    pub session: &'a str,
    pub directory: Option<&'a Path>,
    /// Program to run in a fresh window (or as the session's first window).
    pub initial_command: Option<&'a str>,
    pub exists: bool,
    pub inside_tmux: bool,
}

/// Build the hand-off for attaching to, or creating, a session.
///
/// Inside tmux the client is switched instead of nesting an attach; a new
/// session is therefore created detached first.
pub fn session_handoff(request: &SessionRequest<'_>) -> Handoff {
    let mut steps = Vec::new();

    if request.exists {
        if let Some(program) = request.initial_command {
            let mut window = CommandSpec::new(SESSION_MANAGER)
                .args(["new-window", "-t"])
                .arg(format!("{}:", exact_session_target(request.session)));
            if let Some(dir) = request.directory {
                window = window.arg("-c").arg(dir.display().to_string());
            }
            steps.push(window.arg(program));
        }
        steps.push(enter_session(request.session, request.inside_tmux));
        return Handoff { steps };
    }

    let mut create = CommandSpec::new(SESSION_MANAGER).arg("new-session");
    if request.inside_tmux {
        create = create.arg("-d");
    }
    create = create.args(["-s", request.session]);
    if let Some(dir) = request.directory {
        create = create.arg("-c").arg(dir.display().to_string());
    }
    if let Some(program) = request.initial_command {
        create = create.arg(program);
    }
    steps.push(create);

    if request.inside_tmux {
        steps.push(enter_session(request.session, true));
    }
    Handoff { steps }
}

fn enter_session(session: &str, inside_tmux: bool) -> CommandSpec {
    let verb = if inside_tmux { "switch-client" } else { "attach" };
    CommandSpec::new(SESSION_MANAGER)
        .args([verb, "-t"])
        .arg(exact_session_target(session))
}

pub fn kill_session_command(session: &str) -> CommandSpec {
    CommandSpec::new(SESSION_MANAGER)
        .args(["kill-session", "-t"])
        .arg(exact_session_target(session))
}

pub fn has_session_command(session: &str) -> CommandSpec {
    CommandSpec::new(SESSION_MANAGER)
        .args(["has-session", "-t"])
        .arg(exact_session_target(session))
}
