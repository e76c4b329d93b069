use crate::domain::{CommandOutcome, CommandSpec, Job, JobReport, Project, kill_session_command};
use crate::infra::{DispatchError, child_dirs, run_captured, run_checked, scan_projects};
use humansize::{DECIMAL, format_size};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(10);
const REPOSITORY_MARKER: &str = ".git";
const FINDER_METADATA: &str = ".DS_Store";

pub fn run_job(job: &Job) -> JobReport {
    tracing::info!(event = "job.started", job = %job.label());
    let outcome = match job {
        Job::Capture {
            command,
            quiet_success,
            ..
        } => capture(command, quiet_success),
        Job::KillSession { session } => match run_checked(&kill_session_command(session)) {
            Ok(_) => CommandOutcome::success(format!("Killed tmux session '{session}'")),
            Err(error) => failure(&error),
        },
        Job::OpenUrl {
            opener,
            url,
            confirmation,
        } => match run_checked(&CommandSpec::new(opener.clone()).arg(url.clone())) {
            Ok(_) => CommandOutcome::success(confirmation.clone()),
            Err(error) => failure(&error),
        },
        Job::CheckPorts { ports } => check_ports(ports),
        Job::GitStatusAll { root } => git_status_all(root),
        Job::GitPullAll { root } => git_pull_all(root),
        Job::DockerCleanup => docker_cleanup("docker"),
        Job::BrewUpdate => brew_update("brew"),
        Job::ClearAllCaches { root } => clear_all_caches(root),
        Job::OutdatedAll {
            root,
            manifest_file,
        } => outdated_all(root, manifest_file),
        Job::FetchRegisteredPorts { api } => fetch_registered_ports(api),
        Job::RemoveDependencyCache { project, cache_dir } => {
            remove_dependency_cache(project, cache_dir)
        }
    };

    tracing::info!(
        event = "job.completed",
        job = %job.label(),
        failed = outcome.is_error()
    );
    JobReport {
        slot: job.slot(),
        outcome,
        refresh_sessions: job.refreshes_sessions(),
    }
}

fn failure(error: &DispatchError) -> CommandOutcome {
    let output = error.output().trim_end();
    if output.is_empty() {
        CommandOutcome::error(format!("Error: {error}"))
    } else {
        CommandOutcome::error(format!("Error: {error}\n{output}"))
    }
}

fn capture(command: &CommandSpec, quiet_success: &str) -> CommandOutcome {
    match run_checked(command) {
        Ok(output) if output.trim().is_empty() => CommandOutcome::success(quiet_success),
        Ok(output) => CommandOutcome::success(output.trim_end()),
        Err(error) => failure(&error),
    }
}

fn check_ports(ports: &[u16]) -> CommandOutcome {
    let mut lines = Vec::with_capacity(ports.len());
    for port in ports {
        let query = CommandSpec::new("lsof").arg("-ti").arg(format!(":{port}"));
        // lsof exits non-zero when nothing listens.
        let captured = match run_captured(&query) {
            Ok(captured) => captured,
            Err(error) => return failure(&error),
        };
        let pids = captured
            .text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>();
        if pids.is_empty() {
            lines.push(format!("Port {port}: available"));
        } else {
            lines.push(format!("Port {port}: PID {}", pids.join(", ")));
        }
    }
    CommandOutcome::success(lines.join("\n"))
}

/// Immediate subdirectories of `root` that are git repositories.
fn repositories(root: &Path) -> Result<Vec<(String, PathBuf)>, CommandOutcome> {
    let dirs = child_dirs(root).map_err(|error| {
        CommandOutcome::error(format!("Error: failed to read {}: {error}", root.display()))
    })?;
    Ok(dirs
        .into_iter()
        .filter(|(_, path)| path.join(REPOSITORY_MARKER).exists())
        .collect())
}

fn git_status_all(root: &Path) -> CommandOutcome {
    let repos = match repositories(root) {
        Ok(repos) => repos,
        Err(outcome) => return outcome,
    };
    if repos.is_empty() {
        return CommandOutcome::info("No git repositories found");
    }

    let mut lines = Vec::with_capacity(repos.len());
    for (name, path) in repos {
        let branch_query = CommandSpec::new("git")
            .args(["branch", "--show-current"])
            .in_dir(&path);
        let branch = run_checked(&branch_query)
            .map(|output| output.trim().to_string())
            .unwrap_or_default();
        let status_query = CommandSpec::new("git")
            .args(["status", "--porcelain"])
            .in_dir(&path);
        let status = match run_checked(&status_query) {
            Ok(output) if output.trim().is_empty() => "clean",
            Ok(_) => "has changes",
            Err(_) => "unknown",
        };
        lines.push(format!("{name} ({branch}) - {status}"));
    }
    CommandOutcome::success(lines.join("\n"))
}

fn git_pull_all(root: &Path) -> CommandOutcome {
    let repos = match repositories(root) {
        Ok(repos) => repos,
        Err(outcome) => return outcome,
    };
    if repos.is_empty() {
        return CommandOutcome::info("No git repositories found");
    }

    let mut failed = false;
    let mut lines = Vec::with_capacity(repos.len());
    for (name, path) in repos {
        let pull = CommandSpec::new("git").args(["pull", "--quiet"]).in_dir(&path);
        match run_checked(&pull) {
            Ok(_) => lines.push(format!("{name}: updated")),
            Err(_) => {
                failed = true;
                lines.push(format!("{name}: failed"));
            }
        }
    }
    step_report(lines, failed)
}

/// Step-by-step text, as an Error when any step failed.
fn step_report(lines: Vec<String>, failed: bool) -> CommandOutcome {
    let text = lines.join("\n");
    if failed {
        CommandOutcome::error(text)
    } else {
        CommandOutcome::success(text)
    }
}

fn push_output(lines: &mut Vec<String>, output: &str) {
    let output = output.trim_end();
    if !output.is_empty() {
        lines.push(output.to_string());
    }
}

fn docker_cleanup(docker: &str) -> CommandOutcome {
    let steps = [
        ("Removing stopped containers", "container"),
        ("Removing unused images", "image"),
        ("Removing unused volumes", "volume"),
        ("Removing unused networks", "network"),
    ];

    let mut failed = false;
    let mut lines = Vec::new();
    for (label, object) in steps {
        lines.push(format!("{label}..."));
        let prune = CommandSpec::new(docker).args([object, "prune", "-f"]);
        if let Err(error) = run_checked(&prune) {
            if matches!(error, DispatchError::Launch { .. }) {
                return failure(&error);
            }
            failed = true;
            lines.push(format!("  {error}"));
            push_output(&mut lines, error.output());
        }
    }

    match run_checked(&CommandSpec::new(docker).args(["system", "df"])) {
        Ok(usage) => {
            lines.push(String::new());
            push_output(&mut lines, &usage);
        }
        Err(error) => {
            failed = true;
            lines.push(format!("  {error}"));
        }
    }
    step_report(lines, failed)
}

fn brew_update(brew: &str) -> CommandOutcome {
    let steps = [
        ("Updating Homebrew", "update"),
        ("Upgrading packages", "upgrade"),
        ("Cleaning up", "cleanup"),
    ];

    let mut failed = false;
    let mut lines = Vec::new();
    for (label, verb) in steps {
        lines.push(format!("{label}..."));
        match run_checked(&CommandSpec::new(brew).arg(verb)) {
            Ok(output) => push_output(&mut lines, &output),
            Err(error @ DispatchError::Launch { .. }) => return failure(&error),
            Err(error) => {
                failed = true;
                push_output(&mut lines, error.output());
                lines.push(format!("  {error}"));
            }
        }
    }
    step_report(lines, failed)
}

fn clear_all_caches(root: &Path) -> CommandOutcome {
    let mut lines = Vec::new();

    lines.push("Clearing npm cache...".to_string());
    if let Err(error) = run_checked(&CommandSpec::new("npm").args(["cache", "clean", "--force"])) {
        lines.push(format!("  {error}"));
    }

    lines.push("Clearing Homebrew cache...".to_string());
    if let Err(error) = run_checked(&CommandSpec::new("brew").args(["cleanup", "-s"])) {
        lines.push(format!("  {error}"));
    }

    lines.push(format!("Removing {FINDER_METADATA} files..."));
    let removed = remove_named_files(root, FINDER_METADATA);
    lines.push(format!("  {removed} removed"));

    lines.push(String::new());
    lines.push("All caches cleared!".to_string());
    CommandOutcome::success(lines.join("\n"))
}

fn remove_named_files(root: &Path, file_name: &str) -> usize {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
        .filter(|entry| fs::remove_file(entry.path()).is_ok())
        .count()
}

fn outdated_all(root: &Path, manifest_file: &str) -> CommandOutcome {
    let catalog = match scan_projects(root, Some(manifest_file)) {
        Ok(catalog) => catalog,
        Err(error) => return CommandOutcome::error(format!("Error: {error}")),
    };
    if catalog.is_empty() {
        return CommandOutcome::info(format!("No projects with {manifest_file} found"));
    }

    let mut sections = Vec::new();
    for project in catalog.projects() {
        sections.push(format!("━━━ {} ━━━", project.display_name));
        let outdated = CommandSpec::new("npm").arg("outdated").in_dir(&project.path);
        // npm outdated exits 1 when it finds something.
        match run_captured(&outdated) {
            Ok(captured) if captured.text.trim().is_empty() => {
                sections.push("No outdated packages".to_string());
            }
            Ok(captured) => sections.push(captured.text.trim_end().to_string()),
            Err(error) => return failure(&error),
        }
    }
    CommandOutcome::success(sections.join("\n"))
}

fn fetch_registered_ports(api: &str) -> CommandOutcome {
    let url = format!("{}/ports", api.trim_end_matches('/'));
    let agent = make_agent(REGISTRY_TIMEOUT);
    let response = agent
        .get(&url)
        .header(
            "User-Agent",
            &format!("commandy/{}", env!("CARGO_PKG_VERSION")),
        )
        .call();

    let mut response = match response {
        Ok(response) => response,
        Err(error) => return CommandOutcome::error(format!("Error: {url}: {error}")),
    };
    match response.body_mut().read_json::<serde_json::Value>() {
        Ok(value) => CommandOutcome::success(
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
        ),
        Err(error) => CommandOutcome::error(format!("Error: invalid response from {url}: {error}")),
    }
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    config.into()
}

fn remove_dependency_cache(project: &Project, cache_dir: &str) -> CommandOutcome {
    let target = project.path.join(cache_dir);
    if !target.is_dir() {
        return CommandOutcome::info(format!(
            "No {cache_dir} in {}",
            project.display_name
        ));
    }

    let freed = directory_size(&target);
    match fs::remove_dir_all(&target) {
        Ok(()) => CommandOutcome::success(format!(
            "Removed {cache_dir} from {} ({} freed)",
            project.display_name,
            format_size(freed, DECIMAL)
        )),
        Err(error) => CommandOutcome::error(format!(
            "Error: failed to remove {}: {error}",
            target.display()
        )),
    }
}

fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobSlot, OutcomeKind};
    use tempfile::tempdir;

    #[test]
    fn removes_dependency_cache_and_reports_size() {
        let dir = tempdir().expect("tempdir");
        let project_dir = dir.path().join("alpha");
        fs::create_dir_all(project_dir.join("node_modules/left-pad")).expect("mkdir");
        fs::write(project_dir.join("node_modules/left-pad/index.js"), "x".repeat(2000))
            .expect("write");

        let job = Job::RemoveDependencyCache {
            project: Project::new("alpha", &project_dir),
            cache_dir: "node_modules".to_string(),
        };
        let report = run_job(&job);

        assert_eq!(report.slot, JobSlot::DependencyCache);
        assert_eq!(report.outcome.kind, OutcomeKind::Success);
        assert!(report.outcome.text.starts_with("Removed node_modules from alpha"));
        assert!(report.outcome.text.contains("2 kB"));
        assert!(!project_dir.join("node_modules").exists());
        assert!(project_dir.exists());
    }

    #[test]
    fn missing_dependency_cache_is_informational() {
        let dir = tempdir().expect("tempdir");
        let outcome = remove_dependency_cache(&Project::new("bare", dir.path()), "node_modules");
        assert_eq!(outcome.kind, OutcomeKind::Info);
    }

    #[test]
    fn removes_finder_metadata_recursively() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("a/b")).expect("mkdir");
        fs::write(dir.path().join(".DS_Store"), "").expect("write");
        fs::write(dir.path().join("a/b/.DS_Store"), "").expect("write");
        fs::write(dir.path().join("a/keep.txt"), "").expect("write");

        assert_eq!(remove_named_files(dir.path(), FINDER_METADATA), 2);
        assert!(dir.path().join("a/keep.txt").exists());
    }

    #[test]
    fn git_status_without_repositories_is_informational() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("plain")).expect("mkdir");
        assert_eq!(git_status_all(dir.path()).kind, OutcomeKind::Info);
    }

    #[cfg(unix)]
    #[test]
    fn capture_reports_output_or_quiet_message() {
        let noisy = CommandSpec::new("sh").args(["-c", "echo done"]);
        assert_eq!(capture(&noisy, "quiet").text, "done");

        let silent = CommandSpec::new("sh").args(["-c", "true"]);
        assert_eq!(capture(&silent, "quiet").text, "quiet");

        let failing = CommandSpec::new("sh").args(["-c", "echo nope >&2; exit 2"]);
        let outcome = capture(&failing, "quiet");
        assert!(outcome.is_error());
        assert!(outcome.text.ends_with("nope"));
    }

    #[cfg(unix)]
    fn stub_tool(dir: &Path, script: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("tool");
        fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write stub");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path.display().to_string()
    }

    #[cfg(unix)]
    #[test]
    fn brew_update_fails_when_a_step_exits_non_zero() {
        let dir = tempdir().expect("tempdir");
        let brew = stub_tool(
            dir.path(),
            r#"if [ "$1" = upgrade ]; then echo "Error: upgrade failed" >&2; exit 1; fi"#,
        );

        let outcome = brew_update(&brew);
        assert_eq!(outcome.kind, OutcomeKind::Error);
        assert!(outcome.text.contains("Error: upgrade failed"));
        assert!(outcome.text.contains("Cleaning up..."));
    }

    #[cfg(unix)]
    #[test]
    fn brew_update_succeeds_when_every_step_does() {
        let dir = tempdir().expect("tempdir");
        let brew = stub_tool(dir.path(), r#"echo "ran $1""#);

        let outcome = brew_update(&brew);
        assert_eq!(outcome.kind, OutcomeKind::Success);
        assert!(outcome.text.contains("ran cleanup"));
    }

    #[cfg(unix)]
    #[test]
    fn docker_cleanup_fails_when_a_prune_exits_non_zero() {
        let dir = tempdir().expect("tempdir");
        let docker = stub_tool(
            dir.path(),
            r#"if [ "$1" = volume ]; then echo "daemon busy" >&2; exit 1; fi"#,
        );

        let outcome = docker_cleanup(&docker);
        assert_eq!(outcome.kind, OutcomeKind::Error);
        assert!(outcome.text.contains("daemon busy"));
        assert!(outcome.text.contains("Removing unused networks..."));
    }

    #[test]
    fn git_pull_reports_error_when_a_repository_fails() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("broken/.git")).expect("mkdir");

        let outcome = git_pull_all(dir.path());
        assert_eq!(outcome.kind, OutcomeKind::Error);
        assert_eq!(outcome.text, "broken: failed");
    }
}
