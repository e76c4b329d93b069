mod app;
mod cli;
mod domain;
mod infra;
mod ui;

use crate::app::{AppCommand, AppEvent, AppModel, CatalogScope, Refresh};
use crate::cli::{CliInvocation, GlobalOptions};
use crate::domain::{Config, Handoff, JobReport, Project, SessionRequest, session_handoff};
use crate::infra::{
    create_project, init_logging, list_sessions, load_config, read_host_identity, run_foreground,
    scan_projects, session_exists, spawn_job,
};
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::collections::VecDeque;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    App(#[from] crate::app::AppError),

    #[error(transparent)]
    Cli(#[from] crate::cli::CliRunError),
}

/// Completions sent back from worker threads.
struct Workers {
    jobs: Sender<JobReport>,
    projects: Sender<Result<Project, String>>,
}

/// How the event loop ended.
enum Exit {
    Quit,
    Handoff(Handoff),
}

fn main() {
    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let args = std::env::args().collect::<Vec<_>>();
    let invocation = match crate::cli::parse_invocation(&args) {
        Ok(invocation) => invocation,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            print_help();
            std::process::exit(2);
        }
    };

    match invocation {
        CliInvocation::PrintHelp => {
            print_help();
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Tui(options) => {
            init_logging();
            let config = startup_config(&options)?;
            Ok(run_tui(config)?)
        }
        CliInvocation::Command { command, options } => {
            init_logging();
            let config = startup_config(&options)?;
            Ok(crate::cli::run(command, &config)?)
        }
    }
}

fn startup_config(options: &GlobalOptions) -> Result<Config, crate::app::AppError> {
    let host = read_host_identity();
    let config = load_config(host, options.projects_dir.as_deref())?;
    tracing::info!(
        event = "app.startup",
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host.name,
        projects_dir = %config.projects_dir.display(),
        inside_tmux = config.host.inside_tmux,
    );
    Ok(config)
}

fn print_help() {
    let text = format!(
        "{name} - terminal launcher for projects, tmux sessions and dev chores\n\nUSAGE:\n  {name} [--projects-dir DIR]              Start the menu\n  {name} projects [--manifest] [--projects-dir DIR]  List projects\n  {name} sessions                         List active tmux sessions\n  {name} --help | --version\n\nPROJECTS FLAGS:\n  --manifest     Only projects with a package.json (monorepo children included)\n\nOUTPUT:\n  projects: project_name<TAB>project_path\n  sessions: session_name\n\nKEYS:\n  arrows/hjkl move, Enter/Space select, 1-9 pick by number, Esc/q back, Ctrl+C quit\n\nENV:\n  COMMANDY_CONFIG        Config file (default: <config dir>/commandy/config.json)\n  COMMANDY_PROJECTS_DIR  Projects root (default: ~/Projects)\n  COMMANDY_LOG           Log filter (default: commandy=info)\n",
        name = env!("CARGO_PKG_NAME")
    );
    let mut out = io::stdout().lock();
    let _ = write!(out, "{text}");
}

fn run_tui(config: Config) -> Result<(), crate::app::AppError> {
    let mut model = AppModel::new(Arc::new(config));
    let mut terminal = setup_terminal()?;
    let result = run(&mut terminal, &mut model);
    restore_terminal(&mut terminal)?;

    match result? {
        Exit::Quit => {
            tracing::info!(event = "app.quit");
            Ok(())
        }
        Exit::Handoff(handoff) => {
            tracing::info!(event = "handoff.started", command = %handoff.describe());
            if let Err(error) = run_foreground(&handoff) {
                tracing::warn!(event = "handoff.failed", error = %error);
                let mut err = io::stderr().lock();
                let _ = writeln!(err, "{error}");
            }
            Ok(())
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, crate::app::AppError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
) -> Result<(), crate::app::AppError> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    model: &mut AppModel,
) -> Result<Exit, crate::app::AppError> {
    let (job_tx, job_rx) = channel::<JobReport>();
    let (project_tx, project_rx) = channel::<Result<Project, String>>();
    let workers = Workers {
        jobs: job_tx,
        projects: project_tx,
    };

    loop {
        if let Some(exit) = drain_completions(model, &job_rx, &project_rx, &workers) {
            return Ok(exit);
        }

        terminal.draw(|frame| ui::render(frame, model))?;

        if event::poll(Duration::from_millis(200))? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    let (next, command) = app::update(model.clone(), AppEvent::Key(key));
                    *model = next;
                    if let Some(exit) = execute_commands(model, command, &workers) {
                        return Ok(exit);
                    }
                }
                Event::Resize(_, _) => {
                    terminal.autoresize()?;
                }
                _ => {}
            }
        }
    }
}

fn drain_completions(
    model: &mut AppModel,
    job_rx: &Receiver<JobReport>,
    project_rx: &Receiver<Result<Project, String>>,
    workers: &Workers,
) -> Option<Exit> {
    let events = job_rx
        .try_iter()
        .map(AppEvent::JobFinished)
        .chain(project_rx.try_iter().map(AppEvent::ProjectCreated))
        .collect::<Vec<_>>();
    for event in events {
        let (next, command) = app::update(model.clone(), event);
        *model = next;
        if let Some(exit) = execute_commands(model, command, workers) {
            return Some(exit);
        }
    }
    None
}

/// Carry out a command and every follow-up it produces. Returns when the
/// loop should end.
fn execute_commands(
    model: &mut AppModel,
    command: AppCommand,
    workers: &Workers,
) -> Option<Exit> {
    let mut queue = VecDeque::from([command]);

    while let Some(command) = queue.pop_front() {
        let events = match command {
            AppCommand::None => Vec::new(),
            AppCommand::Quit => return Some(Exit::Quit),
            AppCommand::Handoff(handoff) => return Some(Exit::Handoff(handoff)),
            AppCommand::Refresh(refresh) => refresh_facts(&model.config, refresh),
            AppCommand::CreateProject { name } => {
                spawn_project_creation(
                    model.config.projects_dir.clone(),
                    name,
                    workers.projects.clone(),
                );
                Vec::new()
            }
            AppCommand::OpenSession {
                session,
                directory,
                agent,
            } => {
                let request = SessionRequest {
                    session: &session,
                    directory: directory.as_deref(),
                    initial_command: agent.as_deref(),
                    exists: session_exists(&session),
                    inside_tmux: model.config.host.inside_tmux,
                };
                return Some(Exit::Handoff(session_handoff(&request)));
            }
            AppCommand::Dispatch(job) => {
                tracing::info!(event = "job.dispatched", job = %job.label());
                spawn_job(job, workers.jobs.clone());
                Vec::new()
            }
        };

        for event in events {
            let (next, follow_up) = app::update(model.clone(), event);
            *model = next;
            queue.push_back(follow_up);
        }
    }
    None
}

fn spawn_project_creation(
    root: PathBuf,
    name: String,
    tx: Sender<Result<Project, String>>,
) {
    thread::spawn(move || {
        let result = create_project(&root, &name).map_err(|error| error.to_string());
        match &result {
            Ok(project) => tracing::info!(
                event = "project.created",
                name = %project.display_name,
                path = %project.path.display(),
            ),
            Err(error) => tracing::warn!(event = "project.create_failed", error = %error),
        }
        let _ = tx.send(result);
    });
}

fn refresh_facts(config: &Config, refresh: Refresh) -> Vec<AppEvent> {
    let mut events = Vec::new();
    if let Some(scope) = refresh.catalog {
        let manifest = match scope {
            CatalogScope::All => None,
            CatalogScope::ManifestOnly => Some(config.manifest_file.as_str()),
        };
        let result = scan_projects(&config.projects_dir, manifest).map_err(|error| error.to_string());
        events.push(AppEvent::ProjectsLoaded(result));
    }
    if refresh.sessions {
        events.push(AppEvent::SessionsLoaded(list_sessions()));
    }
    events
}
