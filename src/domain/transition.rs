use crate::domain::{
    CommandOutcome, CommandSpec, Config, Handoff, Job, JobSlot, MenuAction, MenuState,
    PendingAction, Project, ProjectCatalog, UrlTarget, parent_state, sanitize_session_name,
};
use std::path::PathBuf;

/// Model facts a selection may depend on.
#[derive(Clone, Copy, Debug)]
pub struct TransitionContext<'a> {
    pub config: &'a Config,
    pub catalog: &'a ProjectCatalog,
    pub pending: Option<PendingAction>,
    pub selected_project: Option<&'a Project>,
    pub selected_session: Option<&'a str>,
    pub typed_name: &'a str,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    None,
    Quit,
    ResetInput,
    FocusProject(Project),
    FocusSession(String),
    ChooseProject(PendingAction),
    /// Attach to or create a session. Existence is checked when it runs.
    OpenSession {
        session: String,
        directory: Option<PathBuf>,
        agent: Option<String>,
    },
    CreateProject {
        name: String,
    },
    Handoff(Handoff),
    Job(Job),
    Notify(CommandOutcome),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub next: MenuState,
    pub effect: Effect,
}

impl Transition {
    fn to(next: MenuState) -> Self {
        Self {
            next,
            effect: Effect::None,
        }
    }

    fn stay(state: MenuState, effect: Effect) -> Self {
        Self {
            next: state,
            effect,
        }
    }
}

pub const PORT_KILL_HINT: &str = "Use: lsof -ti:PORT | xargs kill -9";
pub const PORT_AUTHORITY_HINT: &str = "Feature available via Port Authority dashboard";

/// Resolve a selection. `None` means the action is not offered in `state`.
pub fn transition(
    state: MenuState,
    action: &MenuAction,
    ctx: &TransitionContext<'_>,
) -> Option<Transition> {
    let config = ctx.config;
    let transition = match action {
        MenuAction::Back => back(state, ctx.pending),
        MenuAction::Quit if state == MenuState::Main => Transition {
            next: MenuState::Quit,
            effect: Effect::Quit,
        },
        MenuAction::Quit => return None,
        MenuAction::Open(MenuState::SetupProject) => Transition {
            next: MenuState::SetupProject,
            effect: Effect::ResetInput,
        },
        MenuAction::Open(next) => Transition::to(*next),
        MenuAction::RemoteLogin { target } => Transition::stay(
            state,
            Effect::Handoff(Handoff::single(CommandSpec::new("ssh").arg(target.clone()))),
        ),
        MenuAction::Project(index) => return select_project(state, *index, ctx),
        MenuAction::Session(name) if state == MenuState::Sessions => Transition {
            next: MenuState::SessionActions,
            effect: Effect::FocusSession(name.clone()),
        },
        MenuAction::OpenProjectSession | MenuAction::LaunchAgent
            if state == MenuState::ProjectActions =>
        {
            let project = ctx.selected_project?;
            let agent = matches!(action, MenuAction::LaunchAgent)
                .then(|| config.agent_command.clone());
            Transition::stay(state, open_session(project, agent))
        }
        MenuAction::KillProjectSession if state == MenuState::ProjectActions => {
            let project = ctx.selected_project?;
            Transition {
                next: MenuState::BrowseProjects,
                effect: Effect::Job(Job::KillSession {
                    session: sanitize_session_name(&project.display_name),
                }),
            }
        }
        MenuAction::ConfirmSetup if state == MenuState::SetupProject => {
            Transition::stay(state, validate_project_name(ctx.typed_name))
        }
        MenuAction::StartWorking | MenuAction::LaunchAgentInNewProject
            if state == MenuState::SetupProjectConfirm =>
        {
            let project = ctx.selected_project?;
            let agent = matches!(action, MenuAction::LaunchAgentInNewProject)
                .then(|| config.agent_command.clone());
            Transition::stay(state, open_session(project, agent))
        }
        MenuAction::BackToMain => Transition::to(MenuState::Main),
        MenuAction::ResumeSession if state == MenuState::SessionActions => Transition::stay(
            state,
            Effect::OpenSession {
                session: ctx.selected_session?.to_string(),
                directory: None,
                agent: None,
            },
        ),
        MenuAction::KillSelectedSession if state == MenuState::SessionActions => Transition {
            next: MenuState::Sessions,
            effect: Effect::Job(Job::KillSession {
                session: ctx.selected_session?.to_string(),
            }),
        },
        MenuAction::OpenUrl(target) => {
            let (url, confirmation) = match target {
                UrlTarget::GitHub => (config.github_url.clone(), "Opened GitHub in browser"),
                UrlTarget::PortDashboard => (
                    config.port_authority_dashboard.clone(),
                    "Opened Port Authority dashboard",
                ),
            };
            Transition::stay(
                state,
                Effect::Job(Job::OpenUrl {
                    opener: config.url_opener.clone(),
                    url,
                    confirmation: confirmation.to_string(),
                }),
            )
        }
        MenuAction::ChooseProjectFor(pending) => Transition {
            next: MenuState::SelectProject,
            effect: Effect::ChooseProject(*pending),
        },
        MenuAction::DatabaseShell => Transition::stay(
            state,
            Effect::Handoff(Handoff::single(
                CommandSpec::new("psql").arg(config.database_url.clone()),
            )),
        ),
        MenuAction::PortKillHint => {
            Transition::stay(state, Effect::Notify(CommandOutcome::info(PORT_KILL_HINT)))
        }
        MenuAction::PortAuthorityHint => Transition::stay(
            state,
            Effect::Notify(CommandOutcome::info(PORT_AUTHORITY_HINT)),
        ),
        MenuAction::CheckPorts => job(
            state,
            Job::CheckPorts {
                ports: config.watched_ports.clone(),
            },
        ),
        MenuAction::StartTunnel => Transition::stay(
            state,
            Effect::Handoff(Handoff::single(
                CommandSpec::new("ngrok")
                    .arg("http")
                    .arg(config.tunnel_port.to_string()),
            )),
        ),
        MenuAction::GitStatusAll => job(
            state,
            Job::GitStatusAll {
                root: config.projects_dir.clone(),
            },
        ),
        MenuAction::GitPullAll => job(
            state,
            Job::GitPullAll {
                root: config.projects_dir.clone(),
            },
        ),
        MenuAction::ViewRegisteredPorts => job(
            state,
            Job::FetchRegisteredPorts {
                api: config.port_authority_api.clone(),
            },
        ),
        MenuAction::DockerCleanup => job(state, Job::DockerCleanup),
        MenuAction::BrewUpdate => job(state, Job::BrewUpdate),
        MenuAction::ClearPackageCache => job(
            state,
            Job::Capture {
                slot: JobSlot::PackageCache,
                label: "npm cache clean".to_string(),
                command: CommandSpec::new("npm").args(["cache", "clean", "--force"]),
                quiet_success: "npm cache cleared".to_string(),
            },
        ),
        MenuAction::ClearAllCaches => job(
            state,
            Job::ClearAllCaches {
                root: config.projects_dir.clone(),
            },
        ),
        MenuAction::OutdatedAll => job(
            state,
            Job::OutdatedAll {
                root: config.projects_dir.clone(),
                manifest_file: config.manifest_file.clone(),
            },
        ),
        _ => return None,
    };
    Some(transition)
}

fn back(state: MenuState, pending: Option<PendingAction>) -> Transition {
    match parent_state(state, pending) {
        Some(MenuState::Main) if state == MenuState::SetupProject => Transition {
            next: MenuState::Main,
            effect: Effect::ResetInput,
        },
        Some(parent) => Transition::to(parent),
        None => Transition::to(state),
    }
}

fn job(state: MenuState, job: Job) -> Transition {
    Transition::stay(state, Effect::Job(job))
}

fn open_session(project: &Project, agent: Option<String>) -> Effect {
    Effect::OpenSession {
        session: sanitize_session_name(&project.display_name),
        directory: Some(project.path.clone()),
        agent,
    }
}

fn select_project(
    state: MenuState,
    index: usize,
    ctx: &TransitionContext<'_>,
) -> Option<Transition> {
    let project = ctx.catalog.get(index)?;
    match state {
        MenuState::BrowseProjects => Some(Transition {
            next: MenuState::ProjectActions,
            effect: Effect::FocusProject(project.clone()),
        }),
        MenuState::SelectProject => match ctx.pending? {
            PendingAction::DatabaseStudio => Some(Transition::stay(
                state,
                Effect::Handoff(Handoff::single(
                    CommandSpec::new("npx")
                        .args(["prisma", "studio"])
                        .in_dir(&project.path),
                )),
            )),
            PendingAction::RemoveDependencyCache => Some(Transition {
                next: MenuState::SystemMaintenance,
                effect: Effect::Job(Job::RemoveDependencyCache {
                    project: project.clone(),
                    cache_dir: ctx.config.dependency_cache_dir.clone(),
                }),
            }),
            PendingAction::Package(verb) => Some(job(
                state,
                Job::Capture {
                    slot: JobSlot::PackageCommand,
                    label: format!("npm {} ({})", verb.as_arg(), project.display_name),
                    command: CommandSpec::new("npm")
                        .arg(verb.as_arg())
                        .in_dir(&project.path),
                    quiet_success: format!(
                        "npm {} completed for {}",
                        verb.as_arg(),
                        project.display_name
                    ),
                },
            )),
        },
        _ => None,
    }
}

fn validate_project_name(typed: &str) -> Effect {
    let name = typed.trim();
    if name.is_empty() {
        return Effect::Notify(CommandOutcome::error("Project name cannot be empty"));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Effect::Notify(CommandOutcome::error(
            "Project name cannot contain path separators",
        ));
    }
    Effect::CreateProject {
        name: name.to_string(),
    }
}
