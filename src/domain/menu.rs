use crate::domain::{Config, Project, ProjectCatalog, sanitize_session_name};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MenuState {
    Main,
    BrowseProjects,
    ProjectActions,
    SetupProject,
    SetupProjectConfirm,
    Tools,
    QuickAccess,
    DevTools,
    PortAuthority,
    SystemMaintenance,
    NpmUtilities,
    Sessions,
    SessionActions,
    SelectProject,
    Quit,
}

impl MenuState {
    /// Every state a user can see. `Quit` is terminal and never rendered.
    pub const NAVIGABLE: [MenuState; 14] = [
        Self::Main,
        Self::BrowseProjects,
        Self::ProjectActions,
        Self::SetupProject,
        Self::SetupProjectConfirm,
        Self::Tools,
        Self::QuickAccess,
        Self::DevTools,
        Self::PortAuthority,
        Self::SystemMaintenance,
        Self::NpmUtilities,
        Self::Sessions,
        Self::SessionActions,
        Self::SelectProject,
    ];

    pub fn is_two_column(self) -> bool {
        matches!(self, Self::BrowseProjects | Self::SelectProject)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PackageVerb {
    Audit,
    Outdated,
    Update,
    Dedupe,
    Install,
}

impl PackageVerb {
    pub const ALL: [PackageVerb; 5] = [
        Self::Audit,
        Self::Outdated,
        Self::Update,
        Self::Dedupe,
        Self::Install,
    ];

    pub fn as_arg(self) -> &'static str {
        match self {
            Self::Audit => "audit",
            Self::Outdated => "outdated",
            Self::Update => "update",
            Self::Dedupe => "dedupe",
            Self::Install => "install",
        }
    }
}

/// Project-scoped operation waiting for the user to pick a project.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PendingAction {
    DatabaseStudio,
    RemoveDependencyCache,
    Package(PackageVerb),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActionFamily {
    Database,
    Cleanup,
    Package,
}

impl PendingAction {
    pub fn family(self) -> ActionFamily {
        match self {
            Self::DatabaseStudio => ActionFamily::Database,
            Self::RemoveDependencyCache => ActionFamily::Cleanup,
            Self::Package(_) => ActionFamily::Package,
        }
    }
}

impl ActionFamily {
    /// Menu that offered the action, and therefore where "back" leads.
    pub fn origin(self) -> MenuState {
        match self {
            Self::Database => MenuState::QuickAccess,
            Self::Cleanup => MenuState::SystemMaintenance,
            Self::Package => MenuState::NpmUtilities,
        }
    }
}

/// Parent of `state` in the navigation tree. `None` only for the root.
///
/// `SelectProject` without a pending action cannot happen through the menus;
/// it falls back to the root so "back" always terminates.
pub fn parent_state(state: MenuState, pending: Option<PendingAction>) -> Option<MenuState> {
    match state {
        MenuState::Main => None,
        MenuState::BrowseProjects
        | MenuState::SetupProject
        | MenuState::Tools
        | MenuState::Sessions
        | MenuState::Quit => Some(MenuState::Main),
        MenuState::ProjectActions => Some(MenuState::BrowseProjects),
        MenuState::SetupProjectConfirm => Some(MenuState::SetupProject),
        MenuState::SessionActions => Some(MenuState::Sessions),
        MenuState::QuickAccess
        | MenuState::DevTools
        | MenuState::PortAuthority
        | MenuState::SystemMaintenance
        | MenuState::NpmUtilities => Some(MenuState::Tools),
        MenuState::SelectProject => Some(
            pending
                .map(|action| action.family().origin())
                .unwrap_or(MenuState::Main),
        ),
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UrlTarget {
    GitHub,
    PortDashboard,
}

/// What an item does when chosen. Attached when the item list is built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MenuAction {
    Back,
    Quit,
    Open(MenuState),
    RemoteLogin { target: String },
    /// Index into the project catalog the list was built from.
    Project(usize),
    Session(String),
    OpenProjectSession,
    LaunchAgent,
    KillProjectSession,
    ConfirmSetup,
    StartWorking,
    LaunchAgentInNewProject,
    BackToMain,
    ResumeSession,
    KillSelectedSession,
    OpenUrl(UrlTarget),
    ChooseProjectFor(PendingAction),
    DatabaseShell,
    PortKillHint,
    CheckPorts,
    StartTunnel,
    GitStatusAll,
    GitPullAll,
    PortAuthorityHint,
    ViewRegisteredPorts,
    DockerCleanup,
    BrewUpdate,
    ClearPackageCache,
    ClearAllCaches,
    OutdatedAll,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MenuItem {
    pub label: String,
    pub action: MenuAction,
    /// A tmux session with this project's name is running.
    pub live: bool,
}

impl MenuItem {
    fn new(label: impl Into<String>, action: MenuAction) -> Self {
        Self {
            label: label.into(),
            action,
            live: false,
        }
    }
}

/// Everything outside the state itself that shapes a menu.
#[derive(Clone, Copy, Debug)]
pub struct MenuFacts<'a> {
    pub config: &'a Config,
    pub active_sessions: &'a BTreeSet<String>,
    pub catalog: &'a ProjectCatalog,
    pub selected_project: Option<&'a Project>,
}

pub fn menu_items(state: MenuState, facts: &MenuFacts<'_>) -> Vec<MenuItem> {
    match state {
        MenuState::Main => main_items(facts.config),
        MenuState::BrowseProjects => {
            let mut items = project_items(facts.catalog, Some(facts.active_sessions));
            items.push(MenuItem::new("Back to menu", MenuAction::Back));
            items
        }
        MenuState::SelectProject => {
            let mut items = project_items(facts.catalog, None);
            items.push(MenuItem::new("Back", MenuAction::Back));
            items
        }
        MenuState::ProjectActions => project_action_items(facts),
        MenuState::SetupProject => vec![
            MenuItem::new("Create project", MenuAction::ConfirmSetup),
            MenuItem::new("Back to menu", MenuAction::Back),
        ],
        MenuState::SetupProjectConfirm => vec![
            MenuItem::new("Start working here", MenuAction::StartWorking),
            MenuItem::new(
                format!("Launch {}", facts.config.agent_command),
                MenuAction::LaunchAgentInNewProject,
            ),
            MenuItem::new("Back to menu", MenuAction::BackToMain),
        ],
        MenuState::Sessions => {
            let mut items = facts
                .active_sessions
                .iter()
                .map(|name| MenuItem::new(name.clone(), MenuAction::Session(name.clone())))
                .collect::<Vec<_>>();
            items.push(MenuItem::new("Back", MenuAction::Back));
            items
        }
        MenuState::SessionActions => vec![
            MenuItem::new("Resume", MenuAction::ResumeSession),
            MenuItem::new("Kill session", MenuAction::KillSelectedSession),
            MenuItem::new("Back", MenuAction::Back),
        ],
        MenuState::Tools => vec![
            MenuItem::new("Quick Access", MenuAction::Open(MenuState::QuickAccess)),
            MenuItem::new("Dev Tools", MenuAction::Open(MenuState::DevTools)),
            MenuItem::new("Port Authority", MenuAction::Open(MenuState::PortAuthority)),
            MenuItem::new(
                "System Maintenance",
                MenuAction::Open(MenuState::SystemMaintenance),
            ),
            MenuItem::new("NPM Utilities", MenuAction::Open(MenuState::NpmUtilities)),
            MenuItem::new("Back", MenuAction::Back),
        ],
        MenuState::QuickAccess => quick_access_items(facts.config),
        MenuState::DevTools => vec![
            MenuItem::new("Kill process on port", MenuAction::PortKillHint),
            MenuItem::new("Check port usage", MenuAction::CheckPorts),
            MenuItem::new("Start ngrok", MenuAction::StartTunnel),
            MenuItem::new("Git status (all projects)", MenuAction::GitStatusAll),
            MenuItem::new("Git pull (all projects)", MenuAction::GitPullAll),
            MenuItem::new("Back", MenuAction::Back),
        ],
        MenuState::PortAuthority => vec![
            MenuItem::new("Check project ports", MenuAction::PortAuthorityHint),
            MenuItem::new("Setup ports for project", MenuAction::PortAuthorityHint),
            MenuItem::new("Update project port", MenuAction::PortAuthorityHint),
            MenuItem::new("View all registered ports", MenuAction::ViewRegisteredPorts),
            MenuItem::new(
                "Open dashboard",
                MenuAction::OpenUrl(UrlTarget::PortDashboard),
            ),
            MenuItem::new("Back", MenuAction::Back),
        ],
        MenuState::SystemMaintenance => vec![
            MenuItem::new("Docker cleanup", MenuAction::DockerCleanup),
            MenuItem::new("Homebrew update", MenuAction::BrewUpdate),
            MenuItem::new("Clear npm cache", MenuAction::ClearPackageCache),
            MenuItem::new(
                format!("Remove {} (select project)", facts.config.dependency_cache_dir),
                MenuAction::ChooseProjectFor(PendingAction::RemoveDependencyCache),
            ),
            MenuItem::new("Clear all caches", MenuAction::ClearAllCaches),
            MenuItem::new("Back", MenuAction::Back),
        ],
        MenuState::NpmUtilities => {
            let mut items = PackageVerb::ALL
                .iter()
                .map(|verb| {
                    MenuItem::new(
                        format!("npm {}", verb.as_arg()),
                        MenuAction::ChooseProjectFor(PendingAction::Package(*verb)),
                    )
                })
                .collect::<Vec<_>>();
            items.push(MenuItem::new("Check outdated (all)", MenuAction::OutdatedAll));
            items.push(MenuItem::new("Back", MenuAction::Back));
            items
        }
        MenuState::Quit => Vec::new(),
    }
}

fn main_items(config: &Config) -> Vec<MenuItem> {
    let on_canonical = config.on_canonical_host();
    let mut items = Vec::new();
    if !on_canonical {
        items.push(MenuItem::new(
            "Connect to dev",
            MenuAction::RemoteLogin {
                target: config.remote_ssh_target.clone(),
            },
        ));
    }
    items.push(MenuItem::new(
        "Browse Projects",
        MenuAction::Open(MenuState::BrowseProjects),
    ));
    items.push(MenuItem::new(
        "Setup New Project",
        MenuAction::Open(MenuState::SetupProject),
    ));
    items.push(MenuItem::new("Tools", MenuAction::Open(MenuState::Tools)));
    if on_canonical {
        items.push(MenuItem::new("Sessions", MenuAction::Open(MenuState::Sessions)));
    }
    items.push(MenuItem::new("Skip", MenuAction::Quit));
    items
}

fn project_items(
    catalog: &ProjectCatalog,
    active_sessions: Option<&BTreeSet<String>>,
) -> Vec<MenuItem> {
    catalog
        .projects()
        .iter()
        .enumerate()
        .map(|(index, project)| {
            let mut item = MenuItem::new(project.display_name.clone(), MenuAction::Project(index));
            item.live = active_sessions.is_some_and(|sessions| {
                sessions.contains(&sanitize_session_name(&project.display_name))
            });
            item
        })
        .collect()
}

fn project_action_items(facts: &MenuFacts<'_>) -> Vec<MenuItem> {
    let has_session = facts.selected_project.is_some_and(|project| {
        facts
            .active_sessions
            .contains(&sanitize_session_name(&project.display_name))
    });

    let mut items = Vec::new();
    let label = if has_session { "Attach" } else { "Open" };
    items.push(MenuItem::new(label, MenuAction::OpenProjectSession));
    items.push(MenuItem::new(
        capitalize(&facts.config.agent_command),
        MenuAction::LaunchAgent,
    ));
    if has_session {
        items.push(MenuItem::new("Kill session", MenuAction::KillProjectSession));
    }
    items.push(MenuItem::new("Back", MenuAction::Back));
    items
}

fn quick_access_items(config: &Config) -> Vec<MenuItem> {
    let (label, target) = if config.on_laptop_host() {
        ("SSH to MacBookPro", config.laptop_ssh_target.clone())
    } else {
        ("SSH to dev", config.remote_ssh_target.clone())
    };
    vec![
        MenuItem::new(label, MenuAction::RemoteLogin { target }),
        MenuItem::new("Open GitHub", MenuAction::OpenUrl(UrlTarget::GitHub)),
        MenuItem::new(
            "Prisma Studio (select project)",
            MenuAction::ChooseProjectFor(PendingAction::DatabaseStudio),
        ),
        MenuItem::new("PostgreSQL shell", MenuAction::DatabaseShell),
        MenuItem::new("Back", MenuAction::Back),
    ]
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn menu_title(
    state: MenuState,
    selected_project: Option<&str>,
    selected_session: Option<&str>,
) -> String {
    match state {
        MenuState::Main => "What would you like to do?".to_string(),
        MenuState::BrowseProjects | MenuState::SelectProject => "Select a project".to_string(),
        MenuState::ProjectActions => format!("Project: {}", selected_project.unwrap_or("")),
        MenuState::SetupProject => "Setup New Project".to_string(),
        MenuState::SetupProjectConfirm => {
            format!("Project '{}' created!", selected_project.unwrap_or(""))
        }
        MenuState::Tools => "Tools".to_string(),
        MenuState::QuickAccess => "Quick Access".to_string(),
        MenuState::DevTools => "Dev Tools".to_string(),
        MenuState::PortAuthority => "Port Authority".to_string(),
        MenuState::SystemMaintenance => "System Maintenance".to_string(),
        MenuState::NpmUtilities => "NPM Utilities".to_string(),
        MenuState::Sessions => "Tmux Sessions".to_string(),
        MenuState::SessionActions => format!("Session: {}", selected_session.unwrap_or("")),
        MenuState::Quit => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HostIdentity;
    use std::path::PathBuf;

    fn config_on(host: &str) -> Config {
        Config::with_host(HostIdentity {
            name: host.to_string(),
            home_dir: PathBuf::from("/home/dev"),
            inside_tmux: false,
        })
    }

    fn labels(items: &[MenuItem]) -> Vec<&str> {
        items.iter().map(|item| item.label.as_str()).collect()
    }

    #[test]
    fn root_offers_remote_login_away_from_canonical_host() {
        let config = config_on("laptop");
        let sessions = BTreeSet::new();
        let catalog = ProjectCatalog::default();
        let facts = MenuFacts {
            config: &config,
            active_sessions: &sessions,
            catalog: &catalog,
            selected_project: None,
        };

        let items = menu_items(MenuState::Main, &facts);
        assert_eq!(
            labels(&items),
            vec!["Connect to dev", "Browse Projects", "Setup New Project", "Tools", "Skip"]
        );
    }

    #[test]
    fn root_offers_sessions_on_canonical_host() {
        let config = config_on("dev.lan");
        let sessions = BTreeSet::new();
        let catalog = ProjectCatalog::default();
        let facts = MenuFacts {
            config: &config,
            active_sessions: &sessions,
            catalog: &catalog,
            selected_project: None,
        };

        let items = menu_items(MenuState::Main, &facts);
        assert_eq!(
            labels(&items),
            vec!["Browse Projects", "Setup New Project", "Tools", "Sessions", "Skip"]
        );
    }

    #[test]
    fn empty_catalog_lists_only_back() {
        let config = config_on("dev.lan");
        let sessions = BTreeSet::new();
        let catalog = ProjectCatalog::default();
        let facts = MenuFacts {
            config: &config,
            active_sessions: &sessions,
            catalog: &catalog,
            selected_project: None,
        };

        assert_eq!(
            labels(&menu_items(MenuState::BrowseProjects, &facts)),
            vec!["Back to menu"]
        );
        assert_eq!(labels(&menu_items(MenuState::SelectProject, &facts)), vec!["Back"]);
    }

    #[test]
    fn browse_marks_projects_with_live_sessions() {
        let config = config_on("dev.lan");
        let sessions = BTreeSet::from(["my-app".to_string()]);
        let catalog = ProjectCatalog::new(vec![
            Project::new("my.app", "/p/my.app"),
            Project::new("other", "/p/other"),
        ]);
        let facts = MenuFacts {
            config: &config,
            active_sessions: &sessions,
            catalog: &catalog,
            selected_project: None,
        };

        let items = menu_items(MenuState::BrowseProjects, &facts);
        assert!(items[0].live);
        assert!(!items[1].live);
        assert_eq!(items[1].action, MenuAction::Project(1));
    }

    #[test]
    fn project_actions_switch_between_open_and_attach() {
        let config = config_on("dev.lan");
        let project = Project::new("site", "/p/site");
        let catalog = ProjectCatalog::new(vec![project.clone()]);

        let none = BTreeSet::new();
        let facts = MenuFacts {
            config: &config,
            active_sessions: &none,
            catalog: &catalog,
            selected_project: Some(&project),
        };
        assert_eq!(
            labels(&menu_items(MenuState::ProjectActions, &facts)),
            vec!["Open", "Claude-logged", "Back"]
        );

        let live = BTreeSet::from(["site".to_string()]);
        let facts = MenuFacts {
            active_sessions: &live,
            ..facts
        };
        assert_eq!(
            labels(&menu_items(MenuState::ProjectActions, &facts)),
            vec!["Attach", "Claude-logged", "Kill session", "Back"]
        );
    }

    #[test]
    fn quick_access_targets_laptop_from_laptop_host() {
        let config = config_on("mac");
        let sessions = BTreeSet::new();
        let catalog = ProjectCatalog::default();
        let facts = MenuFacts {
            config: &config,
            active_sessions: &sessions,
            catalog: &catalog,
            selected_project: None,
        };

        let items = menu_items(MenuState::QuickAccess, &facts);
        assert_eq!(items[0].label, "SSH to MacBookPro");
        assert_eq!(
            items[0].action,
            MenuAction::RemoteLogin {
                target: "MacBookPro.local".to_string()
            }
        );
    }

    #[test]
    fn every_navigable_state_has_items_and_ends_reachable() {
        let config = config_on("dev.lan");
        let sessions = BTreeSet::new();
        let catalog = ProjectCatalog::default();
        let facts = MenuFacts {
            config: &config,
            active_sessions: &sessions,
            catalog: &catalog,
            selected_project: None,
        };

        for state in MenuState::NAVIGABLE {
            let items = menu_items(state, &facts);
            assert!(!items.is_empty(), "{state:?} has no items");
            assert_eq!(menu_items(state, &facts), items, "{state:?} is not stable");
        }
    }

    #[test]
    fn back_reaches_root_from_every_state() {
        let pendings = [
            None,
            Some(PendingAction::DatabaseStudio),
            Some(PendingAction::RemoveDependencyCache),
            Some(PendingAction::Package(PackageVerb::Install)),
        ];
        for pending in pendings {
            for state in MenuState::NAVIGABLE {
                let mut current = state;
                let mut steps = 0;
                while let Some(parent) = parent_state(current, pending) {
                    current = parent;
                    steps += 1;
                    assert!(steps <= 4, "{state:?} does not reach root");
                }
                assert_eq!(current, MenuState::Main);
            }
        }
    }

    #[test]
    fn select_project_parent_follows_action_family() {
        assert_eq!(
            parent_state(MenuState::SelectProject, Some(PendingAction::DatabaseStudio)),
            Some(MenuState::QuickAccess)
        );
        assert_eq!(
            parent_state(
                MenuState::SelectProject,
                Some(PendingAction::RemoveDependencyCache)
            ),
            Some(MenuState::SystemMaintenance)
        );
        assert_eq!(
            parent_state(
                MenuState::SelectProject,
                Some(PendingAction::Package(PackageVerb::Audit))
            ),
            Some(MenuState::NpmUtilities)
        );
    }
}
