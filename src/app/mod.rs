mod line_editor;

use crate::domain::{
    CommandOutcome, Config, CursorMove, Effect, Handoff, Job, JobReport, JobSlot, ListLayout,
    MenuAction, MenuFacts, MenuItem, MenuState, PendingAction, Project, ProjectCatalog,
    Transition, TransitionContext, menu_items, menu_title, navigate, transition,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub use line_editor::LineEditor;

pub const PROJECT_NAME_MAX_CHARS: usize = 64;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] crate::infra::ConfigError),
}

#[derive(Clone, Debug)]
pub struct AppModel {
    pub config: Arc<Config>,
    pub state: MenuState,
    pub cursor: usize,
    pub pending: Option<PendingAction>,
    pub catalog: ProjectCatalog,
    pub active_sessions: BTreeSet<String>,
    pub selected_project: Option<Project>,
    pub selected_session: Option<String>,
    pub name_input: LineEditor,
    pub outcome: Option<CommandOutcome>,
    /// Label of the job occupying each busy slot.
    pub jobs_in_flight: BTreeMap<JobSlot, String>,
}

impl AppModel {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            state: MenuState::Main,
            cursor: 0,
            pending: None,
            catalog: ProjectCatalog::default(),
            active_sessions: BTreeSet::new(),
            selected_project: None,
            selected_session: None,
            name_input: LineEditor::with_limit(PROJECT_NAME_MAX_CHARS),
            outcome: None,
            jobs_in_flight: BTreeMap::new(),
        }
    }

    pub fn items(&self) -> Vec<MenuItem> {
        let facts = MenuFacts {
            config: &self.config,
            active_sessions: &self.active_sessions,
            catalog: &self.catalog,
            selected_project: self.selected_project.as_ref(),
        };
        menu_items(self.state, &facts)
    }

    pub fn title(&self) -> String {
        menu_title(
            self.state,
            self.selected_project
                .as_ref()
                .map(|project| project.display_name.as_str()),
            self.selected_session.as_deref(),
        )
    }

    pub fn layout(&self) -> ListLayout {
        ListLayout::for_state(self.state)
    }

    fn clamp_cursor(&mut self) {
        let count = self.items().len();
        self.cursor = self.cursor.min(count.saturating_sub(1));
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CatalogScope {
    All,
    ManifestOnly,
}

/// External facts to re-query before the next render.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Refresh {
    pub catalog: Option<CatalogScope>,
    pub sessions: bool,
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    JobFinished(JobReport),
    ProjectsLoaded(Result<ProjectCatalog, String>),
    SessionsLoaded(BTreeSet<String>),
    ProjectCreated(Result<Project, String>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AppCommand {
    None,
    Quit,
    Refresh(Refresh),
    CreateProject {
        name: String,
    },
    OpenSession {
        session: String,
        directory: Option<PathBuf>,
        agent: Option<String>,
    },
    Handoff(Handoff),
    Dispatch(Job),
}

pub fn update(model: AppModel, event: AppEvent) -> (AppModel, AppCommand) {
    match event {
        AppEvent::Key(key) => update_on_key(model, key),
        AppEvent::JobFinished(report) => update_on_job_finished(model, report),
        AppEvent::ProjectsLoaded(result) => {
            let mut model = model;
            match result {
                Ok(catalog) => model.catalog = catalog,
                Err(message) => {
                    model.catalog = ProjectCatalog::default();
                    model.outcome = Some(CommandOutcome::error(message));
                }
            }
            model.clamp_cursor();
            (model, AppCommand::None)
        }
        AppEvent::SessionsLoaded(sessions) => {
            let mut model = model;
            model.active_sessions = sessions;
            model.clamp_cursor();
            (model, AppCommand::None)
        }
        AppEvent::ProjectCreated(result) => update_on_project_created(model, result),
    }
}

fn update_on_key(model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    model.outcome = None;

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        model.state = MenuState::Quit;
        return (model, AppCommand::Quit);
    }

    if model.state == MenuState::SetupProject {
        return update_on_name_input_key(model, key);
    }

    match key.code {
        KeyCode::Char('q') if model.state == MenuState::Main => {
            apply_action(model, MenuAction::Quit)
        }
        KeyCode::Char('q') | KeyCode::Esc => apply_action(model, MenuAction::Back),
        KeyCode::Up | KeyCode::Char('k') => move_cursor(model, CursorMove::Up),
        KeyCode::Down | KeyCode::Char('j') => move_cursor(model, CursorMove::Down),
        KeyCode::Left | KeyCode::Char('h') => move_cursor(model, CursorMove::Left),
        KeyCode::Right | KeyCode::Char('l') => move_cursor(model, CursorMove::Right),
        KeyCode::Enter | KeyCode::Char(' ') => {
            let cursor = model.cursor;
            select(model, cursor)
        }
        KeyCode::Char(digit @ '1'..='9') => {
            let index = (digit as usize) - ('1' as usize);
            if index >= model.items().len() {
                return (model, AppCommand::None);
            }
            model.cursor = index;
            select(model, index)
        }
        _ => (model, AppCommand::None),
    }
}

/// Keys while the project name field has focus: text goes to the field,
/// arrows and Enter drive the two items below it.
fn update_on_name_input_key(model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    match key.code {
        KeyCode::Esc => return apply_action(model, MenuAction::Back),
        KeyCode::Enter => {
            let cursor = model.cursor;
            return select(model, cursor);
        }
        KeyCode::Up => return move_cursor(model, CursorMove::Up),
        KeyCode::Down => return move_cursor(model, CursorMove::Down),
        KeyCode::Left => model.name_input.move_left(),
        KeyCode::Right => model.name_input.move_right(),
        KeyCode::Home => model.name_input.move_home(),
        KeyCode::End => model.name_input.move_end(),
        KeyCode::Backspace => model.name_input.backspace(),
        KeyCode::Delete => model.name_input.delete_forward(),
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            model.name_input.insert_char(ch);
        }
        _ => {}
    }
    (model, AppCommand::None)
}

fn move_cursor(model: AppModel, mv: CursorMove) -> (AppModel, AppCommand) {
    let mut model = model;
    let count = model.items().len();
    model.cursor = navigate(model.layout(), count, model.cursor, mv);
    (model, AppCommand::None)
}

fn select(model: AppModel, index: usize) -> (AppModel, AppCommand) {
    let Some(item) = model.items().into_iter().nth(index) else {
        return (model, AppCommand::None);
    };
    apply_action(model, item.action)
}

fn apply_action(model: AppModel, action: MenuAction) -> (AppModel, AppCommand) {
    let mut model = model;
    let ctx = TransitionContext {
        config: &model.config,
        catalog: &model.catalog,
        pending: model.pending,
        selected_project: model.selected_project.as_ref(),
        selected_session: model.selected_session.as_deref(),
        typed_name: model.name_input.value(),
    };
    let Some(Transition { next, effect }) = transition(model.state, &action, &ctx) else {
        tracing::warn!(
            event = "menu.unmapped_action",
            state = ?model.state,
            action = ?action
        );
        return (model, AppCommand::None);
    };

    let slot = match &effect {
        Effect::Job(job) => Some(job.slot()),
        Effect::CreateProject { .. } => Some(JobSlot::ProjectSetup),
        _ => None,
    };
    if let Some(slot) = slot {
        if let Some(running) = model.jobs_in_flight.get(&slot) {
            model.outcome = Some(CommandOutcome::info(format!(
                "Still running: {running}"
            )));
            return (model, AppCommand::None);
        }
    }

    let previous = model.state;
    enter_state(&mut model, next, action == MenuAction::Back);
    let refresh = refresh_on_entry(previous, next);

    let command = match effect {
        Effect::None => refresh,
        Effect::Quit => AppCommand::Quit,
        Effect::ResetInput => {
            model.name_input.clear();
            refresh
        }
        Effect::FocusProject(project) => {
            model.selected_project = Some(project);
            refresh
        }
        Effect::FocusSession(session) => {
            model.selected_session = Some(session);
            refresh
        }
        Effect::ChooseProject(pending) => {
            model.pending = Some(pending);
            refresh
        }
        Effect::OpenSession {
            session,
            directory,
            agent,
        } => AppCommand::OpenSession {
            session,
            directory,
            agent,
        },
        Effect::CreateProject { name } => {
            model
                .jobs_in_flight
                .insert(JobSlot::ProjectSetup, format!("create {name}"));
            AppCommand::CreateProject { name }
        }
        Effect::Handoff(handoff) => AppCommand::Handoff(handoff),
        Effect::Job(job) => {
            model.jobs_in_flight.insert(job.slot(), job.label());
            AppCommand::Dispatch(job)
        }
        Effect::Notify(outcome) => {
            model.outcome = Some(outcome);
            refresh
        }
    };
    (model, command)
}

fn enter_state(model: &mut AppModel, next: MenuState, going_back: bool) {
    if next != model.state {
        tracing::debug!(event = "menu.state_changed", from = ?model.state, to = ?next);
    }
    if next != model.state || going_back {
        model.cursor = 0;
    }
    if next != MenuState::SelectProject {
        model.pending = None;
    }
    model.state = next;
}

fn refresh_on_entry(previous: MenuState, next: MenuState) -> AppCommand {
    if previous == next {
        return AppCommand::None;
    }
    let refresh = match next {
        MenuState::BrowseProjects => Refresh {
            catalog: Some(CatalogScope::All),
            sessions: true,
        },
        MenuState::SelectProject => Refresh {
            catalog: Some(CatalogScope::ManifestOnly),
            sessions: false,
        },
        MenuState::ProjectActions | MenuState::Sessions => Refresh {
            catalog: None,
            sessions: true,
        },
        _ => return AppCommand::None,
    };
    AppCommand::Refresh(refresh)
}

fn update_on_job_finished(model: AppModel, report: JobReport) -> (AppModel, AppCommand) {
    let mut model = model;
    model.jobs_in_flight.remove(&report.slot);
    model.outcome = Some(report.outcome);
    if report.refresh_sessions {
        return (
            model,
            AppCommand::Refresh(Refresh {
                catalog: None,
                sessions: true,
            }),
        );
    }
    (model, AppCommand::None)
}

fn update_on_project_created(
    model: AppModel,
    result: Result<Project, String>,
) -> (AppModel, AppCommand) {
    let mut model = model;
    model.jobs_in_flight.remove(&JobSlot::ProjectSetup);
    match result {
        Ok(project) => {
            model.outcome = Some(CommandOutcome::success(format!(
                "Project '{}' created at {}",
                project.display_name,
                project.path.display()
            )));
            model.name_input.clear();
            // Leaving the form while the project was being created cancels
            // the confirmation menu, not the project.
            if model.state == MenuState::SetupProject {
                model.selected_project = Some(project);
                enter_state(&mut model, MenuState::SetupProjectConfirm, false);
            }
        }
        Err(message) => model.outcome = Some(CommandOutcome::error(message)),
    }
    (model, AppCommand::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommandSpec, HostIdentity, OutcomeKind, PackageVerb};

    fn model_on(host: &str) -> AppModel {
        let config = Config::with_host(HostIdentity {
            name: host.to_string(),
            home_dir: PathBuf::from("/home/dev"),
            inside_tmux: false,
        });
        AppModel::new(Arc::new(config))
    }

    fn press(model: AppModel, code: KeyCode) -> (AppModel, AppCommand) {
        update(model, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn labels(model: &AppModel) -> Vec<String> {
        model.items().into_iter().map(|item| item.label).collect()
    }

    #[test]
    fn ctrl_c_quits_from_any_state() {
        let mut model = model_on("dev.lan");
        model.state = MenuState::DevTools;
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let (_next, cmd) = update(model, AppEvent::Key(key));
        assert_eq!(cmd, AppCommand::Quit);
    }

    #[test]
    fn q_quits_at_root_and_goes_back_elsewhere() {
        let (next, cmd) = press(model_on("dev.lan"), KeyCode::Char('q'));
        assert_eq!(cmd, AppCommand::Quit);
        assert_eq!(next.state, MenuState::Quit);

        let mut model = model_on("dev.lan");
        model.state = MenuState::QuickAccess;
        model.cursor = 2;
        let (next, cmd) = press(model, KeyCode::Char('q'));
        assert_eq!(cmd, AppCommand::None);
        assert_eq!(next.state, MenuState::Tools);
        assert_eq!(next.cursor, 0);
    }

    #[test]
    fn esc_at_root_stays_at_root() {
        let (next, cmd) = press(model_on("dev.lan"), KeyCode::Esc);
        assert_eq!(cmd, AppCommand::None);
        assert_eq!(next.state, MenuState::Main);
    }

    #[test]
    fn remote_login_is_first_item_away_from_canonical_host() {
        let model = model_on("laptop");
        assert_eq!(labels(&model)[0], "Connect to dev");

        let (_next, cmd) = press(model, KeyCode::Enter);
        assert_eq!(
            cmd,
            AppCommand::Handoff(Handoff::single(CommandSpec::new("ssh").arg("dev")))
        );
    }

    #[test]
    fn browsing_to_a_live_project_offers_attach() {
        let model = model_on("dev.lan");
        let (model, cmd) = press(model, KeyCode::Enter);
        assert_eq!(model.state, MenuState::BrowseProjects);
        assert_eq!(
            cmd,
            AppCommand::Refresh(Refresh {
                catalog: Some(CatalogScope::All),
                sessions: true,
            })
        );

        let catalog = ProjectCatalog::new(vec![Project::new("site", "/p/site")]);
        let (model, _) = update(model, AppEvent::ProjectsLoaded(Ok(catalog)));
        let sessions = BTreeSet::from(["site".to_string()]);
        let (model, _) = update(model, AppEvent::SessionsLoaded(sessions));

        let items = model.items();
        assert_eq!(items[0].label, "site");
        assert!(items[0].live);

        let (model, _) = press(model, KeyCode::Enter);
        assert_eq!(model.state, MenuState::ProjectActions);
        assert_eq!(labels(&model)[0], "Attach");
    }

    #[test]
    fn removing_dependency_cache_returns_to_maintenance() {
        let mut model = model_on("dev.lan");
        model.state = MenuState::SystemMaintenance;
        let (model, _) = press(model, KeyCode::Char('4'));
        assert_eq!(model.state, MenuState::SelectProject);
        assert_eq!(model.pending, Some(PendingAction::RemoveDependencyCache));

        let catalog = ProjectCatalog::new(vec![Project::new("alpha", "/p/alpha")]);
        let (model, _) = update(model, AppEvent::ProjectsLoaded(Ok(catalog)));
        let (model, cmd) = press(model, KeyCode::Enter);

        assert_eq!(model.state, MenuState::SystemMaintenance);
        assert_eq!(model.pending, None);
        let AppCommand::Dispatch(job) = cmd else {
            panic!("expected a job dispatch");
        };
        assert_eq!(job.slot(), JobSlot::DependencyCache);

        let report = JobReport {
            slot: JobSlot::DependencyCache,
            outcome: CommandOutcome::success("Removed node_modules from alpha (0 B freed)"),
            refresh_sessions: false,
        };
        let (model, _) = update(model, AppEvent::JobFinished(report));
        assert_eq!(
            model.outcome.as_ref().map(|outcome| outcome.kind),
            Some(OutcomeKind::Success)
        );
        assert!(model.jobs_in_flight.is_empty());
    }

    #[test]
    fn empty_project_name_reports_error_in_place() {
        let model = model_on("dev.lan");
        let (model, _) = press(model, KeyCode::Char('2'));
        assert_eq!(model.state, MenuState::SetupProject);

        let (model, cmd) = press(model, KeyCode::Enter);
        assert_eq!(cmd, AppCommand::None);
        assert_eq!(model.state, MenuState::SetupProject);
        let outcome = model.outcome.expect("outcome");
        assert_eq!(outcome.kind, OutcomeKind::Error);
        assert_eq!(outcome.text, "Project name cannot be empty");
    }

    #[test]
    fn typed_project_name_requests_creation() {
        let mut model = model_on("dev.lan");
        model.state = MenuState::SetupProject;
        for ch in "qjk1".chars() {
            model = press(model, KeyCode::Char(ch)).0;
        }
        assert_eq!(model.name_input.value(), "qjk1");

        let (_model, cmd) = press(model, KeyCode::Enter);
        assert_eq!(
            cmd,
            AppCommand::CreateProject {
                name: "qjk1".to_string()
            }
        );
    }

    #[test]
    fn project_creation_is_not_requested_twice() {
        let mut model = model_on("dev.lan");
        model.state = MenuState::SetupProject;
        model = press(model, KeyCode::Char('x')).0;

        let (model, cmd) = press(model, KeyCode::Enter);
        assert!(matches!(cmd, AppCommand::CreateProject { .. }));
        assert!(model.jobs_in_flight.contains_key(&JobSlot::ProjectSetup));

        let (model, cmd) = press(model, KeyCode::Enter);
        assert_eq!(cmd, AppCommand::None);
        assert_eq!(
            model.outcome.as_ref().map(|outcome| outcome.kind),
            Some(OutcomeKind::Info)
        );

        let (model, _) = update(
            model,
            AppEvent::ProjectCreated(Err("Project already exists!".to_string())),
        );
        assert!(model.jobs_in_flight.is_empty());
        assert_eq!(model.state, MenuState::SetupProject);
    }

    #[test]
    fn created_project_after_leaving_form_only_reports() {
        let mut model = model_on("dev.lan");
        model.state = MenuState::Main;
        let project = Project::new("fresh", "/home/dev/Projects/fresh");
        let (model, _) = update(model, AppEvent::ProjectCreated(Ok(project)));

        assert_eq!(model.state, MenuState::Main);
        assert!(model.outcome.as_ref().is_some_and(|outcome| !outcome.is_error()));
    }

    #[test]
    fn created_project_moves_to_confirmation() {
        let mut model = model_on("dev.lan");
        model.state = MenuState::SetupProject;
        let project = Project::new("fresh", "/home/dev/Projects/fresh");
        let (model, _) = update(model, AppEvent::ProjectCreated(Ok(project)));

        assert_eq!(model.state, MenuState::SetupProjectConfirm);
        assert_eq!(
            model.outcome.as_ref().map(|outcome| outcome.text.as_str()),
            Some("Project 'fresh' created at /home/dev/Projects/fresh")
        );

        let (_model, cmd) = press(model, KeyCode::Enter);
        assert_eq!(
            cmd,
            AppCommand::OpenSession {
                session: "fresh".to_string(),
                directory: Some(PathBuf::from("/home/dev/Projects/fresh")),
                agent: None,
            }
        );
    }

    #[test]
    fn outcome_clears_on_next_key() {
        let mut model = model_on("dev.lan");
        model.state = MenuState::DevTools;
        let (model, _) = press(model, KeyCode::Enter);
        assert_eq!(
            model.outcome.as_ref().map(|outcome| outcome.kind),
            Some(OutcomeKind::Info)
        );

        let (model, _) = press(model, KeyCode::Down);
        assert!(model.outcome.is_none());
        assert_eq!(model.cursor, 1);
    }

    #[test]
    fn busy_slot_refuses_second_job() {
        let mut model = model_on("dev.lan");
        model.state = MenuState::DevTools;
        let (model, cmd) = press(model, KeyCode::Char('4'));
        assert!(matches!(cmd, AppCommand::Dispatch(Job::GitStatusAll { .. })));

        let (model, cmd) = press(model, KeyCode::Char('4'));
        assert_eq!(cmd, AppCommand::None);
        assert_eq!(
            model.outcome.as_ref().map(|outcome| outcome.kind),
            Some(OutcomeKind::Info)
        );
        assert_eq!(model.state, MenuState::DevTools);
    }

    #[test]
    fn package_verb_keeps_project_selection_open() {
        let mut model = model_on("dev.lan");
        model.state = MenuState::NpmUtilities;
        let (model, _) = press(model, KeyCode::Char('1'));
        assert_eq!(model.pending, Some(PendingAction::Package(PackageVerb::Audit)));

        let catalog = ProjectCatalog::new(vec![
            Project::new("api", "/p/api"),
            Project::new("web", "/p/web"),
        ]);
        let (model, _) = update(model, AppEvent::ProjectsLoaded(Ok(catalog)));
        let (model, _) = press(model, KeyCode::Right);
        assert_eq!(model.cursor, 2);
        let (model, _) = press(model, KeyCode::Left);
        let (model, _) = press(model, KeyCode::Down);
        assert_eq!(model.cursor, 1);
        let (model, cmd) = press(model, KeyCode::Enter);

        assert_eq!(model.state, MenuState::SelectProject);
        assert!(matches!(cmd, AppCommand::Dispatch(Job::Capture { .. })));

        let (model, _) = press(model, KeyCode::Esc);
        assert_eq!(model.state, MenuState::NpmUtilities);
        assert_eq!(model.pending, None);
    }

    #[test]
    fn digit_beyond_list_is_ignored() {
        let mut model = model_on("dev.lan");
        model.state = MenuState::SessionActions;
        let (model, cmd) = press(model, KeyCode::Char('9'));
        assert_eq!(cmd, AppCommand::None);
        assert_eq!(model.state, MenuState::SessionActions);
    }

    #[test]
    fn killing_a_session_refreshes_after_completion() {
        let mut model = model_on("dev.lan");
        model.state = MenuState::SessionActions;
        model.selected_session = Some("api".to_string());
        let (model, cmd) = press(model, KeyCode::Char('2'));
        assert_eq!(model.state, MenuState::Sessions);
        assert_eq!(
            cmd,
            AppCommand::Dispatch(Job::KillSession {
                session: "api".to_string()
            })
        );

        let report = JobReport {
            slot: JobSlot::SessionKill,
            outcome: CommandOutcome::success("Killed tmux session 'api'"),
            refresh_sessions: true,
        };
        let (_model, cmd) = update(model, AppEvent::JobFinished(report));
        assert_eq!(
            cmd,
            AppCommand::Refresh(Refresh {
                catalog: None,
                sessions: true,
            })
        );
    }

    #[test]
    fn failed_catalog_load_surfaces_error() {
        let mut model = model_on("dev.lan");
        model.state = MenuState::BrowseProjects;
        let (model, _) = update(
            model,
            AppEvent::ProjectsLoaded(Err("failed to read projects directory".to_string())),
        );
        assert!(model.outcome.as_ref().is_some_and(CommandOutcome::is_error));
        assert_eq!(labels(&model), vec!["Back to menu".to_string()]);
    }
}
