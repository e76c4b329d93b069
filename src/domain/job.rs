use crate::domain::{CommandOutcome, CommandSpec, Project};
use std::path::PathBuf;

/// Background work is serialized per slot: a slot holds at most one job.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum JobSlot {
    PackageCommand,
    PackageCache,
    DependencyCache,
    OutdatedAll,
    SessionKill,
    Browser,
    PortScan,
    PortRegistry,
    GitStatus,
    GitPull,
    DockerCleanup,
    BrewUpdate,
    ClearCaches,
    /// Directory creation and `git init` for a new project.
    ProjectSetup,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Job {
    /// One command; its combined output becomes the outcome text.
    Capture {
        slot: JobSlot,
        label: String,
        command: CommandSpec,
        /// Shown instead of the output when the command prints nothing.
        quiet_success: String,
    },
    KillSession {
        session: String,
    },
    OpenUrl {
        opener: String,
        url: String,
        confirmation: String,
    },
    CheckPorts {
        ports: Vec<u16>,
    },
    GitStatusAll {
        root: PathBuf,
    },
    GitPullAll {
        root: PathBuf,
    },
    DockerCleanup,
    BrewUpdate,
    ClearAllCaches {
        root: PathBuf,
    },
    OutdatedAll {
        root: PathBuf,
        manifest_file: String,
    },
    FetchRegisteredPorts {
        api: String,
    },
    RemoveDependencyCache {
        project: Project,
        cache_dir: String,
    },
}

impl Job {
    pub fn slot(&self) -> JobSlot {
        match self {
            Self::Capture { slot, .. } => *slot,
            Self::KillSession { .. } => JobSlot::SessionKill,
            Self::OpenUrl { .. } => JobSlot::Browser,
            Self::CheckPorts { .. } => JobSlot::PortScan,
            Self::GitStatusAll { .. } => JobSlot::GitStatus,
            Self::GitPullAll { .. } => JobSlot::GitPull,
            Self::DockerCleanup => JobSlot::DockerCleanup,
            Self::BrewUpdate => JobSlot::BrewUpdate,
            Self::ClearAllCaches { .. } => JobSlot::ClearCaches,
            Self::OutdatedAll { .. } => JobSlot::OutdatedAll,
            Self::FetchRegisteredPorts { .. } => JobSlot::PortRegistry,
            Self::RemoveDependencyCache { .. } => JobSlot::DependencyCache,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Capture { label, .. } => label.clone(),
            Self::KillSession { session } => format!("kill session {session}"),
            Self::OpenUrl { url, .. } => format!("open {url}"),
            Self::CheckPorts { .. } => "port check".to_string(),
            Self::GitStatusAll { .. } => "git status".to_string(),
            Self::GitPullAll { .. } => "git pull".to_string(),
            Self::DockerCleanup => "docker cleanup".to_string(),
            Self::BrewUpdate => "brew update".to_string(),
            Self::ClearAllCaches { .. } => "cache cleanup".to_string(),
            Self::OutdatedAll { .. } => "npm outdated (all)".to_string(),
            Self::FetchRegisteredPorts { .. } => "port registry".to_string(),
            Self::RemoveDependencyCache { project, cache_dir } => {
                format!("remove {cache_dir} ({})", project.display_name)
            }
        }
    }

    /// Jobs that change which tmux sessions exist.
    pub fn refreshes_sessions(&self) -> bool {
        matches!(self, Self::KillSession { .. })
    }
}

/// Completion of a background job, delivered back into the event loop.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JobReport {
    pub slot: JobSlot,
    pub outcome: CommandOutcome,
    pub refresh_sessions: bool,
}
