use std::path::PathBuf;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Project {
    /// Directory name, or `parent/child` for a monorepo subproject.
    pub display_name: String,
    pub path: PathBuf,
}

impl Project {
    pub fn new(display_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            display_name: display_name.into(),
            path: path.into(),
        }
    }
}

/// Ordered project listing produced by one catalog scan.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProjectCatalog {
    projects: Vec<Project>,
}

impl ProjectCatalog {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn get(&self, index: usize) -> Option<&Project> {
        self.projects.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
