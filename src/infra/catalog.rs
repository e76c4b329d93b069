use crate::domain::{Project, ProjectCatalog};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read projects directory {path}: {message}")]
    ReadRoot { path: String, message: String },
}

#[derive(Debug, Error)]
pub enum CreateProjectError {
    #[error("Project already exists!")]
    AlreadyExists,

    #[error("Error creating directory: {0}")]
    CreateDir(io::Error),

    #[error("Error initializing git: {0}")]
    GitInit(String),
}

/// Immediate subdirectories of `dir`, sorted by name. Symlinks are not
/// followed.
pub fn child_dirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, walkdir::Error> {
    let mut out = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        out.push((name, entry.into_path()));
    }
    Ok(out)
}

/// Enumerate projects under `root`.
///
/// Without a manifest filter every immediate subdirectory is a project. With
/// one, a directory qualifies when it holds the manifest, and each of its own
/// subdirectories holding the manifest is listed as `parent/child`.
pub fn scan_projects(root: &Path, manifest: Option<&str>) -> Result<ProjectCatalog, CatalogError> {
    let entries = child_dirs(root).map_err(|error| CatalogError::ReadRoot {
        path: root.display().to_string(),
        message: error.to_string(),
    })?;

    let Some(manifest) = manifest else {
        let projects = entries
            .into_iter()
            .map(|(name, path)| Project::new(name, path))
            .collect();
        return Ok(ProjectCatalog::new(projects));
    };

    let mut projects = Vec::new();
    for (name, path) in entries {
        if path.join(manifest).is_file() {
            projects.push(Project::new(name.clone(), path.clone()));
        }
        // Unreadable subdirectories are skipped rather than failing the scan.
        let Ok(children) = child_dirs(&path) else {
            continue;
        };
        for (child_name, child_path) in children {
            if child_path.join(manifest).is_file() {
                projects.push(Project::new(format!("{name}/{child_name}"), child_path));
            }
        }
    }

    tracing::debug!(
        event = "catalog.scan_completed",
        root = %root.display(),
        manifest,
        count = projects.len()
    );
    Ok(ProjectCatalog::new(projects))
}

/// Create `root/name` and initialize a git repository in it.
pub fn create_project(root: &Path, name: &str) -> Result<Project, CreateProjectError> {
    let path = root.join(name);
    if path.exists() {
        return Err(CreateProjectError::AlreadyExists);
    }

    fs::create_dir_all(&path).map_err(CreateProjectError::CreateDir)?;

    let output = Command::new("git")
        .arg("init")
        .current_dir(&path)
        .stdin(Stdio::null())
        .output()
        .map_err(|error| CreateProjectError::GitInit(error.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(CreateProjectError::GitInit(if stderr.is_empty() {
            output.status.to_string()
        } else {
            stderr
        }));
    }

    tracing::info!(event = "catalog.project_created", name, path = %path.display());
    Ok(Project::new(name, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn names(catalog: &ProjectCatalog) -> Vec<&str> {
        catalog
            .projects()
            .iter()
            .map(|project| project.display_name.as_str())
            .collect()
    }

    #[test]
    fn lists_every_directory_sorted() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("zeta")).expect("mkdir");
        fs::create_dir(dir.path().join("alpha")).expect("mkdir");
        fs::write(dir.path().join("notes.txt"), "x").expect("write");

        let catalog = scan_projects(dir.path(), None).expect("scan");
        assert_eq!(names(&catalog), vec!["alpha", "zeta"]);
        assert_eq!(catalog.projects()[0].path, dir.path().join("alpha"));
    }

    #[test]
    fn manifest_filter_includes_monorepo_children() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path();
        fs::create_dir_all(root.join("web")).expect("mkdir");
        fs::write(root.join("web/package.json"), "{}").expect("write");
        fs::create_dir_all(root.join("mono/apps")).expect("mkdir");
        fs::create_dir_all(root.join("mono/api")).expect("mkdir");
        fs::write(root.join("mono/api/package.json"), "{}").expect("write");
        fs::create_dir_all(root.join("docs")).expect("mkdir");

        let catalog = scan_projects(root, Some("package.json")).expect("scan");
        assert_eq!(names(&catalog), vec!["mono/api", "web"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let result = scan_projects(&dir.path().join("absent"), None);
        assert!(matches!(result, Err(CatalogError::ReadRoot { .. })));
    }

    #[test]
    fn create_refuses_existing_directory() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("taken")).expect("mkdir");

        let error = create_project(dir.path(), "taken").expect_err("exists");
        assert_eq!(error.to_string(), "Project already exists!");
    }
}
