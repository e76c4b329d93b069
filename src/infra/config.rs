use crate::domain::{Config, HostIdentity};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_ENV: &str = "COMMANDY_CONFIG";
const PROJECTS_DIR_ENV: &str = "COMMANDY_PROJECTS_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk overrides. Every field is optional; missing fields keep defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub projects_dir: Option<PathBuf>,
    pub canonical_host: Option<String>,
    pub remote_ssh_target: Option<String>,
    pub laptop_host: Option<String>,
    pub laptop_ssh_target: Option<String>,
    pub agent_command: Option<String>,
    pub database_url: Option<String>,
    pub tunnel_port: Option<u16>,
    pub watched_ports: Option<Vec<u16>>,
    pub port_authority_api: Option<String>,
    pub port_authority_dashboard: Option<String>,
    pub github_url: Option<String>,
    pub manifest_file: Option<String>,
    pub dependency_cache_dir: Option<String>,
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(override_path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(override_path));
    }
    dirs::config_dir().map(|dir| dir.join("commandy").join("config.json"))
}

/// Build the startup configuration: defaults, then the config file, then
/// `COMMANDY_PROJECTS_DIR`, then the command-line directory.
pub fn load_config(
    host: HostIdentity,
    projects_dir_arg: Option<&Path>,
) -> Result<Config, ConfigError> {
    let env_dir = std::env::var_os(PROJECTS_DIR_ENV).map(PathBuf::from);
    load_layered(
        host,
        resolve_config_path().as_deref(),
        env_dir.as_deref(),
        projects_dir_arg,
    )
}

fn load_layered(
    host: HostIdentity,
    config_path: Option<&Path>,
    env_dir: Option<&Path>,
    projects_dir_arg: Option<&Path>,
) -> Result<Config, ConfigError> {
    let mut config = Config::with_host(host);

    if let Some(path) = config_path {
        if let Some(file) = read_config_file(path)? {
            apply_config_file(&mut config, file);
            tracing::info!(event = "config.file_loaded", path = %path.display());
        }
    }

    if let Some(dir) = env_dir {
        config.projects_dir = expand_home(dir, &config.host.home_dir);
    }
    if let Some(dir) = projects_dir_arg {
        config.projects_dir = dir.to_path_buf();
    }

    Ok(config)
}

/// A missing file is not an error; an unreadable or malformed one is.
pub fn read_config_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };

    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
}

pub fn apply_config_file(config: &mut Config, file: ConfigFile) {
    if let Some(dir) = file.projects_dir {
        config.projects_dir = expand_home(&dir, &config.host.home_dir);
    }
    if let Some(value) = file.canonical_host {
        config.canonical_host = value;
    }
    if let Some(value) = file.remote_ssh_target {
        config.remote_ssh_target = value;
    }
    if let Some(value) = file.laptop_host {
        config.laptop_host = value;
    }
    if let Some(value) = file.laptop_ssh_target {
        config.laptop_ssh_target = value;
    }
    if let Some(value) = file.agent_command {
        config.agent_command = value;
    }
    if let Some(value) = file.database_url {
        config.database_url = value;
    }
    if let Some(value) = file.tunnel_port {
        config.tunnel_port = value;
    }
    if let Some(value) = file.watched_ports {
        config.watched_ports = value;
    }
    if let Some(value) = file.port_authority_api {
        config.port_authority_api = value;
    }
    if let Some(value) = file.port_authority_dashboard {
        config.port_authority_dashboard = value;
    }
    if let Some(value) = file.github_url {
        config.github_url = value;
    }
    if let Some(value) = file.manifest_file {
        config.manifest_file = value;
    }
    if let Some(value) = file.dependency_cache_dir {
        config.dependency_cache_dir = value;
    }
}

fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}
