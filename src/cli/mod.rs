use crate::domain::Config;
use crate::infra::{CatalogError, list_sessions, scan_projects};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GlobalOptions {
    pub projects_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Tui(GlobalOptions),
    Command {
        command: CliCommand,
        options: GlobalOptions,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliCommand {
    Projects { manifest_only: bool },
    Sessions,
}

#[derive(Debug, Error)]
pub enum CliParseError {
    #[error("unknown subcommand: {0}")]
    UnknownSubcommand(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

pub fn parse_invocation(args: &[String]) -> Result<CliInvocation, CliParseError> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(CliInvocation::PrintHelp);
    }
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliInvocation::PrintVersion);
    }

    let mut options = GlobalOptions::default();
    let mut subcommand: Option<&str> = None;
    let mut manifest_only = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--projects-dir" | "-p" => {
                let value = iter
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--projects-dir".to_string()))?;
                options.projects_dir = Some(PathBuf::from(value));
            }
            "--manifest" | "-m" if subcommand == Some("projects") => manifest_only = true,
            _ if arg.starts_with('-') => {
                return Err(CliParseError::UnknownFlag(arg.to_string()));
            }
            _ if subcommand.is_some() => {
                return Err(CliParseError::UnexpectedArgument(arg.to_string()));
            }
            "projects" | "sessions" => subcommand = Some(arg.as_str()),
            _ => return Err(CliParseError::UnknownSubcommand(arg.to_string())),
        }
    }

    let command = match subcommand {
        None => return Ok(CliInvocation::Tui(options)),
        Some("projects") => CliCommand::Projects { manifest_only },
        Some(_) => CliCommand::Sessions,
    };
    Ok(CliInvocation::Command { command, options })
}

pub fn run(command: CliCommand, config: &Config) -> Result<(), CliRunError> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    match command {
        CliCommand::Projects { manifest_only } => {
            let manifest = manifest_only.then_some(config.manifest_file.as_str());
            let catalog = scan_projects(&config.projects_dir, manifest)?;
            for project in catalog.projects() {
                let line = format!("{}\t{}", project.display_name, project.path.display());
                if !write_line(&mut out, &line)? {
                    return Ok(());
                }
            }
        }
        CliCommand::Sessions => {
            for session in list_sessions() {
                if !write_line(&mut out, &session)? {
                    return Ok(());
                }
            }
        }
    }

    match out.flush() {
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => Ok(other?),
    }
}

fn write_line(out: &mut impl Write, line: &str) -> io::Result<bool> {
    match writeln!(out, "{line}") {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(error) => Err(error),
    }
}
