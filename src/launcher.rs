use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no program named '{label}' in category '{category}'")]
    UnknownProgram { category: String, label: String },
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("failed to start {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Starts `path` as a detached process and returns as soon as it is spawned.
///
/// A bare name such as `firefox` is resolved through `PATH` by the OS. The
/// child handle is dropped on return: nothing waits on the process, reaps it,
/// or reports its exit status.
pub fn launch(path: &Path) -> Result<(), LaunchError> {
    let mut command = if is_bare_command(path) {
        Command::new(path)
    } else if !path.exists() {
        tracing::warn!(path = %path.display(), "launch target missing");
        return Err(LaunchError::NotFound(path.to_path_buf()));
    } else if is_executable(path) {
        Command::new(path)
    } else {
        opener_command(path)
    };
    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "launch failed");
            LaunchError::Spawn {
                path: path.to_path_buf(),
                source,
            }
        })?;
    tracing::info!(path = %path.display(), pid = child.id(), "program launched");
    drop(child);
    Ok(())
}

/// Single relative component, e.g. the self-mapped labels of legacy entries.
fn is_bare_command(path: &Path) -> bool {
    !path.is_absolute() && path.components().count() == 1 && !path.exists()
}

fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        path.metadata()
            .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("exe"))
            .unwrap_or(false)
    }
}

/// Hands a document (or directory) to the desktop's default handler.
fn opener_command(path: &Path) -> Command {
    #[cfg(target_os = "macos")]
    {
        let mut command = Command::new("open");
        command.arg(path);
        command
    }
    #[cfg(windows)]
    {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]).arg(path);
        command
    }
    #[cfg(not(any(target_os = "macos", windows)))]
    {
        let mut command = Command::new("xdg-open");
        command.arg(path);
        command
    }
}
