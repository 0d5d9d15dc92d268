//! Optional launch of an interactive SSH or RDP client once the host is up.
//!
//! Client discovery is environment detection only: it yields a [`ClientLookup`] at startup
//! and the poll loop never looks at the platform.
use std::env;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::HandoffError;
use crate::probe::{Reachable, Service};

const MAC_RDP_APP: &str = "/Applications/Microsoft Remote Desktop.app";

/// Whether a client for a service is installed, and how to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientLookup {
    NotAvailable,
    AvailableAt(Launcher),
}

impl ClientLookup {
    pub fn is_available(&self) -> bool {
        matches!(self, ClientLookup::AvailableAt(_))
    }
}

/// Invocation recipe for a detected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// `ssh user@host`, run in the foreground.
    TerminalLogin { program: PathBuf },
    /// A remote desktop client that takes the host on its command line.
    RemoteDesktop { program: PathBuf, host_arg: HostArg },
    /// A remote desktop app that only opens `.rdp` connection files.
    RemoteDesktopFile { opener: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostArg {
    /// `/v:<host>` (mstsc, xfreerdp)
    Server,
    /// bare `<host>` (rdesktop)
    Plain,
}

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Contents of a temporary `.rdp` file appended as the last argument.
    pub descriptor: Option<String>,
    /// Wait for the client to exit (interactive terminal clients).
    pub foreground: bool,
}

impl Launcher {
    /// Build the command line for `host`. `identity` is only used by the terminal login client.
    pub fn plan(&self, host: &str, identity: Option<&str>) -> LaunchPlan {
        match self {
            Launcher::TerminalLogin { program } => LaunchPlan {
                program: program.clone(),
                args: vec![match identity {
                    Some(user) => format!("{user}@{host}"),
                    None => host.to_string(),
                }],
                descriptor: None,
                foreground: true,
            },
            Launcher::RemoteDesktop { program, host_arg } => LaunchPlan {
                program: program.clone(),
                args: vec![match host_arg {
                    HostArg::Server => format!("/v:{host}"),
                    HostArg::Plain => host.to_string(),
                }],
                descriptor: None,
                foreground: false,
            },
            Launcher::RemoteDesktopFile { opener } => LaunchPlan {
                program: opener.clone(),
                args: Vec::new(),
                descriptor: Some(format!("full address:s:{host}")),
                foreground: false,
            },
        }
    }
}

/// Look for `program` in the directories listed in `PATH`.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    find_in_dirs(program, env::split_paths(&path))
}

fn find_in_dirs(program: &str, dirs: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    let names: Vec<String> = if cfg!(windows) && Path::new(program).extension().is_none() {
        vec![format!("{program}.exe"), program.to_string()]
    } else {
        vec![program.to_string()]
    };
    dirs.into_iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

pub fn detect_terminal_login() -> ClientLookup {
    detect_terminal_login_with(find_in_path)
}

pub fn detect_terminal_login_with(which: impl Fn(&str) -> Option<PathBuf>) -> ClientLookup {
    match which("ssh") {
        Some(program) => ClientLookup::AvailableAt(Launcher::TerminalLogin { program }),
        None => ClientLookup::NotAvailable,
    }
}

pub fn detect_remote_desktop() -> ClientLookup {
    detect_remote_desktop_with(env::consts::OS, find_in_path, |p| p.exists())
}

/// Platform rules for the remote desktop client, with lookups injected.
pub fn detect_remote_desktop_with(
    os: &str,
    which: impl Fn(&str) -> Option<PathBuf>,
    app_installed: impl Fn(&Path) -> bool,
) -> ClientLookup {
    let launcher = match os {
        "windows" => which("mstsc").map(|program| Launcher::RemoteDesktop {
            program,
            host_arg: HostArg::Server,
        }),
        "macos" => app_installed(Path::new(MAC_RDP_APP)).then(|| Launcher::RemoteDesktopFile {
            opener: PathBuf::from("open"),
        }),
        _ => which("xfreerdp")
            .map(|program| Launcher::RemoteDesktop {
                program,
                host_arg: HostArg::Server,
            })
            .or_else(|| {
                which("rdesktop").map(|program| Launcher::RemoteDesktop {
                    program,
                    host_arg: HostArg::Plain,
                })
            }),
    };
    match launcher {
        Some(l) => ClientLookup::AvailableAt(l),
        None => ClientLookup::NotAvailable,
    }
}

/// `y` or `yes`, ignoring case and surrounding whitespace. Anything else is a no.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer == "y" || answer == "yes"
}

/// Print `prompt` and read one line. EOF or a read error reads as an empty answer.
pub fn ask<R: BufRead, W: Write>(prompt: &str, input: &mut R, out: &mut W) -> String {
    let _ = write!(out, "{prompt}");
    let _ = out.flush();
    let mut line = String::new();
    if let Err(e) = input.read_line(&mut line) {
        debug!(error = %e, "failed to read answer");
        line.clear();
    }
    line
}

/// Pick the login name: an empty answer keeps `default`.
pub fn choose_identity(answer: &str, default: &str) -> String {
    match answer.trim() {
        "" => default.to_string(),
        user => user.to_string(),
    }
}

/// The client to offer for `reachable`, if any.
pub fn handoff_target<'a>(config: &'a SessionConfig, reachable: &Reachable) -> Option<&'a Launcher> {
    if config.quiet {
        return None;
    }
    let lookup = match reachable.service {
        Service::TerminalLogin => &config.clients.terminal_login,
        Service::RemoteDesktop => &config.clients.remote_desktop,
        Service::Custom => return None,
    };
    match lookup {
        ClientLookup::AvailableAt(launcher) => Some(launcher),
        ClientLookup::NotAvailable => None,
    }
}

/// Ask whether to connect and, if so, launch the client.
///
/// Returns `Ok(false)` when nothing was offered or the user declined.
pub fn offer<R: BufRead, W: Write>(
    config: &SessionConfig,
    reachable: &Reachable,
    input: &mut R,
    out: &mut W,
) -> Result<bool, HandoffError> {
    let Some(launcher) = handoff_target(config, reachable) else {
        return Ok(false);
    };

    let prompt = format!("\nWould you like to connect via {}? (y/N) ", reachable.service);
    if !is_affirmative(&ask(&prompt, input, out)) {
        return Ok(false);
    }

    let identity = match launcher {
        Launcher::TerminalLogin { .. } => {
            let default =
                whoami::fallible::username().map_err(|e| HandoffError::Identity(e.to_string()))?;
            let prompt = format!("Enter username (press Enter for {default}): ");
            Some(choose_identity(&ask(&prompt, input, out), &default))
        }
        _ => None,
    };

    launch(&launcher.plan(&config.host, identity.as_deref()))?;
    Ok(true)
}

/// Run a plan. Foreground clients inherit the terminal and are waited on; the
/// rest are spawned and left running.
pub fn launch(plan: &LaunchPlan) -> Result<(), HandoffError> {
    let program = plan.program.display().to_string();
    let mut cmd = Command::new(&plan.program);
    cmd.args(&plan.args);

    // Held until the opener has had a chance to read it.
    let descriptor = match &plan.descriptor {
        Some(contents) => {
            let file = write_descriptor(contents)?;
            cmd.arg(file.path());
            Some(file)
        }
        None => None,
    };

    info!(program = %program, args = ?plan.args, "launching client");
    if plan.foreground {
        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| HandoffError::Launch {
                program: program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(HandoffError::Exited { program, status });
        }
        return Ok(());
    }

    cmd.spawn().map_err(|source| HandoffError::Launch {
        program: program.clone(),
        source,
    })?;
    if let Some(file) = descriptor {
        thread::sleep(Duration::from_secs(1));
        if let Err(e) = file.close() {
            warn!(error = %e, "failed to remove RDP file");
        }
    }
    Ok(())
}

fn write_descriptor(contents: &str) -> Result<tempfile::NamedTempFile, HandoffError> {
    let mut file = tempfile::Builder::new()
        .prefix("waitup-")
        .suffix(".rdp")
        .tempfile()
        .map_err(HandoffError::Descriptor)?;
    file.write_all(contents.as_bytes())
        .and_then(|_| file.flush())
        .map_err(HandoffError::Descriptor)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn identity_defaults_on_empty_answer() {
        assert_eq!(choose_identity("\n", "alice"), "alice");
        assert_eq!(choose_identity("  bob \n", "alice"), "bob");
    }

    #[test]
    fn ask_treats_eof_as_empty() {
        let mut input = Cursor::new(Vec::<u8>::new());
        let mut out = Vec::new();
        let answer = ask("Continue? ", &mut input, &mut out);
        assert_eq!(answer, "");
        assert_eq!(String::from_utf8(out).unwrap(), "Continue? ");
        assert!(!is_affirmative(&answer));
    }

    #[test]
    fn find_in_dirs_skips_missing_and_empty_entries() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            find_in_dirs("definitely-not-here", vec![PathBuf::new(), dir.path().to_path_buf()]),
            None
        );
    }

    #[cfg(unix)]
    #[test]
    fn find_in_dirs_requires_exec_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("ssh");
        std::fs::write(&bin, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert_eq!(find_in_dirs("ssh", vec![dir.path().to_path_buf()]), None);

        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_in_dirs("ssh", vec![dir.path().to_path_buf()]), Some(bin));
    }

    #[test]
    fn launch_reports_missing_program() {
        let plan = LaunchPlan {
            program: PathBuf::from("/nonexistent/waitup-client"),
            args: vec![],
            descriptor: None,
            foreground: true,
        };
        assert!(matches!(launch(&plan), Err(HandoffError::Launch { .. })));
    }
}
