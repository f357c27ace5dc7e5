//! Side effects performed on the host: opening URLs and launching applications.
//!
//! Every launch is fire-and-forget. The child is reaped on a detached thread
//! and the caller only learns whether the spawn itself succeeded.
//!
//! User-derived text is always passed as a single argv entry to a launcher
//! that is not a shell; `cmd /C start` would let `&`, `|` or `^` in a target
//! run arbitrary commands.

use crate::error::{AssistantError, Result};
use std::process::{Child, Command, Stdio};
use tracing::{debug, info};

/// Host capabilities the dispatcher relies on.
pub trait HostActions: Send + Sync {
    /// Open `url` in the default web browser.
    fn open_url(&self, url: &str) -> Result<()>;

    /// Launch the application called `name`.
    fn launch_app(&self, name: &str) -> Result<()>;

    /// Operating system name and release, e.g. `"Linux 6.8.0"`.
    fn system_description(&self) -> String {
        format!("{} {}", os_name(), os_release())
    }
}

/// [`HostActions`] backed by the platform's native launch mechanism.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl HostActions for SystemHost {
    fn open_url(&self, url: &str) -> Result<()> {
        info!("opening url: {url}");
        let (program, args) = url_opener(url);
        spawn_detached(program, &args)
    }

    fn launch_app(&self, name: &str) -> Result<()> {
        info!("launching application: {name}");
        if cfg!(target_os = "macos") {
            return spawn_detached("open", &["-a", name]);
        }
        let program =
            which::which(name).map_err(|e| AssistantError::Action(format!("{name}: {e}")))?;
        let program = program.to_string_lossy();
        spawn_detached(&program, &[])
    }
}

/// Launcher and argv that open `url` in the default browser.
fn url_opener(url: &str) -> (&'static str, Vec<&str>) {
    if cfg!(target_os = "macos") {
        ("open", vec![url])
    } else if cfg!(target_os = "windows") {
        ("rundll32", vec!["url.dll,FileProtocolHandler", url])
    } else {
        ("xdg-open", vec![url])
    }
}

fn spawn_detached(program: &str, args: &[&str]) -> Result<()> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| AssistantError::Action(format!("failed to run {program}: {e}")))?;
    debug!(pid = child.id(), "spawned {program}");
    reap(child);
    Ok(())
}

fn reap(mut child: Child) {
    std::thread::spawn(move || {
        let _ = child.wait();
    });
}

/// Operating system family, named the way `uname -s` reports it.
pub fn os_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

/// Kernel / OS release string, or `"unknown"` when it cannot be determined.
pub fn os_release() -> String {
    let output = if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "ver"]).output()
    } else {
        Command::new("uname").arg("-r").output()
    };
    match output {
        Ok(o) if o.status.success() => {
            let release = String::from_utf8_lossy(&o.stdout).trim().to_owned();
            if release.is_empty() {
                "unknown".to_owned()
            } else {
                release
            }
        }
        _ => "unknown".to_owned(),
    }
}
