//! osascript execution helpers for browser scripting.
//!
//! Both helpers are blocking; the enforcement engine runs them on a
//! blocking worker, off the event path. Failures (permission denied, no
//! windows, script error) surface as `None`/`false` and are logged at
//! debug level only.

#[cfg(target_os = "macos")]
use std::process::Command;

#[cfg(target_os = "macos")]
use log::debug;

/// Run an AppleScript and return its trimmed stdout, if any.
#[cfg(target_os = "macos")]
pub fn run_script(source: &str) -> Option<String> {
    let output = match Command::new("osascript").arg("-e").arg(source).output() {
        Ok(output) => output,
        Err(err) => {
            debug!("osascript failed to spawn: {err}");
            return None;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("AppleScript error: {}", stderr.trim());
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Run an AppleScript for its side effect; true when it exited cleanly.
#[cfg(target_os = "macos")]
pub fn run_script_quiet(source: &str) -> bool {
    match Command::new("osascript").arg("-e").arg(source).output() {
        Ok(output) => {
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                debug!("AppleScript error: {}", stderr.trim());
            }
            output.status.success()
        }
        Err(err) => {
            debug!("osascript failed to spawn: {err}");
            false
        }
    }
}

#[cfg(not(target_os = "macos"))]
pub fn run_script(_source: &str) -> Option<String> {
    None
}

#[cfg(not(target_os = "macos"))]
pub fn run_script_quiet(_source: &str) -> bool {
    false
}
