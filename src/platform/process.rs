use std::sync::Mutex;

use log::debug;
use sysinfo::{Pid, ProcessesToUpdate, Signal, System};

use super::types::ProcessControl;

/// Terminates processes through the system process table. SIGTERM first so
/// the target can exit cleanly, falling back to a hard kill on platforms
/// where the signal is unsupported.
pub struct SystemProcessControl {
    system: Mutex<System>,
}

impl SystemProcessControl {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemProcessControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessControl for SystemProcessControl {
    fn terminate(&self, pid: i32) -> bool {
        let Ok(pid) = u32::try_from(pid) else {
            debug!("refusing to terminate invalid pid {pid}");
            return false;
        };
        let pid = Pid::from_u32(pid);

        let mut system = self
            .system
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        match system.process(pid) {
            Some(process) => process
                .kill_with(Signal::Term)
                .unwrap_or_else(|| process.kill()),
            None => {
                debug!("process {pid} not found, nothing to terminate");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_pid_reports_failure() {
        let control = SystemProcessControl::new();
        // Pid close to the platform maximum; nothing real should be there.
        assert!(!control.terminate(i32::MAX - 1));
    }

    #[test]
    fn negative_pid_is_rejected() {
        let control = SystemProcessControl::new();
        assert!(!control.terminate(-1));
    }
}
