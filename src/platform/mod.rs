pub mod process;
pub mod types;

#[cfg(target_os = "macos")]
pub mod macos;

use std::sync::Arc;

pub use process::SystemProcessControl;
pub use types::{ActivationCallback, ActivationEvent, ActivationSource, ProcessControl};

#[cfg(target_os = "macos")]
pub use macos::WorkspaceActivationSource;

/// Stub source for platforms without a foreground-activation feed; the
/// monitoring toggle still works, it just never sees events.
#[cfg(not(target_os = "macos"))]
pub struct UnsupportedActivationSource;

#[cfg(not(target_os = "macos"))]
impl ActivationSource for UnsupportedActivationSource {
    fn subscribe(&self, _on_event: ActivationCallback) -> anyhow::Result<()> {
        anyhow::bail!("activation events are only supported on macOS")
    }

    fn unsubscribe(&self) {}
}

/// The activation source for the current platform.
pub fn default_source() -> Arc<dyn ActivationSource> {
    #[cfg(target_os = "macos")]
    {
        Arc::new(WorkspaceActivationSource::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Arc::new(UnsupportedActivationSource)
    }
}
