pub mod browser;
pub mod config;
pub mod daemon;
pub mod monitor;
pub mod platform;
pub mod policy;
pub mod report;
pub mod timer;

pub use browser::BrowserRegistry;
pub use config::{EngineConfig, WardenConfig};
pub use daemon::Warden;
pub use platform::{ActivationEvent, ActivationSource, ProcessControl, SystemProcessControl};
pub use policy::{PolicyHandle, PolicyState, Schedule};
pub use report::{LogNotifier, Notifier, Violation};
pub use timer::{FocusTimer, FocusTimerState, TimerStatus};
