use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single enforcement incident: a blocked app was launched or a blocked
/// URL was found in a browser tab. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: Uuid,
    pub app_name: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl Violation {
    pub fn new(app_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            app_name: app_name.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Outbound notification boundary. Violations arrive in occurrence order,
/// at most once per incident; how they are surfaced (panel, toast, log) is
/// the implementor's concern.
pub trait Notifier: Send + Sync {
    fn violation(&self, violation: &Violation);
    fn focus_session_complete(&self);
}

/// Default reporter for the headless daemon: everything lands in the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn violation(&self, violation: &Violation) {
        warn!("violation: {}", violation.reason);
    }

    fn focus_session_complete(&self) {
        info!("focus session complete");
    }
}
