pub mod categories;
pub mod schedule;

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

pub use categories::WebsiteCategory;
pub use schedule::Schedule;

/// The user's block policy: which apps are disallowed, which URL keywords
/// are blocked, and when the weekly schedules apply. Mutated only by the
/// configuration surface; the enforcement core reads snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyState {
    pub blocked_app_ids: HashSet<String>,
    pub explicit_keywords: Vec<String>,
    pub enabled_category_ids: HashSet<String>,
    pub schedules: Vec<Schedule>,
}

impl PolicyState {
    pub fn is_blocked(&self, bundle_id: &str) -> bool {
        self.blocked_app_ids.contains(bundle_id)
    }

    pub fn toggle_app(&mut self, bundle_id: &str) {
        if !self.blocked_app_ids.remove(bundle_id) {
            self.blocked_app_ids.insert(bundle_id.to_string());
        }
    }

    /// Normalizes (trim + lowercase) before inserting. Returns false for
    /// empty or duplicate keywords.
    pub fn add_keyword(&mut self, keyword: &str) -> bool {
        let trimmed = keyword.trim().to_lowercase();
        if trimmed.is_empty() || self.explicit_keywords.contains(&trimmed) {
            return false;
        }
        self.explicit_keywords.push(trimmed);
        true
    }

    pub fn remove_keyword(&mut self, keyword: &str) {
        self.explicit_keywords.retain(|k| k != keyword);
    }

    pub fn set_category_enabled(&mut self, category_id: &str, enabled: bool) {
        if enabled {
            self.enabled_category_ids.insert(category_id.to_string());
        } else {
            self.enabled_category_ids.remove(category_id);
        }
    }

    /// Explicit keywords in insertion order, followed by the keywords of
    /// every enabled category in table order, without duplicates. Always
    /// recomputed; nothing here is cached.
    pub fn effective_keywords(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut keywords = Vec::new();

        for keyword in &self.explicit_keywords {
            if seen.insert(keyword.as_str()) {
                keywords.push(keyword.clone());
            }
        }

        for category in categories::PREDEFINED {
            if !self.enabled_category_ids.contains(category.id) {
                continue;
            }
            for &keyword in category.keywords {
                if seen.insert(keyword) {
                    keywords.push(keyword.to_string());
                }
            }
        }

        keywords
    }

    /// First effective keyword contained in the lowercased URL.
    pub fn matching_keyword(&self, url: &str) -> Option<String> {
        let lower = url.to_lowercase();
        self.effective_keywords()
            .into_iter()
            .find(|k| lower.contains(k.as_str()))
    }
}

/// Shared handle to the policy. The enforcement core holds one and only
/// reads through it; the configuration surface mutates via [`update`].
///
/// [`update`]: PolicyHandle::update
#[derive(Clone, Default)]
pub struct PolicyHandle {
    inner: Arc<RwLock<PolicyState>>,
}

impl PolicyHandle {
    pub fn new(state: PolicyState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PolicyState> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PolicyState> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> PolicyState {
        self.read().clone()
    }

    pub fn is_blocked(&self, bundle_id: &str) -> bool {
        self.read().is_blocked(bundle_id)
    }

    pub fn effective_keywords(&self) -> Vec<String> {
        self.read().effective_keywords()
    }

    pub fn schedules(&self) -> Vec<Schedule> {
        self.read().schedules.clone()
    }

    pub fn update(&self, mutate: impl FnOnce(&mut PolicyState)) {
        mutate(&mut self.write());
    }
}
