pub mod applescript;
pub mod chromium;
pub mod safari;

use std::collections::HashMap;
use std::sync::Arc;

pub use chromium::ChromiumBrowser;
pub use safari::SafariBrowser;

/// Tab inspection for one supported browser. Both operations are
/// best-effort: `active_url` returns `None` on any failure and
/// `close_active_tab` reports whether the attempt went through.
pub trait Browser: Send + Sync {
    fn display_name(&self) -> &str;
    fn bundle_id(&self) -> &str;
    fn active_url(&self) -> Option<String>;
    fn close_active_tab(&self) -> bool;
}

/// Fixed mapping from bundle id to browser capability, populated once at
/// startup. Bundle ids not present here are treated as "not a browser".
pub struct BrowserRegistry {
    browsers: HashMap<String, Arc<dyn Browser>>,
}

impl BrowserRegistry {
    pub fn from_browsers(browsers: Vec<Arc<dyn Browser>>) -> Self {
        Self {
            browsers: browsers
                .into_iter()
                .map(|b| (b.bundle_id().to_string(), b))
                .collect(),
        }
    }

    /// The supported browser set: Safari plus the Chromium-family browsers
    /// that answer the shared "active tab" scripting interface.
    pub fn standard() -> Self {
        Self::from_browsers(vec![
            Arc::new(SafariBrowser),
            Arc::new(ChromiumBrowser::new(
                "Google Chrome",
                "com.google.Chrome",
                "Google Chrome",
            )),
            Arc::new(ChromiumBrowser::new(
                "Microsoft Edge",
                "com.microsoft.edgemac",
                "Microsoft Edge",
            )),
            Arc::new(ChromiumBrowser::new(
                "Brave Browser",
                "com.brave.Browser",
                "Brave Browser",
            )),
            Arc::new(ChromiumBrowser::new(
                "Arc",
                "company.thebrowser.Browser",
                "Arc",
            )),
            Arc::new(ChromiumBrowser::new("Dia", "company.thebrowser.dia", "Dia")),
            Arc::new(ChromiumBrowser::new(
                "Vivaldi",
                "com.vivaldi.Vivaldi",
                "Vivaldi",
            )),
            Arc::new(ChromiumBrowser::new(
                "Opera",
                "com.operasoftware.Opera",
                "Opera",
            )),
        ])
    }

    pub fn get(&self, bundle_id: &str) -> Option<&Arc<dyn Browser>> {
        self.browsers.get(bundle_id)
    }

    pub fn is_browser(&self, bundle_id: &str) -> bool {
        self.browsers.contains_key(bundle_id)
    }

    pub fn len(&self) -> usize {
        self.browsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.browsers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_covers_supported_browsers() {
        let registry = BrowserRegistry::standard();
        assert_eq!(registry.len(), 8);
        assert!(registry.is_browser("com.apple.Safari"));
        assert!(registry.is_browser("com.google.Chrome"));
        assert!(registry.is_browser("company.thebrowser.Browser"));
    }

    #[test]
    fn unknown_bundle_id_is_not_a_browser() {
        let registry = BrowserRegistry::standard();
        assert!(!registry.is_browser("com.apple.Terminal"));
        assert!(registry.get("com.apple.Terminal").is_none());
    }

    #[test]
    fn lookup_returns_the_matching_capability() {
        let registry = BrowserRegistry::standard();
        let edge = registry.get("com.microsoft.edgemac").unwrap();
        assert_eq!(edge.display_name(), "Microsoft Edge");
    }
}
