use super::applescript::{run_script, run_script_quiet};
use super::Browser;

/// Chromium-family browsers all expose the same "active tab of first
/// window" scripting surface; only the app name in the script varies.
pub struct ChromiumBrowser {
    name: &'static str,
    bundle_id: &'static str,
    script_app_name: &'static str,
}

impl ChromiumBrowser {
    pub const fn new(
        name: &'static str,
        bundle_id: &'static str,
        script_app_name: &'static str,
    ) -> Self {
        Self {
            name,
            bundle_id,
            script_app_name,
        }
    }
}

impl Browser for ChromiumBrowser {
    fn display_name(&self) -> &str {
        self.name
    }

    fn bundle_id(&self) -> &str {
        self.bundle_id
    }

    fn active_url(&self) -> Option<String> {
        run_script(&format!(
            r#"tell application "{}"
    if (count of windows) > 0 then
        return URL of active tab of first window
    end if
end tell"#,
            self.script_app_name
        ))
    }

    fn close_active_tab(&self) -> bool {
        run_script_quiet(&format!(
            r#"tell application "{}"
    if (count of windows) > 0 then
        close active tab of first window
    end if
end tell"#,
            self.script_app_name
        ))
    }
}
