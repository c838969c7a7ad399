use super::applescript::{run_script, run_script_quiet};
use super::Browser;

pub struct SafariBrowser;

impl Browser for SafariBrowser {
    fn display_name(&self) -> &str {
        "Safari"
    }

    fn bundle_id(&self) -> &str {
        "com.apple.Safari"
    }

    fn active_url(&self) -> Option<String> {
        run_script(
            r#"tell application "Safari"
    if (count of windows) > 0 then
        return URL of front document
    end if
end tell"#,
        )
    }

    fn close_active_tab(&self) -> bool {
        run_script_quiet(
            r#"tell application "Safari"
    if (count of windows) > 0 then
        tell front window
            close current tab
        end tell
    end if
end tell"#,
        )
    }
}
