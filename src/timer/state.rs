use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
}

impl Default for TimerStatus {
    fn default() -> Self {
        TimerStatus::Idle
    }
}

/// Countdown state. All transitions take an explicit `now` so the machine
/// stays deterministic under test; the controller feeds in real wall-clock
/// time. The countdown is measured from `started_at`, not by accumulating
/// ticks, so ticks missed during sleep are caught up on the next one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusTimerState {
    pub duration_seconds: u32,
    pub remaining_seconds: u32,
    pub status: TimerStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub strict_mode: bool,
}

impl Default for FocusTimerState {
    fn default() -> Self {
        Self {
            duration_seconds: 0,
            remaining_seconds: 0,
            status: TimerStatus::Idle,
            started_at: None,
            strict_mode: false,
        }
    }
}

impl FocusTimerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only meaningful while idle; ignored otherwise.
    pub fn set_duration(&mut self, minutes: u32) {
        if self.status != TimerStatus::Idle {
            return;
        }
        let seconds = minutes * 60;
        self.duration_seconds = seconds;
        self.remaining_seconds = seconds;
    }

    /// Begin the countdown. Returns false (and stays idle) when no duration
    /// has been configured.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.duration_seconds == 0 {
            return false;
        }
        self.status = TimerStatus::Running;
        self.started_at = Some(now);
        self.remaining_seconds = self.duration_seconds;
        true
    }

    /// Suspend the countdown, first catching `remaining_seconds` up to the
    /// wall clock.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.status != TimerStatus::Running {
            return;
        }
        self.remaining_seconds = self.remaining_at(now);
        self.status = TimerStatus::Paused;
        self.started_at = None;
    }

    /// Resume a paused countdown. The anchor is re-derived from the seconds
    /// already spent, so elapsed-while-paused time does not count against
    /// the session and drift never accumulates across pause cycles.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.status != TimerStatus::Paused {
            return;
        }
        let spent = self.duration_seconds - self.remaining_seconds;
        self.status = TimerStatus::Running;
        self.started_at = Some(now - chrono::Duration::seconds(i64::from(spent)));
    }

    /// Abandon the session from any non-idle state; the configured duration
    /// is restored for the next run.
    pub fn stop(&mut self) {
        self.status = TimerStatus::Idle;
        self.remaining_seconds = self.duration_seconds;
        self.started_at = None;
    }

    /// Advance the countdown. Returns true exactly on the tick that
    /// completes the session (remaining hits zero and the state goes idle).
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        let remaining = self.remaining_at(now);
        self.remaining_seconds = remaining;
        debug_assert!(
            self.remaining_seconds <= self.duration_seconds,
            "remaining exceeds duration"
        );
        if remaining == 0 {
            self.status = TimerStatus::Idle;
            self.started_at = None;
            return true;
        }
        false
    }

    fn remaining_at(&self, now: DateTime<Utc>) -> u32 {
        let Some(started_at) = self.started_at else {
            return self.remaining_seconds;
        };
        let elapsed = (now - started_at).num_seconds().max(0);
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.duration_seconds.saturating_sub(elapsed)
    }

    /// Fraction of the session already spent, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.duration_seconds == 0 {
            return 0.0;
        }
        1.0 - f64::from(self.remaining_seconds) / f64::from(self.duration_seconds)
    }

    /// "MM:SS" rendering of the remaining time.
    pub fn formatted_remaining(&self) -> String {
        let minutes = self.remaining_seconds / 60;
        let seconds = self.remaining_seconds % 60;
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn start_with_zero_duration_is_a_no_op() {
        let mut state = FocusTimerState::new();
        assert!(!state.start(at(0)));
        assert_eq!(state.status, TimerStatus::Idle);
        assert!(state.started_at.is_none());
    }

    #[test]
    fn set_duration_only_applies_while_idle() {
        let mut state = FocusTimerState::new();
        state.set_duration(25);
        assert_eq!(state.duration_seconds, 1500);
        assert_eq!(state.remaining_seconds, 1500);

        state.start(at(0));
        state.set_duration(50);
        assert_eq!(state.duration_seconds, 1500);
    }

    #[test]
    fn tick_tracks_wall_clock_not_tick_count() {
        let mut state = FocusTimerState::new();
        state.set_duration(10);
        state.start(at(0));

        // One tick after 3 real seconds catches up all of them.
        state.tick(at(3));
        assert_eq!(state.remaining_seconds, 600 - 3);
    }

    #[test]
    fn pause_resume_preserves_spent_time() {
        let mut state = FocusTimerState::new();
        state.set_duration(10);
        state.start(at(0));
        state.tick(at(120));
        state.pause(at(125));
        assert_eq!(state.status, TimerStatus::Paused);
        assert_eq!(state.remaining_seconds, 600 - 125);
        assert!(state.started_at.is_none());

        // 30 seconds pass while paused; they must not count.
        state.resume(at(155));
        state.tick(at(156));
        assert_eq!(state.remaining_seconds, 600 - 126);
    }

    #[test]
    fn drift_correction_holds_across_multiple_pause_cycles() {
        let mut state = FocusTimerState::new();
        state.set_duration(10);
        state.start(at(0));

        state.pause(at(100));
        state.resume(at(200));
        state.pause(at(250)); // 150s spent in total
        state.resume(at(400));
        state.tick(at(410)); // +10s running
        assert_eq!(state.remaining_seconds, 600 - 160);
    }

    #[test]
    fn completion_fires_exactly_once() {
        let mut state = FocusTimerState::new();
        state.set_duration(1);
        state.start(at(0));

        assert!(!state.tick(at(30)));
        assert!(state.tick(at(61)));
        assert_eq!(state.status, TimerStatus::Idle);
        assert_eq!(state.remaining_seconds, 0);

        // Already idle: no second completion.
        assert!(!state.tick(at(62)));
    }

    #[test]
    fn stop_restores_configured_duration() {
        let mut state = FocusTimerState::new();
        state.set_duration(10);
        state.start(at(0));
        state.tick(at(60));
        state.stop();
        assert_eq!(state.status, TimerStatus::Idle);
        assert_eq!(state.remaining_seconds, 600);
        assert!(state.started_at.is_none());
    }

    #[test]
    fn display_helpers() {
        let mut state = FocusTimerState::new();
        state.set_duration(10);
        state.start(at(0));
        state.tick(at(150));
        assert_eq!(state.formatted_remaining(), "07:30");
        assert!((state.progress() - 0.25).abs() < 1e-9);
    }
}
