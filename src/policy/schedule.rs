use std::collections::BTreeSet;

use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MINUTES_PER_DAY: u32 = 24 * 60;
const MINUTES_PER_WEEK: u32 = 7 * MINUTES_PER_DAY;

/// A recurring blocking window. Weekdays use platform calendar numbering:
/// 1 = Sunday .. 7 = Saturday. `end_minute < start_minute` means the window
/// wraps past midnight into the next calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: Uuid,
    pub name: String,
    pub start_minute: u32,
    pub end_minute: u32,
    pub weekdays: BTreeSet<u8>,
    pub enabled: bool,
}

impl Schedule {
    pub fn new(
        name: impl Into<String>,
        start_minute: u32,
        end_minute: u32,
        weekdays: impl IntoIterator<Item = u8>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start_minute,
            end_minute,
            weekdays: weekdays.into_iter().collect(),
            enabled: true,
        }
    }

    /// Whether the window covers the given local weekday and minute of day.
    pub fn is_active_at(&self, weekday: u8, minute: u32) -> bool {
        debug_assert!((1..=7).contains(&weekday), "weekday out of range: {weekday}");
        debug_assert!(minute < MINUTES_PER_DAY, "minute out of range: {minute}");

        if !self.enabled || !self.weekdays.contains(&weekday) {
            return false;
        }

        if self.start_minute <= self.end_minute {
            minute >= self.start_minute && minute < self.end_minute
        } else {
            minute >= self.start_minute || minute < self.end_minute
        }
    }

    /// Forward distance in minutes until this schedule next starts, wrapping
    /// up to a full week. `None` when disabled or without weekdays.
    pub fn minutes_until_start(&self, weekday: u8, minute: u32) -> Option<u32> {
        debug_assert!((1..=7).contains(&weekday), "weekday out of range: {weekday}");
        debug_assert!(minute < MINUTES_PER_DAY, "minute out of range: {minute}");

        if !self.enabled {
            return None;
        }

        self.weekdays
            .iter()
            .map(|&wd| {
                let day_diff = (i32::from(wd) - i32::from(weekday)).rem_euclid(7) as u32;
                let mut diff = day_diff as i64 * i64::from(MINUTES_PER_DAY)
                    + i64::from(self.start_minute)
                    - i64::from(minute);
                if diff <= 0 {
                    diff += i64::from(MINUTES_PER_WEEK);
                }
                diff as u32
            })
            .min()
    }
}

/// First schedule in list order covering the given instant.
pub fn active_schedule(schedules: &[Schedule], weekday: u8, minute: u32) -> Option<&Schedule> {
    schedules.iter().find(|s| s.is_active_at(weekday, minute))
}

/// Among enabled, currently-inactive schedules, the one starting soonest.
/// Ties keep the earlier list entry.
pub fn next_upcoming(schedules: &[Schedule], weekday: u8, minute: u32) -> Option<&Schedule> {
    let mut closest: Option<(&Schedule, u32)> = None;

    for schedule in schedules {
        if !schedule.enabled || schedule.is_active_at(weekday, minute) {
            continue;
        }
        let Some(offset) = schedule.minutes_until_start(weekday, minute) else {
            continue;
        };
        if closest.map(|(_, best)| offset < best).unwrap_or(true) {
            closest = Some((schedule, offset));
        }
    }

    closest.map(|(schedule, _)| schedule)
}

/// Project a local timestamp onto the (weekday, minute-of-day) plane the
/// evaluation functions work in.
pub fn local_weekday_minute(now: DateTime<Local>) -> (u8, u32) {
    let weekday = chrono::Datelike::weekday(&now).num_days_from_sunday() as u8 + 1;
    let minute = now.hour() * 60 + now.minute();
    (weekday, minute)
}
