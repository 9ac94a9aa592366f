//! Day-timeline layout for planner events.
//!
//! Hour 6 sits at offset 0 and every hour is [`HOUR_HEIGHT`] pixels tall.

use chrono::NaiveDate;

use crate::entity::Event;

pub const DAY_START_HOUR: f64 = 6.0;
pub const HOUR_HEIGHT: f64 = 90.0;
/// Hours of scheduled work that count as a fully booked day.
pub const BUSY_REFERENCE_HOURS: f64 = 12.0;
/// Vertical gap between stacked blocks.
const BLOCK_GAP: f64 = 10.0;

/// Partition events into (scheduled, backlog). Events that are neither
/// (no date, not in the backlog) appear in neither list.
pub fn split(events: &[Event]) -> (Vec<&Event>, Vec<&Event>) {
    let scheduled = events.iter().filter(|e| e.is_scheduled()).collect();
    let backlog = events.iter().filter(|e| e.is_backlog).collect();
    (scheduled, backlog)
}

pub fn scheduled_on(events: &[Event], date: NaiveDate) -> Vec<&Event> {
    events
        .iter()
        .filter(|e| e.is_scheduled() && e.date == Some(date))
        .collect()
}

pub fn timeline_offset(start: f64) -> f64 {
    (start - DAY_START_HOUR) * HOUR_HEIGHT
}

pub fn block_height(duration: f64) -> f64 {
    duration * HOUR_HEIGHT - BLOCK_GAP
}

/// Position of the current-time marker; parked just above the grid before
/// the day starts.
pub fn now_offset(hour: u32, minute: u32) -> f64 {
    let hour = f64::from(hour);
    if hour < DAY_START_HOUR {
        return -BLOCK_GAP;
    }
    (hour - DAY_START_HOUR) * HOUR_HEIGHT + f64::from(minute) / 60.0 * HOUR_HEIGHT
}

pub fn busy_percent<'a>(events: impl IntoIterator<Item = &'a Event>) -> f64 {
    let hours: f64 = events.into_iter().map(|e| e.duration).sum();
    (hours / BUSY_REFERENCE_HOURS * 100.0).min(100.0)
}
