//! Per-user activity summary.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{Event, Note, Task};
use crate::error::Result;
use crate::storage::SharedStore;

const ACTIVITY_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_notes: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub total_events: usize,
    /// Percentage of tasks completed, rounded; 0 when there are no tasks.
    #[serde(rename = "taskRate")]
    pub completion_rate: u32,
    pub activity_data: Vec<DayActivity>,
}

/// Tasks and notes created on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayActivity {
    /// Weekday short name ("Mon".."Sun").
    pub name: String,
    pub date: NaiveDate,
    pub tasks: usize,
    pub notes: usize,
}

pub fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

/// Bucket creation times into the seven days ending on `today`, oldest first.
pub fn weekly_activity(
    today: NaiveDate,
    tasks: &[DateTime<Utc>],
    notes: &[DateTime<Utc>],
) -> Vec<DayActivity> {
    let count_on = |day: NaiveDate, times: &[DateTime<Utc>]| {
        times.iter().filter(|t| t.date_naive() == day).count()
    };

    (0..ACTIVITY_DAYS)
        .rev()
        .map(|offset| {
            let day = today - Duration::days(offset);
            DayActivity {
                name: day.weekday().to_string(),
                date: day,
                tasks: count_on(day, tasks),
                notes: count_on(day, notes),
            }
        })
        .collect()
}

pub async fn compute_summary(store: &SharedStore, user_id: Uuid) -> Result<AnalyticsSummary> {
    compute_summary_at(store, user_id, Utc::now()).await
}

pub async fn compute_summary_at(
    store: &SharedStore,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<AnalyticsSummary> {
    let today = now.date_naive();
    let window_start = (today - Duration::days(ACTIVITY_DAYS - 1))
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(now);

    let store = store.lock().await;
    let total_notes = store.count::<Note>(&user_id)?;
    let total_tasks = store.count::<Task>(&user_id)?;
    let completed_tasks = store.count_flagged::<Task>(&user_id, "completed")?;
    let total_events = store.count::<Event>(&user_id)?;
    let task_times = store.created_since::<Task>(&user_id, &window_start)?;
    let note_times = store.created_since::<Note>(&user_id, &window_start)?;

    Ok(AnalyticsSummary {
        total_notes,
        total_tasks,
        completed_tasks,
        pending_tasks: total_tasks.saturating_sub(completed_tasks),
        total_events,
        completion_rate: completion_rate(completed_tasks, total_tasks),
        activity_data: weekly_activity(today, &task_times, &note_times),
    })
}
