// src/entity/event.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{double_option, require_title, Document, DocumentMeta, Resource};
use crate::error::{IonixError, Result};

const DEFAULT_START: f64 = 9.0;
const DEFAULT_DURATION: f64 = 1.0;
const DEFAULT_KIND: &str = "purple";
const DEFAULT_TAG: &str = "Work";

/// A planner item. Backlog (inbox) items may carry no date or start hour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub title: String,
    pub date: Option<NaiveDate>,
    /// Start hour of day, fractional (9.5 = 09:30).
    pub start: Option<f64>,
    /// Length in hours.
    pub duration: f64,
    /// Colour-type tag used by the planner view.
    #[serde(rename = "type")]
    pub kind: String,
    pub tag: String,
    pub is_backlog: bool,
}

impl Event {
    /// Scheduled events have a date and are not in the backlog.
    pub fn is_scheduled(&self) -> bool {
        !self.is_backlog && self.date.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCreate {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub start: Option<f64>,
    pub duration: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub tag: Option<String>,
    pub is_backlog: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<Option<NaiveDate>>, // Some(None) to clear, Some(Some(date)) to set
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start: Option<Option<f64>>,
    pub duration: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub tag: Option<String>,
    pub is_backlog: Option<bool>,
}

fn check_hours(start: Option<f64>, duration: f64) -> Result<()> {
    if let Some(start) = start {
        if !(0.0..24.0).contains(&start) {
            return Err(IonixError::validation("Start hour must be between 0 and 24"));
        }
    }
    if !duration.is_finite() || duration <= 0.0 {
        return Err(IonixError::validation("Duration must be positive"));
    }
    Ok(())
}

impl Document for Event {
    const COLLECTION: &'static str = "events";
    const LABEL: &'static str = "Event";

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}

impl Resource for Event {
    type Create = EventCreate;
    type Update = EventUpdate;

    fn build(owner: Uuid, input: EventCreate) -> Result<Self> {
        let title = require_title(input.title, "Title is required")?;
        let start = Some(input.start.unwrap_or(DEFAULT_START));
        let duration = input.duration.unwrap_or(DEFAULT_DURATION);
        check_hours(start, duration)?;

        Ok(Self {
            meta: DocumentMeta::new(owner),
            title,
            date: input.date,
            start,
            duration,
            kind: input.kind.unwrap_or_else(|| DEFAULT_KIND.to_string()),
            tag: input.tag.unwrap_or_else(|| DEFAULT_TAG.to_string()),
            is_backlog: input.is_backlog.unwrap_or(false),
        })
    }

    fn apply(&mut self, update: EventUpdate) -> Result<()> {
        let start = update.start.unwrap_or(self.start);
        let duration = update.duration.unwrap_or(self.duration);
        check_hours(start, duration)?;

        if let Some(title) = update.title {
            self.title = require_title(Some(title), "Title is required")?;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        self.start = start;
        self.duration = duration;
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        if let Some(tag) = update.tag {
            self.tag = tag;
        }
        if let Some(backlog) = update.is_backlog {
            self.is_backlog = backlog;
        }
        self.meta.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backlog_item() -> Event {
        Event::build(
            Uuid::new_v4(),
            EventCreate {
                title: Some("Read paper".to_string()),
                is_backlog: Some(true),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_build_defaults() {
        let event = backlog_item();
        assert_eq!(event.start, Some(9.0));
        assert_eq!(event.duration, 1.0);
        assert_eq!(event.kind, "purple");
        assert_eq!(event.tag, "Work");
        assert!(event.is_backlog);
        assert!(event.date.is_none());
        assert!(!event.is_scheduled());
    }

    #[test]
    fn test_move_backlog_item_to_schedule() {
        let mut event = backlog_item();
        let update: EventUpdate = serde_json::from_value(serde_json::json!({
            "isBacklog": false,
            "date": "2024-01-01",
            "start": 9,
            "duration": 1
        }))
        .unwrap();

        event.apply(update).unwrap();
        assert!(event.is_scheduled());
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(event.title, "Read paper");
    }

    #[test]
    fn test_explicit_null_clears_date() {
        let mut event = backlog_item();
        event.date = NaiveDate::from_ymd_opt(2024, 3, 3);

        let absent: EventUpdate = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(absent.date.is_none());
        event.apply(absent).unwrap();
        assert!(event.date.is_some());

        let cleared: EventUpdate =
            serde_json::from_value(serde_json::json!({ "date": null })).unwrap();
        assert_eq!(cleared.date, Some(None));
        event.apply(cleared).unwrap();
        assert!(event.date.is_none());
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let err = Event::build(
            Uuid::new_v4(),
            EventCreate {
                title: Some("x".to_string()),
                duration: Some(0.0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, IonixError::Validation(_)));
    }

    #[test]
    fn test_kind_serializes_as_type() {
        let json = serde_json::to_value(backlog_item()).unwrap();
        assert_eq!(json["type"], "purple");
        assert_eq!(json["isBacklog"], true);
    }
}
