// src/entity/task.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{require_title, Document, DocumentMeta, Resource};
use crate::error::Result;

const DEFAULT_TAG: &str = "Personal";
const DEFAULT_PRIORITY: &str = "Medium";
const DEFAULT_DUE: &str = "Today";
const DEFAULT_COLOR: &str = "#8b5cf6";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub title: String,
    pub tag: String,
    /// Free-form priority label, stored as given.
    pub priority: String,
    /// Free-form due label ("Today", "Tomorrow", "Next Week", ...).
    pub due: String,
    pub color: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreate {
    pub title: Option<String>,
    pub tag: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub tag: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub color: Option<String>,
    pub completed: Option<bool>,
}

impl Document for Task {
    const COLLECTION: &'static str = "tasks";
    const LABEL: &'static str = "Task";

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}

impl Resource for Task {
    type Create = TaskCreate;
    type Update = TaskUpdate;

    fn build(owner: Uuid, input: TaskCreate) -> Result<Self> {
        let title = require_title(input.title, "Please add a task title")?;
        Ok(Self {
            meta: DocumentMeta::new(owner),
            title,
            tag: input.tag.unwrap_or_else(|| DEFAULT_TAG.to_string()),
            priority: input
                .priority
                .unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
            due: input.due.unwrap_or_else(|| DEFAULT_DUE.to_string()),
            color: input.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            completed: false,
        })
    }

    fn apply(&mut self, update: TaskUpdate) -> Result<()> {
        if let Some(title) = update.title {
            self.title = require_title(Some(title), "Task title cannot be empty")?;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(tag) = update.tag {
            self.tag = tag;
        }
        if let Some(due) = update.due {
            self.due = due;
        }
        if let Some(color) = update.color {
            self.color = color;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        self.meta.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IonixError;

    #[test]
    fn test_build_applies_defaults() {
        let owner = Uuid::new_v4();
        let task = Task::build(
            owner,
            TaskCreate {
                title: Some("Water plants".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(task.meta.user, owner);
        assert_eq!(task.tag, "Personal");
        assert_eq!(task.priority, "Medium");
        assert_eq!(task.due, "Today");
        assert_eq!(task.color, "#8b5cf6");
        assert!(!task.completed);
    }

    #[test]
    fn test_build_requires_title() {
        let err = Task::build(Uuid::new_v4(), TaskCreate::default()).unwrap_err();
        assert!(matches!(err, IonixError::Validation(_)));
    }

    #[test]
    fn test_custom_priority_stored_as_given() {
        let mut task = Task::build(
            Uuid::new_v4(),
            TaskCreate {
                title: Some("x".to_string()),
                priority: Some("Urgent".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(task.priority, "Urgent");

        task.apply(TaskUpdate {
            priority: Some("normal".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(task.priority, "normal");
    }

    #[test]
    fn test_apply_leaves_unspecified_fields() {
        let mut task = Task::build(
            Uuid::new_v4(),
            TaskCreate {
                title: Some("Ship release".to_string()),
                tag: Some("Work".to_string()),
                priority: Some("High".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let owner = task.meta.user;

        task.apply(TaskUpdate {
            completed: Some(true),
            ..Default::default()
        })
        .unwrap();

        assert!(task.completed);
        assert_eq!(task.title, "Ship release");
        assert_eq!(task.tag, "Work");
        assert_eq!(task.priority, "High");
        assert_eq!(task.meta.user, owner);
    }

    #[test]
    fn test_update_ignores_owner_field() {
        let update: TaskUpdate = serde_json::from_value(serde_json::json!({
            "user": Uuid::new_v4(),
            "_id": Uuid::new_v4(),
            "completed": true
        }))
        .unwrap();
        assert_eq!(update.completed, Some(true));
        assert!(update.title.is_none());
    }
}
