// src/entity/note.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{require_title, Document, DocumentMeta, Resource};
use crate::error::Result;

/// Tile size of a note on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoteSize {
    #[default]
    Square,
    Wide,
    Tall,
    Big,
}

impl std::fmt::Display for NoteSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoteSize::Square => write!(f, "square"),
            NoteSize::Wide => write!(f, "wide"),
            NoteSize::Tall => write!(f, "tall"),
            NoteSize::Big => write!(f, "big"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub title: String,
    /// Page texts in order. Always holds at least one (possibly blank) page.
    pub pages: Vec<String>,
    pub size: NoteSize,
    pub is_pinned: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCreate {
    pub title: Option<String>,
    pub pages: Option<Vec<String>>,
    pub size: Option<NoteSize>,
    pub is_pinned: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub pages: Option<Vec<String>>,
    pub size: Option<NoteSize>,
    pub is_pinned: Option<bool>,
}

fn normalize_pages(pages: Vec<String>) -> Vec<String> {
    if pages.is_empty() {
        vec![String::new()]
    } else {
        pages
    }
}

impl Document for Note {
    const COLLECTION: &'static str = "notes";
    const LABEL: &'static str = "Note";

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}

impl Resource for Note {
    type Create = NoteCreate;
    type Update = NoteUpdate;

    fn build(owner: Uuid, input: NoteCreate) -> Result<Self> {
        let title = require_title(input.title, "Please add a title field")?;
        Ok(Self {
            meta: DocumentMeta::new(owner),
            title,
            pages: normalize_pages(input.pages.unwrap_or_default()),
            size: input.size.unwrap_or_default(),
            is_pinned: input.is_pinned.unwrap_or(false),
        })
    }

    fn apply(&mut self, update: NoteUpdate) -> Result<()> {
        if let Some(title) = update.title {
            self.title = require_title(Some(title), "Note title cannot be empty")?;
        }
        if let Some(pages) = update.pages {
            self.pages = normalize_pages(pages);
        }
        if let Some(size) = update.size {
            self.size = size;
        }
        if let Some(pinned) = update.is_pinned {
            self.is_pinned = pinned;
        }
        self.meta.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults_to_one_blank_page() {
        let note = Note::build(
            Uuid::new_v4(),
            NoteCreate {
                title: Some("Ideas".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(note.pages, vec![String::new()]);
        assert_eq!(note.size, NoteSize::Square);
        assert!(!note.is_pinned);
    }

    #[test]
    fn test_empty_pages_update_keeps_one_page() {
        let mut note = Note::build(
            Uuid::new_v4(),
            NoteCreate {
                title: Some("Ideas".to_string()),
                pages: Some(vec!["one".to_string(), "two".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();

        note.apply(NoteUpdate {
            pages: Some(Vec::new()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(note.pages.len(), 1);
        assert_eq!(note.title, "Ideas");
    }

    #[test]
    fn test_size_outside_enumeration_is_rejected() {
        let result: std::result::Result<NoteCreate, _> =
            serde_json::from_value(serde_json::json!({ "title": "x", "size": "huge" }));
        assert!(result.is_err());

        let create: NoteCreate =
            serde_json::from_value(serde_json::json!({ "title": "x", "size": "wide" })).unwrap();
        assert_eq!(create.size, Some(NoteSize::Wide));
    }

    #[test]
    fn test_pinned_wire_name() {
        let note = Note::build(
            Uuid::new_v4(),
            NoteCreate {
                title: Some("Pinned".to_string()),
                is_pinned: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["isPinned"], true);
        assert_eq!(json["size"], "square");
    }
}
