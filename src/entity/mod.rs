mod event;
mod note;
mod task;
mod user;

pub use event::{Event, EventCreate, EventUpdate};
pub use note::{Note, NoteCreate, NoteSize, NoteUpdate};
pub use task::{Task, TaskCreate, TaskUpdate};
pub use user::{AuthResponse, NewUser, User, UserProfile};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{IonixError, Result};

/// Server-assigned fields shared by every owned document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    /// Owning user. Never changes after creation.
    pub user: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentMeta {
    pub fn new(owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user: owner,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A record stored in one of the owner-scoped document collections.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection (table) name.
    const COLLECTION: &'static str;
    /// Human-readable name used in error messages.
    const LABEL: &'static str;

    fn meta(&self) -> &DocumentMeta;
    fn meta_mut(&mut self) -> &mut DocumentMeta;
}

/// A document with its own create and update schemas.
///
/// `build` validates required fields and applies defaults; `apply` merges the
/// fields present in an update into the stored record.
pub trait Resource: Document {
    type Create: DeserializeOwned + Send + 'static;
    type Update: DeserializeOwned + Send + 'static;

    fn build(owner: Uuid, input: Self::Create) -> Result<Self>;
    fn apply(&mut self, update: Self::Update) -> Result<()>;
}

/// Reject missing or blank titles, returning the trimmed title.
pub(crate) fn require_title(title: Option<String>, message: &str) -> Result<String> {
    match title.map(|t| t.trim().to_string()) {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(IonixError::validation(message)),
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in update payloads.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
