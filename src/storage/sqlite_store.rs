use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use uuid::Uuid;

use crate::entity::{Document, Event, Note, Task, User};
use crate::error::{IonixError, Result};

/// Document store backed by SQLite.
///
/// Users live in a column-mapped table with a unique email. Every other
/// entity lives in its own collection table keyed by id, indexed by owner,
/// with the serialized document as a JSON body.
pub struct SqliteStore {
    conn: Connection,
}

/// Raw `users` row before conversion.
struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    pic: Option<String>,
    is_premium: bool,
    created_at: String,
    updated_at: String,
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, pic, is_premium, created_at, updated_at";

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| IonixError::Internal(format!("bad timestamp '{}': {}", raw, e)))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| IonixError::Internal(format!("bad id '{}': {}", raw, e)))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

impl TryFrom<UserRow> for User {
    type Error = IonixError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            pic: row.pic,
            is_premium: row.is_premium,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

impl SqliteStore {
    /// Open or create the store at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                pic TEXT,
                is_premium INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        for collection in [Task::COLLECTION, Note::COLLECTION, Event::COLLECTION] {
            self.create_collection(collection)?;
        }

        Ok(())
    }

    fn create_collection(&self, name: &str) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {name} (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                body TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{name}_user ON {name}(user_id, created_at);"
        ))?;
        Ok(())
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Insert a new user. Fails with `Conflict` if the email is taken.
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO users (id, name, email, password_hash, pic, is_premium, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    user.password_hash,
                    user.pic,
                    user.is_premium,
                    timestamp(&user.created_at),
                    timestamp(&user.updated_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    IonixError::Conflict("User already exists".to_string())
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    /// Overwrite every mutable column of an existing user.
    pub fn update_user(&self, user: &User) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE users SET name = ?2, email = ?3, password_hash = ?4, pic = ?5,
                        is_premium = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    user.password_hash,
                    user.pic,
                    user.is_premium,
                    timestamp(&user.updated_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    IonixError::Conflict("Email already in use".to_string())
                } else {
                    e.into()
                }
            })?;

        if changed == 0 {
            return Err(IonixError::not_found("User not found"));
        }
        Ok(())
    }

    pub fn get_user(&self, id: &Uuid) -> Result<Option<User>> {
        self.query_user("id", &id.to_string())
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_user("email", email)
    }

    fn query_user(&self, column: &str, value: &str) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
                [value],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        password_hash: row.get(3)?,
                        pic: row.get(4)?,
                        is_premium: row.get(5)?,
                        created_at: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                },
            )
            .optional()?;

        row.map(User::try_from).transpose()
    }

    // ========================================================================
    // Document collections
    // ========================================================================

    pub fn insert<D: Document>(&self, doc: &D) -> Result<()> {
        let meta = doc.meta();
        self.conn.execute(
            &format!(
                "INSERT INTO {} (id, user_id, created_at, updated_at, body)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                D::COLLECTION
            ),
            params![
                meta.id.to_string(),
                meta.user.to_string(),
                timestamp(&meta.created_at),
                timestamp(&meta.updated_at),
                serde_json::to_string(doc)?,
            ],
        )?;
        Ok(())
    }

    pub fn get<D: Document>(&self, id: &Uuid) -> Result<Option<D>> {
        let body: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT body FROM {} WHERE id = ?1", D::COLLECTION),
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(body.map(|b| serde_json::from_str(&b)).transpose()?)
    }

    /// All documents owned by `owner`, newest first.
    pub fn list<D: Document>(&self, owner: &Uuid) -> Result<Vec<D>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT body FROM {} WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            D::COLLECTION
        ))?;

        let bodies = stmt
            .query_map([owner.to_string()], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        bodies
            .iter()
            .map(|b| serde_json::from_str(b).map_err(IonixError::from))
            .collect()
    }

    /// Overwrite a stored document. The owner column is never rewritten.
    pub fn replace<D: Document>(&self, doc: &D) -> Result<()> {
        let meta = doc.meta();
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET updated_at = ?2, body = ?3 WHERE id = ?1",
                D::COLLECTION
            ),
            params![
                meta.id.to_string(),
                timestamp(&meta.updated_at),
                serde_json::to_string(doc)?,
            ],
        )?;

        if changed == 0 {
            return Err(IonixError::not_found(format!("{} not found", D::LABEL)));
        }
        Ok(())
    }

    /// Hard delete. Returns false if nothing matched.
    pub fn delete<D: Document>(&self, id: &Uuid) -> Result<bool> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", D::COLLECTION),
            [id.to_string()],
        )?;
        Ok(changed > 0)
    }

    pub fn count<D: Document>(&self, owner: &Uuid) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE user_id = ?1", D::COLLECTION),
            [owner.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Count documents owned by `owner` whose boolean `field` is true.
    pub fn count_flagged<D: Document>(&self, owner: &Uuid, field: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE user_id = ?1 AND json_extract(body, ?2) = 1",
                D::COLLECTION
            ),
            params![owner.to_string(), format!("$.{}", field)],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Creation times of documents owned by `owner` created at or after `since`.
    pub fn created_since<D: Document>(
        &self,
        owner: &Uuid,
        since: &DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT created_at FROM {} WHERE user_id = ?1 AND created_at >= ?2",
            D::COLLECTION
        ))?;

        let raw = stmt
            .query_map(params![owner.to_string(), timestamp(since)], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw.iter().map(|r| parse_timestamp(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{NewUser, Resource, TaskCreate, TaskUpdate};
    use chrono::Duration;
    use tempfile::TempDir;

    fn user(email: &str) -> User {
        User::new(NewUser {
            name: "Test".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            pic: None,
        })
    }

    fn task(owner: Uuid, title: &str) -> Task {
        Task::build(
            owner,
            TaskCreate {
                title: Some(title.to_string()),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_open_creates_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data").join("ionix.db");
        let _store = SqliteStore::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_user_roundtrip_and_unique_email() {
        let store = SqliteStore::open_in_memory().unwrap();
        let alice = user("alice@example.com");
        store.insert_user(&alice).unwrap();

        let found = store.find_user_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        assert!(!found.is_premium);

        let err = store.insert_user(&user("alice@example.com")).unwrap_err();
        assert!(matches!(err, IonixError::Conflict(_)));
    }

    #[test]
    fn test_update_user_email_conflict() {
        let store = SqliteStore::open_in_memory().unwrap();
        let alice = user("alice@example.com");
        let mut bob = user("bob@example.com");
        store.insert_user(&alice).unwrap();
        store.insert_user(&bob).unwrap();

        bob.email = "alice@example.com".to_string();
        let err = store.update_user(&bob).unwrap_err();
        assert!(matches!(err, IonixError::Conflict(_)));
    }

    #[test]
    fn test_list_is_scoped_and_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let mut first = task(a, "first");
        first.meta.created_at = Utc::now() - Duration::minutes(5);
        store.insert(&first).unwrap();
        store.insert(&task(a, "second")).unwrap();
        store.insert(&task(b, "other")).unwrap();

        let listed: Vec<Task> = store.list(&a).unwrap();
        let titles: Vec<_> = listed.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);

        let empty: Vec<Task> = store.list(&Uuid::new_v4()).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_replace_and_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let mut t = task(owner, "draft");
        store.insert(&t).unwrap();

        t.apply(TaskUpdate {
            completed: Some(true),
            ..Default::default()
        })
        .unwrap();
        store.replace(&t).unwrap();

        let stored: Task = store.get(&t.meta.id).unwrap().unwrap();
        assert!(stored.completed);

        assert!(store.delete::<Task>(&t.meta.id).unwrap());
        assert!(!store.delete::<Task>(&t.meta.id).unwrap());
        assert!(store.get::<Task>(&t.meta.id).unwrap().is_none());
    }

    #[test]
    fn test_counts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let mut done = task(owner, "done");
        done.completed = true;
        store.insert(&done).unwrap();
        store.insert(&task(owner, "open")).unwrap();
        store.insert(&task(Uuid::new_v4(), "someone else")).unwrap();

        assert_eq!(store.count::<Task>(&owner).unwrap(), 2);
        assert_eq!(store.count_flagged::<Task>(&owner, "completed").unwrap(), 1);
        assert_eq!(store.count::<Note>(&owner).unwrap(), 0);
    }

    #[test]
    fn test_created_since() {
        let store = SqliteStore::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let mut old = task(owner, "old");
        old.meta.created_at = Utc::now() - Duration::days(30);
        store.insert(&old).unwrap();
        store.insert(&task(owner, "new")).unwrap();

        let since = Utc::now() - Duration::days(7);
        let recent = store.created_since::<Task>(&owner, &since).unwrap();
        assert_eq!(recent.len(), 1);
    }
}
