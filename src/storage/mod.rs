mod sqlite_store;

pub use sqlite_store::SqliteStore;

use std::sync::Arc;
use tokio::sync::Mutex;

/// Store handle shared across request handlers.
pub type SharedStore = Arc<Mutex<SqliteStore>>;

pub fn shared(store: SqliteStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}
