//! List/create/update/delete for owner-scoped documents.
//!
//! Every task, note and event goes through the same four operations; the
//! per-entity rules live in each type's [`Resource`] impl.

use uuid::Uuid;

use crate::entity::Resource;
use crate::error::{IonixError, Result};
use crate::storage::{SharedStore, SqliteStore};

/// All of `owner`'s documents, newest first.
pub async fn list<R: Resource>(store: &SharedStore, owner: Uuid) -> Result<Vec<R>> {
    store.lock().await.list::<R>(&owner)
}

pub async fn create<R: Resource>(store: &SharedStore, owner: Uuid, input: R::Create) -> Result<R> {
    let doc = R::build(owner, input)?;
    store.lock().await.insert(&doc)?;
    tracing::debug!(id = %doc.meta().id, collection = R::COLLECTION, "created");
    Ok(doc)
}

/// Merge `update` into the stored document after existence and ownership
/// checks. Concurrent updates are last-write-wins.
pub async fn update<R: Resource>(
    store: &SharedStore,
    owner: Uuid,
    id: Uuid,
    update: R::Update,
) -> Result<R> {
    let store = store.lock().await;
    let mut doc = load_owned::<R>(&store, owner, id)?;
    doc.apply(update)?;
    store.replace(&doc)?;
    Ok(doc)
}

/// Hard delete after existence and ownership checks. Returns the deleted id.
pub async fn delete<R: Resource>(store: &SharedStore, owner: Uuid, id: Uuid) -> Result<Uuid> {
    let store = store.lock().await;
    load_owned::<R>(&store, owner, id)?;
    store.delete::<R>(&id)?;
    tracing::debug!(%id, collection = R::COLLECTION, "deleted");
    Ok(id)
}

fn load_owned<R: Resource>(store: &SqliteStore, owner: Uuid, id: Uuid) -> Result<R> {
    let doc = store
        .get::<R>(&id)?
        .ok_or_else(|| IonixError::not_found(format!("{} not found", R::LABEL)))?;

    if doc.meta().user != owner {
        tracing::warn!(%id, %owner, collection = R::COLLECTION, "ownership check failed");
        return Err(IonixError::Authorization("User not authorized".to_string()));
    }
    Ok(doc)
}
