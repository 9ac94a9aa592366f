//! Local list state that is updated before the server confirms.

use std::future::Future;

use uuid::Uuid;

use crate::entity::Document;
use crate::error::Result;

/// A list mutated optimistically: the local change is applied first, then
/// the server call is awaited. On failure the list is restored to the
/// snapshot taken before the change.
#[derive(Debug, Clone, Default)]
pub struct OptimisticList<T> {
    items: Vec<T>,
}

impl<T: Clone> OptimisticList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    pub async fn apply<R, Fut>(
        &mut self,
        local: impl FnOnce(&mut Vec<T>),
        remote: Fut,
        reconcile: impl FnOnce(&mut Vec<T>, &R),
    ) -> Result<R>
    where
        Fut: Future<Output = Result<R>>,
    {
        let snapshot = self.items.clone();
        local(&mut self.items);

        match remote.await {
            Ok(value) => {
                reconcile(&mut self.items, &value);
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(error = %e, "rolling back optimistic change");
                self.items = snapshot;
                Err(e)
            }
        }
    }
}

fn position<D: Document>(items: &[D], id: Uuid) -> Option<usize> {
    items.iter().position(|item| item.meta().id == id)
}

impl<D: Document + Clone> OptimisticList<D> {
    /// Show `placeholder` at the top until the server returns the stored
    /// record, which then takes its place.
    pub async fn create<Fut>(&mut self, placeholder: D, remote: Fut) -> Result<D>
    where
        Fut: Future<Output = Result<D>>,
    {
        let temp_id = placeholder.meta().id;
        self.apply(
            |items| items.insert(0, placeholder),
            remote,
            |items, stored: &D| match position(items, temp_id) {
                Some(i) => items[i] = stored.clone(),
                None => items.insert(0, stored.clone()),
            },
        )
        .await
    }

    pub async fn update<Fut>(&mut self, edited: D, remote: Fut) -> Result<D>
    where
        Fut: Future<Output = Result<D>>,
    {
        let id = edited.meta().id;
        self.apply(
            |items| {
                if let Some(i) = position(items, id) {
                    items[i] = edited;
                }
            },
            remote,
            |items, stored: &D| {
                if let Some(i) = position(items, id) {
                    items[i] = stored.clone();
                }
            },
        )
        .await
    }

    pub async fn remove<R, Fut>(&mut self, id: Uuid, remote: Fut) -> Result<R>
    where
        Fut: Future<Output = Result<R>>,
    {
        self.apply(|items| items.retain(|item| item.meta().id != id), remote, |_, _| {})
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Resource, Task, TaskCreate};
    use crate::error::IonixError;

    fn task(title: &str) -> Task {
        Task::build(
            Uuid::new_v4(),
            TaskCreate {
                title: Some(title.to_string()),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_reconciles_with_server_record() {
        let mut list = OptimisticList::new(vec![task("old")]);
        let placeholder = task("new");
        let mut stored = placeholder.clone();
        stored.meta.id = Uuid::new_v4();

        let created = list
            .create(placeholder.clone(), async { Ok(stored.clone()) })
            .await
            .unwrap();

        assert_eq!(created.meta.id, stored.meta.id);
        assert_eq!(list.items().len(), 2);
        assert_eq!(list.items()[0].meta.id, stored.meta.id);
    }

    #[tokio::test]
    async fn test_failed_update_rolls_back() {
        let original = task("draft");
        let mut list = OptimisticList::new(vec![original.clone()]);

        let mut edited = original.clone();
        edited.title = "final".to_string();

        let result = list
            .update(edited, async {
                Err::<Task, _>(IonixError::Authorization("User not authorized".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(list.items()[0].title, "draft");
    }

    #[tokio::test]
    async fn test_failed_remove_restores_item() {
        let item = task("keep me");
        let id = item.meta.id;
        let mut list = OptimisticList::new(vec![item]);

        let result: Result<Uuid> = list
            .remove(id, async { Err(IonixError::not_found("Task not found")) })
            .await;

        assert!(result.is_err());
        assert_eq!(list.items().len(), 1);

        list.remove(id, async { Ok(id) }).await.unwrap();
        assert!(list.items().is_empty());
    }
}
