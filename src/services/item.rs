use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::item::{Item, ItemChangeset, ItemPatch, ItemPayload, NewItem};
use crate::repository::SharedRepository;
use crate::services::{now, touched};

const CONTENT_REQUIRED: &str = "content is required";

fn item_not_found(id: i32) -> AppError {
    warn!(item_id = id, "item not found");
    AppError::not_found("Item not found.")
}

/// Item fields that passed validation and still wait for a parent todo.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ItemDraft {
    pub content: String,
    pub is_completed: bool,
}

impl ItemDraft {
    pub fn from_payload(payload: ItemPayload) -> Result<Self, &'static str> {
        let content = payload
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or(CONTENT_REQUIRED)?;
        Ok(Self {
            content,
            is_completed: payload.is_completed.unwrap_or(false),
        })
    }

    pub fn for_todo(self, todo_id: i32, created_at: DateTime<Utc>) -> NewItem {
        NewItem {
            content: self.content,
            is_completed: self.is_completed,
            created_at,
            updated_at: created_at,
            todo_id,
        }
    }
}

#[derive(Clone)]
pub struct ItemService {
    repository: SharedRepository,
}

impl ItemService {
    pub fn new(repository: SharedRepository) -> Self {
        Self { repository }
    }

    /// Creates an item under an existing todo.
    #[tracing::instrument(skip_all, fields(todo_id = ?payload.todo_id))]
    pub fn create(&self, payload: ItemPayload) -> AppResult<Item> {
        let todo_id = payload
            .todo_id
            .ok_or_else(|| AppError::bad_request("Item todoId is required."))?;
        let draft = ItemDraft::from_payload(payload).map_err(|reason| AppError::bad_request(format!("Item {}.", reason)))?;
        if self.repository.find_todo(todo_id)?.is_none() {
            warn!(todo_id, "parent todo not found");
            return Err(AppError::not_found("Todo not found."));
        }
        let item = self.repository.insert_item(draft.for_todo(todo_id, now()))?;
        info!(item_id = item.id, todo_id, "created item");
        Ok(item)
    }

    /// Merges the patch. Completing an item stamps `completed_at`; un-completing keeps it.
    #[tracing::instrument(skip(self, patch))]
    pub fn update(&self, id: i32, patch: ItemPatch) -> AppResult<Item> {
        if patch.content.as_deref().is_some_and(|content| content.trim().is_empty()) {
            return Err(AppError::bad_request(format!("Item {}.", CONTENT_REQUIRED)));
        }
        let existing = self.repository.find_item(id)?.ok_or_else(|| item_not_found(id))?;
        let updated_at = touched(existing.updated_at);
        let changes = ItemChangeset {
            content: patch.content,
            is_completed: patch.is_completed,
            completed_at: (patch.is_completed == Some(true)).then_some(updated_at),
            updated_at,
        };
        let item = self
            .repository
            .update_item(id, changes)?
            .ok_or_else(|| item_not_found(id))?;
        info!(item_id = id, "updated item");
        Ok(item)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&self, id: i32) -> AppResult<()> {
        match self.repository.delete_item(id)? {
            0 => Err(item_not_found(id)),
            _ => {
                info!(item_id = id, "deleted item");
                Ok(())
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn get(&self, id: i32) -> AppResult<Item> {
        self.repository.find_item(id)?.ok_or_else(|| item_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::todo::TodoPayload;
    use crate::repository::memory::MemoryStore;
    use crate::repository::Repository;
    use crate::services::todo::new_todo;
    use std::sync::Arc;

    fn services() -> (ItemService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ItemService::new(store.clone()), store)
    }

    fn todo(store: &MemoryStore) -> i32 {
        let payload = TodoPayload {
            title: Some("Buy Groceries".to_string()),
            ..Default::default()
        };
        store.insert_todo(new_todo(payload, now()).unwrap()).unwrap().id
    }

    fn payload(todo_id: i32, content: &str) -> ItemPayload {
        ItemPayload {
            todo_id: Some(todo_id),
            content: Some(content.to_string()),
            is_completed: None,
        }
    }

    #[test]
    fn test_create_under_existing_todo() {
        let (items, store) = services();
        let todo_id = todo(&store);
        let item = items.create(payload(todo_id, "Buy apples")).unwrap();
        assert_eq!(todo_id, item.todo_id);
        assert!(!item.is_completed);
        assert_eq!(None, item.completed_at);
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn test_create_completed_item_does_not_stamp_completion() {
        let (items, store) = services();
        let todo_id = todo(&store);
        let item = items
            .create(ItemPayload {
                is_completed: Some(true),
                ..payload(todo_id, "Already done")
            })
            .unwrap();
        assert!(item.is_completed);
        assert_eq!(None, item.completed_at);
    }

    #[test]
    fn test_create_for_missing_todo_persists_nothing() {
        let (items, store) = services();
        let err = items.create(payload(77, "Orphan")).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(0, store.count_items().unwrap());
    }

    #[test]
    fn test_create_requires_content_and_todo_id() {
        let (items, store) = services();
        let todo_id = todo(&store);
        assert!(matches!(items.create(payload(todo_id, "")), Err(AppError::BadRequest(_))));
        let missing_parent = ItemPayload {
            todo_id: None,
            ..payload(todo_id, "Buy apples")
        };
        assert!(matches!(items.create(missing_parent), Err(AppError::BadRequest(_))));
        assert_eq!(0, store.count_items().unwrap());
    }

    #[test]
    fn test_completing_stamps_completed_at_and_uncompleting_keeps_it() {
        let (items, store) = services();
        let todo_id = todo(&store);
        let item = items.create(payload(todo_id, "Buy apples")).unwrap();

        let completed = items
            .update(
                item.id,
                ItemPatch {
                    content: None,
                    is_completed: Some(true),
                },
            )
            .unwrap();
        assert!(completed.is_completed);
        let completed_at = completed.completed_at.expect("completion stamped");
        assert!(completed.updated_at > item.updated_at);
        assert_eq!(completed.updated_at, completed_at);

        let reopened = items
            .update(
                item.id,
                ItemPatch {
                    content: None,
                    is_completed: Some(false),
                },
            )
            .unwrap();
        assert!(!reopened.is_completed);
        assert_eq!(Some(completed_at), reopened.completed_at);
        assert!(reopened.updated_at > completed.updated_at);
    }

    #[test]
    fn test_update_content_only() {
        let (items, store) = services();
        let todo_id = todo(&store);
        let item = items.create(payload(todo_id, "Buy apples")).unwrap();
        let updated = items
            .update(
                item.id,
                ItemPatch {
                    content: Some("Buy pears".to_string()),
                    is_completed: None,
                },
            )
            .unwrap();
        assert_eq!("Buy pears", updated.content);
        assert_eq!(None, updated.completed_at);
        assert!(updated.updated_at > item.updated_at);
    }

    #[test]
    fn test_update_unknown_item_is_not_found() {
        let (items, _) = services();
        assert!(matches!(items.update(5, ItemPatch::default()), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_delete_then_get_is_not_found() {
        let (items, store) = services();
        let todo_id = todo(&store);
        let item = items.create(payload(todo_id, "Buy apples")).unwrap();
        assert_eq!(item, items.get(item.id).unwrap());

        items.delete(item.id).unwrap();
        assert!(matches!(items.get(item.id), Err(AppError::NotFound(_))));
        assert!(matches!(items.delete(item.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_draft_validation() {
        let draft = ItemDraft::from_payload(ItemPayload {
            todo_id: Some(99),
            content: Some("Buy bread".to_string()),
            is_completed: None,
        })
        .unwrap();
        assert_eq!(
            ItemDraft {
                content: "Buy bread".to_string(),
                is_completed: false
            },
            draft
        );
        assert_eq!(Err(CONTENT_REQUIRED), ItemDraft::from_payload(ItemPayload::default()));
    }
}
