use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::todo::{CreateTodoRequest, TodoWithItems};
use crate::repository::{transaction_with, RepositoryError, SharedRepository};
use crate::services::item::ItemDraft;
use crate::services::{now, todo};

/// Creates a todo and all of its items as one unit.
///
/// Every payload is validated before the first write. The writes run in a
/// single repository transaction, items one after another in input order, so
/// a failing item leaves neither the todo nor any sibling behind.
#[derive(Clone)]
pub struct TodoCreationService {
    repository: SharedRepository,
}

impl TodoCreationService {
    pub fn new(repository: SharedRepository) -> Self {
        Self { repository }
    }

    #[tracing::instrument(skip_all, fields(items = request.items.len()))]
    pub fn create_with_items(&self, request: CreateTodoRequest) -> AppResult<TodoWithItems> {
        let created_at = now();
        let new_todo = todo::new_todo(request.todo, created_at)?;
        let drafts = request
            .items
            .into_iter()
            .enumerate()
            .map(|(index, payload)| {
                ItemDraft::from_payload(payload)
                    .map_err(|reason| AppError::bad_request(format!("Item at index {}: {}.", index, reason)))
            })
            .collect::<AppResult<Vec<_>>>()?;

        let outcome = transaction_with(&*self.repository, |tx| {
            let todo = tx.insert_todo(new_todo.clone())?;
            let mut items = Vec::with_capacity(drafts.len());
            for (index, draft) in drafts.iter().enumerate() {
                let item = tx
                    .insert_item(draft.clone().for_todo(todo.id, created_at))
                    .map_err(|source| RepositoryError::ItemInsert {
                        index,
                        source: Box::new(source),
                    })?;
                items.push(item);
            }
            Ok(TodoWithItems { todo, items })
        });

        match outcome {
            Ok(created) => {
                info!(todo_id = created.todo.id, items = created.items.len(), "created todo with items");
                Ok(created)
            }
            Err(RepositoryError::ItemInsert { index, source }) => Err(AppError::ItemCreation {
                index,
                source: *source,
            }),
            Err(err) => Err(err.into()),
        }
    }
}
