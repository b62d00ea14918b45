use chrono::{DateTime, Utc};
use diesel::associations::GroupedBy;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::item::Item;
use crate::models::todo::{NewTodo, Todo, TodoChangeset, TodoPatch, TodoPayload, TodoStatus, TodoWithItems};
use crate::repository::{SharedRepository, TodoFilter};
use crate::services::touched;

const TITLE_REQUIRED: &str = "Todo title is required.";

fn todo_not_found(id: i32) -> AppError {
    warn!(todo_id = id, "todo not found");
    AppError::not_found("Todo not found.")
}

/// Validates a create payload and fills in the server-owned fields.
pub(crate) fn new_todo(payload: TodoPayload, created_at: DateTime<Utc>) -> AppResult<NewTodo> {
    let title = payload
        .title
        .filter(|title| !title.trim().is_empty())
        .ok_or_else(|| AppError::bad_request(TITLE_REQUIRED))?;
    Ok(NewTodo {
        title,
        subtitle: payload.subtitle,
        status: payload.status.unwrap_or_default(),
        is_deleted: false,
        created_at,
        updated_at: created_at,
    })
}

/// Pairs every todo with its own items, keeping both orders.
pub(crate) fn attach_items(todos: Vec<Todo>, items: Vec<Item>) -> Vec<TodoWithItems> {
    let grouped = items.grouped_by(&todos);
    todos
        .into_iter()
        .zip(grouped)
        .map(|(todo, items)| TodoWithItems { todo, items })
        .collect()
}

#[derive(Clone)]
pub struct TodoService {
    repository: SharedRepository,
}

impl TodoService {
    pub fn new(repository: SharedRepository) -> Self {
        Self { repository }
    }

    #[tracing::instrument(skip(self, patch))]
    pub fn update(&self, id: i32, patch: TodoPatch) -> AppResult<Todo> {
        if patch.title.as_deref().is_some_and(|title| title.trim().is_empty()) {
            return Err(AppError::bad_request(TITLE_REQUIRED));
        }
        let existing = self.repository.find_todo(id)?.ok_or_else(|| todo_not_found(id))?;
        let changes = TodoChangeset {
            title: patch.title,
            subtitle: patch.subtitle,
            status: patch.status,
            is_deleted: None,
            updated_at: touched(existing.updated_at),
        };
        let todo = self
            .repository
            .update_todo(id, changes)?
            .ok_or_else(|| todo_not_found(id))?;
        info!(todo_id = id, "updated todo");
        Ok(todo)
    }

    /// Flags the todo as deleted. The row and its items stay in storage.
    #[tracing::instrument(skip(self))]
    pub fn soft_delete(&self, id: i32) -> AppResult<Todo> {
        let existing = self.repository.find_todo(id)?.ok_or_else(|| todo_not_found(id))?;
        let changes = TodoChangeset {
            title: None,
            subtitle: None,
            status: Some(TodoStatus::Deleted),
            is_deleted: Some(true),
            updated_at: touched(existing.updated_at),
        };
        let todo = self
            .repository
            .update_todo(id, changes)?
            .ok_or_else(|| todo_not_found(id))?;
        info!(todo_id = id, "soft deleted todo");
        Ok(todo)
    }

    #[tracing::instrument(skip(self))]
    pub fn get(&self, id: i32) -> AppResult<TodoWithItems> {
        let todo = self
            .repository
            .find_todo(id)?
            .filter(|todo| !todo.is_deleted)
            .ok_or_else(|| todo_not_found(id))?;
        let items = self.repository.find_items_for_todos(&[todo.id])?;
        Ok(TodoWithItems { todo, items })
    }

    /// Lists visible todos with their items. An empty result is reported as NotFound.
    #[tracing::instrument(skip(self))]
    pub fn list(&self, status: Option<TodoStatus>) -> AppResult<Vec<TodoWithItems>> {
        let todos = self
            .repository
            .find_todos(&TodoFilter::visible().with_status(status))?;
        if todos.is_empty() {
            warn!("no todos to list");
            return Err(AppError::not_found("No todos found."));
        }
        let ids: Vec<i32> = todos.iter().map(|todo| todo.id).collect();
        let items = self.repository.find_items_for_todos(&ids)?;
        Ok(attach_items(todos, items))
    }
}
