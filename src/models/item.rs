use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};

use crate::models::todo::Todo;
use crate::repository::schema::items;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = items)]
#[diesel(belongs_to(Todo))]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i32,
    pub content: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub todo_id: i32,
}

impl Item {
    pub fn apply(&mut self, changes: ItemChangeset) {
        if let Some(content) = changes.content {
            self.content = content;
        }
        if let Some(is_completed) = changes.is_completed {
            self.is_completed = is_completed;
        }
        if let Some(completed_at) = changes.completed_at {
            self.completed_at = Some(completed_at);
        }
        self.updated_at = changes.updated_at;
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = items)]
pub struct NewItem {
    pub content: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub todo_id: i32,
}

impl NewItem {
    pub fn into_item(self, id: i32) -> Item {
        Item {
            id,
            content: self.content,
            is_completed: self.is_completed,
            completed_at: None,
            created_at: self.created_at,
            updated_at: self.updated_at,
            todo_id: self.todo_id,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = items)]
pub struct ItemChangeset {
    pub content: Option<String>,
    pub is_completed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Item fields accepted by `POST /items` and by the cascade create.
/// The cascade ignores `todo_id`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    pub todo_id: Option<i32>,
    pub content: Option<String>,
    pub is_completed: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    pub content: Option<String>,
    pub is_completed: Option<bool>,
}
