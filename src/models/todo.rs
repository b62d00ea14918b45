use std::fmt;
use std::io::Write;

use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::item::{Item, ItemPayload};
use crate::repository::schema::todos;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TodoStatus {
    #[default]
    Active,
    Inactive,
    Deleted,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Active => "ACTIVE",
            TodoStatus::Inactive => "INACTIVE",
            TodoStatus::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql<Text, Pg> for TodoStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for TodoStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"ACTIVE" => Ok(TodoStatus::Active),
            b"INACTIVE" => Ok(TodoStatus::Inactive),
            b"DELETED" => Ok(TodoStatus::Deleted),
            other => Err(format!("unrecognized todo status: {}", String::from_utf8_lossy(other)).into()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = todos)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i32,
    pub title: String,
    pub subtitle: Option<String>,
    pub status: TodoStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// Shallow merge of every field the changeset carries.
    pub fn apply(&mut self, changes: TodoChangeset) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(subtitle) = changes.subtitle {
            self.subtitle = subtitle;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(is_deleted) = changes.is_deleted {
            self.is_deleted = is_deleted;
        }
        self.updated_at = changes.updated_at;
    }
}

/// A todo together with its eagerly loaded items.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TodoWithItems {
    #[serde(flatten)]
    pub todo: Todo,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = todos)]
pub struct NewTodo {
    pub title: String,
    pub subtitle: Option<String>,
    pub status: TodoStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewTodo {
    pub fn into_todo(self, id: i32) -> Todo {
        Todo {
            id,
            title: self.title,
            subtitle: self.subtitle,
            status: self.status,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = todos)]
pub struct TodoChangeset {
    pub title: Option<String>,
    /// `Some(None)` clears the column.
    pub subtitle: Option<Option<String>>,
    pub status: Option<TodoStatus>,
    pub is_deleted: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TodoPayload {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub status: Option<TodoStatus>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<Option<String>>,
    pub status: Option<TodoStatus>,
}

/// Keeps an explicit `null` apart from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `POST /todos`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CreateTodoRequest {
    pub todo: TodoPayload,
    #[serde(default)]
    pub items: Vec<ItemPayload>,
}
