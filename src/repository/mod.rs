use std::sync::Arc;

use thiserror::Error;

use crate::config::Settings;
use crate::models::item::{Item, ItemChangeset, NewItem};
use crate::models::todo::{NewTodo, Todo, TodoChangeset, TodoStatus};

pub mod database;
pub mod memory;
pub mod schema;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

pub type SharedRepository = Arc<dyn Repository + Send + Sync>;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("failed to check out a database connection: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("database query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("failed to run database migrations: {0}")]
    Migration(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("todo {0} does not exist")]
    MissingTodo(i32),

    #[error("transaction committed without running its work")]
    WorkSkipped,

    #[error("in-memory store lock was poisoned")]
    Poisoned,

    #[error("failed to create item at index {index}: {source}")]
    ItemInsert {
        index: usize,
        #[source]
        source: Box<RepositoryError>,
    },
}

/// Which todos a listing sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub include_deleted: bool,
    pub status: Option<TodoStatus>,
}

impl TodoFilter {
    pub fn visible() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: Option<TodoStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn matches(&self, todo: &Todo) -> bool {
        (self.include_deleted || !todo.is_deleted) && self.status.map_or(true, |status| todo.status == status)
    }
}

/// Unit of work handed to [`Repository::transaction`].
pub type Work<'w> = dyn FnMut(&dyn Repository) -> RepositoryResult<()> + 'w;

/// Generic CRUD persistence for todos and their items.
pub trait Repository {
    fn insert_todo(&self, todo: NewTodo) -> RepositoryResult<Todo>;
    fn find_todo(&self, id: i32) -> RepositoryResult<Option<Todo>>;
    fn find_todos(&self, filter: &TodoFilter) -> RepositoryResult<Vec<Todo>>;
    fn update_todo(&self, id: i32, changes: TodoChangeset) -> RepositoryResult<Option<Todo>>;
    fn count_todos(&self, filter: &TodoFilter) -> RepositoryResult<i64>;

    fn insert_item(&self, item: NewItem) -> RepositoryResult<Item>;
    fn find_item(&self, id: i32) -> RepositoryResult<Option<Item>>;
    fn find_items_for_todos(&self, todo_ids: &[i32]) -> RepositoryResult<Vec<Item>>;
    fn update_item(&self, id: i32, changes: ItemChangeset) -> RepositoryResult<Option<Item>>;
    fn delete_item(&self, id: i32) -> RepositoryResult<usize>;
    fn count_items(&self) -> RepositoryResult<i64>;

    /// Runs `work` so that either all of its writes persist or none do.
    fn transaction(&self, work: &mut Work<'_>) -> RepositoryResult<()>;
}

/// Runs `work` through [`Repository::transaction`] and returns what it produced.
pub fn transaction_with<T>(
    repository: &dyn Repository,
    mut work: impl FnMut(&dyn Repository) -> RepositoryResult<T>,
) -> RepositoryResult<T> {
    let mut output = None;
    repository.transaction(&mut |tx: &dyn Repository| {
        output = Some(work(tx)?);
        Ok(())
    })?;
    output.ok_or(RepositoryError::WorkSkipped)
}

/// Picks the Postgres store when a database url is configured, the in-memory one otherwise.
pub fn connect(settings: &Settings) -> anyhow::Result<SharedRepository> {
    match &settings.database_url {
        Some(url) => {
            let database = database::Database::connect(url, settings.database_pool_size)?;
            let applied = database.run_migrations()?;
            tracing::info!(pool_size = settings.database_pool_size, applied, "connected to postgres");
            Ok(Arc::new(database))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, falling back to the in-memory store");
            Ok(Arc::new(memory::MemoryStore::new()))
        }
    }
}
