use std::cell::RefCell;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::item::{Item, ItemChangeset, NewItem};
use crate::models::todo::{NewTodo, Todo, TodoChangeset};
use crate::repository::{Repository, RepositoryError, RepositoryResult, TodoFilter, Work};

#[derive(Debug, Default)]
struct MemoryState {
    todos: Vec<Todo>,
    items: Vec<Item>,
    last_todo_id: i32,
    last_item_id: i32,
}

impl MemoryState {
    fn insert_todo(&mut self, todo: NewTodo) -> Todo {
        self.last_todo_id += 1;
        let todo = todo.into_todo(self.last_todo_id);
        self.todos.push(todo.clone());
        todo
    }

    fn find_todo(&self, id: i32) -> Option<Todo> {
        self.todos.iter().find(|todo| todo.id == id).cloned()
    }

    fn find_todos(&self, filter: &TodoFilter) -> Vec<Todo> {
        self.todos.iter().filter(|todo| filter.matches(todo)).cloned().collect()
    }

    fn update_todo(&mut self, id: i32, changes: TodoChangeset) -> Option<Todo> {
        let todo = self.todos.iter_mut().find(|todo| todo.id == id)?;
        todo.apply(changes);
        Some(todo.clone())
    }

    fn count_todos(&self, filter: &TodoFilter) -> i64 {
        self.todos.iter().filter(|todo| filter.matches(todo)).count() as i64
    }

    /// Enforces the foreign key the Postgres schema declares.
    fn insert_item(&mut self, item: NewItem) -> RepositoryResult<Item> {
        if !self.todos.iter().any(|todo| todo.id == item.todo_id) {
            return Err(RepositoryError::MissingTodo(item.todo_id));
        }
        self.last_item_id += 1;
        let item = item.into_item(self.last_item_id);
        self.items.push(item.clone());
        Ok(item)
    }

    fn find_item(&self, id: i32) -> Option<Item> {
        self.items.iter().find(|item| item.id == id).cloned()
    }

    fn find_items_for_todos(&self, todo_ids: &[i32]) -> Vec<Item> {
        self.items
            .iter()
            .filter(|item| todo_ids.contains(&item.todo_id))
            .cloned()
            .collect()
    }

    fn update_item(&mut self, id: i32, changes: ItemChangeset) -> Option<Item> {
        let item = self.items.iter_mut().find(|item| item.id == id)?;
        item.apply(changes);
        Some(item.clone())
    }

    fn remove_item(&mut self, id: i32) -> Option<(usize, Item)> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some((index, self.items.remove(index)))
    }

    fn replace_todo(&mut self, previous: Todo) {
        if let Some(todo) = self.todos.iter_mut().find(|todo| todo.id == previous.id) {
            *todo = previous;
        }
    }

    fn replace_item(&mut self, previous: Item) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == previous.id) {
            *item = previous;
        }
    }

    fn undo(&mut self, change: Undo) {
        match change {
            Undo::TodoInserted { last_todo_id } => {
                self.todos.pop();
                self.last_todo_id = last_todo_id;
            }
            Undo::ItemInserted { last_item_id } => {
                self.items.pop();
                self.last_item_id = last_item_id;
            }
            Undo::TodoUpdated(previous) => self.replace_todo(previous),
            Undo::ItemUpdated(previous) => self.replace_item(previous),
            Undo::ItemDeleted { index, item } => self.items.insert(index, item),
        }
    }
}

/// Reverses one write made inside a transaction.
#[derive(Debug)]
enum Undo {
    TodoInserted { last_todo_id: i32 },
    ItemInserted { last_item_id: i32 },
    TodoUpdated(Todo),
    ItemUpdated(Item),
    ItemDeleted { index: usize, item: Item },
}

/// Process-local store used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| RepositoryError::Poisoned)
    }
}

impl Repository for MemoryStore {
    fn insert_todo(&self, todo: NewTodo) -> RepositoryResult<Todo> {
        Ok(self.lock()?.insert_todo(todo))
    }

    fn find_todo(&self, id: i32) -> RepositoryResult<Option<Todo>> {
        Ok(self.lock()?.find_todo(id))
    }

    fn find_todos(&self, filter: &TodoFilter) -> RepositoryResult<Vec<Todo>> {
        Ok(self.lock()?.find_todos(filter))
    }

    fn update_todo(&self, id: i32, changes: TodoChangeset) -> RepositoryResult<Option<Todo>> {
        Ok(self.lock()?.update_todo(id, changes))
    }

    fn count_todos(&self, filter: &TodoFilter) -> RepositoryResult<i64> {
        Ok(self.lock()?.count_todos(filter))
    }

    fn insert_item(&self, item: NewItem) -> RepositoryResult<Item> {
        self.lock()?.insert_item(item)
    }

    fn find_item(&self, id: i32) -> RepositoryResult<Option<Item>> {
        Ok(self.lock()?.find_item(id))
    }

    fn find_items_for_todos(&self, todo_ids: &[i32]) -> RepositoryResult<Vec<Item>> {
        Ok(self.lock()?.find_items_for_todos(todo_ids))
    }

    fn update_item(&self, id: i32, changes: ItemChangeset) -> RepositoryResult<Option<Item>> {
        Ok(self.lock()?.update_item(id, changes))
    }

    fn delete_item(&self, id: i32) -> RepositoryResult<usize> {
        Ok(self.lock()?.remove_item(id).map_or(0, |_| 1))
    }

    fn count_items(&self) -> RepositoryResult<i64> {
        Ok(self.lock()?.items.len() as i64)
    }

    // The lock is held for the whole unit of work.
    fn transaction(&self, work: &mut Work<'_>) -> RepositoryResult<()> {
        let mut state = self.lock()?;
        MemoryTransaction::new(&mut *state).run(work)?;
        Ok(())
    }
}

/// Writes straight into the locked state and journals how to reverse each one.
struct MemoryTransaction<'s> {
    state: RefCell<&'s mut MemoryState>,
    journal: RefCell<Vec<Undo>>,
}

impl<'s> MemoryTransaction<'s> {
    fn new(state: &'s mut MemoryState) -> Self {
        MemoryTransaction {
            state: RefCell::new(state),
            journal: RefCell::new(Vec::new()),
        }
    }

    /// Runs `work`, replaying the journal backwards if it fails.
    fn run(self, work: &mut Work<'_>) -> RepositoryResult<Vec<Undo>> {
        if let Err(err) = work(&self) {
            let mut state = self.state.borrow_mut();
            for change in self.journal.borrow_mut().drain(..).rev() {
                state.undo(change);
            }
            return Err(err);
        }
        Ok(self.journal.into_inner())
    }

    fn record(&self, change: Undo) {
        self.journal.borrow_mut().push(change);
    }
}

impl Repository for MemoryTransaction<'_> {
    fn insert_todo(&self, todo: NewTodo) -> RepositoryResult<Todo> {
        let mut state = self.state.borrow_mut();
        let last_todo_id = state.last_todo_id;
        let todo = state.insert_todo(todo);
        self.record(Undo::TodoInserted { last_todo_id });
        Ok(todo)
    }

    fn find_todo(&self, id: i32) -> RepositoryResult<Option<Todo>> {
        Ok(self.state.borrow().find_todo(id))
    }

    fn find_todos(&self, filter: &TodoFilter) -> RepositoryResult<Vec<Todo>> {
        Ok(self.state.borrow().find_todos(filter))
    }

    fn update_todo(&self, id: i32, changes: TodoChangeset) -> RepositoryResult<Option<Todo>> {
        let mut state = self.state.borrow_mut();
        let Some(previous) = state.find_todo(id) else {
            return Ok(None);
        };
        let updated = state.update_todo(id, changes);
        self.record(Undo::TodoUpdated(previous));
        Ok(updated)
    }

    fn count_todos(&self, filter: &TodoFilter) -> RepositoryResult<i64> {
        Ok(self.state.borrow().count_todos(filter))
    }

    fn insert_item(&self, item: NewItem) -> RepositoryResult<Item> {
        let mut state = self.state.borrow_mut();
        let last_item_id = state.last_item_id;
        let item = state.insert_item(item)?;
        self.record(Undo::ItemInserted { last_item_id });
        Ok(item)
    }

    fn find_item(&self, id: i32) -> RepositoryResult<Option<Item>> {
        Ok(self.state.borrow().find_item(id))
    }

    fn find_items_for_todos(&self, todo_ids: &[i32]) -> RepositoryResult<Vec<Item>> {
        Ok(self.state.borrow().find_items_for_todos(todo_ids))
    }

    fn update_item(&self, id: i32, changes: ItemChangeset) -> RepositoryResult<Option<Item>> {
        let mut state = self.state.borrow_mut();
        let Some(previous) = state.find_item(id) else {
            return Ok(None);
        };
        let updated = state.update_item(id, changes);
        self.record(Undo::ItemUpdated(previous));
        Ok(updated)
    }

    fn delete_item(&self, id: i32) -> RepositoryResult<usize> {
        match self.state.borrow_mut().remove_item(id) {
            Some((index, item)) => {
                self.record(Undo::ItemDeleted { index, item });
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn count_items(&self) -> RepositoryResult<i64> {
        Ok(self.state.borrow().items.len() as i64)
    }

    // A nested unit rolls back on its own and hands its journal to the enclosing one.
    fn transaction(&self, work: &mut Work<'_>) -> RepositoryResult<()> {
        let mut state = self.state.borrow_mut();
        let journal = MemoryTransaction::new(&mut **state).run(work)?;
        self.journal.borrow_mut().extend(journal);
        Ok(())
    }
}
