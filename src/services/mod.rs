use chrono::{DateTime, Duration, SubsecRound, Utc};

use crate::repository::SharedRepository;

pub mod creation;
pub mod item;
pub mod todo;

use creation::TodoCreationService;
use item::ItemService;
use todo::TodoService;

/// Everything the handlers need, shared through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub todos: TodoService,
    pub items: ItemService,
    pub creation: TodoCreationService,
    repository: SharedRepository,
}

impl AppState {
    pub fn new(repository: SharedRepository) -> Self {
        Self {
            todos: TodoService::new(repository.clone()),
            items: ItemService::new(repository.clone()),
            creation: TodoCreationService::new(repository.clone()),
            repository,
        }
    }

    pub fn repository(&self) -> &SharedRepository {
        &self.repository
    }
}

/// Current time at the precision Postgres keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamp for a mutation of a record last touched at `previous`.
/// Always strictly later than `previous`, even within one clock tick.
pub(crate) fn touched(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
