//! Application services: validation-aware mutations, queries and the event
//! dispatch that follows every committed write.

mod categories;
mod tasks;

pub use categories::CategoryService;
pub use tasks::{TaskQueryService, TaskService};

use crate::cache::CategoryStatsCache;
use crate::db::Database;
use crate::events::{MutationDispatcher, StatsCacheInvalidator};
use std::sync::Arc;

/// All services sharing one database, cache and dispatcher.
#[derive(Clone)]
pub struct Services {
    pub categories: Arc<CategoryService>,
    pub tasks: Arc<TaskService>,
    pub task_queries: Arc<TaskQueryService>,
}

impl Services {
    /// Wire services with the stats invalidator registered as an observer.
    pub fn new(db: Arc<Database>, stats_cache: Arc<CategoryStatsCache>) -> Self {
        let events = Arc::new(
            MutationDispatcher::new()
                .with_observer(Arc::new(StatsCacheInvalidator::new(Arc::clone(&stats_cache)))),
        );
        Self::with_dispatcher(db, stats_cache, events)
    }

    /// Wire services with a caller-supplied dispatcher.
    pub fn with_dispatcher(
        db: Arc<Database>,
        stats_cache: Arc<CategoryStatsCache>,
        events: Arc<MutationDispatcher>,
    ) -> Self {
        Self {
            categories: Arc::new(CategoryService::new(
                Arc::clone(&db),
                stats_cache,
                Arc::clone(&events),
            )),
            tasks: Arc::new(TaskService::new(Arc::clone(&db), events)),
            task_queries: Arc::new(TaskQueryService::new(db)),
        }
    }
}
