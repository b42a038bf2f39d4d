use crate::db::{Database, today};
use crate::error::{AppError, AppResult};
use crate::events::{MutationAction, MutationDispatcher, MutationEvent};
use crate::types::{
    LightTask, Task, TaskFilters, TaskInput, TaskPage, TaskSorting, TaskStatistics,
    TaskWithCategory,
};
use std::sync::Arc;
use tracing::info;

/// Task mutations. Each one runs in its own transaction and dispatches an
/// event once committed.
pub struct TaskService {
    db: Arc<Database>,
    events: Arc<MutationDispatcher>,
}

impl TaskService {
    pub fn new(db: Arc<Database>, events: Arc<MutationDispatcher>) -> Self {
        Self { db, events }
    }

    pub fn create(&self, input: &TaskInput) -> AppResult<TaskWithCategory> {
        let task = self.db.create_task(input)?;
        info!(id = task.task.id, title = %task.task.title, "Task created");
        self.events
            .dispatch(MutationEvent::task(MutationAction::Created, task.task.id));
        Ok(task)
    }

    pub fn update(&self, id: i64, input: &TaskInput) -> AppResult<TaskWithCategory> {
        let task = self.db.update_task(id, input)?;
        info!(id, "Task updated");
        self.events
            .dispatch(MutationEvent::task(MutationAction::Updated, id));
        Ok(task)
    }

    pub fn delete(&self, id: i64) -> AppResult<Task> {
        let task = self.db.delete_task(id)?;
        info!(id, "Task moved to trash");
        self.events
            .dispatch(MutationEvent::task(MutationAction::Deleted, id));
        Ok(task)
    }

    /// Restore a soft-deleted task; a live or unknown id is not found.
    pub fn restore(&self, id: i64) -> AppResult<TaskWithCategory> {
        let task = self.db.restore_task(id)?;
        info!(id, "Task restored");
        self.events
            .dispatch(MutationEvent::task(MutationAction::Restored, id));
        Ok(task)
    }

    pub fn force_delete(&self, id: i64) -> AppResult<()> {
        self.db.force_delete_task(id)?;
        info!(id, "Task permanently deleted");
        self.events
            .dispatch(MutationEvent::task(MutationAction::ForceDeleted, id));
        Ok(())
    }
}

/// Read-only task queries.
pub struct TaskQueryService {
    db: Arc<Database>,
}

impl TaskQueryService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn get_all_tasks(
        &self,
        filters: &TaskFilters,
        sorting: &TaskSorting,
        page: i64,
        per_page: i64,
    ) -> AppResult<TaskPage> {
        Ok(self.db.query_tasks(filters, sorting, page, per_page)?)
    }

    pub fn get_task_by_id(&self, id: i64) -> AppResult<TaskWithCategory> {
        self.db
            .get_task(id)?
            .ok_or_else(|| AppError::task_not_found(id))
    }

    /// Like `get_task_by_id` but also finds soft-deleted tasks.
    pub fn get_task_with_trashed(&self, id: i64) -> AppResult<TaskWithCategory> {
        self.db
            .get_task_with_trashed(id)?
            .ok_or_else(|| AppError::task_not_found(id))
    }

    /// Listing restricted to one category; other filters still apply.
    pub fn get_tasks_by_category(
        &self,
        category_id: i64,
        filters: &TaskFilters,
        sorting: &TaskSorting,
        page: i64,
        per_page: i64,
    ) -> AppResult<TaskPage> {
        let filters = TaskFilters {
            category_id: Some(category_id),
            ..filters.clone()
        };
        self.get_all_tasks(&filters, sorting, page, per_page)
    }

    pub fn list_all_light(&self, search: Option<&str>) -> AppResult<Vec<LightTask>> {
        Ok(self.db.list_recent_light(search)?)
    }

    /// Fresh counters; never cached.
    pub fn get_task_statistics(&self) -> AppResult<TaskStatistics> {
        Ok(self.db.get_task_statistics(today())?)
    }
}
