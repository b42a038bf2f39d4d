use crate::cache::CategoryStatsCache;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::events::{MutationAction, MutationDispatcher, MutationEvent};
use crate::types::{
    Category, CategoryInput, CategoryStatistics, CategoryWithCounts, CategoryWithRelations,
};
use std::sync::Arc;
use tracing::info;

/// Category queries and mutations.
pub struct CategoryService {
    db: Arc<Database>,
    stats_cache: Arc<CategoryStatsCache>,
    events: Arc<MutationDispatcher>,
}

impl CategoryService {
    pub fn new(
        db: Arc<Database>,
        stats_cache: Arc<CategoryStatsCache>,
        events: Arc<MutationDispatcher>,
    ) -> Self {
        Self {
            db,
            stats_cache,
            events,
        }
    }

    /// All live categories by name, flat, with parent and children.
    pub fn list(&self) -> AppResult<Vec<CategoryWithRelations>> {
        Ok(self.db.list_categories()?)
    }

    /// Root categories with their children.
    pub fn tree(&self) -> AppResult<Vec<CategoryWithRelations>> {
        Ok(self.db.list_category_tree()?)
    }

    /// Categories that may be chosen as a parent.
    pub fn roots(&self) -> AppResult<Vec<Category>> {
        Ok(self.db.list_root_categories()?)
    }

    pub fn with_counts(&self) -> AppResult<Vec<CategoryWithCounts>> {
        Ok(self.db.list_categories_with_counts()?)
    }

    pub fn trashed(&self) -> AppResult<Vec<Category>> {
        Ok(self.db.list_trashed_categories()?)
    }

    pub fn get(&self, id: i64) -> AppResult<CategoryWithRelations> {
        self.db
            .get_category(id)?
            .ok_or_else(|| AppError::category_not_found(id))
    }

    /// Like `get` but also finds soft-deleted categories, without relations.
    pub fn get_with_trashed(&self, id: i64) -> AppResult<Category> {
        self.db
            .get_category_with_trashed(id)?
            .ok_or_else(|| AppError::category_not_found(id))
    }

    pub fn create(&self, input: &CategoryInput) -> AppResult<CategoryWithRelations> {
        let category = self.db.create_category(input)?;
        info!(id = category.category.id, name = %category.category.name, "Category created");
        self.events
            .dispatch(MutationEvent::category(MutationAction::Created, category.category.id));
        Ok(category)
    }

    pub fn update(&self, id: i64, input: &CategoryInput) -> AppResult<CategoryWithRelations> {
        let category = self.db.update_category(id, input)?;
        info!(id, "Category updated");
        self.events
            .dispatch(MutationEvent::category(MutationAction::Updated, id));
        Ok(category)
    }

    pub fn delete(&self, id: i64) -> AppResult<Category> {
        let category = self.db.delete_category(id)?;
        info!(id, "Category moved to trash");
        self.events
            .dispatch(MutationEvent::category(MutationAction::Deleted, id));
        Ok(category)
    }

    pub fn restore(&self, id: i64) -> AppResult<CategoryWithRelations> {
        let category = self.db.restore_category(id)?;
        info!(id, "Category restored");
        self.events
            .dispatch(MutationEvent::category(MutationAction::Restored, id));
        Ok(category)
    }

    pub fn force_delete(&self, id: i64) -> AppResult<()> {
        self.db.force_delete_category(id)?;
        info!(id, "Category permanently deleted");
        self.events
            .dispatch(MutationEvent::category(MutationAction::ForceDeleted, id));
        Ok(())
    }

    /// Per-category task counts and totals, served from the stats cache.
    pub fn statistics(&self) -> AppResult<CategoryStatistics> {
        Ok(self.stats_cache.remember(&self.db)?)
    }
}
