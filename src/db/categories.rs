//! Category CRUD and two-level tree invariants.

use super::stats::fetch_category_stats;
use super::{Database, now_ms};
use crate::error::{AppError, ErrorCode};
use crate::types::{
    Category, CategoryInput, CategoryRef, CategoryWithCounts, CategoryWithRelations,
};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;

const CATEGORY_COLUMNS: &str = "c.id, c.name, c.parent_id, c.created_at, c.updated_at, c.deleted_at";

pub fn parse_category_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get("id")?,
        name: row.get("name")?,
        parent_id: row.get("parent_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

impl From<&Category> for CategoryRef {
    fn from(category: &Category) -> Self {
        CategoryRef {
            id: category.id,
            name: category.name.clone(),
            parent_id: category.parent_id,
        }
    }
}

/// Look up a category by id. Soft-deleted rows are only returned when
/// `include_trashed` is set.
pub(crate) fn find_category(
    conn: &Connection,
    id: i64,
    include_trashed: bool,
) -> Result<Option<Category>> {
    let sql = if include_trashed {
        format!("SELECT {} FROM categories c WHERE c.id = ?1", CATEGORY_COLUMNS)
    } else {
        format!(
            "SELECT {} FROM categories c WHERE c.id = ?1 AND c.deleted_at IS NULL",
            CATEGORY_COLUMNS
        )
    };
    let category = conn
        .query_row(&sql, params![id], parse_category_row)
        .optional()?;
    Ok(category)
}

fn find_trashed_category(conn: &Connection, id: i64) -> Result<Option<Category>> {
    let sql = format!(
        "SELECT {} FROM categories c WHERE c.id = ?1 AND c.deleted_at IS NOT NULL",
        CATEGORY_COLUMNS
    );
    let category = conn
        .query_row(&sql, params![id], parse_category_row)
        .optional()?;
    Ok(category)
}

/// Ids of every direct child, soft-deleted ones included.
fn child_ids(conn: &Connection, id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM categories WHERE parent_id = ?1")?;
    let ids = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

/// Check a prospective parent for a category being created (`category_id`
/// is `None`) or updated.
pub(crate) fn validate_parent(
    conn: &Connection,
    category_id: Option<i64>,
    parent_id: Option<i64>,
) -> Result<()> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };

    if category_id == Some(parent_id) {
        return Err(AppError::self_parent().into());
    }

    let Some(parent) = find_category(conn, parent_id, false)? else {
        return Err(
            AppError::invalid_value("parent_id", "Selected parent category is invalid.").into(),
        );
    };

    let children = match category_id {
        Some(id) => child_ids(conn, id)?,
        None => Vec::new(),
    };

    if children.contains(&parent_id) {
        return Err(AppError::category_cycle().into());
    }

    if parent.parent_id.is_some() {
        return Err(AppError::hierarchy_too_deep().into());
    }

    // Nesting a category that has its own children would push them to a third level.
    if !children.is_empty() {
        return Err(AppError::new(
            ErrorCode::HierarchyTooDeep,
            "A category with subcategories cannot be placed under another category.",
        )
        .with_field("parent_id")
        .into());
    }

    Ok(())
}

/// Load a category with its live parent and live children.
fn load_relations(conn: &Connection, category: Category) -> Result<CategoryWithRelations> {
    let parent = match category.parent_id {
        Some(parent_id) => find_category(conn, parent_id, false)?.map(|p| CategoryRef::from(&p)),
        None => None,
    };

    let mut stmt = conn.prepare(
        "SELECT id, name, parent_id FROM categories
         WHERE parent_id = ?1 AND deleted_at IS NULL
         ORDER BY name, id",
    )?;
    let children = stmt
        .query_map(params![category.id], |row| {
            Ok(CategoryRef {
                id: row.get(0)?,
                name: row.get(1)?,
                parent_id: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(CategoryWithRelations {
        category,
        parent,
        children,
    })
}

/// Reload a category by id with relations, soft-deleted rows included.
fn reload(conn: &Connection, id: i64) -> Result<CategoryWithRelations> {
    let category =
        find_category(conn, id, true)?.ok_or_else(|| AppError::category_not_found(id))?;
    load_relations(conn, category)
}

/// Attach parents and children to a list of categories from one snapshot
/// of the live rows.
fn attach_relations(live: &[Category], selected: Vec<Category>) -> Vec<CategoryWithRelations> {
    let by_id: HashMap<i64, &Category> = live.iter().map(|c| (c.id, c)).collect();
    let mut children: HashMap<i64, Vec<CategoryRef>> = HashMap::new();
    for category in live {
        if let Some(parent_id) = category.parent_id {
            children
                .entry(parent_id)
                .or_default()
                .push(CategoryRef::from(category));
        }
    }

    selected
        .into_iter()
        .map(|category| {
            let parent = category
                .parent_id
                .and_then(|pid| by_id.get(&pid))
                .map(|p| CategoryRef::from(*p));
            let children = children.get(&category.id).cloned().unwrap_or_default();
            CategoryWithRelations {
                category,
                parent,
                children,
            }
        })
        .collect()
}

fn live_categories(conn: &Connection) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories c WHERE c.deleted_at IS NULL ORDER BY c.name, c.id",
        CATEGORY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let categories = stmt
        .query_map([], parse_category_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(categories)
}

impl Database {
    /// Create a category after checking the parent against the tree rules.
    pub fn create_category(&self, input: &CategoryInput) -> Result<CategoryWithRelations> {
        self.with_transaction(|tx| {
            validate_parent(tx, None, input.parent_id)?;

            let now = now_ms();
            tx.execute(
                "INSERT INTO categories (name, parent_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![input.name, input.parent_id, now],
            )?;
            let id = tx.last_insert_rowid();

            reload(tx, id)
        })
    }

    /// Update a live category in place.
    pub fn update_category(&self, id: i64, input: &CategoryInput) -> Result<CategoryWithRelations> {
        self.with_transaction(|tx| {
            if find_category(tx, id, false)?.is_none() {
                return Err(AppError::category_not_found(id).into());
            }

            validate_parent(tx, Some(id), input.parent_id)?;

            tx.execute(
                "UPDATE categories SET name = ?1, parent_id = ?2, updated_at = ?3 WHERE id = ?4",
                params![input.name, input.parent_id, now_ms(), id],
            )?;

            reload(tx, id)
        })
    }

    /// Soft-delete a live category. Children and tasks are left untouched.
    pub fn delete_category(&self, id: i64) -> Result<Category> {
        self.with_transaction(|tx| {
            let now = now_ms();
            let updated = tx.execute(
                "UPDATE categories SET deleted_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NULL",
                params![now, id],
            )?;
            if updated == 0 {
                return Err(AppError::category_not_found(id).into());
            }
            find_category(tx, id, true)?.ok_or_else(|| AppError::category_not_found(id).into())
        })
    }

    /// Restore a soft-deleted category.
    pub fn restore_category(&self, id: i64) -> Result<CategoryWithRelations> {
        self.with_transaction(|tx| {
            if find_trashed_category(tx, id)?.is_none() {
                return Err(AppError::category_not_found(id).into());
            }

            tx.execute(
                "UPDATE categories SET deleted_at = NULL, updated_at = ?1 WHERE id = ?2",
                params![now_ms(), id],
            )?;

            reload(tx, id)
        })
    }

    /// Permanently remove a category, live or trashed.
    ///
    /// Children become roots and tasks lose their category through the
    /// `ON DELETE SET NULL` foreign keys.
    pub fn force_delete_category(&self, id: i64) -> Result<()> {
        self.with_transaction(|tx| {
            let deleted = tx.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(AppError::category_not_found(id).into());
            }
            Ok(())
        })
    }

    /// Get a live category with relations.
    pub fn get_category(&self, id: i64) -> Result<Option<CategoryWithRelations>> {
        self.with_conn(|conn| match find_category(conn, id, false)? {
            Some(category) => Ok(Some(load_relations(conn, category)?)),
            None => Ok(None),
        })
    }

    /// Get a category whether or not it is soft-deleted.
    pub fn get_category_with_trashed(&self, id: i64) -> Result<Option<Category>> {
        self.with_conn(|conn| find_category(conn, id, true))
    }

    /// All live categories ordered by name, with parent and children.
    pub fn list_categories(&self) -> Result<Vec<CategoryWithRelations>> {
        self.with_conn(|conn| {
            let live = live_categories(conn)?;
            let selected = live.clone();
            Ok(attach_relations(&live, selected))
        })
    }

    /// Live root categories with their children populated.
    pub fn list_category_tree(&self) -> Result<Vec<CategoryWithRelations>> {
        self.with_conn(|conn| {
            let live = live_categories(conn)?;
            let roots = live.iter().filter(|c| c.is_root()).cloned().collect();
            Ok(attach_relations(&live, roots))
        })
    }

    /// Live categories without a parent, ordered by name.
    pub fn list_root_categories(&self) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM categories c
                 WHERE c.parent_id IS NULL AND c.deleted_at IS NULL
                 ORDER BY c.name, c.id",
                CATEGORY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let roots = stmt
                .query_map([], parse_category_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(roots)
        })
    }

    /// Soft-deleted categories, most recently deleted first.
    pub fn list_trashed_categories(&self) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM categories c
                 WHERE c.deleted_at IS NOT NULL
                 ORDER BY c.deleted_at DESC, c.id DESC",
                CATEGORY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let trashed = stmt
                .query_map([], parse_category_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(trashed)
        })
    }

    /// Live categories with relations and per-status task counts.
    pub fn list_categories_with_counts(&self) -> Result<Vec<CategoryWithCounts>> {
        self.with_conn(|conn| {
            let live = live_categories(conn)?;
            let counts: HashMap<i64, _> = fetch_category_stats(conn)?
                .into_iter()
                .map(|row| (row.id, row.counts()))
                .collect();
            let selected = live.clone();
            Ok(attach_relations(&live, selected)
                .into_iter()
                .map(|category| {
                    let counts = counts
                        .get(&category.category.id)
                        .copied()
                        .unwrap_or_default();
                    CategoryWithCounts { category, counts }
                })
                .collect())
        })
    }
}
