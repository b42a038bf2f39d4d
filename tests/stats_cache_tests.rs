//! Integration tests for the cached category statistics and the observers
//! that invalidate them after writes.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskdeck::cache::{CategoryStatsCache, MemoryCache};
use taskdeck::db::Database;
use taskdeck::events::{
    Entity, MutationAction, MutationDispatcher, MutationEvent, MutationObserver,
    StatsCacheInvalidator,
};
use taskdeck::services::Services;
use taskdeck::types::{CategoryInput, Priority, TaskInput, TaskStatus};

fn setup() -> (Arc<CategoryStatsCache>, Services) {
    let db = Arc::new(Database::open_in_memory().expect("Failed to create in-memory database"));
    let cache = Arc::new(CategoryStatsCache::in_memory());
    let services = Services::new(db, Arc::clone(&cache));
    (cache, services)
}

fn category(name: &str, parent_id: Option<i64>) -> CategoryInput {
    CategoryInput {
        name: name.to_string(),
        parent_id,
    }
}

fn task(title: &str, status: TaskStatus, category_id: Option<i64>) -> TaskInput {
    TaskInput {
        title: title.to_string(),
        description: None,
        status,
        priority: Priority::Medium,
        due_date: None,
        category_id,
    }
}

/// Populate the cache and confirm it is warm.
fn warm(cache: &CategoryStatsCache, services: &Services) {
    services.categories.statistics().unwrap();
    assert!(cache.is_cached());
}

#[test]
fn statistics_report_per_category_and_totals() {
    let (_cache, services) = setup();
    let work = services.categories.create(&category("Work", None)).unwrap();
    let home = services.categories.create(&category("Home", None)).unwrap();
    let w = Some(work.category.id);
    let h = Some(home.category.id);

    services.tasks.create(&task("a", TaskStatus::Pending, w)).unwrap();
    services.tasks.create(&task("b", TaskStatus::InProgress, w)).unwrap();
    services.tasks.create(&task("c", TaskStatus::Completed, w)).unwrap();
    services.tasks.create(&task("d", TaskStatus::Pending, h)).unwrap();
    services.tasks.create(&task("loose", TaskStatus::Pending, None)).unwrap();

    let stats = services.categories.statistics().unwrap();
    let names: Vec<&str> = stats.stats.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Home", "Work"]);

    let work_row = &stats.stats[1];
    assert_eq!(work_row.tasks_total_count, 3);
    assert_eq!(work_row.tasks_pending_count, 1);
    assert_eq!(work_row.tasks_in_progress_count, 1);
    assert_eq!(work_row.tasks_completed_count, 1);

    // Totals sum the per-category rows; uncategorized tasks are not counted
    assert_eq!(stats.totals.total, 4);
    assert_eq!(stats.totals.pending, 2);
}

#[test]
fn cached_report_is_served_until_invalidated() {
    let (cache, services) = setup();
    services.categories.create(&category("Work", None)).unwrap();

    warm(&cache, &services);
    assert!(cache.forget());
    assert!(!cache.is_cached());

    let stats = services.categories.statistics().unwrap();
    assert_eq!(stats.stats.len(), 1);
    assert!(cache.is_cached());
}

#[test]
fn category_mutations_invalidate() {
    let (cache, services) = setup();

    warm(&cache, &services);
    let a = services.categories.create(&category("A", None)).unwrap();
    assert!(!cache.is_cached());
    let id = a.category.id;

    warm(&cache, &services);
    services.categories.update(id, &category("A2", None)).unwrap();
    assert!(!cache.is_cached());

    warm(&cache, &services);
    services.categories.delete(id).unwrap();
    assert!(!cache.is_cached());

    warm(&cache, &services);
    services.categories.restore(id).unwrap();
    assert!(!cache.is_cached());

    warm(&cache, &services);
    services.categories.force_delete(id).unwrap();
    assert!(!cache.is_cached());
}

#[test]
fn task_mutations_invalidate() {
    let (cache, services) = setup();
    let work = services.categories.create(&category("Work", None)).unwrap();
    let w = Some(work.category.id);

    warm(&cache, &services);
    let t = services.tasks.create(&task("t", TaskStatus::Pending, w)).unwrap();
    assert!(!cache.is_cached());
    let id = t.task.id;

    warm(&cache, &services);
    services
        .tasks
        .update(id, &task("t", TaskStatus::Completed, w))
        .unwrap();
    assert!(!cache.is_cached());
    let stats = services.categories.statistics().unwrap();
    assert_eq!(stats.stats[0].tasks_completed_count, 1);

    warm(&cache, &services);
    services.tasks.delete(id).unwrap();
    assert!(!cache.is_cached());
    assert_eq!(services.categories.statistics().unwrap().totals.total, 0);

    warm(&cache, &services);
    services.tasks.restore(id).unwrap();
    assert!(!cache.is_cached());

    warm(&cache, &services);
    services.tasks.force_delete(id).unwrap();
    assert!(!cache.is_cached());
}

#[test]
fn failed_mutation_keeps_cache() {
    let (cache, services) = setup();
    let a = services.categories.create(&category("A", None)).unwrap();
    let b = services
        .categories
        .create(&category("B", Some(a.category.id)))
        .unwrap();

    warm(&cache, &services);
    services
        .categories
        .create(&category("C", Some(b.category.id)))
        .unwrap_err();
    services.tasks.delete(12345).unwrap_err();
    assert!(cache.is_cached());
}

#[test]
fn entries_expire_after_ttl() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let cache = Arc::new(CategoryStatsCache::new(
        Arc::new(MemoryCache::new()),
        Duration::from_millis(50),
    ));
    let services = Services::new(db, Arc::clone(&cache));

    warm(&cache, &services);
    std::thread::sleep(Duration::from_millis(80));
    assert!(!cache.is_cached());
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<MutationEvent>>,
}

impl MutationObserver for Recorder {
    fn on_mutation(&self, event: &MutationEvent) {
        self.seen.lock().unwrap().push(*event);
    }
}

#[test]
fn observers_see_committed_writes_in_order() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let cache = Arc::new(CategoryStatsCache::in_memory());
    let recorder = Arc::new(Recorder::default());
    let events = Arc::new(
        MutationDispatcher::new()
            .with_observer(Arc::new(StatsCacheInvalidator::new(Arc::clone(&cache))))
            .with_observer(Arc::clone(&recorder) as Arc<dyn MutationObserver>),
    );
    let services = Services::with_dispatcher(db, cache, events);

    let a = services.categories.create(&category("A", None)).unwrap();
    let t = services
        .tasks
        .create(&task("t", TaskStatus::Pending, Some(a.category.id)))
        .unwrap();
    services.tasks.delete(t.task.id).unwrap();
    services.tasks.delete(t.task.id).unwrap_err();

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            MutationEvent::new(Entity::Category, MutationAction::Created, a.category.id),
            MutationEvent::new(Entity::Task, MutationAction::Created, t.task.id),
            MutationEvent::new(Entity::Task, MutationAction::Deleted, t.task.id),
        ]
    );
}
