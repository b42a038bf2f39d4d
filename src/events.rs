//! Mutation events and observers.
//!
//! Services dispatch a `MutationEvent` after a write has committed. Observers
//! registered with the `MutationDispatcher` react to it; the stats cache
//! invalidator is the one every server installs.

use crate::cache::CategoryStatsCache;
use std::sync::Arc;
use tracing::debug;

/// Entity touched by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Task,
    Category,
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationAction {
    Created,
    Updated,
    Deleted,
    Restored,
    ForceDeleted,
}

/// A committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationEvent {
    pub entity: Entity,
    pub action: MutationAction,
    pub id: i64,
}

impl MutationEvent {
    pub fn new(entity: Entity, action: MutationAction, id: i64) -> Self {
        Self { entity, action, id }
    }

    pub fn task(action: MutationAction, id: i64) -> Self {
        Self::new(Entity::Task, action, id)
    }

    pub fn category(action: MutationAction, id: i64) -> Self {
        Self::new(Entity::Category, action, id)
    }

    /// Cache keys whose contents depend on this entity.
    pub fn affected_cache_keys(&self) -> &'static [&'static str] {
        match self.entity {
            Entity::Task | Entity::Category => &[CategoryStatsCache::KEY],
        }
    }
}

/// Receives mutation events after commit.
pub trait MutationObserver: Send + Sync {
    fn on_mutation(&self, event: &MutationEvent);
}

/// Fans events out to registered observers in registration order.
#[derive(Default)]
pub struct MutationDispatcher {
    observers: Vec<Arc<dyn MutationObserver>>,
}

impl MutationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: Arc<dyn MutationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn dispatch(&self, event: MutationEvent) {
        debug!(entity = ?event.entity, action = ?event.action, id = event.id, "Dispatching mutation event");
        for observer in &self.observers {
            observer.on_mutation(&event);
        }
    }
}

/// Forgets the category statistics on any task or category write.
pub struct StatsCacheInvalidator {
    cache: Arc<CategoryStatsCache>,
}

impl StatsCacheInvalidator {
    pub fn new(cache: Arc<CategoryStatsCache>) -> Self {
        Self { cache }
    }
}

impl MutationObserver for StatsCacheInvalidator {
    fn on_mutation(&self, event: &MutationEvent) {
        if event.affected_cache_keys().contains(&CategoryStatsCache::KEY) {
            let was_cached = self.cache.forget();
            debug!(
                entity = ?event.entity,
                action = ?event.action,
                was_cached,
                "Invalidated category statistics"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

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
    fn dispatch_reaches_every_observer() {
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let dispatcher = MutationDispatcher::new()
            .with_observer(a.clone())
            .with_observer(b.clone());
        assert_eq!(dispatcher.observer_count(), 2);

        dispatcher.dispatch(MutationEvent::task(MutationAction::Created, 1));
        dispatcher.dispatch(MutationEvent::category(MutationAction::Restored, 2));

        assert_eq!(a.seen.lock().unwrap().len(), 2);
        assert_eq!(
            b.seen.lock().unwrap()[1],
            MutationEvent::category(MutationAction::Restored, 2)
        );
    }

    #[test]
    fn every_entity_affects_the_stats_key() {
        for event in [
            MutationEvent::task(MutationAction::ForceDeleted, 1),
            MutationEvent::category(MutationAction::Updated, 1),
        ] {
            assert_eq!(event.affected_cache_keys(), &[CategoryStatsCache::KEY]);
        }
    }

    #[test]
    fn invalidator_forgets_cached_stats() {
        use crate::cache::{CacheStore, MemoryCache};
        use std::time::Duration;

        let store: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        store.put(
            CategoryStatsCache::KEY,
            serde_json::json!({"stats": [], "totals": {}}),
            Duration::from_secs(60),
        );
        let cache = Arc::new(CategoryStatsCache::new(store, Duration::from_secs(60)));
        assert!(cache.is_cached());

        let dispatcher =
            MutationDispatcher::new().with_observer(Arc::new(StatsCacheInvalidator::new(cache.clone())));
        dispatcher.dispatch(MutationEvent::task(MutationAction::Updated, 9));

        assert!(!cache.is_cached());
    }
}
