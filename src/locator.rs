//! Locators: the instance store a production run returns.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{DiError, DiResult, FactoryError};
use crate::functoid::AnyArc;
use crate::internal::release_bag::ReleaseBag;
use crate::key::Key;

/// The value stored at a collection key: the produced elements in plan
/// order, deduplicated by identity.
pub(crate) struct SetInstances(pub(crate) Vec<AnyArc>);

/// The immutable result of a production run: a map from keys to produced
/// values, optionally chained to a parent locator.
///
/// Lookups fall through to ancestors, so a locator produced with a parent
/// behaves as one nested scope. Collection lookups union the element sets
/// found along the whole chain. The locator never hands out anything it did
/// not produce or inherit; it holds no other state besides its release
/// hooks.
///
/// # Examples
///
/// ```
/// use kiln_di::{Binding, Injector, Key, Module, ProduceOptions};
///
/// struct Config { url: String }
///
/// let module = Module::new().with(Binding::instance(Config { url: "db://x".into() }));
/// let locator = Injector::new()
///     .produce(&module, vec![Key::of::<Config>()], &ProduceOptions::default())
///     .unwrap();
///
/// let config = locator.get::<Config>().unwrap();
/// assert_eq!(config.url, "db://x");
/// assert!(locator.find::<String>().is_none());
/// ```
pub struct Locator {
    instances: HashMap<Key, AnyArc>,
    parent: Option<Arc<Locator>>,
    releases: Mutex<ReleaseBag>,
}

impl Locator {
    pub(crate) fn from_parts(
        instances: HashMap<Key, AnyArc>,
        parent: Option<Arc<Locator>>,
    ) -> Arc<Locator> {
        Arc::new(Locator { instances, parent, releases: Mutex::new(ReleaseBag::default()) })
    }

    /// The value for `T`'s plain key.
    pub fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.get_by_key(&Key::of::<T>())
    }

    /// The value for `T`'s named key.
    pub fn get_named<T: Send + Sync + 'static>(&self, id: &'static str) -> DiResult<Arc<T>> {
        self.get_by_key(&Key::named::<T>(id))
    }

    /// The value stored at an arbitrary key, downcast to `T`.
    pub fn get_by_key<T: Send + Sync + 'static>(&self, key: &Key) -> DiResult<Arc<T>> {
        let value = self
            .find_value(key)
            .ok_or_else(|| DiError::InstanceNotFound { key: key.clone() })?;
        value
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch { key: key.clone() })
    }

    /// The value for `T`'s plain key, if present anywhere in the chain.
    pub fn find<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.find_by_key(&Key::of::<T>())
    }

    /// The value at a key, if present and of type `T`.
    pub fn find_by_key<T: Send + Sync + 'static>(&self, key: &Key) -> Option<Arc<T>> {
        self.find_value(key).and_then(|v| v.downcast::<T>().ok())
    }

    /// Whether a key is served by this locator or any ancestor.
    pub fn has(&self, key: &Key) -> bool {
        self.instances.contains_key(key)
            || self.parent.as_ref().is_some_and(|p| p.has(key))
    }

    pub(crate) fn find_value(&self, key: &Key) -> Option<AnyArc> {
        if let Some(value) = self.instances.get(key) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.find_value(key))
    }

    /// The elements of `T`'s collection, unioned across the locator chain.
    ///
    /// Ancestors' elements come first; elements are deduplicated by
    /// identity. A chain with no collection at the key yields an empty
    /// vector.
    pub fn get_set<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.get_set_by_key(&Key::set_of::<T>())
    }

    /// The elements of `T`'s named collection.
    pub fn get_set_named<T: Send + Sync + 'static>(
        &self,
        id: &'static str,
    ) -> DiResult<Vec<Arc<T>>> {
        self.get_set_by_key(&Key::named_set_of::<T>(id))
    }

    /// The elements of the collection at an arbitrary set key.
    pub fn get_set_by_key<T: Send + Sync + 'static>(&self, key: &Key) -> DiResult<Vec<Arc<T>>> {
        let mut merged: Vec<AnyArc> = Vec::new();
        self.collect_set(key, &mut merged);
        merged
            .into_iter()
            .map(|value| {
                value
                    .downcast::<T>()
                    .map_err(|_| DiError::TypeMismatch { key: key.clone() })
            })
            .collect()
    }

    fn collect_set(&self, key: &Key, out: &mut Vec<AnyArc>) {
        if let Some(parent) = &self.parent {
            parent.collect_set(key, out);
        }
        if let Some(value) = self.instances.get(key) {
            if let Some(set) = value.downcast_ref::<SetInstances>() {
                for item in &set.0 {
                    if !out.iter().any(|existing| Arc::ptr_eq(existing, item)) {
                        out.push(item.clone());
                    }
                }
            }
        }
    }

    /// The keys this locator itself holds, ancestors excluded.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.instances.keys()
    }

    /// Number of instances this locator itself holds.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether this locator itself holds no instances.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// The parent locator, if this one was produced inside a scope.
    pub fn parent(&self) -> Option<&Arc<Locator>> {
        self.parent.as_ref()
    }

    /// Registers a hook to run when this locator is closed. Hooks run in
    /// reverse registration order.
    pub fn on_close<F>(&self, hook: F)
    where
        F: FnOnce() -> Result<(), FactoryError> + Send + 'static,
    {
        self.releases
            .lock()
            .expect("release bag poisoned")
            .push(Box::new(hook));
    }

    /// Runs all registered release hooks in LIFO order.
    ///
    /// Every hook runs even when earlier ones fail; failures are collected
    /// into [`DiError::AggregateCleanup`]. Ancestors are not touched.
    /// Closing twice is a no-op.
    pub fn close(&self) -> DiResult<()> {
        let errors = self
            .releases
            .lock()
            .expect("release bag poisoned")
            .drain_lifo();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DiError::AggregateCleanup {
                errors: errors.into_iter().map(Arc::from).collect(),
            })
        }
    }
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Locator({} instances{})",
            self.instances.len(),
            if self.parent.is_some() { ", nested" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Config;

    #[test]
    fn lookups_fall_through_to_ancestors() {
        let mut parent_instances: HashMap<Key, AnyArc> = HashMap::new();
        parent_instances.insert(Key::of::<Config>(), Arc::new(Config));
        let parent = Locator::from_parts(parent_instances, None);
        let child = Locator::from_parts(HashMap::new(), Some(parent));

        assert!(child.has(&Key::of::<Config>()));
        assert!(child.get::<Config>().is_ok());
        assert_eq!(child.keys().count(), 0);
    }

    #[test]
    fn close_aggregates_hook_failures() {
        let locator = Locator::from_parts(HashMap::new(), None);
        locator.on_close(|| Ok(()));
        locator.on_close(|| Err("flush failed".into()));

        match locator.close() {
            Err(DiError::AggregateCleanup { errors }) => assert_eq!(errors.len(), 1),
            other => panic!("expected aggregate cleanup error, got {:?}", other),
        }
        // Second close has nothing left to run.
        assert!(locator.close().is_ok());
    }
}
