//! Subcontexts: nested scopes over a parent locator.

use std::sync::Arc;

use crate::error::DiResult;
use crate::key::Key;
use crate::locator::Locator;

/// A nested scope: a child locator produced against a parent.
///
/// Ordinary lookups prefer the child and fall back to the parent;
/// collection lookups union both sides; [`close`](Subcontext::close)
/// releases the child only. Subcontexts nest to arbitrary depth — a
/// subcontext's locator is a perfectly good parent for the next one.
///
/// Created via
/// [`Injector::create_subcontext`](crate::Injector::create_subcontext).
pub struct Subcontext {
    child: Arc<Locator>,
}

impl Subcontext {
    pub(crate) fn new(child: Arc<Locator>) -> Subcontext {
        Subcontext { child }
    }

    /// The scope's own locator, chained to the parent. Use this as the
    /// parent of a deeper subcontext.
    pub fn locator(&self) -> &Arc<Locator> {
        &self.child
    }

    /// The parent locator this scope was created over.
    pub fn parent(&self) -> Option<&Arc<Locator>> {
        self.child.parent()
    }

    /// The value for `T`'s plain key, child first, else parent.
    pub fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.child.get::<T>()
    }

    /// The value for `T`'s named key.
    pub fn get_named<T: Send + Sync + 'static>(&self, id: &'static str) -> DiResult<Arc<T>> {
        self.child.get_named::<T>(id)
    }

    /// The value at an arbitrary key.
    pub fn get_by_key<T: Send + Sync + 'static>(&self, key: &Key) -> DiResult<Arc<T>> {
        self.child.get_by_key::<T>(key)
    }

    /// The value for `T`'s plain key, if present on either side.
    pub fn find<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.child.find::<T>()
    }

    /// Whether either side serves the key.
    pub fn has(&self, key: &Key) -> bool {
        self.child.has(key)
    }

    /// The union of the child's and all ancestors' collections for `T`.
    pub fn get_set<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.child.get_set::<T>()
    }

    /// The union for `T`'s named collection.
    pub fn get_set_named<T: Send + Sync + 'static>(
        &self,
        id: &'static str,
    ) -> DiResult<Vec<Arc<T>>> {
        self.child.get_set_named::<T>(id)
    }

    /// The keys this scope itself produced, parent excluded.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.child.keys()
    }

    /// Closes the child scope; the parent is unaffected.
    pub fn close(&self) -> DiResult<()> {
        self.child.close()
    }
}

impl std::fmt::Debug for Subcontext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subcontext({} own instances)", self.child.len())
    }
}
