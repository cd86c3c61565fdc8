//! Internal bag of release hooks with LIFO execution order.

use crate::error::FactoryError;

pub(crate) type ReleaseHook = Box<dyn FnOnce() -> Result<(), FactoryError> + Send>;

/// Holds release hooks registered against a locator. Hooks run in reverse
/// registration order; every hook runs even when earlier ones fail.
#[derive(Default)]
pub(crate) struct ReleaseBag {
    hooks: Vec<ReleaseHook>,
}

impl ReleaseBag {
    pub(crate) fn push(&mut self, hook: ReleaseHook) {
        self.hooks.push(hook);
    }

    /// Runs all hooks LIFO, collecting failures.
    pub(crate) fn drain_lifo(&mut self) -> Vec<FactoryError> {
        let mut errors = Vec::new();
        while let Some(hook) = self.hooks.pop() {
            if let Err(error) = hook() {
                errors.push(error);
            }
        }
        errors
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
