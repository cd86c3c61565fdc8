//! Modules: ordered collections of bindings with merge and override.

use std::collections::HashSet;

use crate::binding::Binding;
use crate::error::DiResult;
use crate::key::Key;

/// An ordered sequence of bindings.
///
/// Modules compose two ways: [`append`](Module::append) keeps everything
/// from both sides, while [`overridden_by`](Module::overridden_by) lets an
/// overlay replace the base's bindings per key — the shape used for test
/// doubles. Set elements are never overridden; they accumulate from both
/// sides, which is what plugin-style collections want.
///
/// # Examples
///
/// ```
/// use kiln_di::{Binding, Module};
///
/// struct Config { url: String }
///
/// let base = Module::new().with(Binding::instance(Config { url: "db://real".into() }));
/// let test = Module::new().with(Binding::instance(Config { url: "db://fake".into() }));
///
/// let merged = base.overridden_by(test);
/// assert_eq!(merged.len(), 1); // the overlay's Config replaced the base's
/// ```
#[derive(Default, Clone)]
pub struct Module {
    bindings: Vec<Binding>,
}

impl Module {
    /// An empty module.
    pub fn new() -> Module {
        Module::default()
    }

    /// Appends one binding.
    pub fn add(&mut self, binding: Binding) -> &mut Module {
        self.bindings.push(binding);
        self
    }

    /// Appends one binding, builder-style.
    pub fn with(mut self, binding: Binding) -> Module {
        self.bindings.push(binding);
        self
    }

    /// Installs a [`ModuleDef`], letting it add its bindings.
    pub fn install<M: ModuleDef>(&mut self, def: M) -> DiResult<&mut Module> {
        def.configure(self)?;
        Ok(self)
    }

    /// Concatenates two modules; all bindings coexist.
    pub fn append(mut self, other: Module) -> Module {
        self.bindings.extend(other.bindings);
        self
    }

    /// Merges with an overlay whose bindings win per key.
    ///
    /// Every key that the overlay binds with a non-set binding loses the
    /// base's non-set bindings for that key; the overlay's bindings are kept
    /// in full so a tagged family can replace a single base binding. Set
    /// elements from both sides are always retained.
    pub fn overridden_by(self, overlay: Module) -> Module {
        let overridden: HashSet<Key> = overlay
            .bindings
            .iter()
            .filter(|b| !b.is_element())
            .map(|b| b.key().clone())
            .collect();
        let mut bindings: Vec<Binding> = self
            .bindings
            .into_iter()
            .filter(|b| b.is_element() || !overridden.contains(b.key()))
            .collect();
        bindings.extend(overlay.bindings);
        Module { bindings }
    }

    /// The bindings, in declaration order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// All distinct keys, in first-declaration order.
    pub fn keys(&self) -> Vec<Key> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for binding in &self.bindings {
            if seen.insert(binding.key().clone()) {
                keys.push(binding.key().clone());
            }
        }
        keys
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the module has no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A reusable unit of wiring that registers bindings into a module.
///
/// # Examples
///
/// ```
/// use kiln_di::{Binding, DiResult, Module, ModuleDef};
///
/// struct Config { url: String }
///
/// struct StorageModule { url: String }
///
/// impl ModuleDef for StorageModule {
///     fn configure(self, module: &mut Module) -> DiResult<()> {
///         module.add(Binding::instance(Config { url: self.url }));
///         Ok(())
///     }
/// }
///
/// let mut module = Module::new();
/// module.install(StorageModule { url: "db://x".into() }).unwrap();
/// assert_eq!(module.len(), 1);
/// ```
pub trait ModuleDef {
    /// Adds this unit's bindings to the module.
    fn configure(self, module: &mut Module) -> DiResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Config;
    struct Plugin;

    #[test]
    fn append_keeps_everything() {
        let a = Module::new().with(Binding::instance(Config));
        let b = Module::new().with(Binding::instance(Config));
        assert_eq!(a.append(b).len(), 2);
    }

    #[test]
    fn append_with_empty_is_identity() {
        let module = Module::new()
            .with(Binding::instance(Config))
            .with(Binding::element_instance(Plugin));
        let keys = module.keys();
        let appended = module.append(Module::new());
        assert_eq!(appended.len(), 2);
        assert_eq!(appended.keys(), keys);
    }

    #[test]
    fn override_replaces_non_set_bindings_only() {
        let base = Module::new()
            .with(Binding::instance(Config))
            .with(Binding::element_instance(Plugin));
        let overlay = Module::new()
            .with(Binding::instance(Config))
            .with(Binding::element_instance(Plugin));

        let merged = base.overridden_by(overlay);
        let configs = merged
            .bindings()
            .iter()
            .filter(|b| b.key() == &Key::of::<Config>())
            .count();
        let plugins = merged
            .bindings()
            .iter()
            .filter(|b| b.key() == &Key::set_of::<Plugin>())
            .count();
        assert_eq!(configs, 1);
        assert_eq!(plugins, 2);
    }

    #[test]
    fn override_with_empty_is_identity() {
        let module = Module::new().with(Binding::instance(Config));
        assert_eq!(module.overridden_by(Module::new()).len(), 1);
    }
}
