//! The binding sum type: one declaration of how to produce a value for a key.

use std::fmt;
use std::sync::Arc;

use crate::axis::{AxisPoint, BindingTags};
use crate::error::DiResult;
use crate::functoid::{AnyArc, Functoid};
use crate::key::Key;
use crate::registry;

/// One wiring declaration: a key, optional axis tags, and a way to produce
/// the value.
///
/// Bindings are assembled into a [`Module`](crate::Module) and resolved by
/// the planner; nothing runs until production. The `tagged`, `named`, and
/// `weak` builders refine a binding in place.
///
/// # Examples
///
/// ```
/// use kiln_di::{Axis, Binding, Functoid};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Database { url: String }
///
/// let env = Axis::new("env", &["prod", "dev"]);
///
/// let config = Binding::instance(Config { url: "db://prod".into() })
///     .tagged(env.point("prod"));
/// let database = Binding::factory::<Database>(Functoid::of1(|c: Arc<Config>| Database {
///     url: c.url.clone(),
/// }));
/// # let _ = (config, database);
/// ```
#[derive(Clone)]
pub struct Binding {
    key: Key,
    tags: BindingTags,
    kind: BindingKind,
}

/// The six ways a binding can produce its value.
#[derive(Clone)]
pub enum BindingKind {
    /// A pre-built value.
    Instance(AnyArc),
    /// A type constructed from DI'd arguments via its registered or supplied
    /// constructor functoid.
    Construct(Functoid),
    /// An ad-hoc factory functoid, possibly asynchronous.
    Factory(Functoid),
    /// Forwards to another key's instance.
    Alias(Key),
    /// Contributes one element to the collection at this binding's set key.
    Element(SetElement),
    /// Produces a curried factory handle taking runtime arguments.
    Assisted(AssistedSpec),
}

impl BindingKind {
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            BindingKind::Instance(_) => "instance",
            BindingKind::Construct(_) => "construct",
            BindingKind::Factory(_) => "factory",
            BindingKind::Alias(_) => "alias",
            BindingKind::Element(_) => "element",
            BindingKind::Assisted(_) => "assisted",
        }
    }
}

/// One contribution to a collection key.
#[derive(Clone)]
pub struct SetElement {
    pub(crate) source: ElementSource,
    pub(crate) weak: bool,
}

/// How a set element produces its value.
#[derive(Clone)]
pub enum ElementSource {
    /// A pre-built value.
    Instance(AnyArc),
    /// Constructed from DI'd arguments.
    Construct(Functoid),
    /// Built by a factory functoid.
    Factory(Functoid),
}

impl ElementSource {
    pub(crate) fn deps(&self) -> Vec<Key> {
        match self {
            ElementSource::Instance(_) => Vec::new(),
            ElementSource::Construct(f) | ElementSource::Factory(f) => f.deps().to_vec(),
        }
    }

    pub(crate) fn is_async(&self) -> bool {
        match self {
            ElementSource::Instance(_) => false,
            ElementSource::Construct(f) | ElementSource::Factory(f) => f.is_async(),
        }
    }
}

/// An assisted factory: a functoid whose leading parameters are supplied by
/// the caller at invocation time rather than resolved from the graph.
#[derive(Clone)]
pub struct AssistedSpec {
    pub(crate) functoid: Functoid,
    pub(crate) runtime_params: Vec<&'static str>,
}

impl Binding {
    fn new(key: Key, kind: BindingKind) -> Binding {
        Binding { key, tags: BindingTags::empty(), kind }
    }

    /// Binds a pre-built value at its own type's key.
    pub fn instance<T: Send + Sync + 'static>(value: T) -> Binding {
        Binding::new(Key::of::<T>(), BindingKind::Instance(Arc::new(value)))
    }

    /// Binds a pre-built, already type-erased value at an explicit key.
    pub fn instance_at(key: Key, value: AnyArc) -> Binding {
        Binding::new(key, BindingKind::Instance(value))
    }

    /// Binds `T` to its registered constructor.
    ///
    /// Fails when no constructor was registered for `T` via
    /// [`register_constructor`](crate::register_constructor).
    pub fn construct<T: 'static>() -> DiResult<Binding> {
        let functoid = registry::registered_constructor::<T>()?;
        Ok(Binding::new(Key::of::<T>(), BindingKind::Construct(functoid)))
    }

    /// Binds `T` to an explicitly supplied constructor functoid.
    pub fn construct_with<T: 'static>(functoid: Functoid) -> Binding {
        Binding::new(Key::of::<T>(), BindingKind::Construct(functoid))
    }

    /// Binds `T` to a factory functoid.
    pub fn factory<T: 'static>(functoid: Functoid) -> Binding {
        Binding::new(Key::of::<T>(), BindingKind::Factory(functoid))
    }

    /// Binds an explicit key to a factory functoid.
    pub fn factory_at(key: Key, functoid: Functoid) -> Binding {
        Binding::new(key, BindingKind::Factory(functoid))
    }

    /// Binds `T` as an alias of `Target`.
    pub fn alias<T: 'static, Target: 'static>() -> Binding {
        Binding::new(Key::of::<T>(), BindingKind::Alias(Key::of::<Target>()))
    }

    /// Binds an explicit key as an alias of another key.
    pub fn alias_at(key: Key, target: Key) -> Binding {
        Binding::new(key, BindingKind::Alias(target))
    }

    /// Contributes a pre-built value to the collection of `T`.
    pub fn element_instance<T: Send + Sync + 'static>(value: T) -> Binding {
        Binding::new(
            Key::set_of::<T>(),
            BindingKind::Element(SetElement {
                source: ElementSource::Instance(Arc::new(value)),
                weak: false,
            }),
        )
    }

    /// Contributes a constructed value to the collection of `T`.
    pub fn element_construct<T: 'static>(functoid: Functoid) -> Binding {
        Binding::new(
            Key::set_of::<T>(),
            BindingKind::Element(SetElement {
                source: ElementSource::Construct(functoid),
                weak: false,
            }),
        )
    }

    /// Contributes a factory-built value to the collection of `T`.
    pub fn element_factory<T: 'static>(functoid: Functoid) -> Binding {
        Binding::new(
            Key::set_of::<T>(),
            BindingKind::Element(SetElement {
                source: ElementSource::Factory(functoid),
                weak: false,
            }),
        )
    }

    /// Binds `T` to an assisted factory handle.
    ///
    /// The functoid's first `runtime_params.len()` parameters are supplied by
    /// the caller when the handle is invoked; the remaining parameters are
    /// planned like ordinary dependencies and resolved from the locator on
    /// every call. Fails when more runtime parameters are named than the
    /// functoid has.
    pub fn assisted<T: 'static>(
        functoid: Functoid,
        runtime_params: &[&'static str],
    ) -> DiResult<Binding> {
        if runtime_params.len() > functoid.arity() {
            return Err(crate::error::DiError::FunctoidConstruction {
                reason: format!(
                    "{} runtime parameters named but callable takes {}",
                    runtime_params.len(),
                    functoid.arity()
                ),
            });
        }
        Ok(Binding::new(
            Key::of::<T>(),
            BindingKind::Assisted(AssistedSpec {
                functoid,
                runtime_params: runtime_params.to_vec(),
            }),
        ))
    }

    /// Attaches an id to this binding's key.
    pub fn named(mut self, id: &'static str) -> Binding {
        self.key = self.key.with_id(id);
        self
    }

    /// Tags this binding with an axis point.
    ///
    /// # Panics
    ///
    /// Panics when the binding is already tagged on the same axis.
    pub fn tagged(mut self, point: AxisPoint) -> Binding {
        self.tags.insert(point);
        self
    }

    /// Marks a set element as weak: the planner drops it silently when its
    /// dependencies cannot be resolved.
    ///
    /// # Panics
    ///
    /// Panics when called on a binding that is not a set element.
    pub fn weak(mut self) -> Binding {
        match &mut self.kind {
            BindingKind::Element(element) => element.weak = true,
            other => panic!("only set elements can be weak, this is a {} binding", other.kind_name()),
        }
        self
    }

    /// The key this binding is looked up by.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The axis tags.
    pub fn tags(&self) -> &BindingTags {
        &self.tags
    }

    /// The binding kind.
    pub fn kind(&self) -> &BindingKind {
        &self.kind
    }

    pub(crate) fn is_element(&self) -> bool {
        matches!(self.kind, BindingKind::Element(_))
    }

    /// One-line description for conflict reports.
    pub fn describe(&self) -> String {
        format!("{} ({}, {})", self.key, self.kind.kind_name(), self.tags.describe())
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binding({})", self.describe())
    }
}
