//! Process-lexical constructor registry.
//!
//! Rust has no runtime metadata describing constructor parameters, so types
//! that want `Binding::construct::<T>()` register their functoid here once,
//! typically from the module that defines the type or from a startup hook.
//! The table is guarded by a read-mostly lock; registration after startup is
//! expected to be rare.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::error::{DiError, DiResult};
use crate::functoid::Functoid;

static CONSTRUCTORS: Lazy<RwLock<HashMap<TypeId, Functoid>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers the constructor functoid for `T`.
///
/// The functoid must produce a `T`; later registrations replace earlier
/// ones.
///
/// # Examples
///
/// ```
/// use kiln_di::{register_constructor, registered_constructor, Functoid, Key};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Database { url: String }
///
/// register_constructor::<Database>(Functoid::of1(|config: Arc<Config>| Database {
///     url: config.url.clone(),
/// }));
///
/// let functoid = registered_constructor::<Database>().unwrap();
/// assert_eq!(functoid.deps(), &[Key::of::<Config>()]);
/// ```
pub fn register_constructor<T: 'static>(functoid: Functoid) {
    CONSTRUCTORS
        .write()
        .expect("constructor registry poisoned")
        .insert(TypeId::of::<T>(), functoid);
}

/// Looks up the registered constructor functoid for `T`.
pub fn registered_constructor<T: 'static>() -> DiResult<Functoid> {
    CONSTRUCTORS
        .read()
        .expect("constructor registry poisoned")
        .get(&TypeId::of::<T>())
        .cloned()
        .ok_or_else(|| DiError::FunctoidConstruction {
            reason: format!("no constructor registered for {}", std::any::type_name::<T>()),
        })
}

/// Whether a constructor is registered for `T`.
pub fn has_constructor<T: 'static>() -> bool {
    CONSTRUCTORS
        .read()
        .expect("constructor registry poisoned")
        .contains_key(&TypeId::of::<T>())
}
