//! Assisted factories: curried handles mixing runtime and DI'd arguments.

use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use crate::binding::AssistedSpec;
use crate::error::{DiError, DiResult};
use crate::functoid::{AnyArc, Functoid};
use crate::key::Key;
use crate::locator::Locator;

/// The instance stored for an assisted binding: call it with the runtime
/// arguments and it supplies the DI'd tail itself.
///
/// The functoid's first parameters correspond to the declared runtime
/// parameter names; the remaining parameters are resolved against the
/// locator the production run returned, freshly on every call. The planner
/// plans those tail keys like ordinary dependencies so the values exist by
/// call time, though the handle's own step imposes no ordering on them.
/// The handle holds the locator weakly, so it does not keep a scope alive;
/// calling it after the locator is dropped fails.
///
/// # Examples
///
/// ```
/// use kiln_di::{AssistedHandle, Binding, Functoid, Injector, Key, Module, ProduceOptions};
/// use std::sync::Arc;
///
/// struct Greeting { prefix: String }
/// struct Greeter { line: String }
///
/// let functoid = Functoid::of2(|name: Arc<String>, greeting: Arc<Greeting>| Greeter {
///     line: format!("{} {}", greeting.prefix, name),
/// });
///
/// let module = Module::new()
///     .with(Binding::instance(Greeting { prefix: "hello".into() }))
///     .with(Binding::assisted::<Greeter>(functoid, &["name"]).unwrap());
///
/// let locator = Injector::new()
///     .produce(&module, vec![Key::of::<Greeter>()], &ProduceOptions::default())
///     .unwrap();
///
/// let factory = locator.get_by_key::<AssistedHandle>(&Key::of::<Greeter>()).unwrap();
/// let greeter = factory.call_as::<Greeter>(vec![Arc::new("world".to_string())]).unwrap();
/// assert_eq!(greeter.line, "hello world");
/// ```
pub struct AssistedHandle {
    key: Key,
    functoid: Functoid,
    runtime_params: Vec<&'static str>,
    locator: OnceCell<Weak<Locator>>,
}

impl AssistedHandle {
    pub(crate) fn new(key: Key, spec: AssistedSpec) -> AssistedHandle {
        AssistedHandle {
            key,
            functoid: spec.functoid,
            runtime_params: spec.runtime_params,
            locator: OnceCell::new(),
        }
    }

    /// Binds the locator the handle resolves its DI'd tail against. Set
    /// once by the producer after the locator exists.
    pub(crate) fn bind(&self, locator: &Arc<Locator>) {
        let _ = self.locator.set(Arc::downgrade(locator));
    }

    /// The declared runtime parameter names, in positional order.
    pub fn runtime_params(&self) -> &[&'static str] {
        &self.runtime_params
    }

    /// The key this handle was bound at.
    pub fn key(&self) -> &Key {
        &self.key
    }

    fn assemble_args(&self, runtime_args: Vec<AnyArc>) -> DiResult<Vec<AnyArc>> {
        if runtime_args.len() != self.runtime_params.len() {
            return Err(DiError::FunctoidConstruction {
                reason: format!(
                    "{} takes {} runtime argument(s) ({}), got {}",
                    self.key,
                    self.runtime_params.len(),
                    self.runtime_params.join(", "),
                    runtime_args.len()
                ),
            });
        }
        let locator = self
            .locator
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| DiError::InstanceNotFound { key: self.key.clone() })?;

        let mut args = runtime_args;
        for dep in &self.functoid.deps()[self.runtime_params.len()..] {
            let value = locator
                .find_value(dep)
                .ok_or_else(|| DiError::InstanceNotFound { key: dep.clone() })?;
            args.push(value);
        }
        Ok(args)
    }

    /// Invokes the factory with runtime arguments, resolving the DI'd tail
    /// per call.
    pub fn call(&self, runtime_args: Vec<AnyArc>) -> DiResult<AnyArc> {
        let args = self.assemble_args(runtime_args)?;
        self.functoid
            .invoke_sync(&args)
            .map_err(|e| DiError::producer(self.key.clone(), e))
    }

    /// Like [`call`](AssistedHandle::call), downcasting the result to `T`.
    pub fn call_as<T: Send + Sync + 'static>(&self, runtime_args: Vec<AnyArc>) -> DiResult<Arc<T>> {
        self.call(runtime_args)?
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch { key: self.key.clone() })
    }

    /// Invokes an asynchronous factory with runtime arguments.
    #[cfg(feature = "async")]
    pub async fn call_async(&self, runtime_args: Vec<AnyArc>) -> DiResult<AnyArc> {
        let args = self.assemble_args(runtime_args)?;
        self.functoid
            .invoke_async(args)
            .await
            .map_err(|e| DiError::producer(self.key.clone(), e))
    }
}

impl fmt::Debug for AssistedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AssistedHandle({}, runtime: [{}])",
            self.key,
            self.runtime_params.join(", ")
        )
    }
}
