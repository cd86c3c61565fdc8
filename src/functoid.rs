//! Functoids: a callable bundled with its ordered dependency keys.
//!
//! Every constructing binding carries a [`Functoid`]. The planner reads its
//! dependency keys; the producer resolves those keys to values and invokes
//! the callable with them, positionally. Callables are type-erased behind
//! `Arc<dyn Any + Send + Sync>` values so heterogeneous graphs can live in
//! one plan; the typed `of*` constructors do the downcasting at the edges.

use std::any::Any;
use std::fmt;
#[cfg(feature = "async")]
use std::future::Future;
#[cfg(feature = "async")]
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{DiError, DiResult, FactoryError};
use crate::key::Key;

/// Type-erased shared value, as stored in locators and passed between
/// functoids.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Boxed future used by asynchronous functoids.
#[cfg(feature = "async")]
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

type SyncCall = Arc<dyn Fn(&[AnyArc]) -> Result<AnyArc, FactoryError> + Send + Sync>;

#[cfg(feature = "async")]
type AsyncCall =
    Arc<dyn Fn(Vec<AnyArc>) -> BoxFuture<Result<AnyArc, FactoryError>> + Send + Sync>;

#[derive(Clone)]
enum Call {
    Sync(SyncCall),
    #[cfg(feature = "async")]
    Async(AsyncCall),
}

/// A callable plus the ordered dependency keys of its parameters.
///
/// Construct one with [`Functoid::constant`] for a fixed value, with the
/// arity helpers (`of0`..`of6`, `try_of0`..`try_of6`, and their `_async`
/// forms) for typed callables, or adjust dependency keys afterwards with
/// [`Functoid::with_keys`] / [`Functoid::with_dep_id`] for named
/// dependencies.
///
/// # Examples
///
/// ```
/// use kiln_di::{Functoid, Key};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Database { url: String }
///
/// let functoid = Functoid::of1(|config: Arc<Config>| Database { url: config.url.clone() });
/// assert_eq!(functoid.deps(), &[Key::of::<Config>()]);
/// assert!(!functoid.is_async());
/// ```
#[derive(Clone)]
pub struct Functoid {
    deps: Vec<Key>,
    call: Call,
}

fn downcast_arg<T: Send + Sync + 'static>(
    arg: Option<&AnyArc>,
    index: usize,
) -> Result<Arc<T>, FactoryError> {
    let value = arg.ok_or_else(|| format!("missing argument {}", index))?;
    value
        .clone()
        .downcast::<T>()
        .map_err(|_| format!("argument {} is not a {}", index, std::any::type_name::<T>()).into())
}

impl Functoid {
    /// A functoid with no dependencies that always returns the given value.
    pub fn constant<T: Send + Sync + 'static>(value: T) -> Functoid {
        let value: AnyArc = Arc::new(value);
        let call: SyncCall = Arc::new(move |_| Ok(value.clone()));
        Functoid { deps: Vec::new(), call: Call::Sync(call) }
    }

    /// A zero-dependency callable.
    pub fn of0<R, F>(f: F) -> Functoid
    where
        R: Send + Sync + 'static,
        F: Fn() -> R + Send + Sync + 'static,
    {
        let call: SyncCall = Arc::new(move |_| Ok(Arc::new(f()) as AnyArc));
        Functoid { deps: Vec::new(), call: Call::Sync(call) }
    }

    /// A zero-dependency fallible callable.
    pub fn try_of0<R, E, F>(f: F) -> Functoid
    where
        R: Send + Sync + 'static,
        E: Into<FactoryError>,
        F: Fn() -> Result<R, E> + Send + Sync + 'static,
    {
        let call: SyncCall =
            Arc::new(move |_| f().map(|v| Arc::new(v) as AnyArc).map_err(Into::into));
        Functoid { deps: Vec::new(), call: Call::Sync(call) }
    }

    /// A zero-dependency asynchronous callable.
    #[cfg(feature = "async")]
    pub fn of0_async<R, Fut, F>(f: F) -> Functoid
    where
        R: Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let call: AsyncCall = Arc::new(move |_| {
            let f = f.clone();
            Box::pin(async move { Ok(Arc::new(f().await) as AnyArc) })
        });
        Functoid { deps: Vec::new(), call: Call::Async(call) }
    }

    /// A zero-dependency fallible asynchronous callable.
    #[cfg(feature = "async")]
    pub fn try_of0_async<R, E, Fut, F>(f: F) -> Functoid
    where
        R: Send + Sync + 'static,
        E: Into<FactoryError>,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let call: AsyncCall = Arc::new(move |_| {
            let f = f.clone();
            Box::pin(async move {
                f().await.map(|v| Arc::new(v) as AnyArc).map_err(Into::into)
            })
        });
        Functoid { deps: Vec::new(), call: Call::Async(call) }
    }

    /// Replaces the dependency keys wholesale, for named or token-keyed
    /// dependencies. The number of keys must match the callable's arity.
    pub fn with_keys<I: IntoIterator<Item = Key>>(mut self, keys: I) -> DiResult<Functoid> {
        let keys: Vec<Key> = keys.into_iter().collect();
        if keys.len() != self.deps.len() {
            return Err(DiError::FunctoidConstruction {
                reason: format!(
                    "callable takes {} dependencies, got {} keys",
                    self.deps.len(),
                    keys.len()
                ),
            });
        }
        self.deps = keys;
        Ok(self)
    }

    /// Attaches an id to the dependency at `index`, keeping its type tag.
    pub fn with_dep_id(mut self, index: usize, id: &'static str) -> DiResult<Functoid> {
        if index >= self.deps.len() {
            return Err(DiError::FunctoidConstruction {
                reason: format!(
                    "dependency index {} out of range for arity {}",
                    index,
                    self.deps.len()
                ),
            });
        }
        self.deps[index] = self.deps[index].clone().with_id(id);
        Ok(self)
    }

    /// Wraps the callable's result, preserving dependencies and awaiting
    /// first if the callable is asynchronous.
    pub fn map<T, U, F>(self, f: F) -> Functoid
    where
        T: Send + Sync + 'static,
        U: Send + Sync + 'static,
        F: Fn(Arc<T>) -> U + Send + Sync + 'static,
    {
        let deps = self.deps;
        let call = match self.call {
            Call::Sync(inner) => {
                Call::Sync(Arc::new(move |args: &[AnyArc]| {
                    let value = inner(args)?;
                    let value = value.downcast::<T>().map_err(|_| {
                        format!("map input is not a {}", std::any::type_name::<T>())
                    })?;
                    Ok(Arc::new(f(value)) as AnyArc)
                }))
            }
            #[cfg(feature = "async")]
            Call::Async(inner) => {
                let f = Arc::new(f);
                let call: AsyncCall = Arc::new(move |args: Vec<AnyArc>| {
                    let inner = inner.clone();
                    let f = f.clone();
                    Box::pin(async move {
                        let value = inner(args).await?;
                        let value = value.downcast::<T>().map_err(|_| {
                            format!("map input is not a {}", std::any::type_name::<T>())
                        })?;
                        Ok(Arc::new(f(value)) as AnyArc)
                    })
                });
                Call::Async(call)
            }
        };
        Functoid { deps, call }
    }

    /// The ordered dependency keys, one per parameter.
    pub fn deps(&self) -> &[Key] {
        &self.deps
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.deps.len()
    }

    /// Whether the callable returns a future.
    pub fn is_async(&self) -> bool {
        match self.call {
            Call::Sync(_) => false,
            #[cfg(feature = "async")]
            Call::Async(_) => true,
        }
    }

    /// Invokes a synchronous callable with already-resolved values.
    pub(crate) fn invoke_sync(&self, args: &[AnyArc]) -> Result<AnyArc, FactoryError> {
        match &self.call {
            Call::Sync(call) => call(args),
            #[cfg(feature = "async")]
            Call::Async(_) => Err("asynchronous functoid invoked synchronously".into()),
        }
    }

    /// Invokes the callable, wrapping synchronous ones in a ready future.
    #[cfg(feature = "async")]
    pub(crate) fn invoke_async(&self, args: Vec<AnyArc>) -> BoxFuture<Result<AnyArc, FactoryError>> {
        match &self.call {
            Call::Sync(call) => {
                let call = call.clone();
                Box::pin(async move { call(&args) })
            }
            Call::Async(call) => call(args),
        }
    }
}

impl fmt::Debug for Functoid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Functoid")
            .field("deps", &self.deps)
            .field("is_async", &self.is_async())
            .finish()
    }
}

macro_rules! functoid_arity {
    ($of:ident, $try_of:ident, $of_async:ident, $try_of_async:ident; $($arg:ident: $A:ident),+) => {
        impl Functoid {
            /// Typed callable; dependency keys default to the parameter types.
            pub fn $of<$($A,)+ R, F>(f: F) -> Functoid
            where
                $($A: Send + Sync + 'static,)+
                R: Send + Sync + 'static,
                F: Fn($(Arc<$A>),+) -> R + Send + Sync + 'static,
            {
                let deps = vec![$(Key::of::<$A>()),+];
                let call: SyncCall = Arc::new(move |args: &[AnyArc]| {
                    let mut index = 0usize;
                    $(
                        let $arg = downcast_arg::<$A>(args.get(index), index)?;
                        index += 1;
                    )+
                    let _ = index;
                    Ok(Arc::new(f($($arg),+)) as AnyArc)
                });
                Functoid { deps, call: Call::Sync(call) }
            }

            /// Typed fallible callable.
            pub fn $try_of<$($A,)+ R, E, F>(f: F) -> Functoid
            where
                $($A: Send + Sync + 'static,)+
                R: Send + Sync + 'static,
                E: Into<FactoryError>,
                F: Fn($(Arc<$A>),+) -> Result<R, E> + Send + Sync + 'static,
            {
                let deps = vec![$(Key::of::<$A>()),+];
                let call: SyncCall = Arc::new(move |args: &[AnyArc]| {
                    let mut index = 0usize;
                    $(
                        let $arg = downcast_arg::<$A>(args.get(index), index)?;
                        index += 1;
                    )+
                    let _ = index;
                    f($($arg),+).map(|v| Arc::new(v) as AnyArc).map_err(Into::into)
                });
                Functoid { deps, call: Call::Sync(call) }
            }

            /// Typed asynchronous callable.
            #[cfg(feature = "async")]
            pub fn $of_async<$($A,)+ R, Fut, F>(f: F) -> Functoid
            where
                $($A: Send + Sync + 'static,)+
                R: Send + Sync + 'static,
                Fut: Future<Output = R> + Send + 'static,
                F: Fn($(Arc<$A>),+) -> Fut + Send + Sync + 'static,
            {
                let deps = vec![$(Key::of::<$A>()),+];
                let f = Arc::new(f);
                let call: AsyncCall = Arc::new(move |args: Vec<AnyArc>| {
                    let f = f.clone();
                    Box::pin(async move {
                        let mut index = 0usize;
                        $(
                            let $arg = downcast_arg::<$A>(args.get(index), index)?;
                            index += 1;
                        )+
                        let _ = index;
                        Ok(Arc::new(f($($arg),+).await) as AnyArc)
                    })
                });
                Functoid { deps, call: Call::Async(call) }
            }

            /// Typed fallible asynchronous callable.
            #[cfg(feature = "async")]
            pub fn $try_of_async<$($A,)+ R, E, Fut, F>(f: F) -> Functoid
            where
                $($A: Send + Sync + 'static,)+
                R: Send + Sync + 'static,
                E: Into<FactoryError>,
                Fut: Future<Output = Result<R, E>> + Send + 'static,
                F: Fn($(Arc<$A>),+) -> Fut + Send + Sync + 'static,
            {
                let deps = vec![$(Key::of::<$A>()),+];
                let f = Arc::new(f);
                let call: AsyncCall = Arc::new(move |args: Vec<AnyArc>| {
                    let f = f.clone();
                    Box::pin(async move {
                        let mut index = 0usize;
                        $(
                            let $arg = downcast_arg::<$A>(args.get(index), index)?;
                            index += 1;
                        )+
                        let _ = index;
                        f($($arg),+).await.map(|v| Arc::new(v) as AnyArc).map_err(Into::into)
                    })
                });
                Functoid { deps, call: Call::Async(call) }
            }
        }
    };
}

functoid_arity!(of1, try_of1, of1_async, try_of1_async; a1: A1);
functoid_arity!(of2, try_of2, of2_async, try_of2_async; a1: A1, a2: A2);
functoid_arity!(of3, try_of3, of3_async, try_of3_async; a1: A1, a2: A2, a3: A3);
functoid_arity!(of4, try_of4, of4_async, try_of4_async; a1: A1, a2: A2, a3: A3, a4: A4);
functoid_arity!(of5, try_of5, of5_async, try_of5_async; a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
functoid_arity!(of6, try_of6, of6_async, try_of6_async; a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
