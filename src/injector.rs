//! The injector facade: plan, produce, and nest scopes.

use std::sync::Arc;

use crate::axis::Activation;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::locator::Locator;
use crate::module::Module;
use crate::observer::ProduceObserver;
use crate::plan::Plan;
use crate::planner;
use crate::producer;
use crate::subcontext::Subcontext;

#[cfg(feature = "async")]
use crate::cancellation::CancellationToken;

/// Options recognised by plan and produce calls.
///
/// The default is an empty activation, explicit roots, and no parent.
#[derive(Clone)]
pub struct ProduceOptions {
    activation: Activation,
    auto_roots: bool,
    parent: Option<Arc<Locator>>,
    #[cfg(feature = "async")]
    cancellation: Option<CancellationToken>,
}

impl Default for ProduceOptions {
    fn default() -> Self {
        ProduceOptions {
            activation: Activation::empty(),
            auto_roots: false,
            parent: None,
            #[cfg(feature = "async")]
            cancellation: None,
        }
    }
}

impl ProduceOptions {
    /// Options with defaults.
    pub fn new() -> ProduceOptions {
        ProduceOptions::default()
    }

    /// Sets the base activation the planner selects bindings against.
    pub fn with_activation(mut self, activation: Activation) -> ProduceOptions {
        self.activation = activation;
        self
    }

    /// Treats every key in the module as a root, ignoring the explicit
    /// root list.
    pub fn auto_roots(mut self, enabled: bool) -> ProduceOptions {
        self.auto_roots = enabled;
        self
    }

    /// Chains lookups through a parent locator, enabling nested scopes.
    pub fn with_parent(mut self, parent: Arc<Locator>) -> ProduceOptions {
        self.parent = Some(parent);
        self
    }

    /// Lets the caller abort asynchronous production at any suspension
    /// point.
    #[cfg(feature = "async")]
    pub fn with_cancellation(mut self, token: CancellationToken) -> ProduceOptions {
        self.cancellation = Some(token);
        self
    }

    /// The base activation.
    pub fn activation(&self) -> &Activation {
        &self.activation
    }

    /// The parent locator, if any.
    pub fn parent(&self) -> Option<&Arc<Locator>> {
        self.parent.as_ref()
    }
}

/// The orchestration entry point: delegates to the planner and producer
/// and holds nothing but an optional observer.
///
/// # Examples
///
/// ```
/// use kiln_di::{Binding, Functoid, Injector, Module, ProduceOptions};
/// use std::sync::Arc;
///
/// struct Config { limit: usize }
/// struct Service { limit: usize }
///
/// let module = Module::new()
///     .with(Binding::instance(Config { limit: 8 }))
///     .with(Binding::factory::<Service>(Functoid::of1(|c: Arc<Config>| Service {
///         limit: c.limit,
///     })));
///
/// let locator = Injector::new().produce_for::<Service>(&module, &ProduceOptions::default()).unwrap();
/// assert_eq!(locator.get::<Service>().unwrap().limit, 8);
/// ```
#[derive(Clone, Default)]
pub struct Injector {
    observer: Option<Arc<dyn ProduceObserver>>,
}

impl Injector {
    /// An injector with no observer.
    pub fn new() -> Injector {
        Injector::default()
    }

    /// An injector reporting production events to the observer.
    pub fn with_observer(observer: Arc<dyn ProduceObserver>) -> Injector {
        Injector { observer: Some(observer) }
    }

    fn roots_for(module: &Module, roots: Vec<Key>, options: &ProduceOptions) -> Vec<Key> {
        if options.auto_roots {
            module.keys()
        } else {
            roots
        }
    }

    /// Computes and validates a plan without producing anything.
    pub fn plan(
        &self,
        module: &Module,
        roots: Vec<Key>,
        options: &ProduceOptions,
    ) -> DiResult<Plan> {
        let roots = Self::roots_for(module, roots, options);
        planner::plan(
            module,
            &roots,
            &options.activation,
            options.parent.as_deref(),
        )
    }

    /// Plans and synchronously produces a locator.
    ///
    /// Fails with a [`DiError::ProducerFailure`] naming the offending key
    /// when the plan contains an asynchronous functoid; use
    /// [`produce_async`](Injector::produce_async) for those graphs.
    pub fn produce(
        &self,
        module: &Module,
        roots: Vec<Key>,
        options: &ProduceOptions,
    ) -> DiResult<Arc<Locator>> {
        let plan = self.plan(module, roots, options)?;
        self.produce_plan(&plan, options)
    }

    /// Synchronously executes an already-computed plan.
    pub fn produce_plan(&self, plan: &Plan, options: &ProduceOptions) -> DiResult<Arc<Locator>> {
        if let Some(step) = plan.steps().iter().find(|s| s.action().is_async()) {
            return Err(DiError::producer_msg(
                step.key().clone(),
                "plan contains an asynchronous functoid; use produce_async",
            ));
        }
        producer::produce_sync(plan, options.parent.clone(), self.observer.as_ref())
    }

    /// Plans and produces a locator, running ready steps concurrently.
    ///
    /// Plans without asynchronous functoids produce the same instance map
    /// as [`produce`](Injector::produce).
    #[cfg(feature = "async")]
    pub async fn produce_async(
        &self,
        module: &Module,
        roots: Vec<Key>,
        options: &ProduceOptions,
    ) -> DiResult<Arc<Locator>> {
        let plan = self.plan(module, roots, options)?;
        self.produce_plan_async(&plan, options).await
    }

    /// Executes an already-computed plan with the parallel producer.
    #[cfg(feature = "async")]
    pub async fn produce_plan_async(
        &self,
        plan: &Plan,
        options: &ProduceOptions,
    ) -> DiResult<Arc<Locator>> {
        producer::parallel::produce_parallel(
            plan,
            options.parent.clone(),
            self.observer.clone(),
            options.cancellation.clone(),
        )
        .await
    }

    /// Plans with `T`'s plain key as the only root.
    pub fn plan_for<T: 'static>(&self, module: &Module, options: &ProduceOptions) -> DiResult<Plan> {
        self.plan(module, vec![Key::of::<T>()], options)
    }

    /// Produces with `T`'s plain key as the only root.
    pub fn produce_for<T: 'static>(
        &self,
        module: &Module,
        options: &ProduceOptions,
    ) -> DiResult<Arc<Locator>> {
        self.produce(module, vec![Key::of::<T>()], options)
    }

    /// Produces with `T`'s named key as the only root.
    pub fn produce_named<T: 'static>(
        &self,
        id: &'static str,
        module: &Module,
        options: &ProduceOptions,
    ) -> DiResult<Arc<Locator>> {
        self.produce(module, vec![Key::named::<T>(id)], options)
    }

    /// Produces a nested scope: plans the module against the parent and
    /// wraps the resulting child locator.
    pub fn create_subcontext(
        &self,
        parent: Arc<Locator>,
        module: &Module,
        roots: Vec<Key>,
        options: &ProduceOptions,
    ) -> DiResult<Subcontext> {
        let options = options.clone().with_parent(parent);
        let child = self.produce(module, roots, &options)?;
        Ok(Subcontext::new(child))
    }

    /// Produces a nested scope with the parallel producer.
    #[cfg(feature = "async")]
    pub async fn create_subcontext_async(
        &self,
        parent: Arc<Locator>,
        module: &Module,
        roots: Vec<Key>,
        options: &ProduceOptions,
    ) -> DiResult<Subcontext> {
        let options = options.clone().with_parent(parent);
        let child = self.produce_async(module, roots, &options).await?;
        Ok(Subcontext::new(child))
    }
}
