//! # kiln-di
//!
//! Staged, plan-first dependency injection: the whole object graph is
//! validated before any of it is constructed.
//!
//! ## Features
//!
//! - **Plan before produce**: missing dependencies, cycles, and ambiguous
//!   bindings are planning errors, raised before a single factory runs
//! - **Conditional wiring**: bindings tagged on configuration axes are
//!   selected per activation, with path-aware conflict detection
//! - **Collection bindings**: set elements accumulate across modules and
//!   scopes; weak elements drop silently when unresolvable
//! - **Nested scopes**: locators chain; subcontexts add bindings over a
//!   parent without touching it
//! - **Parallel async production**: independent subtrees of asynchronous
//!   factories run concurrently, with cancellation
//! - **Assisted factories**: curried handles mixing caller-supplied and
//!   injected arguments
//!
//! ## Quick start
//!
//! ```rust
//! use kiln_di::{Binding, Functoid, Injector, Module, ProduceOptions};
//! use std::sync::Arc;
//!
//! struct Config { url: String }
//! struct Database { config: Arc<Config> }
//! struct UserService { db: Arc<Database>, config: Arc<Config> }
//!
//! let module = Module::new()
//!     .with(Binding::instance(Config { url: "postgres://localhost".into() }))
//!     .with(Binding::factory::<Database>(Functoid::of1(|config: Arc<Config>| Database {
//!         config,
//!     })))
//!     .with(Binding::factory::<UserService>(Functoid::of2(
//!         |db: Arc<Database>, config: Arc<Config>| UserService { db, config },
//!     )));
//!
//! let injector = Injector::new();
//! let locator = injector
//!     .produce_for::<UserService>(&module, &ProduceOptions::default())
//!     .unwrap();
//!
//! let service = locator.get::<UserService>().unwrap();
//! // Singletons: the service shares the one Config instance.
//! assert!(Arc::ptr_eq(&service.config, &locator.get::<Config>().unwrap()));
//! ```
//!
//! ## Conditional bindings
//!
//! ```rust
//! use kiln_di::{Activation, Axis, Binding, Injector, Module, ProduceOptions};
//!
//! struct Database { url: &'static str }
//!
//! let env = Axis::new("env", &["prod", "dev"]);
//! let module = Module::new()
//!     .with(Binding::instance(Database { url: "postgres://real" }).tagged(env.point("prod")))
//!     .with(Binding::instance(Database { url: "sqlite::memory:" }).tagged(env.point("dev")));
//!
//! let options = ProduceOptions::default().with_activation(Activation::of([env.point("dev")]));
//! let locator = Injector::new().produce_for::<Database>(&module, &options).unwrap();
//! assert_eq!(locator.get::<Database>().unwrap().url, "sqlite::memory:");
//! ```

// Core modules
pub mod axis;
pub mod binding;
pub mod error;
pub mod functoid;
pub mod graph;
pub mod injector;
pub mod key;
pub mod locator;
pub mod module;
pub mod observer;
pub mod plan;
pub mod registry;
pub mod subcontext;
pub mod tag;

mod assisted;
mod internal;
mod planner;
mod producer;

#[cfg(feature = "async")]
pub mod cancellation;

// Re-export the public surface at the crate root.
pub use assisted::AssistedHandle;
pub use axis::{Activation, Axis, AxisPoint, BindingTags};
pub use binding::{AssistedSpec, Binding, BindingKind, ElementSource, SetElement};
pub use error::{DiError, DiResult, FactoryError};
pub use functoid::{AnyArc, Functoid};
pub use graph::{GraphEdge, GraphNode, PlanGraph};
pub use injector::{Injector, ProduceOptions};
pub use key::Key;
pub use locator::Locator;
pub use module::{Module, ModuleDef};
pub use observer::{LoggingObserver, ProduceObserver};
pub use plan::{ElementPlan, Plan, PlanStep, StepAction};
pub use registry::{has_constructor, register_constructor, registered_constructor};
pub use subcontext::Subcontext;
pub use tag::{Primitive, Token, TypeTag};

#[cfg(feature = "async")]
pub use cancellation::CancellationToken;

#[cfg(feature = "async")]
pub use functoid::BoxFuture;
