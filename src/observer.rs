//! Production observers: hooks for tracing what a produce call does.

use std::time::Duration;

use crate::error::DiError;
use crate::key::Key;

/// Receives production events from the producer.
///
/// All methods default to no-ops so implementors only handle the events
/// they care about. In the parallel producer the step hooks may fire from
/// factory tasks, so implementations must be `Send + Sync`.
pub trait ProduceObserver: Send + Sync {
    /// A step was picked up for execution.
    fn step_started(&self, _key: &Key) {}

    /// A step's value was stored.
    fn step_completed(&self, _key: &Key, _elapsed: Duration) {}

    /// A step failed; production is about to abort.
    fn step_failed(&self, _key: &Key, _error: &DiError) {}

    /// A weak collection element was dropped because its construction
    /// failed at runtime.
    fn weak_element_dropped(&self, _set_key: &Key, _reason: &DiError) {}
}

/// Prints production events with a configurable prefix.
///
/// # Examples
///
/// ```
/// use kiln_di::{Binding, Injector, Key, LoggingObserver, Module, ProduceOptions};
/// use std::sync::Arc;
///
/// struct Config;
///
/// let module = Module::new().with(Binding::instance(Config));
/// let injector = Injector::with_observer(Arc::new(LoggingObserver::new("[kiln]")));
/// let locator = injector
///     .produce(&module, vec![Key::of::<Config>()], &ProduceOptions::default())
///     .unwrap();
/// assert!(locator.has(&Key::of::<Config>()));
/// ```
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    /// An observer printing with the given prefix.
    pub fn new(prefix: impl Into<String>) -> LoggingObserver {
        LoggingObserver { prefix: prefix.into() }
    }
}

impl ProduceObserver for LoggingObserver {
    fn step_started(&self, key: &Key) {
        println!("{} producing {}", self.prefix, key);
    }

    fn step_completed(&self, key: &Key, elapsed: Duration) {
        println!("{} produced {} in {:?}", self.prefix, key, elapsed);
    }

    fn step_failed(&self, key: &Key, error: &DiError) {
        eprintln!("{} FAILED {}: {}", self.prefix, key, error);
    }

    fn weak_element_dropped(&self, set_key: &Key, reason: &DiError) {
        eprintln!("{} dropped weak element of {}: {}", self.prefix, set_key, reason);
    }
}
