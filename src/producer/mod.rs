//! The producer: executes a plan into a locator.
//!
//! The synchronous mode walks plan steps in order on the calling thread.
//! Dependencies are resolved from the run's instance map first, then from
//! the parent locator chain; the plan guarantees both that every declared
//! dependency is satisfiable and that at most one step exists per key, so a
//! lookup miss here is a hard failure. Any construction failure outside a
//! weak element discards the instance map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::assisted::AssistedHandle;
use crate::binding::ElementSource;
use crate::error::{DiError, DiResult};
use crate::functoid::{AnyArc, Functoid};
use crate::key::Key;
use crate::locator::{Locator, SetInstances};
use crate::observer::ProduceObserver;
use crate::plan::{ElementPlan, Plan, PlanStep, StepAction};

#[cfg(feature = "async")]
pub(crate) mod parallel;

pub(crate) fn resolve(
    instances: &HashMap<Key, AnyArc>,
    parent: Option<&Arc<Locator>>,
    key: &Key,
) -> DiResult<AnyArc> {
    if let Some(value) = instances.get(key) {
        return Ok(value.clone());
    }
    if let Some(parent) = parent {
        if let Some(value) = parent.find_value(key) {
            return Ok(value);
        }
    }
    Err(DiError::InstanceNotFound { key: key.clone() })
}

pub(crate) fn push_unique(items: &mut Vec<AnyArc>, value: AnyArc) {
    if !items.iter().any(|existing| Arc::ptr_eq(existing, &value)) {
        items.push(value);
    }
}

/// Binds every assisted handle in the finished locator to it, so their
/// per-call tail resolution has somewhere to look.
pub(crate) fn bind_assisted(plan: &Plan, locator: &Arc<Locator>) {
    for step in plan.steps() {
        if matches!(step.action, StepAction::Assisted(_)) {
            if let Some(handle) = locator.find_by_key::<AssistedHandle>(&step.key) {
                handle.bind(locator);
            }
        }
    }
}

pub(crate) fn produce_sync(
    plan: &Plan,
    parent: Option<Arc<Locator>>,
    observer: Option<&Arc<dyn ProduceObserver>>,
) -> DiResult<Arc<Locator>> {
    let mut instances: HashMap<Key, AnyArc> = HashMap::new();

    for step in plan.steps() {
        if instances.contains_key(&step.key) {
            continue;
        }
        if let Some(observer) = observer {
            observer.step_started(&step.key);
        }
        let started_at = Instant::now();
        match run_step(step, &instances, parent.as_ref(), observer) {
            Ok(value) => {
                instances.insert(step.key.clone(), value);
                if let Some(observer) = observer {
                    observer.step_completed(&step.key, started_at.elapsed());
                }
            }
            Err(error) => {
                if let Some(observer) = observer {
                    observer.step_failed(&step.key, &error);
                }
                return Err(error);
            }
        }
    }

    let locator = Locator::from_parts(instances, parent);
    bind_assisted(plan, &locator);
    Ok(locator)
}

fn run_step(
    step: &PlanStep,
    instances: &HashMap<Key, AnyArc>,
    parent: Option<&Arc<Locator>>,
    observer: Option<&Arc<dyn ProduceObserver>>,
) -> DiResult<AnyArc> {
    match &step.action {
        StepAction::Instance(value) => Ok(value.clone()),
        StepAction::Invoke(functoid) => invoke_sync(&step.key, functoid, instances, parent),
        StepAction::Alias(target) => resolve(instances, parent, target),
        StepAction::Collect(elements) => {
            let mut items: Vec<AnyArc> = Vec::new();
            for element in elements {
                match build_element(&step.key, element, instances, parent) {
                    Ok(value) => push_unique(&mut items, value),
                    Err(error) if element.weak => {
                        // The planner admitted the element but its factory
                        // still failed; weak elements drop instead of
                        // aborting the run.
                        if let Some(observer) = observer {
                            observer.weak_element_dropped(&step.key, &error);
                        }
                    }
                    Err(error) => return Err(error),
                }
            }
            Ok(Arc::new(SetInstances(items)) as AnyArc)
        }
        StepAction::Assisted(spec) => {
            Ok(Arc::new(AssistedHandle::new(step.key.clone(), spec.clone())) as AnyArc)
        }
    }
}

fn invoke_sync(
    key: &Key,
    functoid: &Functoid,
    instances: &HashMap<Key, AnyArc>,
    parent: Option<&Arc<Locator>>,
) -> DiResult<AnyArc> {
    if functoid.is_async() {
        return Err(DiError::producer_msg(
            key.clone(),
            "asynchronous functoid requires produce_async",
        ));
    }
    let args = functoid
        .deps()
        .iter()
        .map(|dep| resolve(instances, parent, dep))
        .collect::<DiResult<Vec<AnyArc>>>()?;
    functoid
        .invoke_sync(&args)
        .map_err(|e| DiError::producer(key.clone(), e))
}

fn build_element(
    key: &Key,
    element: &ElementPlan,
    instances: &HashMap<Key, AnyArc>,
    parent: Option<&Arc<Locator>>,
) -> DiResult<AnyArc> {
    match &element.source {
        ElementSource::Instance(value) => Ok(value.clone()),
        ElementSource::Construct(functoid) | ElementSource::Factory(functoid) => {
            invoke_sync(key, functoid, instances, parent)
        }
    }
}
