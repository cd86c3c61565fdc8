//! The parallel producer: schedules every ready step concurrently.
//!
//! The driver owns all bookkeeping; user functoids only ever see their
//! already-resolved argument values, so no locking is needed around the
//! instance map. A step is ready once every dependency is completed or
//! served by the parent chain. Ready steps with trivial actions (instances,
//! aliases, assisted handles) complete inline; invoking steps are spawned
//! into a [`JoinSet`] and awaited as they finish, so independent subtrees
//! overlap. The result is the same instance map a sequential run produces.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::{Id as TaskId, JoinSet};

use crate::assisted::AssistedHandle;
use crate::binding::ElementSource;
use crate::cancellation::CancellationToken;
use crate::error::{DiError, DiResult};
use crate::functoid::AnyArc;
use crate::key::Key;
use crate::locator::{Locator, SetInstances};
use crate::observer::ProduceObserver;
use crate::plan::{Plan, StepAction};
use crate::producer::{bind_assisted, push_unique, resolve};

type StepOutcome = (usize, DiResult<AnyArc>, Duration);

pub(crate) async fn produce_parallel(
    plan: &Plan,
    parent: Option<Arc<Locator>>,
    observer: Option<Arc<dyn ProduceObserver>>,
    cancellation: Option<CancellationToken>,
) -> DiResult<Arc<Locator>> {
    if cancellation.as_ref().is_some_and(|t| t.is_cancelled()) {
        return Err(DiError::Cancelled);
    }

    let steps = plan.steps();
    let mut started = vec![false; steps.len()];
    let mut instances: HashMap<Key, AnyArc> = HashMap::new();
    let mut remaining = steps.len();
    let mut tasks: JoinSet<StepOutcome> = JoinSet::new();
    let mut in_flight: HashMap<TaskId, usize> = HashMap::new();

    while remaining > 0 || !tasks.is_empty() {
        // Launch everything ready. Inline completions can unlock more
        // steps, so keep scanning until a full pass starts nothing.
        loop {
            let mut launched = false;
            for (i, step) in steps.iter().enumerate() {
                if started[i] {
                    continue;
                }
                let ready = step.deps().iter().all(|dep| {
                    instances.contains_key(dep)
                        || parent.as_ref().is_some_and(|p| p.has(dep))
                });
                if !ready {
                    continue;
                }
                started[i] = true;
                launched = true;
                if let Some(observer) = &observer {
                    observer.step_started(&step.key);
                }

                match &step.action {
                    StepAction::Instance(value) => {
                        let value = value.clone();
                        complete(&mut instances, &mut remaining, &observer, &step.key, value, Duration::ZERO);
                    }
                    StepAction::Alias(target) => {
                        let value = resolve(&instances, parent.as_ref(), target)?;
                        complete(&mut instances, &mut remaining, &observer, &step.key, value, Duration::ZERO);
                    }
                    StepAction::Assisted(spec) => {
                        let handle: AnyArc =
                            Arc::new(AssistedHandle::new(step.key.clone(), spec.clone()));
                        complete(&mut instances, &mut remaining, &observer, &step.key, handle, Duration::ZERO);
                    }
                    StepAction::Invoke(functoid) => {
                        let args = functoid
                            .deps()
                            .iter()
                            .map(|dep| resolve(&instances, parent.as_ref(), dep))
                            .collect::<DiResult<Vec<AnyArc>>>()?;
                        let functoid = functoid.clone();
                        let key = step.key.clone();
                        let handle = tasks.spawn(async move {
                            let started_at = Instant::now();
                            let outcome = functoid
                                .invoke_async(args)
                                .await
                                .map_err(|e| DiError::producer(key, e));
                            (i, outcome, started_at.elapsed())
                        });
                        in_flight.insert(handle.id(), i);
                    }
                    StepAction::Collect(elements) => {
                        // Resolve every element's arguments up front; a weak
                        // element whose arguments are missing drops here.
                        let mut work: Vec<(ElementSource, Vec<AnyArc>, bool)> = Vec::new();
                        for element in elements {
                            let args = element
                                .deps()
                                .iter()
                                .map(|dep| resolve(&instances, parent.as_ref(), dep))
                                .collect::<DiResult<Vec<AnyArc>>>();
                            match args {
                                Ok(args) => {
                                    work.push((element.source.clone(), args, element.weak))
                                }
                                Err(error) if element.is_weak() => {
                                    if let Some(observer) = &observer {
                                        observer.weak_element_dropped(&step.key, &error);
                                    }
                                }
                                Err(error) => return Err(error),
                            }
                        }
                        let key = step.key.clone();
                        let task_observer = observer.clone();
                        let handle = tasks.spawn(async move {
                            let started_at = Instant::now();
                            let mut items: Vec<AnyArc> = Vec::new();
                            for (source, args, weak) in work {
                                let built = match source {
                                    ElementSource::Instance(value) => Ok(value.clone()),
                                    ElementSource::Construct(functoid)
                                    | ElementSource::Factory(functoid) => functoid
                                        .invoke_async(args)
                                        .await
                                        .map_err(|e| DiError::producer(key.clone(), e)),
                                };
                                match built {
                                    Ok(value) => push_unique(&mut items, value),
                                    Err(error) if weak => {
                                        if let Some(observer) = &task_observer {
                                            observer.weak_element_dropped(&key, &error);
                                        }
                                    }
                                    Err(error) => return (i, Err(error), started_at.elapsed()),
                                }
                            }
                            let value = Arc::new(SetInstances(items)) as AnyArc;
                            (i, Ok(value), started_at.elapsed())
                        });
                        in_flight.insert(handle.id(), i);
                    }
                }
            }
            if !launched {
                break;
            }
        }

        if remaining == 0 && tasks.is_empty() {
            break;
        }
        if tasks.is_empty() {
            // Nothing ready, nothing running, steps left: the plan's
            // ordering invariant was violated.
            let stuck = steps
                .iter()
                .enumerate()
                .find(|(i, _)| !started[*i])
                .map(|(_, s)| s.key().clone())
                .expect("an unstarted step must exist while steps remain");
            return Err(DiError::producer_msg(
                stuck,
                "no step is ready and none are running; plan ordering is broken",
            ));
        }

        tokio::select! {
            _ = wait_cancelled(cancellation.as_ref()) => {
                tasks.abort_all();
                return Err(DiError::Cancelled);
            }
            joined = tasks.join_next_with_id() => {
                match joined {
                    Some(Ok((id, (i, Ok(value), elapsed)))) => {
                        in_flight.remove(&id);
                        complete(&mut instances, &mut remaining, &observer, steps[i].key(), value, elapsed);
                    }
                    Some(Ok((id, (i, Err(error), _)))) => {
                        in_flight.remove(&id);
                        if let Some(observer) = &observer {
                            observer.step_failed(steps[i].key(), &error);
                        }
                        tasks.abort_all();
                        return Err(error);
                    }
                    Some(Err(join_error)) => {
                        let key = in_flight
                            .remove(&join_error.id())
                            .map(|i| steps[i].key().clone())
                            .expect("joined task was tracked");
                        tasks.abort_all();
                        return Err(DiError::producer_msg(
                            key,
                            format!("factory task failed: {}", join_error),
                        ));
                    }
                    None => continue,
                }
            }
        }
    }

    let locator = Locator::from_parts(instances, parent);
    bind_assisted(plan, &locator);
    Ok(locator)
}

fn complete(
    instances: &mut HashMap<Key, AnyArc>,
    remaining: &mut usize,
    observer: &Option<Arc<dyn ProduceObserver>>,
    key: &Key,
    value: AnyArc,
    elapsed: Duration,
) {
    instances.insert(key.clone(), value);
    *remaining -= 1;
    if let Some(observer) = observer {
        observer.step_completed(key, elapsed);
    }
}

async fn wait_cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}
