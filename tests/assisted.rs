use kiln_di::{
    AssistedHandle, Binding, DiError, Functoid, Injector, Key, Module, ProduceOptions,
};
use std::sync::Arc;

struct Clock {
    now: u64,
}

struct Job {
    name: String,
    scheduled_at: u64,
}

fn job_module(now: u64) -> Module {
    let functoid = Functoid::of2(|name: Arc<String>, clock: Arc<Clock>| Job {
        name: (*name).clone(),
        scheduled_at: clock.now,
    });
    Module::new()
        .with(Binding::instance(Clock { now }))
        .with(Binding::assisted::<Job>(functoid, &["name"]).unwrap())
}

#[test]
fn handle_mixes_runtime_and_injected_arguments() {
    let locator = Injector::new()
        .produce_for::<Job>(&job_module(42), &ProduceOptions::default())
        .unwrap();

    let factory = locator
        .get_by_key::<AssistedHandle>(&Key::of::<Job>())
        .unwrap();
    assert_eq!(factory.runtime_params(), &["name"]);

    let job = factory
        .call_as::<Job>(vec![Arc::new("reindex".to_string())])
        .unwrap();
    assert_eq!(job.name, "reindex");
    assert_eq!(job.scheduled_at, 42);

    // Each call constructs a fresh value.
    let again = factory
        .call_as::<Job>(vec![Arc::new("reindex".to_string())])
        .unwrap();
    assert!(!Arc::ptr_eq(&job, &again));
}

#[test]
fn assisted_tail_is_produced_without_ordering_edges() {
    // The Clock tail is planned and produced so per-call resolution can
    // find it, but the assisted step itself carries no dependency edges.
    let plan = Injector::new()
        .plan_for::<Job>(&job_module(7), &ProduceOptions::default())
        .unwrap();
    assert_eq!(plan.len(), 2);
    assert!(plan.step_for(&Key::of::<Clock>()).is_some());
    assert!(plan.step_for(&Key::of::<Job>()).unwrap().deps().is_empty());
}

#[test]
fn tail_resolution_happens_per_call() {
    // The handle resolves Clock from the locator on every call; a Clock
    // produced in the same run is observed by later calls.
    let locator = Injector::new()
        .produce(
            &job_module(7),
            vec![Key::of::<Job>(), Key::of::<Clock>()],
            &ProduceOptions::default(),
        )
        .unwrap();

    let factory = locator
        .get_by_key::<AssistedHandle>(&Key::of::<Job>())
        .unwrap();
    let job = factory.call_as::<Job>(vec![Arc::new("a".to_string())]).unwrap();
    assert_eq!(job.scheduled_at, 7);
}

#[test]
fn wrong_runtime_argument_count_is_rejected() {
    let locator = Injector::new()
        .produce_for::<Job>(&job_module(1), &ProduceOptions::default())
        .unwrap();
    let factory = locator
        .get_by_key::<AssistedHandle>(&Key::of::<Job>())
        .unwrap();

    let err = factory.call(vec![]).unwrap_err();
    assert!(matches!(err, DiError::FunctoidConstruction { .. }));
}

#[test]
fn unbound_injected_tail_fails_at_planning() {
    // Runtime parameters are exempt from planning, but the injected tail is
    // not: a Job binding with no Clock anywhere is caught before anything
    // is produced.
    let functoid = Functoid::of2(|name: Arc<String>, clock: Arc<Clock>| Job {
        name: (*name).clone(),
        scheduled_at: clock.now,
    });
    let module = Module::new().with(Binding::assisted::<Job>(functoid, &["name"]).unwrap());

    let err = Injector::new()
        .plan_for::<Job>(&module, &ProduceOptions::default())
        .unwrap_err();
    match err {
        DiError::MissingDependency { key, required_by } => {
            assert_eq!(key, Key::of::<Clock>());
            assert_eq!(required_by, Some(Key::of::<Job>()));
        }
        other => panic!("expected missing dependency, got {other}"),
    }
}

#[test]
fn handle_outliving_its_locator_fails_cleanly() {
    let factory = {
        let locator = Injector::new()
            .produce_for::<Job>(&job_module(9), &ProduceOptions::default())
            .unwrap();
        locator
            .get_by_key::<AssistedHandle>(&Key::of::<Job>())
            .unwrap()
        // locator dropped here; the handle only holds it weakly
    };

    let err = factory.call(vec![Arc::new("x".to_string())]).unwrap_err();
    assert!(matches!(err, DiError::InstanceNotFound { .. }));
}
