use kiln_di::{
    Activation, Axis, Binding, DiError, Functoid, Injector, Key, Module, ProduceOptions,
};
use std::sync::Arc;

struct Db {
    backend: &'static str,
}

struct App {
    db: Arc<Db>,
}

fn env() -> Axis {
    Axis::new("env", &["prod", "dev", "test"])
}

fn db_module() -> Module {
    Module::new()
        .with(Binding::instance(Db { backend: "postgres" }).tagged(env().point("prod")))
        .with(Binding::instance(Db { backend: "memory" }).tagged(env().point("dev")))
        .with(Binding::factory::<App>(Functoid::of1(|db: Arc<Db>| App { db })))
}

fn with_activation(activation: Activation) -> ProduceOptions {
    ProduceOptions::default().with_activation(activation)
}

#[test]
fn activation_selects_the_tagged_binding() {
    let injector = Injector::new();

    let prod = injector
        .produce_for::<App>(&db_module(), &with_activation(Activation::of([env().point("prod")])))
        .unwrap();
    assert_eq!(prod.get::<App>().unwrap().db.backend, "postgres");

    let dev = injector
        .produce_for::<App>(&db_module(), &with_activation(Activation::of([env().point("dev")])))
        .unwrap();
    assert_eq!(dev.get::<App>().unwrap().db.backend, "memory");
}

#[test]
fn selection_is_deterministic() {
    let injector = Injector::new();
    let options = with_activation(Activation::of([env().point("prod")]));
    for _ in 0..5 {
        let locator = injector.produce_for::<App>(&db_module(), &options).unwrap();
        assert_eq!(locator.get::<App>().unwrap().db.backend, "postgres");
    }
}

#[test]
fn contradicted_candidate_is_an_axis_conflict() {
    // The only Db candidate requires prod while the activation fixes test.
    #[allow(dead_code)]
    struct Svc {
        db: Arc<Db>,
    }

    let module = Module::new()
        .with(Binding::instance(Db { backend: "postgres" }).tagged(env().point("prod")))
        .with(
            Binding::factory::<Svc>(Functoid::of1(|db: Arc<Db>| Svc { db }))
                .tagged(env().point("test")),
        );

    let err = Injector::new()
        .plan_for::<Svc>(&module, &with_activation(Activation::of([env().point("test")])))
        .unwrap_err();

    match err {
        DiError::AxisConflict { key, required_by, constraint } => {
            assert_eq!(key, Key::of::<Db>());
            assert_eq!(required_by, Some(Key::of::<Svc>()));
            assert!(constraint.contains("env"), "constraint was: {constraint}");
            assert!(constraint.contains("test"), "constraint was: {constraint}");
        }
        other => panic!("expected axis conflict, got {other}"),
    }
}

#[test]
fn silent_axis_leaves_tagged_candidates_unmatched() {
    // No activation on env at all: the tagged bindings never match and the
    // key counts as missing rather than conflicting.
    let err = Injector::new()
        .plan_for::<App>(&db_module(), &ProduceOptions::default())
        .unwrap_err();
    assert!(matches!(err, DiError::MissingDependency { key, .. } if key == Key::of::<Db>()));
}

#[test]
fn more_specific_binding_wins() {
    let region = Axis::new("region", &["eu", "us"]);

    let module = Module::new()
        .with(Binding::instance(Db { backend: "generic" }).tagged(env().point("prod")))
        .with(
            Binding::instance(Db { backend: "eu-cluster" })
                .tagged(env().point("prod"))
                .tagged(region.point("eu")),
        );

    let activation = Activation::of([env().point("prod"), region.point("eu")]);
    let locator = Injector::new()
        .produce_for::<Db>(&module, &with_activation(activation))
        .unwrap();
    assert_eq!(locator.get::<Db>().unwrap().backend, "eu-cluster");
}

#[test]
fn untagged_fallback_applies_when_nothing_more_specific_matches() {
    let module = Module::new()
        .with(Binding::instance(Db { backend: "fallback" }))
        .with(Binding::instance(Db { backend: "postgres" }).tagged(env().point("prod")));

    let injector = Injector::new();

    let prod = injector
        .produce_for::<Db>(&module, &with_activation(Activation::of([env().point("prod")])))
        .unwrap();
    assert_eq!(prod.get::<Db>().unwrap().backend, "postgres");

    let dev = injector
        .produce_for::<Db>(&module, &with_activation(Activation::of([env().point("dev")])))
        .unwrap();
    assert_eq!(dev.get::<Db>().unwrap().backend, "fallback");
}

#[test]
fn equally_specific_candidates_conflict() {
    let module = Module::new()
        .with(Binding::instance(Db { backend: "a" }))
        .with(Binding::instance(Db { backend: "b" }));

    let err = Injector::new()
        .plan_for::<Db>(&module, &ProduceOptions::default())
        .unwrap_err();
    match err {
        DiError::ConflictingBindings { key, bindings } => {
            assert_eq!(key, Key::of::<Db>());
            assert_eq!(bindings.len(), 2);
        }
        other => panic!("expected conflicting bindings, got {other}"),
    }
}

#[test]
fn path_constraints_outlive_the_selecting_binding() {
    // Selecting Cache@dev fixes env=dev for its whole subtree, so the Db
    // candidate tagged prod is rejected even though Db itself is reached
    // through an untagged dependency chain.
    #[allow(dead_code)]
    struct Cache {
        store: Arc<Store>,
    }
    #[allow(dead_code)]
    struct Store {
        db: Arc<Db>,
    }

    let module = Module::new()
        .with(
            Binding::factory::<Cache>(Functoid::of1(|store: Arc<Store>| Cache { store }))
                .tagged(env().point("dev")),
        )
        .with(Binding::factory::<Store>(Functoid::of1(|db: Arc<Db>| Store { db })))
        .with(Binding::instance(Db { backend: "postgres" }).tagged(env().point("prod")));

    let err = Injector::new()
        .plan_for::<Cache>(&module, &with_activation(Activation::of([env().point("dev")])))
        .unwrap_err();

    match err {
        DiError::AxisConflict { key, .. } => assert_eq!(key, Key::of::<Db>()),
        other => panic!("expected axis conflict, got {other}"),
    }
}

#[test]
fn non_contradictory_extra_constraints_keep_the_selection() {
    // Axis monotonicity: adding an activation on an unrelated axis does not
    // change which Db is selected.
    let tier = Axis::new("tier", &["free", "paid"]);

    let base = Activation::of([env().point("prod")]);
    let extended = Activation::of([env().point("prod"), tier.point("paid")]);

    let injector = Injector::new();
    let a = injector
        .produce_for::<App>(&db_module(), &with_activation(base))
        .unwrap();
    let b = injector
        .produce_for::<App>(&db_module(), &with_activation(extended))
        .unwrap();
    assert_eq!(a.get::<App>().unwrap().db.backend, b.get::<App>().unwrap().db.backend);
}
