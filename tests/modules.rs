use kiln_di::{
    Activation, Axis, Binding, DiResult, Functoid, Injector, Key, Module, ModuleDef,
    ProduceOptions,
};
use std::sync::Arc;

struct Config {
    url: String,
}

#[test]
fn append_keeps_both_sides_in_order() {
    struct Left;
    struct Right;

    let left = Module::new().with(Binding::instance(Left));
    let right = Module::new().with(Binding::instance(Right));
    let merged = left.append(right);

    assert_eq!(merged.len(), 2);
    assert_eq!(merged.bindings()[0].key(), &Key::of::<Left>());
    assert_eq!(merged.bindings()[1].key(), &Key::of::<Right>());
}

#[test]
fn override_selects_the_overlay_binding() {
    let base = Module::new().with(Binding::instance(Config { url: "real".into() }));
    let doubles = Module::new().with(Binding::instance(Config { url: "fake".into() }));

    let locator = Injector::new()
        .produce_for::<Config>(&base.overridden_by(doubles), &ProduceOptions::default())
        .unwrap();
    assert_eq!(locator.get::<Config>().unwrap().url, "fake");
}

#[test]
fn override_matches_planning_against_the_overlay_alone() {
    // A tagged family in the overlay replaces a single base binding and is
    // still selected per activation, exactly as planning the overlay alone
    // would.
    let env = Axis::new("env", &["prod", "dev"]);

    let base = Module::new().with(Binding::instance(Config { url: "base".into() }));
    let overlay = Module::new()
        .with(Binding::instance(Config { url: "prod".into() }).tagged(env.point("prod")))
        .with(Binding::instance(Config { url: "dev".into() }).tagged(env.point("dev")));

    let merged = base.overridden_by(overlay);
    let injector = Injector::new();

    for (choice, expected) in [("prod", "prod"), ("dev", "dev")] {
        let options = ProduceOptions::default()
            .with_activation(Activation::of([env.point(choice)]));
        let locator = injector.produce_for::<Config>(&merged, &options).unwrap();
        assert_eq!(locator.get::<Config>().unwrap().url, expected);
    }
}

#[test]
fn override_leaves_unrelated_keys_alone() {
    struct Other {
        marker: &'static str,
    }

    let base = Module::new()
        .with(Binding::instance(Config { url: "real".into() }))
        .with(Binding::instance(Other { marker: "base" }));
    let overlay = Module::new().with(Binding::instance(Config { url: "fake".into() }));

    let locator = Injector::new()
        .produce(
            &base.overridden_by(overlay),
            vec![Key::of::<Config>(), Key::of::<Other>()],
            &ProduceOptions::default(),
        )
        .unwrap();
    assert_eq!(locator.get::<Config>().unwrap().url, "fake");
    assert_eq!(locator.get::<Other>().unwrap().marker, "base");
}

#[test]
fn override_accumulates_set_elements_from_both_sides() {
    struct Plugin {
        name: &'static str,
    }

    let base = Module::new()
        .with(Binding::element_instance(Plugin { name: "base" }))
        .with(Binding::instance(Config { url: "real".into() }));
    let overlay = Module::new()
        .with(Binding::element_instance(Plugin { name: "overlay" }))
        .with(Binding::instance(Config { url: "fake".into() }));

    let locator = Injector::new()
        .produce(
            &base.overridden_by(overlay),
            vec![Key::set_of::<Plugin>(), Key::of::<Config>()],
            &ProduceOptions::default(),
        )
        .unwrap();

    let names: Vec<&str> = locator
        .get_set::<Plugin>()
        .unwrap()
        .iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["base", "overlay"]);
}

#[test]
fn identity_laws_hold() {
    let module = Module::new()
        .with(Binding::instance(Config { url: "x".into() }))
        .with(Binding::factory::<usize>(Functoid::of1(|c: Arc<Config>| c.url.len())));

    assert_eq!(module.clone().append(Module::new()).len(), module.len());
    assert_eq!(module.clone().overridden_by(Module::new()).len(), module.len());
    assert_eq!(Module::new().append(module.clone()).len(), module.len());
}

#[test]
fn module_defs_install_their_bindings() {
    struct StorageModule {
        url: &'static str,
    }

    impl ModuleDef for StorageModule {
        fn configure(self, module: &mut Module) -> DiResult<()> {
            module.add(Binding::instance(Config { url: self.url.into() }));
            Ok(())
        }
    }

    let mut module = Module::new();
    module.install(StorageModule { url: "db://installed" }).unwrap();

    let locator = Injector::new()
        .produce_for::<Config>(&module, &ProduceOptions::default())
        .unwrap();
    assert_eq!(locator.get::<Config>().unwrap().url, "db://installed");
}

#[test]
fn registered_constructors_back_construct_bindings() {
    struct Repo {
        url: String,
    }

    kiln_di::register_constructor::<Repo>(Functoid::of1(|c: Arc<Config>| Repo {
        url: c.url.clone(),
    }));

    let module = Module::new()
        .with(Binding::instance(Config { url: "db://reg".into() }))
        .with(Binding::construct::<Repo>().unwrap());

    let locator = Injector::new()
        .produce_for::<Repo>(&module, &ProduceOptions::default())
        .unwrap();
    assert_eq!(locator.get::<Repo>().unwrap().url, "db://reg");
}
