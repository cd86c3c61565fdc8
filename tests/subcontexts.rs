use kiln_di::{Binding, Functoid, Injector, Key, Module, ProduceOptions};
use std::sync::{Arc, Mutex};

struct Cfg {
    value: &'static str,
}

struct Plugin {
    name: &'static str,
}

fn parent_module() -> Module {
    Module::new()
        .with(Binding::instance(Cfg { value: "parent" }))
        .with(Binding::element_instance(Plugin { name: "p1" }))
}

fn child_module() -> Module {
    Module::new()
        .with(Binding::instance(Cfg { value: "child" }))
        .with(Binding::element_instance(Plugin { name: "p2" }))
}

fn produce_parent() -> Arc<kiln_di::Locator> {
    Injector::new()
        .produce(
            &parent_module(),
            vec![Key::of::<Cfg>(), Key::set_of::<Plugin>()],
            &ProduceOptions::default(),
        )
        .unwrap()
}

#[test]
fn child_bindings_shadow_and_sets_merge() {
    let parent = produce_parent();
    let sub = Injector::new()
        .create_subcontext(
            parent.clone(),
            &child_module(),
            vec![Key::of::<Cfg>(), Key::set_of::<Plugin>()],
            &ProduceOptions::default(),
        )
        .unwrap();

    assert_eq!(sub.get::<Cfg>().unwrap().value, "child");
    assert_eq!(parent.get::<Cfg>().unwrap().value, "parent");

    let mut names: Vec<&str> = sub.get_set::<Plugin>().unwrap().iter().map(|p| p.name).collect();
    names.sort();
    assert_eq!(names, vec!["p1", "p2"]);

    // The parent's view of the set is untouched.
    assert_eq!(parent.get_set::<Plugin>().unwrap().len(), 1);
}

#[test]
fn parent_keys_fall_through_when_child_lacks_them() {
    struct OnlyInParent;

    let parent = Injector::new()
        .produce(
            &parent_module().with(Binding::instance(OnlyInParent)),
            vec![Key::of::<Cfg>(), Key::of::<OnlyInParent>()],
            &ProduceOptions::default(),
        )
        .unwrap();

    let sub = Injector::new()
        .create_subcontext(
            parent,
            &Module::new(),
            vec![],
            &ProduceOptions::default(),
        )
        .unwrap();

    assert!(sub.has(&Key::of::<OnlyInParent>()));
    assert_eq!(sub.get::<Cfg>().unwrap().value, "parent");
    assert!(sub.keys().next().is_none());
}

#[test]
fn child_dependencies_resolve_against_the_parent() {
    struct Service {
        cfg_value: &'static str,
    }

    let parent = produce_parent();
    let module = Module::new().with(Binding::factory::<Service>(Functoid::of1(
        |cfg: Arc<Cfg>| Service { cfg_value: cfg.value },
    )));

    let sub = Injector::new()
        .create_subcontext(
            parent,
            &module,
            vec![Key::of::<Service>()],
            &ProduceOptions::default(),
        )
        .unwrap();

    assert_eq!(sub.get::<Service>().unwrap().cfg_value, "parent");
}

#[test]
fn subcontexts_nest_to_arbitrary_depth() {
    let parent = produce_parent();
    let injector = Injector::new();

    let mid = injector
        .create_subcontext(
            parent,
            &child_module(),
            vec![Key::of::<Cfg>(), Key::set_of::<Plugin>()],
            &ProduceOptions::default(),
        )
        .unwrap();

    let leaf_module = Module::new().with(Binding::element_instance(Plugin { name: "p3" }));
    let leaf = injector
        .create_subcontext(
            mid.locator().clone(),
            &leaf_module,
            vec![Key::set_of::<Plugin>()],
            &ProduceOptions::default(),
        )
        .unwrap();

    // The leaf still sees the middle scope's Cfg and all three plugins.
    assert_eq!(leaf.get::<Cfg>().unwrap().value, "child");
    let mut names: Vec<&str> = leaf.get_set::<Plugin>().unwrap().iter().map(|p| p.name).collect();
    names.sort();
    assert_eq!(names, vec!["p1", "p2", "p3"]);
}

#[test]
fn closing_a_subcontext_leaves_the_parent_usable() {
    let parent = produce_parent();
    let closed = Arc::new(Mutex::new(Vec::new()));

    {
        let closed = closed.clone();
        parent.on_close(move || {
            closed.lock().unwrap().push("parent");
            Ok(())
        });
    }

    let sub = Injector::new()
        .create_subcontext(
            parent.clone(),
            &child_module(),
            vec![Key::of::<Cfg>()],
            &ProduceOptions::default(),
        )
        .unwrap();
    {
        let closed = closed.clone();
        sub.locator().on_close(move || {
            closed.lock().unwrap().push("child");
            Ok(())
        });
    }

    sub.close().unwrap();
    assert_eq!(*closed.lock().unwrap(), vec!["child"]);
    assert_eq!(parent.get::<Cfg>().unwrap().value, "parent");

    parent.close().unwrap();
    assert_eq!(*closed.lock().unwrap(), vec!["child", "parent"]);
}
