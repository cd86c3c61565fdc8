use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kiln_di::{Binding, Functoid, Injector, Key, Module, ProduceOptions};
use std::sync::Arc;

struct Config {
    value: u64,
}

struct Layer1 {
    value: u64,
}
struct Layer2 {
    value: u64,
}
struct Layer3 {
    value: u64,
}

fn chain_module() -> Module {
    Module::new()
        .with(Binding::instance(Config { value: 1 }))
        .with(Binding::factory::<Layer1>(Functoid::of1(|c: Arc<Config>| Layer1 {
            value: c.value + 1,
        })))
        .with(Binding::factory::<Layer2>(Functoid::of1(|l: Arc<Layer1>| Layer2 {
            value: l.value + 1,
        })))
        .with(Binding::factory::<Layer3>(Functoid::of1(|l: Arc<Layer2>| Layer3 {
            value: l.value + 1,
        })))
}

fn bench_plan_chain(c: &mut Criterion) {
    let injector = Injector::new();
    let module = chain_module();
    let options = ProduceOptions::default();

    c.bench_function("plan_chain_of_4", |b| {
        b.iter(|| {
            let plan = injector
                .plan(&module, vec![Key::of::<Layer3>()], &options)
                .unwrap();
            black_box(plan.len());
        })
    });
}

fn bench_produce_chain(c: &mut Criterion) {
    let injector = Injector::new();
    let module = chain_module();
    let options = ProduceOptions::default();

    c.bench_function("produce_chain_of_4", |b| {
        b.iter(|| {
            let locator = injector
                .produce(&module, vec![Key::of::<Layer3>()], &options)
                .unwrap();
            black_box(locator.get::<Layer3>().unwrap().value);
        })
    });
}

fn bench_plan_wide_set(c: &mut Criterion) {
    #[allow(dead_code)]
    struct Plugin {
        id: usize,
    }

    let mut module = Module::new();
    for id in 0..64 {
        module.add(Binding::element_factory::<Plugin>(Functoid::of0(move || Plugin { id })));
    }
    let injector = Injector::new();
    let options = ProduceOptions::default();

    c.bench_function("plan_set_of_64", |b| {
        b.iter(|| {
            let plan = injector
                .plan(&module, vec![Key::set_of::<Plugin>()], &options)
                .unwrap();
            black_box(plan.len());
        })
    });
}

criterion_group!(benches, bench_plan_chain, bench_produce_chain, bench_plan_wide_set);
criterion_main!(benches);
