//! Benchmark: dependency resolution (cold build vs memoized reuse)

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use luthier::{Catalog, Constructor, Container, Ctor, Outcome};

// Benchmark fixture: a four-level constructor chain
#[derive(Clone)]
struct Config {
	workers: usize,
}

#[derive(Clone)]
struct Pool {
	size: usize,
}

#[derive(Clone)]
struct Service {
	pool_size: usize,
}

#[derive(Clone)]
struct App {
	ready: bool,
}

fn chain() -> Vec<Ctor> {
	vec![
		Constructor::describe("new_config")
			.returns::<Config>()
			.call(|_| Outcome::value(Config { workers: 4 })),
		Constructor::describe("new_pool")
			.takes::<Config>()
			.returns::<Pool>()
			.call(|args| {
				let config: Config = args.get(0).expect("config");
				Outcome::value(Pool {
					size: config.workers,
				})
			}),
		Constructor::describe("new_service")
			.takes::<Pool>()
			.returns::<Service>()
			.call(|args| {
				let pool: Pool = args.get(0).expect("pool");
				Outcome::value(Service {
					pool_size: pool.size,
				})
			}),
		Constructor::describe("new_app")
			.takes::<Service>()
			.returns::<App>()
			.call(|args| {
				let service: Service = args.get(0).expect("service");
				Outcome::value(App {
					ready: service.pool_size > 0,
				})
			}),
	]
}

fn consumer() -> Ctor {
	Constructor::describe("run").takes::<App>().call(|args| {
		let app: App = args.get(0).expect("app");
		black_box(app.ready);
		Outcome::unit()
	})
}

fn benchmark_cold_resolution(c: &mut Criterion) {
	c.bench_function("cold_resolution", |b| {
		b.iter(|| {
			let mut container = Container::new(Catalog::new());
			for ctor in chain() {
				container.provide(ctor).expect("provide");
			}
			container.invoke(consumer()).expect("invoke");
		});
	});
}

fn benchmark_memoized_reuse(c: &mut Criterion) {
	let mut container = Container::new(Catalog::new());
	for ctor in chain() {
		container.provide(ctor).expect("provide");
	}
	let run = consumer();
	container.invoke(run.clone()).expect("warm up");

	c.bench_function("memoized_reuse", |b| {
		b.iter(|| {
			container.invoke(run.clone()).expect("invoke");
		});
	});
}

criterion_group!(
	benches,
	benchmark_cold_resolution,
	benchmark_memoized_reuse
);
criterion_main!(benches);
