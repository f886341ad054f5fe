//! Property-based tests for value groups.
//!
//! Verified invariants:
//! 1. A group read always holds exactly the contributed multiset, for any
//!    RNG seed and any number of contributors.
//! 2. The read order is not stable: across many reads of a group with at
//!    least two contributors, more than one order appears.
//! 3. An injected RNG makes read orders reproducible.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use luthier::{value, CallArgs, Catalog, Constructor, Container, Ctor, Field, Outcome};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Handler {
	id: usize,
}

#[derive(Clone)]
struct HandlerOut {
	handler: Handler,
}

#[derive(Clone)]
struct HandlerSet {
	handlers: Vec<Handler>,
}

fn group_catalog() -> Catalog {
	let mut catalog = Catalog::new();
	catalog
		.result_record::<HandlerOut>()
		.field(Field::of::<Handler>("handler").grouped("handlers"))
		.deconstruct(|out: &HandlerOut| vec![value(out.handler.clone())]);
	catalog
		.param_record::<HandlerSet>()
		.field(Field::of::<Handler>("handlers").grouped("handlers"))
		.compose(|fields: CallArgs<'_>| {
			value(HandlerSet {
				handlers: fields.sequence(0).expect("handlers"),
			})
		});
	catalog
}

fn contributor(id: usize) -> Ctor {
	Constructor::describe(format!("contribute_{id}"))
		.returns::<HandlerOut>()
		.call(move |_| {
			Outcome::value(HandlerOut {
				handler: Handler { id },
			})
		})
}

fn recording_consumer(sink: Arc<Mutex<Vec<Vec<usize>>>>) -> Ctor {
	Constructor::describe("record_order")
		.takes::<HandlerSet>()
		.call(move |args| {
			let set: HandlerSet = args.get(0).expect("set");
			sink.lock()
				.expect("lock")
				.push(set.handlers.iter().map(|h| h.id).collect());
			Outcome::unit()
		})
}

proptest! {
	// Property 1: every read is a permutation of the contributions.
	#[test]
	fn group_reads_are_permutations(seed in any::<u64>(), count in 1usize..6) {
		let mut container = Container::builder(group_catalog())
			.with_rng(StdRng::seed_from_u64(seed))
			.build();
		for id in 0..count {
			container.provide(contributor(id)).expect("provide");
		}

		let observed = Arc::new(Mutex::new(Vec::new()));
		let consumer = recording_consumer(observed.clone());
		container.invoke(consumer.clone()).expect("first read");
		container.invoke(consumer).expect("second read");

		let observed = observed.lock().expect("lock");
		prop_assert_eq!(observed.len(), 2);
		for read in observed.iter() {
			let mut sorted = read.clone();
			sorted.sort_unstable();
			prop_assert_eq!(&sorted, &(0..count).collect::<Vec<_>>());
		}
	}
}

#[test]
fn read_order_varies_across_reads() {
	// Arrange
	let mut container = Container::builder(group_catalog())
		.with_rng(StdRng::seed_from_u64(7))
		.build();
	for id in 0..4usize {
		container.provide(contributor(id)).expect("provide");
	}

	let observed = Arc::new(Mutex::new(Vec::new()));
	let consumer = recording_consumer(observed.clone());

	// Act: 4 contributors have 24 orders; over 40 reads a single order
	// appearing every time would mean the shuffle is not happening.
	for _ in 0..40 {
		container.invoke(consumer.clone()).expect("read");
	}

	// Assert
	let orders: HashSet<Vec<usize>> = observed.lock().expect("lock").iter().cloned().collect();
	assert!(orders.len() > 1, "all 40 reads returned the same order");
}

#[test]
fn injected_rng_makes_reads_reproducible() {
	// Arrange: two containers over the same catalog and seed
	let catalog = group_catalog();
	let run = |catalog: Catalog| {
		let mut container = Container::builder(catalog)
			.with_rng(StdRng::seed_from_u64(42))
			.build();
		for id in 0..5usize {
			container.provide(contributor(id)).expect("provide");
		}
		let observed = Arc::new(Mutex::new(Vec::new()));
		let consumer = recording_consumer(observed.clone());
		for _ in 0..3 {
			container.invoke(consumer.clone()).expect("read");
		}
		let observed = observed.lock().expect("lock");
		observed.clone()
	};

	// Act
	let first = run(catalog.clone());
	let second = run(catalog);

	// Assert
	assert_eq!(first, second);
}
