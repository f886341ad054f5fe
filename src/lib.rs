//! # Luthier
//!
//! A reflection-style dependency injection container: register
//! constructors, and `invoke` a function to have every value it depends
//! on built transitively, at most once per container.
//!
//! ## Features
//!
//! - **Type-keyed registry**: values are identified by type plus an
//!   optional name, or accumulated into named value groups
//! - **Acyclic by construction**: dependency cycles are rejected at
//!   registration (or, deferred, at first invoke) with the offending path
//! - **Memoized**: each constructor runs at most once; a constructor that
//!   fails commits nothing and can be retried
//! - **Order-free groups**: grouped values are re-shuffled on every read,
//!   so nothing can depend on an accidental ordering
//! - **Host-pluggable reflection**: the container sees user functions
//!   only through the [`Reflector`] trait; the built-in [`Catalog`] is a
//!   descriptor DSL, but generated code works just as well
//!
//! ## Example
//!
//! ```
//! use luthier::{Catalog, Constructor, Container, Outcome};
//!
//! #[derive(Clone)]
//! struct Config {
//! 	workers: usize,
//! }
//!
//! #[derive(Clone)]
//! struct Pool {
//! 	size: usize,
//! }
//!
//! let new_config = Constructor::describe("new_config")
//! 	.returns::<Config>()
//! 	.call(|_| Outcome::value(Config { workers: 4 }));
//!
//! let new_pool = Constructor::describe("new_pool")
//! 	.takes::<Config>()
//! 	.returns::<Pool>()
//! 	.call(|args| {
//! 		let config: Config = args.get(0).expect("config");
//! 		Outcome::value(Pool {
//! 			size: config.workers,
//! 		})
//! 	});
//!
//! let mut container = Container::new(Catalog::new());
//! container.provide(new_config)?;
//! container.provide(new_pool)?;
//!
//! let run = Constructor::describe("run")
//! 	.takes::<Pool>()
//! 	.call(|args| {
//! 		let pool: Pool = args.get(0).expect("pool");
//! 		assert_eq!(pool.size, 4);
//! 		Outcome::unit()
//! 	});
//! container.invoke(run)?;
//! # Ok::<(), luthier::Error>(())
//! ```
//!
//! Parameter and result objects (records whose tagged fields flatten into
//! multiple container slots) are registered on the [`Catalog`]; see the
//! [`catalog`] module. The dependency graph can be rendered to Graphviz
//! with the [`visualization`] module.

mod container;
mod cycle_detection;
mod error;
mod key;
mod node;
mod param;
mod result;
mod store;

pub mod catalog;
pub mod reflect;
pub mod visualization;

pub use catalog::{Catalog, Constructor, ConstructorBuilder, Ctor, Field, RecordBuilder};
pub use container::{Container, ContainerBuilder};
pub use error::{CyclePath, Error, MissingDependency, MissingList, Result};
pub use key::{Key, TypeRef};
pub use node::NodeSnapshot;
pub use param::ParamLeaf;
pub use reflect::{
	cast, value, CallArgs, DynError, FieldInfo, FieldTags, FuncInfo, Outcome, RecordInfo,
	RecordKind, Reflector, Sequence, Signature, Value,
};
pub use result::ProducedKey;
