//! The container: a directed acyclic graph of types and their
//! dependencies.
//!
//! `provide` teaches the container how to build values; `invoke` runs a
//! function after transitively instantiating everything it depends on.
//! Each constructor runs at most once per container; its outputs are
//! memoized. The order in which independent constructors run during one
//! `invoke` is unspecified, and grouped values are re-shuffled on every
//! read so callers cannot rely on an accidental ordering.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use tracing::debug;

use crate::cycle_detection::{verify_from, CycleFound, Mark};
use crate::error::{CyclePath, Error, MissingDependency, MissingList, Result};
use crate::key::{Key, TypeRef};
use crate::node::{Node, NodeSnapshot};
use crate::param::{Param, ParamGroup, ParamLeaf, ParamList, ParamSingle};
use crate::reflect::{value, CallArgs, FuncInfo, Outcome, Reflector, Sequence, Value};
use crate::result::ResultList;
use crate::store::{ContainerWriter, StagingWriter};

/// A dependency injection container over a host [`Reflector`].
///
/// The container is single-threaded: no operation is re-entrant, and
/// callers must serialize access themselves.
///
/// # Examples
///
/// ```
/// use luthier::{Catalog, Constructor, Container, Outcome};
///
/// #[derive(Clone)]
/// struct Config {
/// 	url: String,
/// }
///
/// #[derive(Clone)]
/// struct Server {
/// 	url: String,
/// }
///
/// let new_config = Constructor::describe("new_config")
/// 	.returns::<Config>()
/// 	.call(|_| {
/// 		Outcome::value(Config {
/// 			url: "localhost:8080".to_string(),
/// 		})
/// 	});
/// let new_server = Constructor::describe("new_server")
/// 	.takes::<Config>()
/// 	.returns::<Server>()
/// 	.call(|args| {
/// 		let config: Config = args.get(0).expect("config");
/// 		Outcome::value(Server { url: config.url })
/// 	});
///
/// let mut container = Container::new(Catalog::new());
/// container.provide(new_config)?;
/// container.provide(new_server)?;
///
/// let run = Constructor::describe("run")
/// 	.takes::<Server>()
/// 	.call(|args| {
/// 		let server: Server = args.get(0).expect("server");
/// 		assert_eq!(server.url, "localhost:8080");
/// 		Outcome::unit()
/// 	});
/// container.invoke(run)?;
/// # Ok::<(), luthier::Error>(())
/// ```
pub struct Container<R: Reflector> {
	reflector: R,
	/// Every node able to provide a value for a key. Single-valued keys
	/// hold at most one provider after registration; grouped keys hold
	/// the contributors in registration order.
	providers: HashMap<Key, Vec<usize>>,
	nodes: Vec<Node<R::Func>>,
	values: HashMap<Key, Value>,
	groups: HashMap<Key, Vec<Value>>,
	rng: Box<dyn RngCore>,
	verified_acyclic: bool,
	defer_acyclic_verification: bool,
}

/// Configures a [`Container`] before use.
pub struct ContainerBuilder<R: Reflector> {
	reflector: R,
	rng: Option<Box<dyn RngCore>>,
	defer_acyclic_verification: bool,
}

impl<R: Reflector> ContainerBuilder<R> {
	/// Defers graph validation from each `provide` to the first `invoke`.
	/// Useful when registering many constructors in a tight loop.
	pub fn defer_acyclic_verification(mut self) -> Self {
		self.defer_acyclic_verification = true;
		self
	}

	/// Replaces the source of randomness used to shuffle grouped values.
	/// Inject a seeded generator for deterministic tests.
	pub fn with_rng(mut self, rng: impl RngCore + 'static) -> Self {
		self.rng = Some(Box::new(rng));
		self
	}

	pub fn build(self) -> Container<R> {
		Container {
			reflector: self.reflector,
			providers: HashMap::new(),
			nodes: Vec::new(),
			values: HashMap::new(),
			groups: HashMap::new(),
			rng: self
				.rng
				.unwrap_or_else(|| Box::new(StdRng::from_entropy())),
			verified_acyclic: false,
			defer_acyclic_verification: self.defer_acyclic_verification,
		}
	}
}

impl<R: Reflector> Container<R> {
	/// A container with default options.
	pub fn new(reflector: R) -> Self {
		Self::builder(reflector).build()
	}

	pub fn builder(reflector: R) -> ContainerBuilder<R> {
		ContainerBuilder {
			reflector,
			rng: None,
			defer_acyclic_verification: false,
		}
	}

	/// Registers a constructor for all the keys its results flatten to.
	///
	/// The constructor runs at most once, when a key it produces (or a
	/// key downstream of one) is first demanded by `invoke`.
	pub fn provide(&mut self, constructor: R::Func) -> Result<()> {
		self.provide_impl(constructor, None)
	}

	/// Like [`provide`](Self::provide), with a default name applied to
	/// every single-valued, non-record result of this constructor.
	///
	/// Names may not contain a backquote: diagnostics quote names in
	/// backticks.
	pub fn provide_named(&mut self, constructor: R::Func, name: impl Into<String>) -> Result<()> {
		let name = name.into();
		if name.contains('`') {
			return Err(Error::BadName { name });
		}
		self.provide_impl(constructor, Some(name))
	}

	fn provide_impl(&mut self, constructor: R::Func, default_name: Option<String>) -> Result<()> {
		let signature = self.reflector.signature(&constructor).ok_or_else(|| {
			Error::BadArgument("the provided handle does not describe a constructor".to_string())
		})?;
		let location = self.reflector.location(&constructor);

		let params = ParamList::from_signature(&self.reflector, &signature.params)?;
		let results = ResultList::from_signature(
			&self.reflector,
			&signature.results,
			default_name.as_deref(),
		)?;

		let produced = results.produced();
		if produced.is_empty() {
			return Err(Error::EmptyConstructor { func: location });
		}

		// Single-valued keys are unique: within this node first, then
		// against every earlier provider.
		let mut seen: HashMap<Key, String> = HashMap::new();
		for entry in &produced {
			if entry.grouped {
				continue;
			}
			if let Some(earlier) = seen.get(&entry.key) {
				return Err(Error::DuplicateWithinNode {
					key: entry.key.clone(),
					path: entry.path.clone(),
					earlier: earlier.clone(),
				});
			}
			if let Some(ids) = self.providers.get(&entry.key) {
				if !ids.is_empty() {
					let owners = ids
						.iter()
						.map(|id| self.nodes[*id].location.to_string())
						.collect::<Vec<_>>()
						.join("; ");
					return Err(Error::DuplicateAcrossProviders {
						key: entry.key.clone(),
						path: entry.path.clone(),
						providers: owners,
					});
				}
			}
			seen.insert(entry.key.clone(), entry.path.clone());
		}

		let mut keys: Vec<Key> = Vec::new();
		for entry in &produced {
			if !keys.contains(&entry.key) {
				keys.push(entry.key.clone());
			}
		}

		let id = self.nodes.len();
		self.nodes.push(Node {
			func: constructor,
			location: location.clone(),
			called: false,
			params,
			results,
		});
		self.verified_acyclic = false;
		for key in &keys {
			self.providers.entry(key.clone()).or_default().push(id);
		}

		if !self.defer_acyclic_verification {
			let mut marks = HashMap::new();
			if let Err(found) = verify_from(self, id, &mut marks) {
				let err = self.cycle_error(found);
				// Restore providers and nodes to their pre-call state.
				for key in &keys {
					if let Some(ids) = self.providers.get_mut(key) {
						ids.pop();
						if ids.is_empty() {
							self.providers.remove(key);
						}
					}
				}
				self.nodes.pop();
				return Err(err);
			}
			self.verified_acyclic = true;
		}

		debug!(constructor = %location, id, "registered constructor");
		Ok(())
	}

	/// Runs `function` after instantiating its dependencies.
	///
	/// The function may be fallible; its own error is returned to the
	/// caller as-is.
	pub fn invoke(&mut self, function: R::Func) -> Result<()> {
		self.invoke_with(function, Vec::new())
	}

	/// Like [`invoke`](Self::invoke), with values supplied directly.
	/// Supplied values bind positionally to the function's first
	/// top-level non-record parameters and bypass the container.
	pub fn invoke_with(&mut self, function: R::Func, supplied: Vec<Value>) -> Result<()> {
		let signature = self.reflector.signature(&function).ok_or_else(|| {
			Error::BadArgument("the invoked handle does not describe a function".to_string())
		})?;
		let location = self.reflector.location(&function);
		debug!(function = %location, "invoking");

		let mut params = ParamList::from_signature(&self.reflector, &signature.params)?;
		params.bind_supplied(supplied)?;

		self.shallow_check(&params, &location)?;

		if !self.verified_acyclic {
			self.verify_whole_graph()?;
		}

		let args = match self.build_param_list(&params, &location) {
			Ok(args) => args,
			Err(source) => {
				return Err(Error::ArgumentsFailed {
					func: location,
					source: Box::new(source),
				})
			}
		};

		match self.reflector.invoke(&function, args) {
			Outcome::Returned(_) => Ok(()),
			Outcome::Failed(err) => Err(Error::Invoked(err)),
		}
	}

	/// The memoized single value under `(ty, name)`, if one was built.
	pub fn get_value(&self, name: &str, ty: TypeRef) -> Option<Value> {
		self.values.get(&Key::named(ty, name)).cloned()
	}

	/// All contributions currently stored for `(ty, group)`, as a
	/// shuffled copy; the stored order is never exposed.
	pub fn get_value_group(&mut self, group: &str, ty: TypeRef) -> Vec<Value> {
		let items = self
			.groups
			.get(&Key::grouped(ty, group))
			.cloned()
			.unwrap_or_default();
		self.shuffled_copy(items)
	}

	/// Providers able to produce the single value `(ty, name)`.
	pub fn get_value_providers(&self, name: &str, ty: TypeRef) -> Vec<NodeSnapshot> {
		self.snapshots_for(&Key::named(ty, name))
	}

	/// Providers contributing to the group `(ty, group)`.
	pub fn get_group_providers(&self, group: &str, ty: TypeRef) -> Vec<NodeSnapshot> {
		self.snapshots_for(&Key::grouped(ty, group))
	}

	/// Every registered constructor, in registration order.
	pub fn nodes(&self) -> Vec<NodeSnapshot> {
		self.nodes
			.iter()
			.enumerate()
			.map(|(id, node)| node.snapshot(id))
			.collect()
	}

	/// Every type with at least one provider, deduplicated and sorted by
	/// type name for diagnostic stability.
	pub fn known_types(&self) -> Vec<TypeRef> {
		let set: HashSet<TypeRef> = self.providers.keys().map(|key| key.ty()).collect();
		let mut types: Vec<TypeRef> = set.into_iter().collect();
		types.sort_by(|a, b| a.name().cmp(b.name()));
		types
	}

	pub(crate) fn node_param_leaves(&self, id: usize) -> Vec<ParamLeaf> {
		self.nodes[id].params.leaves()
	}

	pub(crate) fn providers_for(&self, key: &Key) -> Vec<usize> {
		self.providers.get(key).cloned().unwrap_or_default()
	}

	fn snapshots_for(&self, key: &Key) -> Vec<NodeSnapshot> {
		self.providers_for(key)
			.into_iter()
			.map(|id| self.nodes[id].snapshot(id))
			.collect()
	}

	fn verify_whole_graph(&mut self) -> Result<()> {
		let mut marks: HashMap<usize, Mark> = HashMap::new();
		for id in 0..self.nodes.len() {
			if marks.get(&id) == Some(&Mark::Done) {
				continue;
			}
			if let Err(found) = verify_from(self, id, &mut marks) {
				return Err(self.cycle_error(found));
			}
		}
		self.verified_acyclic = true;
		Ok(())
	}

	fn cycle_error(&self, found: CycleFound) -> Error {
		Error::Cycle {
			path: CyclePath {
				entries: found
					.path
					.iter()
					.map(|id| self.nodes[*id].location.clone())
					.collect(),
			},
		}
	}

	/// Verifies that every required single leaf has at least one
	/// provider, aggregating all missing keys into one error. Grouped
	/// leaves are never missing: an empty group is legal and materializes
	/// as an empty sequence.
	fn shallow_check(&self, params: &ParamList, func: &FuncInfo) -> Result<()> {
		let mut entries = Vec::new();
		for leaf in params.leaves() {
			if leaf.grouped || leaf.optional {
				continue;
			}
			if self.providers_for(&leaf.key).is_empty() {
				entries.push(MissingDependency {
					suggestions: self.suggestions_for(&leaf.key),
					key: leaf.key,
				});
			}
		}
		if entries.is_empty() {
			Ok(())
		} else {
			Err(Error::MissingDependencies {
				func: func.clone(),
				missing: MissingList { entries },
			})
		}
	}

	/// Keys of the same type under other names or groups, offered as
	/// did-you-mean hints.
	fn suggestions_for(&self, key: &Key) -> Vec<Key> {
		let mut out: Vec<Key> = self
			.providers
			.keys()
			.filter(|candidate| candidate.ty() == key.ty() && *candidate != key)
			.cloned()
			.collect();
		out.sort_by_key(|candidate| candidate.to_string());
		out
	}

	fn build_param_list(&mut self, params: &ParamList, consumer: &FuncInfo) -> Result<Vec<Value>> {
		let mut out = Vec::with_capacity(params.params.len());
		for param in &params.params {
			out.push(self.build_param(param, consumer)?);
		}
		Ok(out)
	}

	fn build_param(&mut self, param: &Param, consumer: &FuncInfo) -> Result<Value> {
		match param {
			Param::Supplied(supplied) => Ok(supplied.value.clone()),
			Param::Single(single) => self.build_single(single, consumer),
			Param::Grouped(group) => self.build_group(group),
			Param::Object(object) => {
				let mut fields = Vec::with_capacity(object.fields.len());
				for field in &object.fields {
					fields.push(self.build_param(&field.param, consumer)?);
				}
				Ok((object.compose)(CallArgs::new(&fields)))
			}
		}
	}

	fn build_single(&mut self, single: &ParamSingle, consumer: &FuncInfo) -> Result<Value> {
		let key = Key::named(single.ty, single.name.clone());
		if let Some(existing) = self.values.get(&key) {
			return Ok(existing.clone());
		}

		for id in self.providers_for(&key) {
			self.call_node(id)?;
		}

		if let Some(built) = self.values.get(&key) {
			return Ok(built.clone());
		}
		if single.optional {
			return self
				.reflector
				.default_value(single.ty)
				.ok_or(Error::MissingDefault { key });
		}
		Err(Error::MissingDependencies {
			func: consumer.clone(),
			missing: MissingList {
				entries: vec![MissingDependency {
					suggestions: self.suggestions_for(&key),
					key,
				}],
			},
		})
	}

	fn build_group(&mut self, group: &ParamGroup) -> Result<Value> {
		let key = Key::grouped(group.ty, group.group.clone());
		for id in self.providers_for(&key) {
			self.call_node(id)?;
		}
		let items = self.groups.get(&key).cloned().unwrap_or_default();
		let shuffled = self.shuffled_copy(items);
		Ok(value(Sequence(shuffled)))
	}

	/// Calls the node's constructor unless it already ran, staging its
	/// outputs and committing them in one step. A failed constructor
	/// commits nothing and stays callable.
	fn call_node(&mut self, id: usize) -> Result<()> {
		if self.nodes[id].called {
			return Ok(());
		}

		let location = self.nodes[id].location.clone();
		let params = self.nodes[id].params.clone();
		let results = self.nodes[id].results.clone();
		let func = self.nodes[id].func.clone();

		// Registrations may have changed since verification; re-check so
		// the error names this constructor.
		self.shallow_check(&params, &location)?;

		let args = match self.build_param_list(&params, &location) {
			Ok(args) => args,
			Err(source) => {
				return Err(Error::ArgumentsFailed {
					func: location,
					source: Box::new(source),
				})
			}
		};

		debug!(constructor = %location, "calling constructor");
		let returned = match self.reflector.invoke(&func, args) {
			Outcome::Returned(values) => values,
			Outcome::Failed(err) => {
				return Err(Error::ConstructorFailed {
					func: location,
					source: err,
				})
			}
		};

		let mut staging = StagingWriter::new();
		if let Err(err) = results.extract(returned, &mut staging) {
			return Err(Error::ConstructorFailed {
				func: location,
				source: Box::new(err),
			});
		}
		staging.commit(self);
		self.nodes[id].called = true;
		Ok(())
	}

	fn shuffled_copy(&mut self, mut items: Vec<Value>) -> Vec<Value> {
		items.shuffle(self.rng.as_mut());
		items
	}
}

impl<R: Reflector> ContainerWriter for Container<R> {
	fn set_value(&mut self, name: &str, ty: TypeRef, value: Value) {
		self.values.insert(Key::named(ty, name), value);
	}

	fn submit_grouped_value(&mut self, group: &str, ty: TypeRef, value: Value) {
		self.groups
			.entry(Key::grouped(ty, group))
			.or_default()
			.push(value);
	}
}
