//! Dependency graph visualization for development and debugging.
//!
//! Renders a container's constructors and keys in DOT format for
//! Graphviz: one cluster per constructor containing the keys it produces,
//! and one edge per dependency (dashed when optional).
//!
//! ## Example
//!
//! ```
//! use luthier::visualization::DependencyGraph;
//! use luthier::{Catalog, Constructor, Container, Outcome};
//!
//! #[derive(Clone)]
//! struct Database;
//!
//! let mut container = Container::new(Catalog::new());
//! container
//! 	.provide(
//! 		Constructor::describe("new_database")
//! 			.returns::<Database>()
//! 			.call(|_| Outcome::value(Database)),
//! 	)
//! 	.unwrap();
//!
//! let dot = DependencyGraph::from_container(&container).to_dot();
//! assert!(dot.contains("digraph"));
//! assert!(dot.contains("new_database"));
//! ```

use crate::container::Container;
use crate::key::Key;
use crate::node::NodeSnapshot;
use crate::reflect::Reflector;

/// A snapshot of the container's provider graph, ready to render.
#[derive(Debug, Default)]
pub struct DependencyGraph {
	nodes: Vec<NodeSnapshot>,
}

/// Statistics about a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStatistics {
	/// Number of constructors.
	pub constructor_count: usize,
	/// Number of distinct keys produced.
	pub key_count: usize,
	/// Distinct single-valued keys produced.
	pub single_count: usize,
	/// Distinct grouped keys produced.
	pub group_count: usize,
	/// Number of dependency edges.
	pub edge_count: usize,
}

impl DependencyGraph {
	/// Captures the container's registered constructors.
	pub fn from_container<R: Reflector>(container: &Container<R>) -> Self {
		Self {
			nodes: container.nodes(),
		}
	}

	/// Generates DOT format output for Graphviz.
	pub fn to_dot(&self) -> String {
		let mut output = String::from("digraph {\n");
		output.push_str("  graph [compound=true];\n");
		output.push_str("  node [shape=box, style=rounded];\n\n");

		for node in &self.nodes {
			output.push_str(&format!("  subgraph cluster_{} {{\n", node.id));
			output.push_str(&format!(
				"    constructor_{} [shape=plaintext label={}];\n",
				node.id,
				quote(&node.location.name)
			));
			for result in &node.results {
				let color = if result.grouped {
					"lightgreen"
				} else {
					"lightblue"
				};
				output.push_str(&format!(
					"    {} [fillcolor={color}, style=filled];\n",
					quote(&label(&result.key))
				));
			}
			output.push_str("  }\n");

			for param in &node.params {
				let style = if param.optional { " [style=dashed]" } else { "" };
				output.push_str(&format!(
					"  constructor_{} -> {}{style};\n",
					node.id,
					quote(&label(&param.key))
				));
			}
		}

		output.push_str("}\n");
		output
	}

	/// Counts constructors, keys and edges.
	pub fn statistics(&self) -> GraphStatistics {
		let mut singles: Vec<String> = Vec::new();
		let mut groups: Vec<String> = Vec::new();
		let mut edge_count = 0;

		for node in &self.nodes {
			for result in &node.results {
				let rendered = label(&result.key);
				let bucket = if result.grouped {
					&mut groups
				} else {
					&mut singles
				};
				if !bucket.contains(&rendered) {
					bucket.push(rendered);
				}
			}
			edge_count += node.params.len();
		}

		GraphStatistics {
			constructor_count: self.nodes.len(),
			key_count: singles.len() + groups.len(),
			single_count: singles.len(),
			group_count: groups.len(),
			edge_count,
		}
	}
}

fn label(key: &Key) -> String {
	key.to_string()
}

fn quote(raw: &str) -> String {
	format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::{Catalog, Constructor, Field};
	use crate::reflect::{value, Outcome};

	#[derive(Clone)]
	struct Database;

	#[derive(Clone)]
	struct Service;

	#[derive(Clone)]
	struct ServiceDeps {
		#[allow(dead_code)]
		database: Option<Database>,
	}

	#[test]
	fn dot_marks_optional_edges_dashed() {
		let mut catalog = Catalog::new();
		catalog
			.param_record::<ServiceDeps>()
			.field(Field::of::<Database>("database").optional())
			.compose(|fields| {
				value(ServiceDeps {
					database: fields.get::<Database>(0),
				})
			});

		let mut container = Container::new(catalog);
		container
			.provide(
				Constructor::describe("new_service")
					.takes::<ServiceDeps>()
					.returns::<Service>()
					.call(|_| Outcome::value(Service)),
			)
			.expect("provide");

		let dot = DependencyGraph::from_container(&container).to_dot();

		assert!(dot.contains("digraph"));
		assert!(dot.contains("new_service"));
		assert!(dot.contains("[style=dashed]"));
	}

	#[test]
	fn statistics_count_constructors_and_keys() {
		let mut container = Container::new(Catalog::new());
		container
			.provide(
				Constructor::describe("new_database")
					.returns::<Database>()
					.call(|_| Outcome::value(Database)),
			)
			.expect("provide");
		container
			.provide(
				Constructor::describe("new_service")
					.takes::<Database>()
					.returns::<Service>()
					.call(|_| Outcome::value(Service)),
			)
			.expect("provide");

		let stats = DependencyGraph::from_container(&container).statistics();

		assert_eq!(stats.constructor_count, 2);
		assert_eq!(stats.key_count, 2);
		assert_eq!(stats.single_count, 2);
		assert_eq!(stats.group_count, 0);
		assert_eq!(stats.edge_count, 1);
	}
}
