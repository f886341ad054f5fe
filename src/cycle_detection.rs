//! Acyclic verification of the dependency graph.
//!
//! The graph is a hypergraph: each constructor is one node, and an edge
//! runs from node `u` to node `v` when `v` provides a single value `u`
//! demands, or contributes to a group `u` consumes. Verification is a
//! depth-first search with three-color marking; a node seen again while
//! still on the current path closes a cycle, and the offending slice of
//! the path is reported.
//!
//! Two modes drive this from the container: eagerly after each `provide`
//! (rooted at the new node only — the prior graph was acyclic, so any new
//! cycle must run through it) or lazily over all nodes at first `invoke`.

use std::collections::HashMap;

use crate::container::Container;
use crate::reflect::Reflector;

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mark {
	OnPath,
	Done,
}

/// The node path of a detected cycle: the repeated node first, the walk
/// back around to it last.
pub(crate) struct CycleFound {
	pub path: Vec<usize>,
}

/// Verifies every node reachable from `root`, sharing `marks` across
/// roots so repeated subgraphs are walked once.
pub(crate) fn verify_from<R: Reflector>(
	container: &Container<R>,
	root: usize,
	marks: &mut HashMap<usize, Mark>,
) -> Result<(), CycleFound> {
	let mut path = Vec::new();
	visit(container, root, marks, &mut path)
}

fn visit<R: Reflector>(
	container: &Container<R>,
	node: usize,
	marks: &mut HashMap<usize, Mark>,
	path: &mut Vec<usize>,
) -> Result<(), CycleFound> {
	match marks.get(&node) {
		Some(Mark::Done) => return Ok(()),
		Some(Mark::OnPath) => {
			let start = path.iter().position(|id| *id == node).unwrap_or(0);
			let mut cycle = path[start..].to_vec();
			cycle.push(node);
			return Err(CycleFound { path: cycle });
		}
		None => {}
	}

	marks.insert(node, Mark::OnPath);
	path.push(node);

	// Leaves with no provider are skipped here; missing dependencies are
	// reported at invoke time, not as cycles.
	for leaf in container.node_param_leaves(node) {
		for child in container.providers_for(&leaf.key) {
			visit(container, child, marks, path)?;
		}
	}

	path.pop();
	marks.insert(node, Mark::Done);
	Ok(())
}
