//! Provider nodes.
//!
//! One node per registered constructor. A node is immutable after
//! registration except for its `called` flag; `called` implies that every
//! key in its result tree has a value (or a group contribution) stored in
//! the container.

use crate::param::{ParamLeaf, ParamList};
use crate::reflect::FuncInfo;
use crate::result::{ProducedKey, ResultList};

pub(crate) struct Node<F> {
	pub func: F,
	pub location: FuncInfo,
	pub called: bool,
	pub params: ParamList,
	pub results: ResultList,
}

/// Read-only view of a registered constructor, sufficient to drive graph
/// tooling: stable id, provenance, flattened demands and productions.
#[derive(Clone, Debug)]
pub struct NodeSnapshot {
	pub id: usize,
	pub location: FuncInfo,
	pub params: Vec<ParamLeaf>,
	pub results: Vec<ProducedKey>,
}

impl<F> Node<F> {
	pub(crate) fn snapshot(&self, id: usize) -> NodeSnapshot {
		NodeSnapshot {
			id,
			location: self.location.clone(),
			params: self.params.leaves(),
			results: self.results.produced(),
		}
	}
}
