//! Error taxonomy.
//!
//! No error is recovered inside the container; every failure is returned
//! to the caller with provenance (constructor location, path into record
//! fields) attached, and cause chains preserved through `source()`.
//!
//! Diagnostics quote names, keys and types in backticks, which is why
//! names themselves may not contain a backquote (see
//! [`Container::provide_named`](crate::Container::provide_named)).

use std::fmt;

use thiserror::Error;

use crate::key::Key;
use crate::reflect::{DynError, FuncInfo};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
	/// The argument was not a usable constructor, or its shape is invalid
	/// (a result object in parameter position, mismatched supplied
	/// arguments, and so on).
	#[error("bad argument: {0}")]
	BadArgument(String),

	/// A malformed field tag on a registered record type.
	#[error("invalid `{tag}` tag on field {field}: {reason}")]
	BadTag {
		field: String,
		tag: &'static str,
		reason: String,
	},

	/// The name would garble backtick-quoted diagnostics.
	#[error("invalid name {name:?}: names cannot contain backquotes")]
	BadName { name: String },

	/// One constructor produces the same single-valued key twice.
	#[error("cannot provide `{key}` from {path}: already provided by {earlier}")]
	DuplicateWithinNode {
		key: Key,
		path: String,
		earlier: String,
	},

	/// Another provider already owns this single-valued key.
	#[error("cannot provide `{key}` from {path}: already provided by {providers}")]
	DuplicateAcrossProviders {
		key: Key,
		path: String,
		providers: String,
	},

	/// The constructor yields no non-error output, so it could never be
	/// called.
	#[error("constructor `{func}` must provide at least one non-error result")]
	EmptyConstructor { func: FuncInfo },

	/// Registering or using the constructor would close a dependency
	/// cycle.
	#[error("cycle detected in dependency graph: {path}")]
	Cycle { path: CyclePath },

	/// Required single-valued dependencies without a provider; aggregates
	/// every missing key for the function at once.
	#[error("missing dependencies for `{func}`: {missing}")]
	MissingDependencies { func: FuncInfo, missing: MissingList },

	/// An optional dependency was absent and the host has no default
	/// value registered for its type.
	#[error("missing default value for optional `{key}`: register one with `Catalog::with_default`")]
	MissingDefault { key: Key },

	/// A user constructor reported failure.
	#[error("constructor `{func}` failed")]
	ConstructorFailed {
		func: FuncInfo,
		#[source]
		source: DynError,
	},

	/// Building the argument list for a function failed; wraps the inner
	/// error.
	#[error("could not build arguments for `{func}`")]
	ArgumentsFailed {
		func: FuncInfo,
		#[source]
		source: Box<Error>,
	},

	/// The invoked function's own error, returned verbatim.
	#[error(transparent)]
	Invoked(DynError),
}

/// The offending constructor path of a cycle, first entry repeated at the
/// end.
#[derive(Clone, Debug)]
pub struct CyclePath {
	pub entries: Vec<FuncInfo>,
}

impl fmt::Display for CyclePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (index, entry) in self.entries.iter().enumerate() {
			if index > 0 {
				f.write_str(" -> ")?;
			}
			write!(f, "{entry}")?;
		}
		Ok(())
	}
}

/// One unprovided required key, with the container's closest matches.
#[derive(Clone, Debug)]
pub struct MissingDependency {
	pub key: Key,
	pub suggestions: Vec<Key>,
}

impl fmt::Display for MissingDependency {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "`{}`", self.key)?;
		if !self.suggestions.is_empty() {
			f.write_str(" (did you mean ")?;
			for (index, suggestion) in self.suggestions.iter().enumerate() {
				if index > 0 {
					f.write_str(" or ")?;
				}
				write!(f, "`{suggestion}`")?;
			}
			f.write_str("?)")?;
		}
		Ok(())
	}
}

/// All missing keys of one shallow dependency check.
#[derive(Clone, Debug)]
pub struct MissingList {
	pub entries: Vec<MissingDependency>,
}

impl fmt::Display for MissingList {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (index, entry) in self.entries.iter().enumerate() {
			if index > 0 {
				f.write_str("; ")?;
			}
			write!(f, "{entry}")?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::key::TypeRef;

	struct Conn;

	#[test]
	fn missing_list_lists_suggestions() {
		let ty = TypeRef::of::<Conn>();
		let missing = MissingList {
			entries: vec![MissingDependency {
				key: Key::named(ty, ""),
				suggestions: vec![Key::named(ty, "ro"), Key::named(ty, "rw")],
			}],
		};

		let rendered = missing.to_string();
		assert!(rendered.contains("did you mean"));
		assert!(rendered.contains("name=\"ro\""));
		assert!(rendered.contains("name=\"rw\""));
	}

	#[test]
	fn cycle_path_joins_with_arrows() {
		let entry = |name: &str| FuncInfo {
			name: name.to_string(),
			file: "graph.rs".to_string(),
			line: 1,
		};
		let path = CyclePath {
			entries: vec![entry("new_a"), entry("new_b"), entry("new_a")],
		};

		assert_eq!(
			path.to_string(),
			"new_a (graph.rs:1) -> new_b (graph.rs:1) -> new_a (graph.rs:1)"
		);
	}
}
