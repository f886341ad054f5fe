//! Type tags and container slot keys.
//!
//! Every slot in the container is identified by a [`Key`]: a runtime type
//! tag plus exactly one qualifier — a name (single-valued slot, empty by
//! default) or a group (multi-valued slot). A type may host any number of
//! distinct named slots and distinct grouped slots at the same time.

use std::any::{type_name, TypeId};
use std::fmt;

/// Runtime tag for a Rust type.
///
/// Equality and hashing follow [`TypeId`]; the captured type name is kept
/// for diagnostics and for the stable ordering of
/// [`Container::known_types`](crate::Container::known_types).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeRef {
	id: TypeId,
	name: &'static str,
}

impl TypeRef {
	/// Tag for the type `T`.
	pub fn of<T: 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: type_name::<T>(),
		}
	}

	pub fn id(&self) -> TypeId {
		self.id
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl fmt::Display for TypeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

impl fmt::Debug for TypeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TypeRef({})", self.name)
	}
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum Qualifier {
	Name(String),
	Group(String),
}

/// Identity of one slot in the container: a type plus a name or a group.
///
/// Two keys are equal iff both the type and the qualifier match, so
/// `Conn`, `Conn[name="ro"]` and `Conn[group="pool"]` are three distinct
/// slots.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Key {
	ty: TypeRef,
	qualifier: Qualifier,
}

impl Key {
	pub(crate) fn named(ty: TypeRef, name: impl Into<String>) -> Self {
		Self {
			ty,
			qualifier: Qualifier::Name(name.into()),
		}
	}

	pub(crate) fn grouped(ty: TypeRef, group: impl Into<String>) -> Self {
		Self {
			ty,
			qualifier: Qualifier::Group(group.into()),
		}
	}

	pub fn ty(&self) -> TypeRef {
		self.ty
	}

	/// The slot name, if this is a single-valued key. The default slot has
	/// the empty name.
	pub fn name(&self) -> Option<&str> {
		match &self.qualifier {
			Qualifier::Name(name) => Some(name),
			Qualifier::Group(_) => None,
		}
	}

	/// The group name, if this is a multi-valued key.
	pub fn group(&self) -> Option<&str> {
		match &self.qualifier {
			Qualifier::Name(_) => None,
			Qualifier::Group(group) => Some(group),
		}
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.qualifier {
			Qualifier::Name(name) if name.is_empty() => write!(f, "{}", self.ty),
			Qualifier::Name(name) => write!(f, "{}[name={:?}]", self.ty, name),
			Qualifier::Group(group) => write!(f, "{}[group={:?}]", self.ty, group),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Conn;

	#[test]
	fn named_and_grouped_keys_are_distinct() {
		let ty = TypeRef::of::<Conn>();

		let plain = Key::named(ty, "");
		let named = Key::named(ty, "ro");
		let grouped = Key::grouped(ty, "ro");

		assert_ne!(plain, named);
		assert_ne!(named, grouped);
		assert_eq!(named, Key::named(ty, "ro"));
	}

	#[test]
	fn display_formats() {
		let ty = TypeRef::of::<Conn>();

		assert!(Key::named(ty, "").to_string().ends_with("Conn"));
		assert!(Key::named(ty, "ro").to_string().ends_with("Conn[name=\"ro\"]"));
		assert!(Key::grouped(ty, "h").to_string().ends_with("Conn[group=\"h\"]"));
	}
}
