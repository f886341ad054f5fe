//! Write access to the container's value store.
//!
//! Constructor outputs are never written to the container directly: they
//! accumulate in a [`StagingWriter`] first and are committed in one step
//! once the whole extraction has succeeded. A constructor that fails
//! mid-extraction therefore contributes nothing.

use std::collections::HashMap;

use crate::key::{Key, TypeRef};
use crate::reflect::Value;

/// The write-only interface shared by the container and the staging
/// buffer.
pub(crate) trait ContainerWriter {
	/// Stores a single value under `(ty, name)`, overwriting any previous
	/// value.
	fn set_value(&mut self, name: &str, ty: TypeRef, value: Value);

	/// Appends a contribution to the group `(ty, group)`.
	fn submit_grouped_value(&mut self, group: &str, ty: TypeRef, value: Value);
}

/// Records writes and defers them until [`commit`](StagingWriter::commit).
#[derive(Default)]
pub(crate) struct StagingWriter {
	values: HashMap<Key, Value>,
	groups: HashMap<Key, Vec<Value>>,
}

impl StagingWriter {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Replays every staged write into `target`.
	pub(crate) fn commit(self, target: &mut dyn ContainerWriter) {
		for (key, value) in self.values {
			target.set_value(key.name().unwrap_or(""), key.ty(), value);
		}
		for (key, values) in self.groups {
			for value in values {
				target.submit_grouped_value(key.group().unwrap_or(""), key.ty(), value);
			}
		}
	}
}

impl ContainerWriter for StagingWriter {
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

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reflect::{cast, value};

	#[derive(Default)]
	struct Recorder {
		values: Vec<(String, Key)>,
		grouped: Vec<(String, Key)>,
	}

	impl ContainerWriter for Recorder {
		fn set_value(&mut self, name: &str, ty: TypeRef, _value: Value) {
			self.values.push((name.to_string(), Key::named(ty, name)));
		}

		fn submit_grouped_value(&mut self, group: &str, ty: TypeRef, _value: Value) {
			self.grouped
				.push((group.to_string(), Key::grouped(ty, group)));
		}
	}

	#[test]
	fn nothing_reaches_the_target_before_commit() {
		let mut staging = StagingWriter::new();
		staging.set_value("ro", TypeRef::of::<u32>(), value(1u32));
		staging.submit_grouped_value("h", TypeRef::of::<u32>(), value(2u32));

		let mut target = Recorder::default();
		assert!(target.values.is_empty());

		staging.commit(&mut target);
		assert_eq!(target.values.len(), 1);
		assert_eq!(target.values[0].0, "ro");
		assert_eq!(target.grouped.len(), 1);
		assert_eq!(target.grouped[0].0, "h");
	}

	#[test]
	fn staged_single_values_overwrite_by_key() {
		let mut staging = StagingWriter::new();
		staging.set_value("", TypeRef::of::<u32>(), value(1u32));
		staging.set_value("", TypeRef::of::<u32>(), value(2u32));

		let staged = staging
			.values
			.get(&Key::named(TypeRef::of::<u32>(), ""))
			.expect("staged value");
		assert_eq!(cast::<u32>(staged), Some(&2));
	}
}
