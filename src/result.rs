//! Result trees.
//!
//! A constructor's formal results flatten into a tree whose leaves are
//! the keys it produces: single values (by type and name) or group
//! contributions. Interior nodes are result objects, split with the
//! registered deconstructor. A trailing error result is recognized via
//! the reflector's error sentinel and excluded from production.

use crate::error::{Error, Result};
use crate::key::{Key, TypeRef};
use crate::reflect::{DeconstructFn, FieldInfo, RecordInfo, RecordKind, Reflector, Value};
use crate::store::ContainerWriter;

#[derive(Clone, Debug)]
pub(crate) enum ResultEntry {
	Single(ResultSingle),
	Grouped(ResultGrouped),
	Object(ResultObject),
}

/// A production of one value under `(ty, name)`.
#[derive(Clone, Debug)]
pub(crate) struct ResultSingle {
	pub ty: TypeRef,
	pub name: String,
}

/// A contribution to the group `(ty, group)`.
#[derive(Clone, Debug)]
pub(crate) struct ResultGrouped {
	pub ty: TypeRef,
	pub group: String,
}

/// A result object, split into fields with the registered deconstructor.
#[derive(Clone)]
pub(crate) struct ResultObject {
	pub ty: TypeRef,
	pub fields: Vec<ResultObjectField>,
	pub deconstruct: DeconstructFn,
}

impl std::fmt::Debug for ResultObject {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResultObject")
			.field("ty", &self.ty)
			.field("fields", &self.fields)
			.field("deconstruct", &"<fn>")
			.finish()
	}
}

#[derive(Clone, Debug)]
pub(crate) struct ResultObjectField {
	pub name: String,
	pub entry: ResultEntry,
}

/// A flattened produced key with the path that produces it, e.g.
/// `[1].Handlers` — input to duplicate detection and visualization.
#[derive(Clone, Debug)]
pub struct ProducedKey {
	pub key: Key,
	pub path: String,
	pub grouped: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct ResultList {
	pub results: Vec<ResultEntry>,
}

impl ResultList {
	pub(crate) fn from_signature<R: Reflector>(
		reflector: &R,
		results: &[TypeRef],
		default_name: Option<&str>,
	) -> Result<Self> {
		let mut entries = Vec::with_capacity(results.len());
		for (index, ty) in results.iter().enumerate() {
			if reflector.is_error(*ty) {
				if index == results.len() - 1 {
					continue;
				}
				return Err(Error::BadArgument(
					"only the last result of a constructor may be an error".to_string(),
				));
			}
			let mut path = vec![format!("[{index}]")];
			entries.push(ResultEntry::from_type(
				reflector,
				*ty,
				default_name,
				&mut path,
			)?);
		}
		Ok(Self { results: entries })
	}

	pub(crate) fn produced(&self) -> Vec<ProducedKey> {
		let mut out = Vec::new();
		for (index, entry) in self.results.iter().enumerate() {
			let mut path = vec![format!("[{index}]")];
			entry.collect_produced(&mut path, &mut out);
		}
		out
	}

	/// Writes the returned values into `writer`, one per top-level entry.
	pub(crate) fn extract(
		&self,
		returned: Vec<Value>,
		writer: &mut dyn ContainerWriter,
	) -> Result<()> {
		if returned.len() != self.results.len() {
			return Err(Error::BadArgument(format!(
				"constructor returned {} values, its descriptor declares {}",
				returned.len(),
				self.results.len()
			)));
		}
		for (entry, value) in self.results.iter().zip(returned) {
			entry.extract(value, writer)?;
		}
		Ok(())
	}
}

impl ResultEntry {
	fn from_type<R: Reflector>(
		reflector: &R,
		ty: TypeRef,
		default_name: Option<&str>,
		path: &mut Vec<String>,
	) -> Result<Self> {
		match reflector.record(ty) {
			Some(info) if info.kind() == RecordKind::Result => {
				if default_name.is_some() {
					return Err(Error::BadArgument(format!(
						"cannot use a default name with result object `{ty}`"
					)));
				}
				Self::from_record(reflector, ty, &info, path)
			}
			Some(_) => Err(Error::BadArgument(format!(
				"cannot return parameter object `{ty}` from a constructor (result {})",
				path.join(".")
			))),
			None => Ok(ResultEntry::Single(ResultSingle {
				ty,
				name: default_name.unwrap_or("").to_string(),
			})),
		}
	}

	fn from_record<R: Reflector>(
		reflector: &R,
		ty: TypeRef,
		info: &RecordInfo,
		path: &mut Vec<String>,
	) -> Result<Self> {
		let deconstruct = info.deconstruct().cloned().ok_or_else(|| {
			Error::BadArgument(format!(
				"result object `{ty}` has no deconstructor registered"
			))
		})?;

		let mut fields = Vec::with_capacity(info.fields().len());
		for field in info.fields() {
			path.push(field.name.clone());
			let entry = Self::from_field(reflector, field, path)?;
			path.pop();
			fields.push(ResultObjectField {
				name: field.name.clone(),
				entry,
			});
		}
		Ok(ResultEntry::Object(ResultObject {
			ty,
			fields,
			deconstruct,
		}))
	}

	fn from_field<R: Reflector>(
		reflector: &R,
		field: &FieldInfo,
		path: &mut Vec<String>,
	) -> Result<Self> {
		let tags = &field.tags;
		let field_path = path.join(".");

		if tags.get("optional").is_some() {
			return Err(Error::BadTag {
				field: field_path,
				tag: "optional",
				reason: "results cannot be optional".to_string(),
			});
		}

		// Nested result object; leaf tags on the record field itself are
		// always a mistake.
		if let Some(info) = reflector.record(field.ty) {
			for tag in ["name", "group"] {
				if tags.get(tag).is_some() {
					return Err(Error::BadTag {
						field: field_path,
						tag,
						reason: "result objects cannot be tagged".to_string(),
					});
				}
			}
			return match info.kind() {
				RecordKind::Result => Self::from_record(reflector, field.ty, &info, path),
				RecordKind::Param => Err(Error::BadArgument(format!(
					"cannot return parameter object `{}` from a constructor (result {})",
					field.ty,
					path.join(".")
				))),
			};
		}

		if let Some(group) = tags.get("group").filter(|g| !g.is_empty()) {
			if tags.get("name").is_some() {
				return Err(Error::BadTag {
					field: field_path,
					tag: "group",
					reason: "cannot use `name` and `group` together".to_string(),
				});
			}
			return Ok(ResultEntry::Grouped(ResultGrouped {
				ty: field.ty,
				group: group.to_string(),
			}));
		}

		Ok(ResultEntry::Single(ResultSingle {
			ty: field.ty,
			name: tags.get("name").unwrap_or("").to_string(),
		}))
	}

	fn collect_produced(&self, path: &mut Vec<String>, out: &mut Vec<ProducedKey>) {
		match self {
			ResultEntry::Single(single) => out.push(ProducedKey {
				key: Key::named(single.ty, single.name.clone()),
				path: path.join("."),
				grouped: false,
			}),
			ResultEntry::Grouped(grouped) => out.push(ProducedKey {
				key: Key::grouped(grouped.ty, grouped.group.clone()),
				path: path.join("."),
				grouped: true,
			}),
			ResultEntry::Object(object) => {
				for field in &object.fields {
					path.push(field.name.clone());
					field.entry.collect_produced(path, out);
					path.pop();
				}
			}
		}
	}

	fn extract(&self, value: Value, writer: &mut dyn ContainerWriter) -> Result<()> {
		match self {
			ResultEntry::Single(single) => {
				writer.set_value(&single.name, single.ty, value);
				Ok(())
			}
			ResultEntry::Grouped(grouped) => {
				writer.submit_grouped_value(&grouped.group, grouped.ty, value);
				Ok(())
			}
			ResultEntry::Object(object) => {
				let fields = (object.deconstruct)(&value);
				if fields.len() != object.fields.len() {
					return Err(Error::BadArgument(format!(
						"result object `{}` split into {} values, its descriptor declares {}",
						object.ty,
						fields.len(),
						object.fields.len()
					)));
				}
				for (field, value) in object.fields.iter().zip(fields) {
					field.entry.extract(value, writer)?;
				}
				Ok(())
			}
		}
	}
}
