//! Parameter trees.
//!
//! A constructor's formal parameters flatten into a tree whose leaves are
//! the values it demands from the container: single values (by type and
//! name), whole value groups, or values supplied directly to `invoke`.
//! Interior nodes are parameter objects, whose fields are flattened
//! recursively using their `optional` / `name` / `group` tags.

use crate::error::{Error, Result};
use crate::key::{Key, TypeRef};
use crate::reflect::{ComposeFn, FieldInfo, RecordInfo, RecordKind, Reflector, Value};

#[derive(Clone, Debug)]
pub(crate) enum Param {
	Single(ParamSingle),
	Grouped(ParamGroup),
	Object(ParamObject),
	Supplied(ParamSupplied),
}

/// A demand for one value under `(ty, name)`.
#[derive(Clone, Debug)]
pub(crate) struct ParamSingle {
	pub ty: TypeRef,
	pub name: String,
	pub optional: bool,
}

/// A demand for the full multiset of contributions under `(ty, group)`.
/// `ty` is the element type; the demand materializes as a sequence.
#[derive(Clone, Debug)]
pub(crate) struct ParamGroup {
	pub ty: TypeRef,
	pub group: String,
}

/// A parameter object: a record whose fields are resolved recursively and
/// assembled with the registered composer.
#[derive(Clone)]
pub(crate) struct ParamObject {
	pub fields: Vec<ParamObjectField>,
	pub compose: ComposeFn,
}

impl std::fmt::Debug for ParamObject {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ParamObject")
			.field("fields", &self.fields)
			.field("compose", &"<fn>")
			.finish()
	}
}

#[derive(Clone, Debug)]
pub(crate) struct ParamObjectField {
	pub name: String,
	pub param: Param,
}

/// An invoke-time argument bound positionally; its value bypasses the
/// container entirely.
#[derive(Clone)]
pub(crate) struct ParamSupplied {
	pub value: Value,
}

impl std::fmt::Debug for ParamSupplied {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ParamSupplied")
			.field("value", &"<value>")
			.finish()
	}
}

/// A flattened leaf demand, as seen by the shallow dependency check, the
/// acyclic verifier and the visualizer.
#[derive(Clone, Debug)]
pub struct ParamLeaf {
	pub key: Key,
	pub optional: bool,
	pub grouped: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct ParamList {
	pub params: Vec<Param>,
}

impl ParamList {
	pub(crate) fn from_signature<R: Reflector>(
		reflector: &R,
		params: &[TypeRef],
	) -> Result<Self> {
		let mut out = Vec::with_capacity(params.len());
		for (index, ty) in params.iter().enumerate() {
			let mut path = vec![format!("[{index}]")];
			out.push(Param::from_type(reflector, *ty, &mut path)?);
		}
		Ok(Self { params: out })
	}

	/// Binds supplied invoke arguments to the first top-level non-record
	/// parameters, left to right. Parameter objects are skipped; a type
	/// mismatch or a surplus argument is an error.
	pub(crate) fn bind_supplied(&mut self, supplied: Vec<Value>) -> Result<()> {
		let total = supplied.len();
		let mut queue = supplied.into_iter();
		let mut next = queue.next();
		let mut bound = 0usize;

		for param in &mut self.params {
			if next.is_none() {
				break;
			}
			let Param::Single(single) = param else {
				continue;
			};
			let Some(value) = next.take() else {
				break;
			};
			if (*value).type_id() != single.ty.id() {
				return Err(Error::BadArgument(format!(
					"supplied argument {bound} does not match parameter type `{}`",
					single.ty
				)));
			}
			*param = Param::Supplied(ParamSupplied { value });
			bound += 1;
			next = queue.next();
		}

		if next.is_some() {
			return Err(Error::BadArgument(format!(
				"{total} arguments supplied, but only {bound} non-record parameters to bind them to"
			)));
		}
		Ok(())
	}

	pub(crate) fn leaves(&self) -> Vec<ParamLeaf> {
		let mut out = Vec::new();
		for param in &self.params {
			param.collect_leaves(&mut out);
		}
		out
	}
}

impl Param {
	fn from_type<R: Reflector>(
		reflector: &R,
		ty: TypeRef,
		path: &mut Vec<String>,
	) -> Result<Self> {
		match reflector.record(ty) {
			Some(info) if info.kind() == RecordKind::Param => {
				Self::from_record(reflector, ty, &info, path)
			}
			Some(_) => Err(Error::BadArgument(format!(
				"cannot depend on result object `{ty}` (parameter {})",
				path.join(".")
			))),
			None => Ok(Param::Single(ParamSingle {
				ty,
				name: String::new(),
				optional: false,
			})),
		}
	}

	fn from_record<R: Reflector>(
		reflector: &R,
		ty: TypeRef,
		info: &RecordInfo,
		path: &mut Vec<String>,
	) -> Result<Self> {
		let compose = info.compose().cloned().ok_or_else(|| {
			Error::BadArgument(format!("parameter object `{ty}` has no composer registered"))
		})?;

		let mut fields = Vec::with_capacity(info.fields().len());
		for field in info.fields() {
			path.push(field.name.clone());
			let param = Self::from_field(reflector, field, path)?;
			path.pop();
			fields.push(ParamObjectField {
				name: field.name.clone(),
				param,
			});
		}
		Ok(Param::Object(ParamObject { fields, compose }))
	}

	fn from_field<R: Reflector>(
		reflector: &R,
		field: &FieldInfo,
		path: &mut Vec<String>,
	) -> Result<Self> {
		let tags = &field.tags;
		let field_path = path.join(".");

		// Nested record: the field has no slot of its own, so tags on it
		// are always a mistake.
		if let Some(info) = reflector.record(field.ty) {
			for tag in ["optional", "name", "group"] {
				if tags.get(tag).is_some() {
					return Err(Error::BadTag {
						field: field_path,
						tag,
						reason: "parameter objects cannot be tagged".to_string(),
					});
				}
			}
			return match info.kind() {
				RecordKind::Param => Self::from_record(reflector, field.ty, &info, path),
				RecordKind::Result => Err(Error::BadArgument(format!(
					"cannot depend on result object `{}` (parameter {})",
					field.ty,
					path.join(".")
				))),
			};
		}

		let optional = parse_optional(tags.get("optional"), &field_path)?;
		if let Some(group) = tags.get("group").filter(|g| !g.is_empty()) {
			if tags.get("name").is_some() {
				return Err(Error::BadTag {
					field: field_path,
					tag: "group",
					reason: "cannot use `name` and `group` together".to_string(),
				});
			}
			if tags.get("optional").is_some() {
				return Err(Error::BadTag {
					field: field_path,
					tag: "optional",
					reason: "grouped values cannot be optional".to_string(),
				});
			}
			return Ok(Param::Grouped(ParamGroup {
				ty: field.ty,
				group: group.to_string(),
			}));
		}

		Ok(Param::Single(ParamSingle {
			ty: field.ty,
			name: tags.get("name").unwrap_or("").to_string(),
			optional,
		}))
	}

	fn collect_leaves(&self, out: &mut Vec<ParamLeaf>) {
		match self {
			Param::Single(single) => out.push(ParamLeaf {
				key: Key::named(single.ty, single.name.clone()),
				optional: single.optional,
				grouped: false,
			}),
			Param::Grouped(group) => out.push(ParamLeaf {
				key: Key::grouped(group.ty, group.group.clone()),
				optional: false,
				grouped: true,
			}),
			Param::Object(object) => {
				for field in &object.fields {
					field.param.collect_leaves(out);
				}
			}
			Param::Supplied(_) => {}
		}
	}
}

/// Parses the raw `optional` tag with Go's boolean literal set; an empty
/// literal counts as absent.
fn parse_optional(raw: Option<&str>, field: &str) -> Result<bool> {
	let Some(literal) = raw else {
		return Ok(false);
	};
	if literal.is_empty() {
		return Ok(false);
	}
	match literal {
		"1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
		"0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
		_ => Err(Error::BadTag {
			field: field.to_string(),
			tag: "optional",
			reason: format!("invalid boolean literal {literal:?}"),
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::{Catalog, Field};
	use crate::reflect::{value, CallArgs};

	#[derive(Clone)]
	struct Conn;

	#[derive(Clone)]
	struct Pair {
		#[allow(dead_code)]
		ro: Conn,
	}

	fn catalog_with_pair() -> Catalog {
		let mut catalog = Catalog::new();
		catalog
			.param_record::<Pair>()
			.field(Field::of::<Conn>("ro").named("ro"))
			.compose(|fields: CallArgs<'_>| {
				value(Pair {
					ro: fields.get::<Conn>(0).expect("ro"),
				})
			});
		catalog
	}

	#[test]
	fn record_params_flatten_to_named_leaves() {
		let catalog = catalog_with_pair();

		let list =
			ParamList::from_signature(&catalog, &[TypeRef::of::<Pair>()]).expect("param list");

		let leaves = list.leaves();
		assert_eq!(leaves.len(), 1);
		assert_eq!(leaves[0].key.name(), Some("ro"));
		assert!(!leaves[0].optional);
	}

	#[test]
	fn bad_optional_literal_is_rejected() {
		let mut catalog = Catalog::new();
		catalog
			.param_record::<Pair>()
			.field(Field::of::<Conn>("ro").tag("optional", "maybe"))
			.compose(|_| value(()));

		let err = ParamList::from_signature(&catalog, &[TypeRef::of::<Pair>()])
			.expect_err("bad tag");

		assert!(matches!(err, Error::BadTag { tag: "optional", .. }));
	}

	#[test]
	fn supplied_arguments_bind_left_to_right() {
		let catalog = Catalog::new();
		let mut list = ParamList::from_signature(
			&catalog,
			&[TypeRef::of::<u32>(), TypeRef::of::<String>()],
		)
		.expect("param list");

		list.bind_supplied(vec![value(7u32)]).expect("bind");

		assert!(matches!(list.params[0], Param::Supplied(_)));
		assert!(matches!(list.params[1], Param::Single(_)));
	}

	#[test]
	fn surplus_supplied_arguments_are_rejected() {
		let catalog = Catalog::new();
		let mut list =
			ParamList::from_signature(&catalog, &[TypeRef::of::<u32>()]).expect("param list");

		let err = list
			.bind_supplied(vec![value(7u32), value(8u32)])
			.expect_err("surplus");

		assert!(matches!(err, Error::BadArgument(_)));
	}
}
