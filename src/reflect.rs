//! The host reflection capability.
//!
//! The container itself is reflection-free: everything it needs to know
//! about user functions and record types comes through the [`Reflector`]
//! trait. The crate ships one implementation, the descriptor-backed
//! [`Catalog`](crate::Catalog); hosts with other means of introspection
//! (code generation, macros) can supply their own.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::key::TypeRef;

/// An opaque value held by the container.
///
/// Values are shared by reference; their lifetime equals the container's.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Boxed user error, as returned by failing constructors.
pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Wraps a concrete value for the container.
pub fn value<T: Send + Sync + 'static>(v: T) -> Value {
	Arc::new(v)
}

/// Downcasts a container value by reference.
pub fn cast<T: 'static>(v: &Value) -> Option<&T> {
	v.downcast_ref::<T>()
}

/// The materialized form of a grouped parameter: one opaque element per
/// contribution, already shuffled by the container.
pub struct Sequence(pub Vec<Value>);

/// Parameter and result types of a constructor, in declaration order.
///
/// A fallible constructor lists the error sentinel as its last result;
/// the container recognizes it via [`Reflector::is_error`] and excludes
/// it from production.
#[derive(Clone, Debug)]
pub struct Signature {
	pub params: Vec<TypeRef>,
	pub results: Vec<TypeRef>,
}

/// Whether a record is a parameter object or a result object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
	Param,
	Result,
}

/// Raw field tags, exactly as written at registration.
///
/// The container owns tag parsing, so malformed tags (for example an
/// `optional` value that is not a boolean literal) are its errors to
/// report, not the host's.
#[derive(Clone, Debug, Default)]
pub struct FieldTags(Vec<(String, String)>);

impl FieldTags {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&mut self, key: impl Into<String>, tag: impl Into<String>) {
		let key = key.into();
		let tag = tag.into();
		if let Some(entry) = self.0.iter_mut().find(|(k, _)| *k == key) {
			entry.1 = tag;
		} else {
			self.0.push((key, tag));
		}
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.0
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, tag)| tag.as_str())
	}
}

/// One field of a registered record type. For grouped fields `ty` is the
/// element type, not the sequence type.
#[derive(Clone)]
pub struct FieldInfo {
	pub name: String,
	pub ty: TypeRef,
	pub tags: FieldTags,
}

/// Builds a record value from its field values, in field order.
pub type ComposeFn = Arc<dyn Fn(CallArgs<'_>) -> Value + Send + Sync>;

/// Splits a record value into its field values, in field order.
pub type DeconstructFn = Arc<dyn Fn(&Value) -> Vec<Value> + Send + Sync>;

/// Metadata for a parameter or result object: the marker kind, the field
/// list, and the closure that assembles or splits the record.
#[derive(Clone)]
pub struct RecordInfo {
	kind: RecordKind,
	fields: Vec<FieldInfo>,
	compose: Option<ComposeFn>,
	deconstruct: Option<DeconstructFn>,
}

impl RecordInfo {
	pub fn param(fields: Vec<FieldInfo>, compose: ComposeFn) -> Self {
		Self {
			kind: RecordKind::Param,
			fields,
			compose: Some(compose),
			deconstruct: None,
		}
	}

	pub fn result(fields: Vec<FieldInfo>, deconstruct: DeconstructFn) -> Self {
		Self {
			kind: RecordKind::Result,
			fields,
			compose: None,
			deconstruct: Some(deconstruct),
		}
	}

	pub fn kind(&self) -> RecordKind {
		self.kind
	}

	pub fn fields(&self) -> &[FieldInfo] {
		&self.fields
	}

	pub(crate) fn compose(&self) -> Option<&ComposeFn> {
		self.compose.as_ref()
	}

	pub(crate) fn deconstruct(&self) -> Option<&DeconstructFn> {
		self.deconstruct.as_ref()
	}
}

/// Where a constructor was defined, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncInfo {
	pub name: String,
	pub file: String,
	pub line: u32,
}

impl fmt::Display for FuncInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({}:{})", self.name, self.file, self.line)
	}
}

/// Indexed, typed access to the values passed to a constructor or to a
/// record composer.
pub struct CallArgs<'a>(&'a [Value]);

impl<'a> CallArgs<'a> {
	pub(crate) fn new(values: &'a [Value]) -> Self {
		Self(values)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// The raw value at `index`.
	pub fn raw(&self, index: usize) -> Option<&Value> {
		self.0.get(index)
	}

	/// Clones the value at `index` out as a `T`.
	pub fn get<T: Clone + 'static>(&self, index: usize) -> Option<T> {
		self.0.get(index).and_then(|v| v.downcast_ref::<T>()).cloned()
	}

	/// Shares the value at `index` as an `Arc<T>`.
	pub fn arc<T: Send + Sync + 'static>(&self, index: usize) -> Option<Arc<T>> {
		self.0.get(index).cloned().and_then(|v| v.downcast::<T>().ok())
	}

	/// Reads the grouped value at `index` as a sequence of `T`.
	pub fn sequence<T: Clone + 'static>(&self, index: usize) -> Option<Vec<T>> {
		let Sequence(items) = self.0.get(index)?.downcast_ref::<Sequence>()?;
		items.iter().map(|v| v.downcast_ref::<T>().cloned()).collect()
	}
}

/// What a constructor call produced.
pub enum Outcome {
	/// The non-error results, in declaration order.
	Returned(Vec<Value>),
	/// The trailing error slot was occupied.
	Failed(DynError),
}

impl Outcome {
	/// A single infallible result.
	pub fn value<T: Send + Sync + 'static>(v: T) -> Self {
		Outcome::Returned(vec![value(v)])
	}

	/// Several results, already wrapped.
	pub fn values(vs: Vec<Value>) -> Self {
		Outcome::Returned(vs)
	}

	/// No results; for invoked functions that only have side effects.
	pub fn unit() -> Self {
		Outcome::Returned(Vec::new())
	}

	pub fn failed(err: impl Into<DynError>) -> Self {
		Outcome::Failed(err.into())
	}

	/// Lifts a `Result` from a fallible constructor.
	pub fn of<T, E>(res: Result<T, E>) -> Self
	where
		T: Send + Sync + 'static,
		E: Into<DynError>,
	{
		match res {
			Ok(v) => Self::value(v),
			Err(e) => Outcome::Failed(e.into()),
		}
	}
}

/// The capability the container requires from its host.
///
/// `Func` is whatever the host uses to refer to a user function; the
/// container only ever clones it and hands it back to the reflector.
pub trait Reflector {
	type Func: Clone;

	/// The function's parameter and result types, or `None` if the handle
	/// does not describe a callable constructor.
	fn signature(&self, func: &Self::Func) -> Option<Signature>;

	/// Provenance of the function, for diagnostics.
	fn location(&self, func: &Self::Func) -> FuncInfo;

	/// Metadata for `ty` if it is a registered parameter or result
	/// object; `None` for ordinary types.
	fn record(&self, ty: TypeRef) -> Option<RecordInfo>;

	/// Whether `ty` is the error sentinel that may trail a signature.
	fn is_error(&self, ty: TypeRef) -> bool;

	/// Calls the function. `Returned` must carry exactly the non-error
	/// results of the signature.
	fn invoke(&self, func: &Self::Func, args: Vec<Value>) -> Outcome;

	/// A default value for `ty`, substituted for missing optional
	/// dependencies. `None` if the host has no default registered.
	fn default_value(&self, ty: TypeRef) -> Option<Value>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn call_args_accessors() {
		let values = vec![value(7usize), value("x".to_string())];
		let args = CallArgs::new(&values);

		assert_eq!(args.len(), 2);
		assert_eq!(args.get::<usize>(0), Some(7));
		assert_eq!(args.get::<String>(1).as_deref(), Some("x"));
		assert_eq!(args.get::<usize>(1), None);
		assert_eq!(*args.arc::<usize>(0).expect("arc"), 7);
	}

	#[test]
	fn sequence_access() {
		let seq = value(Sequence(vec![value(1u8), value(2u8)]));
		let values = vec![seq];
		let args = CallArgs::new(&values);

		assert_eq!(args.sequence::<u8>(0), Some(vec![1, 2]));
	}

	#[test]
	fn tags_overwrite_by_key() {
		let mut tags = FieldTags::new();
		tags.set("name", "a");
		tags.set("name", "b");

		assert_eq!(tags.get("name"), Some("b"));
		assert_eq!(tags.get("group"), None);
	}
}
