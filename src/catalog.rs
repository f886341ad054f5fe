//! Descriptor-backed [`Reflector`]: the registration DSL.
//!
//! Rust has no runtime reflection over arbitrary functions, so
//! constructors are described explicitly: a [`Constructor`] carries its
//! parameter and result types plus the closure that runs it, and the
//! [`Catalog`] holds the record types (parameter / result objects), their
//! field tags, and the default values used for missing optional
//! dependencies. The container consumes all of this through the
//! [`Reflector`] trait and stays oblivious to how it was produced.
//!
//! # Examples
//!
//! ```
//! use luthier::{Constructor, Outcome};
//!
//! #[derive(Clone)]
//! struct Config {
//! 	url: String,
//! }
//!
//! let new_config = Constructor::describe("new_config")
//! 	.returns::<Config>()
//! 	.call(|_| {
//! 		Outcome::value(Config {
//! 			url: "localhost".to_string(),
//! 		})
//! 	});
//! ```

use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;

use crate::key::TypeRef;
use crate::reflect::{
	cast, value, CallArgs, DeconstructFn, DynError, FieldInfo, FieldTags, FuncInfo, Outcome,
	RecordInfo, RecordKind, Reflector, Signature, Value,
};

/// A described user constructor: signature, provenance and the closure
/// that runs it.
pub struct Constructor {
	name: String,
	file: &'static str,
	line: u32,
	params: Vec<TypeRef>,
	results: Vec<TypeRef>,
	call: Box<dyn Fn(CallArgs<'_>) -> Outcome + Send + Sync>,
}

/// Shared constructor handle; this is what [`Catalog`] uses as
/// [`Reflector::Func`].
pub type Ctor = Arc<Constructor>;

impl Constructor {
	/// Starts describing a constructor. The call site becomes the
	/// constructor's provenance in diagnostics.
	#[track_caller]
	pub fn describe(name: impl Into<String>) -> ConstructorBuilder {
		let caller = Location::caller();
		ConstructorBuilder {
			name: name.into(),
			file: caller.file(),
			line: caller.line(),
			params: Vec::new(),
			results: Vec::new(),
			fallible: false,
		}
	}
}

/// Builder returned by [`Constructor::describe`].
pub struct ConstructorBuilder {
	name: String,
	file: &'static str,
	line: u32,
	params: Vec<TypeRef>,
	results: Vec<TypeRef>,
	fallible: bool,
}

impl ConstructorBuilder {
	/// Appends a parameter type.
	pub fn takes<T: 'static>(mut self) -> Self {
		self.params.push(TypeRef::of::<T>());
		self
	}

	/// Appends a result type.
	pub fn returns<T: 'static>(mut self) -> Self {
		self.results.push(TypeRef::of::<T>());
		self
	}

	/// Marks the constructor as fallible: its closure may return
	/// [`Outcome::Failed`], and the error sentinel trails its signature.
	pub fn fallible(mut self) -> Self {
		self.fallible = true;
		self
	}

	/// Finishes the description with the closure that runs the
	/// constructor. The closure receives the materialized arguments in
	/// declaration order and must return exactly the declared non-error
	/// results.
	pub fn call(
		self,
		f: impl Fn(CallArgs<'_>) -> Outcome + Send + Sync + 'static,
	) -> Ctor {
		let mut results = self.results;
		if self.fallible {
			results.push(TypeRef::of::<DynError>());
		}
		Arc::new(Constructor {
			name: self.name,
			file: self.file,
			line: self.line,
			params: self.params,
			results,
			call: Box::new(f),
		})
	}
}

/// One field of a record under description.
pub struct Field {
	name: &'static str,
	ty: TypeRef,
	tags: FieldTags,
}

impl Field {
	/// A field named `name` holding a `T`. For grouped fields `T` is the
	/// element type.
	pub fn of<T: 'static>(name: &'static str) -> Self {
		Self {
			name,
			ty: TypeRef::of::<T>(),
			tags: FieldTags::new(),
		}
	}

	/// Demands (or produces) the value under the given name.
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.tags.set("name", name);
		self
	}

	/// Demands the full value group (or contributes to it).
	pub fn grouped(mut self, group: impl Into<String>) -> Self {
		self.tags.set("group", group);
		self
	}

	/// Marks a parameter field optional; a missing dependency is
	/// substituted with the type's registered default.
	pub fn optional(mut self) -> Self {
		self.tags.set("optional", "true");
		self
	}

	/// Sets a raw tag literal. Malformed literals are reported by the
	/// container at registration.
	pub fn tag(mut self, key: impl Into<String>, literal: impl Into<String>) -> Self {
		self.tags.set(key, literal);
		self
	}

	fn into_info(self) -> FieldInfo {
		FieldInfo {
			name: self.name.to_string(),
			ty: self.ty,
			tags: self.tags,
		}
	}
}

/// Registry of record types and default values backing the container.
#[derive(Clone, Default)]
pub struct Catalog {
	records: HashMap<TypeRef, RecordInfo>,
	defaults: HashMap<TypeRef, Arc<dyn Fn() -> Value + Send + Sync>>,
}

impl Catalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts describing the parameter object `T`. Finish with
	/// [`RecordBuilder::compose`].
	pub fn param_record<T: 'static>(&mut self) -> RecordBuilder<'_> {
		RecordBuilder {
			catalog: self,
			ty: TypeRef::of::<T>(),
			kind: RecordKind::Param,
			fields: Vec::new(),
		}
	}

	/// Starts describing the result object `T`. Finish with
	/// [`RecordBuilder::deconstruct`].
	pub fn result_record<T: 'static>(&mut self) -> RecordBuilder<'_> {
		RecordBuilder {
			catalog: self,
			ty: TypeRef::of::<T>(),
			kind: RecordKind::Result,
			fields: Vec::new(),
		}
	}

	/// Registers `T::default()` as the substitute for missing optional
	/// dependencies of type `T`.
	pub fn with_default<T: Default + Send + Sync + 'static>(&mut self) -> &mut Self {
		self.defaults
			.insert(TypeRef::of::<T>(), Arc::new(|| value(T::default())));
		self
	}
}

/// Builder for a parameter or result object registration.
pub struct RecordBuilder<'a> {
	catalog: &'a mut Catalog,
	ty: TypeRef,
	kind: RecordKind,
	fields: Vec<FieldInfo>,
}

impl RecordBuilder<'_> {
	pub fn field(mut self, field: Field) -> Self {
		self.fields.push(field.into_info());
		self
	}

	/// Registers a parameter object with the closure that assembles the
	/// record from its field values, in field order. Grouped fields
	/// arrive as [`Sequence`](crate::Sequence) values.
	pub fn compose(self, f: impl Fn(CallArgs<'_>) -> Value + Send + Sync + 'static) {
		debug_assert_eq!(self.kind, RecordKind::Param);
		let info = RecordInfo::param(self.fields, Arc::new(f));
		self.catalog.records.insert(self.ty, info);
	}

	/// Registers a result object with the closure that splits a record
	/// into its field values, in field order.
	pub fn deconstruct<T: 'static>(
		self,
		f: impl Fn(&T) -> Vec<Value> + Send + Sync + 'static,
	) {
		debug_assert_eq!(self.kind, RecordKind::Result);
		let split: DeconstructFn = Arc::new(move |record: &Value| match cast::<T>(record) {
			Some(typed) => f(typed),
			None => Vec::new(),
		});
		let info = RecordInfo::result(self.fields, split);
		self.catalog.records.insert(self.ty, info);
	}
}

impl Reflector for Catalog {
	type Func = Ctor;

	fn signature(&self, func: &Ctor) -> Option<Signature> {
		Some(Signature {
			params: func.params.clone(),
			results: func.results.clone(),
		})
	}

	fn location(&self, func: &Ctor) -> FuncInfo {
		FuncInfo {
			name: func.name.clone(),
			file: func.file.to_string(),
			line: func.line,
		}
	}

	fn record(&self, ty: TypeRef) -> Option<RecordInfo> {
		self.records.get(&ty).cloned()
	}

	fn is_error(&self, ty: TypeRef) -> bool {
		ty == TypeRef::of::<DynError>()
	}

	fn invoke(&self, func: &Ctor, args: Vec<Value>) -> Outcome {
		(func.call)(CallArgs::new(&args))
	}

	fn default_value(&self, ty: TypeRef) -> Option<Value> {
		self.defaults.get(&ty).map(|make| make())
	}
}
