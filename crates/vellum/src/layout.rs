// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-type layout tables: the introspection capability of the store.
//!
//! A [`TypeLayout`] lists the fields declared at one level of a type's
//! ancestor chain, links to the base level, and carries the zero-argument
//! constructor if one exists. Layouts are normally generated by
//! `#[derive(Persistent)]` / `#[derive(Embedded)]`; the builder exists for
//! types described at runtime.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;

/// Freshly constructed object, downcast by the decoder.
pub type Instance = Box<dyn Any + Send>;

type ConstructFn = dyn Fn() -> Result<Instance, BoxError> + Send + Sync;

/// Shape of a declared field, before classification.
#[derive(Debug, Clone)]
pub enum Shape {
    Boolean,
    Byte,
    Char,
    Short,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Timestamp,
    /// Reference to a type with the object-reference capability.
    Object(Arc<str>),
    /// Inline value of a type with the embedded-value capability.
    Value(Arc<TypeLayout>),
    /// Array of object references.
    Link,
    Array(Box<Shape>),
    /// Anything else; only storable under a fallback policy.
    Opaque(Arc<str>),
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Boolean => f.write_str("bool"),
            Shape::Byte => f.write_str("u8"),
            Shape::Char => f.write_str("char"),
            Shape::Short => f.write_str("i16"),
            Shape::Int32 => f.write_str("i32"),
            Shape::Int64 => f.write_str("i64"),
            Shape::Float32 => f.write_str("f32"),
            Shape::Float64 => f.write_str("f64"),
            Shape::Text => f.write_str("String"),
            Shape::Timestamp => f.write_str("SystemTime"),
            Shape::Object(name) => write!(f, "Ref<{}>", name),
            Shape::Value(layout) => f.write_str(layout.name()),
            Shape::Link => f.write_str("Link"),
            Shape::Array(component) => write!(f, "[{}]", component),
            Shape::Opaque(name) => f.write_str(name),
        }
    }
}

/// One field declared at a specific level of a type.
#[derive(Debug, Clone)]
pub struct FieldLayout {
    name: Arc<str>,
    shape: Shape,
    transient: bool,
    type_owned: bool,
}

impl FieldLayout {
    pub fn new(name: impl Into<Arc<str>>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            transient: false,
            type_owned: false,
        }
    }

    /// Mark the field as non-persistent.
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Mark the field as owned by the type rather than by instances.
    pub fn type_owned(mut self) -> Self {
        self.type_owned = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// True unless the field is transient or type-owned.
    pub fn is_persistent(&self) -> bool {
        !self.transient && !self.type_owned
    }
}

/// Zero-argument construction capability of a type.
#[derive(Clone)]
pub struct Constructor {
    make: Arc<ConstructFn>,
}

impl Constructor {
    /// Wrap an infallible constructor.
    pub fn new<T, F>(make: F) -> Self
    where
        T: Any + Send,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            make: Arc::new(move || Ok(Box::new(make()) as Instance)),
        }
    }

    /// Wrap a constructor that can fail.
    pub fn fallible<T, E, F>(make: F) -> Self
    where
        T: Any + Send,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            make: Arc::new(move || make().map(|v| Box::new(v) as Instance).map_err(Into::into)),
        }
    }

    pub(crate) fn invoke(&self) -> Result<Instance, BoxError> {
        (self.make)()
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Constructor(..)")
    }
}

/// Fields declared at one ancestor level plus a link to the level above.
#[derive(Debug)]
pub struct TypeLayout {
    name: Arc<str>,
    base: Option<Arc<TypeLayout>>,
    fields: Vec<FieldLayout>,
    constructor: Option<Constructor>,
}

impl TypeLayout {
    pub fn builder(name: impl Into<Arc<str>>) -> TypeLayoutBuilder {
        TypeLayoutBuilder {
            name: name.into(),
            base: None,
            fields: Vec::new(),
            constructor: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    pub fn base(&self) -> Option<&Arc<TypeLayout>> {
        self.base.as_ref()
    }

    /// Fields declared exactly at this level, inherited ones excluded.
    pub fn declared_fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    /// Every level of the ancestor chain, base first, `self` last.
    pub fn ancestry(&self) -> Vec<&TypeLayout> {
        let mut chain = Vec::new();
        let mut level = Some(self);
        while let Some(current) = level {
            chain.push(current);
            level = current.base.as_deref();
        }
        chain.reverse();
        chain
    }
}

/// Builder for runtime-described layouts.
pub struct TypeLayoutBuilder {
    name: Arc<str>,
    base: Option<Arc<TypeLayout>>,
    fields: Vec<FieldLayout>,
    constructor: Option<Constructor>,
}

impl TypeLayoutBuilder {
    pub fn base(mut self, base: Arc<TypeLayout>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn field(mut self, field: FieldLayout) -> Self {
        self.fields.push(field);
        self
    }

    /// Shorthand for a persistent field.
    pub fn with(self, name: &str, shape: Shape) -> Self {
        self.field(FieldLayout::new(name, shape))
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn build(self) -> Arc<TypeLayout> {
        Arc::new(TypeLayout {
            name: self.name,
            base: self.base,
            fields: self.fields,
            constructor: self.constructor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestry_is_base_first() {
        let root = TypeLayout::builder("app::Shape")
            .with("id", Shape::Int64)
            .build();
        let mid = TypeLayout::builder("app::Polygon")
            .base(root)
            .with("sides", Shape::Int32)
            .build();
        let leaf = TypeLayout::builder("app::Square")
            .base(mid)
            .with("side", Shape::Float64)
            .build();

        let names: Vec<&str> = leaf.ancestry().iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["app::Shape", "app::Polygon", "app::Square"]);
        assert_eq!(leaf.declared_fields().len(), 1);
    }

    #[test]
    fn field_persistence_flags() {
        assert!(FieldLayout::new("a", Shape::Int32).is_persistent());
        assert!(!FieldLayout::new("b", Shape::Int32).transient().is_persistent());
        assert!(!FieldLayout::new("c", Shape::Int32).type_owned().is_persistent());
    }

    #[test]
    fn constructors_produce_instances() {
        let ok = Constructor::new(|| 7u32);
        let value = ok.invoke().unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&7));

        let failing = Constructor::fallible(|| Err::<u32, _>("no memory"));
        assert_eq!(failing.invoke().unwrap_err().to_string(), "no memory");
    }

    #[test]
    fn shapes_render_for_diagnostics() {
        let shape = Shape::Array(Box::new(Shape::Object("app::Node".into())));
        assert_eq!(shape.to_string(), "[Ref<app::Node>]");
    }
}
