// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compile-time capabilities connecting Rust types to their layouts.
//!
//! - [`Described`]: the type has a generated [`TypeLayout`].
//! - [`Persistent`]: object-reference capability, stored by identity via [`Ref`] / [`Link`].
//! - [`Embedded`]: embedded-value capability, stored inline.
//! - [`Shaped`]: a field type knows its [`Shape`].

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::SystemTime;

use crate::layout::{Shape, TypeLayout};

/// Persistent object identifier (0 is the null reference).
pub type Oid = u32;

/// Type with a generated layout table.
pub trait Described: 'static {
    /// Fully-qualified name recorded in the catalog.
    const TYPE_NAME: &'static str;

    /// Layout of this type, built once per process.
    fn layout() -> Arc<TypeLayout>;
}

/// Object-reference capability.
pub trait Persistent: Described {}

/// Embedded-value capability.
pub trait Embedded: Described {}

/// Field types that map onto a storage [`Shape`].
pub trait Shaped {
    fn shape() -> Shape;
}

macro_rules! impl_shaped {
    ($($ty:ty => $shape:ident),* $(,)?) => {
        $(
            impl Shaped for $ty {
                fn shape() -> Shape {
                    Shape::$shape
                }
            }
        )*
    };
}

impl_shaped! {
    bool => Boolean,
    u8 => Byte,
    i8 => Byte,
    char => Char,
    i16 => Short,
    u16 => Short,
    i32 => Int32,
    u32 => Int32,
    i64 => Int64,
    u64 => Int64,
    f32 => Float32,
    f64 => Float64,
    String => Text,
    SystemTime => Timestamp,
}

impl<T: Shaped> Shaped for Vec<T> {
    fn shape() -> Shape {
        Shape::Array(Box::new(T::shape()))
    }
}

impl<T: Shaped, const N: usize> Shaped for [T; N] {
    fn shape() -> Shape {
        Shape::Array(Box::new(T::shape()))
    }
}

/// Reference to a persistent object, stored as its [`Oid`].
pub struct Ref<T: ?Sized> {
    oid: Oid,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ?Sized> Ref<T> {
    pub fn new(oid: Oid) -> Self {
        Self {
            oid,
            _marker: PhantomData,
        }
    }

    pub fn null() -> Self {
        Self::new(0)
    }

    pub fn oid(&self) -> Oid {
        self.oid
    }

    pub fn is_null(&self) -> bool {
        self.oid == 0
    }
}

impl<T: ?Sized> Clone for Ref<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Ref<T> {}

impl<T: ?Sized> Default for Ref<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized> std::fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ref({})", self.oid)
    }
}

impl<T: Persistent> Shaped for Ref<T> {
    fn shape() -> Shape {
        // Name only: a self-referencing type must not recurse into its own layout.
        Shape::Object(Arc::from(T::TYPE_NAME))
    }
}

/// Growable array of references to persistent objects.
pub struct Link<T: ?Sized> {
    oids: Vec<Oid>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ?Sized> Link<T> {
    pub fn new() -> Self {
        Self {
            oids: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn push(&mut self, target: Ref<T>) {
        self.oids.push(target.oid());
    }

    pub fn oids(&self) -> &[Oid] {
        &self.oids
    }

    pub fn len(&self) -> usize {
        self.oids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oids.is_empty()
    }
}

impl<T: ?Sized> Default for Link<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for Link<T> {
    fn clone(&self) -> Self {
        Self {
            oids: self.oids.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Link").field(&self.oids).finish()
    }
}

impl<T: Persistent> Shaped for Link<T> {
    fn shape() -> Shape {
        Shape::Link
    }
}
