// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Empty-instance construction for bound descriptors.

use crate::descriptor::SchemaDescriptor;
use crate::error::{Result, SchemaError};
use crate::layout::Instance;

/// Produces blank instances that the decoder then populates field by field.
pub struct InstanceFactory;

impl InstanceFactory {
    /// Run the zero-argument constructor of the type `desc` is bound to.
    pub fn new_instance(desc: &SchemaDescriptor) -> Result<Instance> {
        let binding = desc.binding().ok_or_else(|| {
            SchemaError::descriptor_failure(desc.type_name(), "descriptor is not bound")
        })?;
        let constructor = binding.layout().constructor().ok_or_else(|| {
            SchemaError::descriptor_failure(desc.type_name(), "no zero-argument constructor")
        })?;

        constructor
            .invoke()
            .map_err(|source| SchemaError::ConstructorFailure {
                type_name: desc.type_name().to_string(),
                source,
            })
    }

    /// Like [`new_instance`](Self::new_instance), downcast to the concrete type.
    pub fn new_instance_of<T: 'static>(desc: &SchemaDescriptor) -> Result<Box<T>> {
        Self::new_instance(desc)?.downcast::<T>().map_err(|_| {
            SchemaError::descriptor_failure(
                desc.type_name(),
                format!("constructor does not produce {}", std::any::type_name::<T>()),
            )
        })
    }
}
