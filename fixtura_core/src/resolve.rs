//! Member and accessor resolution over a shape chain.
//!
//! All lookups walk the chain from the most-derived layer to the root and
//! return the first structural match; a member declared in a more derived
//! layer shadows a same-named member in an ancestor. Absence is a normal
//! `None`/empty result; callers decide whether it is an error.

use crate::shape::{AccessorKind, AccessorSpec, FieldSpec, TypeShape};
use std::any::{Any, TypeId};
use std::collections::HashSet;

/// Resolves a data member by name.
pub fn field<'a>(shape: &'a TypeShape, name: &str) -> Option<&'a FieldSpec> {
    shape
        .chain()
        .find_map(|layer| layer.fields().iter().find(|f| f.name() == name))
}

/// Resolves an accessor by kind and name, ignoring parameter types.
pub fn accessor<'a>(
    shape: &'a TypeShape,
    kind: AccessorKind,
    name: &str,
) -> Option<&'a AccessorSpec> {
    shape.chain().find_map(|layer| {
        layer
            .accessors()
            .iter()
            .find(|a| a.kind() == kind && a.name() == name)
    })
}

/// Resolves a `Set` accessor by name whose parameter admits `value`'s runtime
/// type. The walk continues past same-named setters with incompatible
/// parameters.
pub fn setter<'a>(shape: &'a TypeShape, name: &str, value: &dyn Any) -> Option<&'a AccessorSpec> {
    shape.chain().find_map(|layer| {
        layer
            .accessors()
            .iter()
            .find(|a| a.kind() == AccessorKind::Set && a.name() == name && a.accepts(value))
    })
}

/// All visible data members of the chain, shadowing applied: one entry per
/// name, taken from the most-derived layer that declares it.
pub fn fields<'a>(shape: &'a TypeShape) -> Vec<&'a FieldSpec> {
    let mut seen = HashSet::new();
    let mut visible = Vec::new();
    for layer in shape.chain() {
        for field in layer.fields() {
            if seen.insert(field.name()) {
                visible.push(field);
            }
        }
    }
    visible
}

/// All visible `Set` accessors of the chain, shadowing applied per name.
pub fn setters<'a>(shape: &'a TypeShape) -> Vec<&'a AccessorSpec> {
    let mut seen = HashSet::new();
    let mut visible = Vec::new();
    for layer in shape.chain() {
        for accessor in layer.accessors() {
            if accessor.kind() == AccessorKind::Set && seen.insert(accessor.name()) {
                visible.push(accessor);
            }
        }
    }
    visible
}

/// Visible data members whose declared type is `value_type`.
pub fn fields_of_type<'a>(shape: &'a TypeShape, value_type: TypeId) -> Vec<&'a FieldSpec> {
    fields(shape)
        .into_iter()
        .filter(|f| f.value_type() == value_type)
        .collect()
}

/// Visible `Set` accessors whose parameter type is `value_type`.
pub fn setters_of_type<'a>(shape: &'a TypeShape, value_type: TypeId) -> Vec<&'a AccessorSpec> {
    setters(shape)
        .into_iter()
        .filter(|a| a.value_type() == value_type)
        .collect()
}
