use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;

/// Which way an accessor moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    /// `get<Name>`-style: takes nothing, returns an owned copy of the value.
    Get,
    /// `<name>_mut`-style: takes nothing, returns a mutable borrow of the value.
    GetMut,
    /// `set<Name>`-style: takes one value of a compatible type.
    Set,
}

type ReadFn = Box<dyn Fn(&dyn Any) -> Option<Box<dyn Any>> + Send + Sync>;
type WriteFn = Box<dyn Fn(&mut dyn Any, Box<dyn Any>) -> Result<(), String> + Send + Sync>;
type ProjectMutFn = Box<dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync>;
type AcceptsFn = Box<dyn Fn(&dyn Any) -> bool + Send + Sync>;

/// A named, typed data slot declared on one layer of a type's shape.
///
/// The closures are erased at registration time by [`ShapeBuilder::field`];
/// they downcast the target to the one concrete type the whole shape chain is
/// written against and project into the declared slot.
pub struct FieldSpec {
    name: &'static str,
    value_type: TypeId,
    value_type_name: &'static str,
    read: ReadFn,
    write: WriteFn,
    project_mut: ProjectMutFn,
}

impl FieldSpec {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value_type(&self) -> TypeId {
        self.value_type
    }

    pub fn value_type_name(&self) -> &'static str {
        self.value_type_name
    }

    /// Clones the current value out of `target`. `None` if `target` is not an
    /// instance of the shape's concrete type.
    pub fn read(&self, target: &dyn Any) -> Option<Box<dyn Any>> {
        (self.read)(target)
    }

    /// Writes `value` into the slot. The error string names the expected type
    /// when either the target or the value does not downcast.
    pub fn write(&self, target: &mut dyn Any, value: Box<dyn Any>) -> Result<(), String> {
        (self.write)(target, value)
    }

    /// A mutable borrow of the slot, for in-place modification.
    pub fn project_mut<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        (self.project_mut)(target)
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("value_type", &self.value_type_name)
            .finish()
    }
}

/// A conventionally-named accessor declared on one layer of a type's shape.
///
/// The `name` is the logical property name: a `set_label` method registers as
/// a `Set` accessor named `label`.
pub struct AccessorSpec {
    name: &'static str,
    kind: AccessorKind,
    value_type: TypeId,
    value_type_name: &'static str,
    accepts: Option<AcceptsFn>,
    invoke_set: Option<WriteFn>,
    invoke_get: Option<ReadFn>,
    invoke_get_mut: Option<ProjectMutFn>,
}

impl AccessorSpec {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> AccessorKind {
        self.kind
    }

    pub fn value_type(&self) -> TypeId {
        self.value_type
    }

    pub fn value_type_name(&self) -> &'static str {
        self.value_type_name
    }

    /// Whether a `Set` accessor's parameter admits `value`'s runtime type.
    /// Always `false` for non-`Set` kinds.
    pub fn accepts(&self, value: &dyn Any) -> bool {
        match &self.accepts {
            Some(accepts) => accepts(value),
            None => false,
        }
    }

    /// Invokes a `Set` accessor with `value`.
    pub fn invoke_set(&self, target: &mut dyn Any, value: Box<dyn Any>) -> Result<(), String> {
        match &self.invoke_set {
            Some(invoke) => invoke(target, value),
            None => Err(format!("`{}` is not a setter", self.name)),
        }
    }

    /// Invokes a `Get` accessor, returning an owned copy of the value.
    pub fn invoke_get(&self, target: &dyn Any) -> Option<Box<dyn Any>> {
        self.invoke_get.as_ref().and_then(|invoke| invoke(target))
    }

    /// Invokes a `GetMut` accessor, returning a mutable borrow of the value.
    pub fn invoke_get_mut<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        self.invoke_get_mut
            .as_ref()
            .and_then(|invoke| invoke(target))
    }
}

impl fmt::Debug for AccessorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value_type", &self.value_type_name)
            .finish()
    }
}

/// One layer of a type's declared members and accessors, with an optional
/// parent layer.
///
/// A chain of layers models the single-inheritance ancestor walk: resolution
/// starts at the most-derived layer and follows `parent` links to the root.
/// Rust has no subtyping, so every layer in a chain is written against the
/// same concrete target type; an "inherited" member simply projects into an
/// embedded base value (or wherever the shape author points it).
pub struct TypeShape {
    type_name: &'static str,
    target_type: TypeId,
    fields: Vec<FieldSpec>,
    accessors: Vec<AccessorSpec>,
    parent: Option<&'static TypeShape>,
}

impl TypeShape {
    /// Starts a builder for a shape layer describing the concrete type `T`.
    pub fn builder<T: Any>(type_name: &'static str) -> ShapeBuilder<T> {
        ShapeBuilder {
            type_name,
            fields: Vec::new(),
            accessors: Vec::new(),
            parent: None,
            _marker: PhantomData,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The concrete Rust type all closures in this layer downcast to.
    pub fn target_type(&self) -> TypeId {
        self.target_type
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn accessors(&self) -> &[AccessorSpec] {
        &self.accessors
    }

    pub fn parent(&self) -> Option<&'static TypeShape> {
        self.parent
    }

    /// The ancestor walk: this layer first, then each parent up to the root.
    pub fn chain(&self) -> ShapeChain<'_> {
        ShapeChain { next: Some(self) }
    }
}

impl fmt::Debug for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeShape")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("accessors", &self.accessors)
            .field("parent", &self.parent.map(TypeShape::type_name))
            .finish()
    }
}

/// Iterator over a shape chain, most-derived layer first.
#[derive(Debug, Clone)]
pub struct ShapeChain<'a> {
    next: Option<&'a TypeShape>,
}

impl<'a> Iterator for ShapeChain<'a> {
    type Item = &'a TypeShape;

    fn next(&mut self) -> Option<Self::Item> {
        let layer = self.next?;
        self.next = layer.parent;
        Some(layer)
    }
}

/// Typed registration surface for building a [`TypeShape`] layer.
///
/// Projections and accessor bodies are supplied as ordinary typed closures;
/// the builder erases them so the resolver and injections can work against
/// `&mut dyn Any` targets.
pub struct ShapeBuilder<T> {
    type_name: &'static str,
    fields: Vec<FieldSpec>,
    accessors: Vec<AccessorSpec>,
    parent: Option<&'static TypeShape>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> ShapeBuilder<T> {
    /// Links a parent layer. The parent must be written against the same
    /// concrete target type as this layer.
    pub fn parent(mut self, parent: &'static TypeShape) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Declares a data member with its immutable and mutable projections.
    ///
    /// `Clone` on the value type lets update operations read an owned copy of
    /// the current value.
    pub fn field<V, G, M>(mut self, name: &'static str, get: G, get_mut: M) -> Self
    where
        V: Any + Clone,
        G: Fn(&T) -> &V + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        let read: ReadFn = Box::new(move |target| {
            let concrete = target.downcast_ref::<T>()?;
            Some(Box::new(get(concrete).clone()) as Box<dyn Any>)
        });
        let write_projection = std::sync::Arc::new(get_mut);
        let project = std::sync::Arc::clone(&write_projection);
        let write: WriteFn = Box::new(move |target, value| {
            let concrete = target
                .downcast_mut::<T>()
                .ok_or_else(|| format!("target is not a `{}`", type_name::<T>()))?;
            let value = value
                .downcast::<V>()
                .map_err(|_| format!("value is not a `{}`", type_name::<V>()))?;
            *(*write_projection)(concrete) = *value;
            Ok(())
        });
        let project_mut: ProjectMutFn = Box::new(move |target| {
            let concrete = target.downcast_mut::<T>()?;
            Some((*project)(concrete) as &mut dyn Any)
        });
        self.fields.push(FieldSpec {
            name,
            value_type: TypeId::of::<V>(),
            value_type_name: type_name::<V>(),
            read,
            write,
            project_mut,
        });
        self
    }

    /// Declares a `Set` accessor routing through `set` (typically a method
    /// call such as `|t, v| t.set_label(v)`).
    pub fn setter<V, F>(mut self, name: &'static str, set: F) -> Self
    where
        V: Any,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let accepts: AcceptsFn = Box::new(|value| value.is::<V>());
        let invoke_set: WriteFn = Box::new(move |target, value| {
            let concrete = target
                .downcast_mut::<T>()
                .ok_or_else(|| format!("target is not a `{}`", type_name::<T>()))?;
            let value = value
                .downcast::<V>()
                .map_err(|_| format!("value is not a `{}`", type_name::<V>()))?;
            set(concrete, *value);
            Ok(())
        });
        self.accessors.push(AccessorSpec {
            name,
            kind: AccessorKind::Set,
            value_type: TypeId::of::<V>(),
            value_type_name: type_name::<V>(),
            accepts: Some(accepts),
            invoke_set: Some(invoke_set),
            invoke_get: None,
            invoke_get_mut: None,
        });
        self
    }

    /// Declares a `Get` accessor returning an owned copy of the value.
    pub fn getter<V, F>(mut self, name: &'static str, get: F) -> Self
    where
        V: Any,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        let invoke_get: ReadFn = Box::new(move |target| {
            let concrete = target.downcast_ref::<T>()?;
            Some(Box::new(get(concrete)) as Box<dyn Any>)
        });
        self.accessors.push(AccessorSpec {
            name,
            kind: AccessorKind::Get,
            value_type: TypeId::of::<V>(),
            value_type_name: type_name::<V>(),
            accepts: None,
            invoke_set: None,
            invoke_get: Some(invoke_get),
            invoke_get_mut: None,
        });
        self
    }

    /// Declares a `GetMut` accessor handing out a mutable borrow, for
    /// in-place modification of reference-like members.
    pub fn getter_mut<V, F>(mut self, name: &'static str, get_mut: F) -> Self
    where
        V: Any,
        F: for<'a> Fn(&'a mut T) -> &'a mut V + Send + Sync + 'static,
    {
        let invoke_get_mut: ProjectMutFn = Box::new(move |target| {
            let concrete = target.downcast_mut::<T>()?;
            Some(get_mut(concrete) as &mut dyn Any)
        });
        self.accessors.push(AccessorSpec {
            name,
            kind: AccessorKind::GetMut,
            value_type: TypeId::of::<V>(),
            value_type_name: type_name::<V>(),
            accepts: None,
            invoke_set: None,
            invoke_get: None,
            invoke_get_mut: Some(invoke_get_mut),
        });
        self
    }

    pub fn build(self) -> TypeShape {
        TypeShape {
            type_name: self.type_name,
            target_type: TypeId::of::<T>(),
            fields: self.fields,
            accessors: self.accessors,
            parent: self.parent,
        }
    }
}

/// Types that publish a static shape for themselves.
///
/// This is the compile-time static-registry form of the introspection
/// boundary: implementations typically hold the shape in a `LazyLock` and
/// hand out the same reference on every call. Hand-built shapes passed
/// around explicitly work just as well for targets that cannot implement
/// the trait.
pub trait Reflect: Any {
    fn shape() -> &'static TypeShape
    where
        Self: Sized;
}
