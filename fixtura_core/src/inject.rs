use crate::random::{ErasedRandomizer, RandomError, Randomizer, erase};
use crate::resolve;
use crate::seed::RandomContext;
use crate::shape::{AccessorKind, TypeShape};
use std::any::{Any, TypeId, type_name};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Errors surfaced by injections and sequence application.
///
/// Everything here is fatal to the enclosing step and propagates immediately;
/// there are no retries and no fallback beyond the documented setter→field
/// and name→type preference chains.
#[derive(Error, Debug)]
pub enum InjectError {
    /// A required named member did not resolve anywhere in the chain.
    #[error("no member named `{name}` on `{type_name}`")]
    MemberNotFound {
        name: String,
        type_name: &'static str,
    },

    /// A required accessor of the given kind did not resolve.
    #[error("no {kind:?} accessor named `{name}` on `{type_name}`")]
    AccessorNotFound {
        name: String,
        kind: AccessorKind,
        type_name: &'static str,
    },

    /// Neither a compatible setter nor a field was available for a write.
    #[error("`{name}` on `{type_name}` is not writable in the requested mode")]
    TargetNotWritable {
        name: String,
        type_name: &'static str,
    },

    /// No readable location for an in-place modification.
    #[error("`{name}` on `{type_name}` is not readable for in-place modification")]
    TargetNotReadable {
        name: String,
        type_name: &'static str,
    },

    /// The target type could not be instantiated.
    #[error("could not construct an instance of `{type_name}`: {reason}")]
    Construction {
        type_name: &'static str,
        reason: String,
    },

    /// An update could not read or transform a current value.
    #[error("could not update `{name}` on `{type_name}`: {reason}")]
    UpdateResolution {
        name: String,
        type_name: &'static str,
        reason: String,
    },

    /// A resolved value did not fit the located member or accessor.
    #[error("value does not fit `{name}` on `{type_name}`: {reason}")]
    ValueTypeMismatch {
        name: String,
        type_name: &'static str,
        reason: String,
    },

    /// Drawing a generated value failed.
    #[error("drawing a value for `{name}` failed")]
    Draw {
        name: String,
        #[source]
        source: RandomError,
    },

    /// Collected failures from the alternate non-fail-fast apply mode.
    #[error("{} injection step(s) failed", .0.len())]
    Aggregate(Vec<InjectError>),
}

/// Object-safe clonable-`Any`, so literal injection values survive repeated
/// application of one sequence across many targets.
pub trait CloneAny: Any {
    fn clone_boxed(&self) -> Box<dyn CloneAny>;
    fn as_any(&self) -> &dyn Any;
    fn into_boxed_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any + Clone> CloneAny for T {
    fn clone_boxed(&self) -> Box<dyn CloneAny> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_boxed_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A value to inject: either a literal, cloned on every use, or a randomizer
/// drawn fresh on every use.
pub enum ValueSource {
    Literal {
        value: Box<dyn CloneAny>,
        type_name: &'static str,
    },
    Generated {
        randomizer: Box<dyn ErasedRandomizer>,
    },
}

impl ValueSource {
    pub fn literal<V: Any + Clone>(value: V) -> Self {
        ValueSource::Literal {
            value: Box::new(value),
            type_name: type_name::<V>(),
        }
    }

    pub fn generated<T, R>(randomizer: R) -> Self
    where
        T: Any,
        R: Randomizer<T> + 'static,
    {
        ValueSource::Generated {
            randomizer: erase(randomizer),
        }
    }

    /// The type this source produces; by-type injections match members
    /// against it.
    pub fn value_type(&self) -> TypeId {
        match self {
            ValueSource::Literal { value, .. } => (**value).as_any().type_id(),
            ValueSource::Generated { randomizer } => randomizer.output_type(),
        }
    }

    pub fn value_type_name(&self) -> &'static str {
        match self {
            ValueSource::Literal { type_name, .. } => type_name,
            ValueSource::Generated { randomizer } => randomizer.output_type_name(),
        }
    }

    fn resolve(&mut self, member: &str, ctx: &mut RandomContext) -> Result<Box<dyn Any>, InjectError> {
        match self {
            ValueSource::Literal { value, .. } => Ok(value.clone_boxed().into_boxed_any()),
            ValueSource::Generated { randomizer } => {
                randomizer.draw_boxed(ctx).map_err(|source| InjectError::Draw {
                    name: member.to_string(),
                    source,
                })
            }
        }
    }
}

impl fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Literal { type_name, .. } => {
                f.debug_tuple("Literal").field(type_name).finish()
            }
            ValueSource::Generated { randomizer } => f
                .debug_tuple("Generated")
                .field(&randomizer.output_type_name())
                .finish(),
        }
    }
}

/// Transform applied by an update injection: current value in, next value
/// source out. Errors are reasons, contextualized by the applying step.
pub type UpdateFn = Box<dyn FnMut(Box<dyn Any>) -> Result<ValueSource, String>>;

/// In-place mutation applied by a modify injection.
pub type ModifyFn = Box<dyn FnMut(&mut dyn Any) -> Result<(), String>>;

/// A single, applyable unit of work that mutates one named aspect of a
/// target instance.
///
/// Each variant closes over the data for exactly one mutation. Applying a
/// constant `Set` twice from equivalent starting state reproduces the same
/// end state; randomizer-backed variants draw fresh values per application,
/// bounded by the context's determinism.
pub enum Injection {
    /// Writes a value to a named member, via a compatible setter when
    /// `prefer_setter` and one resolves, else directly.
    Set {
        name: String,
        value: ValueSource,
        prefer_setter: bool,
    },
    /// Writes a fresh value to every visible member whose declared type
    /// matches the source's output type. Setters run first when
    /// `prefer_setter`; names they satisfy are excluded from the field pass
    /// case-insensitively, so no logical property is injected twice.
    SetByType {
        value: ValueSource,
        prefer_setter: bool,
    },
    /// Reads the current value, transforms it, and writes the result back.
    Update {
        name: String,
        update: UpdateFn,
        prefer_setter: bool,
        prefer_getter: bool,
    },
    /// Hands a mutable borrow of the current value to the closure; no
    /// write-back step.
    Modify {
        name: String,
        modify: ModifyFn,
        prefer_getter: bool,
    },
}

impl Injection {
    pub fn set(name: &str, value: ValueSource, prefer_setter: bool) -> Self {
        Injection::Set {
            name: name.into(),
            value,
            prefer_setter,
        }
    }

    pub fn set_by_type(value: ValueSource, prefer_setter: bool) -> Self {
        Injection::SetByType {
            value,
            prefer_setter,
        }
    }

    /// Typed update: the closure receives the current value by value and
    /// returns its replacement.
    pub fn update<V, F>(
        name: &str,
        mut transform: F,
        prefer_setter: bool,
        prefer_getter: bool,
    ) -> Self
    where
        V: Any + Clone,
        F: FnMut(V) -> V + 'static,
    {
        let update: UpdateFn = Box::new(move |current| {
            let current = current
                .downcast::<V>()
                .map_err(|_| format!("current value is not a `{}`", type_name::<V>()))?;
            Ok(ValueSource::literal(transform(*current)))
        });
        Injection::Update {
            name: name.into(),
            update,
            prefer_setter,
            prefer_getter,
        }
    }

    /// Fully-parameterized update taking a raw [`UpdateFn`]; the returned
    /// [`ValueSource`] may itself be `Generated`, in which case it is drawn
    /// before writing.
    pub fn update_raw(
        name: &str,
        update: UpdateFn,
        prefer_setter: bool,
        prefer_getter: bool,
    ) -> Self {
        Injection::Update {
            name: name.into(),
            update,
            prefer_setter,
            prefer_getter,
        }
    }

    /// Typed in-place modification of a mutable member.
    pub fn modify<V, F>(name: &str, mut mutate: F, prefer_getter: bool) -> Self
    where
        V: Any,
        F: FnMut(&mut V) + 'static,
    {
        let modify: ModifyFn = Box::new(move |slot| {
            let slot = slot
                .downcast_mut::<V>()
                .ok_or_else(|| format!("member is not a `{}`", type_name::<V>()))?;
            mutate(slot);
            Ok(())
        });
        Injection::Modify {
            name: name.into(),
            modify,
            prefer_getter,
        }
    }

    pub fn modify_raw(name: &str, modify: ModifyFn, prefer_getter: bool) -> Self {
        Injection::Modify {
            name: name.into(),
            modify,
            prefer_getter,
        }
    }

    /// Applies this injection to `target`, resolving members against `shape`.
    pub fn apply(
        &mut self,
        target: &mut dyn Any,
        shape: &TypeShape,
        ctx: &mut RandomContext,
    ) -> Result<(), InjectError> {
        match self {
            Injection::Set {
                name,
                value,
                prefer_setter,
            } => {
                let drawn = value.resolve(name, ctx)?;
                write_member(target, shape, name, drawn, *prefer_setter)
            }
            Injection::SetByType {
                value,
                prefer_setter,
            } => {
                let value_type = value.value_type();
                let mut satisfied: HashSet<String> = HashSet::new();
                if *prefer_setter {
                    for spec in resolve::setters_of_type(shape, value_type) {
                        let drawn = value.resolve(spec.name(), ctx)?;
                        spec.invoke_set(target, drawn).map_err(|reason| {
                            InjectError::ValueTypeMismatch {
                                name: spec.name().to_string(),
                                type_name: shape.type_name(),
                                reason,
                            }
                        })?;
                        satisfied.insert(spec.name().to_ascii_lowercase());
                    }
                }
                for field in resolve::fields_of_type(shape, value_type) {
                    if satisfied.contains(&field.name().to_ascii_lowercase()) {
                        continue;
                    }
                    let drawn = value.resolve(field.name(), ctx)?;
                    field.write(target, drawn).map_err(|reason| {
                        InjectError::ValueTypeMismatch {
                            name: field.name().to_string(),
                            type_name: shape.type_name(),
                            reason,
                        }
                    })?;
                }
                Ok(())
            }
            Injection::Update {
                name,
                update,
                prefer_setter,
                prefer_getter,
            } => {
                let current = match read_member(&*target, shape, name, *prefer_getter) {
                    Some(value) => value,
                    None => {
                        let known = resolve::field(shape, name).is_some()
                            || resolve::accessor(shape, AccessorKind::Get, name).is_some();
                        if !known {
                            return Err(InjectError::MemberNotFound {
                                name: name.clone(),
                                type_name: shape.type_name(),
                            });
                        }
                        return Err(InjectError::UpdateResolution {
                            name: name.clone(),
                            type_name: shape.type_name(),
                            reason: "member resolved but could not be read".to_string(),
                        });
                    }
                };
                let mut next = update(current).map_err(|reason| InjectError::UpdateResolution {
                    name: name.clone(),
                    type_name: shape.type_name(),
                    reason,
                })?;
                let drawn = next.resolve(name, ctx)?;
                write_member(target, shape, name, drawn, *prefer_setter)
            }
            Injection::Modify {
                name,
                modify,
                prefer_getter,
            } => {
                let slot = match (*prefer_getter, resolve::accessor(shape, AccessorKind::GetMut, name)) {
                    (true, Some(spec)) => spec.invoke_get_mut(target),
                    _ => match resolve::field(shape, name) {
                        Some(field) => field.project_mut(target),
                        None => None,
                    },
                };
                let slot = slot.ok_or_else(|| InjectError::TargetNotReadable {
                    name: name.clone(),
                    type_name: shape.type_name(),
                })?;
                modify(slot).map_err(|reason| InjectError::ValueTypeMismatch {
                    name: name.clone(),
                    type_name: shape.type_name(),
                    reason,
                })
            }
        }
    }
}

impl fmt::Debug for Injection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Injection::Set {
                name,
                value,
                prefer_setter,
            } => f
                .debug_struct("Set")
                .field("name", name)
                .field("value", value)
                .field("prefer_setter", prefer_setter)
                .finish(),
            Injection::SetByType {
                value,
                prefer_setter,
            } => f
                .debug_struct("SetByType")
                .field("value", value)
                .field("prefer_setter", prefer_setter)
                .finish(),
            Injection::Update {
                name,
                prefer_setter,
                prefer_getter,
                ..
            } => f
                .debug_struct("Update")
                .field("name", name)
                .field("prefer_setter", prefer_setter)
                .field("prefer_getter", prefer_getter)
                .finish(),
            Injection::Modify {
                name,
                prefer_getter,
                ..
            } => f
                .debug_struct("Modify")
                .field("name", name)
                .field("prefer_getter", prefer_getter)
                .finish(),
        }
    }
}

/// Writes `value` to the named member: setter route only when requested and
/// compatible, direct member write otherwise.
fn write_member(
    target: &mut dyn Any,
    shape: &TypeShape,
    name: &str,
    value: Box<dyn Any>,
    prefer_setter: bool,
) -> Result<(), InjectError> {
    if prefer_setter {
        if let Some(spec) = resolve::setter(shape, name, value.as_ref()) {
            return spec
                .invoke_set(target, value)
                .map_err(|reason| InjectError::ValueTypeMismatch {
                    name: name.to_string(),
                    type_name: shape.type_name(),
                    reason,
                });
        }
    }
    match resolve::field(shape, name) {
        Some(field) => field
            .write(target, value)
            .map_err(|reason| InjectError::ValueTypeMismatch {
                name: name.to_string(),
                type_name: shape.type_name(),
                reason,
            }),
        None => Err(InjectError::TargetNotWritable {
            name: name.to_string(),
            type_name: shape.type_name(),
        }),
    }
}

/// Reads an owned copy of the named member: getter route only when requested
/// and resolvable, direct member read otherwise.
fn read_member(
    target: &dyn Any,
    shape: &TypeShape,
    name: &str,
    prefer_getter: bool,
) -> Option<Box<dyn Any>> {
    if prefer_getter {
        if let Some(spec) = resolve::accessor(shape, AccessorKind::Get, name) {
            return spec.invoke_get(target);
        }
    }
    resolve::field(shape, name).and_then(|f| f.read(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::int_range;
    use crate::shape::Reflect;
    use std::sync::LazyLock;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Profile {
        name: String,
        age: i32,
        nickname: String,
        tags: Vec<String>,
    }

    impl Profile {
        // The setter leaves an observable mark so tests can tell the routes apart.
        fn set_name(&mut self, name: String) {
            self.name = name.to_uppercase();
        }
    }

    impl Reflect for Profile {
        fn shape() -> &'static TypeShape {
            static SHAPE: LazyLock<TypeShape> = LazyLock::new(|| {
                TypeShape::builder::<Profile>("Profile")
                    .field("name", |p: &Profile| &p.name, |p: &mut Profile| &mut p.name)
                    .field("age", |p: &Profile| &p.age, |p: &mut Profile| &mut p.age)
                    .field(
                        "nickname",
                        |p: &Profile| &p.nickname,
                        |p: &mut Profile| &mut p.nickname,
                    )
                    .field("tags", |p: &Profile| &p.tags, |p: &mut Profile| &mut p.tags)
                    .setter::<String, _>("name", |p, v| p.set_name(v))
                    .getter::<i32, _>("age", |p| p.age)
                    .build()
            });
            &SHAPE
        }
    }

    fn apply(injection: &mut Injection, profile: &mut Profile, ctx: &mut RandomContext) -> Result<(), InjectError> {
        injection.apply(profile, Profile::shape(), ctx)
    }

    #[test]
    fn set_with_pinned_seed_writes_the_field_directly() {
        let mut ctx = RandomContext::with_seed(4242424242);
        let mut profile = Profile::default();
        let mut injection = Injection::set("name", ValueSource::literal("injected".to_string()), false);

        apply(&mut injection, &mut profile, &mut ctx).expect("set into an existing field succeeds");
        assert_eq!(
            profile.name, "injected",
            "a direct field write must not route through the transforming setter"
        );
    }

    #[test]
    fn set_prefers_a_compatible_setter_when_asked() {
        let mut ctx = RandomContext::with_seed(1);
        let mut profile = Profile::default();
        let mut injection = Injection::set("name", ValueSource::literal("injected".to_string()), true);

        apply(&mut injection, &mut profile, &mut ctx).unwrap();
        assert_eq!(
            profile.name, "INJECTED",
            "the setter's transformation must be observed when prefer_setter is on"
        );
    }

    #[test]
    fn set_falls_back_to_the_field_when_no_setter_matches() {
        let mut ctx = RandomContext::with_seed(1);
        let mut profile = Profile::default();
        // age has no setter; prefer_setter must quietly take the field route.
        let mut injection = Injection::set("age", ValueSource::literal(33i32), true);

        apply(&mut injection, &mut profile, &mut ctx).unwrap();
        assert_eq!(profile.age, 33);
    }

    #[test]
    fn set_on_a_missing_member_is_target_not_writable() {
        let mut ctx = RandomContext::with_seed(1);
        let mut profile = Profile::default();
        let mut injection = Injection::set("missing", ValueSource::literal(1i32), true);

        let err = apply(&mut injection, &mut profile, &mut ctx).unwrap_err();
        assert!(matches!(err, InjectError::TargetNotWritable { .. }), "got {err:?}");
    }

    #[test]
    fn set_with_generated_value_draws_from_the_context() {
        let mut ctx = RandomContext::with_seed(7);
        let mut profile = Profile::default();
        let mut injection = Injection::set("age", ValueSource::generated(int_range(1, 100)), false);

        apply(&mut injection, &mut profile, &mut ctx).unwrap();
        assert!((1..100).contains(&profile.age));
    }

    #[test]
    fn set_by_type_injects_each_logical_property_exactly_once() {
        let mut ctx = RandomContext::with_seed(11);
        let mut profile = Profile::default();
        // `name` has both a setter and a field; the setter pass must claim it
        // so the field pass skips it, leaving the uppercase mark intact.
        let mut injection =
            Injection::set_by_type(ValueSource::literal("given".to_string()), true);

        apply(&mut injection, &mut profile, &mut ctx).unwrap();
        assert_eq!(profile.name, "GIVEN", "the setter result must survive the field pass");
        assert_eq!(profile.nickname, "given", "other String members get the field route");
    }

    #[test]
    fn set_by_type_draws_a_fresh_value_per_member() {
        let mut ctx = RandomContext::with_seed(23);
        let mut profile = Profile::default();
        let mut injection =
            Injection::set_by_type(ValueSource::generated(crate::random::alphanumeric(10)), false);

        apply(&mut injection, &mut profile, &mut ctx).unwrap();
        assert_eq!(profile.name.len(), 10);
        assert_eq!(profile.nickname.len(), 10);
        assert_ne!(
            profile.name, profile.nickname,
            "each matching member must receive its own draw"
        );
    }

    #[test]
    fn set_by_type_with_no_matching_member_is_a_no_op() {
        let mut ctx = RandomContext::with_seed(1);
        let mut profile = Profile::default();
        let mut injection = Injection::set_by_type(ValueSource::literal(1.5f64), true);

        apply(&mut injection, &mut profile, &mut ctx).unwrap();
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn update_reads_transforms_and_writes_back() {
        let mut ctx = RandomContext::with_seed(1);
        let mut profile = Profile {
            age: 20,
            ..Profile::default()
        };
        let mut injection = Injection::update::<i32, _>("age", |age| age + 1, false, true);

        apply(&mut injection, &mut profile, &mut ctx).unwrap();
        assert_eq!(profile.age, 21);
    }

    #[test]
    fn update_on_a_missing_member_is_fatal() {
        let mut ctx = RandomContext::with_seed(1);
        let mut profile = Profile::default();
        let mut injection = Injection::update::<i32, _>("missing", |v| v, false, false);

        let err = apply(&mut injection, &mut profile, &mut ctx).unwrap_err();
        assert!(matches!(err, InjectError::MemberNotFound { .. }), "got {err:?}");
    }

    #[test]
    fn update_may_return_a_generated_replacement() {
        let mut ctx = RandomContext::with_seed(77);
        let mut profile = Profile {
            age: 10,
            ..Profile::default()
        };
        let update: UpdateFn =
            Box::new(|_current| Ok(ValueSource::generated(int_range(50, 60))));
        let mut injection = Injection::update_raw("age", update, false, false);

        apply(&mut injection, &mut profile, &mut ctx).unwrap();
        assert!((50..60).contains(&profile.age), "the replacement must be drawn before writing");
    }

    #[test]
    fn modify_mutates_in_place_without_write_back() {
        let mut ctx = RandomContext::with_seed(1);
        let mut profile = Profile::default();
        let mut injection = Injection::modify::<Vec<String>, _>(
            "tags",
            |tags| tags.push("fixture".to_string()),
            false,
        );

        apply(&mut injection, &mut profile, &mut ctx).unwrap();
        apply(&mut injection, &mut profile, &mut ctx).unwrap();
        assert_eq!(profile.tags, vec!["fixture".to_string(), "fixture".to_string()]);
    }

    #[test]
    fn modify_on_a_missing_member_is_target_not_readable() {
        let mut ctx = RandomContext::with_seed(1);
        let mut profile = Profile::default();
        let mut injection = Injection::modify::<i32, _>("missing", |_| {}, true);

        let err = apply(&mut injection, &mut profile, &mut ctx).unwrap_err();
        assert!(matches!(err, InjectError::TargetNotReadable { .. }), "got {err:?}");
    }

    #[test]
    fn literal_sources_survive_repeated_application() {
        let mut ctx = RandomContext::with_seed(1);
        let mut injection = Injection::set("name", ValueSource::literal("again".to_string()), false);

        let mut first = Profile::default();
        let mut second = Profile::default();
        apply(&mut injection, &mut first, &mut ctx).unwrap();
        apply(&mut injection, &mut second, &mut ctx).unwrap();
        assert_eq!(first.name, "again");
        assert_eq!(second.name, "again");
    }

    #[test]
    fn mismatched_literal_type_is_reported_with_context() {
        let mut ctx = RandomContext::with_seed(1);
        let mut profile = Profile::default();
        let mut injection = Injection::set("age", ValueSource::literal("not a number".to_string()), false);

        let err = apply(&mut injection, &mut profile, &mut ctx).unwrap_err();
        match err {
            InjectError::ValueTypeMismatch { name, type_name, .. } => {
                assert_eq!(name, "age");
                assert_eq!(type_name, "Profile");
            }
            other => panic!("expected ValueTypeMismatch, got {other:?}"),
        }
    }
}
