use crate::inject::InjectError;
use crate::random::{ErasedRandomizer, RandomError, Randomizer, erase};
use crate::resolve;
use crate::seed::RandomContext;
use crate::shape::Reflect;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Per-target randomizer wiring: paired name- and type-keyed maps for the
/// property (setter) route and the field (direct member) route.
///
/// Name-keyed entries always win over type-keyed entries when both match the
/// same member.
#[derive(Default)]
pub struct RandomizerConfig {
    property_by_name: HashMap<String, Box<dyn ErasedRandomizer>>,
    property_by_type: HashMap<TypeId, Box<dyn ErasedRandomizer>>,
    field_by_name: HashMap<String, Box<dyn ErasedRandomizer>>,
    field_by_type: HashMap<TypeId, Box<dyn ErasedRandomizer>>,
}

impl RandomizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes fresh draws to the setter for the named property.
    pub fn property<T, R>(mut self, name: &str, randomizer: R) -> Self
    where
        T: Any,
        R: Randomizer<T> + 'static,
    {
        self.property_by_name
            .insert(name.to_string(), erase(randomizer));
        self
    }

    /// Routes fresh draws to every setter whose parameter type is `T` and
    /// that no name-keyed entry claims.
    pub fn property_type<T, R>(mut self, randomizer: R) -> Self
    where
        T: Any,
        R: Randomizer<T> + 'static,
    {
        self.property_by_type
            .insert(TypeId::of::<T>(), erase(randomizer));
        self
    }

    /// Routes fresh draws directly into the named member.
    pub fn field<T, R>(mut self, name: &str, randomizer: R) -> Self
    where
        T: Any,
        R: Randomizer<T> + 'static,
    {
        self.field_by_name
            .insert(name.to_string(), erase(randomizer));
        self
    }

    /// Routes fresh draws into every member of type `T` that no name-keyed
    /// entry claims.
    pub fn field_type<T, R>(mut self, randomizer: R) -> Self
    where
        T: Any,
        R: Randomizer<T> + 'static,
    {
        self.field_by_type
            .insert(TypeId::of::<T>(), erase(randomizer));
        self
    }

    fn property_source(
        &mut self,
        name: &str,
        value_type: TypeId,
    ) -> Option<&mut Box<dyn ErasedRandomizer>> {
        match self.property_by_name.get_mut(name) {
            Some(source) => Some(source),
            None => self.property_by_type.get_mut(&value_type),
        }
    }

    fn field_source(
        &mut self,
        name: &str,
        value_type: TypeId,
    ) -> Option<&mut Box<dyn ErasedRandomizer>> {
        match self.field_by_name.get_mut(name) {
            Some(source) => Some(source),
            None => self.field_by_type.get_mut(&value_type),
        }
    }
}

impl fmt::Debug for RandomizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomizerConfig")
            .field("property_by_name", &self.property_by_name.len())
            .field("property_by_type", &self.property_by_type.len())
            .field("field_by_name", &self.field_by_name.len())
            .field("field_by_type", &self.field_by_type.len())
            .finish()
    }
}

/// Synthesizes whole randomized instances of `T`.
///
/// Every call to [`Randomizer::one`] constructs a blank instance through the
/// configured constructor capability and populates it in two passes: first
/// every visible setter with a matching property randomizer (name-keyed
/// before type-keyed), then every visible field not already satisfied by a
/// setter of the same logical name, using the field maps with the same
/// two-tier lookup. Members with no configured randomizer are left at their
/// constructed value.
pub struct ObjectRandomizer<T> {
    construct: Box<dyn FnMut() -> Result<T, String>>,
    config: RandomizerConfig,
}

impl<T: Reflect> ObjectRandomizer<T> {
    /// Builds a randomizer around an explicit constructor capability.
    pub fn new<F>(construct: F, config: RandomizerConfig) -> Self
    where
        F: FnMut() -> Result<T, String> + 'static,
    {
        Self {
            construct: Box::new(construct),
            config,
        }
    }

    /// Builds a randomizer that constructs blank instances with `Default`.
    pub fn of_default(config: RandomizerConfig) -> Self
    where
        T: Default,
    {
        Self::new(|| Ok(T::default()), config)
    }
}

impl<T: Reflect> Randomizer<T> for ObjectRandomizer<T> {
    fn one(&mut self, ctx: &mut RandomContext) -> Result<T, RandomError> {
        let shape = T::shape();
        let mut instance = (self.construct)().map_err(|reason| InjectError::Construction {
            type_name: shape.type_name(),
            reason,
        })?;

        let target: &mut dyn Any = &mut instance;
        let mut satisfied: HashSet<String> = HashSet::new();

        for spec in resolve::setters(shape) {
            let source = match self.config.property_source(spec.name(), spec.value_type()) {
                Some(source) => source,
                None => continue,
            };
            let drawn = source.draw_boxed(ctx)?;
            spec.invoke_set(target, drawn)
                .map_err(|reason| InjectError::ValueTypeMismatch {
                    name: spec.name().to_string(),
                    type_name: shape.type_name(),
                    reason,
                })?;
            satisfied.insert(spec.name().to_ascii_lowercase());
        }

        for field in resolve::fields(shape) {
            if satisfied.contains(&field.name().to_ascii_lowercase()) {
                continue;
            }
            let source = match self.config.field_source(field.name(), field.value_type()) {
                Some(source) => source,
                None => continue,
            };
            let drawn = source.draw_boxed(ctx)?;
            field
                .write(target, drawn)
                .map_err(|reason| InjectError::ValueTypeMismatch {
                    name: field.name().to_string(),
                    type_name: shape.type_name(),
                    reason,
                })?;
        }

        Ok(instance)
    }
}

impl<T> fmt::Debug for ObjectRandomizer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRandomizer")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{alphanumeric, constant, int_range, one_of};
    use crate::shape::TypeShape;
    use std::sync::LazyLock;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Person {
        name: String,
        age: i32,
        motto: String,
    }

    impl Person {
        fn set_name(&mut self, name: String) {
            self.name = name;
        }
    }

    impl Reflect for Person {
        fn shape() -> &'static TypeShape {
            static SHAPE: LazyLock<TypeShape> = LazyLock::new(|| {
                TypeShape::builder::<Person>("Person")
                    .field("name", |p: &Person| &p.name, |p: &mut Person| &mut p.name)
                    .field("age", |p: &Person| &p.age, |p: &mut Person| &mut p.age)
                    .field("motto", |p: &Person| &p.motto, |p: &mut Person| &mut p.motto)
                    .setter::<String, _>("name", |p, v| p.set_name(v))
                    .build()
            });
            &SHAPE
        }
    }

    #[test]
    fn populates_configured_members_and_leaves_the_rest() {
        let mut ctx = RandomContext::with_seed(2024);
        let config = RandomizerConfig::new()
            .property("name", one_of(["Alice".to_string(), "Bob".to_string()]))
            .field_type::<i32, _>(int_range(1, 100));
        let mut people = ObjectRandomizer::<Person>::of_default(config);

        for _ in 0..50 {
            let person = people.one(&mut ctx).unwrap();
            assert!(
                person.name == "Alice" || person.name == "Bob",
                "name must come from the configured domain, got {}",
                person.name
            );
            assert!((1..100).contains(&person.age), "age {} out of [1, 100)", person.age);
            assert_eq!(person.motto, "", "unconfigured members stay at their default");
        }
    }

    #[test]
    fn name_keyed_entry_beats_type_keyed_entry() {
        let mut ctx = RandomContext::with_seed(5);
        let config = RandomizerConfig::new()
            .field("age", constant(7i32))
            .field_type::<i32, _>(constant(99i32));
        let mut people = ObjectRandomizer::<Person>::of_default(config);

        for _ in 0..10 {
            let person = people.one(&mut ctx).unwrap();
            assert_eq!(
                person.age, 7,
                "the name-keyed randomizer must always win over the type-keyed one"
            );
        }
    }

    #[test]
    fn setter_satisfaction_blocks_the_field_route_for_the_same_name() {
        let mut ctx = RandomContext::with_seed(9);
        // Both routes are configured for `name`; the property route runs
        // first and must claim the logical property.
        let config = RandomizerConfig::new()
            .property("name", constant("from-setter".to_string()))
            .field("name", constant("from-field".to_string()));
        let mut people = ObjectRandomizer::<Person>::of_default(config);

        let person = people.one(&mut ctx).unwrap();
        assert_eq!(person.name, "from-setter");
    }

    #[test]
    fn construction_failure_is_fatal_and_contextualized() {
        let mut ctx = RandomContext::with_seed(1);
        let mut people = ObjectRandomizer::<Person>::new(
            || Err("no database row".to_string()),
            RandomizerConfig::new(),
        );

        let err = people.one(&mut ctx).unwrap_err();
        match err {
            RandomError::Inject(inner) => match *inner {
                InjectError::Construction { type_name, reason } => {
                    assert_eq!(type_name, "Person");
                    assert!(reason.contains("no database row"));
                }
                other => panic!("expected Construction, got {other:?}"),
            },
            other => panic!("expected Inject, got {other:?}"),
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_instances() {
        fn build() -> ObjectRandomizer<Person> {
            ObjectRandomizer::of_default(
                RandomizerConfig::new()
                    .property("name", alphanumeric(6))
                    .field("motto", alphanumeric(12))
                    .field_type::<i32, _>(int_range(0, 500)),
            )
        }

        let mut ctx_a = RandomContext::with_seed(314159);
        let mut ctx_b = RandomContext::with_seed(314159);
        let people_a = build().many(&mut ctx_a, 10).unwrap();
        let people_b = build().many(&mut ctx_b, 10).unwrap();

        assert_eq!(people_a, people_b, "population order and draws must be deterministic");
    }

    #[test]
    fn type_keyed_property_entry_reaches_setters_by_parameter_type() {
        let mut ctx = RandomContext::with_seed(44);
        let config =
            RandomizerConfig::new().property_type::<String, _>(constant("typed".to_string()));
        let mut people = ObjectRandomizer::<Person>::of_default(config);

        let person = people.one(&mut ctx).unwrap();
        assert_eq!(person.name, "typed", "the String setter matches by parameter type");
        assert_eq!(person.motto, "", "fields without setters are not the property route's job");
    }
}
