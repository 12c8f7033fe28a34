use crate::inject::{InjectError, Injection, ModifyFn, UpdateFn, ValueSource};
use crate::random::Randomizer;
use crate::seed::RandomContext;
use crate::shape::{Reflect, TypeShape};
use std::any::Any;
use std::fmt;

/// An ordered accumulation of [`Injection`]s, applied in append order to a
/// target instance.
///
/// The builder is chained by value and the finished sequence is reusable
/// across any number of targets. Application is fail-fast: the first failing
/// step is returned and members mutated by earlier steps stay mutated;
/// there is no rollback. [`Injector::apply_collecting`] is the alternate
/// mode that runs every step and aggregates the failures.
#[derive(Default)]
pub struct Injector {
    steps: Vec<Injection>,
}

impl Injector {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends an already-built injection.
    pub fn append(mut self, injection: Injection) -> Self {
        self.steps.push(injection);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Writes a literal directly into the named member.
    pub fn set_field<V: Any + Clone>(self, name: &str, value: V) -> Self {
        self.set(name, ValueSource::literal(value), false)
    }

    /// Writes a literal through a compatible setter when one exists, else
    /// into the member.
    pub fn set_property<V: Any + Clone>(self, name: &str, value: V) -> Self {
        self.set(name, ValueSource::literal(value), true)
    }

    /// Writes a freshly drawn value directly into the named member.
    pub fn set_field_from<T, R>(self, name: &str, randomizer: R) -> Self
    where
        T: Any,
        R: Randomizer<T> + 'static,
    {
        self.set(name, ValueSource::generated(randomizer), false)
    }

    /// Writes a freshly drawn value, preferring a compatible setter.
    pub fn set_property_from<T, R>(self, name: &str, randomizer: R) -> Self
    where
        T: Any,
        R: Randomizer<T> + 'static,
    {
        self.set(name, ValueSource::generated(randomizer), true)
    }

    /// Writes a literal into every member whose declared type matches.
    pub fn set_field_of_type<V: Any + Clone>(self, value: V) -> Self {
        self.set_of_type(ValueSource::literal(value), false)
    }

    /// Writes a literal to every matching setter, then to every matching
    /// member not already satisfied by name.
    pub fn set_property_of_type<V: Any + Clone>(self, value: V) -> Self {
        self.set_of_type(ValueSource::literal(value), true)
    }

    /// Like [`Self::set_field_of_type`] with a fresh draw per member.
    pub fn set_field_of_type_from<T, R>(self, randomizer: R) -> Self
    where
        T: Any,
        R: Randomizer<T> + 'static,
    {
        self.set_of_type(ValueSource::generated(randomizer), false)
    }

    /// Like [`Self::set_property_of_type`] with a fresh draw per member.
    pub fn set_property_of_type_from<T, R>(self, randomizer: R) -> Self
    where
        T: Any,
        R: Randomizer<T> + 'static,
    {
        self.set_of_type(ValueSource::generated(randomizer), true)
    }

    /// Reads the member directly, transforms it, writes it back directly.
    pub fn update_field<V, F>(self, name: &str, transform: F) -> Self
    where
        V: Any + Clone,
        F: FnMut(V) -> V + 'static,
    {
        self.append(Injection::update::<V, F>(name, transform, false, false))
    }

    /// Reads through a getter and writes through a setter where available.
    pub fn update_property<V, F>(self, name: &str, transform: F) -> Self
    where
        V: Any + Clone,
        F: FnMut(V) -> V + 'static,
    {
        self.append(Injection::update::<V, F>(name, transform, true, true))
    }

    /// Mutates the member in place through its direct projection.
    pub fn modify_field<V, F>(self, name: &str, mutate: F) -> Self
    where
        V: Any,
        F: FnMut(&mut V) + 'static,
    {
        self.append(Injection::modify::<V, F>(name, mutate, false))
    }

    /// Mutates in place, preferring a mut-getter accessor.
    pub fn modify_property<V, F>(self, name: &str, mutate: F) -> Self
    where
        V: Any,
        F: FnMut(&mut V) + 'static,
    {
        self.append(Injection::modify::<V, F>(name, mutate, true))
    }

    /// Fully-parameterized named set.
    pub fn set(self, name: &str, value: ValueSource, prefer_setter: bool) -> Self {
        self.append(Injection::set(name, value, prefer_setter))
    }

    /// Fully-parameterized by-type set.
    pub fn set_of_type(self, value: ValueSource, prefer_setter: bool) -> Self {
        self.append(Injection::set_by_type(value, prefer_setter))
    }

    /// Fully-parameterized update with explicit preference flags.
    pub fn update(
        self,
        name: &str,
        update: UpdateFn,
        prefer_setter: bool,
        prefer_getter: bool,
    ) -> Self {
        self.append(Injection::update_raw(name, update, prefer_setter, prefer_getter))
    }

    /// Fully-parameterized modify with an explicit getter preference.
    pub fn modify(self, name: &str, modify: ModifyFn, prefer_getter: bool) -> Self {
        self.append(Injection::modify_raw(name, modify, prefer_getter))
    }

    /// Applies all steps to `target` in append order, stopping at the first
    /// failure. Returns the target for call chaining.
    pub fn apply<'t, T: Reflect>(
        &mut self,
        target: &'t mut T,
        ctx: &mut RandomContext,
    ) -> Result<&'t mut T, InjectError> {
        self.apply_dyn(target, T::shape(), ctx)?;
        Ok(target)
    }

    /// Applies all steps to an erased target resolved against `shape`.
    pub fn apply_dyn(
        &mut self,
        target: &mut dyn Any,
        shape: &TypeShape,
        ctx: &mut RandomContext,
    ) -> Result<(), InjectError> {
        for injection in &mut self.steps {
            injection.apply(target, shape, ctx)?;
        }
        Ok(())
    }

    /// The alternate non-fail-fast mode: applies every step regardless of
    /// earlier failures and reports them all as one aggregate error.
    pub fn apply_collecting(
        &mut self,
        target: &mut dyn Any,
        shape: &TypeShape,
        ctx: &mut RandomContext,
    ) -> Result<(), InjectError> {
        let mut failures = Vec::new();
        for injection in &mut self.steps {
            if let Err(err) = injection.apply(target, shape, ctx) {
                failures.push(err);
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(InjectError::Aggregate(failures))
        }
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector").field("steps", &self.steps).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::int_range;
    use std::sync::LazyLock;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Ticket {
        title: String,
        priority: i32,
        notes: Vec<String>,
    }

    impl Ticket {
        fn set_title(&mut self, title: String) {
            self.title = title.trim().to_string();
        }
    }

    impl Reflect for Ticket {
        fn shape() -> &'static TypeShape {
            static SHAPE: LazyLock<TypeShape> = LazyLock::new(|| {
                TypeShape::builder::<Ticket>("Ticket")
                    .field("title", |t: &Ticket| &t.title, |t: &mut Ticket| &mut t.title)
                    .field(
                        "priority",
                        |t: &Ticket| &t.priority,
                        |t: &mut Ticket| &mut t.priority,
                    )
                    .field("notes", |t: &Ticket| &t.notes, |t: &mut Ticket| &mut t.notes)
                    .setter::<String, _>("title", |t, v| t.set_title(v))
                    .getter::<i32, _>("priority", |t| t.priority)
                    .build()
            });
            &SHAPE
        }
    }

    #[test]
    fn steps_apply_in_append_order() {
        let mut ctx = RandomContext::with_seed(1);
        let mut ticket = Ticket::default();

        Injector::new()
            .set_field("priority", 1i32)
            .update_field::<i32, _>("priority", |p| p * 10)
            .set_field("title", "first".to_string())
            .set_field("title", "second".to_string())
            .apply(&mut ticket, &mut ctx)
            .expect("all steps target existing members");

        assert_eq!(ticket.priority, 10, "update must see the earlier set");
        assert_eq!(ticket.title, "second", "later sets overwrite earlier ones");
    }

    #[test]
    fn apply_is_fail_fast_without_rollback() {
        let mut ctx = RandomContext::with_seed(1);
        let mut ticket = Ticket::default();

        let err = Injector::new()
            .set_field("title", "kept".to_string())
            .set_field("missing", 5i32)
            .set_field("priority", 9i32)
            .apply(&mut ticket, &mut ctx)
            .unwrap_err();

        assert!(matches!(err, InjectError::TargetNotWritable { .. }), "got {err:?}");
        assert_eq!(ticket.title, "kept", "mutations before the failing step must remain");
        assert_eq!(ticket.priority, 0, "steps after the failure must not run");
    }

    #[test]
    fn sequence_is_reusable_across_targets() {
        let mut ctx = RandomContext::with_seed(1);
        let mut injector = Injector::new().set_property("title", "  padded  ".to_string());

        let mut first = Ticket::default();
        let mut second = Ticket::default();
        injector.apply(&mut first, &mut ctx).unwrap();
        injector.apply(&mut second, &mut ctx).unwrap();

        assert_eq!(first.title, "padded", "the setter trims on the first target");
        assert_eq!(second.title, "padded", "and again on the second");
    }

    #[test]
    fn randomized_steps_draw_per_application() {
        let mut ctx = RandomContext::with_seed(99);
        let mut injector = Injector::new().set_field_from("priority", int_range(0, 1_000_000));

        let mut first = Ticket::default();
        let mut second = Ticket::default();
        injector.apply(&mut first, &mut ctx).unwrap();
        injector.apply(&mut second, &mut ctx).unwrap();

        assert_ne!(
            first.priority, second.priority,
            "each application must draw its own value from the shared context"
        );
    }

    #[test]
    fn modify_and_property_routes_compose() {
        let mut ctx = RandomContext::with_seed(1);
        let mut ticket = Ticket::default();

        Injector::new()
            .modify_field::<Vec<String>, _>("notes", |notes| notes.push("triaged".to_string()))
            .update_property::<i32, _>("priority", |p| p + 2)
            .apply(&mut ticket, &mut ctx)
            .unwrap();

        assert_eq!(ticket.notes, vec!["triaged".to_string()]);
        assert_eq!(ticket.priority, 2);
    }

    #[test]
    fn apply_collecting_aggregates_every_failure() {
        let mut ctx = RandomContext::with_seed(1);
        let mut ticket = Ticket::default();

        let err = Injector::new()
            .set_field("ghost", 1i32)
            .set_field("title", "landed".to_string())
            .set_field("phantom", 2i32)
            .apply_collecting(&mut ticket, Ticket::shape(), &mut ctx)
            .unwrap_err();

        match err {
            InjectError::Aggregate(failures) => {
                assert_eq!(failures.len(), 2, "both missing members must be reported");
            }
            other => panic!("expected Aggregate, got {other:?}"),
        }
        assert_eq!(ticket.title, "landed", "good steps still run in collecting mode");
    }

    #[test]
    fn empty_injector_applies_cleanly() {
        let mut ctx = RandomContext::with_seed(1);
        let mut ticket = Ticket::default();
        let mut injector = Injector::new();

        assert!(injector.is_empty());
        injector.apply(&mut ticket, &mut ctx).unwrap();
        assert_eq!(ticket, Ticket::default());
    }
}
