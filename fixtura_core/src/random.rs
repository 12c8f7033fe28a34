use crate::inject::InjectError;
use crate::seed::RandomContext;
use std::any::{Any, TypeId, type_name};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;
use thiserror::Error;

/// Alphabet used by [`alphanumeric`].
const ALPHANUMERIC: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Errors that can occur while drawing values.
#[derive(Error, Debug)]
pub enum RandomError {
    /// A choice-based randomizer was configured with nothing to choose from.
    #[error("cannot draw from an empty domain")]
    EmptyDomain,

    /// A bounded-range randomizer was configured with an empty or inverted range.
    #[error("invalid draw range: {0}")]
    InvalidRange(String),

    /// A weighted-boolean probability outside `[0.0, 1.0]`.
    #[error("probability {0} is outside [0.0, 1.0]")]
    InvalidProbability(f64),

    /// An object randomizer failed while constructing or populating an instance.
    #[error("{0}")]
    Inject(Box<InjectError>),
}

impl From<InjectError> for RandomError {
    fn from(err: InjectError) -> Self {
        RandomError::Inject(Box::new(err))
    }
}

/// A capability that produces one value of type `T` on demand.
///
/// `one` is the sole primitive; `many` and `stream` are derived from it.
/// Randomizers take `&mut self` because some combinators (notably
/// [`OnceEachOf`]) carry visible internal state, and draw exclusively from
/// the [`RandomContext`] handed to each call.
pub trait Randomizer<T> {
    /// Produces the next value.
    fn one(&mut self, ctx: &mut RandomContext) -> Result<T, RandomError>;

    /// Produces `n` values in draw order.
    fn many(&mut self, ctx: &mut RandomContext, n: usize) -> Result<Vec<T>, RandomError> {
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            values.push(self.one(ctx)?);
        }
        Ok(values)
    }

    /// A lazy, finite sequence of `n` values. Every item advances the shared
    /// randomness, so the sequence is not restartable: a second call picks up
    /// where the first left off.
    fn stream<'a>(&'a mut self, ctx: &'a mut RandomContext, n: usize) -> DrawStream<'a, Self, T>
    where
        Self: Sized,
    {
        DrawStream {
            source: self,
            ctx,
            remaining: n,
            _marker: PhantomData,
        }
    }
}

/// Iterator returned by [`Randomizer::stream`] and [`stream_of`].
pub struct DrawStream<'a, R, T> {
    source: &'a mut R,
    ctx: &'a mut RandomContext,
    remaining: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T, R: Randomizer<T>> Iterator for DrawStream<'a, R, T> {
    type Item = Result<T, RandomError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.source.one(self.ctx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, R: Randomizer<T>> ExactSizeIterator for DrawStream<'a, R, T> {}

/// Type-erased randomizer handle used wherever draws cross an `Any` boundary
/// (injections keyed by member, config maps keyed by name or type).
pub trait ErasedRandomizer {
    fn draw_boxed(&mut self, ctx: &mut RandomContext) -> Result<Box<dyn Any>, RandomError>;
    fn output_type(&self) -> TypeId;
    fn output_type_name(&self) -> &'static str;
}

struct Erased<T, R> {
    inner: R,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any, R: Randomizer<T>> ErasedRandomizer for Erased<T, R> {
    fn draw_boxed(&mut self, ctx: &mut RandomContext) -> Result<Box<dyn Any>, RandomError> {
        Ok(Box::new(self.inner.one(ctx)?))
    }

    fn output_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn output_type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Erases a typed randomizer into a boxed [`ErasedRandomizer`].
pub fn erase<T, R>(randomizer: R) -> Box<dyn ErasedRandomizer>
where
    T: Any,
    R: Randomizer<T> + 'static,
{
    Box::new(Erased {
        inner: randomizer,
        _marker: PhantomData,
    })
}

/// Always returns a clone of the configured value.
#[derive(Debug, Clone, Copy)]
pub struct Constant<T> {
    value: T,
}

pub fn constant<T: Clone>(value: T) -> Constant<T> {
    Constant { value }
}

impl<T: Clone> Randomizer<T> for Constant<T> {
    fn one(&mut self, _ctx: &mut RandomContext) -> Result<T, RandomError> {
        Ok(self.value.clone())
    }
}

/// Adapts a closure over the context into a randomizer.
#[derive(Debug, Clone, Copy)]
pub struct FromFn<F, T> {
    draw: F,
    _marker: PhantomData<fn() -> T>,
}

pub fn from_fn<T, F>(draw: F) -> FromFn<F, T>
where
    F: FnMut(&mut RandomContext) -> Result<T, RandomError>,
{
    FromFn {
        draw,
        _marker: PhantomData,
    }
}

impl<T, F> Randomizer<T> for FromFn<F, T>
where
    F: FnMut(&mut RandomContext) -> Result<T, RandomError>,
{
    fn one(&mut self, ctx: &mut RandomContext) -> Result<T, RandomError> {
        (self.draw)(ctx)
    }
}

/// Uniform choice over a fixed domain, one index draw per call. Works for
/// enum domains by listing the variants.
#[derive(Debug, Clone)]
pub struct OneOf<T> {
    choices: Vec<T>,
}

pub fn one_of<T: Clone>(choices: impl Into<Vec<T>>) -> OneOf<T> {
    OneOf {
        choices: choices.into(),
    }
}

impl<T: Clone> Randomizer<T> for OneOf<T> {
    fn one(&mut self, ctx: &mut RandomContext) -> Result<T, RandomError> {
        if self.choices.is_empty() {
            return Err(RandomError::EmptyDomain);
        }
        let index = ctx.index(self.choices.len());
        Ok(self.choices[index].clone())
    }
}

/// Hands out each element of the pool exactly once, in random order, then
/// `None` forever. The one combinator with visible internal state; not safe
/// for concurrent pulls without external synchronization.
#[derive(Debug, Clone)]
pub struct OnceEachOf<T> {
    pool: Vec<T>,
}

pub fn once_each_of<T>(pool: impl Into<Vec<T>>) -> OnceEachOf<T> {
    OnceEachOf { pool: pool.into() }
}

impl<T> OnceEachOf<T> {
    /// How many elements are still undrawn.
    pub fn remaining(&self) -> usize {
        self.pool.len()
    }
}

impl<T> Randomizer<Option<T>> for OnceEachOf<T> {
    fn one(&mut self, ctx: &mut RandomContext) -> Result<Option<T>, RandomError> {
        if self.pool.is_empty() {
            return Ok(None);
        }
        let index = ctx.index(self.pool.len());
        Ok(Some(self.pool.swap_remove(index)))
    }
}

/// A boolean that is `true` with the configured probability.
#[derive(Debug, Clone, Copy)]
pub struct Chance {
    p: f64,
}

pub fn chance(p: f64) -> Chance {
    Chance { p }
}

impl Randomizer<bool> for Chance {
    fn one(&mut self, ctx: &mut RandomContext) -> Result<bool, RandomError> {
        if !(0.0..=1.0).contains(&self.p) {
            return Err(RandomError::InvalidProbability(self.p));
        }
        Ok(ctx.chance(self.p))
    }
}

macro_rules! bounded_range_randomizer {
    ($(#[$doc:meta])* $name:ident, $ctor:ident, $ty:ty, $draw:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            min: $ty,
            max: $ty,
        }

        pub fn $ctor(min: $ty, max: $ty) -> $name {
            $name { min, max }
        }

        impl Randomizer<$ty> for $name {
            fn one(&mut self, ctx: &mut RandomContext) -> Result<$ty, RandomError> {
                if self.min >= self.max {
                    return Err(RandomError::InvalidRange(format!(
                        "[{}, {}) is empty",
                        self.min, self.max
                    )));
                }
                Ok(ctx.$draw(self.min, self.max))
            }
        }
    };
}

bounded_range_randomizer!(
    /// A uniform `i32` draw in `[min, max)`.
    IntRange, int_range, i32, int_in
);
bounded_range_randomizer!(
    /// A uniform `i64` draw in `[min, max)`.
    LongRange, long_range, i64, long_in
);
bounded_range_randomizer!(
    /// A uniform `f32` draw in `[min, max)`.
    FloatRange, float_range, f32, float_in
);
bounded_range_randomizer!(
    /// A uniform `f64` draw in `[min, max)`.
    DoubleRange, double_range, f64, double_in
);

/// A uniform collection-size draw in `[min, max)`.
#[derive(Debug, Clone, Copy)]
pub struct SizeRange {
    min: usize,
    max: usize,
}

pub fn size_range(min: usize, max: usize) -> SizeRange {
    SizeRange { min, max }
}

impl Randomizer<usize> for SizeRange {
    fn one(&mut self, ctx: &mut RandomContext) -> Result<usize, RandomError> {
        if self.min >= self.max {
            return Err(RandomError::InvalidRange(format!(
                "[{}, {}) is empty",
                self.min, self.max
            )));
        }
        Ok(self.min + ctx.index(self.max - self.min))
    }
}

/// Raw random bytes of a fixed length.
#[derive(Debug, Clone, Copy)]
pub struct BytesOf {
    len: usize,
}

pub fn bytes_of(len: usize) -> BytesOf {
    BytesOf { len }
}

impl Randomizer<Vec<u8>> for BytesOf {
    fn one(&mut self, ctx: &mut RandomContext) -> Result<Vec<u8>, RandomError> {
        let mut buf = vec![0u8; self.len];
        ctx.fill_bytes(&mut buf);
        Ok(buf)
    }
}

/// A single character drawn uniformly from an alphabet.
#[derive(Debug, Clone)]
pub struct CharOf {
    alphabet: Vec<char>,
}

pub fn char_of(alphabet: &str) -> CharOf {
    CharOf {
        alphabet: alphabet.chars().collect(),
    }
}

impl Randomizer<char> for CharOf {
    fn one(&mut self, ctx: &mut RandomContext) -> Result<char, RandomError> {
        if self.alphabet.is_empty() {
            return Err(RandomError::EmptyDomain);
        }
        Ok(self.alphabet[ctx.index(self.alphabet.len())])
    }
}

/// A string of a fixed length over an alphabet.
#[derive(Debug, Clone)]
pub struct StringOf {
    alphabet: Vec<char>,
    len: usize,
}

pub fn string_of(alphabet: &str, len: usize) -> StringOf {
    StringOf {
        alphabet: alphabet.chars().collect(),
        len,
    }
}

/// A string of `len` alphanumeric ASCII characters.
pub fn alphanumeric(len: usize) -> StringOf {
    string_of(ALPHANUMERIC, len)
}

impl Randomizer<String> for StringOf {
    fn one(&mut self, ctx: &mut RandomContext) -> Result<String, RandomError> {
        if self.alphabet.is_empty() && self.len > 0 {
            return Err(RandomError::EmptyDomain);
        }
        let mut out = String::with_capacity(self.len);
        for _ in 0..self.len {
            out.push(self.alphabet[ctx.index(self.alphabet.len())]);
        }
        Ok(out)
    }
}

/// A list whose length is drawn from `count` on every call, then filled with
/// that many fresh draws from `value`.
#[derive(Debug, Clone)]
pub struct ListOf<C, R> {
    count: C,
    value: R,
}

pub fn list_of<C, R>(count: C, value: R) -> ListOf<C, R> {
    ListOf { count, value }
}

impl<T, C, R> Randomizer<Vec<T>> for ListOf<C, R>
where
    C: Randomizer<usize>,
    R: Randomizer<T>,
{
    fn one(&mut self, ctx: &mut RandomContext) -> Result<Vec<T>, RandomError> {
        let n = self.count.one(ctx)?;
        self.value.many(ctx, n)
    }
}

/// Like [`ListOf`] but collected into a set; duplicates collapse, so the
/// resulting size may be below the drawn count.
#[derive(Debug, Clone)]
pub struct SetOf<C, R> {
    count: C,
    value: R,
}

pub fn set_of<C, R>(count: C, value: R) -> SetOf<C, R> {
    SetOf { count, value }
}

impl<T, C, R> Randomizer<HashSet<T>> for SetOf<C, R>
where
    T: Eq + Hash,
    C: Randomizer<usize>,
    R: Randomizer<T>,
{
    fn one(&mut self, ctx: &mut RandomContext) -> Result<HashSet<T>, RandomError> {
        let n = self.count.one(ctx)?;
        let mut out = HashSet::with_capacity(n);
        for _ in 0..n {
            out.insert(self.value.one(ctx)?);
        }
        Ok(out)
    }
}

/// Like [`ListOf`] but boxed as a slice.
#[derive(Debug, Clone)]
pub struct ArrayOf<C, R> {
    count: C,
    value: R,
}

pub fn array_of<C, R>(count: C, value: R) -> ArrayOf<C, R> {
    ArrayOf { count, value }
}

impl<T, C, R> Randomizer<Box<[T]>> for ArrayOf<C, R>
where
    C: Randomizer<usize>,
    R: Randomizer<T>,
{
    fn one(&mut self, ctx: &mut RandomContext) -> Result<Box<[T]>, RandomError> {
        let n = self.count.one(ctx)?;
        Ok(self.value.many(ctx, n)?.into_boxed_slice())
    }
}

/// A map whose size is drawn from `count`, then filled with that many fresh
/// key/value pairs; duplicate keys collapse.
#[derive(Debug, Clone)]
pub struct MapOf<C, K, V> {
    count: C,
    key: K,
    value: V,
}

pub fn map_of<C, K, V>(count: C, key: K, value: V) -> MapOf<C, K, V> {
    MapOf { count, key, value }
}

impl<Kt, Vt, C, K, V> Randomizer<HashMap<Kt, Vt>> for MapOf<C, K, V>
where
    Kt: Eq + Hash,
    C: Randomizer<usize>,
    K: Randomizer<Kt>,
    V: Randomizer<Vt>,
{
    fn one(&mut self, ctx: &mut RandomContext) -> Result<HashMap<Kt, Vt>, RandomError> {
        let n = self.count.one(ctx)?;
        let mut out = HashMap::with_capacity(n);
        for _ in 0..n {
            let key = self.key.one(ctx)?;
            let value = self.value.one(ctx)?;
            out.insert(key, value);
        }
        Ok(out)
    }
}

/// Draws a size from `count` eagerly, then yields that many values lazily
/// from `value`. The stream shares (and advances) the caller's context.
pub fn stream_of<'a, T, C, R>(
    count: &mut C,
    value: &'a mut R,
    ctx: &'a mut RandomContext,
) -> Result<DrawStream<'a, R, T>, RandomError>
where
    C: Randomizer<usize>,
    R: Randomizer<T>,
{
    let n = count.one(ctx)?;
    Ok(value.stream(ctx, n))
}
