pub mod config;
pub mod inject;
pub mod injector;
pub mod object;
pub mod random;
pub mod resolve;
pub mod seed;
pub mod shape;

pub use config::{FixturaConfig, RandomnessSettings, SampleSettings};
pub use inject::{CloneAny, InjectError, Injection, ModifyFn, UpdateFn, ValueSource};
pub use injector::Injector;
pub use object::{ObjectRandomizer, RandomizerConfig};
pub use random::{DrawStream, ErasedRandomizer, RandomError, Randomizer, erase};
pub use seed::{RandomContext, SEED_ENV_KEY};
pub use shape::{AccessorKind, AccessorSpec, FieldSpec, Reflect, ShapeBuilder, TypeShape};
