use fixtura_core::config::{FixturaConfig, SampleSettings};
use fixtura_core::object::{ObjectRandomizer, RandomizerConfig};
use fixtura_core::random::{self, Randomizer};
use fixtura_core::seed::RandomContext;
use fixtura_core::shape::{Reflect, TypeShape};

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Instant;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    #[clap(short, long)]
    seed: Option<u64>,
    #[clap(short = 'n', long)]
    count: Option<u64>,
    #[clap(long)]
    pretty: bool,
}

/// Demo record emitted as JSON lines; stands in for whatever domain type a
/// test suite would synthesize.
#[derive(Serialize, Debug, Clone, Default)]
struct SampleRecord {
    name: String,
    email: String,
    age: i32,
    active: bool,
    tags: Vec<String>,
}

impl SampleRecord {
    fn set_name(&mut self, name: String) {
        self.name = name.trim().to_string();
    }
}

impl Reflect for SampleRecord {
    fn shape() -> &'static TypeShape {
        static SHAPE: LazyLock<TypeShape> = LazyLock::new(|| {
            TypeShape::builder::<SampleRecord>("SampleRecord")
                .field(
                    "name",
                    |r: &SampleRecord| &r.name,
                    |r: &mut SampleRecord| &mut r.name,
                )
                .field(
                    "email",
                    |r: &SampleRecord| &r.email,
                    |r: &mut SampleRecord| &mut r.email,
                )
                .field(
                    "age",
                    |r: &SampleRecord| &r.age,
                    |r: &mut SampleRecord| &mut r.age,
                )
                .field(
                    "active",
                    |r: &SampleRecord| &r.active,
                    |r: &mut SampleRecord| &mut r.active,
                )
                .field(
                    "tags",
                    |r: &SampleRecord| &r.tags,
                    |r: &mut SampleRecord| &mut r.tags,
                )
                .setter::<String, _>("name", |r, v| r.set_name(v))
                .build()
        });
        &SHAPE
    }
}

fn sample_randomizer() -> ObjectRandomizer<SampleRecord> {
    let first_names = [
        "Alice", "Bob", "Carol", "Dae", "Esha", "Femi", "Grete", "Hana",
    ]
    .map(str::to_string);
    let tags = ["alpha", "beta", "canary", "legacy", "vip"].map(str::to_string);

    let config = RandomizerConfig::new()
        .property("name", random::one_of(first_names))
        .field(
            "email",
            random::from_fn(|ctx| Ok(format!("user{:04}@example.net", ctx.int_in(0, 10_000)))),
        )
        .field("active", random::chance(0.8))
        .field("tags", random::list_of(random::size_range(0, 4), random::one_of(tags)))
        .field_type::<i32, _>(random::int_range(18, 80));

    ObjectRandomizer::of_default(config)
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let config = match cli.config_file {
        Some(config_path) => {
            println!("Reading settings from {config_path:?}");
            FixturaConfig::load_from_file(&config_path)?
        }
        None => {
            let default_config_path = PathBuf::from("fixtura.toml");
            if default_config_path.exists() {
                println!("Reading settings from {default_config_path:?}");
                FixturaConfig::load_from_file(&default_config_path)?
            } else {
                println!("No 'fixtura.toml' found, using built-in defaults");
                FixturaConfig::default()
            }
        }
    };

    let mut ctx = match cli.seed {
        Some(seed) => RandomContext::with_seed(seed),
        None => match &config.randomness {
            Some(settings) => RandomContext::from_settings(settings),
            None => RandomContext::new(),
        },
    };

    let sample = config.sample.unwrap_or_default();
    let count = cli.count.unwrap_or(sample.count);
    let pretty = cli.pretty || sample.pretty;
    let effective = SampleSettings { count, pretty };

    println!("Emitting {} record(s) with seed {}", effective.count, ctx.seed());

    let mut records = sample_randomizer();
    let start_time = Instant::now();
    for _ in 0..effective.count {
        let record = records.one(&mut ctx)?;
        let line = if effective.pretty {
            serde_json::to_string_pretty(&record)?
        } else {
            serde_json::to_string(&record)?
        };
        println!("{line}");
    }

    let elapsed = start_time.elapsed();
    println!(
        "Done: {} record(s) in {elapsed:.2?} (seed {})",
        effective.count,
        ctx.seed()
    );

    Ok(())
}
