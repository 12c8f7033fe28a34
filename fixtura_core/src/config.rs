use serde::Deserialize;
use std::path::PathBuf;

/// Seed pinning for the randomization layer. An explicit seed passed in code
/// always overrides this; this in turn overrides the environment and clock.
#[derive(Deserialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct RandomnessSettings {
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Settings for the sample-emitting CLI.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct SampleSettings {
    #[serde(default = "default_count")]
    pub count: u64,
    #[serde(default)]
    pub pretty: bool,
}

pub fn default_count() -> u64 {
    10
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self {
            count: default_count(),
            pretty: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct FixturaConfig {
    #[serde(default)]
    pub randomness: Option<RandomnessSettings>,
    #[serde(default)]
    pub sample: Option<SampleSettings>,
}

impl FixturaConfig {
    pub fn load_from_file(path: &PathBuf) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: FixturaConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML in {:?}: {}", path, e))?;

        Ok(config)
    }
}

impl Default for FixturaConfig {
    fn default() -> Self {
        Self {
            randomness: Some(RandomnessSettings::default()),
            sample: Some(SampleSettings::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("fixtura.toml");
        let mut file = std::fs::File::create(&path).expect("create config file");
        file.write_all(content.as_bytes()).expect("write config file");
        (dir, path)
    }

    #[test]
    fn loads_pinned_seed_and_sample_settings() {
        let (_dir, path) = write_config(
            r#"
[randomness]
seed = 4242424242

[sample]
count = 3
pretty = true
"#,
        );

        let config = FixturaConfig::load_from_file(&path).expect("config should parse");
        assert_eq!(config.randomness.unwrap().seed, Some(4242424242));
        let sample = config.sample.unwrap();
        assert_eq!(sample.count, 3);
        assert!(sample.pretty);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let (_dir, path) = write_config("");

        let config = FixturaConfig::load_from_file(&path).expect("empty config is valid");
        assert!(config.randomness.is_none());
        assert!(config.sample.is_none());

        let defaults = FixturaConfig::default();
        assert_eq!(defaults.sample.unwrap().count, default_count());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let (_dir, path) = write_config(
            r#"
[randomness]
sede = 1
"#,
        );

        let err = FixturaConfig::load_from_file(&path).unwrap_err();
        assert!(
            err.to_string().contains("Failed to parse TOML"),
            "misspelled keys should fail parsing: {err}"
        );
    }

    #[test]
    fn missing_file_is_a_readable_error() {
        let path = PathBuf::from("/nonexistent/fixtura.toml");
        let err = FixturaConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
