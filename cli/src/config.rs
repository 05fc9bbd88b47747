use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use weave::RedefinePolicy;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = "weave.toml";

const DEFAULT_OUT_DIR: &str = "out";

/// What a repeated `<<name>>=` does. Mirrors [`RedefinePolicy`] for clap and serde.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Redefine {
    /// The later definition replaces the earlier content
    Replace,
    /// The later definition is appended to the earlier content
    Accumulate,
}

impl From<Redefine> for RedefinePolicy {
    fn from(value: Redefine) -> Self {
        match value {
            Redefine::Replace => RedefinePolicy::Replace,
            Redefine::Accumulate => RedefinePolicy::Accumulate,
        }
    }
}

/// Contents of `weave.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeaveConfig {
    /// Directory that output files are written under.
    #[serde(default)]
    pub out_dir: Option<PathBuf>,

    /// Cap on expansion passes.
    #[serde(default)]
    pub max_passes: Option<usize>,

    #[serde(default)]
    pub redefine: Option<Redefine>,
}

impl WeaveConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid weave config")
    }

    /// Load `explicit` if given (it must exist), else `weave.toml` in the
    /// working directory if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.is_file() {
                    log::debug!("no {} found, using defaults", CONFIG_FILE);
                    return Ok(WeaveConfig::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read config '{}'", path.display()))?;
        log::debug!("loaded config from {}", path.display());
        Self::from_toml(&text).with_context(|| format!("in '{}'", path.display()))
    }
}

/// Settings after applying command-line overrides to the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub out_dir: PathBuf,
    pub max_passes: Option<usize>,
    pub redefine: RedefinePolicy,
}

impl Settings {
    pub fn resolve(
        config: WeaveConfig,
        out_dir: Option<PathBuf>,
        max_passes: Option<usize>,
        redefine: Option<Redefine>,
    ) -> Self {
        Settings {
            out_dir: out_dir
                .or(config.out_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
            max_passes: max_passes.or(config.max_passes),
            redefine: redefine
                .or(config.redefine)
                .map(RedefinePolicy::from)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let settings = Settings::resolve(WeaveConfig::from_toml("").unwrap(), None, None, None);
        assert_eq!(settings.out_dir, PathBuf::from("out"));
        assert_eq!(settings.max_passes, None);
        assert_eq!(settings.redefine, RedefinePolicy::Replace);
    }

    #[test]
    fn config_values_are_read() {
        let config = WeaveConfig::from_toml(
            "out_dir = \"build\"\nmax_passes = 12\nredefine = \"accumulate\"\n",
        )
        .unwrap();
        let settings = Settings::resolve(config, None, None, None);
        assert_eq!(settings.out_dir, PathBuf::from("build"));
        assert_eq!(settings.max_passes, Some(12));
        assert_eq!(settings.redefine, RedefinePolicy::Accumulate);
    }

    #[test]
    fn flags_override_config() {
        let config = WeaveConfig::from_toml("out_dir = \"build\"\nredefine = \"accumulate\"").unwrap();
        let settings = Settings::resolve(
            config,
            Some(PathBuf::from("gen")),
            Some(4),
            Some(Redefine::Replace),
        );
        assert_eq!(settings.out_dir, PathBuf::from("gen"));
        assert_eq!(settings.max_passes, Some(4));
        assert_eq!(settings.redefine, RedefinePolicy::Replace);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(WeaveConfig::from_toml("outdir = \"x\"").is_err());
        assert!(WeaveConfig::from_toml("redefine = \"merge\"").is_err());
    }
}
