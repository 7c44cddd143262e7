use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    ordering::{PersistPolicy, StepPolicy},
};

pub const DEFAULT_SETTINGS_FILE: &str = "navigator.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryRanks(BTreeMap<String, i64>);

impl Default for CategoryRanks {
    fn default() -> Self {
        Self::from_pairs([
            ("admin", 1),
            ("office", 2),
            ("optom", 3),
            ("medical", 4),
            ("surgeon", 4),
            ("misc", 4),
            ("tech", 5),
        ])
    }
}

impl CategoryRanks {
    pub fn from_pairs<K: AsRef<str>>(pairs: impl IntoIterator<Item = (K, i64)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(name, rank)| (name.as_ref().to_lowercase(), rank))
                .collect(),
        )
    }

    pub fn rank(&self, category: &str) -> Option<i64> {
        self.0.get(&category.to_lowercase()).copied()
    }

    fn normalized(self) -> Self {
        Self::from_pairs(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigatorSettings {
    pub domain: String,
    pub step_policy: StepPolicy,
    pub persist_policy: PersistPolicy,
    pub discard_stale_fetches: bool,
    pub category_ranks: CategoryRanks,
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            domain: "staff".into(),
            step_policy: StepPolicy::default(),
            persist_policy: PersistPolicy::default(),
            discard_stale_fetches: true,
            category_ranks: CategoryRanks::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    domain: Option<String>,
    step_policy: Option<StepPolicy>,
    persist_policy: Option<PersistPolicy>,
    discard_stale_fetches: Option<bool>,
    category_ranks: Option<CategoryRanks>,
}

/// Defaults, then `navigator.toml` in the working directory, then the environment.
pub fn load_settings() -> Result<NavigatorSettings, ConfigError> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> Result<NavigatorSettings, ConfigError> {
    let mut settings = NavigatorSettings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw, path)?,
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

pub(crate) fn apply_file(
    settings: &mut NavigatorSettings,
    raw: &str,
    path: &Path,
) -> Result<(), ConfigError> {
    let file_cfg: FileSettings = toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: PathBuf::from(path),
        source,
    })?;

    if let Some(v) = file_cfg.domain {
        settings.domain = v;
    }
    if let Some(v) = file_cfg.step_policy {
        settings.step_policy = v;
    }
    if let Some(v) = file_cfg.persist_policy {
        settings.persist_policy = v;
    }
    if let Some(v) = file_cfg.discard_stale_fetches {
        settings.discard_stale_fetches = v;
    }
    if let Some(v) = file_cfg.category_ranks {
        settings.category_ranks = v.normalized();
    }
    Ok(())
}

pub(crate) fn apply_env_overrides(
    settings: &mut NavigatorSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = lookup("NAVIGATOR_DOMAIN") {
        settings.domain = v;
    }
    if let Some(v) = lookup("NAVIGATOR_STEP_POLICY") {
        settings.step_policy = parse_env("NAVIGATOR_STEP_POLICY", &v)?;
    }
    if let Some(v) = lookup("NAVIGATOR_PERSIST_POLICY") {
        settings.persist_policy = parse_env("NAVIGATOR_PERSIST_POLICY", &v)?;
    }
    if let Some(v) = lookup("NAVIGATOR_DISCARD_STALE_FETCHES") {
        settings.discard_stale_fetches = parse_env("NAVIGATOR_DISCARD_STALE_FETCHES", &v)?;
    }
    Ok(())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
