use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use eoc_game::{ArchivePolicy, EngineSettings, Locale};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATA_DIR: &str = "Echoes_of_Command";

/// Front-end configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub content_dir: Option<PathBuf>,
    pub locale: Locale,
    pub archive_policy: ArchivePolicy,
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            content_dir: None,
            locale: Locale::default(),
            archive_policy: ArchivePolicy::default(),
            seed: None,
        }
    }
}

/// Command-line values that take precedence over the settings file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub content_dir: Option<PathBuf>,
    pub locale: Option<Locale>,
    pub archive_policy: Option<ArchivePolicy>,
    pub seed: Option<u64>,
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid settings document")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in {}", path.display()))
    }

    /// Read `path` when given, then apply `overrides`.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        settings.apply(overrides);
        Ok(settings)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(data_dir) = overrides.data_dir {
            self.data_dir = data_dir;
        }
        if overrides.content_dir.is_some() {
            self.content_dir = overrides.content_dir;
        }
        if let Some(locale) = overrides.locale {
            self.locale = locale;
        }
        if let Some(policy) = overrides.archive_policy {
            self.archive_policy = policy;
        }
        if overrides.seed.is_some() {
            self.seed = overrides.seed;
        }
    }

    #[must_use]
    pub const fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            locale: self.locale,
            archive_policy: self.archive_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.data_dir, PathBuf::from("Echoes_of_Command"));
        assert_eq!(settings.archive_policy, ArchivePolicy::Unique);
    }

    #[test]
    fn file_values_are_read() {
        let settings = Settings::from_json(
            r#"{ "locale": "arabic", "archive_policy": "append", "seed": 99, "content_dir": "content" }"#,
        )
        .unwrap();
        assert_eq!(settings.locale, Locale::Arabic);
        assert_eq!(settings.archive_policy, ArchivePolicy::Append);
        assert_eq!(settings.seed, Some(99));
        assert_eq!(settings.content_dir, Some(PathBuf::from("content")));
    }

    #[test]
    fn overrides_win_over_file() {
        let mut settings = Settings::from_json(r#"{ "seed": 1, "data_dir": "saves" }"#).unwrap();
        settings.apply(Overrides {
            seed: Some(2),
            locale: Some(Locale::Arabic),
            ..Overrides::default()
        });
        assert_eq!(settings.seed, Some(2));
        assert_eq!(settings.data_dir, PathBuf::from("saves"));
        assert_eq!(settings.engine_settings().locale, Locale::Arabic);
    }

    #[test]
    fn unknown_locale_is_rejected() {
        assert!(Settings::from_json(r#"{ "locale": "klingon" }"#).is_err());
    }
}
