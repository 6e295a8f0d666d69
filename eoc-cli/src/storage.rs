//! File-system content loading and persistence.
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use eoc_game::{
    Archive, ArchivePolicy, ContentCatalog, ContentError, ContentLoader, GameStorage, Locale,
    PlayerRegistry, RecordError, RecordsFormat, StatsSnapshot,
};
use thiserror::Error;

pub const PLAYERS_FILE: &str = "players.json";
pub const ARCHIVE_FILE: &str = "archive.json";
pub const STATS_FILE: &str = "stats.json";

const EMBEDDED_HISTORY: &str = include_str!("../assets/data/history.json");
const EMBEDDED_HISTORY_AR: &str = include_str!("../assets/data/history-ar.json");

#[derive(Debug, Error)]
pub enum ContentLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid content in {origin}: {source}")]
    Invalid {
        origin: String,
        #[source]
        source: ContentError,
    },
}

/// Loads leader catalogs from `content_dir` when set, else from the copies built into the binary.
#[derive(Debug, Clone, Default)]
pub struct FsContentLoader {
    content_dir: Option<PathBuf>,
}

impl FsContentLoader {
    #[must_use]
    pub const fn new(content_dir: Option<PathBuf>) -> Self {
        Self { content_dir }
    }

    const fn embedded(locale: Locale) -> &'static str {
        match locale {
            Locale::English => EMBEDDED_HISTORY,
            Locale::Arabic => EMBEDDED_HISTORY_AR,
        }
    }
}

impl ContentLoader for FsContentLoader {
    type Error = ContentLoadError;

    fn load_catalog(&self, locale: Locale) -> Result<ContentCatalog, Self::Error> {
        let Some(dir) = &self.content_dir else {
            return ContentCatalog::from_json(Self::embedded(locale)).map_err(|source| {
                ContentLoadError::Invalid {
                    origin: format!("built-in {}", locale.history_file()),
                    source,
                }
            });
        };
        let path = dir.join(locale.history_file());
        let json = fs::read_to_string(&path).map_err(|source| ContentLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let catalog = ContentCatalog::from_json(&json).map_err(|source| ContentLoadError::Invalid {
            origin: path.display().to_string(),
            source,
        })?;
        log::debug!(
            "loaded {} leader(s) from {}",
            catalog.leaders().len(),
            path.display()
        );
        Ok(catalog)
    }
}

#[derive(Debug, Error)]
pub enum FsStorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse player records {path}: {source}")]
    Records {
        path: PathBuf,
        #[source]
        source: RecordError,
    },
}

/// JSON files under a data directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    data_dir: PathBuf,
}

impl FsStorage {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    #[must_use]
    pub fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    /// Shape of the stored players file, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn records_format(&self) -> Result<Option<RecordsFormat>, FsStorageError> {
        let path = self.path(PLAYERS_FILE);
        let Some(json) = read_optional(&path)? else {
            return Ok(None);
        };
        PlayerRegistry::parse(&json)
            .map(|(_, format)| Some(format))
            .map_err(|source| FsStorageError::Records { path, source })
    }

    fn write_json<T: serde::Serialize + ?Sized>(
        &self,
        file: &str,
        value: &T,
    ) -> Result<(), FsStorageError> {
        let path = self.path(file);
        let json = serde_json::to_string_pretty(value).map_err(|source| FsStorageError::Encode {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, json.as_bytes())?;
        log::debug!("saved {}", path.display());
        Ok(())
    }
}

impl GameStorage for FsStorage {
    type Error = FsStorageError;

    fn load_records(&self) -> Result<Option<PlayerRegistry>, Self::Error> {
        let path = self.path(PLAYERS_FILE);
        let Some(json) = read_optional(&path)? else {
            return Ok(None);
        };
        PlayerRegistry::from_json(&json)
            .map(Some)
            .map_err(|source| FsStorageError::Records { path, source })
    }

    fn save_records(&self, registry: &PlayerRegistry) -> Result<(), Self::Error> {
        self.write_json(PLAYERS_FILE, registry.records())
    }

    fn load_archive(&self, policy: ArchivePolicy) -> Result<Option<Archive>, Self::Error> {
        let path = self.path(ARCHIVE_FILE);
        let Some(json) = read_optional(&path)? else {
            return Ok(None);
        };
        Archive::from_json(&json, policy)
            .map(Some)
            .map_err(|source| FsStorageError::Archive { path, source })
    }

    fn save_archive(&self, archive: &Archive) -> Result<(), Self::Error> {
        self.write_json(ARCHIVE_FILE, archive.entries())
    }

    fn save_stats(&self, stats: &[StatsSnapshot]) -> Result<(), Self::Error> {
        self.write_json(STATS_FILE, stats)
    }
}

/// Missing or blank files read as `None`.
fn read_optional(path: &Path) -> Result<Option<String>, FsStorageError> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(None),
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(FsStorageError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write to a sibling temp file, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), FsStorageError> {
    let io_err = |source| FsStorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut file = File::create(&tmp_path).map_err(io_err)?;
    file.write_all(bytes).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);
    fs::rename(&tmp_path, path).map_err(io_err)
}
