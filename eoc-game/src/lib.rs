//! Echoes of Command Game Engine
//!
//! Platform-agnostic core logic for the Echoes of Command history trivia game.
//! This crate provides content validation, the play-session engine, player
//! records, the choice archive and leaderboards without terminal or
//! file-system dependencies.

pub mod archive;
pub mod data;
pub mod error;
pub mod leaderboard;
pub mod locale;
pub mod mode;
pub mod numbers;
pub mod records;
pub mod session;

// Re-export commonly used types
pub use archive::{Archive, ArchiveEntry, ArchivePolicy, search};
pub use data::{Choice, ContentCatalog, Leader, Level, PlayableLevel};
pub use error::{ContentError, EngineError, LevelProblem, RecordError, SessionError};
pub use leaderboard::{
    LeaderboardRow, Leaderboards, PlayerStats, StatsSnapshot, leaderboard, player_stats,
    stats_snapshot,
};
pub use locale::Locale;
pub use mode::{GameMode, Selection};
pub use records::{
    BestRecord, PlayerRecord, PlayerRegistry, RecordsFormat, normalize_username,
};
pub use session::{
    ChoiceSlot, Clock, LeaderProgress, LevelOutcome, LevelPrompt, ManualClock, PlaySession,
    PlayerInput, Presenter, SessionEnd, SessionResult, SystemClock, run_session,
};

use rand::Rng;

/// Trait for abstracting content loading
/// Platform-specific implementations should provide this
pub trait ContentLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the leader catalog for `locale`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or fails validation.
    fn load_catalog(&self, locale: Locale) -> Result<ContentCatalog, Self::Error>;
}

/// Trait for abstracting persistence of records, archive and statistics
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load player records; `Ok(None)` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if stored records exist but cannot be read.
    fn load_records(&self) -> Result<Option<PlayerRegistry>, Self::Error>;

    /// Replace the stored player records.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be written.
    fn save_records(&self, registry: &PlayerRegistry) -> Result<(), Self::Error>;

    /// Load the archive; `Ok(None)` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored archive exists but cannot be read.
    fn load_archive(&self, policy: ArchivePolicy) -> Result<Option<Archive>, Self::Error>;

    /// Replace the stored archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be written.
    fn save_archive(&self, archive: &Archive) -> Result<(), Self::Error>;

    /// Replace the stored statistics snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    fn save_stats(&self, stats: &[StatsSnapshot]) -> Result<(), Self::Error>;
}

/// Runtime options the engine needs from the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineSettings {
    pub locale: Locale,
    pub archive_policy: ArchivePolicy,
}

/// Main game engine owning the record store and archive
pub struct GameEngine<L, S>
where
    L: ContentLoader,
    S: GameStorage,
{
    loader: L,
    storage: S,
    settings: EngineSettings,
    registry: PlayerRegistry,
    archive: Archive,
}

impl<L, S> GameEngine<L, S>
where
    L: ContentLoader,
    S: GameStorage,
{
    /// Create an engine, loading stored records and archive.
    ///
    /// Unreadable stores are replaced by empty ones.
    pub fn new(loader: L, storage: S, settings: EngineSettings) -> Self {
        let registry = match storage.load_records() {
            Ok(registry) => registry.unwrap_or_default(),
            Err(err) => {
                log::warn!("player records unreadable, starting empty: {err}");
                PlayerRegistry::default()
            }
        };
        let archive = match storage.load_archive(settings.archive_policy) {
            Ok(archive) => archive.unwrap_or_else(|| Archive::new(settings.archive_policy)),
            Err(err) => {
                log::warn!("archive unreadable, starting empty: {err}");
                Archive::new(settings.archive_policy)
            }
        };
        Self {
            loader,
            storage,
            settings,
            registry,
            archive,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Look up or create the player. Does not record a login.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyUsername`] for a blank username.
    pub fn login(&mut self, username: &str) -> Result<PlayerRecord, RecordError> {
        self.registry.login(username).cloned()
    }

    /// Append a login timestamp and persist the records.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyUsername`] for a blank username.
    pub fn record_login(
        &mut self,
        username: &str,
        timestamp_millis: i64,
    ) -> Result<(), RecordError> {
        self.registry.login(username)?.record_login(timestamp_millis);
        self.persist_records();
        Ok(())
    }

    #[must_use]
    pub fn player(&self, username: &str) -> Option<&PlayerRecord> {
        self.registry.get(username)
    }

    #[must_use]
    pub const fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Load the catalog for the configured locale.
    ///
    /// # Errors
    ///
    /// Returns the loader's error if content cannot be loaded.
    pub fn catalog(&self) -> Result<ContentCatalog, L::Error> {
        self.loader.load_catalog(self.settings.locale)
    }

    /// Load content fresh and start a session for `selection`.
    ///
    /// # Errors
    ///
    /// Returns an error if content cannot be loaded, the selection names an
    /// unknown leader, the username is blank or the level set is unplayable.
    pub fn start_session<R, C>(
        &self,
        username: &str,
        selection: &Selection,
        rng: &mut R,
        clock: C,
    ) -> Result<PlaySession<C>, EngineError<L::Error>>
    where
        R: Rng + ?Sized,
        C: Clock,
    {
        let username = normalize_username(username)?;
        let catalog = self.catalog().map_err(EngineError::Loader)?;
        let levels = catalog.levels_for(selection)?;
        Ok(PlaySession::start(
            username,
            levels,
            selection.mode(),
            rng,
            clock,
        )?)
    }

    /// Archive one answered level and persist the archive immediately.
    ///
    /// Returns `false` when the archive policy ignored the entry.
    pub fn record_entry(&mut self, entry: ArchiveEntry) -> bool {
        record_and_persist(&mut self.archive, &self.storage, entry)
    }

    /// Fold a completed session into the player's record and persist records
    /// and statistics. Returns `true` on a new personal best.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyUsername`] if the result carries a blank username.
    pub fn complete_session(&mut self, result: &SessionResult) -> Result<bool, RecordError> {
        let record = self.registry.login(&result.username)?;
        let improved = record.apply_session_result(result, result.mode);
        log::info!(
            "{} finished {} play: {}/{} in {} ms (new best: {improved})",
            record.username,
            result.mode,
            result.score,
            result.total_levels,
            result.elapsed_millis
        );
        self.persist_records();
        self.persist_stats();
        Ok(improved)
    }

    /// Start, drive and persist one play session.
    ///
    /// Archive entries are saved as each level is answered. Player records
    /// change only when the session completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be started.
    pub fn play<R, C, P>(
        &mut self,
        username: &str,
        selection: &Selection,
        rng: &mut R,
        clock: C,
        presenter: &mut P,
    ) -> Result<SessionEnd, EngineError<L::Error>>
    where
        R: Rng + ?Sized,
        C: Clock,
        P: Presenter + ?Sized,
    {
        let session = self.start_session(username, selection, rng, clock)?;
        let archive = &mut self.archive;
        let storage = &self.storage;
        let end = run_session(session, presenter, |entry| {
            record_and_persist(archive, storage, entry.clone());
        })?;
        if let SessionEnd::Completed(result) = &end {
            self.complete_session(result)?;
        }
        Ok(end)
    }

    #[must_use]
    pub fn leaderboards(&self) -> Leaderboards {
        Leaderboards::build(self.registry.records())
    }

    #[must_use]
    pub fn player_stats(&self, username: &str) -> Option<PlayerStats> {
        self.registry.get(username).map(player_stats)
    }

    /// Keyword search, optionally scoped to one player.
    #[must_use]
    pub fn search_archive(&self, username: Option<&str>, keyword: &str) -> Vec<&ArchiveEntry> {
        match username {
            Some(username) => self.archive.search_player(username, keyword),
            None => self.archive.search(keyword),
        }
    }

    #[must_use]
    pub fn stats_snapshots(&self) -> Vec<StatsSnapshot> {
        self.registry
            .records()
            .iter()
            .map(|record| stats_snapshot(record, &self.archive))
            .collect()
    }

    /// Rewrite the stored records in the canonical shape.
    ///
    /// Legacy documents are imported at load, so this saves what was read.
    ///
    /// # Errors
    ///
    /// Returns the storage error; unlike routine saves, a failed migration is reported.
    pub fn migrate_records(&self) -> Result<usize, S::Error> {
        self.storage.save_records(&self.registry)?;
        self.storage.save_stats(&self.stats_snapshots())?;
        log::info!("migrated {} player record(s)", self.registry.len());
        Ok(self.registry.len())
    }

    fn persist_records(&self) {
        if let Err(err) = self.storage.save_records(&self.registry) {
            log::warn!("failed to save player records: {err}");
        }
    }

    fn persist_stats(&self) {
        if let Err(err) = self.storage.save_stats(&self.stats_snapshots()) {
            log::warn!("failed to save statistics: {err}");
        }
    }
}

fn record_and_persist<S: GameStorage>(
    archive: &mut Archive,
    storage: &S,
    entry: ArchiveEntry,
) -> bool {
    if !archive.record(entry) {
        return false;
    }
    if let Err(err) = storage.save_archive(archive) {
        log::warn!("failed to save archive: {err}");
    }
    true
}
