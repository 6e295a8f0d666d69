//! Per-player best scores, login history and running totals.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::mode::GameMode;
use crate::numbers::{average_seconds, percentage};
use crate::session::SessionResult;

/// Best (score, time) pair for one mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BestRecord {
    pub score: u32,
    pub time_millis: u64,
}

impl BestRecord {
    #[must_use]
    pub const fn new(score: u32, time_millis: u64) -> Self {
        Self { score, time_millis }
    }

    /// Higher score wins; an equal score needs a strictly faster time.
    #[must_use]
    pub const fn improves_on(&self, other: &Self) -> bool {
        self.score > other.score
            || (self.score == other.score && self.time_millis < other.time_millis)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerRecord {
    pub username: String,
    pub best_score_single: u32,
    pub best_time_single_millis: u64,
    pub best_score_sequential: u32,
    pub best_time_sequential_millis: u64,
    pub best_score_random: u32,
    pub best_time_random_millis: u64,
    /// Epoch milliseconds, oldest first.
    pub login_history: Vec<i64>,
    pub total_levels_played: u64,
    pub total_correct_choices: u64,
    pub total_time_millis: u64,
}

impl PlayerRecord {
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn best(&self, mode: GameMode) -> BestRecord {
        match mode {
            GameMode::Single => BestRecord::new(self.best_score_single, self.best_time_single_millis),
            GameMode::Sequential => {
                BestRecord::new(self.best_score_sequential, self.best_time_sequential_millis)
            }
            GameMode::Randomized => {
                BestRecord::new(self.best_score_random, self.best_time_random_millis)
            }
        }
    }

    pub const fn set_best(&mut self, mode: GameMode, best: BestRecord) {
        match mode {
            GameMode::Single => {
                self.best_score_single = best.score;
                self.best_time_single_millis = best.time_millis;
            }
            GameMode::Sequential => {
                self.best_score_sequential = best.score;
                self.best_time_sequential_millis = best.time_millis;
            }
            GameMode::Randomized => {
                self.best_score_random = best.score;
                self.best_time_random_millis = best.time_millis;
            }
        }
    }

    pub fn record_login(&mut self, timestamp_millis: i64) {
        self.login_history.push(timestamp_millis);
    }

    #[must_use]
    pub fn last_login(&self) -> Option<i64> {
        self.login_history.last().copied()
    }

    /// Fold a finished session into the record. Returns `true` when the
    /// session set a new best for `mode`.
    pub fn apply_session_result(&mut self, result: &SessionResult, mode: GameMode) -> bool {
        let candidate = BestRecord::new(result.score, result.elapsed_millis);
        let improved = candidate.improves_on(&self.best(mode));
        if improved {
            self.set_best(mode, candidate);
        }
        self.total_levels_played += u64::from(result.levels_played);
        self.total_correct_choices += u64::from(result.correct_count);
        self.total_time_millis += result.elapsed_millis;
        improved
    }

    /// Correct choices as a percentage of levels played.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        percentage(self.total_correct_choices, self.total_levels_played)
    }

    /// Mean seconds spent per level played.
    #[must_use]
    pub fn average_time_per_level(&self) -> f64 {
        average_seconds(self.total_time_millis, self.total_levels_played)
    }
}

/// Trim and lowercase a username into its identity key.
///
/// # Errors
///
/// Returns [`RecordError::EmptyUsername`] when nothing remains after trimming.
pub fn normalize_username(raw: &str) -> Result<String, RecordError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RecordError::EmptyUsername);
    }
    Ok(trimmed.to_lowercase())
}

/// Which on-disk shape a records document had.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordsFormat {
    /// Array of [`PlayerRecord`].
    Canonical,
    /// Object keyed by username, written by the old console build.
    LegacyMap,
    /// Array of records under the old console or GUI field names.
    LegacyList,
}

/// Field names only the legacy record shapes use.
const LEGACY_KEYS: [&str; 6] = [
    "bestSingleScore",
    "bestSequentialScore",
    "bestRandomizedScore",
    "bestTimeSingle",
    "bestTimeSequential",
    "bestTimeRandom",
];

fn has_legacy_keys(items: &[serde_json::Value]) -> bool {
    items.iter().any(|item| {
        item.as_object()
            .is_some_and(|fields| LEGACY_KEYS.iter().any(|key| fields.contains_key(*key)))
    })
}

/// `"MM:SS"` as milliseconds; `None` when the text is not in that form.
fn clock_to_millis(text: &str) -> Option<u64> {
    let (minutes, seconds) = text.trim().split_once(':')?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    minutes
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1_000)
}

/// Record shape of the legacy documents.
///
/// The console build wrote `bestSingleScore`/`bestSingleTimeMillis`; the GUI
/// build wrote `bestScoreSingle` with an `"MM:SS"` `bestTimeSingle`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacyRecord {
    username: String,
    #[serde(alias = "bestScoreSingle")]
    best_single_score: u32,
    #[serde(alias = "bestTimeSingleMillis")]
    best_single_time_millis: u64,
    best_time_single: Option<String>,
    #[serde(alias = "bestScoreSequential")]
    best_sequential_score: u32,
    #[serde(alias = "bestTimeSequentialMillis")]
    best_sequential_time_millis: u64,
    best_time_sequential: Option<String>,
    #[serde(alias = "bestScoreRandom")]
    best_randomized_score: u32,
    #[serde(alias = "bestTimeRandomMillis")]
    best_randomized_time_millis: u64,
    best_time_random: Option<String>,
    login_history: Vec<i64>,
    total_levels_played: u64,
    total_correct_choices: u64,
    total_time_millis: u64,
}

fn legacy_time(millis: u64, clock: Option<&str>) -> u64 {
    if millis > 0 {
        return millis;
    }
    clock.and_then(clock_to_millis).unwrap_or(0)
}

impl LegacyRecord {
    fn into_record(self, username: String) -> PlayerRecord {
        PlayerRecord {
            username,
            best_score_single: self.best_single_score,
            best_time_single_millis: legacy_time(
                self.best_single_time_millis,
                self.best_time_single.as_deref(),
            ),
            best_score_sequential: self.best_sequential_score,
            best_time_sequential_millis: legacy_time(
                self.best_sequential_time_millis,
                self.best_time_sequential.as_deref(),
            ),
            best_score_random: self.best_randomized_score,
            best_time_random_millis: legacy_time(
                self.best_randomized_time_millis,
                self.best_time_random.as_deref(),
            ),
            login_history: self.login_history,
            total_levels_played: self.total_levels_played,
            total_correct_choices: self.total_correct_choices,
            total_time_millis: self.total_time_millis,
        }
    }
}

/// The player record store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerRegistry {
    records: Vec<PlayerRecord>,
}

impl PlayerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from records, keeping the first record per normalized username.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = PlayerRecord>) -> Self {
        let mut registry = Self::new();
        for mut record in records {
            let Ok(username) = normalize_username(&record.username) else {
                log::warn!("dropping player record with an empty username");
                continue;
            };
            if registry.get(&username).is_some() {
                log::warn!("dropping duplicate player record for '{username}'");
                continue;
            }
            record.username = username;
            registry.records.push(record);
        }
        registry
    }

    /// Parse a records document in the canonical shape or one of the legacy shapes.
    ///
    /// # Errors
    ///
    /// Returns an error when the document is not valid JSON or is neither shape.
    pub fn parse(json: &str) -> Result<(Self, RecordsFormat), RecordError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let legacy_list =
            matches!(&value, serde_json::Value::Array(items) if has_legacy_keys(items));
        match value {
            serde_json::Value::Array(_) if legacy_list => {
                let legacy: Vec<LegacyRecord> = serde_json::from_value(value)?;
                let registry = Self::from_records(legacy.into_iter().map(|mut record| {
                    let username = std::mem::take(&mut record.username);
                    record.into_record(username)
                }));
                log::info!(
                    "imported {} player record(s) from a legacy record list",
                    registry.len()
                );
                Ok((registry, RecordsFormat::LegacyList))
            }
            serde_json::Value::Array(_) => {
                let records: Vec<PlayerRecord> = serde_json::from_value(value)?;
                Ok((Self::from_records(records), RecordsFormat::Canonical))
            }
            serde_json::Value::Object(_) => {
                let legacy: BTreeMap<String, LegacyRecord> = serde_json::from_value(value)?;
                let registry = Self::from_records(
                    legacy
                        .into_iter()
                        .map(|(username, record)| record.into_record(username)),
                );
                log::info!(
                    "imported {} player record(s) from the legacy username map",
                    registry.len()
                );
                Ok((registry, RecordsFormat::LegacyMap))
            }
            _ => Err(RecordError::UnrecognizedShape),
        }
    }

    /// Parse a records document, accepting the legacy shape.
    ///
    /// # Errors
    ///
    /// See [`PlayerRegistry::parse`].
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        Self::parse(json).map(|(registry, _)| registry)
    }

    /// Serialize in the canonical list shape.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.records)
    }

    /// Return the record for `username`, creating a zero-valued one on first sight.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyUsername`] for a blank username.
    pub fn login(&mut self, username: &str) -> Result<&mut PlayerRecord, RecordError> {
        let username = normalize_username(username)?;
        let position = match self.position(&username) {
            Some(position) => position,
            None => {
                log::info!("creating player record for '{username}'");
                self.records.push(PlayerRecord::new(username));
                self.records.len() - 1
            }
        };
        Ok(&mut self.records[position])
    }

    #[must_use]
    pub fn get(&self, username: &str) -> Option<&PlayerRecord> {
        self.records.iter().find(|record| record.username == username)
    }

    pub fn get_mut(&mut self, username: &str) -> Option<&mut PlayerRecord> {
        self.records
            .iter_mut()
            .find(|record| record.username == username)
    }

    fn position(&self, username: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.username == username)
    }

    #[must_use]
    pub fn records(&self) -> &[PlayerRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(mode: GameMode, score: u32, levels: u32, millis: u64) -> SessionResult {
        SessionResult {
            username: "tester".into(),
            mode,
            score,
            total_levels: levels,
            elapsed_millis: millis,
            correct_count: score,
            levels_played: levels,
            archive_entries: Vec::new(),
        }
    }

    #[test]
    fn login_normalizes_and_creates_once() {
        let mut registry = PlayerRegistry::new();
        registry.login("  Alice ").unwrap();
        registry.login("ALICE").unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.records()[0].username, "alice");
        assert!(registry.records()[0].login_history.is_empty());
        assert!(matches!(
            registry.login("   "),
            Err(RecordError::EmptyUsername)
        ));
    }

    #[test]
    fn login_history_appends_without_cap() {
        let mut record = PlayerRecord::new("alice");
        assert_eq!(record.last_login(), None);
        for ts in 0..50 {
            record.record_login(ts);
        }
        assert_eq!(record.login_history.len(), 50);
        assert_eq!(record.last_login(), Some(49));
    }

    #[test]
    fn best_prefers_score_then_time() {
        let mut record = PlayerRecord::new("bob");
        record.set_best(GameMode::Sequential, BestRecord::new(3, 5_000));
        assert!(record.apply_session_result(&result(GameMode::Sequential, 3, 3, 4_000), GameMode::Sequential));
        assert_eq!(record.best(GameMode::Sequential), BestRecord::new(3, 4_000));

        assert!(!record.apply_session_result(&result(GameMode::Sequential, 3, 3, 4_000), GameMode::Sequential));
        assert!(!record.apply_session_result(&result(GameMode::Sequential, 2, 3, 100), GameMode::Sequential));
        assert_eq!(record.best(GameMode::Sequential), BestRecord::new(3, 4_000));
        assert_eq!(record.total_levels_played, 9);
    }

    #[test]
    fn worse_result_still_updates_totals() {
        let mut record = PlayerRecord::new("carol");
        record.set_best(GameMode::Randomized, BestRecord::new(2, 8_000));
        let improved = record.apply_session_result(&result(GameMode::Randomized, 1, 3, 6_000), GameMode::Randomized);
        assert!(!improved);
        assert_eq!(record.best(GameMode::Randomized), BestRecord::new(2, 8_000));
        assert_eq!(record.total_levels_played, 3);
        assert_eq!(record.total_correct_choices, 1);
        assert_eq!(record.total_time_millis, 6_000);
    }

    #[test]
    fn derived_stats_are_zero_without_play() {
        let record = PlayerRecord::new("dave");
        assert!(record.accuracy().abs() < f64::EPSILON);
        assert!(record.average_time_per_level().abs() < f64::EPSILON);

        let mut played = PlayerRecord::new("erin");
        played.apply_session_result(&result(GameMode::Single, 3, 4, 8_000), GameMode::Single);
        assert!((played.accuracy() - 75.0).abs() < f64::EPSILON);
        assert!((played.average_time_per_level() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn canonical_json_uses_record_field_names() {
        let mut registry = PlayerRegistry::new();
        let record = registry.login("alice").unwrap();
        record.set_best(GameMode::Randomized, BestRecord::new(4, 12_000));
        record.record_login(1_700_000_000_000);
        let json = registry.to_json().unwrap();
        for field in [
            "\"username\"",
            "\"bestScoreSingle\"",
            "\"bestTimeSequentialMillis\"",
            "\"bestScoreRandom\": 4",
            "\"bestTimeRandomMillis\": 12000",
            "\"loginHistory\"",
            "\"totalTimeMillis\"",
        ] {
            assert!(json.contains(field), "missing {field} in {json}");
        }
        let (parsed, format) = PlayerRegistry::parse(&json).unwrap();
        assert_eq!(format, RecordsFormat::Canonical);
        assert_eq!(parsed, registry);
    }

    #[test]
    fn legacy_map_imports_into_canonical_records() {
        let legacy = r#"{
            "Zed": {
                "username": "Zed",
                "password": "hunter2",
                "bestSingleScore": 2,
                "bestSingleTimeMillis": 9000,
                "bestRandomizedScore": 5,
                "bestRandomizedTimeMillis": 30000,
                "loginHistory": [1, 2],
                "totalLevelsPlayed": 7,
                "totalCorrectChoices": 5,
                "totalTimeMillis": 39000
            },
            "amy": {}
        }"#;
        let (registry, format) = PlayerRegistry::parse(legacy).unwrap();
        assert_eq!(format, RecordsFormat::LegacyMap);
        assert_eq!(registry.len(), 2);
        let zed = registry.get("zed").unwrap();
        assert_eq!(zed.best(GameMode::Single), BestRecord::new(2, 9_000));
        assert_eq!(zed.best(GameMode::Randomized), BestRecord::new(5, 30_000));
        assert_eq!(zed.login_history, vec![1, 2]);
        assert!(registry.get("amy").is_some());

        let resaved = registry.to_json().unwrap();
        assert!(resaved.trim_start().starts_with('['));
        assert!(!resaved.contains("password"));
    }

    #[test]
    fn legacy_console_list_keeps_best_scores() {
        let console = r#"[
            {
                "username": "Alice",
                "password": "pw",
                "bestSingleScore": 2,
                "bestSingleTimeMillis": 4000,
                "bestSequentialScore": 3,
                "bestSequentialTimeMillis": 9000,
                "bestRandomizedScore": 1,
                "bestRandomizedTimeMillis": 2500,
                "loginHistory": [10],
                "totalLevelsPlayed": 6,
                "totalCorrectChoices": 6,
                "totalTimeMillis": 15500
            }
        ]"#;
        let (registry, format) = PlayerRegistry::parse(console).unwrap();
        assert_eq!(format, RecordsFormat::LegacyList);
        let alice = registry.get("alice").unwrap();
        assert_eq!(alice.best(GameMode::Single), BestRecord::new(2, 4_000));
        assert_eq!(alice.best(GameMode::Sequential), BestRecord::new(3, 9_000));
        assert_eq!(alice.best(GameMode::Randomized), BestRecord::new(1, 2_500));
        assert_eq!(alice.total_levels_played, 6);

        let (reparsed, format) = PlayerRegistry::parse(&registry.to_json().unwrap()).unwrap();
        assert_eq!(format, RecordsFormat::Canonical);
        assert_eq!(reparsed, registry);
    }

    #[test]
    fn legacy_gui_list_converts_clock_times() {
        let gui = r#"[
            { "username": "bob", "bestScoreSingle": 2, "bestTimeSingle": "01:05",
              "bestScoreRandom": 4, "bestTimeRandom": "00:00", "totalLevelsPlayed": 3 },
            { "username": "cy", "bestScoreSequential": 1, "bestTimeSequential": "bogus" }
        ]"#;
        let (registry, format) = PlayerRegistry::parse(gui).unwrap();
        assert_eq!(format, RecordsFormat::LegacyList);
        let bob = registry.get("bob").unwrap();
        assert_eq!(bob.best(GameMode::Single), BestRecord::new(2, 65_000));
        assert_eq!(bob.best(GameMode::Randomized), BestRecord::new(4, 0));
        assert_eq!(bob.total_levels_played, 3);
        let cy = registry.get("cy").unwrap();
        assert_eq!(cy.best(GameMode::Sequential), BestRecord::new(1, 0));
    }

    #[test]
    fn scalar_documents_are_rejected() {
        assert!(matches!(
            PlayerRegistry::parse("42"),
            Err(RecordError::UnrecognizedShape)
        ));
        assert!(matches!(
            PlayerRegistry::parse("[{"),
            Err(RecordError::Json(_))
        ));
    }
}
