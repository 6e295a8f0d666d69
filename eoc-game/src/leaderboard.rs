//! Leaderboards and derived player statistics.
use serde::{Deserialize, Serialize};

use crate::archive::Archive;
use crate::mode::GameMode;
use crate::records::{BestRecord, PlayerRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub rank: usize,
    pub username: String,
    pub best_score: u32,
    pub best_time_millis: u64,
}

/// Rank the players with a non-zero best for `mode`.
///
/// Ordered by score descending, then time ascending, then username.
#[must_use]
pub fn leaderboard(records: &[PlayerRecord], mode: GameMode) -> Vec<LeaderboardRow> {
    let mut ranked: Vec<(&str, BestRecord)> = records
        .iter()
        .map(|record| (record.username.as_str(), record.best(mode)))
        .filter(|(_, best)| best.score > 0)
        .collect();
    ranked.sort_by(|(a_name, a), (b_name, b)| {
        b.score
            .cmp(&a.score)
            .then(a.time_millis.cmp(&b.time_millis))
            .then_with(|| a_name.cmp(b_name))
    });
    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (username, best))| LeaderboardRow {
            rank: i + 1,
            username: username.to_string(),
            best_score: best.score,
            best_time_millis: best.time_millis,
        })
        .collect()
}

/// The three per-mode views side by side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Leaderboards {
    pub single: Vec<LeaderboardRow>,
    pub sequential: Vec<LeaderboardRow>,
    pub randomized: Vec<LeaderboardRow>,
}

impl Leaderboards {
    #[must_use]
    pub fn build(records: &[PlayerRecord]) -> Self {
        Self {
            single: leaderboard(records, GameMode::Single),
            sequential: leaderboard(records, GameMode::Sequential),
            randomized: leaderboard(records, GameMode::Randomized),
        }
    }

    #[must_use]
    pub fn rows(&self, mode: GameMode) -> &[LeaderboardRow] {
        match mode {
            GameMode::Single => &self.single,
            GameMode::Sequential => &self.sequential,
            GameMode::Randomized => &self.randomized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub total_levels_played: u64,
    /// Percent of levels answered with the historical choice.
    pub accuracy: f64,
    /// Seconds.
    pub average_time_per_level: f64,
}

#[must_use]
pub fn player_stats(record: &PlayerRecord) -> PlayerStats {
    PlayerStats {
        total_levels_played: record.total_levels_played,
        accuracy: record.accuracy(),
        average_time_per_level: record.average_time_per_level(),
    }
}

/// One row of the statistics file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub username: String,
    pub total_levels_played: u64,
    pub total_correct_choices: u64,
    pub total_time_millis: u64,
    pub accuracy: f64,
    pub average_time_per_level: f64,
    pub best_score_single: u32,
    pub best_time_single_millis: u64,
    pub best_score_sequential: u32,
    pub best_time_sequential_millis: u64,
    pub best_score_random: u32,
    pub best_time_random_millis: u64,
    pub leaders_played: Vec<String>,
}

#[must_use]
pub fn stats_snapshot(record: &PlayerRecord, archive: &Archive) -> StatsSnapshot {
    StatsSnapshot {
        username: record.username.clone(),
        total_levels_played: record.total_levels_played,
        total_correct_choices: record.total_correct_choices,
        total_time_millis: record.total_time_millis,
        accuracy: record.accuracy(),
        average_time_per_level: record.average_time_per_level(),
        best_score_single: record.best_score_single,
        best_time_single_millis: record.best_time_single_millis,
        best_score_sequential: record.best_score_sequential,
        best_time_sequential_millis: record.best_time_sequential_millis,
        best_score_random: record.best_score_random,
        best_time_random_millis: record.best_time_random_millis,
        leaders_played: archive
            .leaders_played(&record.username)
            .into_iter()
            .collect(),
    }
}
