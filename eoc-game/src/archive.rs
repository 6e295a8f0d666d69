//! Durable log of every choice made, and keyword search over it.
use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

/// One answered (or skipped) level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    #[serde(default)]
    pub username: String,
    pub leader: String,
    pub level_number: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub historical_choice: String,
    #[serde(default)]
    pub summary: String,
    /// Empty when the level was skipped.
    #[serde(default)]
    pub player_choice: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl ArchiveEntry {
    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.player_choice.is_empty()
    }

    fn key(&self) -> (&str, &str, u32) {
        (&self.username, &self.leader, self.level_number)
    }

    fn matches(&self, needle: &str) -> bool {
        [
            &self.description,
            &self.leader,
            &self.summary,
            &self.historical_choice,
            &self.player_choice,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// How repeat plays of the same level are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchivePolicy {
    /// One entry per (username, leader, level); the first one wins.
    #[default]
    Unique,
    /// Every play is appended.
    Append,
}

/// Case-insensitive substring search in stored order. A blank keyword matches everything.
#[must_use]
pub fn search<'a>(entries: &'a [ArchiveEntry], keyword: &str) -> Vec<&'a ArchiveEntry> {
    let needle = keyword.trim().to_lowercase();
    if needle.is_empty() {
        return entries.iter().collect();
    }
    entries.iter().filter(|entry| entry.matches(&needle)).collect()
}

fn player_key(username: &str) -> String {
    username.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
    policy: ArchivePolicy,
}

impl Archive {
    #[must_use]
    pub fn new(policy: ArchivePolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
        }
    }

    /// Build an archive from stored entries.
    ///
    /// Usernames are trimmed and lowercased. Under [`ArchivePolicy::Unique`]
    /// any duplicates already on disk are collapsed to their first occurrence.
    #[must_use]
    pub fn from_entries(entries: Vec<ArchiveEntry>, policy: ArchivePolicy) -> Self {
        let mut archive = Self::new(policy);
        for entry in entries {
            archive.record(entry);
        }
        archive
    }

    /// Parse the archive document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not an array of entries.
    pub fn from_json(json: &str, policy: ArchivePolicy) -> Result<Self, serde_json::Error> {
        let entries: Vec<ArchiveEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(entries, policy))
    }

    /// Serialize the archive document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }

    #[must_use]
    pub const fn policy(&self) -> ArchivePolicy {
        self.policy
    }

    /// Store an entry under its normalized username. Returns `false` when
    /// the policy rejected it as a repeat.
    pub fn record(&mut self, mut entry: ArchiveEntry) -> bool {
        entry.username = player_key(&entry.username);
        if self.policy == ArchivePolicy::Unique
            && self.entries.iter().any(|existing| existing.key() == entry.key())
        {
            log::debug!(
                "archive already holds {} / {} level {}",
                entry.username,
                entry.leader,
                entry.level_number
            );
            return false;
        }
        self.entries.push(entry);
        true
    }

    #[must_use]
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn search(&self, keyword: &str) -> Vec<&ArchiveEntry> {
        search(&self.entries, keyword)
    }

    #[must_use]
    pub fn for_player(&self, username: &str) -> Vec<&ArchiveEntry> {
        let username = player_key(username);
        self.entries
            .iter()
            .filter(|entry| entry.username == username)
            .collect()
    }

    /// Keyword search scoped to one player's entries.
    #[must_use]
    pub fn search_player(&self, username: &str, keyword: &str) -> Vec<&ArchiveEntry> {
        let needle = keyword.trim().to_lowercase();
        self.for_player(username)
            .into_iter()
            .filter(|entry| needle.is_empty() || entry.matches(&needle))
            .collect()
    }

    /// Sorted, de-duplicated leader names the player has entries for.
    #[must_use]
    pub fn leaders_played(&self, username: &str) -> BTreeSet<String> {
        let username = player_key(username);
        self.entries
            .iter()
            .filter(|entry| entry.username == username)
            .map(|entry| entry.leader.clone())
            .collect()
    }

    /// Usernames with at least one entry, in first-seen order.
    #[must_use]
    pub fn players(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|entry| entry.username.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }
}
