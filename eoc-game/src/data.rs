use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ContentError, LevelProblem};
use crate::mode::Selection;

/// One of the two options offered by a level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(rename = "isHistorical", default)]
    pub is_historical: bool,
}

impl Choice {
    #[must_use]
    pub fn new(text: impl Into<String>, is_historical: bool) -> Self {
        Self {
            text: text.into(),
            is_historical,
        }
    }
}

/// A scripted two-choice decision point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub number: u32,
    pub description: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub summary: String,
}

impl Level {
    /// The historically accurate option, if the level has one.
    #[must_use]
    pub fn historical_choice(&self) -> Option<&Choice> {
        self.choices.iter().find(|choice| choice.is_historical)
    }

    /// Check the two-choice, one-historical contract.
    ///
    /// # Errors
    ///
    /// Returns the first [`LevelProblem`] found.
    pub fn check_shape(&self) -> Result<(), LevelProblem> {
        if self.number == 0 {
            return Err(LevelProblem::ZeroNumber);
        }
        if self.choices.len() != 2 {
            return Err(LevelProblem::ChoiceCount(self.choices.len()));
        }
        let historical = self.choices.iter().filter(|c| c.is_historical).count();
        if historical != 1 {
            return Err(LevelProblem::HistoricalCount(historical));
        }
        Ok(())
    }
}

/// A selectable historical figure and the levels played as them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leader {
    pub name: String,
    #[serde(default)]
    pub backstory: String,
    #[serde(default)]
    pub levels: Vec<Level>,
}

/// A level ready to be played, tagged with the leader it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableLevel {
    pub leader: String,
    pub level: Level,
}

impl PlayableLevel {
    #[must_use]
    pub fn new(leader: impl Into<String>, level: Level) -> Self {
        Self {
            leader: leader.into(),
            level,
        }
    }
}

/// Validated, read-only leader catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContentCatalog {
    leaders: Vec<Leader>,
}

impl ContentCatalog {
    /// Parse and validate a catalog from its JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the content breaks a
    /// catalog invariant.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let leaders: Vec<Leader> = serde_json::from_str(json)?;
        Self::from_leaders(leaders)
    }

    /// Validate pre-parsed leaders.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty catalog, unnamed or duplicate leaders,
    /// and levels that break the two-choice contract.
    pub fn from_leaders(leaders: Vec<Leader>) -> Result<Self, ContentError> {
        if leaders.is_empty() {
            return Err(ContentError::NoLeaders);
        }
        let mut names = HashSet::new();
        for leader in &leaders {
            if leader.name.trim().is_empty() {
                return Err(ContentError::UnnamedLeader);
            }
            if !names.insert(leader.name.as_str()) {
                return Err(ContentError::DuplicateLeader(leader.name.clone()));
            }
            validate_levels(leader)?;
        }
        Ok(Self { leaders })
    }

    #[must_use]
    pub fn leaders(&self) -> &[Leader] {
        &self.leaders
    }

    #[must_use]
    pub fn leader(&self, name: &str) -> Option<&Leader> {
        self.leaders.iter().find(|leader| leader.name == name)
    }

    /// Leaders ordered by name, the order menus list them in.
    #[must_use]
    pub fn leaders_by_name(&self) -> Vec<&Leader> {
        let mut sorted: Vec<&Leader> = self.leaders.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        sorted
    }

    #[must_use]
    pub fn level_count(&self) -> usize {
        self.leaders.iter().map(|leader| leader.levels.len()).sum()
    }

    /// Resolve a menu selection into the ordered levels to play.
    ///
    /// Randomized selections come back in catalog order; the session engine
    /// applies the shuffle.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::UnknownLeader`] when a single-leader selection
    /// names a leader the catalog does not have.
    pub fn levels_for(&self, selection: &Selection) -> Result<Vec<PlayableLevel>, ContentError> {
        match selection {
            Selection::Single(name) => {
                let leader = self
                    .leader(name)
                    .ok_or_else(|| ContentError::UnknownLeader(name.clone()))?;
                Ok(playable(leader).collect())
            }
            Selection::AllSequential | Selection::AllRandomized => {
                Ok(self.leaders.iter().flat_map(playable).collect())
            }
        }
    }
}

fn playable(leader: &Leader) -> impl Iterator<Item = PlayableLevel> + '_ {
    leader
        .levels
        .iter()
        .map(|level| PlayableLevel::new(leader.name.clone(), level.clone()))
}

fn validate_levels(leader: &Leader) -> Result<(), ContentError> {
    let mut numbers = HashSet::new();
    for level in &leader.levels {
        let invalid = |problem| ContentError::InvalidLevel {
            leader: leader.name.clone(),
            number: level.number,
            problem,
        };
        level.check_shape().map_err(invalid)?;
        if !numbers.insert(level.number) {
            return Err(invalid(LevelProblem::DuplicateNumber));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LEADERS: &str = r#"[
        {
            "name": "Queen Elizabeth I",
            "backstory": "Tudor monarch",
            "levels": [
                {
                    "number": 1,
                    "description": "The Armada approaches.",
                    "choices": [
                        { "text": "Send fireships", "isHistorical": true },
                        { "text": "Sue for peace", "isHistorical": false }
                    ],
                    "summary": "Fireships scattered the fleet at Gravelines."
                }
            ]
        },
        {
            "name": "Abraham Lincoln",
            "backstory": "16th US President",
            "levels": [
                {
                    "number": 1,
                    "description": "Fort Sumter needs supplies.",
                    "choices": [
                        { "text": "Resupply the fort", "isHistorical": true },
                        { "text": "Evacuate the fort" }
                    ],
                    "summary": "Lincoln sent provisions only."
                },
                {
                    "number": 2,
                    "description": "Issue an emancipation order?",
                    "choices": [
                        { "text": "Wait for a victory", "isHistorical": true },
                        { "text": "Issue it immediately", "isHistorical": false }
                    ],
                    "summary": "He waited for Antietam."
                }
            ]
        }
    ]"#;

    fn level(number: u32, historical: &[bool]) -> Level {
        Level {
            number,
            description: format!("Level {number}"),
            choices: historical
                .iter()
                .enumerate()
                .map(|(i, h)| Choice::new(format!("Option {i}"), *h))
                .collect(),
            summary: String::new(),
        }
    }

    #[test]
    fn catalog_from_json_parses_and_defaults_flags() {
        let catalog = ContentCatalog::from_json(TWO_LEADERS).unwrap();
        assert_eq!(catalog.leaders().len(), 2);
        assert_eq!(catalog.level_count(), 3);
        let lincoln = catalog.leader("Abraham Lincoln").unwrap();
        assert!(!lincoln.levels[0].choices[1].is_historical);
        assert_eq!(
            lincoln.levels[0].historical_choice().unwrap().text,
            "Resupply the fort"
        );
    }

    #[test]
    fn leaders_by_name_sorts_alphabetically() {
        let catalog = ContentCatalog::from_json(TWO_LEADERS).unwrap();
        let names: Vec<_> = catalog
            .leaders_by_name()
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["Abraham Lincoln", "Queen Elizabeth I"]);
    }

    #[test]
    fn levels_for_single_keeps_file_order() {
        let catalog = ContentCatalog::from_json(TWO_LEADERS).unwrap();
        let levels = catalog
            .levels_for(&Selection::Single("Abraham Lincoln".into()))
            .unwrap();
        let numbers: Vec<_> = levels.iter().map(|p| p.level.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(levels.iter().all(|p| p.leader == "Abraham Lincoln"));
    }

    #[test]
    fn levels_for_all_groups_by_catalog_order() {
        let catalog = ContentCatalog::from_json(TWO_LEADERS).unwrap();
        let levels = catalog.levels_for(&Selection::AllSequential).unwrap();
        let leaders: Vec<_> = levels.iter().map(|p| p.leader.as_str()).collect();
        assert_eq!(
            leaders,
            vec!["Queen Elizabeth I", "Abraham Lincoln", "Abraham Lincoln"]
        );
    }

    #[test]
    fn unknown_leader_is_reported() {
        let catalog = ContentCatalog::from_json(TWO_LEADERS).unwrap();
        let err = catalog
            .levels_for(&Selection::Single("Napoleon".into()))
            .unwrap_err();
        assert!(matches!(err, ContentError::UnknownLeader(name) if name == "Napoleon"));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(matches!(
            ContentCatalog::from_json("[]"),
            Err(ContentError::NoLeaders)
        ));
        assert!(matches!(
            ContentCatalog::from_json("{not json"),
            Err(ContentError::Json(_))
        ));
    }

    #[test]
    fn malformed_levels_fail_fast() {
        let leader = |levels| Leader {
            name: "Hatshepsut".into(),
            backstory: String::new(),
            levels,
        };

        let err = ContentCatalog::from_leaders(vec![leader(vec![level(1, &[true])])]).unwrap_err();
        assert!(matches!(
            err,
            ContentError::InvalidLevel {
                problem: LevelProblem::ChoiceCount(1),
                ..
            }
        ));

        let err =
            ContentCatalog::from_leaders(vec![leader(vec![level(1, &[true, true])])]).unwrap_err();
        assert!(matches!(
            err,
            ContentError::InvalidLevel {
                problem: LevelProblem::HistoricalCount(2),
                ..
            }
        ));

        let err = ContentCatalog::from_leaders(vec![leader(vec![
            level(1, &[true, false]),
            level(1, &[false, true]),
        ])])
        .unwrap_err();
        assert!(matches!(
            err,
            ContentError::InvalidLevel {
                problem: LevelProblem::DuplicateNumber,
                number: 1,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_leader_names_are_rejected() {
        let leader = Leader {
            name: "Ashoka".into(),
            backstory: String::new(),
            levels: vec![level(1, &[false, true])],
        };
        let err = ContentCatalog::from_leaders(vec![leader.clone(), leader]).unwrap_err();
        assert!(matches!(err, ContentError::DuplicateLeader(name) if name == "Ashoka"));
    }
}
