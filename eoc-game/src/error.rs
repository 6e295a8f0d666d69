//! Error types shared across the game engine.
use thiserror::Error;

/// Why a single level fails the two-choice contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LevelProblem {
    #[error("expected exactly 2 choices, found {0}")]
    ChoiceCount(usize),
    #[error("expected exactly one historical choice, found {0}")]
    HistoricalCount(usize),
    #[error("level number must be positive")]
    ZeroNumber,
    #[error("level number appears more than once")]
    DuplicateNumber,
}

/// Failures while loading or resolving the leader catalog.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content document could not be parsed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("content contains no leaders")]
    NoLeaders,
    #[error("leader name must not be empty")]
    UnnamedLeader,
    #[error("leader '{0}' appears more than once")]
    DuplicateLeader(String),
    #[error("leader '{0}' not found")]
    UnknownLeader(String),
    #[error("leader '{leader}' level {number}: {problem}")]
    InvalidLevel {
        leader: String,
        number: u32,
        problem: LevelProblem,
    },
}

/// Failures raised by the session engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no levels to play")]
    EmptyContent,
    #[error("leader '{leader}' level {number}: {problem}")]
    MalformedLevel {
        leader: String,
        number: u32,
        problem: LevelProblem,
    },
    #[error("every level of this session has already been answered")]
    Finished,
    #[error("session still has {remaining} unanswered level(s)")]
    Unfinished { remaining: usize },
}

/// Failures raised by the player record store.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("player records could not be parsed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("player records document is neither a record list nor a legacy username map")]
    UnrecognizedShape,
}

/// Errors surfaced by [`crate::GameEngine`] when a play attempt cannot start.
#[derive(Debug, Error)]
pub enum EngineError<E>
where
    E: std::error::Error + 'static,
{
    #[error("failed to load content: {0}")]
    Loader(#[source] E),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Record(#[from] RecordError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_names_leader_and_problem() {
        let err = ContentError::InvalidLevel {
            leader: "Cleopatra".to_string(),
            number: 3,
            problem: LevelProblem::HistoricalCount(2),
        };
        let text = err.to_string();
        assert!(text.contains("Cleopatra"));
        assert!(text.contains("level 3"));
        assert!(text.contains("found 2"));
    }

    #[test]
    fn unfinished_reports_remaining_levels() {
        let err = SessionError::Unfinished { remaining: 4 };
        assert_eq!(err.to_string(), "session still has 4 unanswered level(s)");
    }
}
