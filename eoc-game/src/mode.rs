use serde::{Deserialize, Serialize};

/// How the levels of a play session are chosen and ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// One leader, its levels in file order.
    Single,
    /// All leaders, levels grouped by leader in catalog order.
    Sequential,
    /// All leaders' levels flattened and shuffled, choices shuffled too.
    Randomized,
}

impl GameMode {
    pub const ALL: [Self; 3] = [Self::Single, Self::Sequential, Self::Randomized];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Single => "Single Leader",
            Self::Sequential => "Sequential (All Leaders)",
            Self::Randomized => "Randomized (All Leaders)",
        }
    }

    #[must_use]
    pub const fn shuffles(self) -> bool {
        matches!(self, Self::Randomized)
    }

    #[must_use]
    pub const fn tracks_leader_progress(self) -> bool {
        matches!(self, Self::Sequential)
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Sequential => write!(f, "sequential"),
            Self::Randomized => write!(f, "randomized"),
        }
    }
}

/// The player's pick from the play-mode menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Single(String),
    AllSequential,
    AllRandomized,
}

impl Selection {
    #[must_use]
    pub const fn mode(&self) -> GameMode {
        match self {
            Self::Single(_) => GameMode::Single,
            Self::AllSequential => GameMode::Sequential,
            Self::AllRandomized => GameMode::Randomized,
        }
    }
}
