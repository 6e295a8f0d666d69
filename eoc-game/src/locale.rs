//! Content language selection.
//!
//! The active locale is handed to loaders as a value; nothing in the engine
//! keeps a process-wide "current language".
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    English,
    Arabic,
}

impl Locale {
    /// File name of the leader catalog for this locale.
    #[must_use]
    pub const fn history_file(self) -> &'static str {
        match self {
            Self::English => "history.json",
            Self::Arabic => "history-ar.json",
        }
    }

    /// File name of the course material for this locale.
    #[must_use]
    pub const fn course_file(self) -> &'static str {
        match self {
            Self::English => "course.txt",
            Self::Arabic => "course-ar.txt",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Arabic => "Arabic",
        }
    }
}
