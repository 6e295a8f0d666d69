//! Course material shipped alongside the leader content.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use eoc_game::Locale;

const EMBEDDED_COURSE: &str = include_str!("../assets/data/course.txt");
const EMBEDDED_COURSE_AR: &str = include_str!("../assets/data/course-ar.txt");

/// Locates the course text for a locale.
#[derive(Debug, Clone)]
pub struct CourseMaterial {
    content_dir: Option<PathBuf>,
    locale: Locale,
}

impl CourseMaterial {
    #[must_use]
    pub const fn new(content_dir: Option<PathBuf>, locale: Locale) -> Self {
        Self {
            content_dir,
            locale,
        }
    }

    /// The course text, or `None` when no material exists for the locale.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match &self.content_dir {
            Some(dir) => {
                let path = dir.join(self.locale.course_file());
                match fs::read_to_string(&path) {
                    Ok(text) => Some(text),
                    Err(err) => {
                        log::debug!("no course material at {}: {err}", path.display());
                        None
                    }
                }
            }
            None => Some(
                match self.locale {
                    Locale::English => EMBEDDED_COURSE,
                    Locale::Arabic => EMBEDDED_COURSE_AR,
                }
                .to_string(),
            ),
        }
    }

    /// Copy the course text to `dest`. Returns `false` when there is nothing to copy.
    pub fn export(&self, dest: &Path) -> Result<bool> {
        let Some(text) = self.text() else {
            return Ok(false);
        };
        fs::write(dest, text)
            .with_context(|| format!("failed to save course material to {}", dest.display()))?;
        log::info!("course material written to {}", dest.display());
        Ok(true)
    }
}
