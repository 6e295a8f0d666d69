//! One playthrough of an ordered level set.
//!
//! [`PlaySession`] owns the transient state of a playthrough: the (possibly
//! shuffled) level order, the running score and the archive entries
//! produced so far. It never touches storage; [`run_session`] forwards each
//! entry to a caller-supplied hook as soon as the level is answered.
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Instant;

use num_traits::cast::cast;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::archive::ArchiveEntry;
use crate::data::{Level, PlayableLevel};
use crate::error::SessionError;
use crate::mode::GameMode;
use crate::numbers::usize_to_u32;

/// Monotonic millisecond source used to time a session.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

/// Wall-clock timer backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        cast::<u128, u64>(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven clock; clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get().saturating_add(millis));
    }

    pub fn set(&self, millis: u64) {
        self.now.set(millis);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.get()
    }
}

/// Position of an option as currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceSlot {
    First,
    Second,
}

impl ChoiceSlot {
    /// Map the 1-based menu number to a slot.
    #[must_use]
    pub const fn from_number(number: u32) -> Option<Self> {
        match number {
            1 => Some(Self::First),
            2 => Some(Self::Second),
            _ => None,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// What the presenter answered for one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    Choose(ChoiceSlot),
    Skip,
    /// Leave the session; nothing more is scored.
    Abandon,
}

/// "Leader 2 of 4" indicator for sequential play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderProgress {
    pub index: u32,
    pub total: u32,
}

/// Everything a presenter needs to show the current level.
#[derive(Debug, Clone, Copy)]
pub struct LevelPrompt<'a> {
    /// 1-based position within the session.
    pub position: u32,
    pub total: u32,
    pub leader: &'a str,
    pub level: &'a Level,
    pub leader_progress: Option<LeaderProgress>,
}

impl LevelPrompt<'_> {
    #[must_use]
    pub fn choice_text(&self, slot: ChoiceSlot) -> &str {
        self.level
            .choices
            .get(slot.index())
            .map_or("", |choice| choice.text.as_str())
    }
}

/// Result of answering a single level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelOutcome {
    pub entry: ArchiveEntry,
    /// Score after this level.
    pub score: u32,
    pub total: u32,
}

/// Final accounting of a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub username: String,
    pub mode: GameMode,
    pub score: u32,
    pub total_levels: u32,
    pub elapsed_millis: u64,
    pub correct_count: u32,
    pub levels_played: u32,
    pub archive_entries: Vec<ArchiveEntry>,
}

#[derive(Debug)]
pub struct PlaySession<C> {
    username: String,
    mode: GameMode,
    levels: Vec<PlayableLevel>,
    leader_ordinals: Vec<u32>,
    leader_total: u32,
    index: usize,
    score: u32,
    correct_count: u32,
    entries: Vec<ArchiveEntry>,
    clock: C,
    started_at: u64,
    stopped_at: Option<u64>,
}

impl<C: Clock> PlaySession<C> {
    /// Validate the level set, shuffle it for randomized play and start the clock.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyContent`] for an empty level set and
    /// [`SessionError::MalformedLevel`] for a level without exactly two
    /// choices and one historical option.
    pub fn start<R: Rng + ?Sized>(
        username: impl Into<String>,
        mut levels: Vec<PlayableLevel>,
        mode: GameMode,
        rng: &mut R,
        clock: C,
    ) -> Result<Self, SessionError> {
        if levels.is_empty() {
            return Err(SessionError::EmptyContent);
        }
        for playable in &levels {
            playable
                .level
                .check_shape()
                .map_err(|problem| SessionError::MalformedLevel {
                    leader: playable.leader.clone(),
                    number: playable.level.number,
                    problem,
                })?;
        }

        if mode.shuffles() {
            levels.shuffle(rng);
            for playable in &mut levels {
                playable.level.choices.shuffle(rng);
            }
        }

        let (leader_ordinals, leader_total) = leader_ordinals(&levels);
        let started_at = clock.now_millis();
        let username = username.into();
        log::debug!(
            "session start user={username} mode={mode} levels={}",
            levels.len()
        );
        Ok(Self {
            username,
            mode,
            leader_ordinals,
            leader_total,
            entries: Vec::with_capacity(levels.len()),
            levels,
            index: 0,
            score: 0,
            correct_count: 0,
            clock,
            started_at,
            stopped_at: None,
        })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn mode(&self) -> GameMode {
        self.mode
    }

    /// Levels in the order they will be shown.
    #[must_use]
    pub fn levels(&self) -> &[PlayableLevel] {
        &self.levels
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        usize_to_u32(self.levels.len())
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        usize_to_u32(self.index)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.index >= self.levels.len()
    }

    /// `(score so far, total levels)`.
    #[must_use]
    pub fn progress(&self) -> (u32, u32) {
        (self.score, self.total())
    }

    /// Prompt for the next unanswered level, or `None` once all are answered.
    #[must_use]
    pub fn current(&self) -> Option<LevelPrompt<'_>> {
        let playable = self.levels.get(self.index)?;
        let leader_progress = if self.mode.tracks_leader_progress() {
            self.leader_ordinals
                .get(self.index)
                .map(|&index| LeaderProgress {
                    index,
                    total: self.leader_total,
                })
        } else {
            None
        };
        Some(LevelPrompt {
            position: usize_to_u32(self.index + 1),
            total: self.total(),
            leader: &playable.leader,
            level: &playable.level,
            leader_progress,
        })
    }

    /// Answer the current level with the option in `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Finished`] when every level is already answered.
    pub fn choose(&mut self, slot: ChoiceSlot) -> Result<LevelOutcome, SessionError> {
        self.resolve(Some(slot))
    }

    /// Skip the current level; it is archived as incorrect with no choice.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Finished`] when every level is already answered.
    pub fn skip(&mut self) -> Result<LevelOutcome, SessionError> {
        self.resolve(None)
    }

    fn resolve(&mut self, slot: Option<ChoiceSlot>) -> Result<LevelOutcome, SessionError> {
        let playable = self.levels.get(self.index).ok_or(SessionError::Finished)?;
        let level = &playable.level;
        let chosen = slot.and_then(|slot| level.choices.get(slot.index()));
        let is_correct = chosen.is_some_and(|choice| choice.is_historical);

        let entry = ArchiveEntry {
            username: self.username.clone(),
            leader: playable.leader.clone(),
            level_number: level.number,
            description: level.description.clone(),
            historical_choice: level
                .historical_choice()
                .map(|choice| choice.text.clone())
                .unwrap_or_default(),
            summary: level.summary.clone(),
            player_choice: chosen.map(|choice| choice.text.clone()).unwrap_or_default(),
            is_correct,
        };

        if is_correct {
            self.score += 1;
            self.correct_count += 1;
        }
        self.index += 1;
        if self.is_finished() {
            self.stopped_at = Some(self.clock.now_millis());
        }
        log::debug!(
            "level {}/{} {} #{} correct={is_correct}",
            self.index,
            self.levels.len(),
            entry.leader,
            entry.level_number
        );

        self.entries.push(entry.clone());
        Ok(LevelOutcome {
            entry,
            score: self.score,
            total: self.total(),
        })
    }

    /// Close out a fully answered session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Unfinished`] while levels remain unanswered.
    pub fn finish(self) -> Result<SessionResult, SessionError> {
        let Some(stopped_at) = self.stopped_at else {
            return Err(SessionError::Unfinished {
                remaining: self.levels.len() - self.index,
            });
        };
        let total_levels = self.total();
        Ok(SessionResult {
            username: self.username,
            mode: self.mode,
            score: self.score,
            total_levels,
            elapsed_millis: stopped_at.saturating_sub(self.started_at),
            correct_count: self.correct_count,
            levels_played: usize_to_u32(self.entries.len()),
            archive_entries: self.entries,
        })
    }
}

/// 1-based leader index per level, bumped whenever the leader changes, plus
/// the number of distinct leaders.
fn leader_ordinals(levels: &[PlayableLevel]) -> (Vec<u32>, u32) {
    let mut ordinals = Vec::with_capacity(levels.len());
    let mut current = 0;
    let mut previous: Option<&str> = None;
    for playable in levels {
        if previous != Some(playable.leader.as_str()) {
            current += 1;
            previous = Some(playable.leader.as_str());
        }
        ordinals.push(current);
    }
    let distinct: HashSet<&str> = levels.iter().map(|p| p.leader.as_str()).collect();
    (ordinals, usize_to_u32(distinct.len()))
}

/// Presentation adapter driven by [`run_session`].
pub trait Presenter {
    /// Block until the player answers the prompt.
    fn choose(&mut self, prompt: &LevelPrompt<'_>) -> PlayerInput;

    /// Sequential play moved on to a new leader.
    fn leader_banner(&mut self, _leader: &str, _progress: LeaderProgress) {}

    fn outcome(&mut self, _outcome: &LevelOutcome) {}

    fn progress(&mut self, _score: u32, _total: u32) {}
}

/// How a driven session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Completed(SessionResult),
    Abandoned { levels_answered: u32 },
}

/// Drive `session` to the end through `presenter`.
///
/// `on_entry` sees each archive entry as soon as its level is answered.
///
/// # Errors
///
/// Propagates [`SessionError`] from the session; a fresh session driven
/// here does not produce one.
pub fn run_session<C, P, F>(
    mut session: PlaySession<C>,
    presenter: &mut P,
    mut on_entry: F,
) -> Result<SessionEnd, SessionError>
where
    C: Clock,
    P: Presenter + ?Sized,
    F: FnMut(&ArchiveEntry),
{
    let mut announced: Option<u32> = None;
    loop {
        let input = {
            let Some(prompt) = session.current() else {
                break;
            };
            if let Some(progress) = prompt.leader_progress
                && announced != Some(progress.index)
            {
                presenter.leader_banner(prompt.leader, progress);
                announced = Some(progress.index);
            }
            presenter.choose(&prompt)
        };

        let outcome = match input {
            PlayerInput::Choose(slot) => session.choose(slot)?,
            PlayerInput::Skip => session.skip()?,
            PlayerInput::Abandon => {
                log::debug!(
                    "session abandoned by {} after {} level(s)",
                    session.username(),
                    session.answered()
                );
                return Ok(SessionEnd::Abandoned {
                    levels_answered: session.answered(),
                });
            }
        };
        on_entry(&outcome.entry);
        presenter.outcome(&outcome);
        presenter.progress(outcome.score, outcome.total);
    }
    session.finish().map(SessionEnd::Completed)
}
