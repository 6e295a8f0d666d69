//! Interactive play loop: login, play-mode menu, rounds and post-round options.
use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use eoc_game::{BestRecord, GameEngine, GameMode, Selection, SessionEnd, SystemClock};
use rand_chacha::ChaCha20Rng;

use crate::console::{ConsoleUi, CourseAction, PlayMenu, PostRound};
use crate::course::CourseMaterial;
use crate::reports::{self, ReportFormat};
use crate::storage::{FsContentLoader, FsStorage};

pub type Engine = GameEngine<FsContentLoader, FsStorage>;

pub struct App<R, W> {
    engine: Engine,
    ui: ConsoleUi<R, W>,
    course: CourseMaterial,
    rng: ChaCha20Rng,
}

impl<R: BufRead, W: Write> App<R, W> {
    pub const fn new(
        engine: Engine,
        ui: ConsoleUi<R, W>,
        course: CourseMaterial,
        rng: ChaCha20Rng,
    ) -> Self {
        Self {
            engine,
            ui,
            course,
            rng,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        loop {
            self.ui.banner()?;
            self.offer_course()?;
            let Some(username) = self.ui.prompt_username()? else {
                break;
            };
            let record = self.engine.login(&username)?;
            self.ui.welcome(&record)?;
            if self.ui.confirm("View login history?")? {
                reports::write_login_history(self.ui.out(), &record)?;
            }
            self.engine
                .record_login(&username, Utc::now().timestamp_millis())?;

            let switch_user = self.user_loop(&username)?;
            reports::write_leaderboards(
                self.ui.out(),
                &self.engine.leaderboards(),
                ReportFormat::Console,
            )?;
            if !switch_user {
                break;
            }
        }
        self.ui.goodbye()?;
        Ok(())
    }

    /// Rounds for one logged-in player. Returns `true` when switching user.
    fn user_loop(&mut self, username: &str) -> Result<bool> {
        loop {
            self.ui
                .notice("[Note] Archive search is available after each round.")?;
            let selection = match self.ui.prompt_play_mode()? {
                PlayMenu::Quit => return Ok(false),
                PlayMenu::AllSequential => Selection::AllSequential,
                PlayMenu::AllRandomized => Selection::AllRandomized,
                PlayMenu::OneLeader => {
                    let catalog = match self.engine.catalog() {
                        Ok(catalog) => catalog,
                        Err(err) => {
                            self.ui.error(&format!("Error loading leaders: {err}"))?;
                            self.ui.error(
                                "Cannot start game without leaders. Please try again later.",
                            )?;
                            continue;
                        }
                    };
                    match self.ui.select_leader(&catalog)? {
                        Some(name) => Selection::Single(name),
                        None => return Ok(false),
                    }
                }
            };

            if !self.play_round(username, &selection)? {
                continue;
            }

            if self.ui.confirm("Search your archive now?")? {
                let keyword = self.ui.prompt_keyword()?;
                let hits = self.engine.search_archive(Some(username), &keyword);
                reports::write_archive(self.ui.out(), &hits, ReportFormat::Console)?;
            }

            match self.ui.prompt_post_round()? {
                PostRound::PlayAgain => {}
                PostRound::SwitchUser => return Ok(true),
                PostRound::ViewStats => {
                    if let Some(record) = self.engine.player(username) {
                        let snapshot = self
                            .engine
                            .stats_snapshots()
                            .into_iter()
                            .find(|s| s.username == username);
                        reports::write_player_stats(
                            self.ui.out(),
                            record,
                            snapshot.as_ref(),
                            ReportFormat::Console,
                        )?;
                    }
                }
                PostRound::Quit => return Ok(false),
            }
        }
    }

    /// Play one round. Returns `false` when it could not start.
    fn play_round(&mut self, username: &str, selection: &Selection) -> Result<bool> {
        let mode = selection.mode();
        let before = self.best(username, mode);
        let outcome = self.engine.play(
            username,
            selection,
            &mut self.rng,
            SystemClock::default(),
            &mut self.ui,
        );
        match outcome {
            Ok(SessionEnd::Completed(result)) => {
                let new_best = self.best(username, mode).improves_on(&before);
                reports::write_round_summary(self.ui.out(), &result, new_best)?;
                Ok(true)
            }
            Ok(SessionEnd::Abandoned { levels_answered }) => {
                self.ui.notice(&format!(
                    "Round abandoned after {levels_answered} level(s); answers so far stay in your archive."
                ))?;
                Ok(true)
            }
            Err(err) => {
                log::warn!("could not start {mode} play: {err}");
                self.ui.error(&format!("Cannot start game: {err}"))?;
                Ok(false)
            }
        }
    }

    fn best(&self, username: &str, mode: GameMode) -> BestRecord {
        self.engine
            .player(username)
            .map(|record| record.best(mode))
            .unwrap_or_default()
    }

    fn offer_course(&mut self) -> Result<()> {
        if !self
            .ui
            .confirm("Would you like to access the course material before starting?")?
        {
            return Ok(());
        }
        match self.ui.prompt_course_action()? {
            CourseAction::Skip => self.ui.notice("Skipping course material.")?,
            CourseAction::Read => match self.course.text() {
                Some(text) => {
                    let out = self.ui.out();
                    writeln!(out, "\n=== Course Material Start ===\n")?;
                    writeln!(out, "{text}")?;
                    writeln!(out, "=== Course Material End ===")?;
                }
                None => self.ui.error("Course material not found.")?,
            },
            CourseAction::Download => {
                let Some(path) = self.ui.prompt_path()? else {
                    self.ui.notice("No path given; skipping download.")?;
                    return Ok(());
                };
                let dest = PathBuf::from(path);
                match self.course.export(&dest) {
                    Ok(true) => writeln!(
                        self.ui.out(),
                        "Course material saved successfully to: {}",
                        dest.display()
                    )?,
                    Ok(false) => self.ui.error("Course material not found.")?,
                    Err(err) => self.ui.error(&format!("Error saving course material: {err:#}"))?,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eoc_game::EngineSettings;
    use rand::SeedableRng;
    use std::io::Cursor;

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "eoc-app-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn run(dir: &std::path::Path, script: &str) -> (Engine, String) {
        let engine = GameEngine::new(
            FsContentLoader::default(),
            FsStorage::new(dir),
            EngineSettings::default(),
        );
        let ui = ConsoleUi::new(Cursor::new(script.as_bytes().to_vec()), Vec::new()).unwrap();
        let mut app = App::new(
            engine,
            ui,
            CourseMaterial::new(None, eoc_game::Locale::English),
            ChaCha20Rng::seed_from_u64(1),
        );
        app.run().unwrap();
        let text = String::from_utf8_lossy(app.ui.out()).into_owned();
        (app.engine, text)
    }

    #[test]
    fn single_leader_round_updates_records_and_archive() {
        let dir = temp_dir("single");
        // course: no, user, history: no, one leader, Cyrus, answers, search: no, quit
        let script = "no\nAlice\nno\n1\n3\n1\n2\nno\n4\n";
        let (engine, text) = run(&dir, script);
        assert!(text.contains("You're new to Echoes of Command!"));
        assert!(text.contains("Score: 2 out of 2"));
        assert!(text.contains("Thanks for playing!"));

        let alice = engine.player("alice").unwrap();
        assert_eq!(alice.best_score_single, 2);
        assert_eq!(alice.login_history.len(), 1);
        assert_eq!(engine.archive().for_player("alice").len(), 2);
        assert!(dir.join("players.json").exists());
        assert!(dir.join("archive.json").exists());
        assert!(dir.join("stats.json").exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn returning_player_sees_last_login_and_stats() {
        let dir = temp_dir("returning");
        run(&dir, "no\nbob\nno\n4\n");
        let script = "no\nBOB\nno\n2\ns\ns\ns\ns\ns\ns\ns\ns\ns\nyes\n\n3\n4\n";
        let (engine, text) = run(&dir, script);
        assert!(text.contains("Last login: "));
        assert!(text.contains("Leader 1 of 4"));
        assert!(text.contains("Score: 0 out of 9"));
        assert!(text.contains("Player Statistics for bob"));
        assert!(text.contains("(skipped)"));
        let bob = engine.player("bob").unwrap();
        assert_eq!(bob.login_history.len(), 2);
        assert_eq!(bob.total_levels_played, 9);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn abandoning_keeps_answers_but_not_totals() {
        let dir = temp_dir("abandon");
        let script = "no\ncarol\nno\n1\n2\n1\nq\nno\n4\n";
        let (engine, text) = run(&dir, script);
        assert!(text.contains("Round abandoned after 1 level(s)"));
        assert_eq!(engine.player("carol").unwrap().total_levels_played, 0);
        assert_eq!(engine.archive().for_player("carol").len(), 1);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn end_of_input_exits_cleanly() {
        let dir = temp_dir("eof");
        let (engine, text) = run(&dir, "");
        assert!(text.contains("Thanks for playing!"));
        assert!(engine.registry().is_empty());
    }
}
