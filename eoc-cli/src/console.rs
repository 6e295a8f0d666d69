//! Line-oriented console adapter.
//!
//! Reads answers from any `BufRead` and writes screens to any `Write`, so the
//! whole interactive flow runs the same against stdin/stdout and in tests.
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use colored::Colorize;
use eoc_game::{
    ChoiceSlot, ContentCatalog, LeaderProgress, LevelOutcome, LevelPrompt, PlayerInput,
    PlayerRecord, Presenter,
};
use regex::Regex;

use crate::reports::format_timestamp;

const USERNAME_PATTERN: &str = r"^[a-zA-Z0-9_]+$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMenu {
    OneLeader,
    AllSequential,
    AllRandomized,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostRound {
    PlayAgain,
    SwitchUser,
    ViewStats,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseAction {
    Read,
    Download,
    Skip,
}

pub struct ConsoleUi<R, W> {
    input: R,
    out: W,
    username_pattern: Regex,
}

impl<R: BufRead, W: Write> ConsoleUi<R, W> {
    pub fn new(input: R, out: W) -> Result<Self> {
        let username_pattern =
            Regex::new(USERNAME_PATTERN).context("username pattern failed to compile")?;
        Ok(Self {
            input,
            out,
            username_pattern,
        })
    }

    pub fn out(&mut self) -> &mut W {
        &mut self.out
    }

    /// Next input line without its terminator; `None` at end of input.
    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(err) => {
                log::warn!("failed to read input: {err}");
                None
            }
        }
    }

    fn prompt(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{text}")?;
        self.out.flush()
    }

    /// Read a number in `1..=max`, re-prompting on anything else.
    fn menu_choice(&mut self, max: usize) -> io::Result<Option<usize>> {
        loop {
            let Some(line) = self.read_line() else {
                writeln!(self.out)?;
                return Ok(None);
            };
            match line.parse::<usize>() {
                Ok(n) if (1..=max).contains(&n) => return Ok(Some(n)),
                _ => self.prompt(&format!("Invalid. Please enter a number from 1 to {max}: "))?,
            }
        }
    }

    pub fn banner(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "=== Echoes of Command ===".bright_cyan().bold())
    }

    pub fn goodbye(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Thanks for playing!")
    }

    pub fn error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", message.red())
    }

    pub fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", message.dimmed())
    }

    /// Ask a yes/no question; anything but "yes"/"y" is a no.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        self.prompt(&format!("{question} (yes/no): "))?;
        Ok(self
            .read_line()
            .is_some_and(|answer| matches!(answer.to_lowercase().as_str(), "yes" | "y")))
    }

    /// Prompt until a valid username is entered. Returns it trimmed and lowercased.
    pub fn prompt_username(&mut self) -> io::Result<Option<String>> {
        loop {
            self.prompt("Enter your username: ")?;
            let Some(line) = self.read_line() else {
                writeln!(self.out)?;
                return Ok(None);
            };
            let username = line.to_lowercase();
            if username.is_empty() {
                self.error("Error: Username cannot be empty.")?;
            } else if !self.username_pattern.is_match(&username) {
                self.error("Error: Username can only contain letters, numbers, or underscores.")?;
            } else {
                return Ok(Some(username));
            }
        }
    }

    pub fn welcome(&mut self, record: &PlayerRecord) -> io::Result<()> {
        writeln!(self.out)?;
        match record.last_login() {
            None => writeln!(
                self.out,
                "Welcome, {}! You're new to Echoes of Command!",
                record.username.bold()
            ),
            Some(last) => writeln!(
                self.out,
                "Welcome back, {}! Last login: {}",
                record.username.bold(),
                format_timestamp(last)
            ),
        }
    }

    pub fn prompt_play_mode(&mut self) -> io::Result<PlayMenu> {
        writeln!(self.out)?;
        writeln!(self.out, "How do you want to play?")?;
        writeln!(self.out, "  1) Play ONE leader")?;
        writeln!(self.out, "  2) Play ALL leaders in sequence")?;
        writeln!(
            self.out,
            "  3) Play ALL leaders with randomized levels and choices"
        )?;
        writeln!(self.out, "  4) Quit")?;
        self.prompt("Enter choice (1-4): ")?;
        Ok(match self.menu_choice(4)? {
            Some(1) => PlayMenu::OneLeader,
            Some(2) => PlayMenu::AllSequential,
            Some(3) => PlayMenu::AllRandomized,
            _ => PlayMenu::Quit,
        })
    }

    /// Leader menu sorted by name. Returns the chosen leader's name.
    pub fn select_leader(&mut self, catalog: &ContentCatalog) -> io::Result<Option<String>> {
        let leaders = catalog.leaders_by_name();
        writeln!(self.out)?;
        writeln!(self.out, "{}", "=== Select a Leader ===".bright_cyan())?;
        for (i, leader) in leaders.iter().enumerate() {
            writeln!(self.out, "  {}) {}  -  {}", i + 1, leader.name, leader.backstory)?;
        }
        self.prompt(&format!("Enter your choice (1-{}): ", leaders.len()))?;
        let Some(choice) = self.menu_choice(leaders.len())? else {
            return Ok(None);
        };
        let name = leaders[choice - 1].name.clone();
        writeln!(self.out, "You chose \"{name}\"")?;
        Ok(Some(name))
    }

    pub fn prompt_keyword(&mut self) -> io::Result<String> {
        self.prompt("Enter keyword to search (blank shows everything): ")?;
        Ok(self.read_line().unwrap_or_default())
    }

    pub fn prompt_post_round(&mut self) -> io::Result<PostRound> {
        writeln!(self.out)?;
        writeln!(self.out, "What next?")?;
        writeln!(self.out, "  1) Play again")?;
        writeln!(self.out, "  2) Switch user")?;
        writeln!(self.out, "  3) View player statistics")?;
        writeln!(self.out, "  4) Quit")?;
        self.prompt("Enter choice (1-4): ")?;
        Ok(match self.menu_choice(4)? {
            Some(1) => PostRound::PlayAgain,
            Some(2) => PostRound::SwitchUser,
            Some(3) => PostRound::ViewStats,
            _ => PostRound::Quit,
        })
    }

    pub fn prompt_course_action(&mut self) -> io::Result<CourseAction> {
        writeln!(self.out)?;
        writeln!(self.out, "You chose to access the course material:")?;
        writeln!(self.out, "  1) Read it now")?;
        writeln!(self.out, "  2) Download it")?;
        writeln!(self.out, "  3) Skip")?;
        self.prompt("Enter choice (1-3): ")?;
        Ok(match self.menu_choice(3)? {
            Some(1) => CourseAction::Read,
            Some(2) => CourseAction::Download,
            _ => CourseAction::Skip,
        })
    }

    pub fn prompt_path(&mut self) -> io::Result<Option<String>> {
        self.prompt("Enter the full path to save the course material: ")?;
        Ok(self.read_line().filter(|path| !path.is_empty()))
    }

    fn show_level(&mut self, prompt: &LevelPrompt<'_>) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(
            self.out,
            "{}",
            format!(
                "--- Level {} (Leader: {}) [{}/{}] ---",
                prompt.level.number, prompt.leader, prompt.position, prompt.total
            )
            .bold()
        )?;
        writeln!(self.out, "{}", prompt.level.description)?;
        writeln!(self.out, "1) {}", prompt.choice_text(ChoiceSlot::First))?;
        writeln!(self.out, "2) {}", prompt.choice_text(ChoiceSlot::Second))?;
        self.prompt("Your choice (1 or 2, s to skip, q to quit): ")
    }

    fn read_answer(&mut self) -> io::Result<PlayerInput> {
        loop {
            let Some(line) = self.read_line() else {
                writeln!(self.out)?;
                self.notice("[No valid input - skipping level]")?;
                return Ok(PlayerInput::Skip);
            };
            let answer = match line.to_lowercase().as_str() {
                "1" => PlayerInput::Choose(ChoiceSlot::First),
                "2" => PlayerInput::Choose(ChoiceSlot::Second),
                "s" | "skip" => PlayerInput::Skip,
                "q" | "quit" => PlayerInput::Abandon,
                _ => {
                    self.prompt("Invalid. Please enter 1 or 2 (s to skip, q to quit): ")?;
                    continue;
                }
            };
            return Ok(answer);
        }
    }

    fn show_outcome(&mut self, outcome: &LevelOutcome) -> io::Result<()> {
        let entry = &outcome.entry;
        if entry.is_skip() {
            writeln!(self.out, "{}", "Skipped".yellow())?;
        } else if entry.is_correct {
            writeln!(self.out, "{}", "✔️ Correct!".green())?;
        } else {
            writeln!(self.out, "{}", "❌ Incorrect".red())?;
        }
        writeln!(self.out, "{}", entry.summary)
    }
}

impl<R: BufRead, W: Write> Presenter for ConsoleUi<R, W> {
    fn choose(&mut self, prompt: &LevelPrompt<'_>) -> PlayerInput {
        let answer = self
            .show_level(prompt)
            .and_then(|()| self.read_answer());
        answer.unwrap_or_else(|err| {
            log::warn!("console unavailable, skipping level: {err}");
            PlayerInput::Skip
        })
    }

    fn leader_banner(&mut self, leader: &str, progress: LeaderProgress) {
        let banner = format!(
            "=== Leader {} of {}: {leader} ===",
            progress.index, progress.total
        );
        let written = writeln!(self.out)
            .and_then(|()| writeln!(self.out, "{}", banner.bright_magenta()));
        if let Err(err) = written {
            log::warn!("failed to write leader banner: {err}");
        }
    }

    fn outcome(&mut self, outcome: &LevelOutcome) {
        if let Err(err) = self.show_outcome(outcome) {
            log::warn!("failed to write level outcome: {err}");
        }
    }

    fn progress(&mut self, score: u32, total: u32) {
        if let Err(err) = writeln!(self.out, "Progress: {score}/{total}") {
            log::warn!("failed to write progress: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eoc_game::{Choice, Level};
    use std::io::Cursor;

    fn ui(input: &str) -> ConsoleUi<Cursor<Vec<u8>>, Vec<u8>> {
        ConsoleUi::new(Cursor::new(input.as_bytes().to_vec()), Vec::new()).unwrap()
    }

    fn output(ui: &ConsoleUi<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8_lossy(&ui.out).into_owned()
    }

    fn level() -> Level {
        Level {
            number: 1,
            description: "Babylon's walls are too strong to storm.".into(),
            choices: vec![
                Choice::new("Divert the river", true),
                Choice::new("Besiege the city", false),
            ],
            summary: "The river was diverted.".into(),
        }
    }

    fn prompt(level: &Level) -> LevelPrompt<'_> {
        LevelPrompt {
            position: 1,
            total: 2,
            leader: "Cyrus the Great",
            level,
            leader_progress: None,
        }
    }

    #[test]
    fn username_is_revalidated_until_acceptable() {
        let mut ui = ui("\nbad name!\n  Alice_1 \n");
        assert_eq!(ui.prompt_username().unwrap(), Some("alice_1".to_string()));
        let text = output(&ui);
        assert!(text.contains("Username cannot be empty."));
        assert!(text.contains("letters, numbers, or underscores"));
    }

    #[test]
    fn username_prompt_ends_at_eof() {
        let mut ui = ui("");
        assert_eq!(ui.prompt_username().unwrap(), None);
    }

    #[test]
    fn menus_reprompt_on_invalid_input() {
        let mut menu = ui("0\nfive\n3\n");
        assert_eq!(menu.prompt_play_mode().unwrap(), PlayMenu::AllRandomized);
        assert!(output(&menu).contains("Invalid. Please enter a number from 1 to 4"));

        let mut eof = ui("");
        assert_eq!(eof.prompt_post_round().unwrap(), PostRound::Quit);
    }

    #[test]
    fn level_answers_map_to_inputs() {
        let level = level();
        let mut ui = ui("x\n2\ns\nQ\n");
        assert_eq!(
            ui.choose(&prompt(&level)),
            PlayerInput::Choose(ChoiceSlot::Second)
        );
        assert_eq!(ui.choose(&prompt(&level)), PlayerInput::Skip);
        assert_eq!(ui.choose(&prompt(&level)), PlayerInput::Abandon);
        // end of input skips
        assert_eq!(ui.choose(&prompt(&level)), PlayerInput::Skip);

        let text = output(&ui);
        assert!(text.contains("--- Level 1 (Leader: Cyrus the Great) [1/2] ---"));
        assert!(text.contains("1) Divert the river"));
        assert!(text.contains("Invalid. Please enter 1 or 2"));
        assert!(text.contains("No valid input"));
    }

    #[test]
    fn welcome_distinguishes_new_and_returning_players() {
        let mut ui = ui("");
        let mut record = PlayerRecord::new("alice");
        ui.welcome(&record).unwrap();
        record.record_login(1_700_000_000_000);
        ui.welcome(&record).unwrap();
        let text = output(&ui);
        assert!(text.contains("You're new to Echoes of Command!"));
        assert!(text.contains("Last login: "));
    }

    #[test]
    fn leader_menu_is_sorted_by_name() {
        let catalog = ContentCatalog::from_json(include_str!("../assets/data/history.json")).unwrap();
        let mut ui = ui("1\n");
        assert_eq!(
            ui.select_leader(&catalog).unwrap(),
            Some("Abraham Lincoln".to_string())
        );
    }

    #[test]
    fn confirm_accepts_yes_variants() {
        let mut ui = ui("YES\ny\nnope\n");
        assert!(ui.confirm("Continue?").unwrap());
        assert!(ui.confirm("Continue?").unwrap());
        assert!(!ui.confirm("Continue?").unwrap());
        assert!(!ui.confirm("Continue?").unwrap());
    }
}
