use std::io::{self, Write};

use chrono::{Local, TimeZone};
use clap::ValueEnum;
use colored::Colorize;
use eoc_game::numbers::millis_to_seconds;
use eoc_game::{
    ArchiveEntry, GameMode, LeaderboardRow, Leaderboards, PlayerRecord, SessionResult,
    StatsSnapshot, player_stats,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable tables
    #[default]
    Console,
    /// Pretty-printed JSON
    Json,
}

/// Local `YYYY-MM-DD HH:MM:SS` for an epoch-millisecond timestamp.
#[must_use]
pub fn format_timestamp(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map_or_else(
            || format!("@{millis}"),
            |time| time.format("%Y-%m-%d %H:%M:%S").to_string(),
        )
}

fn heading(out: &mut (impl Write + ?Sized), title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", format!("=== {title} ===").bright_cyan().bold())
}

fn write_json<T: serde::Serialize + ?Sized>(
    out: &mut (impl Write + ?Sized),
    value: &T,
) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    writeln!(out, "{json}")
}

fn leaderboard_table(
    out: &mut (impl Write + ?Sized),
    mode: GameMode,
    rows: &[LeaderboardRow],
) -> io::Result<()> {
    heading(out, &format!("{} Best Scores", mode.label()))?;
    writeln!(out, "{:<4}  {:<15}  {:<5}  {:<7}", "#", "Player", "Score", "Time(s)")?;
    if rows.is_empty() {
        writeln!(out, "{}", "No scores yet.".dimmed())?;
    }
    for row in rows {
        writeln!(
            out,
            "{:<4}  {:<15}  {:<5}  {:<7.2}",
            row.rank,
            row.username,
            row.best_score,
            millis_to_seconds(row.best_time_millis)
        )?;
    }
    Ok(())
}

pub fn write_leaderboards(
    out: &mut (impl Write + ?Sized),
    boards: &Leaderboards,
    format: ReportFormat,
) -> io::Result<()> {
    match format {
        ReportFormat::Json => write_json(out, boards),
        ReportFormat::Console => {
            for mode in GameMode::ALL {
                leaderboard_table(out, mode, boards.rows(mode))?;
            }
            Ok(())
        }
    }
}

pub fn write_player_stats(
    out: &mut (impl Write + ?Sized),
    record: &PlayerRecord,
    snapshot: Option<&StatsSnapshot>,
    format: ReportFormat,
) -> io::Result<()> {
    if format == ReportFormat::Json {
        return match snapshot {
            Some(snapshot) => write_json(out, snapshot),
            None => write_json(out, &player_stats(record)),
        };
    }
    let stats = player_stats(record);
    heading(out, &format!("Player Statistics for {}", record.username))?;
    writeln!(out, "Total Levels Played: {}", stats.total_levels_played)?;
    writeln!(out, "Accuracy: {:.2}%", stats.accuracy)?;
    writeln!(
        out,
        "Average Time per Level: {:.2} seconds",
        stats.average_time_per_level
    )?;
    for mode in GameMode::ALL {
        let best = record.best(mode);
        if best.score > 0 {
            writeln!(
                out,
                "Best {}: {} in {:.2} seconds",
                mode.label(),
                best.score,
                millis_to_seconds(best.time_millis)
            )?;
        }
    }
    if let Some(snapshot) = snapshot
        && !snapshot.leaders_played.is_empty()
    {
        writeln!(out, "Leaders Played: {}", snapshot.leaders_played.join(", "))?;
    }
    Ok(())
}

pub fn write_archive(
    out: &mut (impl Write + ?Sized),
    entries: &[&ArchiveEntry],
    format: ReportFormat,
) -> io::Result<()> {
    if format == ReportFormat::Json {
        return write_json(out, entries);
    }
    if entries.is_empty() {
        writeln!(out, "No matching archive entries.")?;
        return Ok(());
    }
    for entry in entries {
        writeln!(out)?;
        writeln!(out, "Leader: {}", entry.leader.bold())?;
        writeln!(out, "Level {}: {}", entry.level_number, entry.description)?;
        writeln!(out, "Historical choice: {}", entry.historical_choice)?;
        if entry.is_skip() {
            writeln!(out, "Your choice: {}", "(skipped)".dimmed())?;
        } else {
            writeln!(out, "Your choice: {}", entry.player_choice)?;
        }
        let verdict = if entry.is_correct {
            "Correct".green()
        } else {
            "Incorrect".red()
        };
        writeln!(out, "Result: {verdict}")?;
        writeln!(out, "Summary: {}", entry.summary)?;
    }
    Ok(())
}

pub fn write_round_summary(
    out: &mut (impl Write + ?Sized),
    result: &SessionResult,
    new_best: bool,
) -> io::Result<()> {
    heading(out, "Round Complete")?;
    writeln!(out, "Score: {} out of {}", result.score, result.total_levels)?;
    writeln!(
        out,
        "Total Time: {:.2} seconds",
        millis_to_seconds(result.elapsed_millis)
    )?;
    if new_best {
        writeln!(
            out,
            "{}",
            format!("New personal best for {} play!", result.mode).bright_yellow()
        )?;
    }
    Ok(())
}

pub fn write_login_history(
    out: &mut (impl Write + ?Sized),
    record: &PlayerRecord,
) -> io::Result<()> {
    heading(out, &format!("Login History for {}", record.username))?;
    if record.login_history.is_empty() {
        writeln!(out, "No login history available.")?;
    }
    for (i, millis) in record.login_history.iter().enumerate() {
        writeln!(out, "{}) {}", i + 1, format_timestamp(*millis))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eoc_game::BestRecord;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn player() -> PlayerRecord {
        let mut record = PlayerRecord::new("alice");
        record.set_best(GameMode::Single, BestRecord::new(2, 3_500));
        record.total_levels_played = 4;
        record.total_correct_choices = 3;
        record.total_time_millis = 10_000;
        record
    }

    #[test]
    fn leaderboard_console_lists_rows_with_seconds() {
        let boards = Leaderboards::build(&[player()]);
        let text = render(|out| write_leaderboards(out, &boards, ReportFormat::Console));
        assert!(text.contains("Single Leader Best Scores"));
        assert!(text.contains("alice"));
        assert!(text.contains("3.50"));
        assert!(text.contains("No scores yet."));
    }

    #[test]
    fn leaderboard_json_is_parseable() {
        let boards = Leaderboards::build(&[player()]);
        let text = render(|out| write_leaderboards(out, &boards, ReportFormat::Json));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["single"][0]["username"], "alice");
        assert_eq!(value["single"][0]["bestTimeMillis"], 3_500);
    }

    #[test]
    fn stats_show_two_decimal_figures() {
        let text = render(|out| write_player_stats(out, &player(), None, ReportFormat::Console));
        assert!(text.contains("Total Levels Played: 4"));
        assert!(text.contains("Accuracy: 75.00%"));
        assert!(text.contains("Average Time per Level: 2.50 seconds"));
    }

    #[test]
    fn archive_marks_skips() {
        let entry = ArchiveEntry {
            username: "alice".into(),
            leader: "Cyrus the Great".into(),
            level_number: 1,
            description: "Babylon".into(),
            historical_choice: "Divert the river".into(),
            summary: "The river was diverted.".into(),
            player_choice: String::new(),
            is_correct: false,
        };
        let text = render(|out| write_archive(out, &[&entry], ReportFormat::Console));
        assert!(text.contains("(skipped)"));
        assert!(text.contains("Divert the river"));
        let empty = render(|out| write_archive(out, &[], ReportFormat::Console));
        assert!(empty.contains("No matching archive entries."));
    }

    #[test]
    fn timestamps_use_date_time_layout() {
        let formatted = format_timestamp(1_700_000_000_000);
        assert_eq!(formatted.len(), "2023-11-14 22:13:20".len());
        assert_eq!(&formatted[4..5], "-");
        assert_eq!(&formatted[13..14], ":");
    }
}
