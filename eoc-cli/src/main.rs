mod app;
mod console;
mod course;
mod reports;
mod settings;
mod storage;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use eoc_game::{ArchivePolicy, GameEngine, Locale, RecordsFormat, normalize_username};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::fs::File;
use std::io::{BufWriter, Write, stdin, stdout};
use std::path::PathBuf;

use app::{App, Engine};
use console::ConsoleUi;
use course::CourseMaterial;
use reports::ReportFormat;
use settings::{Overrides, Settings};
use storage::{FsContentLoader, FsStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LocaleArg {
    /// English leader content
    English,
    /// Arabic leader content
    Arabic,
}

impl From<LocaleArg> for Locale {
    fn from(arg: LocaleArg) -> Self {
        match arg {
            LocaleArg::English => Self::English,
            LocaleArg::Arabic => Self::Arabic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Keep one archive entry per player, leader and level
    Unique,
    /// Keep every answer ever given
    Append,
}

impl From<PolicyArg> for ArchivePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Unique => Self::Unique,
            PolicyArg::Append => Self::Append,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "echoes-of-command", version)]
#[command(about = "Historical decision trivia: choose what the leader actually did")]
struct Args {
    /// Settings file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding players.json, archive.json and stats.json
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory with history/course files overriding the built-in content
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Content language
    #[arg(long, value_enum)]
    locale: Option<LocaleArg>,

    /// How repeated answers are archived
    #[arg(long, value_enum)]
    archive_policy: Option<PolicyArg>,

    /// Seed for reproducible level and choice order
    #[arg(long)]
    seed: Option<u64>,

    /// Report format for non-interactive commands
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    format: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Command {
    /// Play interactively (default)
    Play,
    /// Print the best scores for every mode
    Leaderboard,
    /// Print one player's statistics
    Stats {
        #[arg(long)]
        user: String,
    },
    /// Search the decision archive
    Archive {
        /// Restrict to one player
        #[arg(long)]
        user: Option<String>,
        /// Case-insensitive keyword; empty lists everything
        #[arg(long, default_value = "")]
        keyword: String,
    },
    /// Print or export the course material
    Course {
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Rewrite legacy player records in the current format
    Migrate,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            data_dir: self.data_dir.clone(),
            content_dir: self.content_dir.clone(),
            locale: self.locale.map(Locale::from),
            archive_policy: self.archive_policy.map(ArchivePolicy::from),
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let settings = Settings::resolve(args.config.as_deref(), args.overrides())?;
    log::debug!("resolved settings: {settings:?}");

    match args.command.clone().unwrap_or(Command::Play) {
        Command::Play => play(&settings),
        Command::Leaderboard => {
            let engine = build_engine(&settings);
            let mut target = OutputTarget::new(args.output)?;
            reports::write_leaderboards(target.writer(), &engine.leaderboards(), args.format)?;
            target.flush_inner()?;
            Ok(())
        }
        Command::Stats { user } => {
            let username = normalize_username(&user)?;
            let engine = build_engine(&settings);
            let Some(record) = engine.player(&username) else {
                bail!("no player named {username}");
            };
            let snapshot = engine
                .stats_snapshots()
                .into_iter()
                .find(|s| s.username == username);
            let mut target = OutputTarget::new(args.output)?;
            reports::write_player_stats(target.writer(), record, snapshot.as_ref(), args.format)?;
            target.flush_inner()?;
            Ok(())
        }
        Command::Archive { user, keyword } => {
            let username = user.as_deref().map(normalize_username).transpose()?;
            let engine = build_engine(&settings);
            let hits = engine.search_archive(username.as_deref(), &keyword);
            let mut target = OutputTarget::new(args.output)?;
            reports::write_archive(target.writer(), &hits, args.format)?;
            target.flush_inner()?;
            Ok(())
        }
        Command::Course { export } => {
            let course = CourseMaterial::new(settings.content_dir.clone(), settings.locale);
            if let Some(dest) = export {
                if !course.export(&dest)? {
                    bail!("course material not found");
                }
                println!("Course material saved successfully to: {}", dest.display());
                return Ok(());
            }
            let Some(text) = course.text() else {
                bail!("course material not found");
            };
            let mut target = OutputTarget::new(args.output)?;
            write!(target.writer(), "{text}")?;
            target.flush_inner()?;
            Ok(())
        }
        Command::Migrate => migrate(&settings),
    }
}

fn build_engine(settings: &Settings) -> Engine {
    GameEngine::new(
        FsContentLoader::new(settings.content_dir.clone()),
        FsStorage::new(&settings.data_dir),
        settings.engine_settings(),
    )
}

fn play(settings: &Settings) -> Result<()> {
    let engine = build_engine(settings);
    let ui = ConsoleUi::new(stdin().lock(), stdout())?;
    let course = CourseMaterial::new(settings.content_dir.clone(), settings.locale);
    let rng = settings
        .seed
        .map_or_else(ChaCha20Rng::from_entropy, ChaCha20Rng::seed_from_u64);
    App::new(engine, ui, course, rng).run()
}

fn migrate(settings: &Settings) -> Result<()> {
    let storage = FsStorage::new(&settings.data_dir);
    match storage
        .records_format()
        .with_context(|| format!("cannot migrate {}", settings.data_dir.display()))?
    {
        None => {
            println!("No player records found in {}.", settings.data_dir.display());
            return Ok(());
        }
        Some(RecordsFormat::Canonical) => println!("Player records are already current."),
        Some(RecordsFormat::LegacyMap | RecordsFormat::LegacyList) => {
            println!("Converting legacy player records.");
        }
    }
    let engine = build_engine(settings);
    let count = engine.migrate_records().context("failed to write player records")?;
    println!("Saved {count} player record(s).");
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}
