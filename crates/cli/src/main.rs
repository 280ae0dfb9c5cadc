//! Binary entry point for the sentence practice tool.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use stepsentence_core::segment::merge_cues;
use stepsentence_core::srt::{self, format_time};
use stepsentence_core::store::ProjectStore;
use stepsentence_core::{Project, Sentence, SentenceStatus};
use tracing::trace;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Environment variable naming the data directory.
const HOME_ENV: &str = "STEPSENTENCE_HOME";

/// Command line options for the binary.
#[derive(Parser)]
struct Cli {
    /// Enable verbose debug and trace logs.
    #[arg(long, global = true)]
    debug: bool,

    /// Data directory for projects and imported audio.
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the cues parsed from a subtitle file.
    Cues { srt: PathBuf },

    /// Preview the sentence segments merged from a subtitle file.
    Segments {
        srt: PathBuf,
        /// Print segments as JSON.
        #[arg(long, conflicts_with = "srt_out")]
        json: bool,
        /// Print segments as SRT blocks.
        #[arg(long = "srt")]
        srt_out: bool,
    },

    /// Create a project from plain text (a file path or `-` for stdin).
    NewText {
        #[arg(long)]
        title: String,
        input: PathBuf,
    },

    /// Create a time-aligned project from an mp3 and its subtitles.
    NewAudio {
        /// Defaults to the audio file name.
        #[arg(long, default_value = "")]
        title: String,
        audio: PathBuf,
        srt: PathBuf,
    },

    /// List stored projects.
    List,

    /// Show a project's sentences.
    Show { id: Uuid },

    /// Delete a project with its recordings.
    Delete { id: Uuid },

    /// Attach a recorded take to a sentence (numbered from 1).
    Record {
        id: Uuid,
        number: usize,
        take: PathBuf,
    },

    /// Set the practice state of a sentence (numbered from 1).
    Mark {
        id: Uuid,
        number: usize,
        #[arg(value_enum)]
        status: MarkStatus,
    },

    /// Show the sentence after the given one.
    Next { id: Uuid, number: usize },
}

/// States a sentence can be moved to by hand.
#[derive(Clone, Copy, ValueEnum)]
enum MarkStatus {
    /// Delete the take and start over.
    NotStarted,
    NeedsReview,
    Approved,
}

impl From<MarkStatus> for SentenceStatus {
    fn from(status: MarkStatus) -> Self {
        match status {
            MarkStatus::NotStarted => SentenceStatus::NotStarted,
            MarkStatus::NeedsReview => SentenceStatus::NeedsReview,
            MarkStatus::Approved => SentenceStatus::Approved,
        }
    }
}

/// Resolve the store directory from the flag, the environment or the default.
fn store_root(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(HOME_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(".stepsentence"))
}

fn open_store(home: Option<PathBuf>) -> Result<ProjectStore> {
    let root = store_root(home);
    trace!("using store at {}", root.display());
    ProjectStore::open(root)
}

/// Convert a 1-based sentence number into its stored order.
fn order_of(number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("sentences are numbered from 1"))
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))
    }
}

fn print_sentence(sentence: &Sentence) {
    let timing = match (sentence.start_time_sec, sentence.end_time_sec) {
        (Some(start), Some(end)) => format!("{} --> {}", format_time(start), format_time(end)),
        _ => "-".to_string(),
    };
    println!(
        "{:>4}  {:<12} {}  {}",
        sentence.order + 1,
        sentence.status.to_string(),
        timing,
        sentence.text
    );
}

fn print_project(project: &Project) {
    println!(
        "{}  {}  [{}/{}]",
        project.id,
        project.title,
        project.completed_count(),
        project.total_count()
    );
}

/// Application entry point which parses CLI args and performs actions.
fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.debug {
        EnvFilter::default()
            .add_directive("stepsentence=trace".parse()?)
            .add_directive("stepsentence_core=trace".parse()?)
            .add_directive("info".parse()?)
    } else {
        EnvFilter::default()
            .add_directive("stepsentence=info".parse()?)
            .add_directive("stepsentence_core=info".parse()?)
            .add_directive("warn".parse()?)
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Cues { srt } => {
            for cue in srt::parse_file(&srt)? {
                println!(
                    "{}\t{} --> {}\t{}",
                    cue.index,
                    format_time(cue.start_sec),
                    format_time(cue.end_sec),
                    cue.text
                );
            }
        }
        Command::Segments { srt, json, srt_out } => {
            let segments = merge_cues(&srt::parse_file(&srt)?);
            if json {
                println!("{}", serde_json::to_string_pretty(&segments)?);
            } else if srt_out {
                print!("{}", srt::format_segments(&segments));
            } else {
                for segment in &segments {
                    println!(
                        "{} --> {}\t{}",
                        format_time(segment.start),
                        format_time(segment.end),
                        segment.text
                    );
                }
            }
        }
        Command::NewText { title, input } => {
            let body = read_input(&input)?;
            print_project(&open_store(cli.home)?.create_text_project(&title, &body)?);
        }
        Command::NewAudio { title, audio, srt } => {
            print_project(&open_store(cli.home)?.create_audio_project(&title, &audio, &srt)?);
        }
        Command::List => {
            for project in open_store(cli.home)?.list()? {
                print_project(&project);
            }
        }
        Command::Show { id } => {
            let project = open_store(cli.home)?.load(id)?;
            print_project(&project);
            for sentence in &project.sentences {
                print_sentence(sentence);
            }
        }
        Command::Delete { id } => open_store(cli.home)?.delete(id)?,
        Command::Record { id, number, take } => {
            let order = order_of(number)?;
            let project = open_store(cli.home)?.attach_recording(id, order, &take)?;
            if let Some(sentence) = project.sentences.iter().find(|s| s.order == order) {
                print_sentence(sentence);
            }
        }
        Command::Mark { id, number, status } => {
            let order = order_of(number)?;
            let project = open_store(cli.home)?.mark_sentence(id, order, status.into())?;
            print_project(&project);
        }
        Command::Next { id, number } => {
            let order = order_of(number)?;
            let project = open_store(cli.home)?.load(id)?;
            let current = project
                .sentences
                .iter()
                .find(|s| s.order == order)
                .ok_or_else(|| anyhow!("project {id} has no sentence {number}"))?;
            match project.next_sentence(current.id) {
                Some(next) => print_sentence(next),
                None => bail!("sentence {number} is the last one"),
            }
        }
    }
    Ok(())
}
