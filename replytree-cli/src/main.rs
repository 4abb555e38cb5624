use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use replytree_core::{
    Checkpoint, CheckpointStore, EmojiMapSource, FlattenShape, RenderOptions, ReplytreeError,
    StatePaths, VideoDomains, parse_handle, render_capture,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "replytree",
    version,
    about = "Rebuild reply threads from a timeline capture as a markdown document"
)]
struct Cli {
    /// Capture file (JSON array or JSON Lines) or a directory of capture chunks
    capture: PathBuf,

    /// Handle of the profile whose timeline was captured, e.g. @alice
    #[arg(long)]
    owner: String,

    /// Write the document to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// JSON object mapping emoji image URLs to Unicode emoji
    #[arg(long)]
    emoji_map: Option<PathBuf>,

    /// Thread layout: two-level or nested
    #[arg(long, default_value = "two-level")]
    shape: FlattenShape,

    /// Prefix repeated once per depth level
    #[arg(long, default_value = "> ")]
    indent: String,

    /// Skip posts up to the stored checkpoint and store a new one afterwards
    #[arg(long)]
    resume: bool,

    /// Skip posts up to and including this permalink
    #[arg(long, conflicts_with = "resume")]
    resume_from: Option<String>,

    /// With --resume-from, keep the named post itself
    #[arg(long, requires = "resume_from")]
    inclusive: bool,

    /// Host whose links are stripped from post bodies (repeatable; replaces the defaults)
    #[arg(long = "video-domain")]
    video_domains: Vec<String>,

    /// Log pipeline progress to stderr
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let use_json = std::env::var("LOG_FORMAT")
        .map(|value| matches!(value.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    let result = if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if let Err(err) = result {
        eprintln!("failed to initialize logging: {err}");
    }
}

fn run(cli: Cli) -> replytree_core::Result<()> {
    let owner = parse_handle(&cli.owner)?;

    let mut options = RenderOptions::new(owner.clone());
    options.shape = cli.shape;
    options.indent = cli.indent;
    if !cli.video_domains.is_empty() {
        options.video_domains = VideoDomains::new(&cli.video_domains);
    }

    let emoji_path = match cli.emoji_map {
        Some(path) => Some(path),
        None => StatePaths::from_env_or_home()
            .ok()
            .map(|paths| paths.emoji_map),
    };
    let emoji = EmojiMapSource::new(emoji_path);

    let store = if cli.resume {
        let paths = StatePaths::from_env_or_home()?;
        Some(CheckpointStore::open(&paths.checkpoint_db)?)
    } else {
        None
    };

    let checkpoint = match (&store, cli.resume_from) {
        (Some(store), _) => store.load(&owner)?,
        (None, Some(resume_id)) => Some(Checkpoint {
            resume_id,
            exclusive: !cli.inclusive,
        }),
        (None, None) => None,
    };

    let report = render_capture(&cli.capture, &options, &emoji, checkpoint.as_ref())?;
    for warning in &report.warnings {
        tracing::warn!("{warning}");
    }
    tracing::info!(
        sections = report.section_count,
        posts = report.post_count,
        "rendered capture"
    );

    match cli.output {
        Some(path) => fs::write(&path, &report.markdown)
            .map_err(|source| ReplytreeError::Io { path, source })?,
        None => print!("{}", report.markdown),
    }

    if let (Some(store), Some(next)) = (&store, &report.checkpoint) {
        store.save(&owner, next)?;
        tracing::debug!(path = %store.path().display(), resume_id = %next.resume_id, "stored checkpoint");
    }

    Ok(())
}
