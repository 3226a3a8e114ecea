//! dirk - Fast directory listing and content-type sniffing.
//!
//! Usage:
//!   dirk [PATH]              List a directory
//!   dirk list [PATH] -r      List recursively
//!   dirk walk [PATH]         Print every path below PATH
//!   dirk stat PATH...        Print full file records as JSON
//!   dirk mime FILE...        Detect content types
//!   dirk mime --tree         Show the matcher tree
//!   dirk --help              Show help

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use itertools::Itertools;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use dirk_core::{File, Files, ListingConfig, SortOrder, WalkError};
use dirk_mime::Classifier;
use dirk_scan::{Lister, make_files};
use dirk_walk::{DirEntry, ErrorAction, Visitor, WalkControl, Walker};

#[derive(Parser)]
#[command(
    name = "dirk",
    version,
    about = "Fast directory listing and content-type sniffing",
    long_about = "dirk lists directories the way a terminal file manager sees them: \
                  every entry classified by content, sorted and numbered.\n\n\
                  Running `dirk [PATH]` is the same as `dirk list [PATH]`.",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    list: ListArgs,
}

#[derive(Subcommand)]
enum Command {
    /// List a directory
    List(ListArgs),

    /// Print every path below a directory with its entry type
    Walk {
        /// Directory to walk
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Descend into symlinked directories
        #[arg(short = 'L', long)]
        follow: bool,

        /// Do not descend into hidden directories
        #[arg(long)]
        no_hidden: bool,

        /// Directory names not to descend into
        #[arg(short = 'I', long = "ignore", value_name = "NAME")]
        ignore: Vec<String>,

        /// Keep directory read order instead of sorting
        #[arg(long)]
        unsorted: bool,
    },

    /// Print full file records as JSON
    Stat {
        /// Paths to describe
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Compute recursive directory sizes
        #[arg(long)]
        du: bool,
    },

    /// Detect content types
    Mime {
        /// Files to classify
        files: Vec<PathBuf>,

        /// Print the matcher tree instead
        #[arg(long)]
        tree: bool,
    },
}

#[derive(Args, Clone)]
struct ListArgs {
    /// Directory to list (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Include hidden entries
    #[arg(short, long)]
    all: bool,

    /// Leave directories out
    #[arg(long)]
    no_folders: bool,

    /// Leave non-directories out
    #[arg(long)]
    no_files: bool,

    /// Compute recursive directory sizes
    #[arg(long)]
    du: bool,

    /// Descend into symlinked directories
    #[arg(short = 'L', long)]
    follow: bool,

    /// Additional names to leave out
    #[arg(short = 'I', long = "ignore", value_name = "NAME")]
    ignore: Vec<String>,

    /// Reorder the listing
    #[arg(short, long)]
    sort: Option<SortArg>,

    /// Reverse the final order
    #[arg(long)]
    reverse: bool,

    /// Long format: permissions, size, modification time, mime type
    #[arg(short, long)]
    long: bool,

    /// Print the listing as JSON
    #[arg(long, conflicts_with = "long")]
    json: bool,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Load listing options from a TOML file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Size,
    Created,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortOrder::Name,
            SortArg::Size => SortOrder::Size,
            SortArg::Created => SortOrder::Created,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Command::List(args)) => run_list(args).await?,
        Some(Command::Walk {
            path,
            follow,
            no_hidden,
            ignore,
            unsorted,
        }) => {
            let walker = Walker::new(&path)
                .follow_symlinks(follow)
                .no_hidden(no_hidden)
                .ignore(ignore)
                .unsorted(unsorted);
            run_walk(&walker)?;
        }
        Some(Command::Stat { paths, du }) => run_stat(&paths, du)?,
        Some(Command::Mime { files, tree }) => run_mime(&files, tree)?,
        None => run_list(cli.list).await?,
    }

    Ok(())
}

/// Install the stderr subscriber. `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            ["dirk", "dirk_core", "dirk_walk", "dirk_mime", "dirk_scan"]
                .iter()
                .map(|target| format!("{target}={level}"))
                .join(","),
        )
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Build the listing config: file first, then command-line overrides.
fn listing_config(args: &ListArgs) -> Result<ListingConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read config {}", path.display()))?;
            toml::from_str::<ListingConfig>(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ListingConfig::default(),
    };

    config.recursive |= args.recursive;
    config.include_hidden |= args.all;
    config.disk_usage |= args.du;
    config.follow_symlinks |= args.follow;
    config.include_folders &= !args.no_folders;
    config.include_files &= !args.no_files;
    config.ignore.extend(args.ignore.iter().cloned());

    // Re-run builder validation over the merged values
    ListingConfig::builder()
        .include_folders(config.include_folders)
        .include_files(config.include_files)
        .include_hidden(config.include_hidden)
        .recursive(config.recursive)
        .disk_usage(config.disk_usage)
        .follow_symlinks(config.follow_symlinks)
        .ignore(config.ignore)
        .ignore_recursive(config.ignore_recursive)
        .build()
        .map_err(|e| eyre!("Invalid listing options: {e}"))
}

/// List a directory and print it.
async fn run_list(args: ListArgs) -> Result<()> {
    let config = listing_config(&args)?;
    let config_recursive = config.recursive;
    let lister = Lister::new();
    let pending = lister.list_async(&args.path, config);

    let mut files = match args.timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), pending)
            .await
            .map_err(|_| eyre!("Listing {} timed out after {secs}s", args.path.display()))?,
        None => pending.await,
    }
    .with_context(|| format!("Cannot list {}", args.path.display()))?;

    if let Some(order) = args.sort {
        files.sort(order.into());
    }
    if args.reverse {
        files.reverse();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else {
        print_listing(&files, args.long, config_recursive)?;
    }

    Ok(())
}

fn print_listing(files: &Files, long: bool, full_paths: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    for file in files {
        if long {
            writeln!(out, "{}", long_row(file, full_paths))?;
        } else {
            writeln!(out, "{} {}", file.icon, display_name(file, full_paths))?;
        }
    }
    Ok(())
}

fn long_row(file: &File, full_path: bool) -> String {
    let modified: DateTime<Local> = file.timestamps.modified.into();
    [
        file.permissions(),
        format!("{:>10}", file.size_iec),
        modified.format("%Y-%m-%d %H:%M").to_string(),
        format!("{:<24}", file.mime),
        format!("{} {}", file.icon, display_name(file, full_path)),
    ]
    .iter()
    .join("  ")
}

fn display_name(file: &File, full_path: bool) -> String {
    let name = if full_path {
        file.path.display().to_string()
    } else {
        file.name.to_string()
    };
    match (&file.link_target, file.is_dir) {
        (Some(target), _) => format!("{name} -> {}", target.display()),
        (None, true) => format!("{name}/"),
        (None, false) => name,
    }
}

/// Prints each visited node, skipping what cannot be read.
struct PathPrinter<W: Write> {
    out: W,
    errors: usize,
}

impl<W: Write> Visitor for PathPrinter<W> {
    fn visit(&mut self, path: &Path, entry: &DirEntry) -> Result<WalkControl, WalkError> {
        writeln!(self.out, "{:<12} {}", entry.kind(), path.display())
            .map_err(|e| WalkError::visitor(path, e))?;
        Ok(WalkControl::Continue)
    }

    fn on_error(&mut self, path: &Path, error: &WalkError) -> ErrorAction {
        warn!(path = %path.display(), error = %error, "skipped");
        self.errors += 1;
        ErrorAction::SkipNode
    }
}

fn run_walk(walker: &Walker) -> Result<()> {
    let mut printer = PathPrinter {
        out: io::BufWriter::new(io::stdout().lock()),
        errors: 0,
    };
    walker.walk(&mut printer).context("Walk failed")?;
    printer.out.flush()?;

    if printer.errors > 0 {
        eprintln!("{} path(s) could not be read", printer.errors);
    }
    Ok(())
}

fn run_stat(paths: &[PathBuf], disk_usage: bool) -> Result<()> {
    let files = make_files(paths, &Classifier::new(), disk_usage).context("Cannot stat")?;
    println!("{}", serde_json::to_string_pretty(&files)?);
    Ok(())
}

fn run_mime(paths: &[PathBuf], tree: bool) -> Result<()> {
    let classifier = Classifier::new();
    if tree {
        print!("{}", classifier.tree());
        return Ok(());
    }
    if paths.is_empty() {
        return Err(eyre!("No files given (use --tree to show the matcher tree)"));
    }

    for path in paths {
        let detection = classifier.detect_file(path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "using fallback type");
            err.fallback
        });
        let extension = if detection.extension.is_empty() {
            String::new()
        } else {
            format!(" (.{})", detection.extension)
        };
        println!("{}: {}{extension}", path.display(), detection.mime);
    }
    Ok(())
}
