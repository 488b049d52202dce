//! shatree - build a SHA-1 content tree of a directory.
//!
//! Usage:
//!   shatree hash [PATH]              Print the digest of every file
//!   shatree lookup NAME [-r ROOT]    Show one node of the tree
//!   shatree duplicates [PATH]        List files with identical content
//!   shatree --help                   Show help

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use shatree_scan::{NodeRef, PatternFilter, RootNode, TreeConfig, WarningKind};

#[derive(Parser)]
#[command(
    name = "shatree",
    version,
    about = "Build an in-memory SHA-1 content tree of a directory",
    long_about = "shatree walks a directory, records every regular file with its \
                  metadata and lazily computed SHA-1 digest, and answers lookups \
                  by path. Symbolic links are never followed and never hashed."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the digest of every file in the tree
    Hash {
        /// Directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        walk: WalkArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a single node by its path relative to the root
    Lookup {
        /// Path of the node (`.` for the root)
        name: PathBuf,

        /// Directory to scan
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        #[command(flatten)]
        walk: WalkArgs,
    },

    /// List groups of files with identical content
    Duplicates {
        /// Directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        walk: WalkArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(clap::Args)]
struct WalkArgs {
    /// Skip hidden files and directories
    #[arg(long)]
    no_hidden: bool,

    /// Glob pattern of names to skip (repeatable)
    #[arg(short, long = "ignore", value_name = "GLOB")]
    ignore: Vec<String>,

    /// Maximum depth to descend
    #[arg(short = 'd', long)]
    max_depth: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
struct HashRecord<'a> {
    path: &'a Path,
    size: u64,
    sha1: String,
}

#[derive(Serialize)]
struct DuplicateRecord {
    sha1: String,
    paths: Vec<PathBuf>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Hash { path, walk, format } => run_hash(&path, &walk, format)?,
        Command::Lookup { name, root, walk } => run_lookup(&root, &name, &walk)?,
        Command::Duplicates { path, walk, format } => run_duplicates(&path, &walk, format)?,
    }

    Ok(())
}

/// Install the stderr log subscriber.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the tree for `path` with the walk options applied.
fn build_tree(path: &Path, walk: &WalkArgs) -> Result<RootNode> {
    let filter =
        PatternFilter::new(&walk.ignore, !walk.no_hidden).context("Invalid ignore pattern")?;

    let config = TreeConfig::builder()
        .root(path)
        .max_depth(walk.max_depth)
        .build()
        .context("Invalid configuration")?;

    let mut root = RootNode::with_config(config);
    root.build(filter)
        .with_context(|| format!("Failed to build tree for {}", path.display()))?;

    for warning in root.warnings() {
        if warning.kind == WarningKind::ReadError {
            tracing::warn!(path = %warning.path.display(), "{}", warning.message);
        }
    }

    Ok(root)
}

/// Print the digest of every file.
fn run_hash(path: &Path, walk: &WalkArgs, format: OutputFormat) -> Result<()> {
    let root = build_tree(path, walk)?;

    let mut records = Vec::with_capacity(root.file_count());
    for file in root.as_dir().walk_files() {
        let hash = file
            .hashval()
            .with_context(|| format!("Failed to hash {}", file.full_path().display()))?;
        records.push(HashRecord {
            path: file.path(),
            size: file.size(),
            sha1: hash.to_hex(),
        });
    }

    match format {
        OutputFormat::Text => {
            for record in &records {
                println!("{}  {}", record.sha1, record.path.display());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    report_skipped(&root);
    Ok(())
}

/// Show one node.
fn run_lookup(root_path: &Path, name: &Path, walk: &WalkArgs) -> Result<()> {
    let root = build_tree(root_path, walk)?;
    let node = root.by_path(name)?;

    match node {
        NodeRef::Dir(dir) => {
            println!("{}/", dir.path().display());
            println!("  type:        directory");
            println!("  files:       {}", dir.file_count());
            println!("  directories: {}", dir.dir_count());
            for child in dir.dirs() {
                println!("    {}/", child.name().to_string_lossy());
            }
            for file in dir.files() {
                println!("    {}", file.name().to_string_lossy());
            }
        }
        NodeRef::File(file) => {
            let meta = file.meta();
            let modified = chrono::DateTime::<chrono::Local>::from(meta.modified);
            let hash = file
                .hashval()
                .with_context(|| format!("Failed to hash {}", file.full_path().display()))?;

            println!("{}", file.path().display());
            println!("  type:     file");
            println!("  size:     {} ({} bytes)", format_size(meta.size), meta.size);
            println!("  mode:     {:o}", meta.mode);
            println!("  modified: {}", modified.format("%Y-%m-%d %H:%M:%S"));
            println!("  sha1:     {}", hash);
        }
    }

    Ok(())
}

/// Hash everything and print groups of identical files.
fn run_duplicates(path: &Path, walk: &WalkArgs, format: OutputFormat) -> Result<()> {
    let root = build_tree(path, walk)?;

    eprintln!("Hashing {} files...", root.file_count());
    root.hash_all().context("Hashing failed")?;
    let groups = root.duplicates();

    match format {
        OutputFormat::Text => {
            if groups.is_empty() {
                println!("No duplicate files found.");
            } else {
                for (i, group) in groups.iter().enumerate() {
                    println!("Group {} ({} files, {})", i + 1, group.count(), group.hash);
                    for path in &group.paths {
                        println!("  {}", path.display());
                    }
                }
            }
        }
        OutputFormat::Json => {
            let records: Vec<DuplicateRecord> = groups
                .into_iter()
                .map(|g| DuplicateRecord {
                    sha1: g.hash.to_hex(),
                    paths: g.paths,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    report_skipped(&root);
    Ok(())
}

/// Mention skipped entries on stderr, like a scan summary footer.
fn report_skipped(root: &RootNode) {
    let skipped = root.warnings().len();
    if skipped > 0 {
        eprintln!("{skipped} entr{} skipped", if skipped == 1 { "y" } else { "ies" });
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_hash_with_ignores() {
        let cli = Cli::try_parse_from([
            "shatree", "-v", "hash", "/tmp", "-i", "*.log", "--no-hidden", "-d", "2",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Hash { path, walk, format } => {
                assert_eq!(path, PathBuf::from("/tmp"));
                assert_eq!(walk.ignore, vec!["*.log".to_string()]);
                assert!(walk.no_hidden);
                assert_eq!(walk.max_depth, Some(2));
                assert!(matches!(format, OutputFormat::Text));
            }
            _ => panic!("expected hash command"),
        }
    }

    #[test]
    fn test_lookup_requires_name() {
        assert!(Cli::try_parse_from(["shatree", "lookup"]).is_err());
    }
}
