//! # markify
//!
//! A CLI front end for the markify library: turns plain text files into
//! markdown and exposes the individual detectors and the formatting editor.
//!
//! ## Overview
//!
//! `markify` reads each input, asks the markdown detector whether the text
//! already is markdown and, unless `--force` is given, passes such input
//! through untouched. Everything else runs through the conversion pipeline.
//!
//! ## Flow
//!
//! ```text
//! Input → Markdown Detection ──(markdown)──→ Output unchanged
//!                 │
//!              (plain)
//!                 ↓
//!         Conversion Pipeline → Output
//!           title, segment, whitespace, tables, headings, lists, tasks,
//!           emphasis, links, images, blockquotes, rules, inline code
//! ```
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | General error (file not found, permission denied, I/O error) |
//! | 2 | Invalid command-line arguments |
//! | 3 | Dry-run mode: changes would be made |
//! | 4 | Parse error (invalid UTF-8, binary or oversized input) |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use anyhow::{Context, Result};
use clap::ValueEnum;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use log::debug;
use markify::{Action, FormatOptions, apply_formatting, convert_with_report, detect};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rich_rust::terminal;
use rich_rust::{ColorSystem, Console};
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

// ─────────────────────────────────────────────────────────────────────────────
// Exit Codes
// ─────────────────────────────────────────────────────────────────────────────

/// Semantic exit codes for scripting and CI integration
mod exit_codes {
    /// Success - completed without errors
    pub const SUCCESS: i32 = 0;
    /// General error (file not found, permission denied, I/O error)
    pub const ERROR: i32 = 1;
    /// Invalid command-line arguments
    pub const INVALID_ARGS: i32 = 2;
    /// Dry-run mode: changes would be made
    pub const WOULD_CHANGE: i32 = 3;
    /// Parse error (invalid UTF-8, binary or oversized input)
    pub const PARSE_ERROR: i32 = 4;
}

#[derive(Debug)]
struct ArgError(String);

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ArgError {}

#[derive(Debug)]
struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug)]
struct RunOutcome {
    dry_run: bool,
    would_change: bool,
}

fn error_chain_has<T: std::error::Error + 'static>(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<T>())
}

fn exit_code_for_error(err: &anyhow::Error) -> i32 {
    if error_chain_has::<ArgError>(err) {
        exit_codes::INVALID_ARGS
    } else if error_chain_has::<ParseError>(err) {
        exit_codes::PARSE_ERROR
    } else {
        exit_codes::ERROR
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CLI Arguments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ColorMode {
    /// Auto-detect color support
    Auto,
    /// Always emit colors (even when not a TTY)
    Always,
    /// Never emit colors
    Never,
}

/// Convert plain text into markdown
#[derive(Parser, Debug)]
#[command(
    name = "markify",
    version,
    about,
    long_about = None,
    after_help = "EXIT CODES:\n  0  Success\n  1  General error (file not found, permission denied, I/O error)\n  2  Invalid command-line arguments\n  3  Dry-run mode: changes would be made\n  4  Parse error (invalid UTF-8, binary or oversized input)\n"
)]
struct Args {
    /// Input file(s). Reads from stdin if not provided.
    /// Multiple files can be specified.
    #[arg(value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Path to config file (default: search for .markifyrc)
    #[arg(long = "config", value_name = "FILE")]
    config_file: Option<PathBuf>,

    /// Ignore config files
    #[arg(long = "no-config")]
    no_config: bool,

    /// Process files recursively in directories
    #[arg(short = 'r', long)]
    recursive: bool,

    /// Glob pattern to match files when recursing (comma-separated)
    #[arg(long, default_value = "*.txt", requires = "recursive")]
    glob: String,

    /// Do not respect .gitignore when recursing
    #[arg(long = "no-gitignore", requires = "recursive")]
    no_gitignore: bool,

    /// Maximum directory depth (0 = unlimited)
    #[arg(long, default_value = "0", requires = "recursive")]
    max_depth: usize,

    /// Edit file(s) in place
    #[arg(short = 'i', long)]
    in_place: bool,

    /// Convert input even when it already reads as markdown
    #[arg(short = 'f', long)]
    force: bool,

    /// Verbose output showing conversion progress
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Color output: auto, always, or never
    #[arg(long, value_enum, default_value = "auto")]
    color: ColorMode,

    /// Show unified diff of changes instead of full output
    #[arg(short = 'd', long)]
    diff: bool,

    /// Preview changes without modifying files (exit 0=no changes, 3=would change)
    #[arg(short = 'n', long, conflicts_with = "in_place")]
    dry_run: bool,

    /// Watch file for changes and convert it in place
    #[arg(short = 'w', long, conflicts_with_all = ["in_place", "recursive", "diff", "dry_run", "json"])]
    watch: bool,

    /// Debounce interval in milliseconds (for --watch mode)
    #[arg(long, default_value = "500", requires = "watch")]
    debounce_ms: u64,

    /// Create backup file before in-place editing
    #[arg(long, requires = "in_place")]
    backup: bool,

    /// Extension for backup files (default: .bak)
    #[arg(long, default_value = ".bak", requires = "backup")]
    backup_ext: String,

    /// Output results as JSON for programmatic processing
    #[arg(long, conflicts_with_all = ["verbose", "diff"])]
    json: bool,

    /// Subcommand (single detectors, editor, configuration)
    #[command(subcommand)]
    command: Option<Commands>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommands
// ─────────────────────────────────────────────────────────────────────────────

/// Available subcommands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Report whether the input already reads as markdown
    Detect {
        /// Input file (stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rewrite delimited tabular runs as pipe tables
    Tables {
        /// Input file (stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Wrap unfenced code in fenced blocks
    Code {
        /// Input file (stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Print the block structure of markdown input as JSON
    Blocks {
        /// Input file (stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Apply one formatting action to a selection and print the edit as JSON
    Format {
        /// Action name (heading, bold, italic, code, link, image, unorderedList,
        /// orderedList, taskList, quote, codeBlock, table, horizontalRule)
        action: String,

        /// Selection start (byte offset)
        #[arg(long)]
        start: usize,

        /// Selection end (byte offset)
        #[arg(long)]
        end: usize,

        /// Heading level for the heading action (1-6)
        #[arg(long)]
        level: Option<u8>,

        /// Replacement URL when re-editing a link or image
        #[arg(long)]
        url: Option<String>,

        /// Input file (stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },
}

/// Config management actions
#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Initialize a new .markifyrc config file
    Init {
        /// Create in home directory instead of current
        #[arg(long)]
        global: bool,
    },
    /// Show effective configuration (merged file + CLI)
    Show,
    /// Show path to active config file
    Path,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration and Statistics
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime configuration derived from CLI args
#[derive(Debug)]
struct Config {
    force: bool,
    recursive: bool,
    glob: String,
    gitignore: bool,
    max_depth: usize,
    color: ColorMode,
    verbose: bool,
    diff: bool,
    dry_run: bool,
    watch: bool,
    debounce_ms: u64,
    backup: bool,
    backup_ext: String,
    json: bool,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            force: args.force,
            recursive: args.recursive,
            glob: args.glob.clone(),
            gitignore: !args.no_gitignore,
            max_depth: args.max_depth,
            color: args.color,
            verbose: args.verbose,
            diff: args.diff,
            dry_run: args.dry_run,
            watch: args.watch,
            debounce_ms: args.debounce_ms,
            backup: args.backup,
            backup_ext: args.backup_ext.clone(),
            json: args.json,
        }
    }
}

struct VerboseStyle {
    use_color: bool,
}

impl VerboseStyle {
    fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn wrap(&self, tag: &str, text: impl fmt::Display) -> String {
        if self.use_color {
            format!("[{}]{}[/]", tag, text)
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: impl fmt::Display) -> String {
        self.wrap("bold cyan", text)
    }

    fn changed(&self, text: impl fmt::Display) -> String {
        self.wrap("yellow", text)
    }

    fn success(&self, text: impl fmt::Display) -> String {
        self.wrap("bold green", text)
    }

    fn dim(&self, text: impl fmt::Display) -> String {
        self.wrap("dim", text)
    }

    fn bold(&self, text: impl fmt::Display) -> String {
        self.wrap("bold", text)
    }

    fn stat_label(&self, text: impl fmt::Display) -> String {
        self.wrap("bold blue", text)
    }

    fn separator(&self) -> String {
        self.wrap("dim", "───")
    }
}

/// Print a statistics summary to stderr
fn print_stats_summary(
    stats: &Stats,
    files_processed: usize,
    files_changed: usize,
    errors: usize,
    console: &Console,
    styles: &VerboseStyle,
) {
    console.print("");
    console.print(&format!(
        "{} Summary {}",
        styles.separator(),
        styles.separator()
    ));

    if files_processed > 1 {
        console.print(&format!(
            "  {} {} processed, {} modified, {} unchanged",
            styles.stat_label("Files:"),
            files_processed,
            files_changed,
            files_processed.saturating_sub(files_changed)
        ));
    }

    console.print(&format!(
        "  {} {} converted, {} already markdown",
        styles.stat_label("Inputs:"),
        stats.converted,
        stats.passed_through
    ));

    console.print(&format!(
        "  {} {} pass(es) changed the text",
        styles.stat_label("Passes:"),
        stats.passes_changed
    ));

    console.print(&format!(
        "  {} {} in, {} out",
        styles.stat_label("Lines:"),
        stats.lines_in,
        stats.lines_out
    ));

    let elapsed_ms = stats.elapsed.as_secs_f64() * 1000.0;
    let lines_per_sec = stats.lines_per_second();
    console.print(&format!(
        "  {} {:.2}ms ({:.0} lines/sec)",
        styles.stat_label("Time:"),
        elapsed_ms,
        lines_per_sec
    ));

    if errors > 0 {
        console.print(&format!(
            "  {} {}",
            styles.wrap("bold red", "Errors:"),
            errors
        ));
    }

    console.print("");
}

fn build_console(color: ColorMode) -> (Console, VerboseStyle) {
    match color {
        ColorMode::Never => (Console::new(), VerboseStyle::new(false)),
        ColorMode::Always => {
            let system = terminal::detect_color_system().unwrap_or(ColorSystem::Standard);
            let console = Console::builder()
                .force_terminal(true)
                .color_system(system)
                .build();
            (console, VerboseStyle::new(true))
        }
        ColorMode::Auto => {
            if std::env::var("NO_COLOR").is_ok() {
                return (Console::new(), VerboseStyle::new(false));
            }

            if std::env::var("FORCE_COLOR").is_ok() {
                let system = terminal::detect_color_system().unwrap_or(ColorSystem::Standard);
                let console = Console::builder()
                    .force_terminal(true)
                    .color_system(system)
                    .build();
                return (console, VerboseStyle::new(true));
            }

            let console = Console::new();
            let use_color = console.is_color_enabled();
            (console, VerboseStyle::new(use_color))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config File Support
// ─────────────────────────────────────────────────────────────────────────────

/// Config file names searched in order
const CONFIG_FILENAMES: &[&str] = &[".markifyrc", ".markifyrc.toml", "markifyrc.toml"];

const DEFAULT_GLOB: &str = "*.txt";
const DEFAULT_BACKUP_EXT: &str = ".bak";

/// Configuration loaded from a .markifyrc file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    /// Convert even when the input already reads as markdown
    force: Option<bool>,
    /// Show verbose output
    verbose: Option<bool>,
    /// Color mode: auto, always, never
    color: Option<ColorMode>,
    /// Output as JSON
    json: Option<bool>,
    /// Create backup before in-place edit
    backup: Option<bool>,
    /// Backup file extension
    backup_ext: Option<String>,
    /// Enable recursive mode
    recursive: Option<bool>,
    /// Glob patterns for recursive mode
    glob: Option<String>,
    /// Respect .gitignore
    gitignore: Option<bool>,
    /// Maximum directory depth
    max_depth: Option<usize>,
}

/// Search `start_dir`, then each ancestor, then the home directory
fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let home = dirs::home_dir();
    start_dir
        .ancestors()
        .chain(home.as_deref())
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.exists())
}

/// Load and parse a config file
fn load_config_file(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Directory the config lookup starts from: the first input's directory,
/// or the working directory for stdin.
fn config_search_dir(args: &Args) -> PathBuf {
    args.inputs
        .first()
        .and_then(|input| {
            if input.is_dir() {
                Some(input.as_path())
            } else {
                input.parent()
            }
        })
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default())
}

/// Overwrite `slot` with the file's value unless the flag was given on the CLI
fn fill_default<T>(slot: &mut T, set_on_cli: bool, from_file: Option<T>) {
    if set_on_cli {
        return;
    }
    if let Some(value) = from_file {
        *slot = value;
    }
}

/// Create Config by merging file config with CLI args (CLI wins)
fn create_config(args: &Args) -> Result<Config> {
    let mut config = Config::from(args);
    if args.no_config {
        return Ok(config);
    }

    let path = match &args.config_file {
        Some(path) if !path.exists() => {
            anyhow::bail!("Config file not found: {}", path.display())
        }
        Some(path) => path.clone(),
        None => match find_config_file(&config_search_dir(args)) {
            Some(path) => path,
            None => return Ok(config),
        },
    };

    debug!("loading config file {}", path.display());
    let file = load_config_file(&path)?;

    fill_default(&mut config.force, args.force, file.force);
    fill_default(&mut config.verbose, args.verbose, file.verbose);
    fill_default(&mut config.color, args.color != ColorMode::Auto, file.color);
    fill_default(&mut config.json, args.json, file.json);
    fill_default(&mut config.backup, args.backup, file.backup);
    fill_default(
        &mut config.backup_ext,
        args.backup_ext != DEFAULT_BACKUP_EXT,
        file.backup_ext,
    );
    fill_default(&mut config.recursive, args.recursive, file.recursive);
    fill_default(&mut config.glob, args.glob != DEFAULT_GLOB, file.glob);
    fill_default(&mut config.gitignore, args.no_gitignore, file.gitignore);
    fill_default(&mut config.max_depth, args.max_depth != 0, file.max_depth);

    Ok(config)
}

/// Default config file content
const DEFAULT_CONFIG: &str = r#"# .markifyrc - markify configuration file

# Convert input even when it already reads as markdown
# force = false

# Output options
# verbose = false
# color = "auto"
# json = false

# Backup options (for --in-place)
# backup = false
# backup_ext = ".bak"

# Recursive mode defaults
# recursive = false
# glob = "*.txt"
# gitignore = true
# max_depth = 0
"#;

/// Handle the config subcommand
fn run_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { global } => {
            let path = if *global {
                dirs::home_dir()
                    .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
                    .join(".markifyrc")
            } else {
                PathBuf::from(".markifyrc")
            };

            if path.exists() {
                return Err(anyhow::anyhow!(
                    "Config file already exists: {}",
                    path.display()
                ));
            }

            fs::write(&path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to create config file: {}", path.display()))?;

            eprintln!("Created config file: {}", path.display());
            Ok(())
        }

        ConfigAction::Show => {
            let args = Args::parse_from(["markify"]);
            let config = create_config(&args)?;

            eprintln!("Effective configuration:");
            eprintln!("  force: {}", config.force);
            eprintln!("  verbose: {}", config.verbose);
            eprintln!("  color: {:?}", config.color);
            eprintln!("  json: {}", config.json);
            eprintln!("  backup: {}", config.backup);
            eprintln!("  backup_ext: {}", config.backup_ext);
            eprintln!("  recursive: {}", config.recursive);
            eprintln!("  glob: {}", config.glob);
            eprintln!("  gitignore: {}", config.gitignore);
            eprintln!("  max_depth: {}", config.max_depth);

            let start_dir = std::env::current_dir().unwrap_or_default();
            if let Some(path) = find_config_file(&start_dir) {
                eprintln!();
                eprintln!("Config file: {}", path.display());
            }

            Ok(())
        }

        ConfigAction::Path => {
            let start_dir = std::env::current_dir().unwrap_or_default();
            match find_config_file(&start_dir) {
                Some(path) => {
                    println!("{}", path.display());
                    Ok(())
                }
                None => Err(anyhow::anyhow!("No config file found")),
            }
        }
    }
}

fn validate_args(args: &Args) -> Result<()> {
    if args.in_place && args.inputs.is_empty() {
        return Err(ArgError("--in-place requires at least one input file".to_string()).into());
    }

    if args.recursive && args.inputs.is_empty() {
        return Err(ArgError("--recursive requires at least one input path".to_string()).into());
    }

    if args.watch && args.inputs.len() != 1 {
        return Err(ArgError("--watch requires exactly one input file".to_string()).into());
    }

    if args.debounce_ms == 0 {
        return Err(ArgError("--debounce-ms must be at least 1".to_string()).into());
    }

    if args.backup_ext.is_empty() {
        return Err(ArgError("--backup-ext must not be empty".to_string()).into());
    }

    Ok(())
}

/// Statistics collected during conversion
#[derive(Default, Clone)]
struct Stats {
    /// Inputs that went through the pipeline
    converted: usize,
    /// Inputs passed through because they already read as markdown
    passed_through: usize,
    /// Pipeline passes that changed the text, summed over inputs
    passes_changed: usize,
    /// Lines read
    lines_in: usize,
    /// Lines written
    lines_out: usize,
    /// Processing elapsed time
    elapsed: Duration,
}

impl Stats {
    /// Merge another Stats into this one (for aggregating across files)
    fn merge(&mut self, other: &Stats) {
        self.converted += other.converted;
        self.passed_through += other.passed_through;
        self.passes_changed += other.passes_changed;
        self.lines_in += other.lines_in;
        self.lines_out += other.lines_out;
        self.elapsed += other.elapsed;
    }

    /// Calculate lines processed per second
    fn lines_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.lines_in as f64 / secs
        } else {
            self.lines_in as f64
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON Output Structures
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonOutput {
    version: &'static str,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    input: InputStats,
    processing: ProcessingStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<OutputStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Serialize)]
struct InputStats {
    lines: usize,
    bytes: usize,
    already_markdown: bool,
}

#[derive(Serialize)]
struct ProcessingStats {
    converted: bool,
    passes_changed: Vec<&'static str>,
}

#[derive(Serialize)]
struct OutputStats {
    lines: usize,
    bytes: usize,
    changed: bool,
}

#[derive(Serialize)]
struct DetectOutput {
    markdown: bool,
    categories: Vec<&'static str>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Recursive File Discovery
// ─────────────────────────────────────────────────────────────────────────────

fn build_globset(patterns: &str) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let mut added = 0;

    for raw in patterns.split(',') {
        let pattern = raw.trim();
        if pattern.is_empty() {
            continue;
        }

        let glob = Glob::new(pattern)
            .map_err(|err| ArgError(format!("Invalid glob pattern '{}': {}", pattern, err)))?;
        builder.add(glob);
        added += 1;
    }

    if added == 0 {
        return Err(ArgError("--glob must include at least one pattern".to_string()).into());
    }

    builder
        .build()
        .map_err(|err| ArgError(format!("Invalid glob set: {}", err)).into())
}

/// Files under `root` whose name matches `globs`, honouring the ignore settings.
fn walk_matching(
    root: &Path,
    globs: &GlobSet,
    config: &Config,
    console: &Console,
    styles: &VerboseStyle,
) -> Vec<PathBuf> {
    let mut walker = WalkBuilder::new(root);
    walker
        .standard_filters(config.gitignore)
        .hidden(false)
        .max_depth((config.max_depth > 0).then_some(config.max_depth));

    walker
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                if config.verbose {
                    console.print(&styles.dim(format!("Warning: {}", err)));
                }
                None
            }
        })
        .filter(|entry| entry.path().is_file() && globs.is_match(entry.file_name()))
        .map(ignore::DirEntry::into_path)
        .collect()
}

/// Expand the CLI paths into a sorted, de-duplicated file list.
fn discover_recursive_files(
    paths: &[PathBuf],
    config: &Config,
    console: &Console,
    styles: &VerboseStyle,
) -> Result<Vec<PathBuf>> {
    let globs = build_globset(&config.glob)?;
    let mut files = std::collections::BTreeSet::new();

    for path in paths {
        if path.is_file() {
            files.insert(path.clone());
        } else if path.is_dir() {
            files.extend(walk_matching(path, &globs, config, console, styles));
        } else if config.verbose {
            console.print(&styles.dim(format!("Warning: path does not exist: {}", path.display())));
        }
    }

    debug!("recursive discovery matched {} file(s)", files.len());
    Ok(files.into_iter().collect())
}

// ─────────────────────────────────────────────────────────────────────────────
// Input and Backup
// ─────────────────────────────────────────────────────────────────────────────

/// Copy `path` to the same name with `ext` appended ("notes.txt" → "notes.txt.bak").
fn create_backup(path: &Path, ext: &str) -> Result<PathBuf> {
    let mut backup_name = path.as_os_str().to_owned();
    backup_name.push(ext);
    let backup_path = PathBuf::from(backup_name);

    fs::copy(path, &backup_path)
        .with_context(|| format!("Failed to create backup at {}", backup_path.display()))?;

    Ok(backup_path)
}

/// Maximum file size (100 MB)
const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Read a whole file as text
fn read_file(path: &Path) -> Result<String> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to read file metadata: {}", path.display()))?;

    if metadata.len() > MAX_FILE_SIZE {
        return Err(ParseError(format!(
            "File too large: {} ({} MB). Maximum supported size is {} MB.",
            path.display(),
            metadata.len() / (1024 * 1024),
            MAX_FILE_SIZE / (1024 * 1024)
        ))
        .into());
    }

    let bytes =
        fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;

    parse_bytes_to_text(bytes, &path.display().to_string())
}

/// Read all of stdin as text
fn read_stdin_content() -> Result<String> {
    let mut buf = Vec::new();
    io::stdin()
        .read_to_end(&mut buf)
        .context("Failed to read stdin")?;
    if buf.len() as u64 > MAX_FILE_SIZE {
        return Err(ParseError(format!(
            "Input too large: stdin. Maximum supported size is {} MB.",
            MAX_FILE_SIZE / (1024 * 1024)
        ))
        .into());
    }
    parse_bytes_to_text(buf, "stdin")
}

/// Read a file, or stdin when no path is given
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => read_file(path),
        None => read_stdin_content(),
    }
}

/// Reject binary and non-UTF-8 input
fn parse_bytes_to_text(bytes: Vec<u8>, source_label: &str) -> Result<String> {
    if bytes.contains(&0) {
        return Err(ParseError(format!("Input appears to be binary: {}", source_label)).into());
    }

    String::from_utf8(bytes).map_err(|err| {
        let utf8_err = err.utf8_error();
        let valid_up_to = utf8_err.valid_up_to();
        let byte = err.as_bytes().get(valid_up_to).copied();
        let detail = match byte {
            Some(b) => format!(
                "Invalid UTF-8 at byte position {} (byte value: 0x{:02X}) in {}",
                valid_up_to, b, source_label
            ),
            None => format!("Invalid UTF-8 in {}", source_label),
        };
        ParseError(detail).into()
    })
}

/// Normalise to exactly one trailing newline (none for empty text)
fn with_trailing_newline(text: &str) -> String {
    let trimmed = text.trim_end_matches('\n');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}

fn count_lines(text: &str) -> usize {
    text.lines().count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommands
// ─────────────────────────────────────────────────────────────────────────────

/// Run a subcommand
fn run_command(command: &Commands) -> Result<()> {
    match command {
        Commands::Config { action } => run_config_command(action),
        Commands::Detect { input, json } => {
            let text = read_input(input.as_deref())?;
            let detection = detect::detect(&text);
            let categories: Vec<&'static str> =
                detection.categories.iter().map(|c| c.name()).collect();

            if *json {
                let report = DetectOutput {
                    markdown: detection.is_markdown,
                    categories,
                };
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report)
                        .context("Failed to serialize JSON output")?
                );
            } else {
                println!(
                    "{}",
                    if detection.is_markdown {
                        "markdown"
                    } else {
                        "plain"
                    }
                );
                if !categories.is_empty() {
                    println!("categories: {}", categories.join(", "));
                }
            }
            Ok(())
        }
        Commands::Tables { input } => {
            let text = read_input(input.as_deref())?;
            print!("{}", with_trailing_newline(&markify::detect_tables(&text)));
            Ok(())
        }
        Commands::Code { input } => {
            let text = read_input(input.as_deref())?;
            print!(
                "{}",
                with_trailing_newline(&markify::detect_code_blocks(&text))
            );
            Ok(())
        }
        Commands::Blocks { input } => {
            let text = read_input(input.as_deref())?;
            let blocks = markify::parse_blocks(&text);
            println!(
                "{}",
                serde_json::to_string_pretty(&blocks).context("Failed to serialize blocks")?
            );
            Ok(())
        }
        Commands::Format {
            action,
            start,
            end,
            level,
            url,
            input,
        } => {
            let options = FormatOptions {
                level: *level,
                url: url.clone(),
            };
            let action = Action::parse_with(action, &options)
                .map_err(|err| ArgError(err.to_string()))?;
            if start > end {
                return Err(ArgError(format!(
                    "--start ({}) must not be greater than --end ({})",
                    start, end
                ))
                .into());
            }

            let text = read_input(input.as_deref())?;
            let edit = apply_formatting(&text, *start, *end, action, &options);
            println!(
                "{}",
                serde_json::to_string_pretty(&edit).context("Failed to serialize edit")?
            );
            Ok(())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry Point
// ─────────────────────────────────────────────────────────────────────────────

/// Result of processing a single file or stdin
struct FileResult {
    filename: String,
    original: String,
    converted: String,
    already_markdown: bool,
    passes_changed: Vec<&'static str>,
    stats: Stats,
    would_change: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit_codes::SUCCESS,
                _ => exit_codes::INVALID_ARGS,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    if let Some(command) = &args.command {
        let exit_code = match run_command(command) {
            Ok(()) => exit_codes::SUCCESS,
            Err(err) => {
                eprintln!("Error: {:#}", err);
                exit_code_for_error(&err)
            }
        };
        std::process::exit(exit_code);
    }

    let exit_code = match run(args) {
        Ok(outcome) => {
            if outcome.dry_run && outcome.would_change {
                exit_codes::WOULD_CHANGE
            } else {
                exit_codes::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            exit_code_for_error(&err)
        }
    };

    std::process::exit(exit_code);
}

/// Process a single input (file or stdin) and return the result
fn process_input(
    text: String,
    filename: String,
    config: &Config,
    console: &Console,
    styles: &VerboseStyle,
) -> FileResult {
    let started = Instant::now();
    let lines_in = count_lines(&text);

    if config.verbose {
        console.print(&styles.bold(format!(
            "Processing {} ({} lines)...",
            filename, lines_in
        )));
    }

    let detection = detect::detect(&text);
    let mut stats = Stats {
        lines_in,
        ..Stats::default()
    };

    let (converted, passes_changed) = if detection.is_markdown && !config.force {
        if config.verbose {
            let names: Vec<&str> = detection.categories.iter().map(|c| c.name()).collect();
            console.print(&styles.dim(format!(
                "  Markdown detected ({}), passing through",
                names.join(", ")
            )));
        }
        stats.passed_through = 1;
        (text.clone(), Vec::new())
    } else {
        let conversion = convert_with_report(&text);
        let changed = conversion.changed_passes();
        if config.verbose {
            for pass in &conversion.passes {
                if pass.changed {
                    console.print(&styles.header(format!(
                        "  {}: {} → {} lines",
                        pass.name, pass.lines_before, pass.lines_after
                    )));
                }
            }
        }
        stats.converted = 1;
        stats.passes_changed = changed.len();
        (conversion.markdown, changed)
    };

    let would_change = with_trailing_newline(&text) != with_trailing_newline(&converted);
    stats.lines_out = count_lines(&converted);
    stats.elapsed = started.elapsed();

    FileResult {
        filename,
        original: text,
        converted,
        already_markdown: detection.is_markdown,
        passes_changed,
        stats,
        would_change,
    }
}

/// Output a unified diff for a file result
fn output_diff(result: &FileResult, proposed: bool) -> Result<()> {
    if !result.would_change {
        return Ok(());
    }

    let original_text = with_trailing_newline(&result.original);
    let converted_text = with_trailing_newline(&result.converted);
    let diff = TextDiff::from_lines(&original_text, &converted_text);
    let mut stdout = io::stdout().lock();

    writeln!(stdout, "--- a/{}", result.filename)?;
    if proposed {
        writeln!(stdout, "+++ b/{} (proposed)", result.filename)?;
    } else {
        writeln!(stdout, "+++ b/{}", result.filename)?;
    }

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        writeln!(stdout, "{}", hunk.header())?;
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            let line = change.value();
            if line.ends_with('\n') {
                write!(stdout, "{}{}", sign, line)?;
            } else {
                writeln!(stdout, "{}{}", sign, line)?;
            }
        }
    }

    Ok(())
}

/// Write converted text to `path`, backing it up first when configured
fn write_in_place(
    path: &Path,
    result: &FileResult,
    config: &Config,
    console: &Console,
    styles: &VerboseStyle,
) -> Result<()> {
    if config.backup {
        let backup_path = create_backup(path, &config.backup_ext)?;
        if config.verbose {
            console.print(&styles.dim(format!("Created backup: {}", backup_path.display())));
        }
    }

    fs::write(path, with_trailing_newline(&result.converted))
        .with_context(|| format!("Failed to write to file: {}", path.display()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Watch Mode
// ─────────────────────────────────────────────────────────────────────────────

/// Watch a file and convert it in place on each save
fn watch_and_convert(
    path: &Path,
    config: &Config,
    console: &Console,
    styles: &VerboseStyle,
) -> Result<RunOutcome> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    if !path.is_file() {
        anyhow::bail!(
            "--watch requires a file, not a directory: {}",
            path.display()
        );
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        },
        notify::Config::default(),
    )
    .context("Failed to create file watcher")?;

    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch file: {}", path.display()))?;

    let debounce = Duration::from_millis(config.debounce_ms);
    let mut last_event: Option<Instant> = None;

    eprintln!(
        "Watching {} for changes (Ctrl+C to stop)...",
        path.display()
    );

    let mut any_changes = false;

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    continue;
                }
                let now = Instant::now();
                if last_event.is_some_and(|last| now.duration_since(last) < debounce) {
                    continue;
                }
                last_event = Some(now);

                match read_file(path) {
                    Ok(text) => {
                        let result = process_input(
                            text,
                            path.display().to_string(),
                            config,
                            console,
                            styles,
                        );

                        if !result.would_change {
                            eprintln!("✓ No changes needed");
                            continue;
                        }
                        match fs::write(path, with_trailing_newline(&result.converted)) {
                            Ok(()) => {
                                eprintln!(
                                    "✓ Converted ({} pass(es) changed the text)",
                                    result.passes_changed.len()
                                );
                                any_changes = true;
                                // Swallow the event our own write produces
                                last_event = Some(Instant::now());
                            }
                            Err(e) => eprintln!("✗ Failed to write: {}", e),
                        }
                    }
                    Err(e) => eprintln!("✗ Error reading file: {:#}", e),
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    eprintln!("\nWatch mode stopped.");

    Ok(RunOutcome {
        dry_run: false,
        would_change: any_changes,
    })
}

fn run(args: Args) -> Result<RunOutcome> {
    validate_args(&args)?;

    let config = create_config(&args)?;
    let (console, styles) = build_console(config.color);

    if config.watch {
        return watch_and_convert(&args.inputs[0], &config, &console, &styles);
    }

    if config.recursive {
        if args.inputs.is_empty() {
            return Err(
                ArgError("recursive mode requires at least one input path".to_string()).into(),
            );
        }
        let files = discover_recursive_files(&args.inputs, &config, &console, &styles)?;
        if files.is_empty() {
            let message = format!(
                "Warning: No files matched pattern '{}' in provided paths",
                config.glob
            );
            if config.verbose {
                console.print(&styles.dim(message));
            } else {
                eprintln!("{}", message);
            }
            return Ok(RunOutcome {
                dry_run: config.dry_run,
                would_change: false,
            });
        }

        return output_multiple_results(&args, &config, &console, &styles, &files);
    }

    if args.inputs.is_empty() {
        let text = read_stdin_content()?;
        let result = process_input(text, "stdin".to_string(), &config, &console, &styles);
        output_single_result(&args, &config, &console, &styles, result)
    } else if args.inputs.len() == 1 {
        let path = &args.inputs[0];
        let text = read_file(path)?;
        let result = process_input(
            text,
            path.display().to_string(),
            &config,
            &console,
            &styles,
        );
        output_single_result(&args, &config, &console, &styles, result)
    } else {
        output_multiple_results(&args, &config, &console, &styles, &args.inputs)
    }
}

/// Handle output for a single file/stdin result
fn output_single_result(
    args: &Args,
    config: &Config,
    console: &Console,
    styles: &VerboseStyle,
    result: FileResult,
) -> Result<RunOutcome> {
    let would_change = result.would_change;

    if config.json {
        output_json_single(args, config, &result)?;
        if args.in_place {
            let path = args
                .inputs
                .first()
                .ok_or_else(|| ArgError("--in-place requires an input file".to_string()))?;
            write_in_place(path, &result, config, console, styles)?;
        }
    } else if config.dry_run {
        output_dry_run_single(config, console, styles, &result)?;
    } else if config.diff {
        output_diff(&result, false)?;
    } else if args.in_place {
        let path = args
            .inputs
            .first()
            .ok_or_else(|| ArgError("--in-place requires an input file".to_string()))?;
        write_in_place(path, &result, config, console, styles)?;
    } else {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{}", with_trailing_newline(&result.converted))?;
    }

    if config.verbose {
        print_stats_summary(
            &result.stats,
            1,
            usize::from(would_change),
            0,
            console,
            styles,
        );
    }

    Ok(RunOutcome {
        dry_run: config.dry_run,
        would_change,
    })
}

fn json_report(args: &Args, config: &Config, result: &FileResult) -> JsonOutput {
    JsonOutput {
        version: "1.0",
        status: if config.dry_run {
            "dry_run".to_string()
        } else if result.already_markdown && !config.force {
            "passthrough".to_string()
        } else {
            "success".to_string()
        },
        file: Some(result.filename.clone()),
        input: InputStats {
            lines: result.stats.lines_in,
            bytes: result.original.len(),
            already_markdown: result.already_markdown,
        },
        processing: ProcessingStats {
            converted: result.stats.converted > 0,
            passes_changed: result.passes_changed.clone(),
        },
        output: Some(OutputStats {
            lines: result.stats.lines_out,
            bytes: result.converted.len(),
            changed: result.would_change,
        }),
        content: if !config.dry_run && !args.in_place {
            Some(result.converted.clone())
        } else {
            None
        },
    }
}

/// Output JSON for a single file result
fn output_json_single(args: &Args, config: &Config, result: &FileResult) -> Result<()> {
    let report = json_report(args, config, result);
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize JSON output")?
    );
    Ok(())
}

/// Output dry-run info for a single file
fn output_dry_run_single(
    config: &Config,
    console: &Console,
    styles: &VerboseStyle,
    result: &FileResult,
) -> Result<()> {
    if config.diff && result.would_change {
        output_diff(result, true)?;
    }

    if config.verbose {
        if result.would_change {
            console.print(&styles.changed(format!("Would modify: {}", result.filename)));
            console.print(&styles.dim(format!(
                "  passes: {}",
                result.passes_changed.join(", ")
            )));
        } else {
            console.print(&styles.success(format!("No changes needed: {}", result.filename)));
        }
    }

    Ok(())
}

/// Handle output for multiple files
fn output_multiple_results(
    args: &Args,
    config: &Config,
    console: &Console,
    styles: &VerboseStyle,
    paths: &[PathBuf],
) -> Result<RunOutcome> {
    let mut total_files_processed = 0;
    let mut total_files_changed = 0;
    let mut aggregated_stats = Stats::default();
    let mut any_would_change = false;
    let mut errors: Vec<(PathBuf, anyhow::Error)> = Vec::new();

    let show_file_headers = !args.in_place && !config.diff && !config.json && paths.len() > 1;

    for path in paths {
        let text = match read_file(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Error processing {}: {:#}", path.display(), e);
                errors.push((path.clone(), e));
                continue;
            }
        };

        let result = process_input(text, path.display().to_string(), config, console, styles);

        if result.would_change {
            any_would_change = true;
            total_files_changed += 1;
        }
        total_files_processed += 1;
        aggregated_stats.merge(&result.stats);

        if config.json {
            output_json_single(args, config, &result)?;
            if args.in_place {
                write_in_place(path, &result, config, console, styles)?;
            }
        } else if config.dry_run {
            output_dry_run_single(config, console, styles, &result)?;
        } else if config.diff {
            output_diff(&result, false)?;
        } else if args.in_place {
            write_in_place(path, &result, config, console, styles)?;

            if config.verbose {
                if result.would_change {
                    console.print(&styles.success(format!(
                        "{}: converted ({} pass(es))",
                        path.display(),
                        result.passes_changed.len()
                    )));
                } else {
                    console.print(&styles.dim(format!("{}: No changes needed", path.display())));
                }
            }
        } else {
            let header = show_file_headers.then_some(path.as_path());
            print_converted(&mut io::stdout().lock(), header, &result.converted)?;
        }
    }

    if config.verbose {
        print_stats_summary(
            &aggregated_stats,
            total_files_processed,
            total_files_changed,
            errors.len(),
            console,
            styles,
        );
    }

    if !errors.is_empty() {
        return Err(batch_error(&errors));
    }

    Ok(RunOutcome {
        dry_run: config.dry_run,
        would_change: any_would_change,
    })
}

/// Write one converted file to `out`, framed by a `==> path <==` header when given.
fn print_converted(out: &mut impl Write, header: Option<&Path>, converted: &str) -> Result<()> {
    if let Some(path) = header {
        writeln!(out, "==> {} <==", path.display())?;
    }
    write!(out, "{}", with_trailing_newline(converted))?;
    if header.is_some() {
        writeln!(out)?;
    }
    Ok(())
}

/// Fold per-file failures into one error; any parse failure makes it a parse error.
fn batch_error(errors: &[(PathBuf, anyhow::Error)]) -> anyhow::Error {
    let files = errors
        .iter()
        .map(|(path, _)| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");

    if errors.iter().any(|(_, err)| error_chain_has::<ParseError>(err)) {
        ParseError(format!("{} file(s) had parse errors: {}", errors.len(), files)).into()
    } else {
        anyhow::anyhow!("{} file(s) had errors: {}", errors.len(), files)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
