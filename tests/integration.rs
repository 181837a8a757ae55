//! E2E integration tests for markify
//!
//! Run with: cargo test --test integration
//! Verbose:  TEST_VERBOSE=1 cargo test --test integration -- --nocapture

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Test logging macro - prints when TEST_VERBOSE is set
macro_rules! test_log {
    ($level:expr, $($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            eprintln!("[{}] [integration:{}] {}",
                $level,
                line!(),
                format!($($arg)*)
            );
        }
    };
}

const WEEKLY: &str = "Weekly Update\n\nEverything is on track.\n";
const MARKDOWN: &str = "# Notes\n\n- one\n- two\n";

fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_markify"))
}

fn command() -> Command {
    let mut cmd = Command::new(get_binary_path());
    // Keep a stray ~/.markifyrc from changing defaults under test
    cmd.arg("--no-config");
    cmd
}

fn collect(output: std::process::Output) -> (String, String, i32) {
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    test_log!("OUTPUT", "Exit code: {}", code);
    test_log!("OUTPUT", "Stdout length: {} bytes", stdout.len());
    if !stderr.is_empty() {
        test_log!("STDERR", "{}", stderr);
    }

    (stdout, stderr, code)
}

fn run_stdin_with(mut cmd: Command, input: &[u8]) -> (String, String, i32) {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn markify");

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).expect("Failed to write to stdin");
    }

    collect(child.wait_with_output().expect("Failed to wait on markify"))
}

fn run_markify_stdin(input: &str, args: &[&str]) -> (String, String, i32) {
    test_log!("RUN", "markify with args: {:?}", args);
    test_log!("INPUT", "Input length: {} bytes", input.len());

    let mut cmd = command();
    cmd.args(args);
    run_stdin_with(cmd, input.as_bytes())
}

/// Subcommands take no top-level flags, so these skip `--no-config`.
fn run_subcommand_stdin(input: &str, args: &[&str]) -> (String, String, i32) {
    test_log!("RUN", "markify subcommand: {:?}", args);

    let mut cmd = Command::new(get_binary_path());
    cmd.args(args);
    run_stdin_with(cmd, input.as_bytes())
}

fn run_markify_args(args: &[&str]) -> (String, String, i32) {
    test_log!("RUN", "markify with args: {:?}", args);

    let output = command().args(args).output().expect("Failed to run markify");
    collect(output)
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// Conversion
// ============================================================================

#[test]
fn test_e2e_title_promotion() {
    test_log!("START", "Title promotion");

    let (stdout, _stderr, code) = run_markify_stdin(WEEKLY, &[]);

    assert_eq!(code, 0);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[..4], ["# Weekly Update", "", "---", ""]);
    assert_eq!(lines[4], "Everything is on track.");

    test_log!("END", "Test PASSED");
}

#[test]
fn test_e2e_subheading_with_numbered_items() {
    let (stdout, _stderr, code) =
        run_markify_stdin("Next Steps?\n1. Ship it\n2. Celebrate\n", &[]);

    assert_eq!(code, 0);
    assert!(stdout.contains("### Next Steps?"), "{}", stdout);
    assert!(stdout.contains("1. Ship it\n2. Celebrate"), "{}", stdout);
}

#[test]
fn test_e2e_fenced_code_survives_conversion() {
    let fenced = "```\n  x = \"NASA\"  |  y\nname, value\n```";
    let input = format!("Some notes here\n\n{}\n\nClosing words\n", fenced);

    let (stdout, _stderr, code) = run_markify_stdin(&input, &["--force"]);

    assert_eq!(code, 0);
    assert!(stdout.contains(fenced), "{}", stdout);
}

#[test]
fn test_e2e_markdown_passthrough() {
    let (stdout, _stderr, code) = run_markify_stdin(MARKDOWN, &[]);

    assert_eq!(code, 0);
    assert_eq!(stdout, MARKDOWN, "Markdown input should pass through unchanged");
}

#[test]
fn test_e2e_markdown_passthrough_dry_run() {
    let (_stdout, _stderr, code) = run_markify_stdin(MARKDOWN, &["-n"]);
    assert_eq!(code, 0, "Nothing to change for markdown input");
}

#[test]
fn test_e2e_empty_input() {
    let (stdout, _stderr, code) = run_markify_stdin("", &[]);

    assert_eq!(code, 0);
    assert!(stdout.trim().is_empty());
}

#[test]
fn test_e2e_crlf_input() {
    let (stdout, _stderr, code) = run_markify_stdin(&WEEKLY.replace('\n', "\r\n"), &[]);

    assert_eq!(code, 0);
    assert!(!stdout.contains('\r'));
    assert!(stdout.starts_with("# Weekly Update\n"));
}

// ============================================================================
// Output Modes
// ============================================================================

#[test]
fn test_e2e_dry_run_would_change() {
    let (stdout, _stderr, code) = run_markify_stdin(WEEKLY, &["--dry-run"]);

    assert_eq!(code, 3, "Dry run should signal pending changes");
    assert!(stdout.is_empty());
}

#[test]
fn test_e2e_dry_run_with_diff() {
    let (stdout, _stderr, code) = run_markify_stdin(WEEKLY, &["-n", "-d"]);

    assert_eq!(code, 3);
    assert!(stdout.contains("+++ b/stdin (proposed)"), "{}", stdout);
    assert!(stdout.contains("+# Weekly Update"), "{}", stdout);
}

#[test]
fn test_e2e_diff_output() {
    let (stdout, _stderr, code) = run_markify_stdin(WEEKLY, &["--diff"]);

    assert_eq!(code, 0);
    assert!(stdout.starts_with("--- a/stdin\n+++ b/stdin\n"), "{}", stdout);
    assert!(stdout.contains("-Weekly Update"));
    assert!(stdout.contains("+# Weekly Update"));
}

#[test]
fn test_e2e_diff_empty_for_markdown() {
    let (stdout, _stderr, code) = run_markify_stdin(MARKDOWN, &["--diff"]);

    assert_eq!(code, 0);
    assert!(stdout.is_empty());
}

#[test]
fn test_e2e_json_output() {
    let (stdout, _stderr, code) = run_markify_stdin(WEEKLY, &["--json"]);

    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["version"], "1.0");
    assert_eq!(json["status"], "success");
    assert_eq!(json["file"], "stdin");
    assert_eq!(json["input"]["already_markdown"], false);
    assert_eq!(json["output"]["changed"], true);
    assert!(
        json["processing"]["passes_changed"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p == "title")
    );
    assert!(json["content"].as_str().unwrap().starts_with("# Weekly Update"));
}

#[test]
fn test_e2e_json_passthrough_status() {
    let (stdout, _stderr, code) = run_markify_stdin(MARKDOWN, &["--json"]);

    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["status"], "passthrough");
    assert_eq!(json["input"]["already_markdown"], true);
    assert_eq!(json["output"]["changed"], false);
}

#[test]
fn test_e2e_verbose_summary_on_stderr() {
    let (stdout, stderr, code) = run_markify_stdin(WEEKLY, &["-v", "--color", "never"]);

    assert_eq!(code, 0);
    assert!(stdout.contains("# Weekly Update"));
    assert!(stdout.contains("Summary") || stderr.contains("Summary"));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_e2e_in_place_with_backup() {
    let temp = TempDir::new().unwrap();
    let path = write_file(temp.path(), "notes.txt", WEEKLY);

    let (stdout, _stderr, code) =
        run_markify_args(&["-i", "--backup", path.to_str().unwrap()]);

    assert_eq!(code, 0);
    assert!(stdout.is_empty());
    let converted = fs::read_to_string(&path).unwrap();
    assert!(converted.starts_with("# Weekly Update\n\n---\n"));
    assert!(converted.ends_with('\n'));
    assert_eq!(
        fs::read_to_string(temp.path().join("notes.txt.bak")).unwrap(),
        WEEKLY
    );
}

#[test]
fn test_e2e_in_place_leaves_markdown_alone() {
    let temp = TempDir::new().unwrap();
    let path = write_file(temp.path(), "notes.md", MARKDOWN);

    let (_stdout, _stderr, code) = run_markify_args(&["-i", path.to_str().unwrap()]);

    assert_eq!(code, 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), MARKDOWN);
}

#[test]
fn test_e2e_multiple_files_have_headers() {
    let temp = TempDir::new().unwrap();
    let a = write_file(temp.path(), "a.txt", WEEKLY);
    let b = write_file(temp.path(), "b.md", MARKDOWN);

    let (stdout, _stderr, code) =
        run_markify_args(&[a.to_str().unwrap(), b.to_str().unwrap()]);

    assert_eq!(code, 0);
    assert!(stdout.contains(&format!("==> {} <==", a.display())));
    assert!(stdout.contains(&format!("==> {} <==", b.display())));
    assert!(stdout.contains("# Weekly Update"));
    assert!(stdout.contains("- one\n- two"));
}

#[test]
fn test_e2e_recursive_glob() {
    let temp = TempDir::new().unwrap();
    let top = write_file(temp.path(), "top.txt", WEEKLY);
    let nested = write_file(temp.path(), "sub/nested.txt", WEEKLY);
    let skipped = write_file(temp.path(), "sub/skip.log", WEEKLY);

    let (_stdout, _stderr, code) = run_markify_args(&[
        "-r",
        "--no-gitignore",
        "-i",
        temp.path().to_str().unwrap(),
    ]);

    assert_eq!(code, 0);
    assert!(fs::read_to_string(&top).unwrap().starts_with("# Weekly Update"));
    assert!(fs::read_to_string(&nested).unwrap().starts_with("# Weekly Update"));
    assert_eq!(fs::read_to_string(&skipped).unwrap(), WEEKLY);
}

#[test]
fn test_e2e_recursive_no_matches_warns() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "only.rs", "fn main() {}\n");

    let (_stdout, stderr, code) = run_markify_args(&["-r", temp.path().to_str().unwrap()]);

    assert_eq!(code, 0);
    assert!(stderr.contains("No files matched"));
}

#[test]
fn test_e2e_config_file_force() {
    let temp = TempDir::new().unwrap();
    let config = write_file(temp.path(), "custom.toml", "force = true\n");
    let input = write_file(temp.path(), "notes.md", MARKDOWN);

    let output = Command::new(get_binary_path())
        .args([
            "--config",
            config.to_str().unwrap(),
            "--json",
            input.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to run markify");
    let (stdout, _stderr, code) = collect(output);

    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["processing"]["converted"], true);
}

// ============================================================================
// Errors and Exit Codes
// ============================================================================

#[test]
fn test_e2e_missing_file() {
    let (_stdout, stderr, code) = run_markify_args(&["/nonexistent/markify/input.txt"]);

    assert_eq!(code, 1);
    assert!(stderr.contains("Error"));
}

#[test]
fn test_e2e_binary_input() {
    let (_stdout, stderr, code) = run_stdin_with(command(), b"text\0more");

    assert_eq!(code, 4);
    assert!(stderr.contains("binary"));
}

#[test]
fn test_e2e_invalid_utf8_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.txt");
    fs::write(&path, [b'o', b'k', 0xC3, 0x28]).unwrap();

    let (_stdout, stderr, code) = run_markify_args(&[path.to_str().unwrap()]);

    assert_eq!(code, 4);
    assert!(stderr.contains("Invalid UTF-8"));
}

#[test]
fn test_e2e_invalid_arguments() {
    let (_stdout, _stderr, code) = run_markify_args(&["--no-such-flag"]);
    assert_eq!(code, 2);

    let (_stdout, _stderr, code) = run_markify_args(&["-i"]);
    assert_eq!(code, 2, "--in-place without files is an argument error");
}

#[test]
fn test_e2e_help_and_version() {
    let (stdout, _stderr, code) = run_markify_args(&["--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("EXIT CODES"));

    let (stdout, _stderr, code) = run_markify_args(&["--version"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("markify"));
}

// ============================================================================
// Subcommands
// ============================================================================

#[test]
fn test_e2e_detect_plain_and_markdown() {
    let (stdout, _stderr, code) = run_subcommand_stdin("just a sentence\n", &["detect"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.lines().next(), Some("plain"));

    let (stdout, _stderr, code) = run_subcommand_stdin(MARKDOWN, &["detect"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.lines().next(), Some("markdown"));
    assert!(stdout.contains("categories:"));
}

#[test]
fn test_e2e_detect_json_fenced_override() {
    let (stdout, _stderr, code) =
        run_subcommand_stdin("```\nlet x = 1;\n```\n", &["detect", "--json"]);

    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["markdown"], true);
    assert!(json["categories"].as_array().is_some());
}

#[test]
fn test_e2e_tables_subcommand() {
    let (stdout, _stderr, code) =
        run_subcommand_stdin("Name  Score\nAlice  90\nBob  85\n", &["tables"]);

    assert_eq!(code, 0);
    assert_eq!(
        stdout,
        "| Name | Score |\n| --- | --- |\n| Alice | 90 |\n| Bob | 85 |\n"
    );
}

#[test]
fn test_e2e_code_subcommand() {
    let (stdout, _stderr, code) = run_subcommand_stdin(
        "Example:\n    echo one\n    echo two\nDone\n",
        &["code"],
    );

    assert_eq!(code, 0);
    assert!(stdout.contains("```bash\necho one\necho two\n```"), "{}", stdout);
}

#[test]
fn test_e2e_blocks_subcommand() {
    let temp = TempDir::new().unwrap();
    let path = write_file(temp.path(), "doc.md", "# Title\n\nbody text\n\n- a\n- b\n");

    let output = Command::new(get_binary_path())
        .args(["blocks", path.to_str().unwrap()])
        .output()
        .expect("Failed to run markify");
    let (stdout, _stderr, code) = collect(output);

    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json[0]["type"], "heading");
    assert_eq!(json[0]["level"], 1);
    assert_eq!(json[1]["type"], "paragraph");
    assert_eq!(json[1]["text"], "body text");
    assert_eq!(json[2]["type"], "list");
    assert_eq!(json[2]["ordered"], false);
}

#[test]
fn test_e2e_format_bold() {
    let (stdout, _stderr, code) = run_subcommand_stdin(
        "say hello now",
        &["format", "bold", "--start", "4", "--end", "9"],
    );

    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["text"], "say **hello** now");
    assert_eq!(json["new_cursor_pos"], 13);
}

#[test]
fn test_e2e_format_unknown_action() {
    let (_stdout, stderr, code) = run_subcommand_stdin(
        "text",
        &["format", "sparkle", "--start", "0", "--end", "4"],
    );

    assert_eq!(code, 2);
    assert!(stderr.contains("sparkle"));
}

#[test]
fn test_e2e_config_init_creates_file() {
    let temp = TempDir::new().unwrap();

    let output = Command::new(get_binary_path())
        .args(["config", "init"])
        .current_dir(temp.path())
        .output()
        .expect("Failed to run markify");
    let (_stdout, stderr, code) = collect(output);

    assert_eq!(code, 0);
    assert!(stderr.contains("Created config file"));
    let content = fs::read_to_string(temp.path().join(".markifyrc")).unwrap();
    assert!(content.contains("# force = false"));

    let output = Command::new(get_binary_path())
        .args(["config", "init"])
        .current_dir(temp.path())
        .output()
        .expect("Failed to run markify");
    let (_stdout, _stderr, code) = collect(output);
    assert_eq!(code, 1, "A second init refuses to overwrite");
}
