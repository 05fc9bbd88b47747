use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use expander::{DiagnosticError, ExpandOptions};
use weave::Warning;

use crate::config::Redefine;

const TEST_SUFFIX: &str = ".test.md";

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Expected output files: filename → content. The set of names must match
    /// exactly; contents are compared with trailing whitespace trimmed.
    #[serde(default)]
    pub expect_files: Option<BTreeMap<String, String>>,

    /// Expected resolved content of individual chunks (any name).
    #[serde(default)]
    pub expect_chunks: BTreeMap<String, String>,

    /// Expected expansion error. Its message must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Expected warnings. If present (even empty), warning count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,

    #[serde(default)]
    pub redefine: Option<Redefine>,

    #[serde(default)]
    pub max_passes: Option<usize>,
}

/// Split a `.test.md` file into its TOML frontmatter and the literate source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .map(|s| s.trim_end_matches(TEST_SUFFIX))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();

    let outcome = match check_expectations(&config, source) {
        None => TestOutcome::Pass,
        Some(reason) => TestOutcome::Fail(reason),
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Run the pipeline over `source` and compare against `config`.
/// Returns `Some(reason)` on the first mismatch.
fn check_expectations(config: &TestConfig, source: &str) -> Option<String> {
    let document = weave::extract(source, 0);
    let mut warnings = document.warnings;
    let policy = config.redefine.map(weave::RedefinePolicy::from).unwrap_or_default();
    let merged = weave::merge(document.fragments, policy);
    warnings.extend(merged.warnings);

    let mut chunks = merged.chunks;
    let result = expander::expand(
        &mut chunks,
        &ExpandOptions {
            max_passes: config.max_passes,
        },
    );

    let reason = match (&config.expect_error, result) {
        (Some(expected), Err(err)) => check_error(expected, &err),
        (Some(expected), Ok(_)) => Some(format!(
            "expected error containing \"{}\", but expansion succeeded",
            expected
        )),
        (None, Err(err)) => Some(format!("unexpected error: {}", err)),
        (None, Ok(_)) => check_outputs(config, &chunks),
    };
    if reason.is_some() {
        return reason;
    }

    config
        .expect_warnings
        .as_ref()
        .and_then(|expected| check_warnings(source, &warnings, expected))
}

fn check_error(expected: &str, err: &DiagnosticError) -> Option<String> {
    let message = err.to_string();
    if message.contains(expected) {
        None
    } else {
        Some(format!(
            "expected error containing \"{}\", got: {}",
            expected, message
        ))
    }
}

fn check_outputs(config: &TestConfig, chunks: &weave::ChunkMap) -> Option<String> {
    if let Some(expected_files) = &config.expect_files {
        let actual = expander::select_files(chunks);
        let expected_names: Vec<&String> = expected_files.keys().collect();
        let actual_names: Vec<&String> = actual.keys().collect();
        if expected_names != actual_names {
            return Some(format!(
                "output file mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected_names, actual_names
            ));
        }
        for (name, expected) in expected_files {
            if let Some(reason) = compare_body(&format!("file `{}`", name), expected, &actual[name]) {
                return Some(reason);
            }
        }
    }

    for (name, expected) in &config.expect_chunks {
        let Some(chunk) = chunks.get(name) else {
            return Some(format!("expected chunk `{}`, but it is not defined", name));
        };
        if let Some(reason) = compare_body(&format!("chunk `{}`", name), expected, &chunk.render()) {
            return Some(reason);
        }
    }

    None
}

fn compare_body(what: &str, expected: &str, actual: &str) -> Option<String> {
    let expected = expected.trim_end();
    let actual = actual.trim_end();
    if expected == actual {
        return None;
    }
    let mut reason = format!("{} content mismatch", what);
    reason.push_str("\n  expected:");
    for line in expected.lines() {
        reason.push_str(&format!("\n    |{}", line));
    }
    reason.push_str("\n  actual:");
    for line in actual.lines() {
        reason.push_str(&format!("\n    |{}", line));
    }
    Some(reason)
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual warnings match expectations. Returns `Some(reason)` on mismatch.
fn check_warnings(source: &str, actual: &[Warning], expected: &[ExpectedWarning]) -> Option<String> {
    if actual.len() != expected.len() {
        let actual_msgs: Vec<String> = actual.iter().map(|w| format!("    - {}", w)).collect();
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            actual.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual.iter().zip(expected).enumerate() {
        if !actual.message.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, actual.message
            ));
        }

        if let Some(expected_line) = expected.line {
            let actual_line = byte_offset_to_line(source, actual.span.start);
            if actual_line != expected_line {
                return Some(format!(
                    "warning[{}]: expected on line {}, but span is on line {}",
                    i, expected_line, actual_line
                ));
            }
        }
    }

    None
}

/// Discover `.test.md` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        log::warn!("cannot read test directory {}", dir.display());
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
            continue;
        }
        let is_test = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(TEST_SUFFIX));
        if is_test {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

struct Style {
    no_color: bool,
}

impl Style {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(&self) -> String {
        self.paint("FAIL", "31")
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, "1")
    }
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { no_color };

    let groups: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let mut all = discover_categorized(path);
        if !categories.is_empty() {
            all.retain(|cat, _| categories.iter().any(|c| c == cat));
        }
        all
    };

    if groups.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &groups {
        if !category.is_empty() {
            eprintln!("{}", style.bold(category));
        }
        for file in files {
            let result = run_single_test(file);
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", style.pass(), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", style.fail(), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("ok", "32"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("FAILED", "31"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_inline(file: &str) -> Option<String> {
        let (config, source) = parse_test_file(file).expect("frontmatter");
        check_expectations(&config, source)
    }

    #[test]
    fn frontmatter_is_split_from_source() {
        let (config, source) =
            parse_test_file("---\ndescription = \"x\"\n---\n<<a>>=\n@\n").unwrap();
        assert_eq!(config.description.as_deref(), Some("x"));
        assert_eq!(source, "<<a>>=\n@\n");
    }

    #[test]
    fn missing_frontmatter_is_an_error() {
        assert!(parse_test_file("<<a>>=\n@\n").is_err());
        assert!(parse_test_file("---\ndescription = \"x\"\n").is_err());
    }

    #[test]
    fn passing_file_expectation() {
        let file = "---\n[expect_files]\n\"a.txt\" = \"\"\"\n  x\n\"\"\"\n---\n<<a.txt>>=\n  <<b>>\n@\n<<b>>=\nx\n@\n";
        assert_eq!(run_inline(file), None);
    }

    #[test]
    fn mismatched_file_is_reported() {
        let file = "---\nexpect_files = { \"a.txt\" = \"y\" }\n---\n<<a.txt>>=\nx\n@\n";
        let reason = run_inline(file).unwrap();
        assert!(reason.contains("file `a.txt` content mismatch"));
    }

    #[test]
    fn expected_error_matches_substring() {
        let file = "---\nexpect_error = \"undefined chunk `gone`\"\n---\n<<a.txt>>=\n<<gone>>\n@\n";
        assert_eq!(run_inline(file), None);
    }

    #[test]
    fn warning_lines_are_checked() {
        let file = "---\nexpect_warnings = [{ contains = \"unterminated\", line = 2 }]\n---\nprose\n<<a>>=\nopen\n";
        assert_eq!(run_inline(file), None);

        let wrong = "---\nexpect_warnings = [{ contains = \"unterminated\", line = 1 }]\n---\nprose\n<<a>>=\nopen\n";
        assert!(run_inline(wrong).unwrap().contains("line 1"));
    }

    #[test]
    fn offsets_map_to_lines() {
        assert_eq!(byte_offset_to_line("a\nb\nc", 0), 1);
        assert_eq!(byte_offset_to_line("a\nb\nc", 2), 2);
        assert_eq!(byte_offset_to_line("a\nb\nc", 99), 3);
    }
}
