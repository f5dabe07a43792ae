use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Operation to run against the outline source: "reparent" or "rename".
    pub operation: String,

    /// Reparent: handle of the dragged node.
    #[serde(default)]
    pub dragged: Option<String>,

    /// Reparent: handle of the target node.
    #[serde(default)]
    pub target: Option<String>,

    /// Reparent relation. Defaults to "child".
    #[serde(default = "default_relation")]
    pub relation: String,

    /// Rename: handle of the node to rename.
    #[serde(default)]
    pub handle: Option<String>,

    /// Rename: the text the caller believes the node currently has.
    #[serde(default)]
    pub original: Option<String>,

    /// Rename: the replacement text.
    #[serde(default)]
    pub new: Option<String>,

    /// Expected exact output text (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Expected error — the error's Display string must contain this
    /// substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Expected warnings. If present (even empty), count and content are
    /// checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

fn default_relation() -> String {
    "child".to_string()
}

/// Parse a `.test.md` file into its TOML config and outline source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest_start = close_pos + 4; // skip \n---
    let source = after_open[rest_start..]
        .strip_prefix("\r\n")
        .or_else(|| after_open[rest_start..].strip_prefix('\n'))
        .unwrap_or(&after_open[rest_start..]);

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

fn missing(field: &str, op: &str) -> String {
    format!("operation \"{}\" requires the `{}` field", op, field)
}

/// Run one fixture: apply the configured operation and check expectations.
fn run_operation(config: &TestConfig, source: &str) -> Result<(String, Vec<String>), String> {
    match config.operation.as_str() {
        "reparent" => {
            let dragged = config
                .dragged
                .as_deref()
                .ok_or_else(|| missing("dragged", "reparent"))?;
            let target = config
                .target
                .as_deref()
                .ok_or_else(|| missing("target", "reparent"))?;
            match engine::reparent(source, dragged, target, &config.relation) {
                Ok(result) => Ok((result.text, Vec::new())),
                Err(err) => Err(err.to_string()),
            }
        }
        "rename" => {
            let handle = config
                .handle
                .as_deref()
                .ok_or_else(|| missing("handle", "rename"))?;
            let original = config.original.as_deref().unwrap_or_default();
            let new = config
                .new
                .as_deref()
                .ok_or_else(|| missing("new", "rename"))?;
            match engine::rename(source, handle, original, new) {
                Ok(result) => {
                    let warnings = result.warnings.iter().map(|w| w.to_string()).collect();
                    Ok((result.text, warnings))
                }
                Err(err) => Err(err.to_string()),
            }
        }
        other => Err(format!("unknown operation \"{}\"", other)),
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
    let result = run_operation(&config, source);

    // Check error/output expectations.
    let reason = match (&config.expect_error, &config.expect_output, &result) {
        (Some(expected_err), _, Err(actual_err)) => {
            if actual_err.contains(expected_err.as_str()) {
                None
            } else {
                Some(format!(
                    "expected error containing \"{}\", got: {}",
                    expected_err, actual_err
                ))
            }
        }
        (Some(expected_err), _, Ok(_)) => Some(format!(
            "expected error containing \"{}\", but the operation succeeded",
            expected_err
        )),
        (None, _, Err(actual_err)) => Some(format!("unexpected error: {}", actual_err)),
        (None, Some(expected_output), Ok((text, _))) => {
            if text.trim() == expected_output.trim() {
                None
            } else {
                Some(format!(
                    "output mismatch\n  expected: {:?}\n  actual:   {:?}",
                    expected_output.trim(),
                    text.trim()
                ))
            }
        }
        (None, None, Ok(_)) => None,
    };

    if let Some(reason) = reason {
        return fail(description, reason);
    }

    // Check warning expectations.
    if let Some(expected_warnings) = &config.expect_warnings {
        let actual = match &result {
            Ok((_, warnings)) => warnings.as_slice(),
            Err(_) => &[],
        };
        if let Some(reason) = check_warnings(actual, expected_warnings) {
            return fail(description, reason);
        }
    }

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Pass,
    }
}

/// Check that actual warnings match expectations. Returns `Some(reason)` on
/// mismatch.
fn check_warnings(actual: &[String], expected: &[ExpectedWarning]) -> Option<String> {
    if actual.len() != expected.len() {
        let actual_msgs: Vec<String> = actual.iter().map(|w| format!("  - {}", w)).collect();
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

    for (i, (actual, expected)) in actual.iter().zip(expected.iter()).enumerate() {
        if !actual.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, actual
            ));
        }
    }

    None
}

/// Discover `.test.md` files grouped by category (subfolder relative to
/// root). Files directly in `root` get category "" (uncategorized).
/// Returns a BTreeMap so categories are sorted alphabetically.
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
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(".test.md") {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
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
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    // Single file mode — ignore categories.
    if path.is_file() {
        let result = run_single_test(path);
        let label = result.description.as_deref().unwrap_or_else(|| {
            path.file_stem().and_then(|s| s.to_str()).unwrap_or("?")
        });
        return match &result.outcome {
            TestOutcome::Pass => {
                eprintln!("  {}  {}", pass_label(no_color), label);
                eprintln!();
                eprintln!(
                    "test result: {}. 1 passed, 0 failed",
                    if no_color { "ok" } else { "\x1b[32mok\x1b[0m" }
                );
                0
            }
            TestOutcome::Fail(reason) => {
                eprintln!("  {}  {}", fail_label(no_color), label);
                eprintln!();
                eprintln!("failures:");
                eprintln!();
                eprintln!("  --- {} ---", path.display());
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
                eprintln!();
                eprintln!(
                    "test result: {}. 0 passed, 1 failed (of 1)",
                    if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" }
                );
                1
            }
        };
    }

    let all_categories = discover_categorized(path);

    if all_categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return 1;
    }

    // Filter categories if specified.
    let run_categories: BTreeMap<&str, &Vec<PathBuf>> = if categories.is_empty() {
        all_categories.iter().map(|(k, v)| (k.as_str(), v)).collect()
    } else {
        let mut filtered = BTreeMap::new();
        for requested in categories {
            let req = requested.trim_matches('/');
            let mut found = false;
            for (cat, files) in &all_categories {
                if cat == req || cat.starts_with(&format!("{}/", req)) {
                    filtered.insert(cat.as_str(), files);
                    found = true;
                }
            }
            if !found {
                eprintln!(
                    "warning: category '{}' not found (available: {})",
                    req,
                    all_categories
                        .keys()
                        .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
        filtered
    };

    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &run_categories {
        let header = if cat.is_empty() {
            "(root)".to_string()
        } else {
            cat.to_string()
        };
        eprintln!();
        eprintln!("{}", bold(&header, no_color));

        for file in *files {
            let result = run_single_test(file);
            let label = result.description.as_deref().unwrap_or_else(|| {
                file.file_stem().and_then(|s| s.to_str()).unwrap_or("?")
            });

            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), label);
                }
                TestOutcome::Fail(_) => {
                    failed += 1;
                    eprintln!("  {}  {}", fail_label(no_color), label);
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
    if failed == 0 {
        if no_color {
            eprintln!("test result: ok. {} passed, 0 failed", passed);
        } else {
            eprintln!("test result: \x1b[32mok\x1b[0m. {} passed, 0 failed", passed);
        }
        0
    } else {
        let total = passed + failed;
        if no_color {
            eprintln!(
                "test result: FAILED. {} passed, {} failed (of {})",
                passed, failed, total
            );
        } else {
            eprintln!(
                "test result: \x1b[31mFAILED\x1b[0m. {} passed, {} failed (of {})",
                passed, failed, total
            );
        }
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn bundled_fixtures_pass() {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures");
        assert_eq!(run_tests(&fixtures, true, &[]), 0);
    }

    #[test]
    fn category_filter_selects_subset() {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures");
        assert_eq!(run_tests(&fixtures, true, &["reparent".to_string()]), 0);
    }

    #[test]
    fn malformed_frontmatter_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.test.md");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "no frontmatter here").unwrap();
        assert_eq!(run_tests(&path, true, &[]), 1);
    }

    #[test]
    fn frontmatter_splits_config_from_source() {
        let content = "---\noperation = \"rename\"\nhandle = \"mm-1\"\nnew = \"X\"\n---\n# T\n";
        let (config, source) = parse_test_file(content).unwrap();
        assert_eq!(config.operation, "rename");
        assert_eq!(source, "# T\n");
    }
}
