use anyhow::{bail, Context, Result};
use polybench_common::dockerfile;
use polybench_common::types::Language;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Columns every dataset row must carry
/// `Dockerfile` is capitalized in the published dataset
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "instance_id",
    "language",
    "repo",
    "base_commit",
    "Dockerfile",
];

/// Load a JSON-lines dataset and re-emit one instance per stdout line
///
/// Progress goes to stderr so stdout stays pipeable into a build driver.
/// Offset and limit carve a window for resumed or partial runs; rows
/// outside the window are not validated.
pub async fn load_dataset(path: &Path, limit: Option<usize>, offset: usize) -> Result<()> {
    eprintln!("Loading dataset from {}...", path.display());

    let file = File::open(path)
        .with_context(|| format!("Failed to open dataset at {}", path.display()))?;
    let rows = read_instances(BufReader::new(file))?;
    eprintln!("Loaded {} instances", rows.len());

    let total = rows.len();
    let rows = select_window(rows, offset, limit);
    if offset > 0 {
        eprintln!(
            "Skipped first {} instances, {} remaining",
            offset,
            total.saturating_sub(offset)
        );
    }
    if matches!(limit, Some(n) if n > 0) {
        eprintln!("Limited to {} instances", rows.len());
    }

    validate_rows(&rows)?;

    for (_, row) in &rows {
        println!("{}", serde_json::to_string(row)?);
    }

    Ok(())
}

/// Normalize custom-reporter paths in a Dockerfile and print the result
pub async fn fix_dockerfile(content: &str) -> Result<()> {
    println!("{}", dockerfile::fix_reporter_paths(content));
    Ok(())
}

/// Parse a JSON-lines reader into (line number, row) pairs
/// Blank lines are skipped; anything else must be a JSON object
fn read_instances<R: BufRead>(reader: R) -> Result<Vec<(usize, Value)>> {
    let mut rows = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("Failed to read dataset line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(&line)
            .with_context(|| format!("Invalid JSON on line {line_no}"))?;
        if !value.is_object() {
            bail!("Expected a JSON object on line {line_no}");
        }
        rows.push((line_no, value));
    }

    Ok(rows)
}

/// Apply offset then limit to the instance window
/// A limit of zero means no limit, matching the driver scripts
fn select_window(
    rows: Vec<(usize, Value)>,
    offset: usize,
    limit: Option<usize>,
) -> Vec<(usize, Value)> {
    let mut rows: Vec<_> = rows.into_iter().skip(offset).collect();
    if let Some(limit) = limit {
        if limit > 0 {
            rows.truncate(limit);
        }
    }
    rows
}

/// Verify required columns exist and the language is one the builder knows
fn validate_rows(rows: &[(usize, Value)]) -> Result<()> {
    for (line_no, row) in rows {
        let Some(object) = row.as_object() else {
            bail!("Expected a JSON object on line {line_no}");
        };

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !object.contains_key(*column))
            .collect();
        if !missing.is_empty() {
            bail!("Missing required columns: {missing:?} on line {line_no}");
        }

        let language = object
            .get("language")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if Language::from_str(language).is_none() {
            bail!("Unrecognized language '{language}' on line {line_no}");
        }
    }

    Ok(())
}
