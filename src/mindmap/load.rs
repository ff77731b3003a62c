use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use super::csv::csv_to_tree_value;
use super::input::{TreeValue, parse_tree_json};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Csv,
}

/// Where the next dataset comes from.
#[derive(Clone, Debug)]
pub enum LoadSource {
    File(PathBuf),
    CsvFile(PathBuf),
    Text(String),
}

impl LoadSource {
    pub fn label(&self) -> String {
        match self {
            Self::File(path) | Self::CsvFile(path) => display_name(path),
            Self::Text(_) => "pasted JSON".to_owned(),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn detect_format(path: &Path, raw: &str) -> SourceFormat {
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("csv") => return SourceFormat::Csv,
        Some("json") => return SourceFormat::Json,
        _ => {}
    }

    let first = raw.trim_start().chars().next();
    if matches!(first, Some('{') | Some('[')) || raw.trim() == "null" {
        SourceFormat::Json
    } else {
        SourceFormat::Csv
    }
}

fn parse_with_format(raw: &str, format: SourceFormat, name: &str) -> Result<TreeValue> {
    match format {
        SourceFormat::Json => parse_tree_json(raw),
        SourceFormat::Csv => csv_to_tree_value(raw, name),
    }
}

pub fn load_source(source: &LoadSource) -> Result<TreeValue> {
    let tree = match source {
        LoadSource::File(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let format = detect_format(path, &raw);
            parse_with_format(&raw, format, &display_name(path))
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        LoadSource::CsvFile(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            csv_to_tree_value(&raw, &display_name(path))
                .with_context(|| format!("failed to import {}", path.display()))?
        }
        LoadSource::Text(raw) => parse_tree_json(raw)?,
    };

    info!(
        "loaded {} ({} nodes)",
        source.label(),
        tree.node_count()
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_by_extension_then_content() {
        assert_eq!(detect_format(Path::new("a.csv"), "{}"), SourceFormat::Csv);
        assert_eq!(detect_format(Path::new("a.JSON"), "name"), SourceFormat::Json);
        assert_eq!(detect_format(Path::new("a.txt"), "  {\"name\":1}"), SourceFormat::Json);
        assert_eq!(detect_format(Path::new("a.txt"), "name,content"), SourceFormat::Csv);
    }

    #[test]
    fn loads_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("tree.json");
        fs::write(&json_path, r#"{"name":"Root","children":[{"name":"A"}]}"#).unwrap();
        let csv_path = dir.path().join("rows.csv");
        fs::write(&csv_path, "name,content\nFoo,Bar\n").unwrap();

        let tree = load_source(&LoadSource::File(json_path)).unwrap();
        assert_eq!(tree.children[0].name, "A");

        let tree = load_source(&LoadSource::CsvFile(csv_path)).unwrap();
        assert_eq!(tree.name, "Root (CSV: rows.csv)");

        assert!(load_source(&LoadSource::File(dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn pasted_text_must_be_json() {
        assert!(load_source(&LoadSource::Text("name,content".to_owned())).is_err());
        let tree = load_source(&LoadSource::Text(r#"{"name":"x"}"#.to_owned())).unwrap();
        assert_eq!(tree.name, "x");
    }
}
