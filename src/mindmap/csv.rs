use ::csv::{ReaderBuilder, Trim};
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

use super::input::TreeValue;

/// Converts comma separated rows into a synthetic root with one child per data row.
///
/// The first record holds the headers and every following record maps positionally
/// onto them. Short rows are padded with empty values, quoted fields may contain
/// commas, and surrounding whitespace is trimmed.
pub fn csv_to_tree_value(raw: &str, source_name: &str) -> Result<TreeValue> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .context("failed to read CSV headers")?
        .iter()
        .map(str::to_owned)
        .collect::<Vec<_>>();
    if headers.is_empty() {
        bail!("CSV file is empty");
    }
    if headers[0].is_empty() {
        bail!("CSV headers are missing or invalid");
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read CSV row {}", index + 2))?;
        let mut row = Map::with_capacity(headers.len());
        for (column, header) in headers.iter().enumerate() {
            let value = record.get(column).unwrap_or("");
            row.insert(header.clone(), Value::String(value.to_owned()));
        }
        rows.push(row);
    }

    let non_blank = rows
        .iter()
        .filter(|row| {
            row_text(row, "name").is_some()
                || row.values().any(|value| value.as_str() != Some(""))
        })
        .cloned()
        .collect::<Vec<_>>();
    let kept = if non_blank.is_empty() { rows } else { non_blank };

    let children = kept
        .into_iter()
        .enumerate()
        .map(|(index, row)| TreeValue {
            name: row_text(&row, "name")
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Item {}", index + 1)),
            content: row_text(&row, "content").map(str::to_owned),
            data: Some(row),
            ..TreeValue::default()
        })
        .collect();

    Ok(TreeValue::with_children(
        format!("Root (CSV: {source_name})"),
        children,
    ))
}

fn row_text<'a>(row: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    row.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_rows_onto_children() {
        let tree = csv_to_tree_value("name,content\nFoo,Bar\nBaz,Qux", "items.csv").unwrap();
        assert_eq!(tree.name, "Root (CSV: items.csv)");
        let names = tree
            .children
            .iter()
            .map(|child| child.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["Foo", "Baz"]);
        assert_eq!(tree.children[0].content.as_deref(), Some("Bar"));
        assert_eq!(tree.children[1].content.as_deref(), Some("Qux"));
    }

    #[test]
    fn missing_name_column_uses_placeholders() {
        let tree = csv_to_tree_value("title,owner\r\nfirst,ana\r\nsecond,rui\r\n", "t.csv").unwrap();
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].name, "Item 1");
        assert_eq!(tree.children[1].name, "Item 2");
        let data = tree.children[1].data.as_ref().unwrap();
        assert_eq!(data.get("owner").and_then(Value::as_str), Some("rui"));
    }

    #[test]
    fn short_rows_fill_missing_values() {
        let tree = csv_to_tree_value("\"name\",\"content\"\nOnly", "t.csv").unwrap();
        assert_eq!(tree.children[0].name, "Only");
        assert_eq!(tree.children[0].content, None);
    }

    #[test]
    fn blank_rows_are_dropped() {
        let tree = csv_to_tree_value("name,content\n,\nFoo,Bar", "t.csv").unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].name, "Foo");
    }

    #[test]
    fn quoted_fields_keep_embedded_commas() {
        let tree = csv_to_tree_value(
            "name,content\n\"Smith, J\",author\n\"Doe\",\"x\"",
            "t.csv",
        )
        .unwrap();
        let names = tree
            .children
            .iter()
            .map(|child| child.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["Smith, J", "Doe"]);
        assert_eq!(tree.children[0].content.as_deref(), Some("author"));
        assert_eq!(tree.children[1].content.as_deref(), Some("x"));
    }

    #[test]
    fn rejects_missing_headers() {
        assert!(csv_to_tree_value("", "t.csv").is_err());
        assert!(csv_to_tree_value(",content\nFoo,Bar", "t.csv").is_err());
    }
}
