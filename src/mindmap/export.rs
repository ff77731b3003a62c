use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::info;
use serde::{Deserialize, Serialize};

use super::tree::MindTree;

/// One exported node of the currently visible set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub name: String,
    pub content: String,
    pub x: f32,
    pub y: f32,
    pub fx: Option<f32>,
    pub fy: Option<f32>,
    pub depth: usize,
    pub is_expanded: bool,
    pub has_hidden_children: bool,
}

pub fn export_records(tree: &MindTree) -> Vec<ExportRecord> {
    tree.visible_nodes()
        .into_iter()
        .map(|id| {
            let node = &tree[id];
            ExportRecord {
                name: node.name.clone(),
                content: node.export_content(),
                x: node.position.x,
                y: node.position.y,
                fx: node.pinned.map(|pin| pin.x),
                fy: node.pinned.map(|pin| pin.y),
                depth: node.depth,
                is_expanded: node.is_expanded(),
                has_hidden_children: node.has_hidden_children(),
            }
        })
        .collect()
}

pub fn records_to_json(records: &[ExportRecord]) -> Result<String> {
    if records.is_empty() {
        bail!("no nodes to export");
    }
    serde_json::to_string_pretty(records).context("failed to serialize export")
}

pub fn write_export(records: &[ExportRecord], path: &Path) -> Result<()> {
    let json = records_to_json(records)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!("exported {} nodes to {}", records.len(), path.display());
    Ok(())
}
