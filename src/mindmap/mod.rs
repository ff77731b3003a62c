mod csv;
mod expansion;
mod export;
mod input;
mod load;
mod metrics;
mod tree;

pub use expansion::ToggleOutcome;
pub use export::{ExportRecord, export_records, write_export};
pub use input::{Side, TreeValue};
pub use load::{LoadSource, load_source};
pub use metrics::{
    ApproxTextMeasure, MetricsConfig, ShapeGeometry, TextMeasure, compute_metrics,
};
pub use tree::{MindTree, NodeId, NodeShape, ShapePolicy, TreeNode};
