use eframe::egui::{Vec2, vec2};

use super::tree::NodeShape;

/// Measures rendered text width; the GUI backs this with the font system.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// Fixed per-character advance, used when no font backend is available.
#[derive(Clone, Copy, Debug)]
pub struct ApproxTextMeasure {
    pub advance_ratio: f32,
}

impl Default for ApproxTextMeasure {
    fn default() -> Self {
        Self {
            advance_ratio: 0.56,
        }
    }
}

impl TextMeasure for ApproxTextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.advance_ratio
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricsConfig {
    pub base_padding: f32,
    pub coord_row_height: f32,
    pub text_spacing: f32,
    pub line_height_em: f32,
    pub min_circle_radius: f32,
    /// Font size for depth 0, depth 1 and everything deeper.
    pub font_sizes: [f32; 3],
    /// Wrap budget for depth 0, depth 1 and everything deeper.
    pub wrap_widths: [f32; 3],
    pub coord_font_size: f32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            base_padding: 25.0,
            coord_row_height: 18.0,
            text_spacing: 5.0,
            line_height_em: 1.1,
            min_circle_radius: 35.0,
            font_sizes: [20.0, 16.0, 14.0],
            wrap_widths: [150.0, 110.0, 160.0],
            coord_font_size: 10.0,
        }
    }
}

impl MetricsConfig {
    fn tier(depth: usize) -> usize {
        depth.min(2)
    }

    pub fn font_size(&self, depth: usize) -> f32 {
        self.font_sizes[Self::tier(depth)]
    }

    pub fn wrap_width(&self, depth: usize) -> f32 {
        self.wrap_widths[Self::tier(depth)]
    }

    /// Vertical offset from the node center to the center of the wrapped label.
    pub fn label_center_y(&self) -> f32 {
        -(self.text_spacing + self.coord_row_height) * 0.5
    }

    /// Vertical offset from the node center to the center of the coordinate row.
    pub fn coord_center_y(&self, text_height: f32) -> f32 {
        self.label_center_y() + text_height * 0.5 + self.text_spacing + self.coord_row_height * 0.5
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WrappedText {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    pub line_height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeGeometry {
    Circle { radius: f32 },
    Rect { width: f32, height: f32 },
}

impl ShapeGeometry {
    /// Size used before a node has been measured.
    pub fn fallback(shape: NodeShape) -> Self {
        match shape {
            NodeShape::Circle => Self::Circle { radius: 30.0 },
            NodeShape::Rect => Self::Rect {
                width: 60.0,
                height: 40.0,
            },
        }
    }

    pub fn bounding_radius(self) -> f32 {
        match self {
            Self::Circle { radius } => radius,
            Self::Rect { width, height } => width.max(height) * 0.5,
        }
    }

    pub fn size(self) -> Vec2 {
        match self {
            Self::Circle { radius } => vec2(radius * 2.0, radius * 2.0),
            Self::Rect { width, height } => vec2(width, height),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeMetrics {
    pub text: WrappedText,
    pub geometry: ShapeGeometry,
}

/// Greedy word wrap: break before the word that would overflow `max_width`, unless
/// the line would be left empty, in which case the long word stands alone.
pub fn wrap_label(
    measure: &dyn TextMeasure,
    label: &str,
    max_width: f32,
    font_size: f32,
    line_height_em: f32,
) -> WrappedText {
    let mut lines = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in label.split_whitespace() {
        current.push(word);
        if current.len() > 1 && measure.text_width(&current.join(" "), font_size) > max_width {
            current.pop();
            lines.push(current.join(" "));
            current.clear();
            current.push(word);
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current.join(" "));
    }

    let width = lines
        .iter()
        .map(|line| measure.text_width(line, font_size))
        .fold(0.0_f32, f32::max);
    let line_height = font_size * line_height_em;

    WrappedText {
        height: lines.len() as f32 * line_height,
        lines,
        width,
        font_size,
        line_height,
    }
}

pub fn compute_metrics(
    measure: &dyn TextMeasure,
    config: &MetricsConfig,
    label: &str,
    depth: usize,
    shape: NodeShape,
) -> NodeMetrics {
    let text = wrap_label(
        measure,
        label,
        config.wrap_width(depth),
        config.font_size(depth),
        config.line_height_em,
    );
    let content_height = text.height + config.text_spacing + config.coord_row_height;

    let geometry = match shape {
        NodeShape::Circle => {
            let half_diagonal = (text.width * text.width + content_height * content_height).sqrt() * 0.5;
            ShapeGeometry::Circle {
                radius: (half_diagonal + config.base_padding).max(config.min_circle_radius),
            }
        }
        NodeShape::Rect => ShapeGeometry::Rect {
            width: text.width + config.base_padding * 2.0,
            height: content_height + config.base_padding * 2.0,
        },
    };

    NodeMetrics { text, geometry }
}
