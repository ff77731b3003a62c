use std::f32::consts::TAU;

use eframe::egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2, vec2};

use crate::mindmap::{NodeShape, ShapeGeometry, TreeNode};

pub(super) const ROOT_FILL: Color32 = Color32::from_rgb(0x3a, 0x5b, 0xa0);
pub(super) const CIRCLE_EXPANDABLE_FILL: Color32 = Color32::from_rgb(0x81, 0xc7, 0x84);
pub(super) const CIRCLE_FILL: Color32 = Color32::from_rgb(0x6c, 0xc2, 0xbd);
pub(super) const RECT_EXPANDABLE_FILL: Color32 = Color32::from_rgb(0xff, 0xf5, 0x9d);
pub(super) const RECT_FILL: Color32 = Color32::WHITE;
pub(super) const EXPANDABLE_OUTLINE: Color32 = Color32::from_rgb(0xff, 0x98, 0x00);
pub(super) const EDGE_COLOR: Color32 = Color32::from_rgba_premultiplied(0x66, 0x66, 0x66, 153);
pub(super) const SEARCH_HIGHLIGHT: Color32 = Color32::from_rgb(103, 196, 255);
pub(super) const RECT_CORNER_RADIUS: f32 = 10.0;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn node_fill(node: &TreeNode) -> Color32 {
    if node.parent.is_none() {
        return ROOT_FILL;
    }
    match (node.shape, node.has_hidden_children()) {
        (NodeShape::Circle, true) => CIRCLE_EXPANDABLE_FILL,
        (NodeShape::Circle, false) => CIRCLE_FILL,
        (NodeShape::Rect, true) => RECT_EXPANDABLE_FILL,
        (NodeShape::Rect, false) => RECT_FILL,
    }
}

pub(super) fn label_color(node: &TreeNode) -> Color32 {
    match node.shape {
        NodeShape::Circle => Color32::WHITE,
        NodeShape::Rect => Color32::from_rgb(0x33, 0x33, 0x33),
    }
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(248, 249, 251));

    let step = (64.0 * zoom.clamp(0.6, 1.8)).max(24.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(160, 170, 185, 40));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

/// Screen-space half size of a shape's bounding box.
pub(super) fn screen_half_size(geometry: ShapeGeometry, zoom: f32) -> Vec2 {
    geometry.size() * (zoom * 0.5)
}

pub(super) fn shape_visible(rect: Rect, center: Pos2, half_size: Vec2) -> bool {
    rect.intersects(Rect::from_center_size(center, half_size * 2.0))
}

/// Closed outline of a node shape in screen space, for dashed strokes.
pub(super) fn outline_points(geometry: ShapeGeometry, center: Pos2, zoom: f32) -> Vec<Pos2> {
    match geometry {
        ShapeGeometry::Circle { radius } => {
            let radius = radius * zoom;
            let segments = ((radius * 0.5) as usize).clamp(24, 96);
            (0..=segments)
                .map(|step| {
                    let angle = step as f32 / segments as f32 * TAU;
                    center + vec2(angle.cos(), angle.sin()) * radius
                })
                .collect()
        }
        ShapeGeometry::Rect { width, height } => {
            let half = vec2(width, height) * (zoom * 0.5);
            let corner = (RECT_CORNER_RADIUS * zoom).min(half.x).min(half.y);
            let inner = half - Vec2::splat(corner);
            // Corner arcs clockwise from the top-right, each a quarter turn.
            let corners = [
                (vec2(inner.x, -inner.y), -0.25),
                (vec2(inner.x, inner.y), 0.0),
                (vec2(-inner.x, inner.y), 0.25),
                (vec2(-inner.x, -inner.y), 0.5),
            ];
            let mut points = Vec::with_capacity(corners.len() * 7 + 1);
            for (offset, start_turn) in corners {
                for step in 0..=6 {
                    let angle = (start_turn + step as f32 / 24.0) * TAU;
                    points.push(center + offset + vec2(angle.cos(), angle.sin()) * corner);
                }
            }
            if let Some(&first) = points.first() {
                points.push(first);
            }
            points
        }
    }
}

pub(super) fn dashed_outline(
    painter: &Painter,
    geometry: ShapeGeometry,
    center: Pos2,
    zoom: f32,
    stroke: Stroke,
) {
    let points = outline_points(geometry, center, zoom);
    let dash = (5.0 * zoom).max(2.0);
    painter.extend(Shape::dashed_line(&points, stroke, dash, dash * 0.6));
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;
    use crate::mindmap::{MindTree, ShapePolicy, TreeValue};

    #[test]
    fn fills_follow_shape_and_expandability() {
        let value = TreeValue::with_children(
            "Root",
            vec![
                TreeValue::with_children(
                    "A",
                    vec![
                        TreeValue::with_children("A1", vec![TreeValue::leaf("x")]),
                        TreeValue::leaf("A2"),
                    ],
                ),
                TreeValue::leaf("B"),
            ],
        );
        let mut tree = MindTree::build(&value, ShapePolicy::default());
        let root = tree.root();
        let a = tree[root].visible_children()[0];
        let b = tree[root].visible_children()[1];
        assert_eq!(node_fill(&tree[root]), ROOT_FILL);
        assert_eq!(node_fill(&tree[a]), CIRCLE_EXPANDABLE_FILL);
        assert_eq!(node_fill(&tree[b]), CIRCLE_FILL);

        tree.toggle(a).unwrap();
        let a1 = tree[a].visible_children()[0];
        let a2 = tree[a].visible_children()[1];
        assert_eq!(node_fill(&tree[a]), CIRCLE_FILL);
        assert_eq!(node_fill(&tree[a1]), RECT_EXPANDABLE_FILL);
        assert_eq!(node_fill(&tree[a2]), RECT_FILL);
        assert_eq!(label_color(&tree[a2]), Color32::from_rgb(0x33, 0x33, 0x33));
    }

    #[test]
    fn outlines_close_on_themselves() {
        let center = pos2(100.0, 100.0);
        for geometry in [
            ShapeGeometry::Circle { radius: 40.0 },
            ShapeGeometry::Rect {
                width: 120.0,
                height: 60.0,
            },
        ] {
            let points = outline_points(geometry, center, 1.5);
            let first = points.first().copied().unwrap();
            let last = points.last().copied().unwrap();
            assert!(first.distance(last) < 1e-3);
            let half = screen_half_size(geometry, 1.5);
            for point in points {
                assert!((point.x - center.x).abs() <= half.x + 1e-3);
                assert!((point.y - center.y).abs() <= half.y + 1e-3);
            }
        }
    }
}
