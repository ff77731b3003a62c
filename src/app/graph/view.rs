use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, StrokeKind, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::mindmap::{MetricsConfig, NodeId, ShapeGeometry};

use super::super::render_utils::{
    EDGE_COLOR, EXPANDABLE_OUTLINE, RECT_CORNER_RADIUS, SEARCH_HIGHLIGHT, blend_color,
    dashed_outline, draw_background, label_color, node_fill, screen_half_size, shape_visible,
};
use super::super::session::SceneNode;
use super::super::viewport::ViewTransform;
use super::super::{PainterTextMeasure, SearchMatchCache, ViewModel};

/// Labels smaller than this many screen pixels are skipped.
const MIN_LABEL_PX: f32 = 4.0;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl ViewModel {
    /// Nodes whose label or content fuzzily matches the search box, hidden ones included.
    pub(in crate::app) fn cached_search_matches(&mut self) -> Option<Arc<HashSet<NodeId>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.dataset_revision == self.dataset_revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .session
            .tree()
            .nodes()
            .filter(|node| {
                fuzzy_match_score(&matcher, node.label(), query).is_some()
                    || node
                        .content
                        .as_deref()
                        .is_some_and(|content| fuzzy_match_score(&matcher, content, query).is_some())
            })
            .map(|node| node.id)
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            dataset_revision: self.dataset_revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        let now = ui.input(|input| input.time);

        self.handle_canvas_zoom(ui, rect, &response, now);
        self.handle_canvas_pointer(rect, &response, now);

        let measure = PainterTextMeasure { painter: &painter };
        let moving = self.session.advance(now, &measure, rect.size());
        if moving || response.dragged() || self.session.has_pending_frame() {
            ui.ctx().request_repaint();
        }

        let transform = self.session.transform();
        draw_background(&painter, rect, transform.pan, transform.zoom);

        let matches = self.cached_search_matches();
        let hovered = self.hovered_node(ui, rect, now);
        if hovered.is_some() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }

        let metrics = self.session.config().metrics;
        let scene = self.session.frame(now);

        let edge_width = (2.0 * transform.zoom).max(0.75);
        for edge in &scene.edges {
            let start = transform.world_to_screen(rect, edge.from);
            let end = transform.world_to_screen(rect, edge.to);
            if !rect.intersects(Rect::from_two_pos(start, end)) {
                continue;
            }
            let color = if matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&edge.target))
            {
                SEARCH_HIGHLIGHT
            } else {
                EDGE_COLOR
            };
            painter.line_segment(
                [start, end],
                Stroke::new(edge_width, color.gamma_multiply(edge.opacity)),
            );
        }

        for scene_node in &scene.nodes {
            let is_match = matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&scene_node.node.id));
            let is_hovered = hovered == Some(scene_node.node.id);
            draw_node(
                &painter,
                rect,
                transform,
                &metrics,
                scene_node,
                is_match,
                is_hovered,
            );
        }

        if let Some(id) = hovered {
            let node = &self.session.tree()[id];
            let mut readout = node.label().to_owned();
            if let Some(content) = node.content.as_deref().filter(|content| !content.is_empty()) {
                readout.push_str("  |  ");
                readout.extend(content.chars().take(120));
            }
            if node.pinned.is_some() && node.parent.is_some() {
                readout.push_str("  |  pinned");
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                readout,
                FontId::proportional(13.0),
                Color32::from_gray(40),
            );
        }
    }
}

fn draw_node(
    painter: &egui::Painter,
    canvas: Rect,
    transform: ViewTransform,
    metrics: &MetricsConfig,
    scene_node: &SceneNode<'_>,
    is_match: bool,
    is_hovered: bool,
) {
    let zoom = transform.zoom;
    let center = transform.world_to_screen(canvas, scene_node.position);
    let half = screen_half_size(scene_node.geometry, zoom);
    if !shape_visible(canvas, center, half) {
        return;
    }

    let node = scene_node.node;
    let opacity = scene_node.opacity;
    let mut fill = node_fill(node);
    if is_match {
        fill = blend_color(fill, SEARCH_HIGHLIGHT, 0.45);
    }
    if is_hovered {
        fill = blend_color(fill, Color32::WHITE, 0.2);
    }
    let fill = fill.gamma_multiply(opacity);

    let expandable = node.has_hidden_children() && !scene_node.exiting;
    let outline = Stroke::new(
        (1.5 * zoom).max(0.5),
        match scene_node.geometry {
            ShapeGeometry::Circle { .. } => Color32::WHITE,
            ShapeGeometry::Rect { .. } => Color32::from_gray(0xcc),
        }
        .gamma_multiply(opacity),
    );

    match scene_node.geometry {
        ShapeGeometry::Circle { radius } => {
            painter.circle_filled(center, radius * zoom, fill);
            if !expandable {
                painter.circle_stroke(center, radius * zoom, outline);
            }
        }
        ShapeGeometry::Rect { .. } => {
            let shape_rect = Rect::from_center_size(center, half * 2.0);
            let corner = RECT_CORNER_RADIUS * zoom;
            painter.rect_filled(shape_rect, corner, fill);
            if !expandable {
                painter.rect_stroke(shape_rect, corner, outline, StrokeKind::Inside);
            }
        }
    }

    if expandable {
        dashed_outline(
            painter,
            scene_node.geometry,
            center,
            zoom,
            Stroke::new(
                (2.0 * zoom).max(0.75),
                EXPANDABLE_OUTLINE.gamma_multiply(opacity),
            ),
        );
    }

    if is_match {
        let ring = Stroke::new(2.0, SEARCH_HIGHLIGHT.gamma_multiply(opacity));
        match scene_node.geometry {
            ShapeGeometry::Circle { radius } => {
                painter.circle_stroke(center, radius * zoom + 4.0, ring);
            }
            ShapeGeometry::Rect { .. } => {
                painter.rect_stroke(
                    Rect::from_center_size(center, half * 2.0).expand(4.0),
                    RECT_CORNER_RADIUS * zoom + 4.0,
                    ring,
                    StrokeKind::Outside,
                );
            }
        }
    }

    draw_label(painter, canvas, transform, metrics, scene_node);
}

/// Wrapped label lines above the coordinate readout, both centered on the node.
fn draw_label(
    painter: &egui::Painter,
    canvas: Rect,
    transform: ViewTransform,
    metrics: &MetricsConfig,
    scene_node: &SceneNode<'_>,
) {
    let Some(node_metrics) = &scene_node.node.metrics else {
        return;
    };
    let text = &node_metrics.text;
    let zoom = transform.zoom;
    if text.font_size * zoom < MIN_LABEL_PX {
        return;
    }

    let color = label_color(scene_node.node).gamma_multiply(scene_node.opacity);
    let font = FontId::proportional(text.font_size * zoom);
    let top = metrics.label_center_y() - text.height * 0.5;
    for (index, line) in text.lines.iter().enumerate() {
        let offset = vec2(0.0, top + text.line_height * (index as f32 + 0.5));
        painter.text(
            transform.world_to_screen(canvas, scene_node.position + offset),
            Align2::CENTER_CENTER,
            line,
            font.clone(),
            color,
        );
    }

    if metrics.coord_font_size * zoom >= MIN_LABEL_PX {
        let offset = vec2(0.0, metrics.coord_center_y(text.height));
        painter.text(
            transform.world_to_screen(canvas, scene_node.position + offset),
            Align2::CENTER_CENTER,
            scene_node.coord_label(),
            FontId::proportional(metrics.coord_font_size * zoom),
            color.gamma_multiply(0.75),
        );
    }
}
