use eframe::egui::{Pos2, Rect, Vec2};
use log::debug;

use super::animation::{AnimationSlots, AnimationToken, Tween, ease_cubic_in_out};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub frame_padding: f32,
    pub fit_min_zoom: f32,
    pub fit_max_zoom: f32,
    pub camera_duration_secs: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 5.0,
            frame_padding: 60.0,
            fit_min_zoom: 0.5,
            fit_max_zoom: 2.0,
            camera_duration_secs: 0.75,
        }
    }
}

impl ViewportConfig {
    /// Bounds with `min <= max` and both positive.
    pub fn normalized(self) -> Self {
        let min_zoom = self.min_zoom.max(0.01);
        Self {
            min_zoom,
            max_zoom: self.max_zoom.max(min_zoom),
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    /// Screen offset of the world origin from the canvas center.
    pub pan: Vec2,
    pub zoom: f32,
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        pan: Vec2::ZERO,
        zoom: 1.0,
    };

    pub fn world_to_screen(self, canvas: Rect, world: Vec2) -> Pos2 {
        canvas.center() + self.pan + world * self.zoom
    }

    pub fn screen_to_world(self, canvas: Rect, screen: Pos2) -> Vec2 {
        (screen - canvas.center() - self.pan) / self.zoom
    }

    fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            pan: self.pan + (other.pan - self.pan) * t,
            zoom: self.zoom + (other.zoom - self.zoom) * t,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct CameraMove {
    token: AnimationToken,
    from: ViewTransform,
    to: ViewTransform,
    tween: Tween,
}

/// Pan/zoom state plus the animated "frame into view" camera move.
#[derive(Debug)]
pub struct Viewport {
    config: ViewportConfig,
    transform: ViewTransform,
    camera: Option<CameraMove>,
    tokens: AnimationSlots<()>,
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config: config.normalized(),
            transform: ViewTransform::IDENTITY,
            camera: None,
            tokens: AnimationSlots::default(),
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn is_animating(&self) -> bool {
        self.camera.is_some()
    }

    fn cancel_camera(&mut self) {
        if self.camera.take().is_some() {
            self.tokens.cancel(());
            debug!("camera move cancelled by user gesture");
        }
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.cancel_camera();
        self.transform.pan += delta;
    }

    /// Zooms by `factor` keeping the world point under `anchor` fixed.
    ///
    /// `anchor` is a screen offset from the canvas center.
    pub fn zoom_around(&mut self, anchor: Vec2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.cancel_camera();
        let world_before = (anchor - self.transform.pan) / self.transform.zoom;
        self.transform.zoom =
            (self.transform.zoom * factor).clamp(self.config.min_zoom, self.config.max_zoom);
        self.transform.pan = anchor - world_before * self.transform.zoom;
    }

    pub fn reset(&mut self) {
        self.cancel_camera();
        self.transform = ViewTransform::IDENTITY;
    }

    /// Transform that centers `bounds` inside a canvas of `viewport_size`.
    ///
    /// A box with no width or height keeps the current zoom and is only centered.
    pub fn fit_transform(&self, bounds: Rect, viewport_size: Vec2) -> ViewTransform {
        let padding = self.config.frame_padding * 2.0;
        let available = (viewport_size - Vec2::splat(padding)).max(Vec2::splat(1.0));
        let size = bounds.size();

        let zoom = if size.x > 0.0 && size.y > 0.0 {
            (available.x / size.x)
                .min(available.y / size.y)
                .clamp(self.config.fit_min_zoom, self.config.fit_max_zoom)
                .clamp(self.config.min_zoom, self.config.max_zoom)
        } else {
            self.transform.zoom
        };

        ViewTransform {
            pan: -bounds.center().to_vec2() * zoom,
            zoom,
        }
    }

    pub fn animate_to(&mut self, target: ViewTransform, now: f64) {
        let token = self.tokens.start(());
        self.camera = Some(CameraMove {
            token,
            from: self.transform,
            to: target,
            tween: Tween::new(now, self.config.camera_duration_secs),
        });
    }

    /// Advances the camera move; returns `true` while it is still running.
    pub fn step(&mut self, now: f64) -> bool {
        let Some(camera) = self.camera else {
            return false;
        };

        let t = camera.tween.progress(now);
        self.transform = camera.from.lerp(camera.to, ease_cubic_in_out(t));
        if camera.tween.is_finished(now) {
            if self.tokens.complete((), camera.token) {
                self.transform = camera.to;
            }
            self.camera = None;
            return false;
        }
        true
    }
}

/// Union of the given `(center, size)` boxes.
pub fn frame_bounds(boxes: impl IntoIterator<Item = (Vec2, Vec2)>) -> Option<Rect> {
    boxes
        .into_iter()
        .map(|(center, size)| Rect::from_center_size(center.to_pos2(), size))
        .reduce(|bounds, rect| bounds.union(rect))
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    #[test]
    fn zoom_is_clamped_and_keeps_anchor() {
        let mut viewport = Viewport::new(ViewportConfig::default());
        let canvas = Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0));
        let anchor = vec2(100.0, -50.0);
        let world = viewport
            .transform()
            .screen_to_world(canvas, canvas.center() + anchor);

        viewport.zoom_around(anchor, 2.0);
        let after = viewport.transform().world_to_screen(canvas, world);
        assert!((after - (canvas.center() + anchor)).length() < 1e-3);

        viewport.zoom_around(anchor, 100.0);
        assert_eq!(viewport.transform().zoom, 5.0);
        viewport.zoom_around(anchor, 0.0001);
        assert_eq!(viewport.transform().zoom, 0.5);
    }

    #[test]
    fn fit_centers_box_and_clamps_scale() {
        let viewport = Viewport::new(ViewportConfig::default());
        let bounds = Rect::from_min_max(pos2(100.0, 100.0), pos2(300.0, 200.0));
        let fit = viewport.fit_transform(bounds, vec2(1000.0, 800.0));
        assert_eq!(fit.zoom, 2.0);
        assert_eq!(fit.pan, vec2(-400.0, -300.0));

        let huge = Rect::from_min_max(pos2(-5000.0, -5000.0), pos2(5000.0, 5000.0));
        assert_eq!(viewport.fit_transform(huge, vec2(1000.0, 800.0)).zoom, 0.5);
    }

    #[test]
    fn degenerate_box_keeps_zoom() {
        let mut viewport = Viewport::new(ViewportConfig::default());
        viewport.zoom_around(Vec2::ZERO, 1.5);
        let point = Rect::from_min_max(pos2(10.0, 20.0), pos2(10.0, 20.0));
        let fit = viewport.fit_transform(point, vec2(800.0, 600.0));
        assert_eq!(fit.zoom, 1.5);
        assert_eq!(fit.pan, vec2(-15.0, -30.0));
    }

    #[test]
    fn camera_eases_to_target_then_stops() {
        let mut viewport = Viewport::new(ViewportConfig::default());
        let target = ViewTransform {
            pan: vec2(200.0, 0.0),
            zoom: 2.0,
        };
        viewport.animate_to(target, 1.0);
        assert!(viewport.step(1.375));
        let mid = viewport.transform();
        assert!((mid.pan.x - 100.0).abs() < 1e-3);
        assert!(!viewport.step(2.0));
        assert_eq!(viewport.transform(), target);
        assert!(!viewport.is_animating());
    }

    #[test]
    fn gesture_cancels_camera_move() {
        let mut viewport = Viewport::new(ViewportConfig::default());
        viewport.animate_to(
            ViewTransform {
                pan: vec2(500.0, 500.0),
                zoom: 3.0,
            },
            0.0,
        );
        viewport.step(0.1);
        viewport.pan_by(vec2(5.0, 0.0));
        assert!(!viewport.is_animating());
        let held = viewport.transform();
        assert!(!viewport.step(5.0));
        assert_eq!(viewport.transform(), held);
    }

    #[test]
    fn bounds_union_boxes() {
        let bounds = frame_bounds([
            (Vec2::ZERO, vec2(20.0, 20.0)),
            (vec2(100.0, 50.0), vec2(40.0, 10.0)),
        ])
        .unwrap();
        assert_eq!(bounds.min, pos2(-10.0, -10.0));
        assert_eq!(bounds.max, pos2(120.0, 55.0));
        assert!(frame_bounds(std::iter::empty()).is_none());
    }
}
