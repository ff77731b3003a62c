use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use eframe::egui::{Vec2, vec2};

pub fn stable_pair(key: impl Hash) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

/// Unit direction spread by the golden angle, stable for a given index.
pub fn golden_direction(index: usize, offset: f32) -> Vec2 {
    let angle = ((index as f32) * 0.618_034 + offset) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

pub fn format_coords(position: Vec2) -> String {
    format!("X:{:.0}, Y:{:.0}", position.x, position.y)
}
