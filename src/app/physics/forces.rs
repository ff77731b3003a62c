use eframe::egui::Vec2;

use super::quadtree::QuadNode;
use crate::util::golden_direction;

/// Squared distance below which charge and collision treat two points as touching.
const DISTANCE_MIN_SQ: f32 = 1.0;

#[derive(Clone, Copy, Debug)]
pub(super) struct Link {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) distance: f32,
    /// Share of the correction applied to the target; the source gets the rest.
    pub(super) bias: f32,
}

/// Tiny deterministic offset used when two points coincide.
fn jiggle(seed: usize) -> Vec2 {
    golden_direction(seed, 0.37) * 1e-6
}

fn nonzero(delta: Vec2, seed: usize) -> Vec2 {
    if delta == Vec2::ZERO { jiggle(seed) } else { delta }
}

/// Like [`nonzero`], but opposite for the two directions of a pair so coincident points split.
fn pair_delta(delta: Vec2, index: usize, other: usize) -> Vec2 {
    if delta != Vec2::ZERO {
        return delta;
    }
    let offset = jiggle(index.min(other) * 31 + index.max(other));
    if index < other { offset } else { -offset }
}

/// Springs every link toward its rest length, reading positions one step ahead.
pub(super) fn apply_links(
    links: &[Link],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    strength: f32,
    alpha: f32,
) {
    for (index, link) in links.iter().enumerate() {
        let (source, target) = (link.source, link.target);
        let delta = nonzero(
            positions[target] + velocities[target] - positions[source] - velocities[source],
            index,
        );
        let length = delta.length();
        let correction = delta * ((length - link.distance) / length * alpha * strength);

        velocities[target] -= correction * link.bias;
        velocities[source] += correction * (1.0 - link.bias);
    }
}

pub(super) fn accumulate_charge_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    charges: &[f32],
    theta_sq: f32,
    alpha: f32,
    velocity: &mut Vec2,
) {
    if node.charge == 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            let delta = pair_delta(positions[other] - point, index, other);
            *velocity += delta * (charges[other] * alpha / softened(delta.length_sq()));
        }
        return;
    }

    let delta = node.center - point;
    let distance_sq = delta.length_sq();
    let side = node.bounds.side_length();
    let can_approximate = !node.bounds.contains(point) && side * side < theta_sq * distance_sq;

    if can_approximate {
        *velocity += delta * (node.charge * alpha / softened(distance_sq));
        return;
    }

    for child in node.children() {
        accumulate_charge_for_node(child, index, positions, charges, theta_sq, alpha, velocity);
    }
}

fn softened(distance_sq: f32) -> f32 {
    if distance_sq < DISTANCE_MIN_SQ {
        (DISTANCE_MIN_SQ * distance_sq).sqrt().max(f32::EPSILON)
    } else {
        distance_sq
    }
}

/// Pushes apart every pair closer than the sum of their radii.
///
/// `predicted` holds positions one step ahead; the tree over it prunes cell pairs whose gap
/// exceeds their largest radii.
pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    predicted: &[Vec2],
    radii: &[f32],
    strength: f32,
    velocities: &mut [Vec2],
) {
    let reach = node_a.max_radius + node_b.max_radius;
    if node_a.bounds.distance_sq_to(node_b.bounds) > reach * reach {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    resolve_overlap(from, to, predicted, radii, strength, velocities);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    resolve_overlap(from, to, predicted, radii, strength, velocities);
                }
            }
        }
        return;
    }

    if same_node {
        let children = node_a.children().collect::<Vec<_>>();
        for (offset, child_a) in children.iter().enumerate() {
            accumulate_collision_pairs(child_a, child_a, true, predicted, radii, strength, velocities);
            for child_b in &children[offset + 1..] {
                accumulate_collision_pairs(
                    child_a, child_b, false, predicted, radii, strength, velocities,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children() {
            accumulate_collision_pairs(child, node_b, false, predicted, radii, strength, velocities);
        }
    } else {
        for child in node_b.children() {
            accumulate_collision_pairs(node_a, child, false, predicted, radii, strength, velocities);
        }
    }
}

fn resolve_overlap(
    from: usize,
    to: usize,
    predicted: &[Vec2],
    radii: &[f32],
    strength: f32,
    velocities: &mut [Vec2],
) {
    let reach = radii[from] + radii[to];
    let mut delta = predicted[from] - predicted[to];
    let mut distance_sq = delta.length_sq();
    if distance_sq >= reach * reach {
        return;
    }

    if distance_sq < f32::EPSILON {
        delta = golden_direction(from * 31 + to, 0.41) * 1e-3;
        distance_sq = delta.length_sq();
    }

    let distance = distance_sq.sqrt();
    let push = delta * ((reach - distance) / distance * strength);
    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let total = (from_sq + to_sq).max(f32::EPSILON);
    // The larger node moves less.
    let share = to_sq / total;

    velocities[from] += push * share;
    velocities[to] -= push * (1.0 - share);
}

/// Shifts free nodes so the mean position drifts toward the origin.
pub(super) fn apply_centering(positions: &mut [Vec2], free: &[bool], strength: f32) {
    if positions.is_empty() {
        return;
    }

    let mean = positions.iter().fold(Vec2::ZERO, |sum, &position| sum + position)
        / positions.len() as f32;
    let shift = mean * strength;
    for (position, &is_free) in positions.iter_mut().zip(free) {
        if is_free {
            *position -= shift;
        }
    }
}
