mod forces;
mod quadtree;

use std::collections::HashMap;

use eframe::egui::Vec2;
use log::debug;

use crate::mindmap::{MindTree, NodeId, ShapeGeometry};
use forces::{
    Link, accumulate_charge_for_node, accumulate_collision_pairs, apply_centering, apply_links,
};
use quadtree::QuadNode;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceConfig {
    pub root_link_distance: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    /// Charge for depth 0, depth 1 and everything deeper.
    pub charge_by_depth: [f32; 3],
    pub repulsion_scale: f32,
    pub theta: f32,
    pub collision_padding: f32,
    pub collision_strength: f32,
    pub center_strength: f32,
    pub velocity_decay: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            root_link_distance: 280.0,
            link_distance: 170.0,
            link_strength: 0.9,
            charge_by_depth: [-3000.0, -2000.0, -800.0],
            repulsion_scale: 1.0,
            theta: 0.9,
            collision_padding: 25.0,
            collision_strength: 1.0,
            center_strength: 0.1,
            velocity_decay: 0.4,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
        }
    }
}

impl ForceConfig {
    /// Clamps the live-tunable scales to ranges the integrator stays stable in.
    pub fn clamped(self) -> Self {
        Self {
            repulsion_scale: self.repulsion_scale.clamp(0.1, 3.0),
            link_strength: self.link_strength.clamp(0.05, 1.0),
            collision_padding: self.collision_padding.clamp(0.0, 120.0),
            velocity_decay: self.velocity_decay.clamp(0.05, 0.95),
            ..self
        }
    }

    fn charge_for(&self, depth: usize) -> f32 {
        self.charge_by_depth[depth.min(2)] * self.repulsion_scale
    }
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    predicted: Vec<Vec2>,
    free: Vec<bool>,
}

/// Force layout over the visible part of a [`MindTree`].
///
/// Positions and velocities stay on the tree nodes; the simulation only keeps the member
/// list, derived link and radius tables, and its energy schedule.
pub struct Simulation {
    config: ForceConfig,
    alpha: f32,
    alpha_target: f32,
    members: Vec<NodeId>,
    slot_by_id: HashMap<NodeId, usize>,
    links: Vec<Link>,
    charges: Vec<f32>,
    radii: Vec<f32>,
    scratch: PhysicsScratch,
}

impl Simulation {
    pub fn new(config: ForceConfig) -> Self {
        Self {
            config: config.clamped(),
            alpha: 0.0,
            alpha_target: 0.0,
            members: Vec::new(),
            slot_by_id: HashMap::new(),
            links: Vec::new(),
            charges: Vec::new(),
            radii: Vec::new(),
            scratch: PhysicsScratch::default(),
        }
    }

    pub fn config(&self) -> ForceConfig {
        self.config
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn is_running(&self) -> bool {
        self.alpha >= self.config.alpha_min || self.alpha_target >= self.config.alpha_min
    }

    pub fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    /// Replaces the member set with the tree's visible nodes and sets the energy to `alpha`.
    pub fn reseed(&mut self, tree: &MindTree, alpha: f32) {
        self.members = tree.visible_nodes();
        self.slot_by_id = self
            .members
            .iter()
            .enumerate()
            .map(|(slot, &id)| (id, slot))
            .collect();
        self.rebuild_tables(tree);
        self.alpha = alpha.clamp(0.0, 1.0);
        debug!(
            "simulation reseeded with {} nodes, {} links, alpha {:.2}",
            self.members.len(),
            self.links.len(),
            self.alpha
        );
    }

    pub fn set_config(&mut self, config: ForceConfig, tree: &MindTree) {
        let config = config.clamped();
        if config == self.config {
            return;
        }
        self.config = config;
        self.rebuild_tables(tree);
    }

    /// Recomputes exclusion radii from the current node geometry.
    pub fn refresh_radii(&mut self, tree: &MindTree) {
        let padding = self.config.collision_padding;
        self.radii.clear();
        self.radii.extend(self.members.iter().map(|&id| {
            let node = &tree[id];
            let geometry = node
                .metrics
                .as_ref()
                .map(|metrics| metrics.geometry)
                .unwrap_or_else(|| ShapeGeometry::fallback(node.shape));
            geometry.bounding_radius() + padding
        }));
    }

    fn rebuild_tables(&mut self, tree: &MindTree) {
        let root = tree.root();
        let mut degree = vec![0usize; self.members.len()];
        let mut pairs = Vec::with_capacity(self.members.len());
        for (target, &id) in self.members.iter().enumerate() {
            let Some(parent) = tree[id].parent else {
                continue;
            };
            let Some(&source) = self.slot_by_id.get(&parent) else {
                continue;
            };
            degree[source] += 1;
            degree[target] += 1;
            pairs.push((source, target, parent == root));
        }

        self.links = pairs
            .into_iter()
            .map(|(source, target, from_root)| Link {
                source,
                target,
                distance: if from_root {
                    self.config.root_link_distance
                } else {
                    self.config.link_distance
                },
                bias: degree[source] as f32 / (degree[source] + degree[target]) as f32,
            })
            .collect();

        self.charges = self
            .members
            .iter()
            .map(|&id| self.config.charge_for(tree[id].depth))
            .collect();
        self.refresh_radii(tree);
    }

    /// Advances one step. Returns `false` once the energy has decayed below the threshold.
    pub fn tick(&mut self, tree: &mut MindTree) -> bool {
        if !self.is_running() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        if self.radii.len() != self.members.len() {
            self.refresh_radii(tree);
        }

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.velocities.clear();
        scratch.free.clear();
        for &id in &self.members {
            let node = &tree[id];
            scratch.positions.push(node.position);
            scratch.velocities.push(node.velocity);
            scratch.free.push(node.pinned.is_none());
        }

        let config = self.config;
        let alpha = self.alpha;

        apply_links(
            &self.links,
            &scratch.positions,
            &mut scratch.velocities,
            config.link_strength,
            alpha,
        );

        if let Some(quadtree) = QuadNode::build(&scratch.positions, &self.charges, &self.radii) {
            let theta_sq = config.theta * config.theta;
            for (index, velocity) in scratch.velocities.iter_mut().enumerate() {
                accumulate_charge_for_node(
                    &quadtree,
                    index,
                    &scratch.positions,
                    &self.charges,
                    theta_sq,
                    alpha,
                    velocity,
                );
            }
        }

        apply_centering(&mut scratch.positions, &scratch.free, config.center_strength);

        scratch.predicted.clear();
        scratch.predicted.extend(
            scratch
                .positions
                .iter()
                .zip(&scratch.velocities)
                .map(|(&position, &velocity)| position + velocity),
        );
        if let Some(quadtree) = QuadNode::build(&scratch.predicted, &self.charges, &self.radii) {
            accumulate_collision_pairs(
                &quadtree,
                &quadtree,
                true,
                &scratch.predicted,
                &self.radii,
                config.collision_strength,
                &mut scratch.velocities,
            );
        }

        let retain = 1.0 - config.velocity_decay;
        for (slot, &id) in self.members.iter().enumerate() {
            let node = &mut tree[id];
            if let Some(pin) = node.pinned {
                node.position = pin;
                node.velocity = Vec2::ZERO;
                continue;
            }

            let velocity = scratch.velocities[slot] * retain;
            let position = scratch.positions[slot] + velocity;
            if position.x.is_finite() && position.y.is_finite() {
                node.velocity = velocity;
                node.position = position;
            } else {
                node.velocity = Vec2::ZERO;
            }
        }

        true
    }

    /// Runs until the energy decays or `max_ticks` is reached; returns the ticks taken.
    pub fn settle(&mut self, tree: &mut MindTree, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.tick(tree) {
            ticks += 1;
        }
        ticks
    }
}
