use std::collections::HashMap;

use anyhow::{Result, anyhow};
use eframe::egui::Vec2;
use log::{debug, info, warn};

use super::animation::{AnimationSlots, AnimationToken, Tween, ease_cubic_in_out};
use super::physics::{ForceConfig, Simulation};
use super::viewport::{ViewTransform, Viewport, ViewportConfig, frame_bounds};
use crate::mindmap::{
    ExportRecord, MetricsConfig, MindTree, NodeId, ShapeGeometry, ShapePolicy, Side, TextMeasure,
    ToggleOutcome, TreeNode, TreeValue, compute_metrics, export_records,
};
use crate::util::{format_coords, golden_direction, stable_pair};

/// A discrete user gesture applied to a [`Session`].
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    LoadTree(TreeValue),
    ToggleNode(NodeId),
    /// Drag: fix `id` at `position` in simulation space.
    PinNode { id: NodeId, position: Vec2 },
    ReleaseNode(NodeId),
    PanBy(Vec2),
    /// `anchor` is a screen offset from the canvas center.
    ZoomAround { anchor: Vec2, factor: f32 },
    ResetView,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    pub forces: ForceConfig,
    pub metrics: MetricsConfig,
    pub viewport: ViewportConfig,
    pub shape_policy: ShapePolicy,
    pub transition_secs: f32,
    pub initial_alpha: f32,
    pub reheat_alpha: f32,
    pub drag_alpha_target: f32,
    /// The camera frames an expansion once alpha drops below this.
    pub frame_alpha_threshold: f32,
    /// Upper bound on how long a frame request waits for the simulation.
    pub frame_deadline_secs: f32,
    pub initial_spread: f32,
    pub reveal_spread: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            forces: ForceConfig::default(),
            metrics: MetricsConfig::default(),
            viewport: ViewportConfig::default(),
            shape_policy: ShapePolicy::default(),
            transition_secs: 0.25,
            initial_alpha: 1.0,
            reheat_alpha: 0.6,
            drag_alpha_target: 0.3,
            frame_alpha_threshold: 0.45,
            frame_deadline_secs: 1.5,
            initial_spread: 100.0,
            reveal_spread: 20.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum TransitionKind {
    Enter { from: Vec2 },
    Exit { toward: NodeId },
}

#[derive(Clone, Copy, Debug)]
struct NodeTransition {
    token: AnimationToken,
    kind: TransitionKind,
    tween: Tween,
}

#[derive(Clone, Copy, Debug)]
struct PendingFrame {
    node: NodeId,
    requested_at: f64,
}

/// One positioned node of a rendered frame.
#[derive(Clone, Debug)]
pub struct SceneNode<'a> {
    pub node: &'a TreeNode,
    pub position: Vec2,
    pub opacity: f32,
    pub geometry: ShapeGeometry,
    pub exiting: bool,
}

impl SceneNode<'_> {
    pub fn coord_label(&self) -> String {
        format_coords(self.node.position)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneEdge {
    pub from: Vec2,
    pub to: Vec2,
    pub target: NodeId,
    pub opacity: f32,
}

#[derive(Clone, Debug, Default)]
pub struct Scene<'a> {
    pub nodes: Vec<SceneNode<'a>>,
    pub edges: Vec<SceneEdge>,
}

/// Everything one open diagram owns: the tree, its simulation, the camera and the running
/// transitions. A new dataset replaces all of it.
pub struct Session {
    config: SessionConfig,
    tree: MindTree,
    simulation: Simulation,
    viewport: Viewport,
    transitions: HashMap<NodeId, NodeTransition>,
    tokens: AnimationSlots<NodeId>,
    pending_frame: Option<PendingFrame>,
    visibility_revision: u64,
    measured_revision: Option<u64>,
}

impl Session {
    pub fn new(value: &TreeValue, config: SessionConfig) -> Self {
        let tree = MindTree::build(value, config.shape_policy);
        let mut session = Self {
            config,
            simulation: Simulation::new(config.forces),
            viewport: Viewport::new(config.viewport),
            tree,
            transitions: HashMap::new(),
            tokens: AnimationSlots::default(),
            pending_frame: None,
            visibility_revision: 0,
            measured_revision: None,
        };
        session.start_fresh();
        session
    }

    fn start_fresh(&mut self) {
        let root = self.tree.root();
        let children = self.tree[root].visible_children().to_vec();
        self.seed_children(root, &children, self.config.initial_spread);
        for id in self.tree.visible_nodes() {
            let node = &mut self.tree[id];
            node.previous_position = node.position;
        }

        self.simulation.reseed(&self.tree, self.config.initial_alpha);
        self.simulation.set_alpha_target(0.0);
        self.viewport.reset();
        self.transitions.clear();
        self.tokens.clear();
        self.pending_frame = None;
        self.visibility_revision += 1;
        info!(
            "session loaded {} nodes ({} visible)",
            self.tree.len(),
            self.simulation.members().len()
        );
    }

    pub fn tree(&self) -> &MindTree {
        &self.tree
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn transform(&self) -> ViewTransform {
        self.viewport.transform()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    pub fn is_camera_moving(&self) -> bool {
        self.viewport.is_animating()
    }

    pub fn export_records(&self) -> Vec<ExportRecord> {
        export_records(&self.tree)
    }

    pub fn set_force_config(&mut self, forces: ForceConfig) {
        if forces == self.simulation.config() {
            return;
        }
        self.simulation.set_config(forces, &self.tree);
        self.config.forces = self.simulation.config();
        let alpha = self.simulation.alpha().max(self.config.drag_alpha_target);
        self.simulation.reseed(&self.tree, alpha);
    }

    /// The single mutation entry point for user gestures.
    pub fn apply(&mut self, command: Command, now: f64) -> Result<()> {
        match command {
            Command::LoadTree(value) => {
                self.tree = MindTree::build(&value, self.config.shape_policy);
                self.measured_revision = None;
                self.start_fresh();
            }
            Command::ToggleNode(id) => self.toggle(id, now)?,
            Command::PinNode { id, position } => {
                self.require(id)?;
                if id == self.tree.root() {
                    warn!("ignoring drag of the root node");
                    return Ok(());
                }
                let node = &mut self.tree[id];
                node.pinned = Some(position);
                node.position = position;
                node.velocity = Vec2::ZERO;
                self.simulation
                    .set_alpha_target(self.config.drag_alpha_target);
            }
            Command::ReleaseNode(id) => {
                self.require(id)?;
                if id != self.tree.root() {
                    self.tree[id].pinned = None;
                }
                self.simulation.set_alpha_target(0.0);
            }
            Command::PanBy(delta) => self.viewport.pan_by(delta),
            Command::ZoomAround { anchor, factor } => self.viewport.zoom_around(anchor, factor),
            Command::ResetView => self.viewport.reset(),
        }
        Ok(())
    }

    fn require(&self, id: NodeId) -> Result<()> {
        self.tree
            .get(id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("unknown node {id}"))
    }

    fn toggle(&mut self, id: NodeId, now: f64) -> Result<()> {
        self.require(id)?;
        let before = self.tree.visible_nodes();
        let outcome = self.tree.toggle(id)?;
        if !outcome.changed() {
            return Ok(());
        }

        for visible in before {
            let node = &mut self.tree[visible];
            node.previous_position = node.position;
        }

        let source_from = self.tree[id].previous_position;
        let revealed = outcome.revealed().to_vec();
        self.seed_children(id, &revealed, self.config.reveal_spread);
        for &child in &revealed {
            self.start_transition(child, TransitionKind::Enter { from: source_from }, now);
        }

        for &gone in outcome.hidden() {
            let toward = self.nearest_visible_ancestor(gone);
            let node = &mut self.tree[gone];
            node.pinned = None;
            node.velocity = Vec2::ZERO;
            self.start_transition(gone, TransitionKind::Exit { toward }, now);
        }

        let alpha = self.simulation.alpha().max(self.config.reheat_alpha);
        self.simulation.reseed(&self.tree, alpha);
        self.visibility_revision += 1;

        match outcome {
            ToggleOutcome::Expanded { node, .. } => {
                self.pending_frame = Some(PendingFrame {
                    node,
                    requested_at: now,
                });
            }
            ToggleOutcome::Collapsed { node, .. } => {
                if self
                    .pending_frame
                    .is_some_and(|pending| !self.tree.is_visible(pending.node) || pending.node == node)
                {
                    self.pending_frame = None;
                }
            }
            ToggleOutcome::Unchanged => {}
        }
        Ok(())
    }

    fn nearest_visible_ancestor(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.tree[current].parent {
            if self.tree.is_visible(parent) {
                return parent;
            }
            current = parent;
        }
        self.tree.root()
    }

    /// Places `children` around `parent`, honouring left/right hints.
    fn seed_children(&mut self, parent: NodeId, children: &[NodeId], spread: f32) {
        let origin = self.tree[parent].position;
        let (offset, _) = stable_pair(parent.0);
        for (index, &child) in children.iter().enumerate() {
            let mut direction = golden_direction(index, offset);
            match self.tree[child].side {
                Some(Side::Left) => direction.x = -direction.x.abs(),
                Some(Side::Right) => direction.x = direction.x.abs(),
                None => {}
            }
            let node = &mut self.tree[child];
            node.position = origin + direction * spread;
            node.velocity = Vec2::ZERO;
        }
    }

    fn start_transition(&mut self, id: NodeId, kind: TransitionKind, now: f64) {
        let token = self.tokens.start(id);
        self.transitions.insert(
            id,
            NodeTransition {
                token,
                kind,
                tween: Tween::new(now, self.config.transition_secs),
            },
        );
    }

    /// Re-measures every visible node's text and shape.
    pub fn remeasure(&mut self, measure: &dyn TextMeasure) {
        for id in self.tree.visible_nodes() {
            let node = &self.tree[id];
            let metrics = compute_metrics(
                measure,
                &self.config.metrics,
                node.label(),
                node.depth,
                node.shape,
            );
            self.tree[id].metrics = Some(metrics);
        }
        self.simulation.refresh_radii(&self.tree);
        self.measured_revision = Some(self.visibility_revision);
    }

    /// Per-frame step. Returns `true` while anything is still moving.
    pub fn advance(&mut self, now: f64, measure: &dyn TextMeasure, viewport_size: Vec2) -> bool {
        if self.measured_revision != Some(self.visibility_revision) {
            self.remeasure(measure);
        }

        let simulating = self.simulation.tick(&mut self.tree);
        self.resolve_pending_frame(now, viewport_size);
        let camera = self.viewport.step(now);
        self.retire_transitions(now);

        simulating || camera || self.pending_frame.is_some() || !self.transitions.is_empty()
    }

    /// Runs the simulation to rest without animation; returns the ticks taken.
    pub fn settle(&mut self, measure: &dyn TextMeasure, max_ticks: usize) -> usize {
        self.remeasure(measure);
        let ticks = self.simulation.settle(&mut self.tree, max_ticks);
        debug!(
            "settled after {ticks} ticks, alpha {:.4}",
            self.simulation.alpha()
        );
        ticks
    }

    fn resolve_pending_frame(&mut self, now: f64, viewport_size: Vec2) {
        let Some(pending) = self.pending_frame else {
            return;
        };

        let waited = now - pending.requested_at;
        let ready = self.simulation.alpha() < self.config.frame_alpha_threshold
            || !self.simulation.is_running()
            || waited >= self.config.frame_deadline_secs as f64;
        if !ready {
            return;
        }
        self.pending_frame = None;

        let node = pending.node;
        if !self.tree.is_visible(node) || !self.tree[node].is_expanded() {
            debug!("dropping frame request for {node}: no longer expanded");
            return;
        }

        let included = std::iter::once(node).chain(self.tree[node].visible_children().iter().copied());
        let boxes = included
            .map(|id| {
                let node = &self.tree[id];
                (node.position, self.geometry_of(node).size())
            })
            .collect::<Vec<_>>();
        let Some(bounds) = frame_bounds(boxes) else {
            return;
        };

        let target = self.viewport.fit_transform(bounds, viewport_size);
        debug!(
            "framing {node}: zoom {:.2}, pan ({:.0}, {:.0})",
            target.zoom, target.pan.x, target.pan.y
        );
        self.viewport.animate_to(target, now);
    }

    fn retire_transitions(&mut self, now: f64) {
        let finished = self
            .transitions
            .iter()
            .filter(|(_, transition)| transition.tween.is_finished(now))
            .map(|(&id, transition)| (id, transition.token))
            .collect::<Vec<_>>();
        for (id, token) in finished {
            if self.tokens.complete(id, token) {
                self.transitions.remove(&id);
            }
        }
    }

    fn geometry_of(&self, node: &TreeNode) -> ShapeGeometry {
        node.metrics
            .as_ref()
            .map(|metrics| metrics.geometry)
            .unwrap_or_else(|| ShapeGeometry::fallback(node.shape))
    }

    /// Where a visible node is drawn at `now`, with its enter transition eased in.
    fn drawn_placement(&self, node: &TreeNode, now: f64) -> (Vec2, f32) {
        match self.transitions.get(&node.id) {
            Some(NodeTransition {
                kind: TransitionKind::Enter { from },
                tween,
                ..
            }) => {
                let t = ease_cubic_in_out(tween.progress(now));
                (*from + (node.position - *from) * t, t)
            }
            _ => (node.position, 1.0),
        }
    }

    /// Topmost visible node whose shape, as drawn at `now`, contains `world`.
    pub fn hit_test(&self, world: Vec2, now: f64) -> Option<NodeId> {
        self.tree
            .visible_nodes()
            .into_iter()
            .rev()
            .find(|&id| {
                let node = &self.tree[id];
                let (position, _) = self.drawn_placement(node, now);
                let offset = world - position;
                match self.geometry_of(node) {
                    ShapeGeometry::Circle { radius } => offset.length() <= radius,
                    ShapeGeometry::Rect { width, height } => {
                        offset.x.abs() <= width * 0.5 && offset.y.abs() <= height * 0.5
                    }
                }
            })
    }

    /// Render list for `now`: visible nodes in draw order, then exiting ghosts.
    pub fn frame(&self, now: f64) -> Scene<'_> {
        let mut scene = Scene::default();
        let mut placed: Vec<Option<(Vec2, f32)>> = vec![None; self.tree.len()];

        for id in self.tree.visible_nodes() {
            let node = &self.tree[id];
            let (position, opacity) = self.drawn_placement(node, now);
            placed[id.index()] = Some((position, opacity));
            scene.nodes.push(SceneNode {
                node,
                position,
                opacity,
                geometry: self.geometry_of(node),
                exiting: false,
            });
        }

        let mut ghosts = self
            .transitions
            .iter()
            .filter_map(|(&id, transition)| match transition.kind {
                TransitionKind::Exit { toward } if !self.tree.is_visible(id) => {
                    Some((id, toward, transition.tween))
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        ghosts.sort_by_key(|&(id, ..)| id);

        for &(id, toward, tween) in &ghosts {
            let node = &self.tree[id];
            let target = placed[toward.index()]
                .map(|(position, _)| position)
                .unwrap_or(self.tree[toward].position);
            let t = ease_cubic_in_out(tween.progress(now));
            let position = node.position + (target - node.position) * t;
            let opacity = 1.0 - t;
            placed[id.index()] = Some((position, opacity));
            scene.nodes.push(SceneNode {
                node,
                position,
                opacity,
                geometry: self.geometry_of(node),
                exiting: true,
            });
        }

        for scene_node in &scene.nodes {
            let node = scene_node.node;
            let Some(parent) = node.parent else {
                continue;
            };
            let Some((from, _)) = placed[parent.index()] else {
                continue;
            };
            scene.edges.push(SceneEdge {
                from,
                to: scene_node.position,
                target: node.id,
                opacity: scene_node.opacity,
            });
        }

        scene
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::mindmap::ApproxTextMeasure;

    const VIEW: Vec2 = Vec2::new(1200.0, 800.0);

    fn sample() -> TreeValue {
        TreeValue::with_children(
            "Root",
            vec![
                TreeValue::with_children(
                    "A",
                    vec![
                        TreeValue::with_children("A1", vec![TreeValue::leaf("A1a")]),
                        TreeValue::leaf("A2"),
                    ],
                ),
                TreeValue::with_children("B", vec![TreeValue::leaf("B1")]),
                TreeValue::leaf("C"),
            ],
        )
    }

    fn id_of(session: &Session, name: &str) -> NodeId {
        session
            .tree()
            .nodes()
            .find(|node| node.name == name)
            .map(|node| node.id)
            .unwrap()
    }

    fn run(session: &mut Session, from: f64, frames: usize) -> f64 {
        let measure = ApproxTextMeasure::default();
        let mut now = from;
        for _ in 0..frames {
            now += 1.0 / 60.0;
            session.advance(now, &measure, VIEW);
        }
        now
    }

    #[test]
    fn load_shows_root_and_first_level() {
        let session = Session::new(&sample(), SessionConfig::default());
        let scene = session.frame(0.0);
        let names = scene
            .nodes
            .iter()
            .map(|node| node.node.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["Root", "A", "B", "C"]);
        assert_eq!(scene.edges.len(), 3);
        assert!(scene.nodes.iter().all(|node| node.opacity == 1.0));
        assert_eq!(scene.nodes[0].position, Vec2::ZERO);
        assert_eq!(scene.nodes[0].coord_label(), "X:0, Y:0");
        assert_eq!(session.simulation().alpha(), 1.0);
        assert_eq!(session.transform(), ViewTransform::IDENTITY);
    }

    #[test]
    fn advancing_measures_and_keeps_root_pinned() {
        let mut session = Session::new(&sample(), SessionConfig::default());
        run(&mut session, 0.0, 30);
        let tree = session.tree();
        let root = tree.root();
        assert_eq!(tree[root].position, Vec2::ZERO);
        for id in tree.visible_nodes() {
            assert!(tree[id].metrics.is_some());
        }
        assert!(tree[id_of(&session, "A1")].metrics.is_none());
    }

    #[test]
    fn expansion_reveals_children_near_parent_and_fades_them_in() {
        let mut session = Session::new(&sample(), SessionConfig::default());
        let now = run(&mut session, 0.0, 120);
        let a = id_of(&session, "A");
        let a_position = session.tree()[a].position;

        session.apply(Command::ToggleNode(a), now).unwrap();
        let a1 = id_of(&session, "A1");
        let seeded = session.tree()[a1].position;
        assert!((seeded - a_position).length() <= 20.0 + 1e-3);
        assert!(session.simulation().alpha() >= 0.6);
        assert!(session.has_pending_frame());

        let scene = session.frame(now);
        let entering = scene.nodes.iter().find(|node| node.node.id == a1).unwrap();
        assert_eq!(entering.opacity, 0.0);
        assert_eq!(entering.position, a_position);

        let later = run(&mut session, now, 30);
        let scene = session.frame(later);
        let entered = scene.nodes.iter().find(|node| node.node.id == a1).unwrap();
        assert_eq!(entered.opacity, 1.0);
        assert!(session.tree()[a1].metrics.is_some());
    }

    #[test]
    fn expansion_frames_node_once_simulation_cools() {
        let mut session = Session::new(&sample(), SessionConfig::default());
        let now = run(&mut session, 0.0, 400);
        assert!(!session.simulation().is_running());

        let a = id_of(&session, "A");
        session.apply(Command::ToggleNode(a), now).unwrap();
        let measure = ApproxTextMeasure::default();
        session.advance(now + 0.01, &measure, VIEW);
        assert!(session.has_pending_frame());

        let mut t = now + 0.01;
        let mut framed_at = None;
        for _ in 0..120 {
            t += 1.0 / 60.0;
            session.advance(t, &measure, VIEW);
            if !session.has_pending_frame() {
                framed_at = Some(t);
                break;
            }
        }
        let framed_at = framed_at.unwrap();
        assert!(framed_at - now < 1.5);
        assert!(session.simulation().alpha() < 0.45);
        assert!(session.is_camera_moving());

        run(&mut session, framed_at, 60);
        assert!(!session.is_camera_moving());
        let zoom = session.transform().zoom;
        assert!((0.5..=2.0).contains(&zoom));
    }

    #[test]
    fn collapsing_before_framing_drops_the_request() {
        let mut session = Session::new(&sample(), SessionConfig::default());
        let now = run(&mut session, 0.0, 10);
        let a = id_of(&session, "A");
        session.apply(Command::ToggleNode(a), now).unwrap();
        session.apply(Command::ToggleNode(a), now + 0.01).unwrap();
        assert!(!session.has_pending_frame());
        run(&mut session, now, 200);
        assert!(!session.is_camera_moving());
        assert_eq!(session.transform(), ViewTransform::IDENTITY);
    }

    #[test]
    fn collapsed_children_leave_as_fading_ghosts() {
        let mut session = Session::new(&sample(), SessionConfig::default());
        let a = id_of(&session, "A");
        session.apply(Command::ToggleNode(a), 0.0).unwrap();
        let now = run(&mut session, 0.0, 60);

        session.apply(Command::ToggleNode(a), now).unwrap();
        let scene = session.frame(now + 0.125);
        let ghosts = scene.nodes.iter().filter(|node| node.exiting).count();
        assert_eq!(ghosts, 2);
        assert!(
            scene
                .nodes
                .iter()
                .filter(|node| node.exiting)
                .all(|node| node.opacity > 0.0 && node.opacity < 1.0)
        );
        assert!(scene.edges.iter().any(|edge| edge.target == id_of(&session, "A2")));

        run(&mut session, now, 30);
        let scene = session.frame(now + 0.5);
        assert!(scene.nodes.iter().all(|node| !node.exiting));
        assert_eq!(scene.nodes.len(), 4);
    }

    #[test]
    fn reveal_during_exit_supersedes_the_ghost() {
        let mut session = Session::new(&sample(), SessionConfig::default());
        let a = id_of(&session, "A");
        let a1 = id_of(&session, "A1");
        session.apply(Command::ToggleNode(a), 0.0).unwrap();
        let now = run(&mut session, 0.0, 60);

        session.apply(Command::ToggleNode(a), now).unwrap();
        session.apply(Command::ToggleNode(a), now + 0.1).unwrap();
        let end = run(&mut session, now + 0.1, 30);

        let scene = session.frame(end);
        let node = scene.nodes.iter().find(|node| node.node.id == a1).unwrap();
        assert!(!node.exiting);
        assert_eq!(node.opacity, 1.0);
        assert!(session.tree().is_visible(a1));
    }

    #[test]
    fn drag_pins_and_release_frees() {
        let mut session = Session::new(&sample(), SessionConfig::default());
        let b = id_of(&session, "B");
        let target = vec2(320.0, -180.0);
        session
            .apply(Command::PinNode { id: b, position: target }, 0.0)
            .unwrap();
        let now = run(&mut session, 0.0, 50);
        assert_eq!(session.tree()[b].position, target);
        assert!(session.simulation().is_running());

        session.apply(Command::ReleaseNode(b), now).unwrap();
        assert_eq!(session.tree()[b].pinned, None);
        run(&mut session, now, 10);
        assert_ne!(session.tree()[b].position, target);
    }

    #[test]
    fn root_cannot_be_dragged_away() {
        let mut session = Session::new(&sample(), SessionConfig::default());
        let root = session.tree().root();
        session
            .apply(
                Command::PinNode {
                    id: root,
                    position: vec2(50.0, 50.0),
                },
                0.0,
            )
            .unwrap();
        session.apply(Command::ReleaseNode(root), 0.0).unwrap();
        run(&mut session, 0.0, 20);
        assert_eq!(session.tree()[root].pinned, Some(Vec2::ZERO));
        assert_eq!(session.tree()[root].position, Vec2::ZERO);
    }

    #[test]
    fn unknown_ids_are_rejected_and_hidden_toggles_ignored() {
        let mut session = Session::new(&sample(), SessionConfig::default());
        assert!(session.apply(Command::ToggleNode(NodeId(99)), 0.0).is_err());
        assert!(
            session
                .apply(
                    Command::PinNode {
                        id: NodeId(99),
                        position: Vec2::ZERO,
                    },
                    0.0,
                )
                .is_err()
        );

        let a1 = id_of(&session, "A1");
        session.apply(Command::ToggleNode(a1), 0.0).unwrap();
        assert!(!session.has_pending_frame());
        assert_eq!(session.tree().visible_nodes().len(), 4);
    }

    #[test]
    fn gestures_cancel_camera_and_load_resets_everything() {
        let mut session = Session::new(&sample(), SessionConfig::default());
        let a = id_of(&session, "A");
        session.apply(Command::ToggleNode(a), 0.0).unwrap();
        let measure = ApproxTextMeasure::default();
        let mut now = 0.0;
        while !session.is_camera_moving() && now < 3.0 {
            now += 1.0 / 60.0;
            session.advance(now, &measure, VIEW);
        }
        assert!(session.is_camera_moving());
        session.apply(Command::PanBy(vec2(10.0, 0.0)), now).unwrap();
        assert!(!session.is_camera_moving());

        session
            .apply(
                Command::ZoomAround {
                    anchor: Vec2::ZERO,
                    factor: 1.5,
                },
                now,
            )
            .unwrap();
        assert_ne!(session.transform(), ViewTransform::IDENTITY);

        let replacement = TreeValue::with_children("Other", vec![TreeValue::leaf("only")]);
        session.apply(Command::LoadTree(replacement), now).unwrap();
        assert_eq!(session.tree().len(), 2);
        assert_eq!(session.transform(), ViewTransform::IDENTITY);
        assert_eq!(session.simulation().alpha(), 1.0);
        assert!(!session.has_pending_frame());
        assert!(session.frame(now).nodes.iter().all(|node| !node.exiting));
    }

    #[test]
    fn left_hint_seeds_on_negative_side() {
        let value = TreeValue::with_children(
            "Root",
            (0..5)
                .map(|index| TreeValue {
                    position: Some(Side::Left),
                    ..TreeValue::leaf(format!("L{index}"))
                })
                .collect(),
        );
        let session = Session::new(&value, SessionConfig::default());
        let tree = session.tree();
        for &child in tree[tree.root()].visible_children() {
            assert!(tree[child].position.x <= 0.0);
        }
    }

    #[test]
    fn hit_test_prefers_shapes_under_point() {
        let mut session = Session::new(&sample(), SessionConfig::default());
        session.remeasure(&ApproxTextMeasure::default());
        let b = id_of(&session, "B");
        session.tree[b].position = vec2(5_000.0, 0.0);
        assert_eq!(session.hit_test(vec2(5_003.0, 3.0), 0.0), Some(b));
        assert_eq!(session.hit_test(vec2(10_000.0, 10_000.0), 0.0), None);
    }

    #[test]
    fn hit_test_follows_entering_nodes_where_drawn() {
        let mut session = Session::new(&sample(), SessionConfig::default());
        session.remeasure(&ApproxTextMeasure::default());
        let a = id_of(&session, "A");
        session.tree[a].position = vec2(-3_000.0, 0.0);
        session.apply(Command::ToggleNode(a), 1.0).unwrap();
        let a2 = id_of(&session, "A2");
        session.tree[a2].position = vec2(5_000.0, 0.0);

        // Just revealed: drawn on top of its parent, not at its simulation position.
        assert_ne!(session.hit_test(vec2(5_000.0, 0.0), 1.0), Some(a2));
        assert_eq!(session.hit_test(vec2(-3_000.0, 0.0), 1.0), Some(a2));

        let settled = 1.0 + f64::from(session.config().transition_secs) + 0.1;
        assert_eq!(session.hit_test(vec2(5_000.0, 0.0), settled), Some(a2));
        let drawn = session
            .frame(settled)
            .nodes
            .iter()
            .find(|node| node.node.id == a2)
            .map(|node| node.position)
            .unwrap();
        assert_eq!(drawn, vec2(5_000.0, 0.0));
    }
}
