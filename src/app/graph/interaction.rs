use eframe::egui::{self, PointerButton, Rect, Ui};
use log::warn;

use super::super::session::Command;
use super::super::{DragState, ViewModel};
use crate::mindmap::NodeId;

impl ViewModel {
    /// Applies a command, turning a rejection into a notice instead of an abort.
    pub(in crate::app) fn dispatch(&mut self, command: Command, now: f64) {
        if let Err(error) = self.session.apply(command, now) {
            warn!("command rejected: {error:#}");
            self.notice = Some(format!("{error:#}"));
        }
    }

    pub(in crate::app) fn handle_canvas_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        now: f64,
    ) {
        if !response.hovered() {
            return;
        }

        let (scroll, pinch) = ui.input(|input| (input.raw_scroll_delta.y, input.zoom_delta()));
        let factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15) * pinch;
        if (factor - 1.0).abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        self.dispatch(
            Command::ZoomAround {
                anchor: pointer - rect.center(),
                factor,
            },
            now,
        );
    }

    /// Primary drag pins a node (or pans when it starts on the background or the root),
    /// secondary and middle drags always pan, and a primary click toggles a node.
    pub(in crate::app) fn handle_canvas_pointer(
        &mut self,
        rect: Rect,
        response: &egui::Response,
        now: f64,
    ) {
        let transform = self.session.transform();

        if response.drag_started_by(PointerButton::Primary) {
            let grabbed = response
                .interact_pointer_pos()
                .map(|pointer| transform.screen_to_world(rect, pointer))
                .and_then(|world| {
                    self.node_under(world, now)
                        .map(|id| (id, world - self.session.tree()[id].position))
                });
            self.drag = Some(match grabbed {
                Some((id, grab_offset)) => DragState::Node { id, grab_offset },
                None => DragState::Canvas,
            });
        }

        if response.dragged_by(PointerButton::Primary) {
            match self.drag {
                Some(DragState::Node { id, grab_offset }) => {
                    if let Some(pointer) = response.interact_pointer_pos() {
                        let position = transform.screen_to_world(rect, pointer) - grab_offset;
                        self.dispatch(Command::PinNode { id, position }, now);
                    }
                }
                Some(DragState::Canvas) | None => {
                    self.dispatch(Command::PanBy(response.drag_delta()), now);
                }
            }
        } else if response.dragged_by(PointerButton::Secondary)
            || response.dragged_by(PointerButton::Middle)
        {
            self.dispatch(Command::PanBy(response.drag_delta()), now);
        }

        if response.drag_stopped()
            && let Some(DragState::Node { id, .. }) = self.drag.take()
        {
            self.dispatch(Command::ReleaseNode(id), now);
        }

        if response.clicked_by(PointerButton::Primary)
            && let Some(pointer) = response.interact_pointer_pos()
            && let Some(id) = self
                .session
                .hit_test(transform.screen_to_world(rect, pointer), now)
        {
            self.dispatch(Command::ToggleNode(id), now);
        }

        if response.double_clicked_by(PointerButton::Secondary) {
            self.dispatch(Command::ResetView, now);
        }
    }

    /// Draggable node under `world`; the root stays anchored, so it is never grabbed.
    fn node_under(&self, world: egui::Vec2, now: f64) -> Option<NodeId> {
        self.session
            .hit_test(world, now)
            .filter(|&id| id != self.session.tree().root())
    }

    pub(in crate::app) fn hovered_node(&self, ui: &Ui, rect: Rect, now: f64) -> Option<NodeId> {
        if self.drag.is_some() {
            return None;
        }
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        if !rect.contains(pointer) {
            return None;
        }
        self.session
            .hit_test(self.session.transform().screen_to_world(rect, pointer), now)
    }
}
