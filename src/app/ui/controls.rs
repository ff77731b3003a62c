use eframe::egui::{self, Ui};

use super::super::session::Command;
use super::super::{ForceConfig, ViewModel};

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Mind Map Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search (name or content)")
            .on_hover_text("Fuzzy-highlight matching nodes without changing the layout.");
        ui.text_edit_singleline(&mut self.search);
        if let Some(matches) = self.cached_search_matches() {
            let tree = self.session.tree();
            let hidden = matches.iter().filter(|&&id| !tree.is_visible(id)).count();
            ui.label(format!("{} matches, {hidden} collapsed", matches.len()));
        }

        ui.separator();

        let now = ui.input(|input| input.time);
        ui.horizontal_wrapped(|ui| {
            if ui
                .button("Reset view")
                .on_hover_text("Return to the default pan and zoom.")
                .clicked()
            {
                self.dispatch(Command::ResetView, now);
            }

            let pinned = self.pinned_nodes();
            let release = ui
                .add_enabled(!pinned.is_empty(), egui::Button::new("Release pins"))
                .on_hover_text("Let every dragged node float again.");
            if release.clicked() {
                for id in pinned {
                    self.dispatch(Command::ReleaseNode(id), now);
                }
            }
        });

        ui.checkbox(&mut self.show_editor, "Show JSON editor")
            .on_hover_text("Edit the tree as JSON in the right panel.");

        ui.separator();

        ui.collapsing("Physics tuning", |ui| {
            let mut changed = false;
            changed |= ui
                .add(
                    egui::Slider::new(&mut self.forces.repulsion_scale, 0.1..=3.0)
                        .text("Repulsion")
                        .clamping(egui::SliderClamping::Always),
                )
                .on_hover_text("How strongly nodes push away from each other.")
                .changed();
            changed |= ui
                .add(
                    egui::Slider::new(&mut self.forces.link_strength, 0.05..=1.0)
                        .text("Link strength")
                        .clamping(egui::SliderClamping::Always),
                )
                .on_hover_text("How firmly children hold their distance to the parent.")
                .changed();
            changed |= ui
                .add(
                    egui::Slider::new(&mut self.forces.collision_padding, 0.0..=120.0)
                        .text("Collision padding")
                        .clamping(egui::SliderClamping::Always),
                )
                .on_hover_text("Extra space kept around every node shape.")
                .changed();
            changed |= ui
                .add(
                    egui::Slider::new(&mut self.forces.velocity_decay, 0.05..=0.95)
                        .text("Velocity decay")
                        .clamping(egui::SliderClamping::Always),
                )
                .on_hover_text("Share of velocity lost on each tick.")
                .changed();

            if ui.button("Defaults").clicked() {
                self.forces = ForceConfig::default();
                changed = true;
            }

            if changed {
                self.session.set_force_config(self.forces);
                self.forces = self.session.simulation().config();
            }
        });

        ui.checkbox(&mut self.show_fps_bar, "FPS Display")
            .on_hover_text("Show a live FPS readout in the header.");
        ui.collapsing("FPS Display tuning", |ui| {
            ui.add_enabled_ui(self.show_fps_bar, |ui| {
                ui.checkbox(&mut self.fps_show_current, "Show current FPS");
                ui.checkbox(&mut self.fps_show_average, "Show average FPS");
                ui.checkbox(&mut self.fps_show_frame_time, "Show frame time");
            });
        });

        ui.separator();
        ui.small("Click a node to expand or collapse it.");
        ui.small("Drag a node to pin it, drag the background to pan.");
        ui.small("Scroll to zoom, double right-click to reset the view.");
    }

    fn pinned_nodes(&self) -> Vec<crate::mindmap::NodeId> {
        let tree = self.session.tree();
        tree.nodes()
            .filter(|node| node.parent.is_some() && node.pinned.is_some())
            .map(|node| node.id)
            .collect()
    }
}
