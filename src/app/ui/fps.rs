use eframe::egui::Context;

use super::super::ViewModel;

const FPS_SAMPLE_WINDOW: usize = 120;

impl ViewModel {
    pub(in crate::app) fn update_fps_counter(&mut self, ctx: &Context) {
        let dt = ctx.input(|input| input.stable_dt);
        self.record_frame_time(dt);
    }

    fn record_frame_time(&mut self, dt: f32) {
        if dt <= f32::EPSILON {
            return;
        }

        self.fps_current = (1.0 / dt).clamp(0.0, 1000.0);
        self.fps_samples.push_back(self.fps_current);
        while self.fps_samples.len() > FPS_SAMPLE_WINDOW {
            self.fps_samples.pop_front();
        }
    }

    pub(in crate::app) fn fps_display_text(&self) -> Option<String> {
        if !self.show_fps_bar {
            return None;
        }

        let mut parts = Vec::new();
        if self.fps_show_current {
            parts.push(format!("FPS {:.0}", self.fps_current));
        }
        if self.fps_show_average && !self.fps_samples.is_empty() {
            let avg = self.fps_samples.iter().sum::<f32>() / self.fps_samples.len() as f32;
            parts.push(format!("avg {avg:.1}"));
        }
        if self.fps_show_frame_time && self.fps_current > f32::EPSILON {
            parts.push(format!("{:.1} ms", 1000.0 / self.fps_current));
        }

        (!parts.is_empty()).then(|| parts.join(" | "))
    }

    pub(in crate::app) fn layout_status_text(&self) -> String {
        let tree = self.session.tree();
        let simulation = self.session.simulation();
        let state = if simulation.is_running() {
            format!("settling (alpha {:.3})", simulation.alpha())
        } else {
            "settled".to_owned()
        };
        format!(
            "{} of {} nodes visible | {state}",
            tree.visible_nodes().len(),
            tree.len()
        )
    }
}
