use eframe::egui::{self, Align, Align2, Context, Layout};
use log::warn;
use rfd::FileDialog;

use crate::mindmap::{LoadSource, write_export};

use super::super::{ViewModel, editor_text_for};

impl ViewModel {
    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        load_requested: &mut Option<LoadSource>,
        is_loading: bool,
    ) {
        self.update_fps_counter(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("ramifica");
                    ui.separator();
                    ui.label(format!("data: {}", self.dataset_label));
                    ui.label(self.layout_status_text());

                    let open_button = ui.add_enabled(!is_loading, egui::Button::new("Open JSON"));
                    if open_button.clicked()
                        && let Some(path) = FileDialog::new()
                            .add_filter("JSON", &["json"])
                            .pick_file()
                    {
                        *load_requested = Some(LoadSource::File(path));
                    }

                    let import_button = ui.add_enabled(!is_loading, egui::Button::new("Import CSV"));
                    if import_button.clicked()
                        && let Some(path) = FileDialog::new()
                            .add_filter("CSV", &["csv"])
                            .pick_file()
                    {
                        *load_requested = Some(LoadSource::CsvFile(path));
                    }

                    if ui.button("Export layout").clicked() {
                        self.export_layout();
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if is_loading {
                            ui.spinner();
                        }
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| self.draw_controls(ui));

        if self.show_editor {
            egui::SidePanel::right("editor")
                .resizable(true)
                .default_width(360.0)
                .show(ctx, |ui| self.draw_editor(ui));
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));

        self.draw_notice(ctx);
    }

    fn draw_editor(&mut self, ui: &mut egui::Ui) {
        ui.heading("Tree JSON");
        ui.label("Edit the hierarchy and load it to replace the diagram.");
        ui.horizontal(|ui| {
            if ui.button("Load").clicked() {
                let now = ui.input(|input| input.time);
                self.load_editor_text(now);
            }
            if ui
                .button("Revert")
                .on_hover_text("Discard edits and show the tree currently on the canvas.")
                .clicked()
            {
                self.editor_text = self.current_tree_text();
            }
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.add(
                    egui::TextEdit::multiline(&mut self.editor_text)
                        .code_editor()
                        .desired_width(f32::INFINITY)
                        .desired_rows(30),
                );
            });
    }

    fn draw_notice(&mut self, ctx: &Context) {
        let Some(message) = self.notice.clone() else {
            return;
        };

        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(6.0);
                if ui.button("OK").clicked() {
                    self.notice = None;
                }
            });
    }

    fn export_layout(&mut self) {
        let file_name = self
            .export_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mind_map_export.json".to_owned());
        let Some(path) = FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name(file_name)
            .save_file()
        else {
            return;
        };

        let records = self.session.export_records();
        match write_export(&records, &path) {
            Ok(()) => self.export_path = path,
            Err(error) => {
                warn!("export failed: {error:#}");
                self.notice = Some(format!("Export failed: {error:#}"));
            }
        }
    }

    /// The canvas tree re-serialized, without layout state.
    fn current_tree_text(&self) -> String {
        editor_text_for(&self.session.tree().to_value())
    }
}
