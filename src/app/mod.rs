use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Color32, Context, FontId, Painter};
use log::{info, warn};

use crate::mindmap::{LoadSource, NodeId, TextMeasure, TreeValue, load_source};

mod animation;
mod graph;
mod physics;
mod render_utils;
mod session;
mod ui;
mod viewport;

pub use physics::ForceConfig;
pub use session::{Command, Session, SessionConfig};
pub use viewport::ViewportConfig;

type LoadResult = Result<LoadedTree, String>;

struct LoadedTree {
    label: String,
    value: TreeValue,
}

pub struct MindMapApp {
    initial: Option<LoadSource>,
    config: SessionConfig,
    state: AppState,
    load_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    session: Session,
    dataset_label: String,
    dataset_revision: u64,
    editor_text: String,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    drag: Option<DragState>,
    notice: Option<String>,
    forces: ForceConfig,
    export_path: PathBuf,
    show_editor: bool,
    show_fps_bar: bool,
    fps_show_current: bool,
    fps_show_average: bool,
    fps_show_frame_time: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
}

struct SearchMatchCache {
    query: String,
    dataset_revision: u64,
    matches: Arc<HashSet<NodeId>>,
}

/// What the primary pointer is currently dragging.
#[derive(Clone, Copy, Debug)]
enum DragState {
    Node { id: NodeId, grab_offset: egui::Vec2 },
    Canvas,
}

/// Measures text with the window's font system at world-space sizes.
struct PainterTextMeasure<'a> {
    painter: &'a Painter,
}

impl TextMeasure for PainterTextMeasure<'_> {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.painter
            .layout_no_wrap(text.to_owned(), FontId::proportional(font_size), Color32::WHITE)
            .size()
            .x
    }
}

impl MindMapApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        initial: Option<LoadSource>,
        config: SessionConfig,
    ) -> Self {
        let state = match &initial {
            Some(source) => Self::start_load(source.clone()),
            None => AppState::Ready(Box::new(ViewModel::new(
                LoadedTree {
                    label: "sample".to_owned(),
                    value: sample_tree(),
                },
                config,
            ))),
        };

        Self {
            initial,
            config,
            state,
            load_rx: None,
        }
    }

    fn spawn_load(source: LoadSource) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_source(&source)
                .map(|value| LoadedTree {
                    label: source.label(),
                    value,
                })
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: LoadSource) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }
}

impl eframe::App for MindMapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(loaded)) => {
                        transition = Some(AppState::Ready(Box::new(ViewModel::new(
                            loaded,
                            self.config,
                        ))));
                    }
                    Ok(Err(error)) => {
                        warn!("initial load failed: {error}");
                        transition = Some(AppState::Error(error));
                    }
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading mind map...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load mind map");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(match self.initial.clone() {
                            Some(source) => Self::start_load(source),
                            None => AppState::Ready(Box::new(ViewModel::new(
                                LoadedTree {
                                    label: "sample".to_owned(),
                                    value: sample_tree(),
                                },
                                self.config,
                            ))),
                        });
                    }
                });
            }
            AppState::Ready(model) => {
                let mut load_requested = None;
                let is_loading = self.load_rx.is_some();
                model.show(ctx, &mut load_requested, is_loading);

                if let Some(source) = load_requested
                    && self.load_rx.is_none()
                {
                    info!("loading {}", source.label());
                    self.load_rx = Some(Self::spawn_load(source));
                }

                if let Some(rx) = self.load_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(loaded)) => model.replace_dataset(loaded, ctx.input(|input| input.time)),
                        Ok(Err(error)) => {
                            warn!("load failed: {error}");
                            model.notice = Some(error);
                        }
                        Err(TryRecvError::Empty) => {
                            self.load_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            model.notice = Some("Background load worker disconnected".to_owned());
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.load_rx = None;
            self.state = next_state;
        }
    }
}

impl ViewModel {
    fn new(loaded: LoadedTree, config: SessionConfig) -> Self {
        let editor_text = editor_text_for(&loaded.value);
        Self {
            session: Session::new(&loaded.value, config),
            dataset_label: loaded.label,
            dataset_revision: 0,
            editor_text,
            search: String::new(),
            search_match_cache: None,
            drag: None,
            notice: None,
            forces: config.forces,
            export_path: PathBuf::from("mind_map_export.json"),
            show_editor: true,
            show_fps_bar: true,
            fps_show_current: true,
            fps_show_average: true,
            fps_show_frame_time: false,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
        }
    }

    /// Swaps in a freshly loaded dataset; the previous one is dropped only on success.
    fn replace_dataset(&mut self, loaded: LoadedTree, now: f64) {
        self.editor_text = editor_text_for(&loaded.value);
        if let Err(error) = self.session.apply(Command::LoadTree(loaded.value), now) {
            self.notice = Some(format!("{error:#}"));
            return;
        }
        self.dataset_label = loaded.label;
        self.dataset_revision += 1;
        self.search_match_cache = None;
        self.drag = None;
    }

    /// Parses the editor contents synchronously, keeping the current diagram on failure.
    fn load_editor_text(&mut self, now: f64) {
        let source = LoadSource::Text(self.editor_text.clone());
        match load_source(&source) {
            Ok(value) => self.replace_dataset(
                LoadedTree {
                    label: source.label(),
                    value,
                },
                now,
            ),
            Err(error) => {
                warn!("rejected editor input: {error:#}");
                self.notice = Some(format!("Invalid JSON: {error:#}"));
            }
        }
    }
}

fn editor_text_for(value: &TreeValue) -> String {
    value.to_pretty_json().unwrap_or_else(|error| {
        warn!("could not render tree as JSON: {error:#}");
        String::new()
    })
}

/// Dataset shown when no input file is given.
pub fn sample_tree() -> TreeValue {
    TreeValue::with_children(
        "Mind map",
        vec![
            TreeValue::with_children(
                "Physics layout",
                vec![
                    TreeValue::leaf("Link springs"),
                    TreeValue::leaf("Many-body repulsion"),
                    TreeValue::with_children(
                        "Collision avoidance",
                        vec![
                            TreeValue::leaf("Circle radius"),
                            TreeValue::leaf("Rectangle half diagonal"),
                        ],
                    ),
                    TreeValue::leaf("Weak centering"),
                ],
            ),
            TreeValue::with_children(
                "Interaction",
                vec![
                    TreeValue::leaf("Click to expand or collapse"),
                    TreeValue::leaf("Drag to pin"),
                    TreeValue::leaf("Scroll to zoom"),
                ],
            ),
            TreeValue::with_children(
                "Data",
                vec![
                    TreeValue::leaf("JSON input"),
                    TreeValue::leaf("CSV import"),
                    TreeValue::leaf("Layout export"),
                ],
            ),
            TreeValue::leaf("Notes"),
        ],
    )
}
