mod app;
mod mindmap;
mod util;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use app::{Session, SessionConfig, ViewportConfig};
use mindmap::{ApproxTextMeasure, LoadSource, ShapePolicy, load_source, write_export};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON tree or CSV table to open; a built-in sample is shown when omitted.
    input: Option<PathBuf>,

    #[arg(long, default_value_t = 0.5)]
    min_zoom: f32,

    #[arg(long, default_value_t = 5.0)]
    max_zoom: f32,

    /// Depth from which nodes are drawn as rounded rectangles instead of circles.
    #[arg(long, default_value_t = 2)]
    rect_from_depth: usize,

    #[arg(long, default_value_t = 1440.0)]
    width: f32,

    #[arg(long, default_value_t = 920.0)]
    height: f32,

    /// Settle the layout without a window and write the export file.
    #[arg(long)]
    headless: bool,

    #[arg(long, default_value = "mind_map_export.json")]
    export: PathBuf,

    /// Upper bound on simulation ticks in headless mode.
    #[arg(long, default_value_t = 600)]
    settle_ticks: usize,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            viewport: ViewportConfig {
                min_zoom: self.min_zoom,
                max_zoom: self.max_zoom,
                ..ViewportConfig::default()
            },
            shape_policy: ShapePolicy {
                rect_from_depth: self.rect_from_depth,
            },
            ..SessionConfig::default()
        }
    }
}

fn run_headless(
    input: Option<&Path>,
    config: SessionConfig,
    ticks: usize,
    export: &Path,
) -> Result<()> {
    let value = match input {
        Some(path) => load_source(&LoadSource::File(path.to_path_buf()))?,
        None => app::sample_tree(),
    };

    let mut session = Session::new(&value, config);
    let used = session.settle(&ApproxTextMeasure::default(), ticks);
    let records = session.export_records();
    write_export(&records, export)
        .with_context(|| format!("failed to export layout to {}", export.display()))?;
    info!(
        "settled {} visible nodes in {used} ticks, wrote {}",
        records.len(),
        export.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    let _ = env_logger::builder().format_timestamp(None).try_init();
    let args = Args::parse();
    let config = args.session_config();

    if args.headless {
        return match run_headless(args.input.as_deref(), config, args.settle_ticks, &args.export) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::FAILURE
            }
        };
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([args.width, args.height]),
        ..Default::default()
    };

    let initial = args.input.map(LoadSource::File);
    let result = eframe::run_native(
        "ramifica",
        options,
        Box::new(move |cc| Ok(Box::new(app::MindMapApp::new(cc, initial, config)))),
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
