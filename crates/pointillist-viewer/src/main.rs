//! Interactive viewer for tiled point clouds.
//!
//! Streams a synthetic quadtree dataset through the engine so the tile cache,
//! progressive refinement and label passes can be exercised without a server.

mod app;
mod camera;
mod store;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use winit::event_loop::EventLoop;

use pointillist_engine::logging::{init_logging, LoggingConfig};
use pointillist_engine::texture::{FontSystem, RampKind};
use pointillist_engine::RenderConfig;

use crate::app::Viewer;
use crate::store::{SyntheticConfig, SyntheticStore, VALUE_FIELD};

const FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Colormap {
    Diverging,
    Rainbow,
    Viridis,
}

impl From<Colormap> for RampKind {
    fn from(value: Colormap) -> Self {
        match value {
            Colormap::Diverging => RampKind::Diverging,
            Colormap::Rainbow => RampKind::Rainbow,
            Colormap::Viridis => RampKind::Viridis,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pointillist-viewer", version, about = "Progressive point cloud viewer")]
struct Args {
    /// Point budget at zoom 1.
    #[arg(long, default_value_t = 50_000.0)]
    max_points: f64,

    /// Text column drawn as labels. Pass an empty string to disable labels.
    #[arg(long, default_value = store::NAME_FIELD)]
    label_field: String,

    #[arg(long, default_value_t = 6.0)]
    point_size: f32,

    #[arg(long, value_enum, default_value_t = Colormap::Diverging)]
    colormap: Colormap,

    /// Field mapped through the colormap.
    #[arg(long, default_value = VALUE_FIELD)]
    color_field: String,

    /// Depth of the synthetic quadtree.
    #[arg(long, default_value_t = 6)]
    tiles_depth: u8,

    #[arg(long, default_value_t = 2_000)]
    points_per_tile: usize,

    /// Simulated fetch latency per tile.
    #[arg(long, default_value_t = 40)]
    latency_ms: u64,

    /// Probability that a tile fetch fails.
    #[arg(long, default_value_t = 0.0)]
    fail_rate: f64,

    /// TrueType font for labels; system fonts are tried otherwise.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Log filter, env_logger syntax. Falls back to RUST_LOG.
    #[arg(long)]
    log: Option<String>,
}

impl Args {
    fn render_config(&self) -> RenderConfig {
        RenderConfig {
            point_size: self.point_size,
            max_points: self.max_points,
            label_field: (!self.label_field.is_empty()).then(|| self.label_field.clone()),
            color_field: self.color_field.clone(),
            colormap: self.colormap.into(),
            ..RenderConfig::default()
        }
    }

    fn store_config(&self) -> SyntheticConfig {
        SyntheticConfig {
            depth: self.tiles_depth.min(12),
            points_per_tile: self.points_per_tile.max(1),
            latency: Duration::from_millis(self.latency_ms),
            fail_rate: if self.fail_rate.is_finite() {
                self.fail_rate.clamp(0.0, 1.0)
            } else {
                0.0
            },
            ..SyntheticConfig::default()
        }
    }
}

fn load_fonts(explicit: Option<&PathBuf>) -> FontSystem {
    let mut fonts = FontSystem::new();

    let bytes = match explicit {
        Some(path) => std::fs::read(path)
            .map_err(|e| log::warn!("cannot read font {}: {e}", path.display()))
            .ok(),
        None => FONT_PATHS.iter().find_map(|p| std::fs::read(p).ok()),
    };

    match bytes {
        Some(bytes) => {
            if let Err(e) = fonts.load_font(&bytes) {
                log::warn!("{e}");
            }
        }
        None => log::warn!("no label font found; pass --font to enable glyphs"),
    }
    fonts
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        ..LoggingConfig::default()
    });

    let fonts = load_fonts(args.font.as_ref());
    let store = SyntheticStore::new(args.store_config());

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut viewer = Viewer::new(args.render_config(), store, fonts);

    event_loop
        .run_app(&mut viewer)
        .context("winit event loop terminated with error")?;

    Ok(())
}
