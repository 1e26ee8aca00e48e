#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives a fog layer over a wandering crowd.

mod bounds;
mod export;
mod scene;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use fog_core::{Command, Event, LayerId};
use fog_layer::{self as layer, query, FogSettings, Layer, LayerDirectory, LayerHooks, Scene};
use fog_render_queue::{MemoryBackend, RenderWorker, UploadStats};
use glam::Vec2;

use crate::{bounds::BoundsVolume, export::ExportedGrid, scene::Crowd};

/// World units covered by one source cell along each axis.
const WORLD_UNITS_PER_CELL: f32 = 2.0;

/// Command line arguments for the fog layer driver.
#[derive(Parser, Debug)]
#[command(name = "fog-layer")]
#[command(about = "Tracks a wandering crowd with a fog-of-war visibility layer")]
struct Args {
    /// TOML file holding fog settings; defaults apply when omitted
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Number of simulation steps to run
    #[arg(long, default_value_t = 120)]
    steps: u32,

    /// Number of agents in the crowd
    #[arg(long, default_value_t = 16)]
    agents: u32,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Simulated time between steps, in milliseconds
    #[arg(long, default_value_t = 16)]
    dt_ms: u64,

    /// Every this many steps an agent leaves the world while still tracked (0 disables)
    #[arg(long, default_value_t = 0)]
    retire_every: u32,

    /// Writes the final source buffer to this file as a `fog:v1` string
    #[arg(long)]
    export: Option<PathBuf>,

    /// Prints a summary of a previously exported grid and exits
    #[arg(long, conflicts_with = "export")]
    inspect: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct RunSummary {
    registered: usize,
    stamped: usize,
    skipped: usize,
    submitted: usize,
    debug_spheres: usize,
}

impl RunSummary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::AgentRegistered { .. } => self.registered += 1,
                Event::CellStamped { .. } => self.stamped += 1,
                Event::AgentSkipped { .. } => self.skipped += 1,
                Event::SnapshotSubmitted { .. } => self.submitted += 1,
                _ => {}
            }
        }
    }
}

/// Entry point for the fog layer command-line interface.
fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Some(path) = &args.inspect {
        return inspect(path);
    }

    let settings = load_settings(args.settings.as_deref())?;
    let config = settings.validate().context("invalid fog settings")?;
    if args.dt_ms == 0 {
        bail!("--dt-ms must be greater than zero");
    }

    let side = config.source_size().width() as f32 * WORLD_UNITS_PER_CELL;
    let bounds = BoundsVolume::new(Vec2::ZERO, Vec2::splat(side));
    let mut crowd = Crowd::spawn(bounds, args.agents, args.seed);

    let directory = Arc::new(LayerDirectory::new());
    let (sink, worker) = RenderWorker::spawn(MemoryBackend::new());
    let hooks = LayerHooks::new(directory.clone()).with_sink(Box::new(sink));
    let mut fog = Layer::create(LayerId::new(1), config, hooks)
        .context("failed to allocate fog layer buffers")?;

    let mut events = Vec::new();
    let mut summary = RunSummary::default();
    for agent in crowd.roster() {
        layer::apply(&mut fog, Command::RegisterAgent { agent: *agent }, &mut events);
    }

    let dt = Duration::from_millis(args.dt_ms);
    for step in 1..=args.steps {
        crowd.advance(dt.as_secs_f32());
        if args.retire_every > 0 && step % args.retire_every == 0 {
            if let Some(agent) = crowd.retire_one() {
                log::info!("agent {agent:?} left the world at step {step}");
            }
        }

        let scene = Scene {
            positions: &crowd,
            transform: &bounds,
        };
        layer::step(&mut fog, dt, scene, &mut events);
        summary.debug_spheres += query::debug_spheres(&fog).len();
        summary.record(&events);
        events.clear();
    }

    let exported = ExportedGrid::from_snapshot(&query::source_buffer(&fog).snapshot());
    let tracked = query::agent_count(&fog);
    let live_layers = directory.layers().len();
    layer::destroy(fog);
    let stats = worker.join();

    print_summary(&args, &summary, tracked, live_layers, &exported, stats);
    println!("Agents still in the world: {}", crowd.present());

    if let Some(path) = &args.export {
        fs::write(path, exported.encode())
            .with_context(|| format!("failed to write export to {}", path.display()))?;
        println!("Exported source buffer to {}", path.display());
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<FogSettings> {
    let Some(path) = path else {
        return Ok(FogSettings::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    FogSettings::from_toml_str(&contents)
        .with_context(|| format!("failed to parse settings in {}", path.display()))
}

fn inspect(path: &Path) -> Result<()> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read export from {}", path.display()))?;
    let grid = ExportedGrid::decode(&contents)
        .with_context(|| format!("failed to decode export in {}", path.display()))?;
    let size = grid.size();
    println!(
        "{}x{} grid with {} visible cells",
        size.width(),
        size.height(),
        grid.visible_cells()
    );
    Ok(())
}

fn print_summary(
    args: &Args,
    summary: &RunSummary,
    tracked: usize,
    live_layers: usize,
    exported: &ExportedGrid,
    stats: UploadStats,
) {
    let size = exported.size();
    println!("Fog layer run");
    println!("=============");
    println!("Seed: {}", args.seed);
    println!("Steps: {}", args.steps);
    println!("Grid: {}x{}", size.width(), size.height());
    println!("Layers live before teardown: {live_layers}");
    println!("Agents registered: {} (tracked at end: {tracked})", summary.registered);
    println!("Cells stamped: {}", summary.stamped);
    println!("Agents skipped: {}", summary.skipped);
    println!("Debug spheres emitted: {}", summary.debug_spheres);
    println!("Visible cells at end: {}", exported.visible_cells());
    println!(
        "Uploads: {} submitted, {} applied, {} skipped, {} unknown",
        summary.submitted, stats.applied, stats.skipped, stats.unknown_target
    );
}
