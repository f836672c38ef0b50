//! Spatial CLI - drive the transform graph and quadtree from the command line.
//!
//! Generates a seeded scene of spinning transform chains, rebuilds the
//! quadtree from it, and prints query results as JSON on stdout.

mod logger;
mod scene;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use glam::Vec2;
use log::LevelFilter;
use logger::{log_section, SpatialLogger};
use scene::{hits, IndexReport, Scene, SceneConfig};
use spatial::{Bounds, Quadtree, SpatialError};
use std::path::{Path, PathBuf};
use transform::TransformId;

/// Spatial CLI - exercise the spatial kernel on synthetic scenes
#[derive(Parser)]
#[command(name = "spatial")]
#[command(about = "Build synthetic scenes and run broad-phase queries against them")]
struct Cli {
    /// JSON config file with world size and quadtree limits
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level written to stderr (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,

    #[command(flatten)]
    scene: SceneArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SceneArgs {
    /// Number of entities to generate
    #[arg(short = 'n', long, default_value_t = 1000)]
    count: usize,

    /// Entities per transform chain (1 means every entity is a root)
    #[arg(long, default_value_t = 4)]
    chain: usize,

    /// Seed for scene generation
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index once and report its shape
    Stats,

    /// Rebuild the index once and run queries against it
    Query {
        /// Rectangle query as min_x,min_y,max_x,max_y
        #[arg(long, value_parser = parse_rect)]
        rect: Option<Bounds>,

        /// Circle query as x,y,radius
        #[arg(long, value_parser = parse_circle)]
        circle: Option<(Vec2, f32)>,
    },

    /// Step the scene for several frames, rebuilding and querying each one
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value_t = 60)]
        frames: usize,

        /// Circle query radius around the world center, run every frame
        #[arg(long, default_value_t = 100.0)]
        radius: f32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    SpatialLogger::init(cli.log_level)?;

    let config = load_config(cli.config.as_deref())?;
    let mut tree = Quadtree::try_new(config.world_bounds(), config.quadtree)
        .context("Invalid quadtree config")?;

    let mut scene = Scene::generate(&config, cli.scene.count, cli.scene.chain, cli.scene.seed);

    match cli.command {
        Commands::Stats => stats(&scene, &mut tree),
        Commands::Query { rect, circle } => query(&scene, &mut tree, rect, circle),
        Commands::Simulate { frames, radius } => simulate(&mut scene, &mut tree, &config, frames, radius),
    }
}

/// Load the JSON config, falling back to defaults when no path is given.
fn load_config(path: Option<&Path>) -> Result<SceneConfig> {
    let Some(path) = path else {
        return Ok(SceneConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: SceneConfig = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid config JSON in {}", path.display()))?;
    validate_world_size(config.world_size)?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

fn validate_world_size(world_size: f32) -> Result<()> {
    if !world_size.is_finite() || world_size <= 0.0 {
        bail!("world_size must be positive and finite, got {}", world_size);
    }
    Ok(())
}

fn stats(scene: &Scene, tree: &mut Quadtree<TransformId>) -> Result<()> {
    scene.index(tree);
    print_json(&IndexReport::new(0, scene, tree))
}

fn query(
    scene: &Scene,
    tree: &mut Quadtree<TransformId>,
    rect: Option<Bounds>,
    circle: Option<(Vec2, f32)>,
) -> Result<()> {
    if rect.is_none() && circle.is_none() {
        bail!("Nothing to query: pass --rect and/or --circle");
    }

    scene.index(tree);
    let mut report = IndexReport::new(0, scene, tree);
    report.rect_hits = rect.map(|rect| hits(scene, tree.query(rect)));
    report.circle_hits = circle.map(|(center, radius)| hits(scene, tree.query_circle(center, radius)));
    print_json(&report)
}

fn simulate(
    scene: &mut Scene,
    tree: &mut Quadtree<TransformId>,
    config: &SceneConfig,
    frames: usize,
    radius: f32,
) -> Result<()> {
    log_section("simulate");
    let center = config.world_bounds().center();
    let mut reports = Vec::with_capacity(frames);

    for frame in 0..frames {
        scene.step();
        scene.index(tree);

        let mut report = IndexReport::new(frame, scene, tree);
        let near = tree.query_circle(center, radius);
        log::debug!("frame {}: {} entities within {} of center", frame, near.len(), radius);
        report.circle_hits = Some(hits(scene, near));
        reports.push(report);
    }

    print_json(&reports)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_floats<const N: usize>(s: &str) -> Result<[f32; N], String> {
    let values = s
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in '{}': {}", s, e))?;
    values
        .try_into()
        .map_err(|values: Vec<f32>| format!("expected {} comma-separated numbers, got {}", N, values.len()))
}

fn parse_rect(s: &str) -> Result<Bounds, String> {
    let [min_x, min_y, max_x, max_y] = parse_floats::<4>(s)?;
    let rect = Bounds::new(Vec2::new(min_x, min_y), Vec2::new(max_x, max_y));
    if !rect.is_valid() {
        return Err(SpatialError::DegenerateBounds(rect).to_string());
    }
    Ok(rect)
}

fn parse_circle(s: &str) -> Result<(Vec2, f32), String> {
    let [x, y, radius] = parse_floats::<3>(s)?;
    if radius < 0.0 {
        return Err(format!("radius must not be negative, got {}", radius));
    }
    Ok((Vec2::new(x, y), radius))
}
