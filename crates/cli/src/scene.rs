//! Synthetic scenes for exercising the transform graph and quadtree together.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use spatial::{Bounds, Quadtree, QuadtreeConfig};
use std::f32::consts::TAU;
use transform::{Transform, TransformGraph, TransformId};

/// Settings loaded from the optional JSON config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Side length of the square world, which is also the quadtree root
    pub world_size: f32,
    pub quadtree: QuadtreeConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            world_size: 1000.0,
            quadtree: QuadtreeConfig::default(),
        }
    }
}

impl SceneConfig {
    pub fn world_bounds(&self) -> Bounds {
        Bounds::new(Vec2::ZERO, Vec2::splat(self.world_size))
    }
}

/// A forest of spinning transform chains.
///
/// Every `chain_length` entities share one root; each further entity is a
/// child of the previous one, offset a little from it.
pub struct Scene {
    pub graph: TransformGraph,
    pub entities: Vec<TransformId>,
    /// Roots and their angular velocity in radians per step
    roots: Vec<(TransformId, f32)>,
}

impl Scene {
    pub fn generate(config: &SceneConfig, count: usize, chain_length: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut graph = TransformGraph::new();
        let mut entities = Vec::with_capacity(count);
        let mut roots = Vec::new();
        let chain_length = chain_length.max(1);

        let mut previous = None;
        for index in 0..count {
            let id = match previous {
                Some(parent) if index % chain_length != 0 => graph.insert(
                    Transform::new()
                        .with_position(Vec2::new(
                            rng.random_range(-20.0..20.0),
                            rng.random_range(-20.0..20.0),
                        ))
                        .with_rotation(rng.random_range(0.0..TAU))
                        .with_parent(parent),
                ),
                _ => {
                    let root = graph.insert(
                        Transform::new()
                            .with_position(Vec2::new(
                                rng.random_range(0.0..config.world_size),
                                rng.random_range(0.0..config.world_size),
                            ))
                            .with_rotation(rng.random_range(0.0..TAU)),
                    );
                    roots.push((root, rng.random_range(-0.1..0.1)));
                    root
                }
            };
            entities.push(id);
            previous = Some(id);
        }

        log::debug!(
            "Generated {} entities in {} chains (seed {})",
            entities.len(),
            roots.len(),
            seed
        );

        Self {
            graph,
            entities,
            roots,
        }
    }

    /// Spins every root by its angular velocity
    pub fn step(&mut self) {
        for &(root, spin) in &self.roots {
            self.graph.rotate(root, spin);
        }
    }

    /// Clears `tree` and reinserts every entity at its current world position
    pub fn index(&self, tree: &mut Quadtree<TransformId>) {
        tree.rebuild(self.entities.iter().copied(), &self.graph);
    }
}

/// One entity returned by a query
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub id: u64,
    pub position: Vec2,
}

/// Snapshot of the index after a rebuild
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub frame: usize,
    /// Root bounds of the index
    pub bounds: Bounds,
    pub entities: usize,
    pub indexed: usize,
    pub nodes: usize,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rect_hits: Option<Vec<Hit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circle_hits: Option<Vec<Hit>>,
}

impl IndexReport {
    pub fn new(frame: usize, scene: &Scene, tree: &Quadtree<TransformId>) -> Self {
        Self {
            frame,
            bounds: tree.bounds(),
            entities: scene.entities.len(),
            indexed: tree.len(),
            nodes: tree.node_count(),
            depth: tree.depth(),
            rect_hits: None,
            circle_hits: None,
        }
    }
}

/// Attaches world positions to query results, sorted by id for stable output
pub fn hits(scene: &Scene, mut ids: Vec<TransformId>) -> Vec<Hit> {
    ids.sort_unstable();
    ids.into_iter()
        .filter_map(|id| {
            scene.graph.position(id).map(|position| Hit {
                id: id.as_u64(),
                position,
            })
        })
        .collect()
}
