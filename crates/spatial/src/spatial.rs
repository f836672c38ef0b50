//! # Spatial Index
//!
//! Broad-phase spatial queries over entity positions. Culling, proximity and
//! collision code narrow their candidates through a [`Quadtree`] before running
//! precise checks.
//!
//! ## Usage Pattern
//!
//! The tree indexes points, not extents, and has no per-entity update. Each
//! frame the owning system clears it and reinserts every live entity, reading
//! positions through a [`PositionProvider`] (usually the
//! [`TransformGraph`](transform::TransformGraph) itself), then issues any number
//! of [`Quadtree::query`] and [`Quadtree::query_circle`] calls.
//!
//! ```
//! use glam::Vec2;
//! use spatial::{Bounds, Quadtree};
//! use transform::{Transform, TransformGraph};
//!
//! let mut graph = TransformGraph::new();
//! let ship = graph.insert(Transform::new().with_position(Vec2::new(120.0, 80.0)));
//!
//! let mut tree = Quadtree::new(Bounds::new(Vec2::ZERO, Vec2::new(1000.0, 1000.0)));
//! tree.rebuild(graph.iter(), &graph);
//!
//! assert_eq!(tree.query_circle(Vec2::new(100.0, 80.0), 25.0), vec![ship]);
//! ```

mod bounds;
mod config;
mod error;
mod provider;
mod quadtree;

pub use bounds::Bounds;
pub use config::{QuadtreeConfig, MAX_DEPTH, MAX_OBJECTS_PER_NODE};
pub use error::SpatialError;
pub use provider::{from_fn, FromFn, PositionProvider};
pub use quadtree::{Quadtree, QuadtreeVisitor};
