use crate::SpatialError;
use serde::{Deserialize, Serialize};

/// Default number of entries a leaf holds before it subdivides
pub const MAX_OBJECTS_PER_NODE: usize = 8;
/// Default depth below which nodes may still subdivide
pub const MAX_DEPTH: u32 = 8;

/// Subdivision limits of a [`Quadtree`](crate::Quadtree).
///
/// Missing fields fall back to the defaults when deserialized, so a config
/// file only needs to name what it overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadtreeConfig {
    /// A leaf subdivides once it holds more than this many entries
    pub max_objects_per_node: usize,
    /// Nodes at this depth never subdivide; their lists grow without limit
    pub max_depth: u32,
}

impl Default for QuadtreeConfig {
    fn default() -> Self {
        Self {
            max_objects_per_node: MAX_OBJECTS_PER_NODE,
            max_depth: MAX_DEPTH,
        }
    }
}

impl QuadtreeConfig {
    pub fn validate(&self) -> Result<(), SpatialError> {
        if self.max_objects_per_node == 0 {
            return Err(SpatialError::ZeroCapacity);
        }
        Ok(())
    }
}
