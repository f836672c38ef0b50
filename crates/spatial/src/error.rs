use crate::Bounds;

/// Error type for the validating quadtree constructors.
///
/// Inserts and queries never fail; only construction can be rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpatialError {
    /// Root bounds with `min >= max` on some axis
    DegenerateBounds(Bounds),
    /// A config allowing zero objects per node
    ZeroCapacity,
}

impl std::fmt::Display for SpatialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DegenerateBounds(bounds) => write!(
                f,
                "Degenerate bounds: min {} must be below max {} on both axes",
                bounds.min, bounds.max
            ),
            Self::ZeroCapacity => write!(f, "Invalid config: max_objects_per_node must be at least 1"),
        }
    }
}

impl std::error::Error for SpatialError {}
