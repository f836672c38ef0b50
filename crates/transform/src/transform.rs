//! # Transform Hierarchy
//!
//! Hierarchical 2D transforms with lazily cached world matrices. Every positioned
//! object in a scene owns a node in a [`TransformGraph`]; renderers, physics and
//! gameplay code read world-space values and matrices back out of it.
//!
//! ## Key Concepts
//!
//! - **Local values**: position, scale, rotation, offset and origin relative to the parent
//! - **World values**: the same quantities after applying the full ancestor chain
//! - **Offset**: pivot applied before rotation, inherited by children
//! - **Origin**: pivot applied only to the node's own world matrix, never inherited
//! - **Lazy matrices**: world matrices are recomputed on first read after a change
//!
//! Composition order for a node's local matrix is
//! scale → translate by `-offset * scale` → rotate → translate by `position`.
//! The product of that with the parent's matrix is what children compose against.
//! The node's own world matrix additionally translates by `-origin` before the
//! parent matrix is applied.
//!
//! Parent links are arena keys, so a parent never owns its children. Parent cycles
//! are a caller error and are only caught by debug assertions.

mod graph;
mod node;

pub use graph::TransformGraph;
pub use node::Transform;

use slotmap::KeyData;
use std::fmt::{self, Display};

slotmap::new_key_type! {
    /// Identifies a node within a [`TransformGraph`].
    pub struct TransformId;
}

impl From<u64> for TransformId {
    fn from(value: u64) -> Self {
        Self(KeyData::from_ffi(value))
    }
}

impl TransformId {
    /// Converts this transform id to a [u64]
    pub fn as_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

impl Display for TransformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}
