use crate::TransformId;
use glam::{Affine2, Vec2};
use std::cell::Cell;

/// Revision recorded by a node whose matrices were composed without a parent.
pub(crate) const DETACHED: u64 = u64::MAX;

/// A single node of the transform hierarchy.
///
/// Holds local values only. World-space values and matrices depend on the
/// ancestor chain and are read through [`TransformGraph`](crate::TransformGraph).
/// A `Transform` built on its own (for example with the `with_*` helpers) is an
/// identity node until it is inserted into a graph.
#[derive(Debug, Clone)]
pub struct Transform {
    pub(crate) position: Vec2,
    pub(crate) scale: Vec2,
    /// Radians
    pub(crate) rotation: f32,
    pub(crate) offset: Vec2,
    pub(crate) origin: Vec2,
    /// Non-owning link into the same graph
    pub(crate) parent: Option<TransformId>,
    pub(crate) cache: MatrixCache,
}

/// Lazily refreshed matrices of a node.
#[derive(Debug, Clone)]
pub(crate) struct MatrixCache {
    pub(crate) world: Cell<Affine2>,
    /// Pre-origin matrix, the one children compose against
    pub(crate) parenting: Cell<Affine2>,
    pub(crate) parenting_inverse: Cell<Affine2>,
    pub(crate) dirty: Cell<bool>,
    /// Bumped every time the matrices are recomputed
    pub(crate) revision: Cell<u64>,
    /// Parent revision the current matrices were composed against
    pub(crate) parent_revision: Cell<u64>,
}

impl Default for MatrixCache {
    fn default() -> Self {
        Self {
            world: Cell::new(Affine2::IDENTITY),
            parenting: Cell::new(Affine2::IDENTITY),
            parenting_inverse: Cell::new(Affine2::IDENTITY),
            dirty: Cell::new(true),
            revision: Cell::new(0),
            parent_revision: Cell::new(DETACHED),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            offset: Vec2::ZERO,
            origin: Vec2::ZERO,
            parent: None,
            cache: MatrixCache::default(),
        }
    }
}

impl Transform {
    /// Creates an identity transform with no parent
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the parent link without preserving world values.
    ///
    /// Use [`TransformGraph::connect`](crate::TransformGraph::connect) to reparent
    /// a node that is already in a graph.
    pub fn with_parent(mut self, parent: TransformId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Position relative to the parent
    pub fn local_position(&self) -> Vec2 {
        self.position
    }

    /// Scale relative to the parent
    pub fn local_scale(&self) -> Vec2 {
        self.scale
    }

    /// Rotation relative to the parent, in radians
    pub fn local_rotation(&self) -> f32 {
        self.rotation
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn parent(&self) -> Option<TransformId> {
        self.parent
    }

    /// Whether this node's own dirty flag is set.
    ///
    /// Ancestors are not consulted; see
    /// [`TransformGraph::is_dirty`](crate::TransformGraph::is_dirty).
    pub fn is_self_dirty(&self) -> bool {
        self.cache.dirty.get()
    }

    pub(crate) fn mark_dirty(&self) {
        self.cache.dirty.set(true);
    }

    /// Restores the local values to identity, keeping the parent link.
    pub(crate) fn reset_local(&mut self) {
        self.position = Vec2::ZERO;
        self.scale = Vec2::ONE;
        self.rotation = 0.0;
        self.offset = Vec2::ZERO;
        self.origin = Vec2::ZERO;
        self.mark_dirty();
    }

    /// Copy of the local values with the parent cleared and a fresh cache.
    pub(crate) fn detached_copy(&self) -> Self {
        Self {
            position: self.position,
            scale: self.scale,
            rotation: self.rotation,
            offset: self.offset,
            origin: self.origin,
            parent: None,
            cache: MatrixCache::default(),
        }
    }

    /// scale → translate(-offset * scale) → rotate → translate(position)
    pub(crate) fn local_matrix(&self) -> Affine2 {
        Affine2::from_translation(self.position)
            * Affine2::from_angle(self.rotation)
            * Affine2::from_translation(-self.offset * self.scale)
            * Affine2::from_scale(self.scale)
    }
}
