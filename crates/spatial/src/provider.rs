use glam::Vec2;
use std::collections::HashMap;
use std::hash::Hash;
use transform::{TransformGraph, TransformId};

/// Resolves an entity reference to its current world-space position.
///
/// Returning `None` means the entity is gone; the quadtree skips it.
pub trait PositionProvider<E> {
    fn position(&self, entity: &E) -> Option<Vec2>;
}

/// World positions straight from the transform hierarchy
impl PositionProvider<TransformId> for TransformGraph {
    fn position(&self, entity: &TransformId) -> Option<Vec2> {
        TransformGraph::position(self, *entity)
    }
}

impl<E: Eq + Hash> PositionProvider<E> for HashMap<E, Vec2> {
    fn position(&self, entity: &E) -> Option<Vec2> {
        self.get(entity).copied()
    }
}

/// Provider backed by a closure, see [`from_fn`]
#[derive(Debug, Clone, Copy)]
pub struct FromFn<F>(F);

/// Wraps a closure as a [`PositionProvider`]
pub fn from_fn<E, F>(f: F) -> FromFn<F>
where
    F: Fn(&E) -> Option<Vec2>,
{
    FromFn(f)
}

impl<E, F> PositionProvider<E> for FromFn<F>
where
    F: Fn(&E) -> Option<Vec2>,
{
    fn position(&self, entity: &E) -> Option<Vec2> {
        (self.0)(entity)
    }
}
