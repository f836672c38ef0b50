use crate::node::{Transform, DETACHED};
use crate::TransformId;
use glam::{Affine2, Vec2};
use slotmap::SlotMap;

/// Arena of [`Transform`] nodes linked by non-owning parent ids.
///
/// All world-space accessors walk the ancestor chain. Matrices are cached per
/// node and recomputed on the first read after the node, or any of its
/// ancestors, changed.
///
/// Ids that do not resolve are tolerated: reads return `None`, writes do
/// nothing. A node whose parent has been removed behaves as a root node.
///
/// The caches use interior mutability, so a graph can be read from many places
/// at once but must not be shared across threads.
#[derive(Debug, Default)]
pub struct TransformGraph {
    nodes: SlotMap<TransformId, Transform>,
}

impl TransformGraph {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// Inserts a node as-is. Its parent link, if any, is taken verbatim.
    pub fn insert(&mut self, node: Transform) -> TransformId {
        node.mark_dirty();
        self.nodes.insert(node)
    }

    /// Inserts an identity node with no parent
    pub fn spawn(&mut self) -> TransformId {
        self.insert(Transform::new())
    }

    /// Inserts an identity node under `parent`.
    ///
    /// The new node sits at the parent's pivot; nothing is preserved because
    /// there is no prior world state.
    pub fn spawn_child(&mut self, parent: TransformId) -> TransformId {
        self.insert(Transform::new().with_parent(parent))
    }

    /// Removes a node from the graph.
    ///
    /// Children keep their (now dangling) parent id and from then on behave as
    /// root nodes, so their world values jump to their local values.
    pub fn remove(&mut self, id: TransformId) -> Option<Transform> {
        self.nodes.remove(id)
    }

    pub fn contains(&self, id: TransformId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Local view of a node
    pub fn get(&self, id: TransformId) -> Option<&Transform> {
        self.nodes.get(id)
    }

    /// The node's parent, if it has one that still exists
    pub fn parent(&self, id: TransformId) -> Option<TransformId> {
        let parent = self.nodes.get(id)?.parent?;
        self.nodes.contains_key(parent).then_some(parent)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TransformId> + '_ {
        self.nodes.keys()
    }

    // --- World-space accessors ---

    /// World-space position: the local position mapped through the parent's matrix.
    pub fn position(&self, id: TransformId) -> Option<Vec2> {
        let node = self.nodes.get(id)?;
        Some(match self.parent_node(node) {
            Some(parent) => {
                self.refresh(parent);
                parent.cache.parenting.get().transform_point2(node.position)
            }
            None => node.position,
        })
    }

    /// Sets the world-space position.
    ///
    /// The local position is solved through the inverse of the parent's matrix.
    pub fn set_position(&mut self, id: TransformId, position: Vec2) {
        let local = match self.parent_inverse(id) {
            Some(inverse) => inverse.transform_point2(position),
            None => position,
        };
        if let Some(node) = self.nodes.get_mut(id) {
            node.position = local;
            node.mark_dirty();
        }
    }

    /// World-space rotation in radians.
    ///
    /// Rotations are summed along the ancestor chain. This is only exact while
    /// every ancestor has uniform scale; rotation and non-uniform scale do not
    /// commute.
    pub fn rotation(&self, id: TransformId) -> Option<f32> {
        let mut node = self.nodes.get(id)?;
        let mut rotation = node.rotation;
        while let Some(parent) = self.parent_node(node) {
            rotation += parent.rotation;
            node = parent;
        }
        Some(rotation)
    }

    /// Sets the world-space rotation; with a parent the local rotation becomes
    /// `rotation - parent_rotation`.
    pub fn set_rotation(&mut self, id: TransformId, rotation: f32) {
        let parent_rotation = self
            .parent(id)
            .and_then(|parent| self.rotation(parent))
            .unwrap_or(0.0);
        if let Some(node) = self.nodes.get_mut(id) {
            node.rotation = rotation - parent_rotation;
            node.mark_dirty();
        }
    }

    /// World-space scale, the componentwise product of the ancestor chain.
    pub fn scale(&self, id: TransformId) -> Option<Vec2> {
        let mut node = self.nodes.get(id)?;
        let mut scale = node.scale;
        while let Some(parent) = self.parent_node(node) {
            scale *= parent.scale;
            node = parent;
        }
        Some(scale)
    }

    pub fn set_scale(&mut self, id: TransformId, scale: Vec2) {
        let parent_scale = self
            .parent(id)
            .and_then(|parent| self.scale(parent))
            .unwrap_or(Vec2::ONE);
        if let Some(node) = self.nodes.get_mut(id) {
            node.scale = scale / parent_scale;
            node.mark_dirty();
        }
    }

    pub fn offset(&self, id: TransformId) -> Option<Vec2> {
        self.nodes.get(id).map(Transform::offset)
    }

    /// Sets the pre-rotation pivot. Children inherit it through the parent matrix.
    pub fn set_offset(&mut self, id: TransformId, offset: Vec2) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.offset = offset;
            node.mark_dirty();
        }
    }

    pub fn origin(&self, id: TransformId) -> Option<Vec2> {
        self.nodes.get(id).map(Transform::origin)
    }

    /// Sets the render anchor. Only this node's own world matrix sees it.
    pub fn set_origin(&mut self, id: TransformId, origin: Vec2) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.origin = origin;
            node.mark_dirty();
        }
    }

    // --- Relative mutators ---

    /// Adds the sum of `deltas` to the local position.
    pub fn move_by(&mut self, id: TransformId, deltas: impl IntoIterator<Item = Vec2>) {
        let delta: Vec2 = deltas.into_iter().sum();
        if let Some(node) = self.nodes.get_mut(id) {
            node.position += delta;
            node.mark_dirty();
        }
    }

    /// Adds `radians` to the local rotation.
    pub fn rotate(&mut self, id: TransformId, radians: f32) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.rotation += radians;
            node.mark_dirty();
        }
    }

    /// Adds the sum of `deltas` to the local scale.
    pub fn add_scale(&mut self, id: TransformId, deltas: impl IntoIterator<Item = Vec2>) {
        let delta: Vec2 = deltas.into_iter().sum();
        if let Some(node) = self.nodes.get_mut(id) {
            node.scale += delta;
            node.mark_dirty();
        }
    }

    /// Restores identity local values. The parent link is kept.
    pub fn reset(&mut self, id: TransformId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.reset_local();
        }
    }

    // --- Matrices ---

    /// The node's world matrix, recomputed only if [`is_dirty`](Self::is_dirty).
    pub fn matrix(&self, id: TransformId) -> Option<Affine2> {
        let node = self.nodes.get(id)?;
        self.refresh(node);
        Some(node.cache.world.get())
    }

    /// The pre-origin matrix children of this node compose against.
    pub fn matrix_for_parenting(&self, id: TransformId) -> Option<Affine2> {
        let node = self.nodes.get(id)?;
        self.refresh(node);
        Some(node.cache.parenting.get())
    }

    pub fn matrix_for_parenting_inverse(&self, id: TransformId) -> Option<Affine2> {
        let node = self.nodes.get(id)?;
        self.refresh(node);
        Some(node.cache.parenting_inverse.get())
    }

    /// Whether the node or any of its ancestors changed since the node's
    /// matrices were last computed.
    ///
    /// Walks the ancestor chain on every call. Besides the dirty flags, a node
    /// counts as dirty when its parent's matrices were recomputed after its own,
    /// so siblings of a node that already triggered the parent's refresh still
    /// recompute once.
    pub fn is_dirty(&self, id: TransformId) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|node| self.node_is_dirty(node))
    }

    /// Maps a point from this node's space into world space
    pub fn local_to_world(&self, id: TransformId, point: Vec2) -> Option<Vec2> {
        self.matrix(id).map(|matrix| matrix.transform_point2(point))
    }

    /// Maps a world-space point into this node's space
    pub fn world_to_local(&self, id: TransformId, point: Vec2) -> Option<Vec2> {
        self.matrix(id)
            .map(|matrix| matrix.inverse().transform_point2(point))
    }

    // --- Hierarchy ---

    /// Reparents a node under `parent`, keeping its world position, rotation
    /// and scale.
    ///
    /// `None` and unknown parents are ignored. Creating a cycle is a caller
    /// error; debug builds assert against it and release builds ignore the call.
    pub fn connect(&mut self, id: TransformId, parent: Option<TransformId>) {
        let Some(parent) = parent else {
            return;
        };
        if !self.nodes.contains_key(parent) {
            log::trace!("connect: parent {parent} not in graph, ignoring");
            return;
        }
        if self.is_ancestor(id, parent) {
            debug_assert!(false, "connecting {id} under {parent} would create a cycle");
            log::warn!("connect: {id} under {parent} would create a cycle, ignoring");
            return;
        }

        let (Some(position), Some(rotation), Some(scale)) =
            (self.position(id), self.rotation(id), self.scale(id))
        else {
            return;
        };
        let (offset, origin) = match self.nodes.get(id) {
            Some(node) => (node.offset, node.origin),
            None => return,
        };

        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = Some(parent);
            node.mark_dirty();
        }
        log::debug!("connect: {id} -> {parent}");

        self.set_scale(id, scale);
        self.set_rotation(id, rotation);
        self.set_position(id, position);
        self.set_offset(id, offset);
        self.set_origin(id, origin);
    }

    /// Detaches a node from its parent, keeping its world position, rotation
    /// and scale. Equivalent to replacing the node with [`abs`](Self::abs).
    pub fn disconnect(&mut self, id: TransformId) {
        let Some(absolute) = self.abs(id) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(id) {
            node.position = absolute.position;
            node.rotation = absolute.rotation;
            node.scale = absolute.scale;
            node.offset = absolute.offset;
            node.origin = absolute.origin;
            node.parent = None;
            node.mark_dirty();
            log::debug!("disconnect: {id}");
        }
    }

    /// A new parent-less node whose local values equal this node's world values.
    pub fn abs(&self, id: TransformId) -> Option<Transform> {
        let node = self.nodes.get(id)?;
        Some(
            Transform::new()
                .with_position(self.position(id)?)
                .with_rotation(self.rotation(id)?)
                .with_scale(self.scale(id)?)
                .with_offset(node.offset)
                .with_origin(node.origin),
        )
    }

    /// A copy of the node with its parent cleared and its local values unchanged.
    ///
    /// Unlike [`abs`](Self::abs) and [`disconnect`](Self::disconnect) this does
    /// not preserve the world transform: the copy places its local values
    /// directly in world space.
    pub fn rel(&self, id: TransformId) -> Option<Transform> {
        self.nodes.get(id).map(Transform::detached_copy)
    }

    // --- Internals ---

    fn parent_node(&self, node: &Transform) -> Option<&Transform> {
        node.parent.and_then(|parent| self.nodes.get(parent))
    }

    fn parent_inverse(&self, id: TransformId) -> Option<Affine2> {
        let parent = self.parent_node(self.nodes.get(id)?)?;
        self.refresh(parent);
        Some(parent.cache.parenting_inverse.get())
    }

    /// Whether `ancestor` is `id` itself or one of the nodes above it
    fn is_ancestor(&self, ancestor: TransformId, id: TransformId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.nodes.get(node_id).and_then(|node| node.parent);
        }
        false
    }

    fn node_is_dirty<'a>(&'a self, mut node: &'a Transform) -> bool {
        loop {
            if node.cache.dirty.get() {
                return true;
            }
            let Some(parent_id) = node.parent else {
                return false;
            };
            match self.nodes.get(parent_id) {
                Some(parent) => {
                    if parent.cache.revision.get() != node.cache.parent_revision.get() {
                        return true;
                    }
                    node = parent;
                }
                // Parent removed since the last refresh
                None => return node.cache.parent_revision.get() != DETACHED,
            }
        }
    }

    fn refresh(&self, node: &Transform) {
        if !self.node_is_dirty(node) {
            return;
        }

        let (parent_matrix, parent_revision) = match self.parent_node(node) {
            Some(parent) => {
                self.refresh(parent);
                (parent.cache.parenting.get(), parent.cache.revision.get())
            }
            None => (Affine2::IDENTITY, DETACHED),
        };

        let local = node.local_matrix();
        let parenting = parent_matrix * local;
        let world = parent_matrix * Affine2::from_translation(-node.origin) * local;

        let cache = &node.cache;
        cache.parenting.set(parenting);
        cache.parenting_inverse.set(parenting.inverse());
        cache.world.set(world);
        cache.parent_revision.set(parent_revision);
        cache.revision.set(cache.revision.get() + 1);
        cache.dirty.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    const EPSILON: f32 = 1e-3;

    fn assert_vec_eq(actual: Vec2, expected: Vec2) {
        assert!(
            actual.abs_diff_eq(expected, EPSILON),
            "expected {expected}, got {actual}"
        );
    }

    fn assert_float_eq(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {expected}, got {actual}"
        );
    }

    /// World position, rotation and scale of a node
    fn world(graph: &TransformGraph, id: TransformId) -> (Vec2, f32, Vec2) {
        (
            graph.position(id).unwrap(),
            graph.rotation(id).unwrap(),
            graph.scale(id).unwrap(),
        )
    }

    /// Parent at (100, 50), rotated a quarter turn, scaled by 2, pivoting on (5, 5)
    fn rotated_parent(graph: &mut TransformGraph) -> TransformId {
        graph.insert(
            Transform::new()
                .with_position(Vec2::new(100.0, 50.0))
                .with_rotation(FRAC_PI_2)
                .with_scale(Vec2::new(2.0, 2.0))
                .with_offset(Vec2::new(5.0, 5.0)),
        )
    }

    #[test]
    fn test_root_accessors_are_local() {
        let mut graph = TransformGraph::new();
        let node = graph.spawn();

        graph.set_position(node, Vec2::new(10.0, 20.0));
        graph.set_rotation(node, 0.5);
        graph.set_scale(node, Vec2::new(2.0, 3.0));

        assert_eq!(graph.position(node), Some(Vec2::new(10.0, 20.0)));
        assert_eq!(graph.rotation(node), Some(0.5));
        assert_eq!(graph.scale(node), Some(Vec2::new(2.0, 3.0)));
        assert_eq!(
            graph.get(node).unwrap().local_position(),
            Vec2::new(10.0, 20.0)
        );
    }

    #[test]
    fn test_matrix_maps_local_origin_to_position() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut graph = TransformGraph::new();
        let node = graph.spawn();

        for _ in 0..200 {
            match rng.random_range(0..3) {
                0 => graph.set_position(
                    node,
                    Vec2::new(rng.random_range(-500.0..500.0), rng.random_range(-500.0..500.0)),
                ),
                1 => graph.set_rotation(node, rng.random_range(-6.0..6.0)),
                _ => graph.set_scale(
                    node,
                    Vec2::new(rng.random_range(0.1..4.0), rng.random_range(0.1..4.0)),
                ),
            }

            let matrix = graph.matrix(node).unwrap();
            assert_vec_eq(
                matrix.transform_point2(Vec2::ZERO),
                graph.position(node).unwrap(),
            );
        }
    }

    #[test]
    fn test_child_world_values() {
        let mut graph = TransformGraph::new();
        let parent = graph.insert(
            Transform::new()
                .with_position(Vec2::new(10.0, 10.0))
                .with_scale(Vec2::new(2.0, 2.0)),
        );
        let child = graph.insert(
            Transform::new()
                .with_position(Vec2::new(5.0, 5.0))
                .with_scale(Vec2::new(1.5, 1.5))
                .with_parent(parent),
        );

        // parent_pos + child_pos * parent_scale
        assert_vec_eq(graph.position(child).unwrap(), Vec2::new(20.0, 20.0));
        assert_vec_eq(graph.scale(child).unwrap(), Vec2::new(3.0, 3.0));
    }

    #[test]
    fn test_rotation_is_additive() {
        let mut graph = TransformGraph::new();
        let parent = graph.insert(Transform::new().with_rotation(FRAC_PI_4));
        let child = graph.insert(
            Transform::new()
                .with_rotation(FRAC_PI_4)
                .with_parent(parent),
        );

        assert_float_eq(graph.rotation(child).unwrap(), FRAC_PI_2);

        graph.set_rotation(child, 1.0);
        assert_float_eq(graph.get(child).unwrap().local_rotation(), 1.0 - FRAC_PI_4);
        assert_float_eq(graph.rotation(child).unwrap(), 1.0);
    }

    #[test]
    fn test_set_position_under_rotated_parent() {
        let mut graph = TransformGraph::new();
        let parent = rotated_parent(&mut graph);
        let child = graph.spawn_child(parent);

        graph.set_position(child, Vec2::new(40.0, -30.0));

        assert_vec_eq(graph.position(child).unwrap(), Vec2::new(40.0, -30.0));
        assert_vec_eq(
            graph
                .matrix(child)
                .unwrap()
                .transform_point2(Vec2::ZERO),
            Vec2::new(40.0, -30.0),
        );
    }

    #[test]
    fn test_offset_is_inherited() {
        let mut graph = TransformGraph::new();
        let parent = graph.insert(Transform::new().with_offset(Vec2::new(10.0, 0.0)));
        let child = graph.spawn_child(parent);

        // Children compose against a matrix that already includes the offset
        assert_vec_eq(graph.position(child).unwrap(), Vec2::new(-10.0, 0.0));
        assert_vec_eq(
            graph.matrix(child).unwrap().transform_point2(Vec2::ZERO),
            Vec2::new(-10.0, 0.0),
        );
    }

    #[test]
    fn test_origin_is_not_inherited() {
        let mut graph = TransformGraph::new();
        let parent = graph.insert(Transform::new().with_origin(Vec2::new(10.0, 10.0)));
        let child = graph.spawn_child(parent);

        assert_vec_eq(
            graph.matrix(parent).unwrap().transform_point2(Vec2::ZERO),
            Vec2::new(-10.0, -10.0),
        );
        assert_vec_eq(
            graph
                .matrix_for_parenting(parent)
                .unwrap()
                .transform_point2(Vec2::ZERO),
            Vec2::ZERO,
        );
        assert_vec_eq(
            graph.matrix(child).unwrap().transform_point2(Vec2::ZERO),
            Vec2::ZERO,
        );
    }

    #[test]
    fn test_parenting_inverse_round_trip() {
        let mut graph = TransformGraph::new();
        let node = rotated_parent(&mut graph);
        let point = Vec2::new(3.0, -7.0);

        let forward = graph.matrix_for_parenting(node).unwrap();
        let inverse = graph.matrix_for_parenting_inverse(node).unwrap();

        assert_vec_eq(inverse.transform_point2(forward.transform_point2(point)), point);
    }

    #[test]
    fn test_local_world_conversion() {
        let mut graph = TransformGraph::new();
        let node = rotated_parent(&mut graph);
        let point = Vec2::new(12.0, 4.0);

        let world = graph.local_to_world(node, point).unwrap();
        assert_vec_eq(graph.world_to_local(node, world).unwrap(), point);
    }

    #[test]
    fn test_connect_preserves_world_values() {
        let mut graph = TransformGraph::new();
        let parent = rotated_parent(&mut graph);
        let node = graph.insert(
            Transform::new()
                .with_position(Vec2::new(-20.0, 35.0))
                .with_rotation(0.3)
                .with_scale(Vec2::new(4.0, 4.0)),
        );
        let before = world(&graph, node);

        graph.connect(node, Some(parent));

        assert_eq!(graph.parent(node), Some(parent));
        let after = world(&graph, node);
        assert_vec_eq(after.0, before.0);
        assert_float_eq(after.1, before.1);
        assert_vec_eq(after.2, before.2);
    }

    #[test]
    fn test_connect_none_is_noop() {
        let mut graph = TransformGraph::new();
        let parent = rotated_parent(&mut graph);
        let node = graph.spawn_child(parent);
        graph.set_position(node, Vec2::new(1.0, 2.0));
        graph.matrix(node);

        graph.connect(node, None);

        assert_eq!(graph.parent(node), Some(parent));
        assert!(!graph.is_dirty(node));
        assert_vec_eq(graph.position(node).unwrap(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_reconnect_between_parents() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut graph = TransformGraph::new();
        let parents: Vec<_> = (0..4)
            .map(|_| {
                graph.insert(
                    Transform::new()
                        .with_position(Vec2::new(
                            rng.random_range(-100.0..100.0),
                            rng.random_range(-100.0..100.0),
                        ))
                        .with_rotation(rng.random_range(-3.0..3.0))
                        .with_scale(Vec2::splat(rng.random_range(0.5..2.0))),
                )
            })
            .collect();
        let node = graph.insert(Transform::new().with_position(Vec2::new(7.0, 9.0)));

        for step in 0..20 {
            let before = world(&graph, node);
            graph.connect(node, Some(parents[step % parents.len()]));
            let after = world(&graph, node);

            assert_vec_eq(after.0, before.0);
            assert_float_eq(after.1, before.1);
            assert_vec_eq(after.2, before.2);
        }
    }

    #[test]
    fn test_disconnect_preserves_world_values() {
        let mut graph = TransformGraph::new();
        let parent = rotated_parent(&mut graph);
        let node = graph.insert(
            Transform::new()
                .with_position(Vec2::new(3.0, 4.0))
                .with_rotation(0.25)
                .with_scale(Vec2::new(0.5, 0.5))
                .with_parent(parent),
        );
        let before = world(&graph, node);

        graph.disconnect(node);

        assert_eq!(graph.parent(node), None);
        let after = world(&graph, node);
        assert_vec_eq(after.0, before.0);
        assert_float_eq(after.1, before.1);
        assert_vec_eq(after.2, before.2);
    }

    #[test]
    fn test_abs_and_rel_diverge() {
        let mut graph = TransformGraph::new();
        let parent = rotated_parent(&mut graph);
        let node = graph.insert(
            Transform::new()
                .with_position(Vec2::new(3.0, 4.0))
                .with_parent(parent),
        );
        let world_position = graph.position(node).unwrap();

        let absolute = graph.abs(node).unwrap();
        assert!(absolute.parent().is_none());
        assert_vec_eq(absolute.local_position(), world_position);

        let relative = graph.rel(node).unwrap();
        assert!(relative.parent().is_none());
        assert_eq!(relative.local_position(), Vec2::new(3.0, 4.0));

        // Inserted back, only the absolute copy lands where the node is
        let absolute = graph.insert(absolute);
        let relative = graph.insert(relative);
        assert_vec_eq(graph.position(absolute).unwrap(), world_position);
        assert_vec_eq(graph.position(relative).unwrap(), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_relative_mutators_sum_deltas() {
        let mut graph = TransformGraph::new();
        let node = graph.spawn();

        graph.move_by(node, [Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0)]);
        graph.move_by(node, [Vec2::new(-1.0, 0.0)]);
        graph.rotate(node, 0.5);
        graph.rotate(node, 0.25);
        graph.add_scale(node, [Vec2::new(0.5, 0.0), Vec2::new(0.5, 1.0)]);

        let local = graph.get(node).unwrap();
        assert_eq!(local.local_position(), Vec2::new(3.0, 6.0));
        assert_float_eq(local.local_rotation(), 0.75);
        assert_eq!(local.local_scale(), Vec2::new(2.0, 2.0));
    }

    #[test]
    fn test_reset() {
        let mut graph = TransformGraph::new();
        let parent = graph.spawn();
        let node = graph.insert(
            Transform::new()
                .with_position(Vec2::new(3.0, 4.0))
                .with_rotation(1.0)
                .with_scale(Vec2::new(2.0, 2.0))
                .with_offset(Vec2::ONE)
                .with_origin(Vec2::ONE)
                .with_parent(parent),
        );
        graph.matrix(node);

        graph.reset(node);

        let local = graph.get(node).unwrap();
        assert_eq!(local.local_position(), Vec2::ZERO);
        assert_eq!(local.local_scale(), Vec2::ONE);
        assert_eq!(local.local_rotation(), 0.0);
        assert_eq!(local.offset(), Vec2::ZERO);
        assert_eq!(local.origin(), Vec2::ZERO);
        assert_eq!(graph.parent(node), Some(parent));
        assert!(graph.is_dirty(node));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut graph = TransformGraph::new();
        let root = graph.spawn();
        let middle = graph.spawn_child(root);
        let leaf = graph.spawn_child(middle);

        assert!(graph.is_dirty(leaf));
        graph.matrix(leaf);
        assert!(!graph.is_dirty(leaf));
        assert!(!graph.is_dirty(middle));
        assert!(!graph.is_dirty(root));

        graph.move_by(root, [Vec2::X]);
        assert!(graph.is_dirty(root));
        assert!(graph.is_dirty(middle));
        assert!(graph.is_dirty(leaf));

        graph.matrix(leaf);
        assert!(!graph.is_dirty(leaf));

        graph.set_origin(leaf, Vec2::ONE);
        assert!(graph.is_dirty(leaf));
        assert!(!graph.is_dirty(middle));
    }

    #[test]
    fn test_matrix_recomputes_only_when_dirty() {
        let mut graph = TransformGraph::new();
        let node = graph.spawn();

        graph.matrix(node);
        let revision = graph.get(node).unwrap().cache.revision.get();
        graph.matrix(node);
        graph.matrix(node);
        assert_eq!(graph.get(node).unwrap().cache.revision.get(), revision);

        graph.rotate(node, 1.0);
        graph.matrix(node);
        assert_eq!(graph.get(node).unwrap().cache.revision.get(), revision + 1);
    }

    #[test]
    fn test_siblings_recompute_after_parent_change() {
        let mut graph = TransformGraph::new();
        let parent = graph.spawn();
        let first = graph.insert(
            Transform::new()
                .with_position(Vec2::new(1.0, 0.0))
                .with_parent(parent),
        );
        let second = graph.insert(
            Transform::new()
                .with_position(Vec2::new(0.0, 1.0))
                .with_parent(parent),
        );
        graph.matrix(first);
        graph.matrix(second);

        graph.move_by(parent, [Vec2::new(10.0, 10.0)]);

        // Reading the first child refreshes the shared parent
        graph.matrix(first);
        assert!(!graph.is_dirty(parent));
        assert!(graph.is_dirty(second));
        assert_vec_eq(
            graph.matrix(second).unwrap().transform_point2(Vec2::ZERO),
            Vec2::new(10.0, 11.0),
        );
        assert!(!graph.is_dirty(second));
    }

    #[test]
    fn test_removed_parent_behaves_as_root() {
        let mut graph = TransformGraph::new();
        let parent = graph.insert(Transform::new().with_position(Vec2::new(50.0, 0.0)));
        let child = graph.insert(
            Transform::new()
                .with_position(Vec2::new(5.0, 0.0))
                .with_parent(parent),
        );
        assert_vec_eq(
            graph.matrix(child).unwrap().transform_point2(Vec2::ZERO),
            Vec2::new(55.0, 0.0),
        );

        graph.remove(parent);

        assert_eq!(graph.parent(child), None);
        assert!(graph.is_dirty(child));
        assert_vec_eq(
            graph.matrix(child).unwrap().transform_point2(Vec2::ZERO),
            Vec2::new(5.0, 0.0),
        );
    }

    #[test]
    fn test_unknown_ids_are_tolerated() {
        let mut graph = TransformGraph::new();
        let node = graph.spawn();
        graph.remove(node);

        assert!(graph.position(node).is_none());
        assert!(graph.matrix(node).is_none());
        assert!(!graph.is_dirty(node));
        graph.set_position(node, Vec2::ONE);
        graph.connect(node, Some(node));
        graph.disconnect(node);
        assert!(graph.is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "cycle")]
    fn test_connect_cycle_asserts() {
        let mut graph = TransformGraph::new();
        let root = graph.spawn();
        let child = graph.spawn_child(root);

        graph.connect(root, Some(child));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_connect_cycle_is_ignored() {
        let mut graph = TransformGraph::new();
        let root = graph.insert(Transform::new().with_position(Vec2::new(5.0, 6.0)));
        let child = graph.spawn_child(root);

        graph.connect(root, Some(child));

        assert_eq!(graph.parent(root), None);
        assert_eq!(graph.parent(child), Some(root));
        assert_eq!(graph.position(root), Some(Vec2::new(5.0, 6.0)));
    }

    #[test]
    fn test_every_mutator_dirties_node_and_descendants() {
        let mutators: [(&str, fn(&mut TransformGraph, TransformId, TransformId)); 13] = [
            ("set_position", |g, id, _| g.set_position(id, Vec2::new(2.0, 3.0))),
            ("set_rotation", |g, id, _| g.set_rotation(id, 0.5)),
            ("set_scale", |g, id, _| g.set_scale(id, Vec2::splat(2.0))),
            ("set_offset", |g, id, _| g.set_offset(id, Vec2::ONE)),
            ("set_origin", |g, id, _| g.set_origin(id, Vec2::ONE)),
            ("move_by", |g, id, _| g.move_by(id, [Vec2::X, Vec2::Y])),
            ("rotate", |g, id, _| g.rotate(id, 0.25)),
            ("add_scale", |g, id, _| g.add_scale(id, [Vec2::ONE])),
            ("reset", |g, id, _| g.reset(id)),
            ("connect", |g, id, other| g.connect(id, Some(other))),
            ("disconnect", |g, id, _| g.disconnect(id)),
            ("set_position_identical", |g, id, _| {
                let position = g.position(id).unwrap();
                g.set_position(id, position);
            }),
            ("rotate_zero", |g, id, _| g.rotate(id, 0.0)),
        ];

        for (name, mutate) in mutators {
            let mut graph = TransformGraph::new();
            let other = graph.insert(Transform::new().with_position(Vec2::new(10.0, 0.0)));
            let root = graph.spawn();
            let node = graph.insert(
                Transform::new()
                    .with_position(Vec2::new(1.0, 1.0))
                    .with_scale(Vec2::splat(0.5))
                    .with_parent(root),
            );
            let leaf = graph.spawn_child(node);

            graph.matrix(leaf);
            graph.matrix(other);
            assert!(!graph.is_dirty(node), "{name}: clean before mutation");
            assert!(!graph.is_dirty(leaf), "{name}: clean before mutation");

            mutate(&mut graph, node, other);

            assert!(graph.is_dirty(node), "{name}: node not dirty");
            assert!(graph.is_dirty(leaf), "{name}: descendant not dirty");
            assert!(!graph.is_dirty(root), "{name}: ancestor dirtied");

            graph.matrix(leaf);
            assert!(!graph.is_dirty(node), "{name}: clean after matrix read");
            assert!(!graph.is_dirty(leaf), "{name}: clean after matrix read");
        }
    }
}
