use crate::{Bounds, PositionProvider, QuadtreeConfig, SpatialError, MAX_OBJECTS_PER_NODE};
use glam::Vec2;
use smallvec::SmallVec;

/// Entries stored inline per node before spilling to the heap
const INLINE_ENTRIES: usize = MAX_OBJECTS_PER_NODE + 1;

/// An entity and the position it was inserted at
#[derive(Debug, Clone, Copy)]
struct Entry<E> {
    entity: E,
    position: Vec2,
}

/// A node in the quadtree arena
///
/// A node is either a leaf holding entries or an internal node with four
/// children and no entries.
#[derive(Debug, Clone)]
struct QuadNode<E> {
    bounds: Bounds,
    depth: u32,
    entries: SmallVec<[Entry<E>; INLINE_ENTRIES]>,
    /// Index of the first of four contiguous children, ordered as [`Bounds::quadrants`]
    children: Option<usize>,
}

impl<E> QuadNode<E> {
    fn new(bounds: Bounds, depth: u32) -> Self {
        QuadNode {
            bounds,
            depth,
            entries: SmallVec::new(),
            children: None,
        }
    }

    /// Turns a recycled node back into an empty leaf, keeping its storage
    fn reset(&mut self, bounds: Bounds, depth: u32) {
        self.bounds = bounds;
        self.depth = depth;
        self.entries.clear();
        self.children = None;
    }
}

/// Receives the structure of a [`Quadtree`] during [`Quadtree::visit`].
///
/// Every method has an empty default, implement only what you need.
pub trait QuadtreeVisitor<E> {
    fn branch(&mut self, _depth: u32, _bounds: Bounds) {}
    fn leaf(&mut self, _depth: u32, _bounds: Bounds) {}
    fn entry(&mut self, _entity: E, _position: Vec2) {}
}

/// A point quadtree for broad-phase queries.
///
/// Built to be rebuilt: [`clear`](Self::clear) and reinsert every live entity
/// once per frame, then query as often as needed. There is no per-entity
/// removal or update.
///
/// Nodes live in a flat arena addressed by index. Clearing only resets a
/// length counter, so nodes and their entry buffers are reused by the next
/// rebuild.
///
/// Points are routed with half-open quadrants (`>= min`, `< max` per axis)
/// except on the outer max edge of the root, which is inclusive. Points
/// outside the root bounds are dropped without any signal.
#[derive(Debug, Clone)]
pub struct Quadtree<E> {
    /// `nodes[0]` is the root; only `nodes[..live]` are part of the tree
    nodes: Vec<QuadNode<E>>,
    live: usize,
    len: usize,
    config: QuadtreeConfig,
}

impl<E: Copy> Quadtree<E> {
    /// Creates an empty quadtree over `bounds` with the default config.
    ///
    /// `bounds` must have `min < max` on both axes; use
    /// [`try_new`](Self::try_new) to validate instead.
    pub fn new(bounds: Bounds) -> Self {
        Self::with_config(bounds, QuadtreeConfig::default())
    }

    pub fn with_config(bounds: Bounds, config: QuadtreeConfig) -> Self {
        debug_assert!(bounds.is_valid(), "degenerate quadtree bounds {bounds:?}");
        debug_assert!(config.validate().is_ok(), "invalid quadtree config {config:?}");
        Quadtree {
            nodes: vec![QuadNode::new(bounds, 0)],
            live: 1,
            len: 0,
            config,
        }
    }

    /// Like [`with_config`](Self::with_config) but rejects bad input with an error.
    pub fn try_new(bounds: Bounds, config: QuadtreeConfig) -> Result<Self, SpatialError> {
        if !bounds.is_valid() {
            return Err(SpatialError::DegenerateBounds(bounds));
        }
        config.validate()?;
        Ok(Self::with_config(bounds, config))
    }

    pub fn bounds(&self) -> Bounds {
        self.nodes[0].bounds
    }

    pub fn config(&self) -> QuadtreeConfig {
        self.config
    }

    /// Number of entries held
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of live nodes, root included
    pub fn node_count(&self) -> usize {
        self.live
    }

    /// Depth of the deepest live node; a lone root is depth 0
    pub fn depth(&self) -> u32 {
        self.nodes[..self.live]
            .iter()
            .map(|node| node.depth)
            .max()
            .unwrap_or(0)
    }

    /// Inserts `entity` at the position reported by `provider`.
    ///
    /// Entities the provider does not know, and positions outside the root
    /// bounds, are silently skipped.
    pub fn insert<P>(&mut self, entity: E, provider: &P)
    where
        P: PositionProvider<E> + ?Sized,
    {
        match provider.position(&entity) {
            Some(position) => self.insert_at(entity, position),
            None => log::trace!("quadtree: entity has no position, skipping"),
        }
    }

    /// Inserts `entity` at an explicit position.
    pub fn insert_at(&mut self, entity: E, position: Vec2) {
        if !self.bounds().contains_point(position) {
            log::trace!("quadtree: dropping entity at {position}, outside {:?}", self.bounds());
            return;
        }

        let mut index = 0;
        while let Some(first) = self.nodes[index].children {
            index = first + self.nodes[index].bounds.quadrant_of(position);
        }

        let node = &mut self.nodes[index];
        node.entries.push(Entry { entity, position });
        self.len += 1;

        if node.entries.len() > self.config.max_objects_per_node
            && node.depth < self.config.max_depth
        {
            self.subdivide(index);
        }
    }

    /// Clears the tree and inserts every entity of `entities`.
    ///
    /// This is the per-frame rebuild the tree is designed around.
    pub fn rebuild<I, P>(&mut self, entities: I, provider: &P)
    where
        I: IntoIterator<Item = E>,
        P: PositionProvider<E> + ?Sized,
    {
        self.clear();
        for entity in entities {
            self.insert(entity, provider);
        }
        log::trace!(
            "quadtree: rebuilt with {} entries in {} nodes",
            self.len,
            self.live
        );
    }

    /// Entities whose position lies inside `rect`, edges included.
    pub fn query(&self, rect: Bounds) -> Vec<E> {
        let mut results = Vec::new();
        self.query_into(rect, &mut results);
        results
    }

    /// Appends the entities inside `rect` to `results`.
    pub fn query_into(&self, rect: Bounds, results: &mut Vec<E>) {
        self.query_node(0, &rect, results);
    }

    /// Entities within `radius` of `center`, boundary included.
    pub fn query_circle(&self, center: Vec2, radius: f32) -> Vec<E> {
        let mut results = Vec::new();
        self.query_circle_into(center, radius, &mut results);
        results
    }

    /// Appends the entities within `radius` of `center` to `results`.
    ///
    /// A negative radius matches nothing.
    pub fn query_circle_into(&self, center: Vec2, radius: f32, results: &mut Vec<E>) {
        if radius < 0.0 {
            return;
        }
        self.query_circle_node(0, center, radius * radius, results);
    }

    /// Iterates over every entry and the position it was inserted at
    pub fn iter(&self) -> impl Iterator<Item = (E, Vec2)> + '_ {
        self.nodes[..self.live]
            .iter()
            .flat_map(|node| node.entries.iter().map(|entry| (entry.entity, entry.position)))
    }

    /// Walks the tree depth-first, reporting branches, leaves and entries.
    pub fn visit<V>(&self, visitor: &mut V)
    where
        V: QuadtreeVisitor<E> + ?Sized,
    {
        self.visit_node(0, visitor);
    }

    /// Removes every entry and collapses the tree back to an empty root leaf.
    ///
    /// Results of earlier queries are plain values and are not affected.
    pub fn clear(&mut self) {
        let bounds = self.bounds();
        self.nodes[0].reset(bounds, 0);
        self.live = 1;
        self.len = 0;
    }

    /// Splits a leaf into four children and moves its entries down one level.
    ///
    /// Children are filled without checking their own capacity; they split on
    /// a later insert if needed.
    fn subdivide(&mut self, index: usize) {
        let parent = &self.nodes[index];
        let quadrants = parent.bounds.quadrants();
        let depth = parent.depth + 1;

        let first = self.live;
        for bounds in quadrants {
            self.alloc(bounds, depth);
        }

        let mut entries = std::mem::take(&mut self.nodes[index].entries);
        let parent_bounds = self.nodes[index].bounds;
        for entry in entries.drain(..) {
            let child = first + parent_bounds.quadrant_of(entry.position);
            self.nodes[child].entries.push(entry);
        }

        let parent = &mut self.nodes[index];
        parent.entries = entries;
        parent.children = Some(first);

        log::trace!("quadtree: subdivided node {index} at depth {}", depth - 1);
    }

    fn alloc(&mut self, bounds: Bounds, depth: u32) -> usize {
        let index = self.live;
        match self.nodes.get_mut(index) {
            Some(node) => node.reset(bounds, depth),
            None => self.nodes.push(QuadNode::new(bounds, depth)),
        }
        self.live += 1;
        index
    }

    fn query_node(&self, index: usize, rect: &Bounds, results: &mut Vec<E>) {
        let node = &self.nodes[index];
        if !node.bounds.intersects(rect) {
            return;
        }

        match node.children {
            Some(first) => {
                for child in first..first + 4 {
                    self.query_node(child, rect, results);
                }
            }
            None => results.extend(
                node.entries
                    .iter()
                    .filter(|entry| rect.contains_point(entry.position))
                    .map(|entry| entry.entity),
            ),
        }
    }

    fn query_circle_node(&self, index: usize, center: Vec2, radius_sq: f32, results: &mut Vec<E>) {
        let node = &self.nodes[index];
        if node.bounds.distance_squared_to_point(center) > radius_sq {
            return;
        }

        match node.children {
            Some(first) => {
                for child in first..first + 4 {
                    self.query_circle_node(child, center, radius_sq, results);
                }
            }
            None => results.extend(
                node.entries
                    .iter()
                    .filter(|entry| entry.position.distance_squared(center) <= radius_sq)
                    .map(|entry| entry.entity),
            ),
        }
    }

    fn visit_node<V>(&self, index: usize, visitor: &mut V)
    where
        V: QuadtreeVisitor<E> + ?Sized,
    {
        let node = &self.nodes[index];
        match node.children {
            Some(first) => {
                visitor.branch(node.depth, node.bounds);
                for child in first..first + 4 {
                    self.visit_node(child, visitor);
                }
            }
            None => {
                visitor.leaf(node.depth, node.bounds);
                for entry in &node.entries {
                    visitor.entry(entry.entity, entry.position);
                }
            }
        }
    }
}
