use std::sync::Arc;

use geo::{BoundingRect, Rect};
use rstar::{AABB, RTree, RTreeObject};

use super::tile::IndexKey;
use crate::model::NetworkEdge;

/// Network edge stored in the R-tree by its bounding box
#[derive(Debug, Clone)]
pub struct EdgeEntry {
    pub edge: Arc<NetworkEdge>,
    envelope: AABB<[f64; 2]>,
}

impl EdgeEntry {
    pub fn new(edge: NetworkEdge) -> Option<Self> {
        let rect = edge.geometry.bounding_rect()?;
        Some(Self {
            envelope: to_aabb(&rect),
            edge: Arc::new(edge),
        })
    }
}

impl RTreeObject for EdgeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

pub(crate) fn to_aabb(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// Immutable spatial index over the edges of one basetype within one area
#[derive(Debug)]
pub struct EdgeIndex {
    key: IndexKey,
    tree: RTree<EdgeEntry>,
}

impl EdgeIndex {
    pub fn new(key: IndexKey, edges: Vec<NetworkEdge>) -> Self {
        let entries = edges.into_iter().filter_map(EdgeEntry::new).collect();
        Self {
            key,
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn key(&self) -> IndexKey {
        self.key
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Edges whose bounding box intersects `area`
    pub fn edges_in(&self, area: &Rect<f64>) -> impl Iterator<Item = &Arc<NetworkEdge>> {
        self.tree
            .locate_in_envelope_intersecting(&to_aabb(area))
            .map(|entry| &entry.edge)
    }
}
