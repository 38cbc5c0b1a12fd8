use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::BBox;

/// An entry in the R-tree spatial index, referencing an item by its index.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    /// Index into the caller's item list.
    pub index: usize,
    /// Bounding box of the item.
    pub bbox: BBox,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

/// Spatial index over bounding boxes.
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    /// Build the index from a list of bounding boxes.
    pub fn build(entries: Vec<SpatialEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Find all entries whose bounding box touches `bbox`.
    pub fn query_bbox(&self, bbox: &BBox) -> Vec<&SpatialEntry> {
        let envelope = AABB::from_corners([bbox.min.x, bbox.min.y], [bbox.max.x, bbox.max.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    /// Every pair of distinct entries whose boxes touch, as `(lower, higher)`
    /// index pairs in ascending order.
    pub fn overlapping_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> = self
            .tree
            .iter()
            .flat_map(|a| {
                self.query_bbox(&a.bbox)
                    .into_iter()
                    .filter(move |b| b.index > a.index)
                    .map(move |b| (a.index, b.index))
            })
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
