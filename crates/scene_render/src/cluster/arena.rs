//! Per-cluster singly linked lists stored in one flat node arena
//!
//! Node 0 is a sentinel: a head or `next` value of 0 terminates a list.
//! Both the node array and the head array keep their capacity across
//! frames, so steady-state clustering does not allocate.

use super::packing::ClusterLookup;

/// Index of a node inside the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// Terminator / sentinel node
    pub const NONE: Self = Self(0);

    /// Whether this is the terminator
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// One list entry: the item it refers to and the next node in the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterNode {
    /// Decal or light index (position in the packed data buffer)
    pub item: u32,
    /// Next node, or [`NodeIndex::NONE`]
    pub next: NodeIndex,
}

const SENTINEL: ClusterNode = ClusterNode { item: 0, next: NodeIndex::NONE };

/// Arena of list nodes plus one head per cluster
#[derive(Debug, Clone)]
pub struct ClusterListArena {
    nodes: Vec<ClusterNode>,
    heads: Vec<NodeIndex>,
    counts: Vec<u32>,
}

impl Default for ClusterListArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterListArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self {
            nodes: vec![SENTINEL],
            heads: Vec::new(),
            counts: Vec::new(),
        }
    }

    /// Clear every list and make room for `num_clusters` heads.
    ///
    /// Head storage only reallocates when the cluster count changes.
    pub fn reset(&mut self, num_clusters: usize) {
        if self.heads.len() != num_clusters {
            self.heads.resize(num_clusters, NodeIndex::NONE);
            self.counts.resize(num_clusters, 0);
        }
        self.heads.fill(NodeIndex::NONE);
        self.counts.fill(0);
        self.nodes.clear();
        self.nodes.push(SENTINEL);
    }

    /// Number of clusters the arena currently addresses
    pub fn num_clusters(&self) -> usize {
        self.heads.len()
    }

    /// Number of live nodes, excluding the sentinel
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Whether no item has been pushed since the last reset
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prepend `item` to the list of `cluster` in O(1)
    pub fn push(&mut self, cluster: usize, item: u32) {
        debug_assert!(cluster < self.heads.len(), "cluster {cluster} out of range");
        debug_assert!(u32::try_from(self.nodes.len()).is_ok(), "cluster node arena overflow");
        let index = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(ClusterNode { item, next: self.heads[cluster] });
        self.heads[cluster] = index;
        self.counts[cluster] += 1;
    }

    /// Number of items pushed into `cluster`
    pub fn count(&self, cluster: usize) -> u32 {
        self.counts[cluster]
    }

    /// Iterate the items of one cluster, most recently pushed first
    pub fn iter(&self, cluster: usize) -> ClusterListIter<'_> {
        ClusterListIter {
            nodes: &self.nodes,
            current: self.heads[cluster],
        }
    }

    /// Flatten every list into `lookup` words plus a contiguous index array.
    ///
    /// `indices` is cleared first. Lists longer than the count field allows
    /// are truncated, and clusters starting past the offset field's range
    /// are left empty; the number of dropped entries is returned.
    pub fn flatten_into(&self, lookup: &mut Vec<ClusterLookup>, indices: &mut Vec<u32>) -> usize {
        self.flatten_with_limit(lookup, indices, ClusterLookup::MAX_OFFSET)
    }

    fn flatten_with_limit(&self, lookup: &mut Vec<ClusterLookup>, indices: &mut Vec<u32>, max_offset: u32) -> usize {
        lookup.clear();
        lookup.reserve(self.heads.len());
        indices.clear();

        let mut dropped = 0;
        let mut unaddressable = 0;
        for cluster in 0..self.heads.len() {
            let offset = match u32::try_from(indices.len()) {
                Ok(offset) if offset <= max_offset => offset,
                _ => {
                    unaddressable += self.counts[cluster] as usize;
                    lookup.push(ClusterLookup::EMPTY);
                    continue;
                }
            };
            let mut count = 0;
            for item in self.iter(cluster) {
                if count == ClusterLookup::MAX_COUNT {
                    dropped += 1;
                    continue;
                }
                indices.push(item);
                count += 1;
            }
            lookup.push(ClusterLookup::new(offset, count));
        }

        if unaddressable > 0 {
            log::warn!("Dropped {unaddressable} cluster entries past the {max_offset} offset limit");
        }
        dropped + unaddressable
    }
}

/// Iterator over one cluster's list
#[derive(Debug, Clone)]
pub struct ClusterListIter<'a> {
    nodes: &'a [ClusterNode],
    current: NodeIndex,
}

impl Iterator for ClusterListIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.current.is_none() {
            return None;
        }
        let node = self.nodes[self.current.0 as usize];
        self.current = node.next;
        Some(node.item)
    }
}
