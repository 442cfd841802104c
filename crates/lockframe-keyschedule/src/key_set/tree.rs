//! Left-balanced binary tree arithmetic for the secret tree.
//!
//! Nodes are numbered in-order: leaves sit at even indices, parents at odd
//! ones, and a node's level is the number of trailing one bits in its index.
//!
//! ```text
//!               3
//!         ______|______
//!        1             5
//!      __|__         __|__
//!     0     2       4     6
//! ```

/// Largest leaf capacity a [`TreeSize`] can describe.
///
/// The next power of two above it does not fit in a `u32` leaf count.
pub const MAX_LEAVES: u32 = 1 << 31;

/// Number of leaves in the membership tree, rounded up to a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeSize {
    leaves: u32,
}

impl TreeSize {
    /// Tree large enough to hold `leaves` members.
    ///
    /// Zero is treated as one; a group always has its creator. Requests above
    /// [`MAX_LEAVES`] are clamped to [`MAX_LEAVES`], so leaf indices at or past
    /// it are rejected by [`TreeSize::contains`].
    pub fn for_leaves(leaves: u32) -> Self {
        if leaves > MAX_LEAVES {
            tracing::warn!(requested = leaves, max = MAX_LEAVES, "tree size clamped");
        }
        Self { leaves: leaves.clamp(1, MAX_LEAVES).next_power_of_two() }
    }

    /// Leaf capacity of the tree.
    pub fn leaf_count(&self) -> u32 {
        self.leaves
    }

    /// Number of nodes, `2 * leaves - 1`.
    pub fn width(&self) -> u64 {
        2 * u64::from(self.leaves) - 1
    }

    /// Node index of the root.
    pub fn root(&self) -> NodeIndex {
        NodeIndex(u64::from(self.leaves) - 1)
    }

    /// Whether `leaf` fits in this tree.
    pub fn contains(&self, leaf: LeafIndex) -> bool {
        leaf.0 < self.leaves
    }
}

/// Position of a member among the leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeafIndex(pub u32);

impl LeafIndex {
    /// Node index of this leaf.
    pub fn node(self) -> NodeIndex {
        NodeIndex(2 * u64::from(self.0))
    }
}

/// Position of a node in the in-order array representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub u64);

impl NodeIndex {
    /// Height above the leaves; leaves are level 0.
    pub fn level(self) -> u32 {
        self.0.trailing_ones()
    }

    /// Left child, or `None` for a leaf.
    pub fn left(self) -> Option<Self> {
        match self.level() {
            0 => None,
            k => Some(Self(self.0 ^ (1 << (k - 1)))),
        }
    }

    /// Right child, or `None` for a leaf.
    pub fn right(self) -> Option<Self> {
        match self.level() {
            0 => None,
            k => Some(Self(self.0 ^ (3 << (k - 1)))),
        }
    }
}

/// Direction taken at each step from `size`'s root down to `leaf`.
///
/// `false` is left, `true` is right. Empty for a one-leaf tree.
pub(crate) fn direct_path_from_root(size: TreeSize, leaf: LeafIndex) -> Vec<bool> {
    let target = leaf.node();
    let mut node = size.root();
    let mut steps = Vec::with_capacity(size.root().level() as usize);

    while node != target {
        let go_right = target > node;
        let next = if go_right { node.right() } else { node.left() };
        match next {
            Some(child) => {
                steps.push(go_right);
                node = child;
            },
            None => break,
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_leaves_rounds_up_to_power_of_two() {
        assert_eq!(TreeSize::for_leaves(0).leaf_count(), 1);
        assert_eq!(TreeSize::for_leaves(1).leaf_count(), 1);
        assert_eq!(TreeSize::for_leaves(3).leaf_count(), 4);
        assert_eq!(TreeSize::for_leaves(4).leaf_count(), 4);
        assert_eq!(TreeSize::for_leaves(5).leaf_count(), 8);
    }

    #[test]
    fn for_leaves_clamps_to_max() {
        assert_eq!(TreeSize::for_leaves(MAX_LEAVES).leaf_count(), MAX_LEAVES);
        assert_eq!(TreeSize::for_leaves(MAX_LEAVES + 1).leaf_count(), MAX_LEAVES);

        let largest = TreeSize::for_leaves(u32::MAX);
        assert_eq!(largest, TreeSize::for_leaves(MAX_LEAVES));
        assert_eq!(largest.width(), (1u64 << 32) - 1);
        assert!(largest.contains(LeafIndex(MAX_LEAVES - 1)));
        assert!(!largest.contains(LeafIndex(MAX_LEAVES)));
        assert!(!largest.contains(LeafIndex(u32::MAX - 1)));
    }

    #[test]
    fn width_and_root() {
        let size = TreeSize::for_leaves(4);
        assert_eq!(size.width(), 7);
        assert_eq!(size.root(), NodeIndex(3));
        assert_eq!(TreeSize::for_leaves(1).root(), NodeIndex(0));
    }

    #[test]
    fn children_of_root() {
        let root = NodeIndex(3);
        assert_eq!(root.level(), 2);
        assert_eq!(root.left(), Some(NodeIndex(1)));
        assert_eq!(root.right(), Some(NodeIndex(5)));
        assert_eq!(NodeIndex(4).left(), None);
    }

    #[test]
    fn path_to_each_leaf() {
        let size = TreeSize::for_leaves(4);
        assert_eq!(direct_path_from_root(size, LeafIndex(0)), vec![false, false]);
        assert_eq!(direct_path_from_root(size, LeafIndex(1)), vec![false, true]);
        assert_eq!(direct_path_from_root(size, LeafIndex(2)), vec![true, false]);
        assert_eq!(direct_path_from_root(size, LeafIndex(3)), vec![true, true]);
    }

    #[test]
    fn single_leaf_path_is_empty() {
        assert!(direct_path_from_root(TreeSize::for_leaves(1), LeafIndex(0)).is_empty());
    }

    #[test]
    fn contains_respects_capacity() {
        let size = TreeSize::for_leaves(3);
        assert!(size.contains(LeafIndex(3)));
        assert!(!size.contains(LeafIndex(4)));
    }
}
