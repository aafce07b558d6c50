//! Work partitioning across a fixed worker pool
//!
//! Each worker receives one contiguous block of indexes into the target
//! sequence. Blocks are handed out in increasing order and together cover
//! every index exactly once.

/// An inclusive index range `[first, last]` into the target sequence
///
/// A block always holds at least one item; the empty block is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkBlock {
    pub first: usize,
    pub last: usize,
}

impl WorkBlock {
    pub fn contains(&self, index: usize) -> bool {
        (self.first..=self.last).contains(&index)
    }
}

/// Computes the block of items assigned to `block_index`
///
/// Returns `None` (the empty block) when the index is out of range or there
/// is nothing left for this worker to do.
///
/// # Rules
///
/// - More blocks than items: each of the first `total_count` blocks gets
///   exactly one item
/// - Otherwise blocks hold `ceil(total_count / block_count)` items, and the
///   final block always runs to the last item
///
/// # Examples
///
/// ```
/// use sitesurge::crawler::{block_range, WorkBlock};
///
/// assert_eq!(block_range(0, 4, 16), Some(WorkBlock { first: 0, last: 3 }));
/// assert_eq!(block_range(3, 4, 16), Some(WorkBlock { first: 12, last: 15 }));
/// assert_eq!(block_range(10, 11, 10), None);
/// ```
pub fn block_range(block_index: usize, block_count: usize, total_count: usize) -> Option<WorkBlock> {
    if block_index >= block_count || total_count == 0 {
        return None;
    }

    if block_count > total_count {
        return (block_index < total_count).then_some(WorkBlock {
            first: block_index,
            last: block_index,
        });
    }

    let block_size = total_count.div_ceil(block_count);
    let first = block_index * block_size;

    // Rounding up can leave trailing blocks with nothing to do.
    if first >= total_count {
        return None;
    }

    let last = if block_index == block_count - 1 {
        total_count - 1
    } else {
        (block_size * (block_index + 1) - 1).min(total_count - 1)
    };

    Some(WorkBlock { first, last })
}
