//! Fetch ordering for required tiles
//!
//! Visible tiles are requested before the prefetch ring so that visible
//! content wins when the compositor processes requests with limited
//! concurrency.

use crate::tiles::TileCoord;
use std::collections::BTreeSet;

/// Why a tile is required
///
/// Higher values are requested first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FetchPriority {
    /// Adjacent to the visible area, fetched ahead of scrolling
    Prefetch = 0,

    /// Intersects the viewport
    Visible = 1,
}

/// A required tile and its priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedFetch {
    pub coord: TileCoord,
    pub priority: FetchPriority,
}

/// Order the required set for fetching.
///
/// Required tiles that are also covering come first in row-major order,
/// followed by the rest of the ring in row-major order. Covering tiles
/// outside the required set are skipped.
pub fn fetch_order(
    covering: &BTreeSet<TileCoord>,
    required: &BTreeSet<TileCoord>,
) -> Vec<PlannedFetch> {
    let visible = required
        .iter()
        .filter(|coord| covering.contains(coord))
        .map(|&coord| PlannedFetch {
            coord,
            priority: FetchPriority::Visible,
        });
    let prefetch = required
        .iter()
        .filter(|coord| !covering.contains(coord))
        .map(|&coord| PlannedFetch {
            coord,
            priority: FetchPriority::Prefetch,
        });
    visible.chain(prefetch).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::ring;

    fn coords(pairs: &[(usize, usize)]) -> BTreeSet<TileCoord> {
        pairs.iter().map(|&(r, c)| TileCoord::new(r, c)).collect()
    }

    #[test]
    fn test_priority_ordering() {
        assert!(FetchPriority::Visible > FetchPriority::Prefetch);
    }

    #[test]
    fn test_visible_before_prefetch() {
        let covering = coords(&[(1, 1)]);
        let required = ring(&covering, 3, 3);
        let plan = fetch_order(&covering, &required);

        let order: Vec<(usize, usize)> = plan.iter().map(|p| (p.coord.row, p.coord.col)).collect();
        assert_eq!(order, vec![(1, 1), (0, 1), (1, 0), (1, 2), (2, 1)]);
        assert_eq!(plan[0].priority, FetchPriority::Visible);
        assert!(plan[1..].iter().all(|p| p.priority == FetchPriority::Prefetch));
    }

    #[test]
    fn test_visible_tiles_in_row_major_order() {
        let covering = coords(&[(1, 1), (0, 1), (1, 0), (0, 0)]);
        let required = ring(&covering, 2, 2);
        let plan = fetch_order(&covering, &required);
        let order: Vec<(usize, usize)> = plan.iter().map(|p| (p.coord.row, p.coord.col)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_covering_outside_required_is_skipped() {
        let covering = coords(&[(0, 0), (9, 9)]);
        let required = coords(&[(0, 0), (0, 1)]);
        let plan = fetch_order(&covering, &required);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].coord, TileCoord::new(0, 0));
        assert_eq!(plan[1].coord, TileCoord::new(0, 1));
    }
}
