use karst_chunk::ChunkGrid;
use proptest::prelude::*;

fn dim() -> impl Strategy<Value = i32> {
    1i32..=8
}

proptest! {
    // Every in-bounds position maps to a unique cell and positions() visits all of them.
    #[test]
    fn grid_indexing_is_bijective(sx in dim(), sy in dim(), sz in dim()) {
        let mut grid: ChunkGrid<u32> = ChunkGrid::new();
        grid.init(sx, sy, sz, 0);

        let mut counter = 0u32;
        for p in grid.positions().collect::<Vec<_>>() {
            counter += 1;
            grid.set_at(p, counter);
        }
        prop_assert_eq!(counter as i64, (sx * sy * sz) as i64);

        // All written values distinct, so no two positions aliased a cell.
        let mut values: Vec<u32> = grid.iter().copied().collect();
        values.sort_unstable();
        values.dedup();
        prop_assert_eq!(values.len() as i64, (sx * sy * sz) as i64);
    }

    #[test]
    fn fill_overwrites_every_cell(sx in dim(), sy in dim(), sz in dim(), v in any::<u8>()) {
        let mut grid: ChunkGrid<u8> = ChunkGrid::new();
        grid.init(sx, sy, sz, 0);
        grid.fill(v);
        prop_assert!(grid.iter().all(|&c| c == v));
    }

    #[test]
    fn is_valid_matches_bounds(sx in dim(), sy in dim(), sz in dim()) {
        let mut grid: ChunkGrid<u8> = ChunkGrid::new();
        grid.init(sx, sy, sz, 0);
        let probes = [
            (0, 0, 0, true),
            (sx - 1, sy - 1, sz - 1, true),
            (-1, 0, 0, false),
            (sx, 0, 0, false),
            (0, -1, 0, false),
            (0, sy, 0, false),
            (0, 0, -1, false),
            (0, 0, sz, false),
        ];
        for (x, y, z, expect) in probes {
            prop_assert_eq!(grid.is_valid(x, y, z), expect);
        }
    }
}
