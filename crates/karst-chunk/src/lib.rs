//! Dense chunk storage and the spawn/recycle chunk pool pattern.
#![forbid(unsafe_code)]

use karst_geom::{ChunkPos, VoxelPos};

/// Chunk footprint in voxels along X.
pub const CHUNK_WIDTH: i32 = 64;
/// Chunk footprint in voxels along Z.
pub const CHUNK_DEPTH: i32 = 64;

/// Dense per-voxel storage for one chunk. Indexing outside the grid is a
/// programming error and panics; callers with externally-derived positions
/// (neighbor offsets near chunk edges) must check `is_valid` first.
#[derive(Clone, Debug, Default)]
pub struct ChunkGrid<T> {
    sx: i32,
    sy: i32,
    sz: i32,
    data: Vec<T>,
}

impl<T: Clone> ChunkGrid<T> {
    pub fn new() -> Self {
        Self {
            sx: 0,
            sy: 0,
            sz: 0,
            data: Vec::new(),
        }
    }

    /// Allocates storage for the given dimensions, filling every cell with `value`.
    pub fn init(&mut self, sx: i32, sy: i32, sz: i32, value: T) {
        assert!(
            sx > 0 && sy > 0 && sz > 0,
            "invalid chunk grid dims {sx}x{sy}x{sz}"
        );
        self.sx = sx;
        self.sy = sy;
        self.sz = sz;
        self.data.clear();
        self.data.resize((sx * sy * sz) as usize, value);
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.sx
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.sy
    }

    #[inline]
    pub fn depth(&self) -> i32 {
        self.sz
    }

    #[inline]
    pub fn is_valid(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0 && x < self.sx && y >= 0 && y < self.sy && z >= 0 && z < self.sz
    }

    #[inline]
    fn idx(&self, x: i32, y: i32, z: i32) -> usize {
        assert!(
            self.is_valid(x, y, z),
            "voxel ({x},{y},{z}) out of chunk grid bounds {}x{}x{}",
            self.sx,
            self.sy,
            self.sz
        );
        ((y * self.sz + z) * self.sx + x) as usize
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> &T {
        &self.data[self.idx(x, y, z)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: i32, y: i32, z: i32) -> &mut T {
        let i = self.idx(x, y, z);
        &mut self.data[i]
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, z: i32, value: T) {
        let i = self.idx(x, y, z);
        self.data[i] = value;
    }

    #[inline]
    pub fn at(&self, pos: VoxelPos) -> &T {
        self.get(pos.x, pos.y, pos.z)
    }

    #[inline]
    pub fn at_mut(&mut self, pos: VoxelPos) -> &mut T {
        self.get_mut(pos.x, pos.y, pos.z)
    }

    #[inline]
    pub fn set_at(&mut self, pos: VoxelPos, value: T) {
        self.set(pos.x, pos.y, pos.z, value);
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Iterates every valid position in x-fastest, then z, then y order.
    pub fn positions(&self) -> impl Iterator<Item = VoxelPos> + '_ {
        let (sx, sy, sz) = (self.sx, self.sy, self.sz);
        (0..sy).flat_map(move |y| {
            (0..sz).flat_map(move |z| (0..sx).map(move |x| VoxelPos::new(x, y, z)))
        })
    }

    /// Drops storage and resets dimensions to zero.
    pub fn clear(&mut self) {
        self.sx = 0;
        self.sy = 0;
        self.sz = 0;
        self.data.clear();
    }
}

/// Position/height identity shared by every chunk kind. Embedded rather than
/// inherited; chunk types delegate their `ManagedChunk` identity to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkHeader {
    pub position: ChunkPos,
    pub height: i32,
}

impl ChunkHeader {
    pub fn init(&mut self, position: ChunkPos, height: i32) {
        assert!(height > 0, "chunk height must be positive, got {height}");
        self.position = position;
        self.height = height;
    }

    pub fn clear(&mut self) {
        *self = ChunkHeader::default();
    }
}

/// Lifecycle contract for pooled chunks: `init` readies a slot for a world
/// position, `clear` wipes all state so the slot can be reused elsewhere.
/// Backend-owned resources (physics bodies) must already be released when
/// `clear` runs; `clear` itself never talks to a backend.
pub trait ManagedChunk: Default {
    fn init(&mut self, position: ChunkPos, height: i32);
    fn position(&self) -> ChunkPos;
    fn height(&self) -> i32;
    fn clear(&mut self);
}

/// Owns chunk instances for one chunk kind: active chunks plus a spare list
/// of cleared instances awaiting reuse. Spawning prefers a spare instance so
/// steady-state streaming does no allocation.
#[derive(Default)]
pub struct ChunkPool<C: ManagedChunk> {
    active: Vec<C>,
    spare: Vec<C>,
}

impl<C: ManagedChunk> ChunkPool<C> {
    pub fn new() -> Self {
        Self {
            active: Vec::new(),
            spare: Vec::new(),
        }
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn index_of(&self, position: ChunkPos) -> Option<usize> {
        self.active.iter().position(|c| c.position() == position)
    }

    pub fn get(&self, index: usize) -> &C {
        &self.active[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut C {
        &mut self.active[index]
    }

    pub fn at_position(&self, position: ChunkPos) -> Option<&C> {
        self.index_of(position).map(|i| &self.active[i])
    }

    pub fn at_position_mut(&mut self, position: ChunkPos) -> Option<&mut C> {
        self.index_of(position).map(move |i| &mut self.active[i])
    }

    pub fn iter(&self) -> core::slice::Iter<'_, C> {
        self.active.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, C> {
        self.active.iter_mut()
    }

    /// Moves a spare instance (or a fresh default) into the active set and
    /// initializes it at the position. Returns the active index.
    pub fn spawn(&mut self, position: ChunkPos, height: i32) -> usize {
        debug_assert!(
            self.index_of(position).is_none(),
            "chunk ({},{}) already active",
            position.x,
            position.z
        );
        let mut chunk = self.spare.pop().unwrap_or_default();
        chunk.init(position, height);
        self.active.push(chunk);
        self.active.len() - 1
    }

    /// Clears the chunk at the index and moves it back to the spare list.
    pub fn recycle(&mut self, index: usize) {
        let mut chunk = self.active.remove(index);
        chunk.clear();
        self.spare.push(chunk);
    }

    /// Recycles the chunk at the position if it is active.
    pub fn recycle_at(&mut self, position: ChunkPos) -> bool {
        match self.index_of(position) {
            Some(i) => {
                self.recycle(i);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct TestChunk {
        header: ChunkHeader,
        init_count: u32,
        clear_count: u32,
    }

    impl ManagedChunk for TestChunk {
        fn init(&mut self, position: ChunkPos, height: i32) {
            self.header.init(position, height);
            self.init_count += 1;
        }

        fn position(&self) -> ChunkPos {
            self.header.position
        }

        fn height(&self) -> i32 {
            self.header.height
        }

        fn clear(&mut self) {
            self.header.clear();
            self.clear_count += 1;
        }
    }

    #[test]
    fn spawn_then_recycle_reuses_instance() {
        let mut pool: ChunkPool<TestChunk> = ChunkPool::new();
        let a = ChunkPos::new(3, -2);
        let b = ChunkPos::new(-7, 9);

        let idx = pool.spawn(a, 8);
        assert_eq!(idx, 0);
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.get(idx).position(), a);
        assert_eq!(pool.get(idx).height(), 8);

        assert!(pool.recycle_at(a));
        assert_eq!(pool.active_count(), 0);
        assert!(pool.index_of(a).is_none());

        // Spare instance comes back with counters intact.
        let idx = pool.spawn(b, 8);
        let chunk = pool.get(idx);
        assert_eq!(chunk.position(), b);
        assert_eq!(chunk.init_count, 2);
        assert_eq!(chunk.clear_count, 1);
    }

    #[test]
    fn recycle_unknown_position_is_noop() {
        let mut pool: ChunkPool<TestChunk> = ChunkPool::new();
        pool.spawn(ChunkPos::new(0, 0), 4);
        assert!(!pool.recycle_at(ChunkPos::new(1, 1)));
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn grid_position_accessors_agree() {
        let mut grid: ChunkGrid<u8> = ChunkGrid::new();
        grid.init(4, 4, 4, 0);
        let pos = VoxelPos::new(1, 2, 3);
        *grid.at_mut(pos) = 7;
        assert_eq!(*grid.at(pos), 7);
        assert_eq!(*grid.get(1, 2, 3), 7);
    }

    #[test]
    #[should_panic]
    fn grid_out_of_bounds_panics() {
        let mut grid: ChunkGrid<u8> = ChunkGrid::new();
        grid.init(4, 4, 4, 0);
        grid.get(4, 0, 0);
    }
}
