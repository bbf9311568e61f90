//! `SpatialIndex` — a fixed-size chained hash from tile coordinates to
//! `TileId`.
//!
//! The tile coordinate space is bounded at 16 bits per axis, so the bucket
//! array never grows; collisions chain through `Tile::down`, which keeps the
//! index itself at one word per bucket.

use super::tile::{Tile, TileId};

// ── Hash function ───────────────────────────────────────────────────────

/// Two distinct Fibonacci-derived constants for mixing x and y independently.
const MX: u64 = 0x517c_c1b7_2722_0a95;
const MY: u64 = 0x6c62_272e_07bb_0142;

const BUCKET_BITS: u32 = 12;
const BUCKETS: usize = 1 << BUCKET_BITS;

#[inline(always)]
pub(crate) fn tile_hash(x: i16, y: i16) -> u64 {
    (x as u64).wrapping_mul(MX) ^ (y as u64).wrapping_mul(MY).rotate_right(31)
}

#[inline(always)]
fn bucket(x: i16, y: i16) -> usize {
    (tile_hash(x, y) >> (64 - BUCKET_BITS)) as usize
}

// ── SpatialIndex ────────────────────────────────────────────────────────

pub struct SpatialIndex {
    heads: Box<[Option<TileId>]>,
    len: usize,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self {
            heads: vec![None; BUCKETS].into_boxed_slice(),
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, tiles: &[Tile], x: i16, y: i16) -> Option<TileId> {
        let mut cursor = self.heads[bucket(x, y)];
        while let Some(id) = cursor {
            let tile = &tiles[id.index()];
            if tile.coord == (x, y) {
                return Some(id);
            }
            cursor = tile.down;
        }
        None
    }

    /// Links `id` at the head of its bucket. The caller guarantees no tile
    /// with the same coordinate is present.
    pub fn put(&mut self, tiles: &mut [Tile], id: TileId) {
        let (x, y) = tiles[id.index()].coord;
        let head = &mut self.heads[bucket(x, y)];
        tiles[id.index()].down = *head;
        *head = Some(id);
        self.len += 1;
    }

    /// Unchains `id`. Returns `false` if it was not indexed.
    pub fn remove(&mut self, tiles: &mut [Tile], id: TileId) -> bool {
        let (x, y) = tiles[id.index()].coord;
        let b = bucket(x, y);
        let mut prev: Option<TileId> = None;
        let mut cursor = self.heads[b];
        while let Some(current) = cursor {
            let next = tiles[current.index()].down;
            if current == id {
                match prev {
                    Some(p) => tiles[p.index()].down = next,
                    None => self.heads[b] = next,
                }
                tiles[id.index()].down = None;
                self.len -= 1;
                return true;
            }
            prev = Some(current);
            cursor = next;
        }
        false
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slab(coords: &[(i16, i16)]) -> Vec<Tile> {
        coords.iter().map(|&c| Tile::new(c)).collect()
    }

    #[test]
    fn insert_get_remove() {
        let mut tiles = slab(&[(0, 0), (1, 0), (0, 1)]);
        let mut index = SpatialIndex::new();
        for i in 0..3 {
            index.put(&mut tiles, TileId(i));
        }
        assert_eq!(index.len(), 3);
        assert_eq!(index.get(&tiles, 1, 0), Some(TileId(1)));
        assert_eq!(index.get(&tiles, 0, 1), Some(TileId(2)));
        assert_eq!(index.get(&tiles, 1, 1), None);

        assert!(index.remove(&mut tiles, TileId(1)));
        assert!(!index.remove(&mut tiles, TileId(1)));
        assert_eq!(index.get(&tiles, 1, 0), None);
        assert_eq!(index.get(&tiles, 0, 0), Some(TileId(0)));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn negative_and_extreme_coords() {
        let coords = [(-1, -1), (i16::MIN, i16::MAX), (i16::MAX, i16::MIN), (-300, 7)];
        let mut tiles = slab(&coords);
        let mut index = SpatialIndex::new();
        for i in 0..coords.len() {
            index.put(&mut tiles, TileId(i as u32));
        }
        for (i, &(x, y)) in coords.iter().enumerate() {
            assert_eq!(index.get(&tiles, x, y), Some(TileId(i as u32)));
        }
    }

    #[test]
    fn remove_does_not_break_chains() {
        // Far more tiles than buckets, so every bucket chains.
        let coords: Vec<(i16, i16)> = (-80..80)
            .flat_map(|x| (-40..40).map(move |y| (x, y)))
            .collect();
        let mut tiles = slab(&coords);
        let mut index = SpatialIndex::new();
        for i in 0..coords.len() {
            index.put(&mut tiles, TileId(i as u32));
        }
        for i in (0..coords.len()).step_by(3) {
            assert!(index.remove(&mut tiles, TileId(i as u32)));
        }
        for (i, &(x, y)) in coords.iter().enumerate() {
            let expected = (i % 3 != 0).then_some(TileId(i as u32));
            assert_eq!(index.get(&tiles, x, y), expected, "({x},{y})");
        }
    }
}
