//! Tile slab, free list and neighbour wiring.
//!
//! Tiles never move once allocated; a `TileId` stays valid until the tile is
//! reclaimed, at which point every neighbour link to it has been cleared.

use super::lifecycle::{Chain, TileList};
use super::tile::{Direction, Tile, TileFlags, TileId};
use super::tilemap::SpatialIndex;

/// Why a tile could not be allocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct OutOfTiles;

pub struct TileArena {
    pub(crate) tiles: Vec<Tile>,
    pub(crate) free_list: Vec<TileId>,
    pub(crate) index: SpatialIndex,
    pub(crate) living: TileList,
    pub(crate) hibernating: TileList,
    pub(crate) morgue: TileList,
    pub(crate) display: TileList,
    /// First morgue tile that has sat through a full sweep interval.
    pub(crate) caretaker: Option<TileId>,
    pub(crate) occupied: usize,
    pub(crate) max_tiles: Option<usize>,
}

impl TileArena {
    pub fn new(max_tiles: Option<usize>) -> Self {
        Self {
            tiles: Vec::new(),
            free_list: Vec::new(),
            index: SpatialIndex::new(),
            living: TileList::new(Chain::Life),
            hibernating: TileList::new(Chain::Life),
            morgue: TileList::new(Chain::Life),
            display: TileList::new(Chain::Display),
            caretaker: None,
            occupied: 0,
            max_tiles,
        }
    }

    #[inline]
    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.index()]
    }

    #[inline]
    pub fn tile_mut(&mut self, id: TileId) -> &mut Tile {
        &mut self.tiles[id.index()]
    }

    #[inline]
    pub fn id_at(&self, coord: (i16, i16)) -> Option<TileId> {
        self.index.get(&self.tiles, coord.0, coord.1)
    }

    #[inline]
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Ids of every allocated tile, in slab order.
    pub fn ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| !tile.is_vacant())
            .map(|(i, _)| TileId(i as u32))
    }

    fn allocate_slot(&mut self, coord: (i16, i16)) -> Result<TileId, OutOfTiles> {
        if self.max_tiles.is_some_and(|max| self.occupied >= max) {
            return Err(OutOfTiles);
        }
        if let Some(id) = self.free_list.pop() {
            self.tiles[id.index()] = Tile::new(coord);
            return Ok(id);
        }
        if self.tiles.len() >= u32::MAX as usize {
            return Err(OutOfTiles);
        }
        self.tiles.try_reserve(1).map_err(|_| OutOfTiles)?;
        let id = TileId(self.tiles.len() as u32);
        self.tiles.push(Tile::new(coord));
        Ok(id)
    }

    fn link_neighbors(&mut self, id: TileId, coord: (i16, i16)) {
        for dir in Direction::ALL {
            let (nx, ny) = dir.step(coord);
            if let Some(neighbor) = self.index.get(&self.tiles, nx, ny) {
                self.tiles[id.index()].neighbors[dir.index()] = Some(neighbor);
                self.tiles[neighbor.index()].neighbors[dir.reverse().index()] = Some(id);
            }
        }
    }

    /// Creates the tile at `coord`, wires it to its neighbours and puts it at
    /// the head of the living and display lists.
    pub(crate) fn allocate(&mut self, coord: (i16, i16)) -> Result<TileId, OutOfTiles> {
        debug_assert!(self.id_at(coord).is_none());
        let id = self.allocate_slot(coord)?;
        self.index.put(&mut self.tiles, id);
        self.occupied += 1;
        self.link_neighbors(id, coord);
        self.living.push_front(&mut self.tiles, id);
        self.add_to_display(id);
        Ok(id)
    }

    /// Unwires and frees a tile that is already off every list.
    pub(crate) fn release(&mut self, id: TileId) {
        let i = id.index();
        if self.tiles[i].is_vacant() {
            return;
        }
        debug_assert!(!self.tiles[i].flags.contains(TileFlags::DISPLAYED));
        for dir in Direction::ALL {
            if let Some(neighbor) = self.tiles[i].neighbors[dir.index()] {
                self.tiles[neighbor.index()].neighbors[dir.reverse().index()] = None;
            }
        }
        self.index.remove(&mut self.tiles, id);
        self.tiles[i] = Tile::vacant();
        self.free_list.push(id);
        self.occupied -= 1;
    }

    /// Drops every tile.
    pub fn clear(&mut self) {
        let max_tiles = self.max_tiles;
        *self = Self::new(max_tiles);
    }
}
