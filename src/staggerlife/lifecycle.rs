//! Lifecycle lists and the transitions between them.
//!
//! Every allocated tile sits on exactly one of the living, hibernating and
//! morgue lists, and independently may sit on the display list. Lists are
//! intrusive: the links live in the tile, so moving a tile is O(1) and no
//! list owns storage.
//!
//! Morgue tiles are not freed when they die. They are reclaimed in batches by
//! [`TileArena::reclaim`], which never frees a tile the renderer may still be
//! drawing unless allocation is failing outright.

use log::trace;

use super::arena::TileArena;
use super::quiescence::Quiescence;
use super::tile::{Lifecycle, ListLinks, Tile, TileFlags, TileId};

/// Which pair of links a list threads through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Chain {
    Life,
    Display,
}

impl Chain {
    #[inline]
    fn links(self, tile: &Tile) -> &ListLinks {
        match self {
            Chain::Life => &tile.life,
            Chain::Display => &tile.display,
        }
    }

    #[inline]
    fn links_mut(self, tile: &mut Tile) -> &mut ListLinks {
        match self {
            Chain::Life => &mut tile.life,
            Chain::Display => &mut tile.display,
        }
    }
}

#[derive(Debug)]
pub(crate) struct TileList {
    head: Option<TileId>,
    len: usize,
    chain: Chain,
}

impl TileList {
    pub fn new(chain: Chain) -> Self {
        Self {
            head: None,
            len: 0,
            chain,
        }
    }

    #[inline]
    pub fn head(&self) -> Option<TileId> {
        self.head
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    #[inline]
    pub fn next(&self, tiles: &[Tile], id: TileId) -> Option<TileId> {
        self.chain.links(&tiles[id.index()]).next
    }

    pub fn push_front(&mut self, tiles: &mut [Tile], id: TileId) {
        let links = self.chain.links_mut(&mut tiles[id.index()]);
        links.prev = None;
        links.next = self.head;
        if let Some(head) = self.head {
            self.chain.links_mut(&mut tiles[head.index()]).prev = Some(id);
        }
        self.head = Some(id);
        self.len += 1;
    }

    pub fn unlink(&mut self, tiles: &mut [Tile], id: TileId) {
        let ListLinks { next, prev } = *self.chain.links(&tiles[id.index()]);
        match prev {
            Some(p) => self.chain.links_mut(&mut tiles[p.index()]).next = next,
            None => self.head = next,
        }
        if let Some(n) = next {
            self.chain.links_mut(&mut tiles[n.index()]).prev = prev;
        }
        *self.chain.links_mut(&mut tiles[id.index()]) = ListLinks::default();
        self.len -= 1;
    }

    pub fn iter<'a>(&self, tiles: &'a [Tile]) -> impl Iterator<Item = TileId> + 'a {
        let chain = self.chain;
        std::iter::successors(self.head, move |&id| chain.links(&tiles[id.index()]).next)
    }
}

/// How hard a reclamation sweep may dig.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Reclaim {
    /// Morgue tiles from the caretaker onward, skipping displayed ones.
    Aged,
    /// The whole morgue, skipping displayed tiles.
    Undisplayed,
    /// The whole morgue, pulling tiles off the display list first.
    Everything,
}

impl TileArena {
    /// Moves `id` from its current lifecycle list to the head of `to`.
    fn relist(&mut self, id: TileId, to: Lifecycle) {
        let from = self.tiles[id.index()].lifecycle;
        if from == to {
            return;
        }
        if from == Lifecycle::Morgue && self.caretaker == Some(id) {
            self.caretaker = self.morgue.next(&self.tiles, id);
        }
        let tiles = &mut self.tiles;
        match from {
            Lifecycle::Living => self.living.unlink(tiles, id),
            Lifecycle::Hibernating => self.hibernating.unlink(tiles, id),
            Lifecycle::Morgue => self.morgue.unlink(tiles, id),
            Lifecycle::Vacant => {}
        }
        match to {
            Lifecycle::Living => self.living.push_front(tiles, id),
            Lifecycle::Hibernating => self.hibernating.push_front(tiles, id),
            Lifecycle::Morgue => self.morgue.push_front(tiles, id),
            Lifecycle::Vacant => {}
        }
        tiles[id.index()].lifecycle = to;
    }

    /// Living to morgue: the tile is empty and stable in both phases.
    pub(crate) fn kill(&mut self, id: TileId) {
        if self.tiles[id.index()].lifecycle == Lifecycle::Living {
            self.relist(id, Lifecycle::Morgue);
        }
    }

    /// Living to hibernating: stable in both phases but not empty.
    pub(crate) fn tranquilize(&mut self, id: TileId) {
        if self.tiles[id.index()].lifecycle == Lifecycle::Living {
            self.relist(id, Lifecycle::Hibernating);
        }
    }

    /// Forces `id` to be computed on the next pass. A sleeping tile is moved
    /// back to living with its cached quiescence forgotten. Returns whether
    /// the tile changed lists.
    pub(crate) fn rattle(&mut self, id: TileId) -> bool {
        let tile = &mut self.tiles[id.index()];
        tile.flags.insert(TileFlags::RATTLED);
        let from = tile.lifecycle;
        if !matches!(from, Lifecycle::Hibernating | Lifecycle::Morgue) {
            return false;
        }
        tile.flags.remove(TileFlags::PHASES);
        tile.pstate = Quiescence::NONE;
        tile.qstate = Quiescence::NONE;
        self.relist(id, Lifecycle::Living);
        if from == Lifecycle::Morgue {
            self.add_to_display(id);
        }
        true
    }

    /// Forgets all cached quiescence and brings every tile back to living.
    pub(crate) fn rattle_all(&mut self) {
        let living: Vec<TileId> = self.living.iter(&self.tiles).collect();
        for id in living {
            let tile = &mut self.tiles[id.index()];
            tile.pstate = Quiescence::NONE;
            tile.qstate = Quiescence::NONE;
        }
        while let Some(id) = self.morgue.head() {
            self.rattle(id);
        }
        while let Some(id) = self.hibernating.head() {
            self.rattle(id);
        }
    }

    pub(crate) fn add_to_display(&mut self, id: TileId) {
        let tile = &mut self.tiles[id.index()];
        if tile.flags.contains(TileFlags::DISPLAYED) {
            return;
        }
        tile.flags.insert(TileFlags::DISPLAYED);
        self.display.push_front(&mut self.tiles, id);
    }

    pub(crate) fn remove_from_display(&mut self, id: TileId) {
        let tile = &mut self.tiles[id.index()];
        if !tile.flags.contains(TileFlags::DISPLAYED) {
            return;
        }
        tile.flags.remove(TileFlags::DISPLAYED);
        self.display.unlink(&mut self.tiles, id);
    }

    /// Frees morgue tiles according to `mode` and returns how many went.
    /// Afterwards every surviving morgue tile counts as freshly dead.
    pub(crate) fn reclaim(&mut self, mode: Reclaim) -> usize {
        let mut victim = match mode {
            Reclaim::Aged => self.caretaker,
            Reclaim::Undisplayed | Reclaim::Everything => self.morgue.head(),
        };
        let mut freed = 0;
        while let Some(id) = victim {
            victim = self.morgue.next(&self.tiles, id);
            if self.tiles[id.index()].flags.contains(TileFlags::DISPLAYED) {
                if mode != Reclaim::Everything {
                    continue;
                }
                self.remove_from_display(id);
            }
            self.morgue.unlink(&mut self.tiles, id);
            self.release(id);
            freed += 1;
        }
        self.caretaker = self.morgue.head();
        trace!(
            "reclaimed {freed} morgue tiles ({mode:?}), {} remain",
            self.morgue.len()
        );
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(list: &TileList, arena: &TileArena) -> Vec<TileId> {
        list.iter(&arena.tiles).collect()
    }

    #[test]
    fn push_and_unlink_keep_links_consistent() {
        let mut arena = TileArena::new(None);
        let ids: Vec<TileId> = (0..4).map(|x| arena.allocate((x, 0)).unwrap()).collect();
        assert_eq!(collect(&arena.living, &arena), vec![ids[3], ids[2], ids[1], ids[0]]);
        arena.living.unlink(&mut arena.tiles, ids[2]);
        assert_eq!(collect(&arena.living, &arena), vec![ids[3], ids[1], ids[0]]);
        arena.living.unlink(&mut arena.tiles, ids[3]);
        assert_eq!(arena.living.head(), Some(ids[1]));
        arena.living.unlink(&mut arena.tiles, ids[0]);
        assert_eq!(collect(&arena.living, &arena), vec![ids[1]]);
        assert_eq!(arena.living.len(), 1);
    }

    #[test]
    fn rattle_revives_morgue_tile_into_display() {
        let mut arena = TileArena::new(None);
        let id = arena.allocate((0, 0)).unwrap();
        arena.kill(id);
        arena.remove_from_display(id);
        assert_eq!(arena.tile(id).lifecycle, Lifecycle::Morgue);

        assert!(arena.rattle(id));
        let tile = arena.tile(id);
        assert_eq!(tile.lifecycle, Lifecycle::Living);
        assert!(tile.flags.contains(TileFlags::DISPLAYED | TileFlags::RATTLED));
        assert!(arena.morgue.is_empty());
        assert!(!arena.rattle(id));
    }

    #[test]
    fn rattle_moves_caretaker_past_revived_tile() {
        let mut arena = TileArena::new(None);
        let a = arena.allocate((0, 0)).unwrap();
        let b = arena.allocate((4, 0)).unwrap();
        arena.kill(a);
        arena.kill(b);
        arena.caretaker = arena.morgue.head();
        assert_eq!(arena.caretaker, Some(b));
        arena.rattle(b);
        assert_eq!(arena.caretaker, Some(a));
    }

    #[test]
    fn reclaim_skips_displayed_tiles_unless_desperate() {
        let mut arena = TileArena::new(None);
        let shown = arena.allocate((0, 0)).unwrap();
        let hidden = arena.allocate((9, 9)).unwrap();
        arena.kill(shown);
        arena.kill(hidden);
        arena.remove_from_display(hidden);

        assert_eq!(arena.reclaim(Reclaim::Undisplayed), 1);
        assert_eq!(arena.id_at((9, 9)), None);
        assert_eq!(arena.id_at((0, 0)), Some(shown));
        assert_eq!(arena.caretaker, Some(shown));

        assert_eq!(arena.reclaim(Reclaim::Everything), 1);
        assert!(arena.display.is_empty());
        assert_eq!(arena.occupied(), 0);
    }

    #[test]
    fn aged_reclaim_spares_tiles_newer_than_caretaker() {
        let mut arena = TileArena::new(None);
        let old = arena.allocate((0, 0)).unwrap();
        arena.remove_from_display(old);
        arena.kill(old);
        arena.caretaker = arena.morgue.head();
        let young = arena.allocate((5, 0)).unwrap();
        arena.remove_from_display(young);
        arena.kill(young);

        assert_eq!(arena.reclaim(Reclaim::Aged), 1);
        assert_eq!(arena.id_at((0, 0)), None);
        assert_eq!(arena.id_at((5, 0)), Some(young));
        assert_eq!(arena.caretaker, Some(young));
    }

    #[test]
    fn rattle_all_empties_sleeping_lists() {
        let mut arena = TileArena::new(None);
        let a = arena.allocate((0, 0)).unwrap();
        let b = arena.allocate((1, 0)).unwrap();
        arena.kill(a);
        arena.tranquilize(b);
        arena.rattle_all();
        assert!(arena.morgue.is_empty());
        assert!(arena.hibernating.is_empty());
        assert_eq!(arena.living.len(), 2);
    }
}
