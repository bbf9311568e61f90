//! Tile storage: one 16x16 block of the universe in both phases.
//!
//! Each phase holds sixteen 16-bit words. A word is a 4x4 block of cells;
//! inside it the four 2x2 nibbles run NW (`0xf000`), SW (`0x0f00`),
//! NE (`0x00f0`), SE (`0x000f`), and inside a nibble the bits run
//! NW `8`, NE `4`, SW `2`, SE `1`. Words 0..4 form the north-west 8x8
//! quadrant, 4..8 the south-west, 8..12 the north-east, 12..16 the south-east.
//!
//! The `q` tiling is offset by one cell south-east of the `p` tiling, so the
//! `q` words of tile `(tx, ty)` cover cells `16 * tx + 1 ..= 16 * tx + 16`.

use bitflags::bitflags;

use super::quiescence::Quiescence;

pub const TILE_SIZE: i32 = 16;
pub const WORDS: usize = 16;

/// One phase's worth of cell bits.
pub type Words = [u16; WORDS];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

impl TileId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which of the two staggered tilings holds the current generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    P,
    Q,
}

impl Phase {
    #[inline]
    pub fn flip(self) -> Phase {
        match self {
            Phase::P => Phase::Q,
            Phase::Q => Phase::P,
        }
    }

    /// Cell offset of this tiling relative to the `p` tiling.
    #[inline]
    pub fn offset(self) -> i32 {
        match self {
            Phase::P => 0,
            Phase::Q => 1,
        }
    }
}

/// The six linked neighbour directions. North-east and south-west are
/// reached through two hops. `y` grows southward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    South = 0,     // (tx, ty+1)
    East = 1,      // (tx+1, ty)
    SouthEast = 2, // (tx+1, ty+1)
    North = 3,     // (tx, ty-1)
    West = 4,      // (tx-1, ty)
    NorthWest = 5, // (tx-1, ty-1)
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::South,
        Direction::East,
        Direction::SouthEast,
        Direction::North,
        Direction::West,
        Direction::NorthWest,
    ];

    #[inline]
    pub const fn offset(self) -> (i16, i16) {
        match self {
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::North => (0, -1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    #[inline]
    pub const fn reverse(self) -> Direction {
        match self {
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::SouthEast => Direction::NorthWest,
            Direction::North => Direction::South,
            Direction::West => Direction::East,
            Direction::NorthWest => Direction::SouthEast,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Tile coordinate one step in this direction. The universe wraps at the
    /// edge of the 16-bit tile range.
    #[inline]
    pub fn step(self, (x, y): (i16, i16)) -> (i16, i16) {
        let (dx, dy) = self.offset();
        (x.wrapping_add(dx), y.wrapping_add(dy))
    }
}

bitflags! {
    /// Per-tile bookkeeping bits.
    ///
    /// `P_*` record that the last pass reading the `p` words skipped the
    /// whole tile (`P_DEAD`: and found it empty); `Q_*` the same for the
    /// pass reading `q`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TileFlags: u16 {
        const DISPLAYED = 0x0001;
        const RATTLED = 0x0800;
        const Q_QUIET = 0x1000;
        const Q_DEAD = 0x2000;
        const P_QUIET = 0x4000;
        const P_DEAD = 0x8000;
        const PHASES = Self::P_DEAD.bits()
            | Self::P_QUIET.bits()
            | Self::Q_DEAD.bits()
            | Self::Q_QUIET.bits();
    }
}

/// Which lifecycle list a tile belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Living,
    Hibernating,
    Morgue,
    /// Slot is on the arena free list.
    Vacant,
}

/// Intrusive doubly-linked list pointers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ListLinks {
    pub next: Option<TileId>,
    pub prev: Option<TileId>,
}

pub type Neighbors = [Option<TileId>; 6];

#[derive(Clone, Debug)]
pub struct Tile {
    pub coord: (i16, i16),
    pub p: Words,
    pub q: Words,
    pub neighbors: Neighbors,
    pub pstate: Quiescence,
    pub qstate: Quiescence,
    pub flags: TileFlags,
    pub lifecycle: Lifecycle,
    pub(crate) life: ListLinks,
    pub(crate) display: ListLinks,
    /// Next tile in the same spatial-index bucket.
    pub(crate) down: Option<TileId>,
}

impl Tile {
    pub fn new(coord: (i16, i16)) -> Self {
        Self {
            coord,
            p: [0; WORDS],
            q: [0; WORDS],
            neighbors: [None; 6],
            pstate: Quiescence::NONE,
            qstate: Quiescence::NONE,
            flags: TileFlags::empty(),
            lifecycle: Lifecycle::Living,
            life: ListLinks::default(),
            display: ListLinks::default(),
            down: None,
        }
    }

    pub(crate) fn vacant() -> Self {
        Self {
            lifecycle: Lifecycle::Vacant,
            ..Self::new((0, 0))
        }
    }

    #[inline]
    pub fn words(&self, phase: Phase) -> &Words {
        match phase {
            Phase::P => &self.p,
            Phase::Q => &self.q,
        }
    }

    #[inline]
    pub fn words_mut(&mut self, phase: Phase) -> &mut Words {
        match phase {
            Phase::P => &mut self.p,
            Phase::Q => &mut self.q,
        }
    }

    #[inline]
    pub fn state(&self, phase: Phase) -> Quiescence {
        match phase {
            Phase::P => self.pstate,
            Phase::Q => self.qstate,
        }
    }

    #[inline]
    pub fn state_mut(&mut self, phase: Phase) -> &mut Quiescence {
        match phase {
            Phase::P => &mut self.pstate,
            Phase::Q => &mut self.qstate,
        }
    }

    #[inline]
    pub fn neighbor(&self, dir: Direction) -> Option<TileId> {
        self.neighbors[dir.index()]
    }

    #[inline]
    pub fn is_vacant(&self) -> bool {
        self.lifecycle == Lifecycle::Vacant
    }

    pub fn has_live(&self, phase: Phase) -> bool {
        self.words(phase).iter().any(|&w| w != 0)
    }

    pub fn population(&self, phase: Phase) -> u32 {
        self.words(phase).iter().map(|w| w.count_ones()).sum()
    }
}

/// Word index and bit mask of local cell `(x, y)`, both in `0..16`.
#[inline]
pub fn cell_bit(x: usize, y: usize) -> (usize, u16) {
    let index = (x & 8) | ((y & 0xc) >> 1) | ((x & 4) >> 2);
    let shift = ((x & 2) << 2) | (y & 2) << 1 | (y & 1) << 1 | (x & 1);
    (index, 0x8000 >> shift)
}

/// Word index holding the 4x4 block whose north-west cell is local `(x, y)`.
#[inline]
pub fn word_index(x: usize, y: usize) -> usize {
    cell_bit(x, y).0
}

/// Local origin of word `index`.
#[inline]
pub fn word_origin(index: usize) -> (usize, usize) {
    ((index & 8) | ((index & 1) << 2), ((index & 4) << 1) | ((index & 2) << 1))
}

/// Calls `f` with the local coordinates of every live cell in `words`.
pub fn for_each_cell(words: &Words, mut f: impl FnMut(usize, usize)) {
    for (index, &word) in words.iter().enumerate() {
        if word == 0 {
            continue;
        }
        let (ox, oy) = word_origin(index);
        let mut bits = word;
        while bits != 0 {
            let shift = bits.leading_zeros() as usize;
            f(ox + ((shift >> 2) & 2) + (shift & 1), oy + ((shift >> 1) & 2) + ((shift >> 1) & 1));
            bits &= !(0x8000 >> shift);
        }
    }
}
