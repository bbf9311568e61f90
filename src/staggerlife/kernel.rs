//! Per-quadrant half step for a single tile.
//!
//! A sweep reads the tile plus the three neighbours on its leading side
//! (east/south/south-east going forward, west/north/north-west going
//! backward) and writes the tile's other phase. Work is done one 8x8
//! quadrant at a time so unchanged quadrants can be skipped, and so changes
//! can be traced to the exact strip or corner a neighbour borrows.

use super::arena::TileArena;
use super::quiescence::{Quadrant, Quiescence, Regions};
use super::table::{Sweep, TransitionTables};
use super::tile::{Direction, TileId, WORDS, Words, word_index};

impl Sweep {
    /// Neighbours read by this sweep: horizontal, vertical, diagonal.
    #[inline]
    pub(crate) fn borrowed(self) -> [Direction; 3] {
        match self {
            Sweep::Forward => [Direction::East, Direction::South, Direction::SouthEast],
            Sweep::Backward => [Direction::West, Direction::North, Direction::NorthWest],
        }
    }

    /// Quadrant-grid step toward the borrowed neighbours.
    #[inline]
    fn lead(self) -> i32 {
        match self {
            Sweep::Forward => 1,
            Sweep::Backward => -1,
        }
    }

    /// Per-word masks of the borrowed edges of an output quadrant, words in
    /// `[nw, ne, sw, se]` order.
    #[inline]
    fn edges(self) -> Edges {
        match self {
            Sweep::Forward => Edges {
                corner: [0, 0, 0, 0x000f],
                hstrip: [0, 0, 0x0f0f, 0x0f0f],
                vstrip: [0, 0x00ff, 0, 0x00ff],
            },
            Sweep::Backward => Edges {
                corner: [0xf000, 0, 0, 0],
                hstrip: [0xf0f0, 0xf0f0, 0, 0],
                vstrip: [0xff00, 0, 0xff00, 0],
            },
        }
    }

    /// Whether `quadrant` touches the borrowed side horizontally and vertically.
    #[inline]
    fn leading(self, quadrant: Quadrant) -> (bool, bool) {
        let (qx, qy) = quadrant.grid();
        let edge = match self {
            Sweep::Forward => 1,
            Sweep::Backward => 0,
        };
        (qx == edge, qy == edge)
    }
}

struct Edges {
    corner: [u16; 4],
    hstrip: [u16; 4],
    vstrip: [u16; 4],
}

/// Source words and quiescence of a tile and its three borrowed neighbours,
/// in `[tile, horizontal, vertical, diagonal]` order. Missing neighbours read
/// as empty and fully settled.
pub(crate) struct Hood {
    words: [Words; 4],
    states: [Quiescence; 4],
}

impl Hood {
    pub fn gather(arena: &TileArena, id: TileId, sweep: Sweep) -> Self {
        let source = sweep.source();
        let tile = arena.tile(id);
        let mut words = [[0; WORDS]; 4];
        let mut states = [Quiescence::ALL; 4];
        words[0] = *tile.words(source);
        states[0] = tile.state(source);
        for (slot, dir) in sweep.borrowed().into_iter().enumerate() {
            if let Some(neighbor) = tile.neighbor(dir) {
                let neighbor = arena.tile(neighbor);
                words[slot + 1] = *neighbor.words(source);
                states[slot + 1] = neighbor.state(source);
            }
        }
        Self { words, states }
    }

    /// Source word whose north-west cell is at tile-local `(x, y)`, where
    /// coordinates just outside `0..16` fall in the borrowed neighbours.
    #[inline(always)]
    fn word(&self, x: i32, y: i32) -> u16 {
        let tx = !(0..16).contains(&x) as usize;
        let ty = !(0..16).contains(&y) as usize;
        let index = word_index(x.rem_euclid(16) as usize, y.rem_euclid(16) as usize);
        self.words[tx + 2 * ty][index]
    }

    #[inline]
    fn quadrant_state(&self, qx: i32, qy: i32) -> (Quiescence, Quadrant) {
        let tx = !(0..2).contains(&qx) as usize;
        let ty = !(0..2).contains(&qy) as usize;
        let quadrant = Quadrant::at(qx.rem_euclid(2) as usize, qy.rem_euclid(2) as usize);
        (self.states[tx + 2 * ty], quadrant)
    }

    /// Whether every input of `quadrant`'s output is unchanged (and, when
    /// `dead`, empty): the quadrant itself, the neighbouring strips and the
    /// diagonal corner the windows reach into.
    pub fn quadrant_settled(&self, sweep: Sweep, quadrant: Quadrant, dead: bool) -> bool {
        let (qx, qy) = quadrant.grid();
        let (qx, qy) = (qx as i32, qy as i32);
        let s = sweep.lead();
        [
            (0, 0, Regions::WHOLE),
            (s, 0, Regions::VSTRIP),
            (0, s, Regions::HSTRIP),
            (s, s, Regions::CORNER),
        ]
        .into_iter()
        .all(|(dx, dy, regions)| {
            let (state, at) = self.quadrant_state(qx + dx, qy + dy);
            if dead {
                state.is_dead(at, regions)
            } else {
                state.is_quiet(at, regions)
            }
        })
    }

    pub fn tile_settled(&self, sweep: Sweep, dead: bool) -> bool {
        Quadrant::ALL
            .into_iter()
            .all(|quadrant| self.quadrant_settled(sweep, quadrant, dead))
    }
}

/// Computes the four output words of `quadrant`, in storage order.
pub(crate) fn advance_quadrant(
    tables: &TransitionTables,
    sweep: Sweep,
    hood: &Hood,
    quadrant: Quadrant,
) -> [u16; 4] {
    let (ox, oy) = quadrant.origin();
    // Going backward the source block sits north-west of the output word.
    let back = match sweep {
        Sweep::Forward => 0,
        Sweep::Backward => -4,
    };
    let mut out = [0u16; 4];
    for (i, word) in out.iter_mut().enumerate() {
        let x = ox + 4 * (i as i32 & 1) + back;
        let y = oy + 4 * (i as i32 >> 1) + back;
        let group = [
            hood.word(x, y),
            hood.word(x + 4, y),
            hood.word(x, y + 4),
            hood.word(x + 4, y + 4),
        ];
        *word = tables.advance(sweep, group);
    }
    out
}

/// Regions of an output quadrant holding at least one set bit.
pub(crate) fn touched(sweep: Sweep, words: &[u16; 4]) -> Regions {
    let edges = sweep.edges();
    let any = |mask: &[u16; 4]| words.iter().zip(mask).any(|(w, m)| w & m != 0);
    let mut regions = Regions::empty();
    if any(&edges.corner) {
        regions |= Regions::CORNER;
    }
    if any(&edges.hstrip) {
        regions |= Regions::HSTRIP;
    }
    if any(&edges.vstrip) {
        regions |= Regions::VSTRIP;
    }
    if words.iter().any(|&w| w != 0) {
        regions |= Regions::WHOLE;
    }
    regions
}

/// Borrowed neighbours that must be rattled after a quadrant update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Wake {
    pub horizontal: bool,
    pub vertical: bool,
    pub diagonal: bool,
}

impl Wake {
    pub fn directions(self, sweep: Sweep) -> impl Iterator<Item = Direction> {
        let [h, v, d] = sweep.borrowed();
        [(self.horizontal, h), (self.vertical, v), (self.diagonal, d)]
            .into_iter()
            .filter_map(|(wake, dir)| wake.then_some(dir))
    }
}

/// Updates `state` for a freshly computed quadrant. `changed` holds the
/// regions that differ from the previous same-phase generation and `live`
/// the regions that are not empty.
pub(crate) fn record(
    state: &mut Quiescence,
    sweep: Sweep,
    quadrant: Quadrant,
    changed: Regions,
    live: Regions,
) -> Wake {
    let (lead_x, lead_y) = sweep.leading(quadrant);
    if changed.contains(Regions::CORNER) {
        state.unsettle_quadrant(quadrant);
        return Wake {
            horizontal: lead_x,
            vertical: lead_y,
            diagonal: lead_x && lead_y,
        };
    }

    let mut wake = Wake::default();
    state.settle(quadrant, Regions::CORNER, !live.contains(Regions::CORNER));
    if changed.contains(Regions::HSTRIP) {
        state.unsettle(quadrant, Regions::HSTRIP | Regions::WHOLE);
        wake.vertical = lead_y;
    } else {
        state.settle(quadrant, Regions::HSTRIP, !live.contains(Regions::HSTRIP));
    }
    if changed.contains(Regions::VSTRIP) {
        state.unsettle(quadrant, Regions::VSTRIP | Regions::WHOLE);
        wake.horizontal = lead_x;
    } else {
        state.settle(quadrant, Regions::VSTRIP, !live.contains(Regions::VSTRIP));
        if changed.contains(Regions::WHOLE) {
            state.unsettle(quadrant, Regions::WHOLE);
        } else {
            state.settle(quadrant, Regions::WHOLE, !live.contains(Regions::WHOLE));
        }
    }
    wake
}

/// Marks a skipped quadrant as unchanged; emptiness is read off its current
/// words.
pub(crate) fn settle_skipped(state: &mut Quiescence, quadrant: Quadrant, live: Regions) {
    state.settle(quadrant, Regions::all(), false);
    for region in [Regions::CORNER, Regions::HSTRIP, Regions::VSTRIP, Regions::WHOLE] {
        if !live.contains(region) {
            state.settle(quadrant, region, true);
        }
    }
}
