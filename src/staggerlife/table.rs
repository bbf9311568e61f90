//! Transition tables: a 4x4 window of cells to its 2x2 next-generation core.
//!
//! A 16-bit window index is read four ways at once. Besides the plain 4x4
//! block, the pass may assemble a window from the halves of two or four
//! neighbouring words without shifting any bits, which leaves its columns
//! and/or rows swapped by two. Each table entry holds the 2x2 result of all
//! four readings, each in the nibble where that result lands in the output
//! word, so a single mask picks the one the caller assembled.

use rayon::prelude::*;

use super::rules::RuleTable;
use super::tile::{Phase, cell_bit};

const ENTRIES: usize = 1 << 16;
const CHUNK: usize = 4096;

/// A half step between the two tilings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sweep {
    /// `p` to `q`: reads the tile and its east, south and south-east neighbours.
    Forward,
    /// `q` to `p`: reads the tile and its west, north and north-west neighbours.
    Backward,
}

impl Sweep {
    /// The sweep that advances a universe whose current tiling is `phase`.
    #[inline]
    pub fn from_phase(phase: Phase) -> Sweep {
        match phase {
            Phase::P => Sweep::Forward,
            Phase::Q => Sweep::Backward,
        }
    }

    #[inline]
    pub fn source(self) -> Phase {
        match self {
            Sweep::Forward => Phase::P,
            Sweep::Backward => Phase::Q,
        }
    }

    #[inline]
    pub fn target(self) -> Phase {
        self.source().flip()
    }

    /// Nibble shift of the result for a window swapped by `sx` columns
    /// and `sy` rows.
    #[inline]
    fn nibble_shift(self, sx: usize, sy: usize) -> u32 {
        let slot = (2 * sx + sy) as u32;
        match self {
            Sweep::Forward => 12 - 4 * slot,
            Sweep::Backward => 4 * slot,
        }
    }
}

pub struct TransitionTables {
    forward: Box<[u16]>,
    backward: Box<[u16]>,
}

impl TransitionTables {
    /// Builds both tables, in parallel.
    pub fn build(rule: &RuleTable) -> Self {
        let (forward, backward) = rayon::join(
            || build_table(rule, Sweep::Forward),
            || build_table(rule, Sweep::Backward),
        );
        Self { forward, backward }
    }

    #[inline(always)]
    pub fn lookup(&self, sweep: Sweep, window: u16) -> u16 {
        match sweep {
            Sweep::Forward => self.forward[window as usize],
            Sweep::Backward => self.backward[window as usize],
        }
    }

    /// Computes one output word from the 2x2 block of source words around
    /// it, given as `[nw, ne, sw, se]`.
    ///
    /// Going forward the output word sits on the north-west source word and
    /// its windows reach east and south; going backward it sits on the
    /// south-east one and its windows reach west and north.
    #[inline(always)]
    pub fn advance(&self, sweep: Sweep, group: [u16; 4]) -> u16 {
        let [nw, ne, sw, se] = group;
        let both = (nw & 0x000f) | (ne & 0x0f00) | (sw & 0x00f0) | (se & 0xf000);
        match sweep {
            Sweep::Forward => {
                let t = &self.forward;
                let rows = (nw & 0x0f0f) | (sw & 0xf0f0);
                let cols = (nw & 0x00ff) | (ne & 0xff00);
                (t[nw as usize] & 0xf000)
                    | (t[rows as usize] & 0x0f00)
                    | (t[cols as usize] & 0x00f0)
                    | (t[both as usize] & 0x000f)
            }
            Sweep::Backward => {
                let t = &self.backward;
                let rows = (ne & 0x0f0f) | (se & 0xf0f0);
                let cols = (sw & 0x00ff) | (se & 0xff00);
                (t[se as usize] & 0x000f)
                    | (t[rows as usize] & 0x00f0)
                    | (t[cols as usize] & 0x0f00)
                    | (t[both as usize] & 0xf000)
            }
        }
    }
}

fn build_table(rule: &RuleTable, sweep: Sweep) -> Box<[u16]> {
    let mut table = vec![0u16; ENTRIES];
    table
        .par_chunks_mut(CHUNK)
        .enumerate()
        .for_each(|(chunk, entries)| {
            for (offset, entry) in entries.iter_mut().enumerate() {
                *entry = entry_for(rule, sweep, (chunk * CHUNK + offset) as u16);
            }
        });
    table.into_boxed_slice()
}

fn entry_for(rule: &RuleTable, sweep: Sweep, window: u16) -> u16 {
    let mut out = 0;
    for sx in 0..2 {
        for sy in 0..2 {
            out |= core_2x2(rule, window, sx, sy) << sweep.nibble_shift(sx, sy);
        }
    }
    out
}

/// The next state of the inner 2x2 of `window`, read with its columns
/// swapped by two when `sx == 1` and its rows when `sy == 1`.
fn core_2x2(rule: &RuleTable, window: u16, sx: usize, sy: usize) -> u16 {
    let alive = |x: usize, y: usize| {
        let (_, mask) = cell_bit(x ^ (2 * sx), y ^ (2 * sy));
        window & mask != 0
    };
    let mut nibble = 0;
    for (x, y, bit) in [(1, 1, 8), (2, 1, 4), (1, 2, 2), (2, 2, 1)] {
        let mut neighbourhood = 0u16;
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                neighbourhood = (neighbourhood << 1) | alive(nx, ny) as u16;
            }
        }
        if rule.lookup(neighbourhood) {
            nibble |= bit;
        }
    }
    nibble
}
