//! Per-quadrant, per-granularity quiescence masks.
//!
//! A tile keeps one 32-bit mask per phase. Byte 3 describes the north-west
//! quadrant, byte 2 the south-west, byte 1 the north-east, byte 0 the
//! south-east. In each byte the low nibble holds hibernation bits (region
//! unchanged since the previous same-phase generation) and the high nibble
//! holds morgue bits (unchanged and empty), one bit per [`Regions`] flag.
//!
//! The corner and strips are the parts the next half step borrows: the
//! south/east edges of a `q` quadrant, the north/west edges of a `p` one.

use bitflags::bitflags;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Quadrant {
    NorthWest = 0,
    SouthWest = 1,
    NorthEast = 2,
    SouthEast = 3,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::SouthWest,
        Quadrant::NorthEast,
        Quadrant::SouthEast,
    ];

    /// Quadrant at grid position `(qx, qy)`, each `0` or `1`.
    #[inline]
    pub fn at(qx: usize, qy: usize) -> Quadrant {
        Quadrant::ALL[(qx << 1) | qy]
    }

    /// Grid position, `(0, 0)` being north-west.
    #[inline]
    pub fn grid(self) -> (usize, usize) {
        ((self as usize) >> 1, (self as usize) & 1)
    }

    /// Local cell coordinate of the north-west corner.
    #[inline]
    pub fn origin(self) -> (i32, i32) {
        let (qx, qy) = self.grid();
        (8 * qx as i32, 8 * qy as i32)
    }

    /// First of the four words covering this quadrant.
    #[inline]
    pub fn first_word(self) -> usize {
        4 * self as usize
    }

    #[inline]
    fn shift(self) -> u32 {
        8 * (3 - self as u32)
    }
}

bitflags! {
    /// Granularities tracked per quadrant.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Regions: u8 {
        /// The 2x2 corner.
        const CORNER = 0x1;
        /// The 8x2 horizontal strip.
        const HSTRIP = 0x2;
        /// The 2x8 vertical strip.
        const VSTRIP = 0x4;
        /// The full 8x8 quadrant.
        const WHOLE = 0x8;
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Quiescence(u32);

impl Quiescence {
    /// Nothing known to be stable.
    pub const NONE: Quiescence = Quiescence(0);
    /// Every region stable and empty. Absent neighbours read as this.
    pub const ALL: Quiescence = Quiescence(u32::MAX);
    /// Every region stable, emptiness unknown.
    pub const HIBERNATING: Quiescence = Quiescence(0x0f0f_0f0f);

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    fn mask(quadrant: Quadrant, regions: Regions, dead: bool) -> u32 {
        let nibble = regions.bits() as u32;
        let byte = if dead { nibble << 4 } else { nibble };
        byte << quadrant.shift()
    }

    /// Every region in `regions` is unchanged.
    #[inline]
    pub fn is_quiet(self, quadrant: Quadrant, regions: Regions) -> bool {
        let m = Self::mask(quadrant, regions, false);
        self.0 & m == m
    }

    /// Every region in `regions` is unchanged and empty.
    #[inline]
    pub fn is_dead(self, quadrant: Quadrant, regions: Regions) -> bool {
        let m = Self::mask(quadrant, regions, true);
        self.0 & m == m
    }

    /// Marks `regions` unchanged, and empty as well when `dead`.
    #[inline]
    pub fn settle(&mut self, quadrant: Quadrant, regions: Regions, dead: bool) {
        self.0 |= Self::mask(quadrant, regions, false);
        if dead {
            self.0 |= Self::mask(quadrant, regions, true);
        }
    }

    /// Forgets both hibernation and morgue bits of `regions`.
    #[inline]
    pub fn unsettle(&mut self, quadrant: Quadrant, regions: Regions) {
        self.0 &= !(Self::mask(quadrant, regions, false) | Self::mask(quadrant, regions, true));
    }

    #[inline]
    pub fn unsettle_quadrant(&mut self, quadrant: Quadrant) {
        self.unsettle(quadrant, Regions::all());
    }

    #[inline]
    pub fn hibernate_all(&mut self) {
        self.0 |= Self::HIBERNATING.0;
    }
}

impl std::fmt::Debug for Quiescence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Quiescence({:#010x})", self.0)
    }
}
