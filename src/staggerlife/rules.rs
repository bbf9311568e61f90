//! Rule strings and the 512-entry neighbourhood table they compile to.
//!
//! A rule is written either survival first (`23/3`) or in the Golly form
//! (`B3/S23`); the order is detected from the `b`/`s` markers. Any digit may
//! be followed by isotropic shape letters (`B2-a/S12`, `B3/S2ae3aijr`), and a
//! trailing parenthesised comment is ignored.
//!
//! Table indices are 9-bit neighbourhoods read row by row from the north-west
//! corner: `0x100` is the north-west neighbour, `0x010` the cell itself and
//! `0x001` the south-east neighbour.

use std::fmt;
use std::str::FromStr;

use crate::error::LifeError;

/// Bit of the cell itself in a 9-bit neighbourhood.
pub const CENTRE: u16 = 0x010;

/// Every neighbour bit, without the centre.
const NEIGHBOURS: u16 = 0x1ef;

/// Shape letters for 1..=4 neighbours. Counts 5..=7 reuse the letters of
/// `8 - n` on the complemented neighbourhood.
const LETTERS: [&str; 4] = ["ce", "ceaikv", "ceaikvjqry", "ceaikvjqrytwz"];

/// One representative neighbourhood per letter, in `LETTERS` order.
const SHAPES: [&[u16]; 4] = [
    &[0o001, 0o002],
    &[0o005, 0o012, 0o003, 0o050, 0o041, 0o104],
    &[0o105, 0o052, 0o013, 0o007, 0o142, 0o015, 0o016, 0o106, 0o051, 0o141],
    &[
        0o505, 0o252, 0o017, 0o055, 0o143, 0o107, 0o152, 0o146, 0o053, 0o145, 0o151, 0o116,
        0o154,
    ],
];

/// Birth/survival table for every 3x3 neighbourhood.
#[derive(Clone, PartialEq, Eq)]
pub struct RuleTable {
    table: [bool; 512],
}

impl RuleTable {
    /// Conway's Life, `B3/S23`.
    pub fn conway() -> Self {
        let mut rule = Self::empty();
        rule.set_totalistic(3, false);
        rule.set_totalistic(2, true);
        rule.set_totalistic(3, true);
        rule
    }

    fn empty() -> Self {
        Self {
            table: [false; 512],
        }
    }

    /// Compiles a rule string. Strings without a `/` separator are rejected,
    /// as is `B0`, which would light up all of empty space.
    pub fn parse(text: &str) -> Result<Self, LifeError> {
        let lowered = text.to_ascii_lowercase();
        let body = match lowered.find('(') {
            Some(at) => &lowered[..at],
            None => lowered.as_str(),
        };
        let (left, right) = body
            .split_once('/')
            .ok_or_else(|| LifeError::rule(text, "missing '/' between the two halves"))?;

        let birth_first = left.contains('b') || right.contains('s');
        let mut rule = Self::empty();
        rule.apply_half(text, left, !birth_first)?;
        rule.apply_half(text, right, birth_first)?;
        Ok(rule)
    }

    fn apply_half(&mut self, text: &str, half: &str, survival: bool) -> Result<(), LifeError> {
        let chars: Vec<char> = half.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let Some(count) = chars[i].to_digit(10) else {
                i += 1;
                continue;
            };
            if count > 8 {
                return Err(LifeError::rule(text, "neighbour counts run from 0 to 8"));
            }
            if count == 0 && !survival {
                return Err(LifeError::rule(text, "B0 rules are not supported"));
            }
            i += 1;

            let mut include = true;
            match chars.get(i) {
                Some('-') => {
                    self.set_totalistic(count, survival);
                    include = false;
                    i += 1;
                }
                Some(c) if c.is_ascii_lowercase() => {}
                _ => self.set_totalistic(count, survival),
            }
            while let Some(&letter) = chars.get(i).filter(|c| c.is_ascii_lowercase()) {
                let shape = shape_for(count, letter)
                    .ok_or_else(|| LifeError::rule(text, "unknown neighbourhood letter"))?;
                self.set_symmetric(shape | if survival { CENTRE } else { 0 }, include);
                i += 1;
            }
        }
        Ok(())
    }

    fn set_totalistic(&mut self, count: u32, survival: bool) {
        let centre = if survival { CENTRE } else { 0 };
        for pattern in 0..512u16 {
            if pattern & CENTRE == 0 && pattern.count_ones() == count {
                self.table[(pattern | centre) as usize] = true;
            }
        }
    }

    fn set_symmetric(&mut self, pattern: u16, value: bool) {
        for image in symmetries(pattern) {
            self.table[image as usize] = value;
        }
    }

    /// Whether the centre cell of `neighbourhood` is alive next generation.
    #[inline(always)]
    pub fn lookup(&self, neighbourhood: u16) -> bool {
        self.table[(neighbourhood & 0x1ff) as usize]
    }

    /// Normalised `B.../S...` form. Parsing it again yields an identical table.
    pub fn canonical(&self) -> String {
        format!("B{}/S{}", self.half_string(false), self.half_string(true))
    }

    fn half_string(&self, survival: bool) -> String {
        let centre = if survival { CENTRE } else { 0 };
        let mut out = String::new();
        for count in 0..=8u32 {
            if count == 0 || count == 8 {
                let pattern = if count == 0 { 0 } else { NEIGHBOURS };
                if self.lookup(pattern | centre) {
                    out.push(char::from(b'0' + count as u8));
                }
                continue;
            }
            let letters = letters_for(count);
            let (present, absent): (String, String) = letters.chars().partition(|&letter| {
                shape_for(count, letter).is_some_and(|shape| self.lookup(shape | centre))
            });
            if present.is_empty() {
                continue;
            }
            out.push(char::from(b'0' + count as u8));
            if absent.is_empty() {
                continue;
            }
            if present.len() <= absent.len() {
                out.push_str(&present);
            } else {
                out.push('-');
                out.push_str(&absent);
            }
        }
        out
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::conway()
    }
}

impl fmt::Display for RuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl fmt::Debug for RuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RuleTable").field(&self.canonical()).finish()
    }
}

impl FromStr for RuleTable {
    type Err = LifeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn letters_for(count: u32) -> &'static str {
    let row = if count <= 4 { count - 1 } else { 7 - count };
    LETTERS[row as usize]
}

/// Neighbour bits (no centre) of the shape `letter` for `count` neighbours.
fn shape_for(count: u32, letter: char) -> Option<u16> {
    if !(1..=7).contains(&count) {
        return None;
    }
    let (row, complement) = if count <= 4 {
        (count - 1, false)
    } else {
        (7 - count, true)
    };
    let at = LETTERS[row as usize].find(letter)?;
    let shape = SHAPES[row as usize][at];
    Some(if complement { shape ^ NEIGHBOURS } else { shape })
}

fn bit(row: usize, col: usize) -> u16 {
    0x100 >> (row * 3 + col)
}

fn remap(pattern: u16, f: impl Fn(usize, usize) -> (usize, usize)) -> u16 {
    let mut out = 0;
    for row in 0..3 {
        for col in 0..3 {
            if pattern & bit(row, col) != 0 {
                let (r, c) = f(row, col);
                out |= bit(r, c);
            }
        }
    }
    out
}

fn rotate(pattern: u16) -> u16 {
    remap(pattern, |row, col| (col, 2 - row))
}

fn flip(pattern: u16) -> u16 {
    remap(pattern, |row, col| (2 - row, col))
}

/// The eight rotations and reflections of `pattern`.
fn symmetries(pattern: u16) -> [u16; 8] {
    let mut out = [0; 8];
    let mut a = pattern;
    let mut b = flip(pattern);
    for i in 0..4 {
        out[2 * i] = a;
        out[2 * i + 1] = b;
        a = rotate(a);
        b = rotate(b);
    }
    out
}
