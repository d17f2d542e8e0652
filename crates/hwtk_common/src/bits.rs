//! Packed bit vectors with a separate validity plane.

use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A fixed-width vector of [`Logic`] bits.
///
/// Storage is two parallel bit planes of `u64` words: `val` holds the driven
/// level and `vld` marks which bits are known. A bit with its `vld` bit clear
/// reads as `X`; its `val` bit is always kept at zero so that equality and
/// hashing only see meaningful state. Bit 0 is the least significant bit.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bits {
    width: u32,
    val: Vec<u64>,
    vld: Vec<u64>,
}

const WORD_BITS: u32 = 64;

impl Bits {
    /// Creates a vector of the given width with every bit unknown.
    pub fn new(width: u32) -> Self {
        let words = word_count(width);
        Self {
            width,
            val: vec![0; words],
            vld: vec![0; words],
        }
    }

    /// Creates a vector of the given width with every bit driven low.
    pub fn zeros(width: u32) -> Self {
        Self::from_u64(0, width)
    }

    /// Creates a single-bit vector.
    pub fn from_bool(value: bool) -> Self {
        Self::from_u64(u64::from(value), 1)
    }

    /// Creates a fully valid vector from the low `width` bits of `value`.
    ///
    /// Bits above 64 are zero.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut bits = Self::new(width);
        for (i, word) in bits.vld.iter_mut().enumerate() {
            *word = !0;
            if i == 0 {
                bits.val[0] = value;
            }
        }
        bits.normalize();
        bits
    }

    /// Creates a fully valid vector holding the two's complement of `value`.
    pub fn from_i64(value: i64, width: u32) -> Self {
        let mut bits = Self::from_u64(value as u64, width);
        if value < 0 {
            for word in bits.val.iter_mut().skip(1) {
                *word = !0;
            }
            bits.normalize();
        }
        bits
    }

    /// Parses a binary string, most significant bit first.
    ///
    /// Accepts '0', '1', and the unknown markers understood by
    /// [`Logic::from_char`]. Underscores are ignored.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let digits: Vec<char> = s.chars().filter(|c| *c != '_').collect();
        let mut bits = Self::new(digits.len() as u32);
        for (i, c) in digits.iter().rev().enumerate() {
            bits.set(i as u32, Logic::from_char(*c)?);
        }
        Some(bits)
    }

    /// Returns the number of bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Reads one bit.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Logic {
        assert!(
            index < self.width,
            "bit {index} out of range for width {}",
            self.width
        );
        let (word, mask) = locate(index);
        if self.vld[word] & mask == 0 {
            Logic::X
        } else {
            Logic::from_bool(self.val[word] & mask != 0)
        }
    }

    /// Writes one bit.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        assert!(
            index < self.width,
            "bit {index} out of range for width {}",
            self.width
        );
        let (word, mask) = locate(index);
        match value {
            Logic::X => {
                self.vld[word] &= !mask;
                self.val[word] &= !mask;
            }
            Logic::Zero => {
                self.vld[word] |= mask;
                self.val[word] &= !mask;
            }
            Logic::One => {
                self.vld[word] |= mask;
                self.val[word] |= mask;
            }
        }
    }

    /// Returns the validity plane of the low 64 bits.
    pub fn vld_mask(&self) -> u64 {
        self.vld.first().copied().unwrap_or(0)
    }

    /// Returns `true` when every bit is known.
    pub fn is_fully_valid(&self) -> bool {
        (0..self.vld.len()).all(|i| self.vld[i] == self.word_mask(i))
    }

    /// Returns `true` when no bit is known.
    pub fn is_fully_invalid(&self) -> bool {
        self.vld.iter().all(|w| *w == 0)
    }

    /// Returns the unsigned value if every bit is known and it fits in 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        if !self.is_fully_valid() || self.val.iter().skip(1).any(|w| *w != 0) {
            return None;
        }
        Some(self.val.first().copied().unwrap_or(0))
    }

    /// Returns the value read as two's complement, sign-extended to 64 bits.
    pub fn to_i64(&self) -> Option<i64> {
        if !self.is_fully_valid() || self.width == 0 {
            return None;
        }
        if self.width > WORD_BITS {
            return self.to_u64().map(|v| v as i64);
        }
        let raw = self.val[0];
        let shift = WORD_BITS - self.width;
        Some(((raw << shift) as i64) >> shift)
    }

    /// Joins two vectors; `self` supplies the most significant bits.
    pub fn concat(&self, low: &Bits) -> Bits {
        let mut out = Bits::new(self.width + low.width);
        for i in 0..low.width {
            out.set(i, low.get(i));
        }
        for i in 0..self.width {
            out.set(low.width + i, self.get(i));
        }
        out
    }

    /// Extracts bits `hi` down to `lo`, both inclusive.
    ///
    /// Returns `None` when the range is reversed or out of bounds.
    pub fn slice(&self, hi: u32, lo: u32) -> Option<Bits> {
        if hi < lo || hi >= self.width {
            return None;
        }
        let mut out = Bits::new(hi - lo + 1);
        for i in lo..=hi {
            out.set(i - lo, self.get(i));
        }
        Some(out)
    }

    /// Copies `part` into this vector starting at bit `lo`.
    ///
    /// Returns `false` without modifying anything if `part` does not fit.
    pub fn splice(&mut self, lo: u32, part: &Bits) -> bool {
        if lo + part.width > self.width {
            return false;
        }
        for i in 0..part.width {
            self.set(lo + i, part.get(i));
        }
        true
    }

    fn word_mask(&self, word: usize) -> u64 {
        let full = (self.width / WORD_BITS) as usize;
        if word < full {
            !0
        } else {
            let rem = self.width % WORD_BITS;
            if rem == 0 {
                0
            } else {
                (1u64 << rem) - 1
            }
        }
    }

    fn normalize(&mut self) {
        for i in 0..self.vld.len() {
            let mask = self.word_mask(i);
            self.vld[i] &= mask;
            self.val[i] &= self.vld[i];
        }
    }

    fn planes(&self, rhs: &Bits, op: &str) -> Bits {
        assert_eq!(self.width, rhs.width, "bit width mismatch in {op}");
        Bits::new(self.width)
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bits({self})")
    }
}

impl BitAnd for &Bits {
    type Output = Bits;

    fn bitand(self, rhs: Self) -> Bits {
        let mut out = self.planes(rhs, "AND");
        for i in 0..out.val.len() {
            let zero_a = self.vld[i] & !self.val[i];
            let zero_b = rhs.vld[i] & !rhs.val[i];
            let ones = self.val[i] & rhs.val[i];
            out.vld[i] = zero_a | zero_b | ones;
            out.val[i] = ones;
        }
        out.normalize();
        out
    }
}

impl BitOr for &Bits {
    type Output = Bits;

    fn bitor(self, rhs: Self) -> Bits {
        let mut out = self.planes(rhs, "OR");
        for i in 0..out.val.len() {
            let ones = self.val[i] | rhs.val[i];
            let zeros = (self.vld[i] & !self.val[i]) & (rhs.vld[i] & !rhs.val[i]);
            out.vld[i] = ones | zeros;
            out.val[i] = ones;
        }
        out.normalize();
        out
    }
}

impl BitXor for &Bits {
    type Output = Bits;

    fn bitxor(self, rhs: Self) -> Bits {
        let mut out = self.planes(rhs, "XOR");
        for i in 0..out.val.len() {
            out.vld[i] = self.vld[i] & rhs.vld[i];
            out.val[i] = self.val[i] ^ rhs.val[i];
        }
        out.normalize();
        out
    }
}

impl Not for &Bits {
    type Output = Bits;

    fn not(self) -> Bits {
        let mut out = Bits::new(self.width);
        for i in 0..out.val.len() {
            out.vld[i] = self.vld[i];
            out.val[i] = !self.val[i];
        }
        out.normalize();
        out
    }
}

fn word_count(width: u32) -> usize {
    width.div_ceil(WORD_BITS) as usize
}

fn locate(index: u32) -> (usize, u64) {
    ((index / WORD_BITS) as usize, 1u64 << (index % WORD_BITS))
}
