//! Three-state logic values as seen by static evaluation and simulation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A single bit of a value: driven low, driven high, or not yet known.
///
/// `X` is what every bit of a freshly created signal holds until a driver or
/// a default writes it. Operators propagate it pessimistically, except where
/// a dominating input (`0` for AND, `1` for OR) fixes the result.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Logic {
    /// Logic low.
    Zero = 0,
    /// Logic high.
    One = 1,
    /// Unknown or uninitialized.
    #[default]
    X = 2,
}

impl Logic {
    /// Converts a character to a [`Logic`] value.
    ///
    /// Accepts '0', '1', and 'x'/'X'. The high-impedance marker 'z'/'Z' is
    /// read as unknown since nets here are never tri-stated.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'x' | 'X' | 'z' | 'Z' | 'u' | 'U' => Some(Logic::X),
            _ => None,
        }
    }

    /// Lifts a boolean into a driven logic level.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Logic::One
        } else {
            Logic::Zero
        }
    }

    /// Returns the driven level, or `None` for `X`.
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Logic::Zero => Some(false),
            Logic::One => Some(true),
            Logic::X => None,
        }
    }

    /// Returns `true` for `Zero` and `One`.
    pub fn is_valid(self) -> bool {
        self != Logic::X
    }
}

impl From<bool> for Logic {
    fn from(value: bool) -> Self {
        Logic::from_bool(value)
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::Zero => write!(f, "0"),
            Logic::One => write!(f, "1"),
            Logic::X => write!(f, "X"),
        }
    }
}

/// ```text
///     0  1  X
/// 0 | 0  0  0
/// 1 | 0  1  X
/// X | 0  X  X
/// ```
impl BitAnd for Logic {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (Zero, _) | (_, Zero) => Zero,
            (One, One) => One,
            _ => X,
        }
    }
}

/// ```text
///     0  1  X
/// 0 | 0  1  X
/// 1 | 1  1  1
/// X | X  1  X
/// ```
impl BitOr for Logic {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (One, _) | (_, One) => One,
            (Zero, Zero) => Zero,
            _ => X,
        }
    }
}

impl BitXor for Logic {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        match (self.to_bool(), rhs.to_bool()) {
            (Some(a), Some(b)) => Logic::from_bool(a ^ b),
            _ => Logic::X,
        }
    }
}

impl Not for Logic {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Logic::Zero => Logic::One,
            Logic::One => Logic::Zero,
            Logic::X => Logic::X,
        }
    }
}
