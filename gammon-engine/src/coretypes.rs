//! The fundamental and simple types of `gammon_engine`.

use std::fmt::{self, Display};
use std::mem::replace;
use std::ops::Not;
use std::str::FromStr;

use crate::error::{self, ErrorKind};

///////////////
// Constants //
///////////////
pub const NUM_POINTS: usize = 24; // Playing points 1..24 of a side.
pub const BAR: usize = 24; // Slot holding a side's chequers on the bar.
pub const NUM_SLOTS: usize = NUM_POINTS + 1; // Points plus bar.
pub const NUM_SIDES: usize = 2;

// Number of points in a home board.
pub const HOME_POINTS: usize = 6;

// The most chequers a side may have in any supported variation.
pub const MAX_CHEQUERS: u32 = 15;

// Outputs of a neural net evaluation: win, win gammon, win backgammon,
// lose gammon, lose backgammon.
pub const NUM_OUTPUTS: usize = 5;

// Longest supported match length. Scores and match lengths above this
// are rejected when decoding a Match ID.
pub const MAX_SCORE: u32 = 64;

/////////////////////////
// Data and Structures //
/////////////////////////

/// Type of a single chequer count on a point or the bar.
pub type Chequers = u8;

/// Side identifies one row of a board.
/// `Opponent` is row 0 and `OnRoll` is row 1, from the perspective of the player
/// about to move. Each side counts its points from its own home board.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Side {
    Opponent,
    OnRoll,
}

/// Backgammon variations differ in their starting layout and chequer count.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Variation {
    #[default]
    Standard,
    Nackgammon,
    Hypergammon1,
    Hypergammon2,
    Hypergammon3,
}

/// State of the current game, as packed into a Match ID in 3 bits.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
#[repr(u8)]
pub enum GameState {
    #[default]
    None = 0,
    Playing = 1,
    Over = 2,
    Resigned = 3,
    Drop = 4,
}

/// Holder of the doubling cube.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum CubeOwner {
    #[default]
    Centered,
    Owned(Side),
}

/// Level of a pending resignation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
#[repr(u8)]
pub enum Resignation {
    #[default]
    None = 0,
    Single = 1,
    Gammon = 2,
    Backgammon = 3,
}

//////////////////////
/// Implementations //
//////////////////////

impl Side {
    /// Row of this side in a board.
    #[inline(always)]
    pub const fn index(&self) -> usize {
        match self {
            Side::Opponent => 0,
            Side::OnRoll => 1,
        }
    }

    /// Side from a single bit, 0 is Opponent and 1 is OnRoll.
    pub const fn from_bit(bit: u32) -> Self {
        match bit & 1 {
            0 => Side::Opponent,
            _ => Side::OnRoll,
        }
    }

    pub const fn iter() -> SideIterator {
        SideIterator::new()
    }
}

impl Not for Side {
    type Output = Self;
    fn not(self) -> Self::Output {
        match self {
            Side::Opponent => Side::OnRoll,
            Side::OnRoll => Side::Opponent,
        }
    }
}

impl FromStr for Side {
    type Err = error::Error;
    fn from_str(s: &str) -> error::Result<Self> {
        match s {
            "0" => Ok(Side::Opponent),
            "1" => Ok(Side::OnRoll),
            _ => Err((ErrorKind::ParseSideMalformed, "side is not 0|1").into()),
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

pub struct SideIterator {
    maybe_side: Option<Side>,
}

impl SideIterator {
    pub const fn new() -> Self {
        Self {
            maybe_side: Some(Side::Opponent),
        }
    }
}

impl Iterator for SideIterator {
    type Item = Side;
    fn next(&mut self) -> Option<Self::Item> {
        let value = match self.maybe_side {
            Some(Side::Opponent) => Some(Side::OnRoll),
            Some(Side::OnRoll) | None => None,
        };
        replace(&mut self.maybe_side, value)
    }
}

impl Variation {
    /// Number of chequers each side starts with.
    pub const fn chequers(&self) -> u32 {
        match self {
            Variation::Standard | Variation::Nackgammon => 15,
            Variation::Hypergammon1 => 1,
            Variation::Hypergammon2 => 2,
            Variation::Hypergammon3 => 3,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Variation::Standard => "standard",
            Variation::Nackgammon => "nackgammon",
            Variation::Hypergammon1 => "hypergammon1",
            Variation::Hypergammon2 => "hypergammon2",
            Variation::Hypergammon3 => "hypergammon3",
        }
    }
}

impl FromStr for Variation {
    type Err = error::Error;
    fn from_str(s: &str) -> error::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Variation::Standard),
            "nackgammon" => Ok(Variation::Nackgammon),
            "hypergammon1" => Ok(Variation::Hypergammon1),
            "hypergammon2" => Ok(Variation::Hypergammon2),
            "hypergammon3" | "hypergammon" => Ok(Variation::Hypergammon3),
            _ => Err((ErrorKind::ParseVariationMalformed, s).into()),
        }
    }
}

impl Display for Variation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GameState {
    /// GameState enum variants cover u8 values 0-4 inclusive.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(GameState::None),
            1 => Some(GameState::Playing),
            2 => Some(GameState::Over),
            3 => Some(GameState::Resigned),
            4 => Some(GameState::Drop),
            _ => None,
        }
    }
}

impl CubeOwner {
    /// Two bit code used in a Match ID: 0 and 1 name a side, 3 is centered.
    pub const fn to_bits(&self) -> u32 {
        match self {
            CubeOwner::Owned(side) => side.index() as u32,
            CubeOwner::Centered => 0b11,
        }
    }

    /// Any code other than 0 or 1 means the cube is centered.
    pub const fn from_bits(bits: u32) -> Self {
        match bits {
            0 => CubeOwner::Owned(Side::Opponent),
            1 => CubeOwner::Owned(Side::OnRoll),
            _ => CubeOwner::Centered,
        }
    }
}

impl Resignation {
    pub const fn from_u8(value: u8) -> Self {
        match value & 0b11 {
            0 => Resignation::None,
            1 => Resignation::Single,
            2 => Resignation::Gammon,
            _ => Resignation::Backgammon,
        }
    }
}
