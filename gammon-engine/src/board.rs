//! Holds Board struct, the position representation every key and ID is built from.
//!
//! A Board is a 2x25 grid of chequer counts. Each row belongs to one Side and is
//! indexed from that side's own perspective: slot `i` in 0..24 is point `i + 1`,
//! slot 24 is the bar. Point `i` of one side is point `23 - i` of the other.

use std::fmt::{self, Display};
use std::ops::{Index, IndexMut};

use rand::Rng;

use crate::coretypes::{Chequers, Side, Variation};
use crate::coretypes::{BAR, HOME_POINTS, MAX_CHEQUERS, NUM_POINTS, NUM_SIDES, NUM_SLOTS};
use crate::positionid::PositionId;

/// Type of one side's row of a Board.
pub type Row = [Chequers; NUM_SLOTS];

/// struct Board
/// Chequer counts for both sides, points 1..24 plus the bar.
/// Boards are small and `Copy`, and are never shared between threads by reference.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Board {
    pub(crate) grid: [Row; NUM_SIDES],
}

impl Board {
    /// A board with no chequers on it.
    pub const fn empty() -> Self {
        Self {
            grid: [[0; NUM_SLOTS]; NUM_SIDES],
        }
    }

    /// Create a Board directly from raw rows, `grid[0]` for Opponent and `grid[1]` for OnRoll.
    pub const fn from_array(grid: [Row; NUM_SIDES]) -> Self {
        Self { grid }
    }

    /// Starting layout of a variation, identical for both sides.
    pub fn start_position(variation: Variation) -> Self {
        let mut board = Self::empty();

        for row in board.grid.iter_mut() {
            match variation {
                Variation::Standard | Variation::Nackgammon => {
                    let (midpoint, six_point) = match variation {
                        Variation::Nackgammon => (4, 4),
                        _ => (5, 5),
                    };
                    row[5] = six_point;
                    row[7] = 3;
                    row[12] = midpoint;
                    row[23] = 2;
                    if variation == Variation::Nackgammon {
                        row[22] = 2;
                    }
                }
                Variation::Hypergammon1 | Variation::Hypergammon2 | Variation::Hypergammon3 => {
                    for point in 0..variation.chequers() as usize {
                        row[NUM_POINTS - 1 - point] = 1;
                    }
                }
            }
        }

        board
    }

    /// Const getter for the raw grid.
    pub fn grid(&self) -> &[Row; NUM_SIDES] {
        &self.grid
    }

    /// Total chequers of a side still in play, points plus bar.
    pub fn chequers(&self, side: Side) -> u32 {
        self[side].iter().map(|&count| u32::from(count)).sum()
    }

    /// Pip count of a side. A chequer on point `n` needs `n` pips, the bar counts as 25.
    pub fn pip_count(&self, side: Side) -> u32 {
        self[side]
            .iter()
            .enumerate()
            .map(|(slot, &count)| (slot as u32 + 1) * u32::from(count))
            .sum()
    }

    /// Exchange the rows of both sides, in place.
    pub fn swap_sides(&mut self) {
        self.grid.swap(0, 1);
    }

    /// Returns a copy of self with both sides exchanged.
    pub fn swapped(&self) -> Self {
        let mut board = *self;
        board.swap_sides();
        board
    }

    /// Returns true if both sides hold every point of their home board with 2 or more chequers.
    fn home_boards_closed(&self) -> bool {
        (0..HOME_POINTS).all(|point| self.grid[0][point] >= 2 && self.grid[1][point] >= 2)
    }

    /// Returns true if the Board can occur in a game:
    /// * Neither side has more than 15 chequers.
    /// * No point is occupied by both sides.
    /// * Both sides are not stuck on the bar against each other's closed board.
    pub fn is_legal(&self) -> bool {
        if Side::iter().any(|side| self.chequers(side) > MAX_CHEQUERS) {
            return false;
        }

        let overlapping = (0..NUM_POINTS)
            .any(|point| self.grid[0][point] > 0 && self.grid[1][NUM_POINTS - 1 - point] > 0);
        if overlapping {
            return false;
        }

        !(self.home_boards_closed() && self.grid[0][BAR] > 0 && self.grid[1][BAR] > 0)
    }

    /// Normalize self into a legal Board, in place.
    /// This is a deterministic canonical fallback, not a reconstruction of any intended board:
    /// 1. Chequers past the 15th of a side are dropped, scanning from point 1 to the bar.
    /// 2. OnRoll loses every point that Opponent also occupies.
    /// 3. If both home boards are closed and Opponent is on the bar, OnRoll leaves the bar.
    pub fn make_closest_legal(&mut self) {
        for row in self.grid.iter_mut() {
            let mut remaining = MAX_CHEQUERS;
            for count in row.iter_mut() {
                let wanted = u32::from(*count);
                if wanted <= remaining {
                    remaining -= wanted;
                } else {
                    *count = remaining as Chequers;
                    remaining = 0;
                }
            }
        }

        for point in 0..NUM_POINTS {
            if self.grid[0][point] > 0 {
                self.grid[1][NUM_POINTS - 1 - point] = 0;
            }
        }

        if self.home_boards_closed() && self.grid[0][BAR] > 0 {
            self.grid[1][BAR] = 0;
        }
    }

    /// Returns the closest legal Board to self.
    pub fn closest_legal(&self) -> Self {
        let mut board = *self;
        board.make_closest_legal();
        board
    }

    /// Generate a random legal Board with at most `variation.chequers()` chequers per side.
    /// Each chequer lands on a random point, the bar, or is borne off.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, variation: Variation) -> Self {
        let mut board = Self::empty();

        for side in Side::iter() {
            for _ in 0..variation.chequers() {
                loop {
                    // NUM_SLOTS stands for a chequer already borne off.
                    let slot = rng.gen_range(0..=NUM_SLOTS);
                    if slot == NUM_SLOTS {
                        break;
                    }
                    if slot < NUM_POINTS && board[!side][NUM_POINTS - 1 - slot] > 0 {
                        continue;
                    }
                    board[side][slot] += 1;
                    break;
                }
            }
        }

        board.make_closest_legal();
        board
    }

    /// Returns a plain text table of chequer counts, one line per side.
    pub fn pretty(&self) -> String {
        let mut pretty = String::with_capacity(256);

        pretty.push_str("       ");
        for point in 1..=NUM_POINTS {
            pretty.push_str(&format!("{point:>3}"));
        }
        pretty.push_str("  bar\n");

        for side in Side::iter() {
            pretty.push_str(&format!("side {side}"));
            pretty.push_str("  ");
            for &count in &self[side][..NUM_POINTS] {
                match count {
                    0 => pretty.push_str("  ."),
                    n => pretty.push_str(&format!("{n:>3}")),
                }
            }
            pretty.push_str(&format!("{:>5}\n", self[side][BAR]));
        }

        pretty
    }
}

impl Index<Side> for Board {
    type Output = Row;
    fn index(&self, side: Side) -> &Self::Output {
        &self.grid[side.index()]
    }
}

impl IndexMut<Side> for Board {
    fn index_mut(&mut self, side: Side) -> &mut Self::Output {
        &mut self.grid[side.index()]
    }
}

/// Be careful with accessing with usize, as a slot out of bounds will panic.
impl Index<(Side, usize)> for Board {
    type Output = Chequers;
    fn index(&self, (side, slot): (Side, usize)) -> &Self::Output {
        &self.grid[side.index()][slot]
    }
}

impl IndexMut<(Side, usize)> for Board {
    fn index_mut(&mut self, (side, slot): (Side, usize)) -> &mut Self::Output {
        &mut self.grid[side.index()][slot]
    }
}

/// Displays chequer counts and the Position ID representing Board.
impl Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\n Position ID: {}\n", self.pretty(), self.to_position_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn pretty_print_board() {
        let start = Board::start_position(Variation::Standard);
        println!("{}", start);
    }

    #[test]
    fn start_positions_have_variation_chequers() {
        for variation in [
            Variation::Standard,
            Variation::Nackgammon,
            Variation::Hypergammon1,
            Variation::Hypergammon2,
            Variation::Hypergammon3,
        ] {
            let board = Board::start_position(variation);
            assert!(board.is_legal());
            for side in Side::iter() {
                assert_eq!(board.chequers(side), variation.chequers());
            }
        }
        assert_eq!(
            Board::start_position(Variation::Standard).pip_count(Side::OnRoll),
            167
        );
    }

    #[test]
    fn swap_sides_twice_is_identity() {
        let mut board = Board::start_position(Variation::Nackgammon);
        board[(Side::OnRoll, BAR)] = 1;
        board[(Side::OnRoll, 5)] -= 1;

        let swapped = board.swapped();
        assert_eq!(swapped[Side::Opponent], board[Side::OnRoll]);
        assert_eq!(swapped.swapped(), board);
    }

    #[test]
    fn illegal_boards_detected() {
        // Too many chequers.
        let mut crowded = Board::start_position(Variation::Standard);
        crowded[(Side::Opponent, BAR)] = 1;
        assert!(!crowded.is_legal());

        // Both sides on the same point: point 0 of one side is point 23 of the other.
        let mut shared = Board::empty();
        shared[(Side::Opponent, 0)] = 1;
        shared[(Side::OnRoll, 23)] = 1;
        assert!(!shared.is_legal());

        // Both sides on the bar against closed boards.
        let mut stuck = Board::empty();
        for side in Side::iter() {
            for point in 0..HOME_POINTS {
                stuck[(side, point)] = 2;
            }
            stuck[(side, BAR)] = 1;
        }
        assert!(!stuck.is_legal());

        stuck[(Side::OnRoll, BAR)] = 0;
        assert!(stuck.is_legal());
    }

    #[test]
    fn closest_legal_is_legal_and_idempotent() {
        let mut board = Board::empty();
        board[(Side::Opponent, 3)] = 12;
        board[(Side::Opponent, 10)] = 7;
        board[(Side::OnRoll, 20)] = 4;
        board[(Side::OnRoll, 14)] = 2;

        let closest = board.closest_legal();
        assert!(closest.is_legal());
        assert_eq!(closest[(Side::Opponent, 10)], 3);
        // Opponent's point 3 is OnRoll's point 20.
        assert_eq!(closest[(Side::OnRoll, 20)], 0);
        assert_eq!(closest[(Side::OnRoll, 14)], 2);
        assert_eq!(closest.closest_legal(), closest);
    }

    #[test]
    fn closest_legal_frees_the_bar() {
        let mut stuck = Board::empty();
        for side in Side::iter() {
            for point in 0..HOME_POINTS {
                stuck[(side, point)] = 2;
            }
            stuck[(side, BAR)] = 1;
        }
        let closest = stuck.closest_legal();
        assert!(closest.is_legal());
        assert_eq!(closest[(Side::Opponent, BAR)], 1);
        assert_eq!(closest[(Side::OnRoll, BAR)], 0);
    }

    #[test]
    fn random_boards_are_legal() {
        let mut rng = StdRng::seed_from_u64(0xb0a4d);
        for _ in 0..1000 {
            let board = Board::random(&mut rng, Variation::Standard);
            assert!(board.is_legal(), "{board:?}");
        }
    }
}
