//! Compact board keys.
//!
//! PackedKey is the canonical key used for hashing and cache lookups.
//! OldKey is the 10 byte unary key that Position IDs are the base64 form of.

use crate::board::{Board, Row};
use crate::coretypes::{Chequers, Side, BAR, NUM_POINTS, NUM_SIDES, NUM_SLOTS};
use crate::error::{self, ErrorKind};

/// Nibbles held by a single key word.
const POINTS_PER_WORD: usize = 8;
/// Words holding the 24 points of one side.
const WORDS_PER_SIDE: usize = NUM_POINTS / POINTS_PER_WORD;

/// PackedKey stores one 4 bit count per slot of a Board.
///
/// * Words 0..3 hold OnRoll's points, 8 nibbles per word, low nibble first.
/// * Words 3..6 hold Opponent's points the same way.
/// * Word 6 holds Opponent's bar in bits 0..4 and OnRoll's bar in bits 4..8.
///
/// Counts above 15 do not fit a nibble and are truncated.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PackedKey {
    pub(crate) data: [u32; PackedKey::WORDS],
}

impl PackedKey {
    pub const WORDS: usize = 7;

    /// First word of a key that no Board can produce.
    pub const INVALID_WORD: u32 = u32::MAX;

    /// A key never equal to the key of any Board with at most 15 chequers per side.
    pub const EMPTY: PackedKey = PackedKey {
        data: [Self::INVALID_WORD, 0, 0, 0, 0, 0, 0],
    };

    pub const fn from_words(data: [u32; Self::WORDS]) -> Self {
        Self { data }
    }

    pub const fn words(&self) -> &[u32; Self::WORDS] {
        &self.data
    }

    /// Returns true unless the key carries the invalid first word.
    pub const fn is_valid(&self) -> bool {
        self.data[0] != Self::INVALID_WORD
    }

    /// Mark this key as matching no Board, touching only the first word.
    pub fn invalidate(&mut self) {
        self.data[0] = Self::INVALID_WORD;
    }

    /// Decode into a Board.
    pub fn to_board(&self) -> Board {
        let mut board = Board::empty();
        unpack_side(&self.data[..WORDS_PER_SIDE], &mut board[Side::OnRoll]);
        unpack_side(&self.data[WORDS_PER_SIDE..2 * WORDS_PER_SIDE], &mut board[Side::Opponent]);
        board[(Side::Opponent, BAR)] = (self.data[6] & 0x0f) as Chequers;
        board[(Side::OnRoll, BAR)] = ((self.data[6] >> 4) & 0x0f) as Chequers;
        board
    }

    /// Decode into a Board with the rows exchanged, same as `to_board().swapped()`.
    pub fn to_board_swapped(&self) -> Board {
        let mut board = Board::empty();
        unpack_side(&self.data[..WORDS_PER_SIDE], &mut board[Side::Opponent]);
        unpack_side(&self.data[WORDS_PER_SIDE..2 * WORDS_PER_SIDE], &mut board[Side::OnRoll]);
        board[(Side::OnRoll, BAR)] = (self.data[6] & 0x0f) as Chequers;
        board[(Side::Opponent, BAR)] = ((self.data[6] >> 4) & 0x0f) as Chequers;
        board
    }
}

impl Default for PackedKey {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<&Board> for PackedKey {
    fn from(board: &Board) -> Self {
        let mut data = [0u32; Self::WORDS];
        pack_side(&board[Side::OnRoll], &mut data[..WORDS_PER_SIDE]);
        pack_side(&board[Side::Opponent], &mut data[WORDS_PER_SIDE..2 * WORDS_PER_SIDE]);
        data[6] = nibble(board[(Side::Opponent, BAR)]) | nibble(board[(Side::OnRoll, BAR)]) << 4;
        Self { data }
    }
}

impl From<Board> for PackedKey {
    fn from(board: Board) -> Self {
        Self::from(&board)
    }
}

#[inline(always)]
fn nibble(count: Chequers) -> u32 {
    debug_assert!(count <= 0x0f, "{count} chequers do not fit a key nibble");
    u32::from(count) & 0x0f
}

fn pack_side(row: &Row, words: &mut [u32]) {
    for (word, points) in words.iter_mut().zip(row[..NUM_POINTS].chunks(POINTS_PER_WORD)) {
        *word = points
            .iter()
            .enumerate()
            .fold(0, |acc, (shift, &count)| acc | nibble(count) << (4 * shift));
    }
}

fn unpack_side(words: &[u32], row: &mut Row) {
    for (&word, points) in words.iter().zip(row[..NUM_POINTS].chunks_mut(POINTS_PER_WORD)) {
        for (shift, count) in points.iter_mut().enumerate() {
            *count = ((word >> (4 * shift)) & 0x0f) as Chequers;
        }
    }
}

/// OldKey is a 10 byte unary encoding of a Board.
///
/// Slots are visited Opponent first, then OnRoll, point 1 through the bar.
/// A slot holding `n` chequers emits `n` one bits followed by a zero bit.
/// Bits fill each byte from its least significant bit.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct OldKey(pub(crate) [u8; OldKey::BYTES]);

impl OldKey {
    pub const BYTES: usize = 10;
    const BITS: usize = Self::BYTES * 8;

    pub const fn from_bytes(bytes: [u8; Self::BYTES]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> &[u8; Self::BYTES] {
        &self.0
    }

    /// Decode into a Board.
    /// Fails if one bits continue past the last slot of the second side.
    pub fn to_board(&self) -> error::Result<Board> {
        let mut board = Board::empty();
        let mut side = 0;
        let mut slot = 0;

        for byte in self.0 {
            for bit in 0..8 {
                if (byte >> bit) & 1 == 1 {
                    if side >= NUM_SIDES {
                        return Err(ErrorKind::OldKeyOverrun.into());
                    }
                    board.grid[side][slot] += 1;
                } else {
                    slot += 1;
                    if slot == NUM_SLOTS {
                        side += 1;
                        slot = 0;
                    }
                }
            }
        }

        Ok(board)
    }
}

impl From<&Board> for OldKey {
    /// Boards with more than 80 chequers plus slots do not fit, excess bits are dropped.
    fn from(board: &Board) -> Self {
        let mut bits: u128 = 0;
        let mut position = 0;

        for count in board.grid.iter().flatten().map(|&count| usize::from(count)) {
            if position >= Self::BITS {
                break;
            }
            if count > 0 {
                let run = (1u128 << count.min(Self::BITS)) - 1;
                bits |= run << position;
            }
            position += count + 1;
        }

        let mut bytes = [0u8; Self::BYTES];
        bytes.copy_from_slice(&bits.to_le_bytes()[..Self::BYTES]);
        Self(bytes)
    }
}

impl From<Board> for OldKey {
    fn from(board: Board) -> Self {
        Self::from(&board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coretypes::Variation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn start_position_packed_words() {
        let key = PackedKey::from(&Board::start_position(Variation::Standard));
        assert_eq!(
            key.words(),
            &[0x30500000, 0x50000, 0x20000000, 0x30500000, 0x50000, 0x20000000, 0x0]
        );
        assert!(key.is_valid());
    }

    #[test]
    fn packed_key_layout() {
        let mut board = Board::empty();
        board[(Side::OnRoll, 0)] = 1;
        board[(Side::OnRoll, 9)] = 2;
        board[(Side::Opponent, 23)] = 3;
        board[(Side::Opponent, BAR)] = 4;
        board[(Side::OnRoll, BAR)] = 5;

        let key = PackedKey::from(&board);
        assert_eq!(key.words()[0], 0x1);
        assert_eq!(key.words()[1], 0x20);
        assert_eq!(key.words()[5], 0x30000000);
        assert_eq!(key.words()[6], 0x54);
        assert_eq!(key.to_board(), board);
        assert_eq!(key.to_board_swapped(), board.swapped());
    }

    #[test]
    fn empty_key_matches_no_board() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let board = Board::random(&mut rng, Variation::Standard);
            assert_ne!(PackedKey::from(&board), PackedKey::EMPTY);
        }
        let mut key = PackedKey::from(&Board::empty());
        key.invalidate();
        assert!(!key.is_valid());
    }

    #[test]
    fn old_key_unary_bits() {
        // One chequer on Opponent's point 1: a one bit, then a zero bit.
        let mut board = Board::empty();
        board[(Side::Opponent, 0)] = 1;
        assert_eq!(OldKey::from(&board).bytes()[0], 0b1);

        // Two chequers on Opponent's point 2: zero bit for point 1, then 0b11.
        let mut board = Board::empty();
        board[(Side::Opponent, 1)] = 2;
        assert_eq!(OldKey::from(&board).bytes()[0], 0b110);
        assert_eq!(OldKey::from(&board).to_board().unwrap(), board);
    }

    #[test]
    fn old_key_random_boards() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let board = Board::random(&mut rng, Variation::Standard);
            let key = OldKey::from(&board);
            assert_eq!(key.to_board().unwrap(), board);
        }
    }

    #[test]
    fn old_key_overrun_rejected() {
        let key = OldKey::from_bytes([0xff; OldKey::BYTES]);
        // 80 one bits all land on Opponent's point 1 without ever advancing a slot.
        assert!(key.to_board().is_ok());

        // 50 zero bits pass both sides, the trailing one bit overruns.
        let mut bytes = [0u8; OldKey::BYTES];
        bytes[9] = 0x80;
        let err = OldKey::from_bytes(bytes).to_board().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OldKeyOverrun);
    }
}
