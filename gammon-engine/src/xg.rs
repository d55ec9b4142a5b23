//! XG board notation.
//!
//! The board field of an XGID is 26 characters. Column 0 is Opponent's bar,
//! column 25 is OnRoll's bar, and column `i` in 1..=24 is OnRoll's point `i`,
//! which is Opponent's point `25 - i`.
//! Uppercase letters count OnRoll's chequers, lowercase Opponent's, `A` or `a` is one
//! chequer up to `P` or `p` for sixteen, and `-` is an empty point.

use arrayvec::ArrayString;

use crate::board::Board;
use crate::coretypes::{Chequers, Side, BAR, NUM_POINTS};
use crate::error::{self, ErrorKind};

/// Characters in the board field.
pub const XG_BOARD_LEN: usize = 26;

/// Stack allocated XG board field.
pub type XgString = ArrayString<XG_BOARD_LEN>;

const XGID_PREFIX: &str = "XGID=";

// Highest count a single letter can express.
const MAX_LETTER_COUNT: Chequers = 16;

impl Board {
    /// Parse the board field of an XGID, with or without the `XGID=` prefix.
    /// Fields after the first `:` are ignored.
    ///
    /// Column 0 accepts only lowercase or `-`, column 25 only uppercase or `-`.
    /// Any other character is rejected.
    pub fn parse_xg(xg: &str) -> error::Result<Self> {
        let xg = xg.trim();
        let xg = xg.strip_prefix(XGID_PREFIX).unwrap_or(xg);
        let field = xg.split(':').next().unwrap_or_default();

        if field.len() != XG_BOARD_LEN || !field.is_ascii() {
            let message = format!("board field {field:?} is not 26 characters");
            return Err((ErrorKind::XgMalformed, message).into());
        }

        let mut board = Board::empty();
        for (column, ch) in field.bytes().enumerate() {
            match (column, ch) {
                (_, b'-') => {
                    if (1..=NUM_POINTS).contains(&column) {
                        board[(Side::OnRoll, column - 1)] = 0;
                        board[(Side::Opponent, NUM_POINTS - column)] = 0;
                    }
                }
                (0, b'a'..=b'p') => board[(Side::Opponent, BAR)] = ch - b'a' + 1,
                (25, b'A'..=b'P') => board[(Side::OnRoll, BAR)] = ch - b'A' + 1,
                (1..=24, b'A'..=b'P') => {
                    board[(Side::OnRoll, column - 1)] = ch - b'A' + 1;
                    board[(Side::Opponent, NUM_POINTS - column)] = 0;
                }
                (1..=24, b'a'..=b'p') => {
                    board[(Side::Opponent, NUM_POINTS - column)] = ch - b'a' + 1;
                    board[(Side::OnRoll, column - 1)] = 0;
                }
                _ => {
                    let message = format!("column {column}: {:?}", ch as char);
                    return Err((ErrorKind::XgMalformed, message).into());
                }
            }
        }

        Ok(board)
    }

    /// Returns the XG board field of self.
    /// None if a count cannot be written as one letter or a point is held by both sides.
    pub fn to_xg(&self) -> Option<XgString> {
        let letter = |base: u8, count: Chequers| -> Option<char> {
            match count {
                0 => Some('-'),
                1..=MAX_LETTER_COUNT => Some((base + count - 1) as char),
                _ => None,
            }
        };

        let mut xg = XgString::new();
        xg.push(letter(b'a', self[(Side::Opponent, BAR)])?);
        for column in 1..=NUM_POINTS {
            let on_roll = self[(Side::OnRoll, column - 1)];
            let opponent = self[(Side::Opponent, NUM_POINTS - column)];
            let ch = match (on_roll, opponent) {
                (0, count) => letter(b'a', count)?,
                (count, 0) => letter(b'A', count)?,
                _ => return None,
            };
            xg.push(ch);
        }
        xg.push(letter(b'A', self[(Side::OnRoll, BAR)])?);

        Some(xg)
    }
}
