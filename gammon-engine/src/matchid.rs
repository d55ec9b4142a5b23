//! Match ID: the 12 character base64 form of a 9 byte match state key.
//!
//! Fields are packed least significant bit first:
//!
//! | bits  | field                       |
//! |-------|-----------------------------|
//! | 0-3   | log2 of the cube value      |
//! | 4-5   | cube owner, 3 for centered  |
//! | 6     | side on roll                |
//! | 7     | crawford game               |
//! | 8-10  | game state                  |
//! | 11    | side to make a decision     |
//! | 12    | cube offered                |
//! | 13-14 | resignation offered         |
//! | 15-17 | first die                   |
//! | 18-20 | second die                  |
//! | 21-35 | match length, 0 for money   |
//! | 36-50 | score of side 0             |
//! | 51-65 | score of side 1             |
//! | 66    | jacoby rule disabled        |

use std::fmt::{self, Display};

use arrayvec::ArrayString;
use log::trace;

use crate::base64;
use crate::coretypes::{CubeOwner, GameState, Resignation, Side, MAX_SCORE};
use crate::error::{self, ErrorKind};

/// Characters in a Match ID.
pub const MATCH_ID_LEN: usize = 12;

/// Bytes in a match key.
pub const MATCH_KEY_BYTES: usize = 9;

/// Stack allocated Match ID.
pub type MatchIdString = ArrayString<MATCH_ID_LEN>;

/// Offset and width of a field within a match key.
#[derive(Debug, Copy, Clone)]
struct Field {
    offset: u32,
    width: u32,
}

impl Field {
    const fn new(offset: u32, width: u32) -> Self {
        Self { offset, width }
    }

    const fn mask(&self) -> u128 {
        (1 << self.width) - 1
    }

    fn set(&self, key: &mut u128, value: u32) {
        *key |= (u128::from(value) & self.mask()) << self.offset;
    }

    fn get(&self, key: u128) -> u32 {
        ((key >> self.offset) & self.mask()) as u32
    }
}

const LOG_CUBE: Field = Field::new(0, 4);
const CUBE_OWNER: Field = Field::new(4, 2);
const ON_ROLL: Field = Field::new(6, 1);
const CRAWFORD: Field = Field::new(7, 1);
const GAME_STATE: Field = Field::new(8, 3);
const TURN: Field = Field::new(11, 1);
const DOUBLED: Field = Field::new(12, 1);
const RESIGNED: Field = Field::new(13, 2);
const DIE_0: Field = Field::new(15, 3);
const DIE_1: Field = Field::new(18, 3);
const MATCH_TO: Field = Field::new(21, 15);
const SCORE_0: Field = Field::new(36, 15);
const SCORE_1: Field = Field::new(51, 15);
const NO_JACOBY: Field = Field::new(66, 1);

/// Returns log2 of a cube value. Values that are not powers of two round down.
pub fn log_cube(cube: u32) -> u32 {
    match cube {
        0 | 1 => 0,
        n => n.ilog2(),
    }
}

/// Everything about a match a Match ID records.
/// Scores are indexed by `Side::index()`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MatchState {
    pub cube: u32,
    pub cube_owner: CubeOwner,
    pub on_roll: Side,
    pub crawford: bool,
    pub game_state: GameState,
    /// Side that has to make the next decision, on roll unless a double or resignation is pending.
    pub turn: Side,
    pub doubled: bool,
    pub resigned: Resignation,
    /// Dice rolled, 0 for not rolled.
    pub dice: [u8; 2],
    /// Match length, 0 for a money session.
    pub match_to: u32,
    pub score: [u32; 2],
    pub jacoby: bool,
}

impl MatchState {
    /// A fresh match to `match_to` points, before the opening roll.
    pub fn new_match(match_to: u32) -> Self {
        Self {
            match_to,
            jacoby: false,
            ..Self::money()
        }
    }

    /// A fresh money session with the Jacoby rule on.
    pub fn money() -> Self {
        Self {
            cube: 1,
            cube_owner: CubeOwner::Centered,
            on_roll: Side::OnRoll,
            crawford: false,
            game_state: GameState::None,
            turn: Side::OnRoll,
            doubled: false,
            resigned: Resignation::None,
            dice: [0, 0],
            match_to: 0,
            score: [0, 0],
            jacoby: true,
        }
    }

    /// Pack self into a 9 byte match key. The larger die is stored first.
    pub fn to_key(&self) -> [u8; MATCH_KEY_BYTES] {
        let (high, low) = match self.dice {
            [d0, d1] if d0 >= d1 => (d0, d1),
            [d0, d1] => (d1, d0),
        };

        let mut key = 0u128;
        LOG_CUBE.set(&mut key, log_cube(self.cube));
        CUBE_OWNER.set(&mut key, self.cube_owner.to_bits());
        ON_ROLL.set(&mut key, self.on_roll.index() as u32);
        CRAWFORD.set(&mut key, u32::from(self.crawford));
        GAME_STATE.set(&mut key, self.game_state as u32);
        TURN.set(&mut key, self.turn.index() as u32);
        DOUBLED.set(&mut key, u32::from(self.doubled));
        RESIGNED.set(&mut key, self.resigned as u32);
        DIE_0.set(&mut key, u32::from(high));
        DIE_1.set(&mut key, u32::from(low));
        MATCH_TO.set(&mut key, self.match_to);
        SCORE_0.set(&mut key, self.score[0]);
        SCORE_1.set(&mut key, self.score[1]);
        NO_JACOBY.set(&mut key, u32::from(!self.jacoby));

        let mut bytes = [0u8; MATCH_KEY_BYTES];
        bytes.copy_from_slice(&key.to_le_bytes()[..MATCH_KEY_BYTES]);
        bytes
    }

    /// Unpack a 9 byte match key, rejecting fields outside their ranges.
    pub fn from_key(bytes: &[u8; MATCH_KEY_BYTES]) -> error::Result<Self> {
        let mut buffer = [0u8; 16];
        buffer[..MATCH_KEY_BYTES].copy_from_slice(bytes);
        let key = u128::from_le_bytes(buffer);

        let out_of_range = |what: &str, value: u32| -> error::Error {
            (ErrorKind::MatchIdOutOfRange, format!("{what} {value}")).into()
        };

        let die_0 = DIE_0.get(key);
        let die_1 = DIE_1.get(key);
        for die in [die_0, die_1] {
            if die > 6 {
                return Err(out_of_range("die", die));
            }
        }

        let match_to = MATCH_TO.get(key);
        if match_to > MAX_SCORE {
            return Err(out_of_range("match length", match_to));
        }

        let score = [SCORE_0.get(key), SCORE_1.get(key)];
        if match_to > 0 {
            for points in score {
                if points > match_to {
                    return Err(out_of_range("score", points));
                }
            }
        }

        let crawford = CRAWFORD.get(key) == 1;
        if match_to == 0 && crawford {
            return Err((ErrorKind::MatchIdOutOfRange, "crawford in a money game").into());
        }

        let game_state = GameState::from_u8(GAME_STATE.get(key) as u8)
            .ok_or_else(|| out_of_range("game state", GAME_STATE.get(key)))?;

        Ok(Self {
            cube: 1 << LOG_CUBE.get(key),
            cube_owner: CubeOwner::from_bits(CUBE_OWNER.get(key)),
            on_roll: Side::from_bit(ON_ROLL.get(key)),
            crawford,
            game_state,
            turn: Side::from_bit(TURN.get(key)),
            doubled: DOUBLED.get(key) == 1,
            resigned: Resignation::from_u8(RESIGNED.get(key) as u8),
            dice: [die_0 as u8, die_1 as u8],
            match_to,
            score,
            jacoby: NO_JACOBY.get(key) == 0,
        })
    }

    /// Returns the Match ID of self.
    pub fn to_match_id(&self) -> MatchIdString {
        base64::encode(&self.to_key())
    }

    /// Parse a Match ID. Surrounding whitespace is ignored.
    pub fn parse_match_id(id: &str) -> error::Result<Self> {
        let id = id.trim();
        let mut bytes = [0u8; MATCH_KEY_BYTES];
        if base64::decode(id, &mut bytes).is_none() {
            trace!("malformed match id {id:?}");
            return Err((ErrorKind::MatchIdMalformed, id).into());
        }
        Self::from_key(&bytes).map_err(|err| {
            trace!("rejected match id {id:?}: {err}");
            err
        })
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::money()
    }
}

impl Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_match_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seven_point_opening() -> MatchState {
        MatchState {
            on_roll: Side::Opponent,
            game_state: GameState::Playing,
            turn: Side::Opponent,
            dice: [3, 1],
            ..MatchState::new_match(7)
        }
    }

    #[test]
    fn known_match_ids() {
        assert_eq!(seven_point_opening().to_match_id().as_str(), "MIHlAAAAAAAE");

        let money = MatchState {
            game_state: GameState::Playing,
            ..MatchState::money()
        };
        assert_eq!(money.to_match_id().as_str(), "cAkAAAAAAAAA");

        let crawford = MatchState {
            cube: 2,
            cube_owner: CubeOwner::Owned(Side::OnRoll),
            crawford: true,
            game_state: GameState::Playing,
            dice: [5, 6],
            score: [2, 4],
            ..MatchState::new_match(5)
        };
        assert_eq!(crawford.to_match_id().as_str(), "0Qm3ACAAIAAE");
    }

    #[test]
    fn parse_known_match_ids() {
        assert_eq!(
            MatchState::parse_match_id("MIHlAAAAAAAE").unwrap(),
            seven_point_opening()
        );
        let parsed = MatchState::parse_match_id("0Qm3ACAAIAAE").unwrap();
        assert_eq!(parsed.cube, 2);
        assert_eq!(parsed.dice, [6, 5]);
        assert_eq!(parsed.score, [2, 4]);
        assert!(parsed.crawford);
        assert!(!parsed.jacoby);
    }

    #[test]
    fn out_of_range_fields_rejected() {
        let cases = [
            (DIE_0, 7),
            (MATCH_TO, MAX_SCORE + 1),
            (GAME_STATE, 5),
            (GAME_STATE, 7),
        ];
        for (field, value) in cases {
            let mut key = 0u128;
            MATCH_TO.set(&mut key, 7);
            field.set(&mut key, value);
            let mut bytes = [0u8; MATCH_KEY_BYTES];
            bytes.copy_from_slice(&key.to_le_bytes()[..MATCH_KEY_BYTES]);
            let err = MatchState::from_key(&bytes).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MatchIdOutOfRange, "{field:?}");
        }

        let over_score = MatchState {
            score: [8, 0],
            ..MatchState::new_match(7)
        };
        assert!(MatchState::from_key(&over_score.to_key()).is_err());

        let crawford_money = MatchState {
            crawford: true,
            ..MatchState::money()
        };
        assert!(MatchState::from_key(&crawford_money.to_key()).is_err());
    }

    #[test]
    fn malformed_match_ids_rejected() {
        for id in ["", "MIHlAAAAAAA", "MIHlAAAAAAAEA", "MIHlAAAA AAE"] {
            let err = MatchState::parse_match_id(id).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MatchIdMalformed, "{id}");
        }
    }

    #[test]
    fn cube_logarithm() {
        assert_eq!(log_cube(1), 0);
        assert_eq!(log_cube(2), 1);
        assert_eq!(log_cube(64), 6);
        assert_eq!(log_cube(3), 1);
    }
}
