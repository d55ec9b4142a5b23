//! Position ID: the 14 character base64 form of an OldKey.

use arrayvec::ArrayString;
use log::trace;

use crate::base64;
use crate::board::Board;
use crate::error::{self, ErrorKind};
use crate::key::{OldKey, PackedKey};

/// Characters in a Position ID.
pub const POSITION_ID_LEN: usize = 14;

/// Stack allocated Position ID.
pub type PositionIdString = ArrayString<POSITION_ID_LEN>;

/// Conversion between a position and its Position ID.
pub trait PositionId: Sized {
    /// Parse a Position ID. Surrounding whitespace is ignored.
    fn parse_position_id(id: &str) -> error::Result<Self>;

    /// Returns the Position ID of self.
    fn to_position_id(&self) -> PositionIdString;
}

impl PositionId for OldKey {
    /// Only the characters are checked, the decoded key may not form a legal Board.
    fn parse_position_id(id: &str) -> error::Result<Self> {
        let id = id.trim();
        let mut bytes = [0u8; OldKey::BYTES];
        if base64::decode(id, &mut bytes).is_none() {
            trace!("malformed position id {id:?}");
            return Err((ErrorKind::PositionIdMalformed, id).into());
        }
        Ok(OldKey::from_bytes(bytes))
    }

    fn to_position_id(&self) -> PositionIdString {
        base64::encode(self.bytes())
    }
}

impl PositionId for Board {
    /// Fails when the ID is malformed or decodes to a Board that cannot occur in a game.
    fn parse_position_id(id: &str) -> error::Result<Self> {
        let key = OldKey::parse_position_id(id)?;
        let board = key
            .to_board()
            .map_err(|err| error::Error::new(ErrorKind::PositionIdIllegal, err))?;

        match board.is_legal() {
            true => Ok(board),
            false => {
                trace!("illegal position id {id:?}");
                Err((ErrorKind::PositionIdIllegal, id.trim()).into())
            }
        }
    }

    fn to_position_id(&self) -> PositionIdString {
        OldKey::from(self).to_position_id()
    }
}

impl PositionId for PackedKey {
    fn parse_position_id(id: &str) -> error::Result<Self> {
        Board::parse_position_id(id).map(PackedKey::from)
    }

    fn to_position_id(&self) -> PositionIdString {
        self.to_board().to_position_id()
    }
}

/// Returns true if `id` has the length and alphabet of a Position ID and names a legal Board.
pub fn is_valid_position_id(id: &str) -> bool {
    Board::parse_position_id(id).is_ok()
}
