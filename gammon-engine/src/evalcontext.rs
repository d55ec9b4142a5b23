//! Evaluation settings and the cache context id derived from them.

use crate::coretypes::{CubeOwner, Side};
use crate::matchid::{log_cube, MatchState};

/// Highest look ahead a context id can record.
pub const MAX_PLIES: u8 = 0x0f;

// Marks context ids of cubeful equities, keeping them apart from plain evaluations.
const CUBEFUL_EQUITY_SALT: u32 = 0x6a47b47e;

/// Settings of one evaluation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EvalContext {
    pub cubeful: bool,
    pub plies: u8,
    pub use_prune: bool,
    pub deterministic: bool,
    /// Standard deviation of noise added to outputs. Noisy results are never cached.
    pub noise: f32,
}

impl EvalContext {
    /// Cubeless, zero ply, deterministic, no noise.
    pub const fn zero_ply() -> Self {
        Self {
            cubeful: false,
            plies: 0,
            use_prune: false,
            deterministic: true,
            noise: 0.0,
        }
    }

    pub fn is_noisy(&self) -> bool {
        self.noise != 0.0
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::zero_ply()
    }
}

/// Cube position and match score seen by the side on roll.
/// Scores are indexed by `Side::index()`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct CubeInfo {
    pub cube: u32,
    pub cube_owner: CubeOwner,
    pub on_roll: Side,
    /// Match length, 0 for money play.
    pub match_to: u32,
    pub score: [u32; 2],
    pub crawford: bool,
    pub jacoby: bool,
    pub beavers: bool,
}

impl CubeInfo {
    /// Money play with a centered cube, Jacoby and beavers allowed.
    pub fn money(on_roll: Side) -> Self {
        Self {
            cube: 1,
            cube_owner: CubeOwner::Centered,
            on_roll,
            match_to: 0,
            score: [0, 0],
            crawford: false,
            jacoby: true,
            beavers: true,
        }
    }

    /// Returns true for match play.
    pub fn is_match(&self) -> bool {
        self.match_to > 0
    }

    /// Points the given side still needs to win the match.
    fn away(&self, side: Side) -> u32 {
        self.match_to.wrapping_sub(self.score[side.index()]).wrapping_sub(1)
    }

    /// Owner as seen by the side on roll: 0 for the opponent, 1 for itself, 2 centered.
    fn owner_code(&self) -> u32 {
        match self.cube_owner {
            CubeOwner::Centered => 2,
            CubeOwner::Owned(side) => u32::from(side == self.on_roll),
        }
    }
}

impl From<&MatchState> for CubeInfo {
    fn from(state: &MatchState) -> Self {
        Self {
            cube: state.cube,
            cube_owner: state.cube_owner,
            on_roll: state.on_roll,
            match_to: state.match_to,
            score: state.score,
            crawford: state.crawford,
            jacoby: state.jacoby,
            beavers: false,
        }
    }
}

/// Pack the settings an evaluation depends on into a cache context id.
///
/// | bits  | field                                    |
/// |-------|------------------------------------------|
/// | 0-3   | plies                                    |
/// | 4     | cubeful                                  |
/// | 5     | side on roll                             |
/// | 6     | pruning, only when plies > 0             |
/// | 7-12  | away score of the side on roll, match    |
/// | 13-18 | away score of the opponent, match        |
/// | 19-22 | log2 cube, match                         |
/// | 23-24 | cube owner code                          |
/// | 25    | crawford, match                          |
/// | 26    | jacoby, money                            |
/// | 27    | beavers, money                           |
///
/// Fields past bit 6 are only mixed in when `plies > 0` or `cubeful_equity` is set,
/// and cubeful equity ids are further xored with a constant.
/// Plies above `MAX_PLIES` are keyed as `MAX_PLIES`.
pub fn eval_key(context: &EvalContext, plies: u8, cube_info: &CubeInfo, cubeful_equity: bool) -> u32 {
    let plies = plies.min(MAX_PLIES);
    let on_roll = cube_info.on_roll;

    let mut key = u32::from(plies)
        | u32::from(context.cubeful) << 4
        | (on_roll.index() as u32) << 5;

    if plies > 0 {
        key ^= u32::from(context.use_prune) << 6;
    }

    if plies > 0 || cubeful_equity {
        let owner = cube_info.owner_code();

        if cube_info.is_match() {
            key ^= cube_info.away(on_roll) << 7
                ^ cube_info.away(!on_roll) << 13
                ^ log_cube(cube_info.cube) << 19
                ^ owner << 23
                ^ u32::from(cube_info.crawford) << 25;
        } else if context.cubeful || cubeful_equity {
            key ^= owner << 23
                ^ u32::from(cube_info.jacoby) << 26
                ^ u32::from(cube_info.beavers) << 27;
        }

        if cubeful_equity {
            key ^= CUBEFUL_EQUITY_SALT;
        }
    }

    key
}
