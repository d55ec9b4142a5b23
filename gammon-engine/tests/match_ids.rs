//! Match IDs
//!
//! Tests Match ID encoding against known IDs and every legal field combination
//! that matters for decoding.

use gammon_engine::coretypes::{CubeOwner, GameState, Resignation, Side, MAX_SCORE};
use gammon_engine::error::ErrorKind;
use gammon_engine::evalcontext::CubeInfo;
use gammon_engine::MatchState;

#[test]
fn opening_roll_of_seven_point_match() {
    let state = MatchState::parse_match_id("MIHlAAAAAAAE").unwrap();

    assert_eq!(state.cube, 1);
    assert_eq!(state.cube_owner, CubeOwner::Centered);
    assert_eq!(state.on_roll, Side::Opponent);
    assert_eq!(state.game_state, GameState::Playing);
    assert_eq!(state.dice, [3, 1]);
    assert_eq!(state.match_to, 7);
    assert_eq!(state.score, [0, 0]);
    assert!(!state.crawford);
    assert!(!state.jacoby);
    assert_eq!(state.to_string(), "MIHlAAAAAAAE");
}

#[test]
fn every_field_survives() {
    let owners = [
        CubeOwner::Centered,
        CubeOwner::Owned(Side::Opponent),
        CubeOwner::Owned(Side::OnRoll),
    ];
    let resignations = [
        Resignation::None,
        Resignation::Single,
        Resignation::Gammon,
        Resignation::Backgammon,
    ];

    for (n, owner) in owners.into_iter().enumerate() {
        for resigned in resignations {
            for cube_log in [0, 3, 6] {
                let state = MatchState {
                    cube: 1 << cube_log,
                    cube_owner: owner,
                    on_roll: Side::from_bit(n as u32),
                    crawford: n == 1,
                    game_state: GameState::Resigned,
                    turn: Side::from_bit(n as u32 + 1),
                    doubled: cube_log == 3,
                    resigned,
                    dice: [6, 2],
                    match_to: MAX_SCORE,
                    score: [MAX_SCORE - 1, cube_log],
                    jacoby: false,
                };
                let id = state.to_match_id();
                assert_eq!(id.len(), 12);
                assert_eq!(MatchState::parse_match_id(&id).unwrap(), state, "{id}");
            }
        }
    }
}

#[test]
fn dice_are_stored_larger_first() {
    let state = MatchState {
        game_state: GameState::Playing,
        dice: [2, 5],
        ..MatchState::new_match(3)
    };
    let parsed = MatchState::parse_match_id(&state.to_match_id()).unwrap();
    assert_eq!(parsed.dice, [5, 2]);
}

#[test]
fn money_sessions() {
    let state = MatchState::parse_match_id("cAkAAAAAAAAA").unwrap();
    assert_eq!(state.match_to, 0);
    assert!(state.jacoby);
    assert_eq!(state.on_roll, Side::OnRoll);

    let cube_info = CubeInfo::from(&state);
    assert!(!cube_info.is_match());
    assert_eq!(cube_info.cube, 1);
}

#[test]
fn rejected_match_ids() {
    let cases = [
        ("", ErrorKind::MatchIdMalformed),
        ("cAkAAAAAAAA!", ErrorKind::MatchIdMalformed),
        ("cAkAAAAAAAAAA", ErrorKind::MatchIdMalformed),
    ];
    for (id, kind) in cases {
        assert_eq!(MatchState::parse_match_id(id).unwrap_err().kind(), kind, "{id:?}");
    }

    // Score above the match length.
    let over = MatchState {
        score: [0, 9],
        ..MatchState::new_match(5)
    };
    assert_eq!(
        MatchState::parse_match_id(&over.to_match_id()).unwrap_err().kind(),
        ErrorKind::MatchIdOutOfRange
    );

    // Match length above the maximum score.
    let long = MatchState::new_match(MAX_SCORE + 1);
    assert_eq!(
        MatchState::parse_match_id(&long.to_match_id()).unwrap_err().kind(),
        ErrorKind::MatchIdOutOfRange
    );
}
