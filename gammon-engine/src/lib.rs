//! Backgammon position keys and IDs, bearoff indexing, and a concurrent evaluation cache.

mod base64;

pub mod bearoff;
pub mod board;
pub mod cache;
pub mod coretypes;
pub mod engine;
pub mod error;
pub mod evalcontext;
pub mod hash;
pub mod key;
pub mod matchid;
pub mod positionid;
pub mod xg;

pub use board::Board;
pub use cache::EvalCache;
pub use engine::{Engine, EngineBuilder, Evaluator};
pub use key::{OldKey, PackedKey};
pub use matchid::MatchState;
pub use positionid::PositionId;
