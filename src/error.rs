//! Engine error taxonomy.
//!
//! Errors are grouped by recoverability: validation and rule errors are
//! returned to the originating client with no state mutation, configuration
//! errors abort session creation, and session errors cover lookup and
//! teardown races. [`EngineError`] unifies the groups at the command surface.

use derive_more::{Display, Error, From};

/// Rejection of a proposed move. No state mutation occurs on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum ValidationError {
    /// Another player holds the active turn.
    #[display("not your turn")]
    NotYourTurn,
    /// The reported origin cell does not match the recorded position.
    ///
    /// Guards against clients acting on a stale view of the board.
    #[display("reported position does not match the recorded position")]
    StaleState,
    /// The destination is not an unblocked neighbor of the origin cell.
    #[display("destination is not reachable from the origin cell")]
    IllegalMove,
    /// Another hunter already occupies the destination cell.
    #[display("destination cell is occupied by another hunter")]
    CellOccupied,
    /// A pass was requested but the player still has a legal move, or
    /// passing is disallowed by the session settings.
    #[display("passing is not permitted here")]
    NoLegalMove,
}

/// Rejection of an in-game action that passed positional validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum RuleError {
    /// The card is not in the caller's equipment pool.
    #[display("card is not held")]
    CardNotHeld,
    /// The card is held but its effect cannot apply right now.
    #[display("card cannot be used now")]
    NotUsableNow,
    /// The game has reached a terminal state; no further commands apply.
    #[display("game is already completed")]
    GameAlreadyCompleted,
}

/// Fatal configuration problems, surfaced at session-creation time.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ConfigurationError {
    /// The board identifier is not in the recognized set.
    #[display("unknown board type '{_0}'")]
    UnknownBoardType(#[error(not(source))] String),
    /// The mission identifier is not in the catalog.
    #[display("unknown mission '{_0}'")]
    UnknownMission(#[error(not(source))] String),
    /// A board definition failed to parse or violated a structural rule.
    #[display("invalid board definition: {_0}")]
    InvalidBoardDefinition(#[error(not(source))] String),
    /// The requested hunter count is zero or exceeds the board's start
    /// positions.
    #[display("hunter count {requested} is outside the supported range 1..={max}")]
    HunterCountUnsupported {
        /// Hunters requested by the session settings.
        requested: usize,
        /// Start positions available on the board.
        max: usize,
    },
}

/// Session lookup and roster errors, including teardown races.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum SessionError {
    /// The session was torn down or never existed.
    #[display("session is gone")]
    SessionGone,
    /// The agent seat is already filled.
    #[display("agent seat is already taken")]
    SeatTaken,
    /// Every hunter seat is already filled.
    #[display("session roster is full")]
    RosterFull,
    /// The player never joined this session.
    #[display("player '{_0}' is not in this session")]
    UnknownPlayer(#[error(not(source))] String),
    /// The session has started; new players may no longer join.
    #[display("session has already started")]
    AlreadyStarted,
}

/// Unified error for the command surface.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum EngineError {
    /// Move validation failed.
    Validation(ValidationError),
    /// A game rule rejected the action.
    Rule(RuleError),
    /// Session creation or restore hit a configuration problem.
    Config(ConfigurationError),
    /// Session lookup or roster management failed.
    Session(SessionError),
}
