//! Move Validator: pure legality checks over a proposed move.
//!
//! Validation has no side effects; the session mutates state only after a
//! move is accepted.

use tracing::{debug, instrument};

use crate::board::Board;
use crate::engine::{GameState, Player, Position, Role, TurnSequencer};
use crate::error::ValidationError;

/// Acceptance of a move, with flags the session acts on after mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The agent moved onto a hunter's cell; evaluate capture immediately.
    pub contact: bool,
}

/// Checks a proposed move against turn order, recorded position, board
/// adjacency, and occupancy rules, in that order.
///
/// # Errors
///
/// The first failing rule wins: [`ValidationError::NotYourTurn`],
/// [`ValidationError::StaleState`], [`ValidationError::IllegalMove`], then
/// [`ValidationError::CellOccupied`].
#[instrument(skip(board, state, sequencer, player), fields(player_id = %player.id))]
pub fn validate_move(
    board: &Board,
    state: &GameState,
    sequencer: &TurnSequencer,
    player: &Player,
    from: Position,
    to: Position,
) -> Result<MoveOutcome, ValidationError> {
    if !sequencer.is_players_turn(player) {
        return Err(ValidationError::NotYourTurn);
    }

    let recorded = state
        .position_of(&player.id, player.role)
        .ok_or(ValidationError::StaleState)?;
    if from != recorded {
        debug!(%from, %recorded, "Client position drifted from recorded position");
        return Err(ValidationError::StaleState);
    }

    if !board.neighbors(from).contains(&to) {
        return Err(ValidationError::IllegalMove);
    }

    let occupied_by_other_hunter = state
        .hunter_positions()
        .iter()
        .any(|(id, position)| *position == to && *id != player.id);

    match player.role {
        // Hunters may not stack; moving onto the agent's cell is allowed and
        // resolves as a capture check.
        Role::Hunter if occupied_by_other_hunter => Err(ValidationError::CellOccupied),
        Role::Hunter => Ok(MoveOutcome { contact: false }),
        // The agent may enter a hunter's cell; the move is accepted and
        // flagged for immediate capture evaluation.
        Role::Agent => Ok(MoveOutcome {
            contact: state.hunter_positions().values().any(|h| *h == to),
        }),
    }
}

/// Whether the player has any legal move from their recorded position.
pub fn has_legal_move(board: &Board, state: &GameState, player: &Player) -> bool {
    let Some(recorded) = state.position_of(&player.id, player.role) else {
        return false;
    };
    board.neighbors(recorded).into_iter().any(|to| match player.role {
        Role::Agent => true,
        Role::Hunter => !state
            .hunter_positions()
            .iter()
            .any(|(id, position)| *position == to && *id != player.id),
    })
}

/// Checks a pass request.
///
/// A pass is valid when it is the player's turn and one of the following
/// holds: the player has no legal move, the player is disconnected (the
/// timeout collaborator passes on their behalf), or the settings permit the
/// agent to pass voluntarily.
///
/// # Errors
///
/// Returns [`ValidationError::NotYourTurn`] out of turn, and
/// [`ValidationError::NoLegalMove`] when a legal move remains and passing is
/// not permitted.
#[instrument(skip(board, state, sequencer, player), fields(player_id = %player.id))]
pub fn validate_pass(
    board: &Board,
    state: &GameState,
    sequencer: &TurnSequencer,
    player: &Player,
    allow_agent_pass: bool,
) -> Result<(), ValidationError> {
    if !sequencer.is_players_turn(player) {
        return Err(ValidationError::NotYourTurn);
    }
    if !has_legal_move(board, state, player) || !player.is_active {
        return Ok(());
    }
    if player.role == Role::Agent && allow_agent_pass {
        return Ok(());
    }
    Err(ValidationError::NoLegalMove)
}
