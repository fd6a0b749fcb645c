//! Visibility Resolver: reveal decisions and per-recipient filtering.
//!
//! Hidden information is a data-filtering discipline. Each broadcast view is
//! computed fresh from the full state and the recipient's identity; there is
//! no stored "hunter-visible" copy that could drift from truth.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::board::{Board, BoardType};
use crate::engine::{
    CardId, EquipmentState, GameState, GameStatus, MissionProgress, Player, PlayerId, Position,
    Role, SessionId, Winner,
};

/// A point-in-time, recipient-filtered view of the game.
///
/// The agent's position is present only when the recipient is entitled to
/// it: the agent always sees their own position, hunters see it only while
/// the agent is revealed. Serialization omits the field entirely when absent
/// so a hidden position is never on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct FilteredSnapshot {
    session_id: SessionId,
    recipient: PlayerId,
    role: Role,
    board: BoardType,
    status: GameStatus,
    current_round: u32,
    winner: Option<Winner>,
    agent_revealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_position: Option<Position>,
    hunter_positions: BTreeMap<PlayerId, Position>,
    mission: MissionProgress,
    /// Cards held by the recipient's own role.
    cards: Vec<CardId>,
}

/// The visibility decision for one committed mutation, plus the filtered
/// views to hand to the broadcast gateway.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct VisibilityUpdate {
    /// Whether the agent is revealed for the current round.
    revealed: bool,
    /// One filtered view per connected player.
    snapshots: BTreeMap<PlayerId, FilteredSnapshot>,
}

/// Decides whether the agent must be revealed, given the cell just entered.
///
/// Reveal fires on a noisy cell or when any hunter is within the board's
/// proximity threshold. An active suppression effect overrides both; an
/// already-forced reveal is sticky for the round.
pub fn resolve_reveal(board: &Board, state: &GameState) -> bool {
    if state.reveal_suppressed {
        return false;
    }
    if state.agent_revealed {
        return true;
    }
    if board.is_noisy(state.agent_position) {
        return true;
    }
    let threshold = board.reveal_proximity();
    state
        .hunter_positions
        .values()
        .any(|hunter| state.agent_position.manhattan_distance(*hunter) <= threshold)
}

/// Builds the filtered view of `state` for a single recipient.
///
/// Pure: reads the full state, writes nothing.
pub fn snapshot_for(
    session_id: &str,
    board: BoardType,
    state: &GameState,
    recipient: &Player,
) -> FilteredSnapshot {
    let agent_position = match recipient.role {
        Role::Agent => Some(state.agent_position),
        Role::Hunter if state.agent_revealed => Some(state.agent_position),
        Role::Hunter => None,
    };
    FilteredSnapshot {
        session_id: session_id.to_string(),
        recipient: recipient.id.clone(),
        role: recipient.role,
        board,
        status: state.status,
        current_round: state.current_round,
        winner: state.winner,
        agent_revealed: state.agent_revealed,
        agent_position,
        hunter_positions: state.hunter_positions.clone(),
        mission: state.mission.clone(),
        cards: equipment_view(&state.equipment, recipient.role),
    }
}

fn equipment_view(equipment: &EquipmentState, role: Role) -> Vec<CardId> {
    equipment.cards_for(role).to_vec()
}

/// Builds one filtered view per connected player.
#[instrument(skip_all, fields(session_id = %session_id))]
pub fn views(
    session_id: &str,
    board: BoardType,
    state: &GameState,
    players: &[Player],
) -> BTreeMap<PlayerId, FilteredSnapshot> {
    let snapshots: BTreeMap<PlayerId, FilteredSnapshot> = players
        .iter()
        .filter(|player| player.is_active)
        .map(|player| {
            (
                player.id.clone(),
                snapshot_for(session_id, board, state, player),
            )
        })
        .collect();
    debug!(
        recipients = snapshots.len(),
        revealed = state.agent_revealed,
        "Built filtered views"
    );
    snapshots
}

impl VisibilityUpdate {
    pub(crate) fn new(
        revealed: bool,
        snapshots: BTreeMap<PlayerId, FilteredSnapshot>,
    ) -> Self {
        Self {
            revealed,
            snapshots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardDefinition;

    fn board_with_noise() -> Board {
        let definition = BoardDefinition::from_toml(
            r#"
name = "test"
width = 6
height = 6
reveal_proximity = 1
agent_start = [0, 0]
hunter_starts = [[5, 5]]
noisy = [[3, 0]]
"#,
        )
        .unwrap();
        Board::from_definition(BoardType::Museum, &definition).unwrap()
    }

    fn state_with_hunter_at(board: &Board, hunter: Position) -> GameState {
        let mut state = GameState::new(board, EquipmentState::default());
        state.hunter_positions.insert("h1".to_string(), hunter);
        state
    }

    #[test]
    fn distant_quiet_agent_stays_hidden() {
        let board = board_with_noise();
        let state = state_with_hunter_at(&board, Position::new(5, 5));
        assert!(!resolve_reveal(&board, &state));
    }

    #[test]
    fn noisy_cell_forces_reveal() {
        let board = board_with_noise();
        let mut state = state_with_hunter_at(&board, Position::new(5, 5));
        state.agent_position = Position::new(3, 0);
        assert!(resolve_reveal(&board, &state));
    }

    #[test]
    fn proximity_forces_reveal() {
        let board = board_with_noise();
        let state = state_with_hunter_at(&board, Position::new(0, 1));
        assert!(resolve_reveal(&board, &state));
    }

    #[test]
    fn suppression_overrides_noise_and_proximity() {
        let board = board_with_noise();
        let mut state = state_with_hunter_at(&board, Position::new(0, 1));
        state.agent_position = Position::new(3, 0);
        state.reveal_suppressed = true;
        assert!(!resolve_reveal(&board, &state));
    }

    #[test]
    fn hidden_agent_position_is_absent_from_hunter_view() {
        let board = board_with_noise();
        let state = state_with_hunter_at(&board, Position::new(5, 5));
        let hunter = Player::new("h1".to_string(), Role::Hunter, None);

        let snapshot = snapshot_for("s1", BoardType::Museum, &state, &hunter);
        assert_eq!(snapshot.agent_position(), &None);

        // The field must not appear on the wire at all.
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("agent_position").is_none());
    }

    #[test]
    fn revealed_agent_position_reaches_hunters() {
        let board = board_with_noise();
        let mut state = state_with_hunter_at(&board, Position::new(5, 5));
        state.agent_revealed = true;
        let hunter = Player::new("h1".to_string(), Role::Hunter, None);

        let snapshot = snapshot_for("s1", BoardType::Museum, &state, &hunter);
        assert_eq!(snapshot.agent_position(), &Some(Position::new(0, 0)));
    }

    #[test]
    fn agent_always_sees_own_position() {
        let board = board_with_noise();
        let state = state_with_hunter_at(&board, Position::new(5, 5));
        let agent = Player::new("a1".to_string(), Role::Agent, None);

        let snapshot = snapshot_for("s1", BoardType::Museum, &state, &agent);
        assert_eq!(snapshot.agent_position(), &Some(Position::new(0, 0)));
        assert_eq!(
            snapshot.hunter_positions().get("h1"),
            Some(&Position::new(5, 5))
        );
    }

    #[test]
    fn disconnected_players_receive_no_view() {
        let board = board_with_noise();
        let state = state_with_hunter_at(&board, Position::new(5, 5));
        let agent = Player::new("a1".to_string(), Role::Agent, None);
        let mut hunter = Player::new("h1".to_string(), Role::Hunter, None);
        hunter.is_active = false;

        let views = views("s1", BoardType::Museum, &state, &[agent, hunter]);
        assert!(views.contains_key("a1"));
        assert!(!views.contains_key("h1"));
    }
}
