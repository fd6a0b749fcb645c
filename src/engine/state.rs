//! The mutable game aggregate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::board::Board;
use crate::engine::{CardId, GameStatus, ObjectiveId, PlayerId, Position, Role, Winner};

/// Mission completion tally. Monotonically growing; never shrinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionProgress {
    objectives_completed: u32,
    total_objectives: u32,
    completed_objective_ids: BTreeSet<ObjectiveId>,
}

impl MissionProgress {
    /// Starts a fresh tally over `total_objectives` objectives.
    pub fn new(total_objectives: u32) -> Self {
        Self {
            objectives_completed: 0,
            total_objectives,
            completed_objective_ids: BTreeSet::new(),
        }
    }

    /// Marks an objective completed. Returns false if it already was.
    pub(crate) fn complete(&mut self, id: ObjectiveId) -> bool {
        if self.completed_objective_ids.insert(id) {
            self.objectives_completed += 1;
            true
        } else {
            false
        }
    }

    /// Objectives completed so far.
    pub fn objectives_completed(&self) -> u32 {
        self.objectives_completed
    }

    /// Total objectives on the board.
    pub fn total_objectives(&self) -> u32 {
        self.total_objectives
    }

    /// Identifiers of completed objectives.
    pub fn completed_objective_ids(&self) -> &BTreeSet<ObjectiveId> {
        &self.completed_objective_ids
    }

    /// Whether every objective has been completed.
    pub fn is_complete(&self) -> bool {
        self.objectives_completed >= self.total_objectives
    }
}

/// Per-role pools of held equipment cards. Cards are consumed on use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentState {
    agent_cards: Vec<CardId>,
    hunter_cards: Vec<CardId>,
}

impl EquipmentState {
    /// Builds the pools from a mission loadout.
    pub fn new(agent_cards: Vec<CardId>, hunter_cards: Vec<CardId>) -> Self {
        Self {
            agent_cards,
            hunter_cards,
        }
    }

    /// Cards currently held by the given role.
    pub fn cards_for(&self, role: Role) -> &[CardId] {
        match role {
            Role::Agent => &self.agent_cards,
            Role::Hunter => &self.hunter_cards,
        }
    }

    /// Removes one copy of a card from the role's pool. Returns false if the
    /// card is not held.
    pub(crate) fn consume(&mut self, role: Role, card_id: &str) -> bool {
        let pool = match role {
            Role::Agent => &mut self.agent_cards,
            Role::Hunter => &mut self.hunter_cards,
        };
        match pool.iter().position(|held| held == card_id) {
            Some(index) => {
                pool.remove(index);
                true
            }
            None => false,
        }
    }
}

/// The mutable aggregate owned by one game session.
///
/// The agent's true position is recorded here at all times; whether it is
/// shown to hunters is a filtering decision made by the visibility resolver,
/// never by storing an alternate copy of the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub(crate) agent_position: Position,
    pub(crate) agent_revealed: bool,
    /// Equipment effect: reveal suppressed for the current round.
    pub(crate) reveal_suppressed: bool,
    /// Equipment effect: additional agent moves before hunters act.
    pub(crate) extra_moves: u32,
    pub(crate) hunter_positions: BTreeMap<PlayerId, Position>,
    pub(crate) mission: MissionProgress,
    pub(crate) equipment: EquipmentState,
    pub(crate) current_round: u32,
    pub(crate) status: GameStatus,
    pub(crate) winner: Option<Winner>,
}

impl GameState {
    /// Creates the initial state for a new session.
    ///
    /// The agent starts on the board's agent start cell; hunters are placed
    /// as they join. Rounds start at 1.
    pub fn new(board: &Board, equipment: EquipmentState) -> Self {
        Self {
            agent_position: board.agent_start(),
            agent_revealed: false,
            reveal_suppressed: false,
            extra_moves: 0,
            hunter_positions: BTreeMap::new(),
            mission: MissionProgress::new(board.objective_count()),
            equipment,
            current_round: 1,
            status: GameStatus::Setup,
            winner: None,
        }
    }

    /// The agent's true position. Internal truth; filter before broadcast.
    pub fn agent_position(&self) -> Position {
        self.agent_position
    }

    /// Whether the agent is revealed for the current round.
    pub fn agent_revealed(&self) -> bool {
        self.agent_revealed
    }

    /// Hunter positions by player id. Always visible to everyone.
    pub fn hunter_positions(&self) -> &BTreeMap<PlayerId, Position> {
        &self.hunter_positions
    }

    /// Mission completion tally.
    pub fn mission(&self) -> &MissionProgress {
        &self.mission
    }

    /// Held equipment pools.
    pub fn equipment(&self) -> &EquipmentState {
        &self.equipment
    }

    /// Current round, starting at 1.
    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// Lifecycle status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// The winning side, set exactly once when the game completes.
    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    /// The recorded position of a player, if they are on the board.
    pub fn position_of(&self, player_id: &str, role: Role) -> Option<Position> {
        match role {
            Role::Agent => Some(self.agent_position),
            Role::Hunter => self.hunter_positions.get(player_id).copied(),
        }
    }

    /// Marks the game completed with the given winner. Idempotent guard:
    /// the first terminal condition to fire wins.
    pub(crate) fn complete(&mut self, winner: Winner) {
        if self.status == GameStatus::Completed {
            return;
        }
        debug!(?winner, round = self.current_round, "Game completed");
        self.status = GameStatus::Completed;
        self.winner = Some(winner);
    }

    /// Resets per-round visibility effects at the start of a round.
    pub(crate) fn begin_round(&mut self, round: u32) {
        self.current_round = round;
        self.agent_revealed = false;
        self.reveal_suppressed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mission_progress_is_monotonic() {
        let mut mission = MissionProgress::new(2);
        assert!(mission.complete("obj-a".to_string()));
        assert!(!mission.complete("obj-a".to_string()));
        assert_eq!(mission.objectives_completed(), 1);
        assert!(!mission.is_complete());
        assert!(mission.complete("obj-b".to_string()));
        assert!(mission.is_complete());
    }

    #[test]
    fn equipment_consumes_single_copies() {
        let mut equipment = EquipmentState::new(
            vec!["smoke_screen".to_string(), "smoke_screen".to_string()],
            vec![],
        );
        assert!(equipment.consume(Role::Agent, "smoke_screen"));
        assert_eq!(equipment.cards_for(Role::Agent).len(), 1);
        assert!(equipment.consume(Role::Agent, "smoke_screen"));
        assert!(!equipment.consume(Role::Agent, "smoke_screen"));
        assert!(!equipment.consume(Role::Hunter, "smoke_screen"));
    }

    #[test]
    fn complete_sets_winner_exactly_once() {
        let board = crate::board::Board::load(crate::board::BoardType::Museum).unwrap();
        let mut state = GameState::new(&board, EquipmentState::default());
        state.complete(Winner::Hunters);
        state.complete(Winner::Agent);
        assert_eq!(state.status(), GameStatus::Completed);
        assert_eq!(state.winner(), Some(Winner::Hunters));
    }
}
