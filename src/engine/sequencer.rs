//! Turn Sequencer: the explicit state machine ordering play.
//!
//! The phase is a single tagged variant rather than scattered flags, so the
//! legality of any transition is one exhaustive match.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::engine::{Player, PlayerId, Role};

/// Whose move it is, as an explicit tagged state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TurnPhase {
    /// Seats are still being filled.
    Setup,
    /// The agent moves.
    AgentTurn,
    /// The hunter at this index in registration order moves.
    HunterTurn {
        /// Index into the registered hunter order.
        index: usize,
    },
    /// All seats have moved; the round is about to roll over.
    RoundEnd,
    /// Terminal. No further moves are accepted.
    Completed,
}

/// Orders turns: agent first, then hunters in registration order, repeating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSequencer {
    phase: TurnPhase,
    hunter_order: Vec<PlayerId>,
}

impl TurnSequencer {
    /// Creates a sequencer in the setup phase with an empty roster.
    pub fn new() -> Self {
        Self {
            phase: TurnPhase::Setup,
            hunter_order: Vec::new(),
        }
    }

    /// Rebuilds a sequencer from persisted parts (session restore).
    pub(crate) fn from_parts(phase: TurnPhase, hunter_order: Vec<PlayerId>) -> Self {
        Self {
            phase,
            hunter_order,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Registered hunter ids in turn order.
    pub fn hunter_order(&self) -> &[PlayerId] {
        &self.hunter_order
    }

    /// Appends a hunter to the turn order during setup.
    pub(crate) fn register_hunter(&mut self, player_id: PlayerId) {
        debug_assert_eq!(self.phase, TurnPhase::Setup);
        self.hunter_order.push(player_id);
    }

    /// Starts play: `Setup -> AgentTurn` once all seats are filled.
    #[instrument(skip(self))]
    pub(crate) fn start(&mut self) {
        debug_assert_eq!(self.phase, TurnPhase::Setup);
        debug_assert!(!self.hunter_order.is_empty());
        debug!(hunters = self.hunter_order.len(), "Turn order begins");
        self.phase = TurnPhase::AgentTurn;
    }

    /// Whether the given player holds the active turn.
    pub fn is_players_turn(&self, player: &Player) -> bool {
        match self.phase {
            TurnPhase::AgentTurn => player.role == Role::Agent,
            TurnPhase::HunterTurn { index } => {
                self.hunter_order.get(index).is_some_and(|id| *id == player.id)
            }
            TurnPhase::Setup | TurnPhase::RoundEnd | TurnPhase::Completed => false,
        }
    }

    /// The id of the hunter whose turn it is, if a hunter is active.
    pub fn active_hunter(&self) -> Option<&PlayerId> {
        match self.phase {
            TurnPhase::HunterTurn { index } => self.hunter_order.get(index),
            _ => None,
        }
    }

    /// `AgentTurn -> HunterTurn(0)` after a validated agent action.
    pub(crate) fn advance_after_agent(&mut self) {
        debug_assert_eq!(self.phase, TurnPhase::AgentTurn);
        self.phase = TurnPhase::HunterTurn { index: 0 };
    }

    /// `HunterTurn(i) -> HunterTurn(i+1)`, or `RoundEnd` after the last
    /// hunter's action.
    pub(crate) fn advance_after_hunter(&mut self) {
        let TurnPhase::HunterTurn { index } = self.phase else {
            debug_assert!(false, "advance_after_hunter outside a hunter turn");
            return;
        };
        self.phase = if index + 1 < self.hunter_order.len() {
            TurnPhase::HunterTurn { index: index + 1 }
        } else {
            TurnPhase::RoundEnd
        };
    }

    /// `RoundEnd -> AgentTurn` for the next round.
    pub(crate) fn begin_round(&mut self) {
        debug_assert_eq!(self.phase, TurnPhase::RoundEnd);
        self.phase = TurnPhase::AgentTurn;
    }

    /// Short-circuits to `Completed` from any phase. Absorbing.
    pub(crate) fn complete(&mut self) {
        self.phase = TurnPhase::Completed;
    }
}

impl Default for TurnSequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> Player {
        Player::new("agent-1".to_string(), Role::Agent, None)
    }

    fn hunter(id: &str) -> Player {
        Player::new(id.to_string(), Role::Hunter, None)
    }

    fn started(hunters: &[&str]) -> TurnSequencer {
        let mut sequencer = TurnSequencer::new();
        for id in hunters {
            sequencer.register_hunter((*id).to_string());
        }
        sequencer.start();
        sequencer
    }

    #[test]
    fn full_cycle_visits_every_seat_once() {
        let mut sequencer = started(&["h1", "h2"]);
        assert!(sequencer.is_players_turn(&agent()));
        assert!(!sequencer.is_players_turn(&hunter("h1")));

        sequencer.advance_after_agent();
        assert_eq!(sequencer.active_hunter(), Some(&"h1".to_string()));
        assert!(!sequencer.is_players_turn(&hunter("h2")));

        sequencer.advance_after_hunter();
        assert_eq!(sequencer.active_hunter(), Some(&"h2".to_string()));

        sequencer.advance_after_hunter();
        assert_eq!(sequencer.phase(), TurnPhase::RoundEnd);

        sequencer.begin_round();
        assert!(sequencer.is_players_turn(&agent()));
    }

    #[test]
    fn nobody_moves_during_setup_or_round_end() {
        let sequencer = TurnSequencer::new();
        assert!(!sequencer.is_players_turn(&agent()));

        let mut sequencer = started(&["h1"]);
        sequencer.advance_after_agent();
        sequencer.advance_after_hunter();
        assert_eq!(sequencer.phase(), TurnPhase::RoundEnd);
        assert!(!sequencer.is_players_turn(&agent()));
        assert!(!sequencer.is_players_turn(&hunter("h1")));
    }

    #[test]
    fn completed_is_absorbing() {
        let mut sequencer = started(&["h1"]);
        sequencer.complete();
        assert_eq!(sequencer.phase(), TurnPhase::Completed);
        assert!(!sequencer.is_players_turn(&agent()));
        sequencer.complete();
        assert_eq!(sequencer.phase(), TurnPhase::Completed);
    }

    #[test]
    fn phase_serializes_with_tag() {
        let phase = TurnPhase::HunterTurn { index: 1 };
        let json = serde_json::to_string(&phase).unwrap();
        assert_eq!(json, "{\"phase\":\"hunter_turn\",\"index\":1}");
        let back: TurnPhase = serde_json::from_str(&json).unwrap();
        assert_eq!(back, phase);
    }
}
