//! Core domain types shared across the engine.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::board::BoardType;

/// Unique identifier for a game session.
pub type SessionId = String;

/// Unique identifier for a player.
pub type PlayerId = String;

/// Stable identifier for a board objective.
pub type ObjectiveId = String;

/// Identifier for an equipment card.
pub type CardId = String;

/// A cell on the board grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, new,
)]
pub struct Position {
    /// Column, increasing to the right.
    pub x: i32,
    /// Row, increasing downward.
    pub y: i32,
}

impl Position {
    /// Grid distance ignoring walls (|dx| + |dy|).
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The four orthogonal neighbors, without any board legality check.
    pub fn orthogonal(self) -> [Position; 4] {
        [
            Position::new(self.x, self.y - 1),
            Position::new(self.x, self.y + 1),
            Position::new(self.x - 1, self.y),
            Position::new(self.x + 1, self.y),
        ]
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Role a player holds for the lifetime of a session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// The single hidden-movement player being pursued.
    Agent,
    /// One of several pursuing players; always positionally visible.
    Hunter,
}

/// Lifecycle status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Players are still joining.
    Setup,
    /// The first move has been accepted; play is underway.
    InProgress,
    /// A terminal condition fired; no further commands are processed.
    Completed,
}

/// The side that won a completed game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    /// The agent escaped or completed every objective.
    Agent,
    /// A hunter captured the agent.
    Hunters,
}

/// Rules variant selected at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Baseline rules.
    Standard,
    /// Advanced rules (expanded equipment pools).
    Advanced,
}

/// A player seated in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Player {
    /// Player's unique ID.
    pub id: PlayerId,
    /// Role held for the session's lifetime.
    pub role: Role,
    /// Optional character selection.
    pub character_id: Option<String>,
    /// Whether the player is currently connected.
    #[new(value = "true")]
    pub is_active: bool,
}

/// Settings fixed at session creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct SessionSettings {
    board: BoardType,
    mission_id: String,
    max_rounds: u32,
    hunter_count: usize,
    #[serde(default = "default_variant")]
    variant: Variant,
    /// Whether the agent may pass voluntarily while legal moves remain.
    #[serde(default)]
    allow_agent_pass: bool,
}

fn default_variant() -> Variant {
    Variant::Standard
}

impl SessionSettings {
    /// Creates settings with the standard variant and voluntary passing off.
    pub fn new(
        board: BoardType,
        mission_id: impl Into<String>,
        max_rounds: u32,
        hunter_count: usize,
    ) -> Self {
        Self {
            board,
            mission_id: mission_id.into(),
            max_rounds,
            hunter_count,
            variant: Variant::Standard,
            allow_agent_pass: false,
        }
    }

    /// Selects a rules variant.
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Permits the agent to pass while legal moves remain.
    pub fn with_agent_pass(mut self) -> Self {
        self.allow_agent_pass = true;
        self
    }
}
