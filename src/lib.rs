//! Specter Engine - session engine for an asymmetric hidden-movement
//! pursuit game.
//!
//! One covert "agent" crosses a board pursuing objectives while a team of
//! "hunters" tries to intercept them before the round limit expires. The
//! engine enforces movement legality, hidden-information filtering, turn
//! ordering, and win conditions; transport, persistence mechanics, and
//! rendering are external collaborators.
//!
//! # Architecture
//!
//! - **Board**: immutable per-board-type geometry, loaded from declarative
//!   TOML definitions and shared across sessions
//! - **Engine**: pure game logic - validation, visibility filtering, the
//!   turn state machine, and equipment effects
//! - **Session**: the aggregate root; serializes mutation and hands
//!   committed snapshots to the broadcast and persistence collaborators
//! - **Registry**: concurrent map of live sessions and the
//!   transport-independent command contract
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use specter_engine::{
//!     BoardType, Command, MemoryStore, NullGateway, Role, SessionRegistry,
//!     SessionSettings,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = SessionRegistry::new(Arc::new(NullGateway), Arc::new(MemoryStore::new()));
//!
//! let settings = SessionSettings::new(BoardType::Museum, "gallery-heist", 20, 3);
//! registry.dispatch(Command::CreateSession {
//!     session_id: "match-1".to_string(),
//!     settings,
//! })?;
//! registry.dispatch(Command::JoinSession {
//!     session_id: "match-1".to_string(),
//!     player_id: "ghost".to_string(),
//!     role: Role::Agent,
//!     character_id: None,
//! })?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod board;
mod collaborators;
mod engine;
mod error;
mod registry;
mod session;

// Crate-level exports - Board model
pub use board::{Board, BoardDefinition, BoardType, ObjectiveDefinition};

// Crate-level exports - Collaborator contracts
pub use collaborators::{
    BroadcastGateway, GameStore, MemoryStore, NullGateway, SessionRecord, StoreError,
};

// Crate-level exports - Engine types and pure logic
pub use engine::{
    CardEffect, CardId, CardSpec, EquipmentState, FilteredSnapshot, GameState, GameStatus,
    Mission, MissionProgress, MoveOutcome, ObjectiveId, Player, PlayerId, Position, Role,
    SessionId, SessionSettings, TurnPhase, TurnSequencer, Variant, VisibilityUpdate, Winner,
    has_legal_move, validate_move, validate_pass,
};
pub use engine::{validator, visibility};

// Crate-level exports - Errors
pub use error::{
    ConfigurationError, EngineError, RuleError, SessionError, ValidationError,
};

// Crate-level exports - Session and registry
pub use registry::{Command, CommandOutcome, SessionRegistry};
pub use session::{EquipmentOutcome, GameSession};
