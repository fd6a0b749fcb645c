//! Pure game logic: types, state, turn ordering, validation, visibility,
//! and equipment. Everything here is deterministic and free of I/O; the
//! session layer owns mutation and concurrency.

mod equipment;
mod sequencer;
mod state;
mod types;
pub mod validator;
pub mod visibility;

pub use equipment::{CardEffect, CardSpec, Mission};
pub use sequencer::{TurnPhase, TurnSequencer};
pub use state::{EquipmentState, GameState, MissionProgress};
pub use types::{
    CardId, GameStatus, ObjectiveId, Player, PlayerId, Position, Role, SessionId,
    SessionSettings, Variant, Winner,
};
pub use validator::{MoveOutcome, has_legal_move, validate_move, validate_pass};
pub use visibility::{FilteredSnapshot, VisibilityUpdate};
