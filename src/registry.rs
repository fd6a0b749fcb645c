//! Session Registry: process-wide map of live sessions, and the
//! transport-independent command contract.
//!
//! The registry's lock guards only map operations; sessions are shared as
//! `Arc` so commands against different sessions proceed in parallel while
//! each session serializes its own mutations internally.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::board::Board;
use crate::collaborators::{BroadcastGateway, GameStore};
use crate::engine::{
    CardId, FilteredSnapshot, Mission, PlayerId, Position, Role, SessionId, SessionSettings,
    VisibilityUpdate,
};
use crate::error::{EngineError, SessionError};
use crate::session::{EquipmentOutcome, GameSession, SessionOutbox};

/// A validated client command, independent of transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Creates a session (idempotent per identifier).
    CreateSession {
        /// Session to create.
        session_id: SessionId,
        /// Settings fixed for the session's lifetime.
        settings: SessionSettings,
    },
    /// Seats a player in an existing session.
    JoinSession {
        /// Session to join.
        session_id: SessionId,
        /// Player taking the seat.
        player_id: PlayerId,
        /// Role requested for the session's lifetime.
        role: Role,
        /// Optional character selection.
        character_id: Option<String>,
    },
    /// Moves a player one cell.
    SubmitMove {
        /// Session the move applies to.
        session_id: SessionId,
        /// Player moving.
        player_id: PlayerId,
        /// The client's belief of its current cell; drift is rejected.
        from: Position,
        /// Destination cell.
        to: Position,
    },
    /// Consumes an equipment card.
    UseEquipment {
        /// Session the card is used in.
        session_id: SessionId,
        /// Player using the card.
        player_id: PlayerId,
        /// Card to consume.
        card_id: CardId,
    },
    /// Marks a player disconnected.
    LeaveSession {
        /// Session being left.
        session_id: SessionId,
        /// Player leaving.
        player_id: PlayerId,
    },
    /// Spends the active turn without moving. Injected by the timeout
    /// collaborator for disconnected players, or sent by a player with no
    /// legal move.
    Pass {
        /// Session the pass applies to.
        session_id: SessionId,
        /// Player passing.
        player_id: PlayerId,
    },
    /// Concedes on behalf of a player.
    Forfeit {
        /// Session the forfeit applies to.
        session_id: SessionId,
        /// Player conceding.
        player_id: PlayerId,
    },
}

/// Successful result of a dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Session exists (created now or previously).
    SessionCreated(SessionId),
    /// Player seated; their filtered view of the game.
    Joined(FilteredSnapshot),
    /// Move committed; visibility decision and views.
    Moved(VisibilityUpdate),
    /// Card consumed; applied effect and views.
    EquipmentUsed(EquipmentOutcome),
    /// Player marked disconnected.
    Left,
    /// Turn passed; views after the turn advanced.
    Passed(VisibilityUpdate),
    /// Forfeit processed; views after any resulting completion.
    Forfeited(VisibilityUpdate),
}

/// Process-wide mapping from session identifier to live session.
///
/// Collaborator forwarding (persistence and broadcast) runs on the ambient
/// tokio runtime. A registry driven entirely from synchronous code still
/// works against in-memory state; committed events are then dropped with a
/// warning instead of reaching the collaborators.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<GameSession>>>,
    gateway: Arc<dyn BroadcastGateway>,
    store: Arc<dyn GameStore>,
}

impl SessionRegistry {
    /// Creates a registry wired to the given collaborators.
    #[instrument(skip(gateway, store))]
    pub fn new(gateway: Arc<dyn BroadcastGateway>, store: Arc<dyn GameStore>) -> Self {
        info!("Creating session registry");
        Self {
            sessions: Mutex::new(HashMap::new()),
            gateway,
            store,
        }
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Arc<GameSession>>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Creates a session, or returns the existing one for the identifier.
    ///
    /// Creation is idempotent per identifier: a duplicate create returns
    /// the live session rather than erroring, so racing creates from two
    /// clients both succeed.
    ///
    /// # Errors
    ///
    /// [`crate::error::ConfigurationError`] for an unknown board type or
    /// mission, or an unsupported hunter count. Creation failure leaves no
    /// registry entry behind.
    #[instrument(skip(self, settings), fields(session_id = %session_id))]
    pub fn create_session(
        &self,
        session_id: SessionId,
        settings: SessionSettings,
    ) -> Result<Arc<GameSession>, EngineError> {
        // Board and mission load before taking the map lock; failures are
        // fatal at creation time.
        let board = Board::load(*settings.board())?;
        let mission = Mission::load(settings.mission_id())?;

        let mut sessions = self.map();
        if let Some(existing) = sessions.get(&session_id) {
            debug!("Duplicate create; returning existing session");
            return Ok(Arc::clone(existing));
        }

        let outbox = SessionOutbox::spawn(Arc::clone(&self.gateway), Arc::clone(&self.store));
        let session = Arc::new(GameSession::new(
            session_id.clone(),
            settings,
            board,
            mission,
            outbox,
        )?);
        sessions.insert(session_id, Arc::clone(&session));
        info!(live_sessions = sessions.len(), "Session registered");
        Ok(session)
    }

    /// Looks up a live session.
    pub fn get(&self, session_id: &str) -> Option<Arc<GameSession>> {
        self.map().get(session_id).cloned()
    }

    /// Live session identifiers.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.map().keys().cloned().collect()
    }

    /// Tears a session down. Its outbox closes once in-flight commands
    /// finish, cancelling pending deliveries. Returns false if the session
    /// was already gone.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn remove_session(&self, session_id: &str) -> bool {
        let removed = self.map().remove(session_id).is_some();
        if removed {
            info!("Session removed");
        } else {
            debug!("Remove requested for unknown session");
        }
        removed
    }

    /// Rebuilds a session from the persistence collaborator after a
    /// process restart. Returns `None` if the store has no record.
    ///
    /// # Errors
    ///
    /// Configuration errors from board or mission loading, and
    /// [`SessionError::SessionGone`] if the store read fails.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn restore_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Arc<GameSession>>, EngineError> {
        if let Some(existing) = self.get(session_id) {
            return Ok(Some(existing));
        }
        let record = self.store.restore(session_id).await.map_err(|e| {
            warn!(error = %e, "Restore read failed");
            SessionError::SessionGone
        })?;
        let Some(record) = record else {
            debug!("No persisted record to restore");
            return Ok(None);
        };

        let board = Board::load(*record.settings().board())?;
        let mission = Mission::load(record.settings().mission_id())?;
        let outbox = SessionOutbox::spawn(Arc::clone(&self.gateway), Arc::clone(&self.store));
        let session = Arc::new(GameSession::from_record(record, board, mission, outbox));

        let mut sessions = self.map();
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::clone(&session));
        info!("Session restored");
        Ok(Some(Arc::clone(entry)))
    }

    /// Applies one command, returning its outcome or a typed error.
    ///
    /// Commands against a torn-down session return
    /// [`SessionError::SessionGone`] rather than corrupting anything.
    ///
    /// # Errors
    ///
    /// The full taxonomy of [`EngineError`], per command.
    #[instrument(skip(self, command))]
    pub fn dispatch(&self, command: Command) -> Result<CommandOutcome, EngineError> {
        match command {
            Command::CreateSession {
                session_id,
                settings,
            } => {
                let session = self.create_session(session_id, settings)?;
                Ok(CommandOutcome::SessionCreated(session.id().clone()))
            }
            Command::JoinSession {
                session_id,
                player_id,
                role,
                character_id,
            } => {
                let session = self.live(&session_id)?;
                let snapshot = session.join(player_id, role, character_id)?;
                Ok(CommandOutcome::Joined(snapshot))
            }
            Command::SubmitMove {
                session_id,
                player_id,
                from,
                to,
            } => {
                let session = self.live(&session_id)?;
                let update = session.submit_move(&player_id, from, to)?;
                Ok(CommandOutcome::Moved(update))
            }
            Command::UseEquipment {
                session_id,
                player_id,
                card_id,
            } => {
                let session = self.live(&session_id)?;
                let outcome = session.use_equipment(&player_id, &card_id)?;
                Ok(CommandOutcome::EquipmentUsed(outcome))
            }
            Command::LeaveSession {
                session_id,
                player_id,
            } => {
                let session = self.live(&session_id)?;
                session.leave(&player_id)?;
                Ok(CommandOutcome::Left)
            }
            Command::Pass {
                session_id,
                player_id,
            } => {
                let session = self.live(&session_id)?;
                let update = session.pass(&player_id)?;
                Ok(CommandOutcome::Passed(update))
            }
            Command::Forfeit {
                session_id,
                player_id,
            } => {
                let session = self.live(&session_id)?;
                let update = session.forfeit(&player_id)?;
                Ok(CommandOutcome::Forfeited(update))
            }
        }
    }

    fn live(&self, session_id: &str) -> Result<Arc<GameSession>, EngineError> {
        self.get(session_id)
            .ok_or_else(|| SessionError::SessionGone.into())
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("live_sessions", &self.map().len())
            .finish_non_exhaustive()
    }
}
