//! External collaborator contracts: persistence and broadcast.
//!
//! The engine treats persistence as best-effort replication of in-memory
//! truth: snapshots are written fire-and-forget after each committed
//! mutation, and a collaborator failure never rolls back state. Failures are
//! reported through `tracing` warnings. Restore is the one synchronous read,
//! used when a session is rebuilt after a process restart.

use async_trait::async_trait;
use derive_more::{Display, Error};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

use crate::engine::{
    FilteredSnapshot, GameState, Player, PlayerId, SessionId, SessionSettings, TurnPhase,
};

/// Full, unfiltered snapshot of a session for the persistence collaborator.
///
/// Contains everything needed to rebuild the session: settings, roster,
/// game state, and the turn machine's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct SessionRecord {
    session_id: SessionId,
    settings: SessionSettings,
    players: Vec<Player>,
    state: GameState,
    phase: TurnPhase,
    hunter_order: Vec<PlayerId>,
}

impl SessionRecord {
    /// Assembles a record from a session's committed parts.
    pub(crate) fn new(
        session_id: SessionId,
        settings: SessionSettings,
        players: Vec<Player>,
        state: GameState,
        phase: TurnPhase,
        hunter_order: Vec<PlayerId>,
    ) -> Self {
        Self {
            session_id,
            settings,
            players,
            state,
            phase,
            hunter_order,
        }
    }
}

/// Failure reported by a persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("store error: {message}")]
pub struct StoreError {
    /// What went wrong, from the collaborator's point of view.
    #[error(not(source))]
    pub message: String,
}

impl StoreError {
    /// Creates a store error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Persistence collaborator: receives full snapshots, supplies restores.
///
/// Writes are fire-and-forget from the engine's perspective; a failed write
/// is logged and play continues.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Persists the latest full snapshot for a session.
    async fn persist(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Reads the last persisted snapshot, if one exists.
    async fn restore(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError>;
}

/// Broadcast collaborator: pushes per-recipient filtered views to clients.
///
/// Delivery semantics are the gateway's concern. The engine guarantees the
/// views it hands over never contain information the recipient is not
/// authorized to see, and that views for one player arrive in the order they
/// were produced.
#[async_trait]
pub trait BroadcastGateway: Send + Sync {
    /// Delivers one filtered view per connected player.
    async fn deliver(&self, session_id: &str, views: BTreeMap<PlayerId, FilteredSnapshot>);
}

/// Gateway that drops every view. Useful for headless and test sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGateway;

#[async_trait]
impl BroadcastGateway for NullGateway {
    async fn deliver(&self, session_id: &str, views: BTreeMap<PlayerId, FilteredSnapshot>) {
        debug!(session_id, recipients = views.len(), "Dropping views (null gateway)");
    }
}

/// In-memory store keeping the latest record per session.
///
/// Records round-trip through JSON so persistence stays honest about what
/// serialization preserves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: tokio::sync::Mutex<HashMap<SessionId, serde_json::Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn persist(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let value = serde_json::to_value(record)
            .map_err(|e| StoreError::new(format!("serialize failed: {e}")))?;
        let mut records = self.records.lock().await;
        records.insert(record.session_id().clone(), value);
        debug!(session_id = %record.session_id(), "Record persisted");
        Ok(())
    }

    async fn restore(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let records = self.records.lock().await;
        records
            .get(session_id)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|e| StoreError::new(format!("deserialize failed: {e}")))
            })
            .transpose()
    }
}
