//! Game Session: the aggregate root for one game in progress.
//!
//! A session owns one shared board reference, the mutable [`GameState`], and
//! the turn sequencer. All mutation goes through a single mutex, so commands
//! within one session are serialized while unrelated sessions run in
//! parallel. Committed mutations are handed to a per-session outbox task
//! that calls the persistence and broadcast collaborators off the hot path,
//! preserving the order views were produced in.

use derive_getters::Getters;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::board::Board;
use crate::collaborators::{BroadcastGateway, GameStore, SessionRecord};
use crate::engine::{
    CardEffect, FilteredSnapshot, GameState, GameStatus, Mission, Player, PlayerId, Position,
    Role, SessionId, SessionSettings, TurnPhase, TurnSequencer, VisibilityUpdate, Winner,
    validator, visibility,
};
use crate::error::{ConfigurationError, EngineError, RuleError, SessionError};

/// Result of consuming an equipment card.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct EquipmentOutcome {
    /// The effect that was applied.
    effect: CardEffect,
    /// Visibility decision and filtered views after the effect.
    update: VisibilityUpdate,
}

/// Work committed by a session, drained in order by its outbox task.
#[derive(Debug)]
pub(crate) enum SessionEvent {
    /// A mutation committed: persist the record, deliver the views.
    Committed {
        session_id: SessionId,
        views: BTreeMap<PlayerId, FilteredSnapshot>,
        record: SessionRecord,
    },
}

/// Handle to a session's outbox channel.
#[derive(Debug, Clone)]
pub(crate) struct SessionOutbox {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionOutbox {
    /// Spawns the forwarder task that drains committed events into the
    /// collaborators. Dropping the session drops the sender and ends the
    /// task, which cancels any pending deliveries on teardown.
    ///
    /// The forwarder runs on the ambient tokio runtime. Without one, the
    /// session still plays against in-memory state, but committed events
    /// never reach the collaborators; that degradation is logged once here.
    pub(crate) fn spawn(
        gateway: Arc<dyn BroadcastGateway>,
        store: Arc<dyn GameStore>,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let forwarder = async move {
            while let Some(event) = rx.recv().await {
                let SessionEvent::Committed {
                    session_id,
                    views,
                    record,
                } = event;
                if let Err(e) = store.persist(&record).await {
                    warn!(
                        session_id = %session_id,
                        error = %e,
                        "Persistence collaborator failed; in-memory state remains authoritative"
                    );
                }
                gateway.deliver(&session_id, views).await;
            }
            debug!("Session outbox drained and closed");
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(forwarder);
            }
            Err(_) => warn!(
                "No async runtime; persistence and broadcast are disabled for this session"
            ),
        }
        Self { tx }
    }

    /// An outbox with no forwarder; committed events are dropped.
    pub(crate) fn detached() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    fn send(&self, event: SessionEvent) {
        // A closed outbox means the session is being torn down; the
        // in-flight command still completes against in-memory state.
        if self.tx.send(event).is_err() {
            debug!("Outbox closed; dropping committed event");
        }
    }
}

/// Everything a session mutates, guarded by one mutex.
#[derive(Debug)]
struct SessionInner {
    players: Vec<Player>,
    state: GameState,
    sequencer: TurnSequencer,
}

/// One complete, independent instance of a game in progress.
pub struct GameSession {
    id: SessionId,
    settings: SessionSettings,
    board: Arc<Board>,
    mission: Mission,
    inner: Mutex<SessionInner>,
    outbox: SessionOutbox,
}

impl GameSession {
    /// Creates a session wired to an outbox.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::HunterCountUnsupported`] if the board
    /// has fewer start positions than the settings request.
    #[instrument(skip(settings, board, mission, outbox), fields(session_id = %id))]
    pub(crate) fn new(
        id: SessionId,
        settings: SessionSettings,
        board: Arc<Board>,
        mission: Mission,
        outbox: SessionOutbox,
    ) -> Result<Self, ConfigurationError> {
        let requested = *settings.hunter_count();
        let max = board.hunter_starts().len();
        if requested == 0 || requested > max {
            return Err(ConfigurationError::HunterCountUnsupported { requested, max });
        }
        let state = GameState::new(&board, mission.loadout(*settings.variant()));
        info!(
            board = %board.board_type(),
            mission = %mission.id,
            hunters = requested,
            "Session created"
        );
        Ok(Self {
            id,
            settings,
            board,
            mission,
            inner: Mutex::new(SessionInner {
                players: Vec::new(),
                state,
                sequencer: TurnSequencer::new(),
            }),
            outbox,
        })
    }

    /// Creates a session with no collaborators attached.
    ///
    /// Committed snapshots are dropped. For tools and tests that drive the
    /// engine directly; live sessions come from the registry.
    ///
    /// # Errors
    ///
    /// Same as session creation through the registry.
    pub fn standalone(
        id: SessionId,
        settings: SessionSettings,
        board: Arc<Board>,
        mission: Mission,
    ) -> Result<Self, ConfigurationError> {
        Self::new(id, settings, board, mission, SessionOutbox::detached())
    }

    /// Rebuilds a session from a persisted record.
    pub(crate) fn from_record(
        record: SessionRecord,
        board: Arc<Board>,
        mission: Mission,
        outbox: SessionOutbox,
    ) -> Self {
        let sequencer =
            TurnSequencer::from_parts(*record.phase(), record.hunter_order().clone());
        Self {
            id: record.session_id().clone(),
            settings: record.settings().clone(),
            board,
            mission,
            inner: Mutex::new(SessionInner {
                players: record.players().clone(),
                state: record.state().clone(),
                sequencer,
            }),
            outbox,
        }
    }

    /// The session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The settings fixed at creation.
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// The shared, immutable board.
    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seats a player, or reconnects one who already holds a seat.
    ///
    /// When the last required seat fills, the turn order starts with the
    /// agent. The game's status flips to in-progress on the first accepted
    /// action, not on the final join.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyStarted`] after play begins,
    /// [`SessionError::SeatTaken`] for a second agent,
    /// [`SessionError::RosterFull`] when hunter seats are exhausted.
    #[instrument(skip(self, character_id), fields(session_id = %self.id, player_id = %player_id))]
    pub fn join(
        &self,
        player_id: PlayerId,
        role: Role,
        character_id: Option<String>,
    ) -> Result<FilteredSnapshot, EngineError> {
        let mut inner = self.lock();

        if let Some(existing) = inner.players.iter_mut().find(|p| p.id == player_id) {
            if existing.role != role {
                return Err(SessionError::SeatTaken.into());
            }
            existing.is_active = true;
            info!("Player reconnected");
            let snapshot = self.snapshot_of(&inner, &player_id)?;
            self.commit(&inner);
            return Ok(snapshot);
        }

        if inner.state.status() != GameStatus::Setup {
            return Err(SessionError::AlreadyStarted.into());
        }

        match role {
            Role::Agent => {
                if inner.players.iter().any(|p| p.role == Role::Agent) {
                    return Err(SessionError::SeatTaken.into());
                }
            }
            Role::Hunter => {
                let seated = inner
                    .players
                    .iter()
                    .filter(|p| p.role == Role::Hunter)
                    .count();
                if seated >= *self.settings.hunter_count() {
                    return Err(SessionError::RosterFull.into());
                }
                let start = self.board.hunter_starts()[seated];
                inner
                    .state
                    .hunter_positions
                    .insert(player_id.clone(), start);
                inner.sequencer.register_hunter(player_id.clone());
            }
        }

        inner
            .players
            .push(Player::new(player_id.clone(), role, character_id));
        info!(?role, seated = inner.players.len(), "Player joined");

        let agent_seated = inner.players.iter().any(|p| p.role == Role::Agent);
        let hunters_seated = inner
            .players
            .iter()
            .filter(|p| p.role == Role::Hunter)
            .count();
        if agent_seated && hunters_seated == *self.settings.hunter_count() {
            inner.sequencer.start();
            info!("All seats filled; agent to move");
        }

        let snapshot = self.snapshot_of(&inner, &player_id)?;
        self.commit(&inner);
        Ok(snapshot)
    }

    /// Marks a player disconnected. Their seat and role survive; a timeout
    /// collaborator passes or forfeits on their behalf.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownPlayer`] if the player never joined.
    #[instrument(skip(self), fields(session_id = %self.id, player_id = %player_id))]
    pub fn leave(&self, player_id: &str) -> Result<(), EngineError> {
        let mut inner = self.lock();
        let player = inner
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))?;
        player.is_active = false;
        info!("Player disconnected");
        self.commit(&inner);
        Ok(())
    }

    /// The single mutating entry point for movement.
    ///
    /// Sequences validation, state mutation, visibility resolution, and the
    /// turn transition as one atomic unit under the session lock. On
    /// success the committed views are also queued for the broadcast
    /// gateway and the full record for the persistence collaborator.
    ///
    /// # Errors
    ///
    /// [`RuleError::GameAlreadyCompleted`] once terminal, otherwise a
    /// [`crate::error::ValidationError`] per the validation rules. No state
    /// mutation occurs on rejection.
    #[instrument(skip(self), fields(session_id = %self.id, player_id = %player_id, %from, %to))]
    pub fn submit_move(
        &self,
        player_id: &str,
        from: Position,
        to: Position,
    ) -> Result<VisibilityUpdate, EngineError> {
        let mut inner = self.lock();
        let player = self.active_roster_entry(&inner, player_id)?;

        let outcome = validator::validate_move(
            &self.board,
            &inner.state,
            &inner.sequencer,
            &player,
            from,
            to,
        )?;

        self.mark_started(&mut inner);
        match player.role {
            Role::Agent => {
                inner.state.agent_position = to;
                if let Some(objective) = self.board.objective_at(to).cloned() {
                    if inner.state.mission.complete(objective.clone()) {
                        info!(
                            objective = %objective,
                            completed = inner.state.mission.objectives_completed(),
                            "Objective completed"
                        );
                    }
                }
                let revealed = visibility::resolve_reveal(&self.board, &inner.state);
                inner.state.agent_revealed = revealed;
                if outcome.contact {
                    debug!(revealed, "Agent entered a hunter's cell");
                }
            }
            Role::Hunter => {
                inner.state.hunter_positions.insert(player.id.clone(), to);
            }
        }

        self.evaluate_terminal(&mut inner);
        self.advance(&mut inner, &player);

        let update = self.update_of(&inner);
        self.commit(&inner);
        Ok(update)
    }

    /// Accepts a pass: the seat's turn is spent without moving.
    ///
    /// Used when a player has no legal move, and by the timeout
    /// collaborator on behalf of disconnected players.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::submit_move`]; a pass with a legal move
    /// remaining is rejected unless the settings allow the agent to pass.
    #[instrument(skip(self), fields(session_id = %self.id, player_id = %player_id))]
    pub fn pass(&self, player_id: &str) -> Result<VisibilityUpdate, EngineError> {
        let mut inner = self.lock();
        let player = self.active_roster_entry(&inner, player_id)?;

        validator::validate_pass(
            &self.board,
            &inner.state,
            &inner.sequencer,
            &player,
            *self.settings.allow_agent_pass(),
        )?;

        self.mark_started(&mut inner);
        if player.role == Role::Agent {
            // A pass spends the whole turn; banked extra moves do not carry.
            inner.state.extra_moves = 0;
        }
        debug!(role = ?player.role, "Turn passed");
        self.advance(&mut inner, &player);

        let update = self.update_of(&inner);
        self.commit(&inner);
        Ok(update)
    }

    /// Concedes on behalf of a player.
    ///
    /// A forfeiting agent hands the win to the hunters. A forfeiting hunter
    /// drops out of pursuit; if every hunter has forfeited the agent
    /// escapes.
    ///
    /// # Errors
    ///
    /// [`RuleError::GameAlreadyCompleted`] once terminal,
    /// [`SessionError::UnknownPlayer`] if the player never joined.
    #[instrument(skip(self), fields(session_id = %self.id, player_id = %player_id))]
    pub fn forfeit(&self, player_id: &str) -> Result<VisibilityUpdate, EngineError> {
        let mut inner = self.lock();
        if inner.state.status() == GameStatus::Completed {
            return Err(RuleError::GameAlreadyCompleted.into());
        }
        let player = inner
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))?;
        player.is_active = false;
        let role = player.role;
        info!(?role, "Player forfeited");

        self.mark_started(&mut inner);
        match role {
            Role::Agent => {
                inner.state.complete(Winner::Hunters);
                inner.sequencer.complete();
            }
            Role::Hunter => {
                let pursuit_remains = inner
                    .players
                    .iter()
                    .any(|p| p.role == Role::Hunter && p.is_active);
                if !pursuit_remains {
                    inner.state.complete(Winner::Agent);
                    inner.sequencer.complete();
                }
            }
        }

        let update = self.update_of(&inner);
        self.commit(&inner);
        Ok(update)
    }

    /// Consumes a held equipment card and applies its effect.
    ///
    /// # Errors
    ///
    /// [`RuleError::CardNotHeld`] if the card is not in the caller's pool,
    /// [`RuleError::NotUsableNow`] if it is not the caller's turn or the
    /// effect cannot apply, [`RuleError::GameAlreadyCompleted`] once
    /// terminal.
    #[instrument(skip(self), fields(session_id = %self.id, player_id = %player_id, card_id = %card_id))]
    pub fn use_equipment(
        &self,
        player_id: &str,
        card_id: &str,
    ) -> Result<EquipmentOutcome, EngineError> {
        let mut inner = self.lock();
        let player = self.active_roster_entry(&inner, player_id)?;

        let spec = self
            .mission
            .card(card_id)
            .filter(|spec| spec.role == player.role)
            .ok_or(RuleError::CardNotHeld)?;
        if !inner
            .state
            .equipment
            .cards_for(player.role)
            .contains(&card_id.to_string())
        {
            return Err(RuleError::CardNotHeld.into());
        }
        if !inner.sequencer.is_players_turn(&player) {
            return Err(RuleError::NotUsableNow.into());
        }

        let effect = spec.effect;
        match effect {
            CardEffect::SuppressReveal => {
                if inner.state.reveal_suppressed {
                    return Err(RuleError::NotUsableNow.into());
                }
                inner.state.reveal_suppressed = true;
                inner.state.agent_revealed = false;
            }
            CardEffect::ForceReveal => {
                if inner.state.agent_revealed || inner.state.reveal_suppressed {
                    return Err(RuleError::NotUsableNow.into());
                }
                inner.state.agent_revealed = true;
            }
            CardEffect::ExtraMove => {
                inner.state.extra_moves += 1;
            }
        }

        let consumed = inner.state.equipment.consume(player.role, card_id);
        debug_assert!(consumed);
        info!(?effect, "Equipment card consumed");

        // A forced reveal can complete a capture on the spot.
        self.evaluate_terminal(&mut inner);

        let update = self.update_of(&inner);
        self.commit(&inner);
        Ok(EquipmentOutcome { effect, update })
    }

    /// The latest committed view for one player. Read-only; waits behind at
    /// most the in-flight mutation.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownPlayer`] if the player never joined.
    pub fn snapshot(&self, player_id: &str) -> Result<FilteredSnapshot, EngineError> {
        let inner = self.lock();
        self.snapshot_of(&inner, player_id)
    }

    /// The full, unfiltered record of the session for persistence.
    pub fn record(&self) -> SessionRecord {
        let inner = self.lock();
        self.record_of(&inner)
    }

    /// The current roster, in registration order.
    pub fn roster(&self) -> Vec<Player> {
        self.lock().players.clone()
    }

    // ─────────────────────────────────────────────────────────────
    //  Internals, all called under the session lock
    // ─────────────────────────────────────────────────────────────

    /// Looks up the roster entry for a command, rejecting terminal sessions.
    fn active_roster_entry(
        &self,
        inner: &SessionInner,
        player_id: &str,
    ) -> Result<Player, EngineError> {
        if inner.state.status() == GameStatus::Completed {
            return Err(RuleError::GameAlreadyCompleted.into());
        }
        inner
            .players
            .iter()
            .find(|p| p.id == player_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()).into())
    }

    /// Flips setup to in-progress on the first accepted action.
    fn mark_started(&self, inner: &mut SessionInner) {
        if inner.state.status == GameStatus::Setup {
            inner.state.status = GameStatus::InProgress;
            info!(session_id = %self.id, "Game underway");
        }
    }

    /// Evaluates terminal conditions after a mutation. Capture takes
    /// precedence; objective completion follows; round exhaustion is
    /// checked at round end in [`Self::advance`].
    fn evaluate_terminal(&self, inner: &mut SessionInner) {
        if inner.state.status() == GameStatus::Completed {
            return;
        }
        let captured = inner.state.agent_revealed
            && inner
                .state
                .hunter_positions
                .values()
                .any(|hunter| *hunter == inner.state.agent_position);
        if captured {
            info!(session_id = %self.id, round = inner.state.current_round, "Agent captured");
            inner.state.complete(Winner::Hunters);
            inner.sequencer.complete();
            return;
        }
        if inner.state.mission.total_objectives() > 0 && inner.state.mission.is_complete() {
            info!(session_id = %self.id, "All objectives complete");
            inner.state.complete(Winner::Agent);
            inner.sequencer.complete();
        }
    }

    /// Advances the turn machine after an accepted action, rolling the
    /// round over and checking exhaustion when the last hunter has acted.
    fn advance(&self, inner: &mut SessionInner, player: &Player) {
        if inner.state.status() == GameStatus::Completed {
            return;
        }
        match player.role {
            Role::Agent => {
                if inner.state.extra_moves > 0 {
                    inner.state.extra_moves -= 1;
                    debug!(
                        remaining = inner.state.extra_moves,
                        "Extra move: agent acts again"
                    );
                } else {
                    inner.sequencer.advance_after_agent();
                }
            }
            Role::Hunter => {
                inner.sequencer.advance_after_hunter();
                if inner.sequencer.phase() == TurnPhase::RoundEnd {
                    self.end_round(inner);
                }
            }
        }
    }

    /// Rolls the round counter. The agent escapes by survival once the
    /// round limit is exhausted without a capture.
    fn end_round(&self, inner: &mut SessionInner) {
        let next = inner.state.current_round + 1;
        if next > *self.settings.max_rounds() {
            info!(
                session_id = %self.id,
                rounds = inner.state.current_round,
                "Round limit reached; agent escaped"
            );
            inner.state.complete(Winner::Agent);
            inner.sequencer.complete();
            return;
        }
        debug!(round = next, "Round begins");
        inner.state.begin_round(next);
        inner.sequencer.begin_round();
    }

    fn snapshot_of(
        &self,
        inner: &SessionInner,
        player_id: &str,
    ) -> Result<FilteredSnapshot, EngineError> {
        let player = inner
            .players
            .iter()
            .find(|p| p.id == player_id)
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))?;
        Ok(visibility::snapshot_for(
            &self.id,
            self.board.board_type(),
            &inner.state,
            player,
        ))
    }

    fn update_of(&self, inner: &SessionInner) -> VisibilityUpdate {
        let views = visibility::views(
            &self.id,
            self.board.board_type(),
            &inner.state,
            &inner.players,
        );
        VisibilityUpdate::new(inner.state.agent_revealed, views)
    }

    fn record_of(&self, inner: &SessionInner) -> SessionRecord {
        SessionRecord::new(
            self.id.clone(),
            self.settings.clone(),
            inner.players.clone(),
            inner.state.clone(),
            inner.sequencer.phase(),
            inner.sequencer.hunter_order().to_vec(),
        )
    }

    fn commit(&self, inner: &SessionInner) {
        let views = visibility::views(
            &self.id,
            self.board.board_type(),
            &inner.state,
            &inner.players,
        );
        self.outbox.send(SessionEvent::Committed {
            session_id: self.id.clone(),
            views,
            record: self.record_of(inner),
        });
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("board", &self.board.board_type())
            .finish_non_exhaustive()
    }
}
