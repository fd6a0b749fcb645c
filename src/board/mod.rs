//! Board Model: the static, immutable geometry a session plays on.
//!
//! A [`Board`] is built once from a [`BoardDefinition`] and shared read-only
//! across every session using that layout. All queries are pure.

mod definition;
mod types;

pub use definition::{BoardDefinition, ObjectiveDefinition};
pub use types::BoardType;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info, instrument};

use crate::engine::{ObjectiveId, Position};
use crate::error::ConfigurationError;

/// Embedded layout for the named board type.
fn embedded_definition(board_type: BoardType) -> &'static str {
    match board_type {
        BoardType::Museum => include_str!("../../boards/museum.toml"),
        BoardType::Facility => include_str!("../../boards/facility.toml"),
    }
}

/// Static board geometry: walkable cells, walls, objectives, noisy cells,
/// and start positions. Immutable after construction.
#[derive(Debug)]
pub struct Board {
    board_type: BoardType,
    walkable: HashSet<Position>,
    walls: HashSet<(Position, Position)>,
    objectives: BTreeMap<Position, ObjectiveId>,
    noisy: HashSet<Position>,
    reveal_proximity: u32,
    agent_start: Position,
    hunter_starts: Vec<Position>,
}

/// Orders a wall edge so lookup is independent of traversal direction.
fn edge(a: Position, b: Position) -> (Position, Position) {
    if a <= b { (a, b) } else { (b, a) }
}

fn cell(pair: [i32; 2]) -> Position {
    Position::new(pair[0], pair[1])
}

impl Board {
    /// Loads the board for a recognized board type.
    ///
    /// Boards are parsed once per process and shared as `Arc` across all
    /// sessions of the same type; concurrent readers need no synchronization.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the embedded definition is invalid.
    #[instrument]
    pub fn load(board_type: BoardType) -> Result<Arc<Board>, ConfigurationError> {
        static CACHE: OnceLock<Mutex<HashMap<BoardType, Arc<Board>>>> = OnceLock::new();
        let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

        let mut cache = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(board) = cache.get(&board_type) {
            debug!(%board_type, "Board served from cache");
            return Ok(Arc::clone(board));
        }

        let definition = BoardDefinition::from_toml(embedded_definition(board_type))?;
        let board = Arc::new(Board::from_definition(board_type, &definition)?);
        cache.insert(board_type, Arc::clone(&board));
        info!(%board_type, cells = board.walkable.len(), "Board loaded");
        Ok(board)
    }

    /// Builds a board from a parsed definition, validating its structure.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidBoardDefinition`] if any start
    /// position, wall endpoint, noisy cell, or objective falls outside the
    /// walkable area, or if objective identifiers repeat.
    #[instrument(skip(definition), fields(name = %definition.name))]
    pub fn from_definition(
        board_type: BoardType,
        definition: &BoardDefinition,
    ) -> Result<Board, ConfigurationError> {
        if definition.width <= 0 || definition.height <= 0 {
            return Err(ConfigurationError::InvalidBoardDefinition(
                "board dimensions must be positive".to_string(),
            ));
        }

        let blocked: HashSet<Position> = definition.blocked.iter().copied().map(cell).collect();
        let mut walkable = HashSet::new();
        for x in 0..definition.width {
            for y in 0..definition.height {
                let position = Position::new(x, y);
                if !blocked.contains(&position) {
                    walkable.insert(position);
                }
            }
        }

        let require_walkable = |position: Position, what: &str| {
            if walkable.contains(&position) {
                Ok(())
            } else {
                Err(ConfigurationError::InvalidBoardDefinition(format!(
                    "{what} {position} is not a walkable cell"
                )))
            }
        };

        let agent_start = cell(definition.agent_start);
        require_walkable(agent_start, "agent start")?;

        let mut hunter_starts = Vec::with_capacity(definition.hunter_starts.len());
        for start in &definition.hunter_starts {
            let position = cell(*start);
            require_walkable(position, "hunter start")?;
            hunter_starts.push(position);
        }
        if hunter_starts.is_empty() {
            return Err(ConfigurationError::InvalidBoardDefinition(
                "at least one hunter start position is required".to_string(),
            ));
        }

        let mut walls = HashSet::new();
        for [a, b] in &definition.walls {
            let (a, b) = (cell(*a), cell(*b));
            require_walkable(a, "wall endpoint")?;
            require_walkable(b, "wall endpoint")?;
            if a.manhattan_distance(b) != 1 {
                return Err(ConfigurationError::InvalidBoardDefinition(format!(
                    "wall {a}-{b} does not join adjacent cells"
                )));
            }
            walls.insert(edge(a, b));
        }

        let mut noisy = HashSet::new();
        for position in definition.noisy.iter().copied().map(cell) {
            require_walkable(position, "noisy cell")?;
            noisy.insert(position);
        }

        let mut objectives = BTreeMap::new();
        let mut seen_ids = HashSet::new();
        for objective in &definition.objectives {
            let position = cell(objective.at);
            require_walkable(position, "objective")?;
            if !seen_ids.insert(objective.id.clone()) {
                return Err(ConfigurationError::InvalidBoardDefinition(format!(
                    "duplicate objective id '{}'",
                    objective.id
                )));
            }
            objectives.insert(position, objective.id.clone());
        }

        Ok(Board {
            board_type,
            walkable,
            walls,
            objectives,
            noisy,
            reveal_proximity: definition.reveal_proximity,
            agent_start,
            hunter_starts,
        })
    }

    /// The board type this layout was loaded for.
    pub fn board_type(&self) -> BoardType {
        self.board_type
    }

    /// Whether the cell is on the walkable grid.
    pub fn is_walkable(&self, position: Position) -> bool {
        self.walkable.contains(&position)
    }

    /// Whether a wall lies between two adjacent cells.
    pub fn is_blocked(&self, a: Position, b: Position) -> bool {
        self.walls.contains(&edge(a, b))
    }

    /// Cells reachable from `position` in one step, excluding blocked edges.
    pub fn neighbors(&self, position: Position) -> Vec<Position> {
        position
            .orthogonal()
            .into_iter()
            .filter(|next| self.is_walkable(*next) && !self.is_blocked(position, *next))
            .collect()
    }

    /// The objective at a cell, if any.
    pub fn objective_at(&self, position: Position) -> Option<&ObjectiveId> {
        self.objectives.get(&position)
    }

    /// Every objective identifier on this board, in stable order.
    pub fn objective_ids(&self) -> Vec<ObjectiveId> {
        self.objectives.values().cloned().collect()
    }

    /// Total number of objectives on this board.
    pub fn objective_count(&self) -> u32 {
        self.objectives.len() as u32
    }

    /// Whether entering the cell forces a reveal.
    pub fn is_noisy(&self, position: Position) -> bool {
        self.noisy.contains(&position)
    }

    /// Manhattan distance at or under which a hunter forces a reveal.
    pub fn reveal_proximity(&self) -> u32 {
        self.reveal_proximity
    }

    /// Cell the agent starts on.
    pub fn agent_start(&self) -> Position {
        self.agent_start
    }

    /// Hunter start positions, assigned in join order.
    pub fn hunter_starts(&self) -> &[Position] {
        &self.hunter_starts
    }
}
