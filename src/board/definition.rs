//! Declarative board definitions.
//!
//! Boards are data, not code: walkable area, walls, objectives, noisy cells,
//! and start positions all come from a TOML document, so new layouts do not
//! require engine changes.

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, instrument};

use crate::error::ConfigurationError;

/// A board layout as declared in configuration.
///
/// Cells are a full `width x height` grid minus the `blocked` list. All
/// coordinates are `[x, y]` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardDefinition {
    /// Human-readable layout name.
    pub name: String,
    /// Grid width in cells.
    pub width: i32,
    /// Grid height in cells.
    pub height: i32,
    /// Manhattan distance at or under which a hunter forces a reveal.
    pub reveal_proximity: u32,
    /// Cell the agent starts on.
    pub agent_start: [i32; 2],
    /// Cells hunters start on, assigned in join order.
    pub hunter_starts: Vec<[i32; 2]>,
    /// Cells removed from the walkable grid.
    #[serde(default)]
    pub blocked: Vec<[i32; 2]>,
    /// Pairs of adjacent cells separated by a wall.
    #[serde(default)]
    pub walls: Vec<[[i32; 2]; 2]>,
    /// Cells that force a reveal when the agent enters them.
    #[serde(default)]
    pub noisy: Vec<[i32; 2]>,
    /// Objective locations.
    #[serde(default)]
    pub objectives: Vec<ObjectiveDefinition>,
}

/// One objective location in a board definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectiveDefinition {
    /// Stable objective identifier.
    pub id: String,
    /// Cell the objective sits on.
    pub at: [i32; 2],
}

impl BoardDefinition {
    /// Parses a board definition from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidBoardDefinition`] if the document
    /// does not parse.
    #[instrument(skip(toml_str))]
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigurationError> {
        let definition: Self = toml::from_str(toml_str)
            .map_err(|e| ConfigurationError::InvalidBoardDefinition(e.to_string()))?;
        debug!(name = %definition.name, width = definition.width, height = definition.height,
            "Parsed board definition");
        Ok(definition)
    }

    /// Reads and parses a board definition from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidBoardDefinition`] if the file
    /// cannot be read or does not parse.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigurationError::InvalidBoardDefinition(format!(
                "failed to read '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_definition_parses() {
        let definition = BoardDefinition::from_toml(
            r#"
name = "test"
width = 5
height = 5
reveal_proximity = 1
agent_start = [0, 0]
hunter_starts = [[4, 4]]
"#,
        )
        .unwrap();
        assert_eq!(definition.name, "test");
        assert!(definition.walls.is_empty());
        assert!(definition.objectives.is_empty());
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let err = BoardDefinition::from_toml("width = \"wide\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidBoardDefinition(_)
        ));
    }
}
