//! Board type identifiers.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ConfigurationError;

/// The recognized set of board layouts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BoardType {
    /// The museum floor: open galleries with interior walls.
    Museum,
    /// The research facility: tight corridors and noisy checkpoints.
    Facility,
}

impl BoardType {
    /// Parses a board identifier from configuration input.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownBoardType`] if the identifier is
    /// not in the recognized set.
    #[instrument]
    pub fn parse(identifier: &str) -> Result<Self, ConfigurationError> {
        identifier
            .parse()
            .map_err(|_| ConfigurationError::UnknownBoardType(identifier.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_identifiers_parse() {
        assert_eq!(BoardType::parse("museum").unwrap(), BoardType::Museum);
        assert_eq!(BoardType::parse("facility").unwrap(), BoardType::Facility);
    }

    #[test]
    fn unknown_identifier_is_a_configuration_error() {
        let err = BoardType::parse("castle").unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownBoardType("castle".to_string())
        );
    }

    #[test]
    fn display_matches_serde_form() {
        assert_eq!(BoardType::Museum.to_string(), "museum");
        let json = serde_json::to_string(&BoardType::Facility).unwrap();
        assert_eq!(json, "\"facility\"");
    }
}
