//! Equipment cards and the mission catalog.
//!
//! Card effects and loadouts are mission configuration data, not engine
//! branches: the engine understands a small set of effects and missions
//! declare which cards carry them.

use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::engine::{CardId, EquipmentState, Role, Variant};
use crate::error::ConfigurationError;

const MISSION_CATALOG: &str = include_str!("../../missions/missions.toml");

/// Effects the engine knows how to apply.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CardEffect {
    /// Agent only: stay hidden this round even on a noisy or proximate cell.
    SuppressReveal,
    /// Hunter only: the agent is revealed for the current round.
    ForceReveal,
    /// Agent only: take one additional move before hunters act.
    ExtraMove,
}

/// One card as declared by a mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct CardSpec {
    /// Card identifier referenced by `use_equipment`.
    pub id: CardId,
    /// Role whose pool holds this card.
    pub role: Role,
    /// Effect applied when the card is consumed.
    pub effect: CardEffect,
    /// Copies dealt into the pool at session start.
    #[serde(default = "one")]
    #[new(value = "1")]
    pub copies: u32,
    /// Dealt only under the advanced rules variant.
    #[serde(default)]
    #[new(default)]
    pub advanced_only: bool,
}

fn one() -> u32 {
    1
}

/// A mission: its identity and card loadout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    /// Stable mission identifier referenced by session settings.
    pub id: String,
    /// Human-readable mission name.
    pub name: String,
    /// Cards dealt at session start.
    #[serde(default)]
    pub cards: Vec<CardSpec>,
}

#[derive(Debug, Deserialize)]
struct MissionCatalog {
    #[serde(default)]
    mission: Vec<Mission>,
}

impl Mission {
    /// Loads a mission from the embedded catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownMission`] if the identifier is
    /// not in the catalog.
    #[instrument]
    pub fn load(mission_id: &str) -> Result<Mission, ConfigurationError> {
        let catalog: MissionCatalog = toml::from_str(MISSION_CATALOG)
            .map_err(|e| ConfigurationError::InvalidBoardDefinition(format!("mission catalog: {e}")))?;
        catalog
            .mission
            .into_iter()
            .find(|mission| mission.id == mission_id)
            .ok_or_else(|| ConfigurationError::UnknownMission(mission_id.to_string()))
    }

    /// Deals the starting pools for the given rules variant.
    pub fn loadout(&self, variant: Variant) -> EquipmentState {
        let mut agent_cards = Vec::new();
        let mut hunter_cards = Vec::new();
        for card in &self.cards {
            if card.advanced_only && variant == Variant::Standard {
                continue;
            }
            let pool = match card.role {
                Role::Agent => &mut agent_cards,
                Role::Hunter => &mut hunter_cards,
            };
            for _ in 0..card.copies {
                pool.push(card.id.clone());
            }
        }
        debug!(
            mission = %self.id,
            ?variant,
            agent_cards = agent_cards.len(),
            hunter_cards = hunter_cards.len(),
            "Dealt mission loadout"
        );
        EquipmentState::new(agent_cards, hunter_cards)
    }

    /// The declared spec for a card id, if this mission includes it.
    pub fn card(&self, card_id: &str) -> Option<&CardSpec> {
        self.cards.iter().find(|card| card.id == card_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_missions_load() {
        let mission = Mission::load("gallery-heist").unwrap();
        assert_eq!(mission.id, "gallery-heist");
        assert!(!mission.cards.is_empty());
    }

    #[test]
    fn unknown_mission_is_rejected() {
        let err = Mission::load("no-such-mission").unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownMission("no-such-mission".to_string())
        );
    }

    #[test]
    fn advanced_only_cards_stay_out_of_standard_loadouts() {
        let mission = Mission {
            id: "test".to_string(),
            name: "Test".to_string(),
            cards: vec![
                CardSpec::new("smoke_screen".to_string(), Role::Agent, CardEffect::SuppressReveal),
                CardSpec {
                    id: "adrenaline".to_string(),
                    role: Role::Agent,
                    effect: CardEffect::ExtraMove,
                    copies: 1,
                    advanced_only: true,
                },
            ],
        };

        let standard = mission.loadout(Variant::Standard);
        assert_eq!(standard.cards_for(Role::Agent), ["smoke_screen"]);

        let advanced = mission.loadout(Variant::Advanced);
        assert_eq!(
            advanced.cards_for(Role::Agent),
            ["smoke_screen", "adrenaline"]
        );
    }

    #[test]
    fn copies_multiply_the_pool() {
        let mission = Mission {
            id: "test".to_string(),
            name: "Test".to_string(),
            cards: vec![CardSpec {
                id: "motion_scanner".to_string(),
                role: Role::Hunter,
                effect: CardEffect::ForceReveal,
                copies: 3,
                advanced_only: false,
            }],
        };
        let loadout = mission.loadout(Variant::Standard);
        assert_eq!(loadout.cards_for(Role::Hunter).len(), 3);
    }
}
