//! Scenario definitions.
//!
//! Scenarios are RON files describing the board, the participants and
//! their starting cells. A built-in duel scenario backs tests and the
//! CLI default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fight_core::effects::{Ability, AbilityKind};
use fight_core::unit::{AttackType, Team, UnitSpawnParams};

/// Scenario loading failure.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// File could not be read.
    #[error("Failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),
    /// File was not valid RON.
    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// One unit entry in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioUnit {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Side the unit fights for.
    pub team: Team,
    /// How the unit attacks.
    #[serde(default)]
    pub attack_type: AttackType,
    /// Per-creature health.
    pub max_hp: f64,
    /// Creatures in the stack.
    pub amount: u32,
    /// Minimum per-creature damage.
    pub min_damage: i32,
    /// Maximum per-creature damage (inclusive).
    pub max_damage: i32,
    /// Initiative.
    pub speed: u32,
    /// Starting cell.
    pub at: (u32, u32),
    /// Preset abilities carried.
    #[serde(default)]
    pub abilities: Vec<AbilityKind>,
}

impl ScenarioUnit {
    /// Spawn parameters for this entry.
    #[must_use]
    pub fn spawn_params(&self) -> UnitSpawnParams {
        UnitSpawnParams {
            name: self.name.clone(),
            team: self.team,
            attack_type: self.attack_type,
            max_hp: self.max_hp,
            amount: self.amount,
            min_damage: self.min_damage,
            max_damage: self.max_damage,
            speed: self.speed,
            abilities: self.abilities.iter().map(|&k| Ability::preset(k)).collect(),
            ..UnitSpawnParams::default()
        }
    }
}

/// A complete fight scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name, echoed into reports.
    pub name: String,
    /// Board dimensions in cells, up to 16x16.
    pub board: (u8, u8),
    /// Hard lap cap; a fight still undecided at the cap is a draw.
    pub max_laps: u32,
    /// Participating units.
    pub units: Vec<ScenarioUnit>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] on IO or parse failure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&text)?)
    }

    /// Built-in two-stack duel used as the CLI default.
    #[must_use]
    pub fn duel() -> Self {
        Self {
            name: "duel".to_owned(),
            board: (8, 8),
            max_laps: 50,
            units: vec![
                ScenarioUnit {
                    id: "upper-swordsman".to_owned(),
                    name: "Swordsman".to_owned(),
                    team: Team::Upper,
                    attack_type: AttackType::Melee,
                    max_hp: 12.0,
                    amount: 8,
                    min_damage: 2,
                    max_damage: 4,
                    speed: 5,
                    at: (3, 0),
                    abilities: vec![AbilityKind::SkewerStrike, AbilityKind::Stun],
                },
                ScenarioUnit {
                    id: "lower-archer".to_owned(),
                    name: "Archer".to_owned(),
                    team: Team::Lower,
                    attack_type: AttackType::Range,
                    max_hp: 8.0,
                    amount: 10,
                    min_damage: 2,
                    max_damage: 3,
                    speed: 6,
                    at: (4, 7),
                    abilities: vec![AbilityKind::ThroughShot, AbilityKind::LuckyStrike],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duel_roundtrips_through_ron() {
        let scenario = Scenario::duel();
        let text = ron::to_string(&scenario).unwrap();
        let parsed: Scenario = ron::from_str(&text).unwrap();
        assert_eq!(parsed.units.len(), 2);
        assert_eq!(parsed.board, (8, 8));
    }

    #[test]
    fn test_spawn_params_carry_presets() {
        let scenario = Scenario::duel();
        let params = scenario.units[1].spawn_params();
        assert_eq!(params.abilities.len(), 2);
        assert_eq!(params.abilities[0].kind, AbilityKind::ThroughShot);
    }
}
