//! The unit roster.
//!
//! [`UnitsHolder`] owns every unit in a fight, keyed by id in a
//! `BTreeMap` so that all whole-roster passes (aura recompute, per-lap
//! refresh, tie-breaks) iterate in id order and are therefore
//! deterministic.
//!
//! Deletion is a cascade: the roster entry, the grid occupancy, the
//! turn-order bookkeeping and the team alive counter all go in one
//! call, so no stale reference survives anywhere.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::effects::{AppliedBuff, AuraPolarity, EffectKind, TargetAffinity};
use crate::error::{FightError, Result};
use crate::fight::FightState;
use crate::grid::{Grid, GridCell};
use crate::sinks::SceneLog;
use crate::unit::{Team, Unit, UnitId};

/// Phase of the fight, selecting which placement legality rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FightPhase {
    /// Units are being arranged inside their placement bands.
    Placement,
    /// The fight proper.
    Combat,
}

/// What removing a unit actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// The unit left the fight for good.
    Deleted,
    /// A Resurrection charge fired instead of deletion.
    Resurrected {
        /// Creatures returned to the stack.
        revived: u32,
    },
}

/// One aura contribution after collection, before squashing.
#[derive(Debug, Clone)]
struct CollectedAura {
    kind: EffectKind,
    power: f64,
    polarity: AuraPolarity,
}

/// Owner of every unit in a fight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitsHolder {
    units: BTreeMap<UnitId, Unit>,
}

impl UnitsHolder {
    /// Empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit to the roster.
    ///
    /// # Errors
    ///
    /// Returns [`FightError::InvalidState`] when the id is taken.
    pub fn add_unit(&mut self, unit: Unit) -> Result<()> {
        if self.units.contains_key(&unit.id) {
            return Err(FightError::InvalidState(format!(
                "duplicate unit id: {}",
                unit.id
            )));
        }
        self.units.insert(unit.id.clone(), unit);
        Ok(())
    }

    /// A unit by id.
    #[must_use]
    pub fn get(&self, id: &UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Mutable access to a unit by id.
    pub fn get_mut(&mut self, id: &UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id)
    }

    /// A unit by id, as an error when absent.
    ///
    /// # Errors
    ///
    /// Returns [`FightError::UnitNotFound`].
    pub fn require(&self, id: &UnitId) -> Result<&Unit> {
        self.units
            .get(id)
            .ok_or_else(|| FightError::UnitNotFound(id.to_string()))
    }

    /// Mutable counterpart of [`UnitsHolder::require`].
    ///
    /// # Errors
    ///
    /// Returns [`FightError::UnitNotFound`].
    pub fn require_mut(&mut self, id: &UnitId) -> Result<&mut Unit> {
        self.units
            .get_mut(id)
            .ok_or_else(|| FightError::UnitNotFound(id.to_string()))
    }

    /// Disjoint mutable access to two different units.
    pub fn pair_mut(&mut self, a: &UnitId, b: &UnitId) -> Option<(&mut Unit, &mut Unit)> {
        if a == b {
            return None;
        }
        let mut first = None;
        let mut second = None;
        for (id, unit) in &mut self.units {
            if id == a {
                first = Some(unit);
            } else if id == b {
                second = Some(unit);
            }
        }
        Some((first?, second?))
    }

    /// All units in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, &Unit)> {
        self.units.iter()
    }

    /// All units in id order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&UnitId, &mut Unit)> {
        self.units.iter_mut()
    }

    /// Number of units in the roster, dead stacks included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Ids of a team's living units, in id order.
    #[must_use]
    pub fn alive_ids_of_team(&self, team: Team) -> Vec<UnitId> {
        self.units
            .values()
            .filter(|u| u.team == team && u.is_alive())
            .map(|u| u.id.clone())
            .collect()
    }

    /// Number of a team's living units.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn alive_count(&self, team: Team) -> u32 {
        self.units
            .values()
            .filter(|u| u.team == team && u.is_alive())
            .count() as u32
    }

    /// Place a unit onto the given cells, claiming grid occupancy.
    ///
    /// # Errors
    ///
    /// Fails when the unit is unknown or a cell is taken or off-grid.
    pub fn place_unit(
        &mut self,
        id: &UnitId,
        cells: Vec<GridCell>,
        grid: &mut dyn Grid,
    ) -> Result<()> {
        self.require(id)?;
        for &cell in &cells {
            grid.occupy(cell, id.clone())?;
        }
        if let Some(unit) = self.units.get_mut(id) {
            unit.cells = cells;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deletion and resurrection
    // ------------------------------------------------------------------

    /// Remove a dead unit from the fight, unless an unspent
    /// Resurrection charge brings it back instead.
    ///
    /// Resurrection revives `floor(died / 2)` creatures at full health
    /// with every effect and mark stripped; a charge that would revive
    /// nobody is not spent and the deletion proceeds.
    ///
    /// # Errors
    ///
    /// Returns [`FightError::UnitNotFound`] for an unknown id.
    pub fn delete_unit(
        &mut self,
        id: &UnitId,
        grid: &mut dyn Grid,
        fight: &mut FightState,
        log: &mut dyn SceneLog,
    ) -> Result<DeletionOutcome> {
        let unit = self.require_mut(id)?;
        if unit.resurrection_charges > 0 {
            let to_revive = unit.amount_died / 2;
            if to_revive > 0 {
                unit.resurrection_charges -= 1;
                unit.clear_all_effects_and_marks();
                let revived = unit.revive(to_revive);
                log.update_log(&format!(
                    "{} refuses to fall: {revived} return to the stack",
                    unit.name
                ));
                return Ok(DeletionOutcome::Resurrected { revived });
            }
        }
        let name = unit.name.clone();
        let team = unit.team;
        self.remove_unit_cascade(id, grid, fight);
        fight.decrement_team_alive(team);
        log.update_log(&format!("{name} perished"));
        Ok(DeletionOutcome::Deleted)
    }

    /// Remove a unit standing somewhere it may not be: outside its
    /// team's placement band during placement, or off the board once
    /// the fight has started. Returns whether the unit was removed.
    ///
    /// # Errors
    ///
    /// Returns [`FightError::UnitNotFound`] for an unknown id.
    pub fn delete_unit_if_not_allowed(
        &mut self,
        id: &UnitId,
        phase: FightPhase,
        grid: &mut dyn Grid,
        fight: &mut FightState,
    ) -> Result<bool> {
        let unit = self.require(id)?;
        let misplaced = match phase {
            FightPhase::Placement => unit
                .cells
                .iter()
                .any(|&cell| !grid.placement_allows(unit.team, cell)),
            FightPhase::Combat => unit.cells.iter().any(|&cell| !grid.contains(cell)),
        };
        if misplaced {
            tracing::debug!(unit = %id, ?phase, "removing misplaced unit");
            self.remove_unit_cascade(id, grid, fight);
        }
        Ok(misplaced)
    }

    fn remove_unit_cascade(&mut self, id: &UnitId, grid: &mut dyn Grid, fight: &mut FightState) {
        self.units.remove(id);
        grid.release_unit(id);
        fight.purge_unit(id);
        // Clear any Aggr locks pointing at the removed unit.
        for unit in self.units.values_mut() {
            if unit.target_lock.as_ref() == Some(id) {
                unit.target_lock = None;
            }
        }
    }

    // ------------------------------------------------------------------
    // Per-lap refresh
    // ------------------------------------------------------------------

    /// Recompute every living unit's effective stats for the current
    /// lap, then resolve Disguise concealment.
    ///
    /// A disguised unit is Hidden while no living enemy stands within
    /// its Disguise range and Visible the moment one does.
    pub fn refresh_stack_power_for_all_units(&mut self, fight: &FightState) {
        let lap = fight.current_lap();
        for unit in self.units.values_mut() {
            if unit.is_alive() {
                let modifiers = fight.team_modifiers(unit.team);
                unit.refresh_for_lap(lap, &modifiers);
            }
        }

        // Disguise pass runs on the refreshed stats.
        let enemy_cells: BTreeMap<Team, Vec<GridCell>> = [Team::Upper, Team::Lower]
            .into_iter()
            .map(|team| {
                let cells = self
                    .units
                    .values()
                    .filter(|u| u.team == team.opposing() && u.is_alive())
                    .flat_map(|u| u.cells.iter().copied())
                    .collect();
                (team, cells)
            })
            .collect();

        for unit in self.units.values_mut() {
            let Some(disguise) = unit
                .aura_effects
                .iter()
                .find(|a| a.kind == EffectKind::Disguise)
                .cloned()
            else {
                continue;
            };
            if unit.is_dead() {
                continue;
            }
            let range = disguise.range + fight.team_modifiers(unit.team).aura_range;
            let spotted = range >= 0
                && enemy_cells.get(&unit.team).is_some_and(|cells| {
                    cells.iter().any(|&enemy| {
                        unit.cells
                            .iter()
                            .any(|&own| i32::from(own.distance(enemy)) <= range)
                    })
                });
            let mark = if spotted {
                EffectKind::Visible
            } else {
                EffectKind::Hidden
            };
            unit.apply_buff(AppliedBuff::new(mark, 0.0));
        }
    }

    // ------------------------------------------------------------------
    // Aura propagation
    // ------------------------------------------------------------------

    /// Recompute aura-applied buffs and debuffs for the whole roster.
    ///
    /// Three phases: **collect** every living emitter's auras into
    /// per-team, per-cell tables; **squash** overlaps per effect kind,
    /// keeping the strictly highest power (ties keep the contribution
    /// from the lowest emitter id); **apply** the squashed tables to
    /// every unit's cells, replacing all previously aura-applied
    /// entries. Mind-affinity auras skip mind-resistant units.
    pub fn refresh_aura_effects_for_all_units(&mut self, fight: &FightState, grid: &dyn Grid) {
        // Phase 1: collect. Roster iteration is id-ordered, so the
        // first contribution for a (team, cell, kind) slot always comes
        // from the lowest emitter id.
        let mut collected: BTreeMap<(Team, u8), Vec<CollectedAura>> = BTreeMap::new();
        for unit in self.units.values() {
            if unit.is_dead() {
                continue;
            }
            let modifiers = fight.team_modifiers(unit.team);
            for aura in &unit.aura_effects {
                if aura.kind == EffectKind::Disguise {
                    continue;
                }
                let range = aura.range + modifiers.aura_range;
                if range < 0 {
                    continue;
                }
                let target_team = match aura.polarity {
                    AuraPolarity::Buff => unit.team,
                    AuraPolarity::Debuff => unit.team.opposing(),
                };
                let power = unit.calculate_aura_power(aura.power, modifiers.aura_power);
                for &own_cell in &unit.cells {
                    for cell in grid.cells_within(own_cell, range) {
                        collected.entry((target_team, cell.key())).or_default().push(
                            CollectedAura {
                                kind: aura.kind,
                                power,
                                polarity: aura.polarity,
                            },
                        );
                    }
                }
            }
        }

        // Phase 2: squash per cell and kind, strictly-higher power wins.
        let mut squashed: BTreeMap<(Team, u8), BTreeMap<EffectKind, CollectedAura>> =
            BTreeMap::new();
        for (slot, auras) in collected {
            let per_kind = squashed.entry(slot).or_default();
            for aura in auras {
                match per_kind.get(&aura.kind) {
                    Some(existing) if aura.power <= existing.power => {}
                    _ => {
                        per_kind.insert(aura.kind, aura);
                    }
                }
            }
        }

        // Phase 3: apply. Prior aura entries are dropped wholesale, so
        // emitters that died or moved leave nothing behind.
        for unit in self.units.values_mut() {
            unit.clear_aura_applied();
            if unit.is_dead() {
                continue;
            }
            let mut strongest: BTreeMap<EffectKind, CollectedAura> = BTreeMap::new();
            for &cell in &unit.cells {
                let Some(per_kind) = squashed.get(&(unit.team, cell.key())) else {
                    continue;
                };
                for aura in per_kind.values() {
                    match strongest.get(&aura.kind) {
                        Some(existing) if aura.power <= existing.power => {}
                        _ => {
                            strongest.insert(aura.kind, aura.clone());
                        }
                    }
                }
            }
            for aura in strongest.values() {
                if aura.kind.template().affinity == TargetAffinity::Mind
                    && unit.has_mind_attack_resistance()
                {
                    continue;
                }
                let applied = AppliedBuff::from_aura(aura.kind, aura.power);
                match aura.polarity {
                    AuraPolarity::Buff => unit.apply_buff(applied),
                    AuraPolarity::Debuff => unit.apply_debuff(applied),
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Morale broadcasts
    // ------------------------------------------------------------------

    /// Shift morale for every living unit of a team sharing a display
    /// name. Used when a stack dies and its kin lose heart.
    pub fn change_morale_for_same_named(&mut self, name: &str, team: Team, delta: i32) {
        for unit in self.units.values_mut() {
            if unit.team == team && unit.name == name && unit.is_alive() {
                unit.base_morale += delta;
                unit.morale = (unit.morale + delta).clamp(
                    -crate::unit::MORALE_MAX_VALUE,
                    crate::unit::MORALE_MAX_VALUE,
                );
            }
        }
    }
}
