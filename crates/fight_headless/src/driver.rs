//! Headless fight driver.
//!
//! Drives a scenario to completion with a simple attack policy: every
//! actor strikes the nearest living enemy (or its Aggr lock), melee
//! through [`fight_core::abilities::skewer_strike`] with responses and
//! Fire Shield reflection, ranged through
//! [`fight_core::abilities::through_shot`]. The point is not clever
//! play but full, deterministic coverage of the resolution rules.

use serde::{Deserialize, Serialize};

use fight_core::abilities::{
    self, register_response, ThroughShotGroup,
};
use fight_core::effects::{AbilityKind, EffectKind};
use fight_core::error::Result;
use fight_core::fight::{FightSnapshot, FightState};
use fight_core::grid::{Board, Grid, GridCell};
use fight_core::holder::{FightPhase, UnitsHolder};
use fight_core::math::round1;
use fight_core::rng::SeededRng;
use fight_core::sinks::{DamageStatistic, RecordedLog, SceneLog, StatisticHolder};
use fight_core::unit::{AttackType, Team, Unit, UnitId, MORALE_MAX_VALUE};

use crate::scenario::Scenario;

/// One surviving stack in the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivorReport {
    /// Unit identifier.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// Side the unit fought for.
    pub team: Team,
    /// Creatures still standing.
    pub amount_alive: u32,
}

/// JSON-serializable outcome of a headless fight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FightReport {
    /// Scenario name.
    pub scenario: String,
    /// Seed the fight ran with.
    pub seed: u64,
    /// Winning team, `None` for a draw at the lap cap.
    pub winner: Option<Team>,
    /// Laps played.
    pub laps: u32,
    /// Stacks still standing.
    pub survivors: Vec<SurvivorReport>,
    /// Per-unit, per-lap damage ledger.
    pub damage: Vec<DamageStatistic>,
    /// Scene narration, one line per event.
    pub log: Vec<String>,
    /// Deterministic hash of the final state.
    pub state_hash: u64,
}

/// Drives one fight from a scenario and a seed.
pub struct FightDriver {
    units: UnitsHolder,
    board: Board,
    fight: FightState,
    log: RecordedLog,
    stats: StatisticHolder<DamageStatistic>,
    rng: SeededRng,
    scenario_name: String,
    seed: u64,
    max_laps: u32,
}

impl FightDriver {
    /// Set a fight up from a scenario: spawn, place, validate placement
    /// and prime the counters.
    ///
    /// # Errors
    ///
    /// Fails on invalid ids, out-of-band cells or duplicate placement.
    pub fn new(scenario: &Scenario, seed: u64) -> Result<Self> {
        let mut units = UnitsHolder::new();
        let mut board = Board::new(scenario.board.0, scenario.board.1)?;
        let mut fight = FightState::new();

        for entry in &scenario.units {
            let id = UnitId::new(entry.id.clone())?;
            units.add_unit(Unit::spawn(id.clone(), entry.spawn_params()))?;
            let cell = GridCell::new(entry.at.0, entry.at.1)?;
            units.place_unit(&id, vec![cell], &mut board)?;
        }
        let ids: Vec<UnitId> = units.iter().map(|(id, _)| id.clone()).collect();
        for id in ids {
            if units.delete_unit_if_not_allowed(&id, FightPhase::Placement, &mut board, &mut fight)? {
                tracing::warn!(unit = %id, "scenario unit placed outside its band, dropped");
            }
        }
        fight.set_team_alive(Team::Upper, units.alive_count(Team::Upper));
        fight.set_team_alive(Team::Lower, units.alive_count(Team::Lower));

        Ok(Self {
            units,
            board,
            fight,
            log: RecordedLog::new(),
            stats: StatisticHolder::new(),
            rng: SeededRng::new(seed),
            scenario_name: scenario.name.clone(),
            seed,
            max_laps: scenario.max_laps,
        })
    }

    /// Run the fight to a winner or the lap cap and build the report.
    ///
    /// # Errors
    ///
    /// Propagates engine contract violations; a well-formed scenario
    /// never triggers them.
    pub fn run(mut self) -> Result<FightReport> {
        while self.fight.winner().is_none() && self.fight.current_lap() <= self.max_laps {
            self.run_lap()?;
            if self.fight.winner().is_some() {
                break;
            }
            for (_, unit) in self.units.iter_mut() {
                unit.expire_effects_for_lap();
            }
            self.fight.start_next_lap();
        }

        let laps = self.fight.current_lap();
        let winner = self.fight.winner();
        let survivors = self
            .units
            .iter()
            .filter(|(_, u)| u.is_alive())
            .map(|(id, u)| SurvivorReport {
                id: id.clone(),
                name: u.name.clone(),
                team: u.team,
                amount_alive: u.amount_alive,
            })
            .collect();
        let damage = self.stats.get(|a, b| {
            a.lap
                .cmp(&b.lap)
                .then_with(|| a.unit_name.cmp(&b.unit_name))
        });
        let log_lines = self.log.lines().to_vec();
        let snapshot = FightSnapshot {
            state: self.fight,
            units: self.units,
        };
        Ok(FightReport {
            scenario: self.scenario_name,
            seed: self.seed,
            winner,
            laps,
            survivors,
            damage,
            log: log_lines,
            state_hash: snapshot.state_hash()?,
        })
    }

    fn run_lap(&mut self) -> Result<()> {
        self.units.refresh_stack_power_for_all_units(&self.fight);
        self.units
            .refresh_aura_effects_for_all_units(&self.fight, &self.board);
        self.fight.refresh_up_next(&self.units);

        while let Some(actor_id) = self.fight.choose_next_actor(&self.units) {
            let team = self
                .units
                .get(&actor_id)
                .map_or(Team::NoTeam, |u| u.team);
            self.take_turn(&actor_id)?;
            self.fight.mark_turn_made(&actor_id, team);
            if self.fight.winner().is_some() {
                break;
            }
        }
        Ok(())
    }

    fn take_turn(&mut self, actor_id: &UnitId) -> Result<()> {
        let Some(actor) = self.units.get(actor_id).cloned() else {
            return Ok(());
        };
        if actor.is_dead() {
            return Ok(());
        }
        if actor.has_effect_active(EffectKind::Stun)
            || actor.has_effect_active(EffectKind::PetrifyingGaze)
        {
            self.log.update_log(&format!("{} cannot act", actor.name));
            return Ok(());
        }
        let Some(target_id) = self.pick_target(&actor) else {
            return Ok(());
        };

        let result = if actor.attack_type == AttackType::Melee {
            let rolled = self
                .units
                .require_mut(actor_id)?
                .roll_attack_damage(&mut self.rng)?;
            let damage = self.scale_by_stats(&actor, &target_id, rolled);
            let damage = abilities::lucky_strike(
                &actor,
                damage,
                &self.fight,
                &mut self.rng,
                &mut self.log,
            )?;
            self.melee_exchange(actor_id, &target_id, damage)?
        } else {
            self.ranged_attack(actor_id, &target_id)?
        };

        if result.total_damage > 0.0 {
            self.stats.add(
                DamageStatistic {
                    unit_name: actor.name.clone(),
                    team: actor.team,
                    lap: self.fight.current_lap(),
                    damage: result.total_damage,
                },
                DamageStatistic::same_unit_and_lap,
                DamageStatistic::accumulate,
            );
        }
        abilities::devour_essence(&mut self.units, actor_id, &result.unit_ids_died, &mut self.log)?;
        self.bury(&result.unit_ids_died)?;
        if result.increase_morale != 0 {
            if let Some(actor) = self.units.get_mut(actor_id) {
                actor.morale = (actor.morale + result.increase_morale)
                    .clamp(-MORALE_MAX_VALUE, MORALE_MAX_VALUE);
            }
        }
        Ok(())
    }

    /// Melee strike, the target's response, and Fire Shield reflection.
    fn melee_exchange(
        &mut self,
        actor_id: &UnitId,
        target_id: &UnitId,
        damage: f64,
    ) -> Result<abilities::AttackResult> {
        let result = abilities::skewer_strike(
            &mut self.units,
            actor_id,
            target_id,
            damage,
            false,
            &self.fight,
            &self.board,
            &mut self.rng,
            &mut self.log,
        )?;

        let shield = abilities::fire_shield(
            &mut self.units,
            actor_id,
            target_id,
            result.primary_damage,
            &self.fight,
            &mut self.log,
            &mut self.stats,
        )?;
        self.bury(&shield.unit_ids_died)?;
        if shield.increase_morale != 0 {
            if let Some(bearer) = self.units.get_mut(target_id) {
                bearer.morale = (bearer.morale + shield.increase_morale)
                    .clamp(-MORALE_MAX_VALUE, MORALE_MAX_VALUE);
            }
        }

        let can_respond = self.units.get(target_id).is_some_and(|t| {
            t.is_alive()
                && t.attack_type == AttackType::Melee
                && !t.has_effect_active(EffectKind::Stun)
        }) && !self.fight.has_replied(target_id)
            && self.units.get(actor_id).is_some_and(Unit::is_alive);
        if can_respond {
            register_response(&mut self.units, target_id, &mut self.fight)?;
            let counter_damage = self
                .units
                .require_mut(target_id)?
                .roll_attack_damage(&mut self.rng)?;
            let target = self.units.require(target_id)?.clone();
            let counter_damage = self.scale_by_stats(&target, actor_id, counter_damage);
            let counter = abilities::skewer_strike(
                &mut self.units,
                target_id,
                actor_id,
                counter_damage,
                true,
                &self.fight,
                &self.board,
                &mut self.rng,
                &mut self.log,
            )?;
            self.bury(&counter.unit_ids_died)?;
        }
        Ok(result)
    }

    /// Ranged attack: Through Shot when carried, a plain shot otherwise.
    fn ranged_attack(
        &mut self,
        actor_id: &UnitId,
        target_id: &UnitId,
    ) -> Result<abilities::AttackResult> {
        let has_through_shot = self
            .units
            .get(actor_id)
            .is_some_and(|u| u.has_ability(AbilityKind::ThroughShot));
        if has_through_shot {
            let groups = self.pierce_groups(actor_id, target_id);
            return abilities::through_shot(
                &mut self.units,
                actor_id,
                &groups,
                &self.fight,
                &mut self.rng,
                &mut self.log,
            );
        }

        let mut result = abilities::AttackResult::default();
        let actor = self.units.require(actor_id)?.clone();
        let rolled = self
            .units
            .require_mut(actor_id)?
            .roll_attack_damage(&mut self.rng)?;
        let damage = self.scale_by_stats(&actor, target_id, rolled);
        let damage =
            abilities::lucky_strike(&actor, damage, &self.fight, &mut self.rng, &mut self.log)?;
        let Some(target) = self.units.get_mut(target_id) else {
            return Ok(result);
        };
        target.apply_damage(damage);
        result.total_damage = damage;
        result.primary_damage = damage;
        self.log.update_log(&format!(
            "{} shoots {} for {}",
            actor.name,
            target.name,
            fight_core::math::fmt_power(damage)
        ));
        if target.is_dead() {
            result.unit_ids_died.push(target_id.clone());
            result.increase_morale = abilities::MORALE_CHANGE_FOR_KILL;
        }
        Ok(result)
    }

    /// The Aggr lock when it still stands, the nearest living enemy
    /// otherwise (ties in distance break toward the lowest id).
    fn pick_target(&self, actor: &Unit) -> Option<UnitId> {
        if let Some(lock) = &actor.target_lock {
            if self.units.get(lock).is_some_and(Unit::is_alive) {
                return Some(lock.clone());
            }
        }
        let from = actor.cells.first()?;
        let mut best: Option<(u8, UnitId)> = None;
        for (id, unit) in self.units.iter() {
            if unit.team != actor.team.opposing() || unit.is_dead() {
                continue;
            }
            let Some(distance) = unit.cells.iter().map(|c| from.distance(*c)).min() else {
                continue;
            };
            if !best.as_ref().is_some_and(|(d, _)| distance >= *d) {
                best = Some((distance, id.clone()));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Attack-versus-armor scaling: 5% per stat point, bounded so a
    /// fight can neither stall nor one-shot on stats alone.
    fn scale_by_stats(&self, actor: &Unit, target_id: &UnitId, damage: f64) -> f64 {
        let armor = self.units.get(target_id).map_or(0.0, |t| t.armor);
        let factor = (1.0 + (actor.attack - armor) * 0.05).clamp(0.3, 3.0);
        round1(damage * factor)
    }

    /// Ranks a Through Shot pierces: the target line away from the
    /// shooter, damage halving per rank.
    fn pierce_groups(&self, actor_id: &UnitId, target_id: &UnitId) -> Vec<ThroughShotGroup> {
        let mut groups = vec![ThroughShotGroup {
            unit_ids: vec![target_id.clone()],
            divisor: Some(1.0),
        }];
        let (Some(actor), Some(target)) = (self.units.get(actor_id), self.units.get(target_id))
        else {
            return groups;
        };
        let (Some(&from), Some(&at)) = (actor.cells.first(), target.cells.first()) else {
            return groups;
        };
        let step = (
            (i32::from(at.x) - i32::from(from.x)).signum(),
            (i32::from(at.y) - i32::from(from.y)).signum(),
        );
        if step == (0, 0) {
            return groups;
        }
        let mut cursor = at;
        let mut divisor = 2.0;
        loop {
            let nx = i32::from(cursor.x) + step.0;
            let ny = i32::from(cursor.y) + step.1;
            if nx < 0 || ny < 0 {
                break;
            }
            #[allow(clippy::cast_sign_loss)]
            let Ok(next) = GridCell::new(nx as u32, ny as u32) else {
                break;
            };
            if !self.board.contains(next) {
                break;
            }
            let Some(occupant) = self.board.occupant(next) else {
                break;
            };
            let Some(unit) = self.units.get(occupant) else {
                break;
            };
            if unit.team == actor.team || unit.is_dead() {
                break;
            }
            groups.push(ThroughShotGroup {
                unit_ids: vec![occupant.clone()],
                divisor: Some(divisor),
            });
            divisor *= 2.0;
            cursor = next;
        }
        groups
    }

    /// Remove fallen stacks through the deletion cascade, letting
    /// Resurrection fire where it can.
    fn bury(&mut self, fallen: &[UnitId]) -> Result<()> {
        for id in fallen {
            if self.units.get(id).is_some() {
                self.units
                    .delete_unit(id, &mut self.board, &mut self.fight, &mut self.log)?;
            }
        }
        Ok(())
    }
}

/// Run the same scenario and seed several times and check every run
/// produces the same final hash.
///
/// # Errors
///
/// Propagates driver failures from a malformed scenario.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> Result<bool> {
    let mut hashes = Vec::new();
    for _ in 0..runs {
        let report = FightDriver::new(scenario, seed)?.run()?;
        hashes.push(report.state_hash);
    }
    Ok(hashes.windows(2).all(|w| w[0] == w[1]))
}
