//! Damage-dealing resolvers.

use super::{
    run_cascade_trigger, AttackResult, FireShieldResult, ThroughShotGroup,
    MORALE_CHANGE_FOR_KILL, PEGASUS_LIGHT_MORALE_BONUS, SKEWER_STRIKE_CASCADE,
};
use crate::effects::{AbilityKind, EffectKind};
use crate::error::Result;
use crate::fight::FightState;
use crate::grid::{Grid, GridCell};
use crate::math::{clamp_chance, fmt_power, round1};
use crate::rng::FightRng;
use crate::sinks::{DamageStatistic, SceneLog, StatisticHolder};
use crate::holder::UnitsHolder;
use crate::unit::{AttackType, Unit, UnitId, MAX_STACK_POWER};

/// Lucky Strike: chance-gated damage multiplier.
///
/// The chance is the ability's base plus the team chance modifier plus
/// one point per point of luck. On success the damage is scaled by the
/// ability power (200 doubles it). Units without the ability pass the
/// damage through unchanged.
///
/// # Errors
///
/// Propagates RNG contract violations.
pub fn lucky_strike(
    from: &Unit,
    damage: f64,
    fight: &FightState,
    rng: &mut dyn FightRng,
    log: &mut dyn SceneLog,
) -> Result<f64> {
    let Some(ability) = from.ability(AbilityKind::LuckyStrike) else {
        return Ok(damage);
    };
    let modifiers = fight.team_modifiers(from.team);
    let chance = clamp_chance(ability.chance + modifiers.ability_chance + f64::from(from.luck));
    if f64::from(rng.random_int(0, 100)?) >= chance {
        return Ok(damage);
    }
    let boosted = round1(damage * ability.power / 100.0);
    log.update_log(&format!("{} lands a lucky strike", from.name));
    Ok(boosted)
}

/// Penetrating Bite: bonus damage drawn from the victim's bulk.
///
/// The bonus is `(power / 100 - 1)` of the target's per-creature
/// maximum health; a 160-power bite adds 60% of it. Units without the
/// ability contribute nothing.
#[must_use]
pub fn penetrating_bite(from: &Unit, target: &Unit) -> f64 {
    let Some(ability) = from.ability(AbilityKind::PenetratingBite) else {
        return 0.0;
    };
    round1((ability.power / 100.0 - 1.0).max(0.0) * target.max_hp)
}

/// Fire Shield: reflect a fraction of incoming melee or ranged damage
/// back at the attacker as magic damage.
///
/// The reflection is
/// `floor(ceil(damage * power / 100) * (1 - magic_resist / 100) * heavy)`
/// where `heavy` scales with the bearer's Heavy Armor power, luck and
/// stack power. Magic attacks are not reflected, and fire-elemental
/// attackers shrug the flames off entirely.
///
/// # Errors
///
/// Infallible today; the `Result` keeps the resolver signature uniform.
#[allow(clippy::too_many_arguments)]
pub fn fire_shield(
    units: &mut UnitsHolder,
    attacker_id: &UnitId,
    bearer_id: &UnitId,
    damage: f64,
    fight: &FightState,
    log: &mut dyn SceneLog,
    stats: &mut StatisticHolder<DamageStatistic>,
) -> Result<FireShieldResult> {
    let Some(bearer) = units.get(bearer_id) else {
        return Ok(FireShieldResult::default());
    };
    let Some(ability) = bearer.ability(AbilityKind::FireShield).cloned() else {
        return Ok(FireShieldResult::default());
    };
    let modifiers = fight.team_modifiers(bearer.team);
    let power = bearer.calculate_ability_count(&ability, modifiers.ability_power);
    let heavy = bearer.ability(AbilityKind::HeavyArmor).map_or(1.0, |hw| {
        (hw.power + f64::from(bearer.luck)) / 100.0 / MAX_STACK_POWER * bearer.stack_power + 1.0
    });
    let bearer_name = bearer.name.clone();
    let bearer_team = bearer.team;

    let Some(attacker) = units.get_mut(attacker_id) else {
        return Ok(FireShieldResult::default());
    };
    if attacker.is_dead() || attacker.attack_type == AttackType::Magic || damage <= 0.0 {
        return Ok(FireShieldResult::default());
    }
    if attacker.has_effect_active(EffectKind::FireElement) {
        log.update_log(&format!("{} is unharmed by the flames", attacker.name));
        return Ok(FireShieldResult::default());
    }
    let reflected =
        ((damage * power / 100.0).ceil() * (1.0 - attacker.magic_resist / 100.0) * heavy).floor();
    if reflected <= 0.0 {
        return Ok(FireShieldResult::default());
    }

    attacker.apply_damage(reflected);
    log.update_log(&format!(
        "{} is scorched by {bearer_name}'s Fire Shield for {}",
        attacker.name,
        fmt_power(reflected)
    ));

    let mut result = FireShieldResult {
        reflected_damage: reflected,
        ..FireShieldResult::default()
    };
    if attacker.is_dead() {
        result.unit_ids_died.push(attacker_id.clone());
        result.increase_morale = MORALE_CHANGE_FOR_KILL;
    }
    stats.add(
        DamageStatistic {
            unit_name: bearer_name,
            team: bearer_team,
            lap: fight.current_lap(),
            damage: reflected,
        },
        DamageStatistic::same_unit_and_lap,
        DamageStatistic::accumulate,
    );
    Ok(result)
}

/// Units standing in a straight line behind the primary target, walking
/// away from the attacker until the line breaks.
fn targets_behind(
    units: &UnitsHolder,
    grid: &dyn Grid,
    attacker: &Unit,
    primary: &Unit,
) -> Vec<UnitId> {
    let (Some(&from), Some(&at)) = (attacker.cells.first(), primary.cells.first()) else {
        return Vec::new();
    };
    let dx = i32::from(at.x) - i32::from(from.x);
    let dy = i32::from(at.y) - i32::from(from.y);
    let step = (dx.signum(), dy.signum());
    if step == (0, 0) {
        return Vec::new();
    }

    let mut found = Vec::new();
    let mut cursor = at;
    loop {
        let next_x = i32::from(cursor.x) + step.0;
        let next_y = i32::from(cursor.y) + step.1;
        if next_x < 0 || next_y < 0 {
            break;
        }
        #[allow(clippy::cast_sign_loss)]
        let Ok(next) = GridCell::new(next_x as u32, next_y as u32) else {
            break;
        };
        if !grid.contains(next) {
            break;
        }
        let Some(occupant) = grid.occupant(next) else {
            break;
        };
        let Some(unit) = units.get(occupant) else {
            break;
        };
        if unit.team == attacker.team || unit.is_dead() {
            break;
        }
        if occupant != &primary.id && !found.contains(occupant) {
            found.push(occupant.clone());
        }
        cursor = next;
    }
    found
}

/// Skewer Strike: a melee blow that carries through every enemy
/// standing in line behind the primary target.
///
/// Each struck target rolls the attacker's miss chance separately,
/// takes the full damage, and then suffers the secondary-trigger
/// cascade in its fixed order. Response strikes run only the final
/// cascade trigger. Attackers without the ability hit the primary
/// target alone.
///
/// # Errors
///
/// Propagates RNG contract violations.
#[allow(clippy::too_many_arguments)]
pub fn skewer_strike(
    units: &mut UnitsHolder,
    attacker_id: &UnitId,
    primary_target_id: &UnitId,
    damage: f64,
    is_response: bool,
    fight: &FightState,
    grid: &dyn Grid,
    rng: &mut dyn FightRng,
    log: &mut dyn SceneLog,
) -> Result<AttackResult> {
    let mut result = AttackResult::default();
    let Some(attacker) = units.get(attacker_id).cloned() else {
        return Ok(result);
    };
    let Some(primary) = units.get(primary_target_id) else {
        return Ok(result);
    };
    if attacker.is_dead() || primary.is_dead() {
        return Ok(result);
    }

    let mut target_ids = vec![primary_target_id.clone()];
    if attacker.has_ability(AbilityKind::SkewerStrike) {
        target_ids.extend(targets_behind(units, grid, &attacker, primary));
    }

    let triggers: &[super::CascadeTrigger] = if is_response {
        &SKEWER_STRIKE_CASCADE[SKEWER_STRIKE_CASCADE.len() - 1..]
    } else {
        &SKEWER_STRIKE_CASCADE
    };
    let miss_chance = attacker.miss_chance();

    for target_id in &target_ids {
        if miss_chance > 0.0 && f64::from(rng.random_int(0, 100)?) < miss_chance {
            if let Some(target) = units.get(target_id) {
                log.update_log(&format!("{} misses {}", attacker.name, target.name));
            }
            continue;
        }
        let Some(target) = units.get_mut(target_id) else {
            continue;
        };
        let dealt = round1(damage + penetrating_bite(&attacker, target));
        target.apply_damage(dealt);
        result.total_damage += dealt;
        if target_id == primary_target_id {
            result.primary_damage = dealt;
        }
        log.update_log(&format!(
            "{} strikes {} for {}",
            attacker.name,
            target.name,
            fmt_power(dealt)
        ));
        if target.is_dead() {
            result.unit_ids_died.push(target_id.clone());
            result.increase_morale += MORALE_CHANGE_FOR_KILL;
            continue;
        }
        for &trigger in triggers {
            run_cascade_trigger(
                units,
                attacker_id,
                target_id,
                trigger,
                is_response,
                fight,
                rng,
                log,
            )?;
        }
    }
    Ok(result)
}

/// Through Shot: a ranged shot that pierces rank after rank, each rank
/// taking the rolled damage divided by its depth divisor.
///
/// Ranks with anything other than exactly one unit, or without a
/// divisor, are skipped. Lucky Strike modulates each rank's damage
/// separately; Pegasus Light may land on each pierced unit, granting
/// the attacker a point of morale per application. Kills award the
/// attacker one consolidated morale bonus and broadcast a matching
/// penalty to each fallen stack's same-named kin.
///
/// # Errors
///
/// Propagates RNG contract violations.
pub fn through_shot(
    units: &mut UnitsHolder,
    attacker_id: &UnitId,
    groups: &[ThroughShotGroup],
    fight: &FightState,
    rng: &mut dyn FightRng,
    log: &mut dyn SceneLog,
) -> Result<AttackResult> {
    let mut result = AttackResult::default();
    let Some(attacker) = units.get(attacker_id).cloned() else {
        return Ok(result);
    };
    if attacker.is_dead() || !attacker.has_ability(AbilityKind::ThroughShot) {
        return Ok(result);
    }

    let base = units.require_mut(attacker_id)?.roll_attack_damage(rng)?;
    let miss_chance = attacker.miss_chance();
    let has_pegasus = attacker.has_ability(AbilityKind::PegasusLight);
    let mut primary_struck = false;

    for group in groups {
        let (Some(divisor), [target_id]) = (group.divisor, group.unit_ids.as_slice()) else {
            continue;
        };
        if divisor <= 0.0 {
            continue;
        }
        if miss_chance > 0.0 && f64::from(rng.random_int(0, 100)?) < miss_chance {
            if let Some(target) = units.get(target_id) {
                log.update_log(&format!("{} misses {}", attacker.name, target.name));
            }
            continue;
        }
        let dealt = lucky_strike(&attacker, round1(base / divisor), fight, rng, log)?;
        let Some(target) = units.get_mut(target_id) else {
            continue;
        };
        if target.is_dead() {
            continue;
        }
        target.apply_damage(dealt);
        result.total_damage += dealt;
        if !primary_struck {
            result.primary_damage = dealt;
            primary_struck = true;
        }
        log.update_log(&format!(
            "{}'s shot pierces {} for {}",
            attacker.name,
            target.name,
            fmt_power(dealt)
        ));
        if target.is_dead() {
            result.unit_ids_died.push(target_id.clone());
            continue;
        }
        if has_pegasus {
            let outcome = super::apply_effect_ability(
                units,
                attacker_id,
                target_id,
                AbilityKind::PegasusLight,
                None,
                fight,
                rng,
                log,
            )?;
            if outcome == super::EffectOutcome::Applied {
                result.increase_morale += PEGASUS_LIGHT_MORALE_BONUS;
            }
        }
    }

    // One consolidated kill bonus regardless of how many ranks fell;
    // the fallen still demoralize their same-named kin one by one.
    if !result.unit_ids_died.is_empty() {
        result.increase_morale += MORALE_CHANGE_FOR_KILL;
        let fallen: Vec<(String, crate::unit::Team)> = result
            .unit_ids_died
            .iter()
            .filter_map(|id| units.get(id).map(|u| (u.name.clone(), u.team)))
            .collect();
        for (name, team) in fallen {
            units.change_morale_for_same_named(&name, team, -MORALE_CHANGE_FOR_KILL);
        }
    }
    Ok(result)
}
