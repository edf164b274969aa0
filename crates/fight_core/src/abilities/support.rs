//! Stat-transfer and sustain resolvers.

use crate::effects::AbilityKind;
use crate::error::Result;
use crate::fight::FightState;
use crate::math::{fmt_power, round1};
use crate::sinks::SceneLog;
use crate::holder::UnitsHolder;
use crate::unit::UnitId;

/// Miner: transfer armor from the target to the caster.
///
/// The amount is the caster's Miner power scaled by the *target* team's
/// ability-power modifier and is bounded by the armor the target still
/// has. Returns the armor actually moved.
///
/// # Errors
///
/// Infallible today; the `Result` keeps the resolver signature uniform.
pub fn miner(
    units: &mut UnitsHolder,
    caster_id: &UnitId,
    target_id: &UnitId,
    fight: &FightState,
    log: &mut dyn SceneLog,
) -> Result<f64> {
    let Some((caster, target)) = units.pair_mut(caster_id, target_id) else {
        return Ok(0.0);
    };
    let Some(ability) = caster.ability(AbilityKind::Miner).cloned() else {
        return Ok(0.0);
    };
    if target.is_dead() {
        return Ok(0.0);
    }

    let power_modifier = fight.team_modifiers(target.team).ability_power;
    let amount = caster
        .calculate_ability_count(&ability, power_modifier)
        .min(target.base_armor)
        .max(0.0);
    if amount <= 0.0 {
        return Ok(0.0);
    }

    target.base_armor = round1(target.base_armor - amount);
    target.armor = round1((target.armor - amount).max(0.0));
    caster.base_armor = round1(caster.base_armor + amount);
    caster.armor = round1(caster.armor + amount);

    log.update_log(&format!(
        "{} mined {} armor from {}",
        caster.name,
        fmt_power(amount),
        target.name
    ));
    Ok(amount)
}

/// Dulling Defense: permanently reduce the target's attack stat.
///
/// The reduction is bounded by the attack the target still has and is
/// logged only when it changes anything. Returns the attack removed.
///
/// # Errors
///
/// Infallible today; the `Result` keeps the resolver signature uniform.
pub fn dulling_defense(
    units: &mut UnitsHolder,
    caster_id: &UnitId,
    target_id: &UnitId,
    fight: &FightState,
    log: &mut dyn SceneLog,
) -> Result<f64> {
    let Some((caster, target)) = units.pair_mut(caster_id, target_id) else {
        return Ok(0.0);
    };
    let Some(ability) = caster.ability(AbilityKind::DullingDefense).cloned() else {
        return Ok(0.0);
    };
    if target.is_dead() {
        return Ok(0.0);
    }

    let power_modifier = fight.team_modifiers(caster.team).ability_power;
    let reduction = caster
        .calculate_ability_count(&ability, power_modifier)
        .min(target.base_attack)
        .max(0.0);
    if reduction <= 0.0 {
        return Ok(0.0);
    }

    target.base_attack = round1(target.base_attack - reduction);
    target.attack = round1((target.attack - reduction).max(0.0));
    log.update_log(&format!(
        "{} dulled {}'s attack by {}",
        caster.name,
        target.name,
        fmt_power(reduction)
    ));
    Ok(reduction)
}

/// Record that a unit spent its response to an attack.
///
/// Units normally get one response per lap; a unit with One in the
/// Field never exhausts its response, so nothing is recorded for it.
///
/// # Errors
///
/// Returns [`crate::error::FightError::UnitNotFound`] for an unknown
/// responder.
pub fn register_response(
    units: &mut UnitsHolder,
    responder_id: &UnitId,
    fight: &mut FightState,
) -> Result<()> {
    let responder = units.require_mut(responder_id)?;
    if responder.has_ability(AbilityKind::OneInTheField) {
        return Ok(());
    }
    responder.responded = true;
    fight.mark_replied(responder_id);
    Ok(())
}

/// Devour Essence: after a kill of an opposing unit, heal the
/// devourer's top creature toward a cap of
/// `ceil(max_hp * min(1, power / 100))`.
///
/// Healing never exceeds the cap and never occurs without an enemy
/// death; fallen allies feed nothing. Returns the health restored.
///
/// # Errors
///
/// Infallible today; the `Result` keeps the resolver signature uniform.
pub fn devour_essence(
    units: &mut UnitsHolder,
    devourer_id: &UnitId,
    killed: &[UnitId],
    log: &mut dyn SceneLog,
) -> Result<f64> {
    let Some(devourer) = units.get(devourer_id) else {
        return Ok(0.0);
    };
    let Some(ability) = devourer.ability(AbilityKind::DevourEssence).cloned() else {
        return Ok(0.0);
    };
    if devourer.is_dead() {
        return Ok(0.0);
    }
    let foe_team = devourer.team.opposing();
    if !killed
        .iter()
        .any(|id| units.get(id).is_some_and(|u| u.team == foe_team))
    {
        return Ok(0.0);
    }
    let Some(devourer) = units.get_mut(devourer_id) else {
        return Ok(0.0);
    };

    let cap = (devourer.max_hp * (ability.power / 100.0).min(1.0)).ceil();
    let headroom = (cap - devourer.hp).max(0.0);
    let healed = devourer.heal(headroom);
    if healed > 0.0 {
        log.update_log(&format!(
            "{} devours the essence of the slain, restoring {}",
            devourer.name,
            fmt_power(healed)
        ));
    }
    Ok(healed)
}

#[cfg(test)]
mod tests {
    use super::super::tests::uid;
    use super::*;
    use crate::effects::Ability;
    use crate::sinks::RecordedLog;
    use crate::unit::{Team, Unit, UnitSpawnParams};

    fn holder_with(caster: UnitSpawnParams, target: UnitSpawnParams) -> UnitsHolder {
        let mut units = UnitsHolder::new();
        units.add_unit(Unit::spawn(uid("caster"), caster)).unwrap();
        units.add_unit(Unit::spawn(uid("target"), target)).unwrap();
        units
    }

    #[test]
    fn test_miner_transfers_and_logs() {
        let mut units = holder_with(
            UnitSpawnParams {
                name: "Dwarf".to_owned(),
                team: Team::Upper,
                armor: 1.0,
                abilities: vec![Ability::preset(AbilityKind::Miner)],
                ..UnitSpawnParams::default()
            },
            UnitSpawnParams {
                name: "Knight".to_owned(),
                team: Team::Lower,
                armor: 5.0,
                ..UnitSpawnParams::default()
            },
        );
        let fight = FightState::new();
        let mut log = RecordedLog::new();

        let moved = miner(&mut units, &uid("caster"), &uid("target"), &fight, &mut log).unwrap();

        assert_eq!(moved, 2.0);
        assert_eq!(units.get(&uid("caster")).unwrap().base_armor, 3.0);
        assert_eq!(units.get(&uid("target")).unwrap().base_armor, 3.0);
        assert!(log.log().contains("Dwarf mined 2 armor from Knight"));
    }

    #[test]
    fn test_miner_bounded_by_target_armor() {
        let mut units = holder_with(
            UnitSpawnParams {
                team: Team::Upper,
                abilities: vec![Ability::preset(AbilityKind::Miner)],
                ..UnitSpawnParams::default()
            },
            UnitSpawnParams {
                team: Team::Lower,
                armor: 0.5,
                ..UnitSpawnParams::default()
            },
        );
        let fight = FightState::new();
        let mut log = RecordedLog::new();

        let moved = miner(&mut units, &uid("caster"), &uid("target"), &fight, &mut log).unwrap();
        assert_eq!(moved, 0.5);
        assert_eq!(units.get(&uid("target")).unwrap().base_armor, 0.0);
    }

    #[test]
    fn test_dulling_defense_silent_when_nothing_to_dull() {
        let mut units = holder_with(
            UnitSpawnParams {
                team: Team::Upper,
                abilities: vec![Ability::preset(AbilityKind::DullingDefense)],
                ..UnitSpawnParams::default()
            },
            UnitSpawnParams {
                team: Team::Lower,
                attack: 0.0,
                ..UnitSpawnParams::default()
            },
        );
        let fight = FightState::new();
        let mut log = RecordedLog::new();

        let dulled =
            dulling_defense(&mut units, &uid("caster"), &uid("target"), &fight, &mut log).unwrap();
        assert_eq!(dulled, 0.0);
        assert!(!log.has_been_updated());
    }

    #[test]
    fn test_one_in_the_field_never_exhausts_response() {
        let mut units = holder_with(
            UnitSpawnParams {
                team: Team::Upper,
                abilities: vec![Ability::preset(AbilityKind::OneInTheField)],
                ..UnitSpawnParams::default()
            },
            UnitSpawnParams {
                team: Team::Lower,
                ..UnitSpawnParams::default()
            },
        );
        let mut fight = FightState::new();

        register_response(&mut units, &uid("caster"), &mut fight).unwrap();
        assert!(!fight.has_replied(&uid("caster")));

        register_response(&mut units, &uid("target"), &mut fight).unwrap();
        assert!(fight.has_replied(&uid("target")));
        assert!(units.get(&uid("target")).unwrap().responded);
    }

    #[test]
    fn test_devour_essence_heals_to_cap_only() {
        let mut units = holder_with(
            UnitSpawnParams {
                name: "Ghoul".to_owned(),
                team: Team::Upper,
                max_hp: 50.0,
                amount: 1,
                abilities: vec![Ability::preset(AbilityKind::DevourEssence)],
                ..UnitSpawnParams::default()
            },
            UnitSpawnParams {
                team: Team::Lower,
                ..UnitSpawnParams::default()
            },
        );
        let mut log = RecordedLog::new();
        units.get_mut(&uid("caster")).unwrap().apply_damage(40.0);

        // Cap is ceil(50 * 0.6) = 30; from 10 hp that is 20 restored.
        let healed =
            devour_essence(&mut units, &uid("caster"), &[uid("target")], &mut log).unwrap();
        assert_eq!(healed, 20.0);
        assert_eq!(units.get(&uid("caster")).unwrap().hp, 30.0);

        // Already at the cap: no further healing.
        let healed =
            devour_essence(&mut units, &uid("caster"), &[uid("target")], &mut log).unwrap();
        assert_eq!(healed, 0.0);
    }

    #[test]
    fn test_devour_essence_requires_a_kill() {
        let mut units = holder_with(
            UnitSpawnParams {
                max_hp: 50.0,
                abilities: vec![Ability::preset(AbilityKind::DevourEssence)],
                ..UnitSpawnParams::default()
            },
            UnitSpawnParams::default(),
        );
        let mut log = RecordedLog::new();
        units.get_mut(&uid("caster")).unwrap().apply_damage(40.0);

        let healed = devour_essence(&mut units, &uid("caster"), &[], &mut log).unwrap();
        assert_eq!(healed, 0.0);
    }

    #[test]
    fn test_devour_essence_ignores_fallen_allies() {
        let mut units = holder_with(
            UnitSpawnParams {
                team: Team::Upper,
                max_hp: 50.0,
                amount: 1,
                abilities: vec![Ability::preset(AbilityKind::DevourEssence)],
                ..UnitSpawnParams::default()
            },
            UnitSpawnParams {
                team: Team::Upper,
                ..UnitSpawnParams::default()
            },
        );
        let mut log = RecordedLog::new();
        units.get_mut(&uid("caster")).unwrap().apply_damage(40.0);

        // Only enemy deaths feed the devourer.
        let healed =
            devour_essence(&mut units, &uid("caster"), &[uid("target")], &mut log).unwrap();
        assert_eq!(healed, 0.0);
        assert_eq!(units.get(&uid("caster")).unwrap().hp, 10.0);
    }
}
