//! Per-ability resolvers.
//!
//! Most hostile abilities share one skeleton: check the target can be
//! affected, roll the apply chance, check resistance, then attach a
//! fresh effect instance (or extend the active one). The skeleton lives
//! in [`apply_effect_ability`]; abilities with bespoke rules (armor
//! shattering, damage reflection, multi-target strikes) get their own
//! resolvers in the submodules.
//!
//! Resolvers never return errors for game outcomes - a failed roll or
//! a resisted effect is an [`EffectOutcome`], not an `Err`.

mod strikes;
mod support;

pub use strikes::{fire_shield, lucky_strike, penetrating_bite, skewer_strike, through_shot};
pub use support::{devour_essence, dulling_defense, miner, register_response};

use crate::effects::{AbilityKind, AppliedEffect, EffectKind, TargetAffinity};
use crate::error::Result;
use crate::fight::FightState;
use crate::math::round1;
use crate::rng::FightRng;
use crate::sinks::SceneLog;
use crate::holder::UnitsHolder;
use crate::unit::UnitId;

/// Morale swing granted for wiping out an enemy stack, and inflicted on
/// the fallen stack's same-named kin.
pub const MORALE_CHANGE_FOR_KILL: i32 = 4;

/// Morale granted to the attacker each time Pegasus Light lands during
/// a Through Shot.
pub const PEGASUS_LIGHT_MORALE_BONUS: i32 = 1;

/// How a chance-gated effect application resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOutcome {
    /// A fresh effect instance was attached.
    Applied,
    /// The already-active instance was lengthened.
    Extended,
    /// Blocked by mind-attack resistance.
    Resisted,
    /// The chance roll failed.
    Missed,
    /// Nothing to do: dead target, missing ability, or an active
    /// instance that may not be extended.
    NoOp,
}

/// Secondary triggers a Skewer Strike runs against each target it hits,
/// in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeTrigger {
    /// Transfer armor from the victim.
    Miner,
    /// Stun the victim.
    Stun,
    /// Permanently dull the victim's attack.
    DullingDefense,
    /// Petrify the victim.
    PetrifyingGaze,
    /// Corrode the victim's attack.
    BoarSaliva,
    /// Lock the victim onto the attacker.
    Aggr,
    /// Leave bleeding wounds.
    DeepWounds,
    /// Dim the victim's morale.
    PegasusLight,
    /// Weaken the victim's damage multiplier.
    Paralysis,
    /// Shatter armor on an attack, blind on a response.
    ShatterArmorOrBlindness,
}

/// The fixed resolution order of Skewer Strike secondary triggers.
///
/// Response strikes run only the final trigger.
pub const SKEWER_STRIKE_CASCADE: [CascadeTrigger; 10] = [
    CascadeTrigger::Miner,
    CascadeTrigger::Stun,
    CascadeTrigger::DullingDefense,
    CascadeTrigger::PetrifyingGaze,
    CascadeTrigger::BoarSaliva,
    CascadeTrigger::Aggr,
    CascadeTrigger::DeepWounds,
    CascadeTrigger::PegasusLight,
    CascadeTrigger::Paralysis,
    CascadeTrigger::ShatterArmorOrBlindness,
];

/// Everything a completed attack reports back to its driver.
#[derive(Debug, Clone, Default)]
pub struct AttackResult {
    /// Stacks wiped out by the attack, in hit order.
    pub unit_ids_died: Vec<UnitId>,
    /// Morale the attacker gained.
    pub increase_morale: i32,
    /// Damage dealt across all targets.
    pub total_damage: f64,
    /// Damage dealt to the primary target alone.
    pub primary_damage: f64,
}

/// Outcome of a Fire Shield reflection.
#[derive(Debug, Clone, Default)]
pub struct FireShieldResult {
    /// Magic damage reflected onto the attacker.
    pub reflected_damage: f64,
    /// Attacker stacks wiped out by the reflection.
    pub unit_ids_died: Vec<UnitId>,
    /// Morale the shield bearer gained.
    pub increase_morale: i32,
}

/// One rank a Through Shot pierces: the unit standing there and the
/// damage divisor for that depth. Groups without exactly one unit or
/// without a divisor are skipped.
#[derive(Debug, Clone)]
pub struct ThroughShotGroup {
    /// Units standing at this depth.
    pub unit_ids: Vec<UnitId>,
    /// Damage divisor for this depth.
    pub divisor: Option<f64>,
}

/// Apply a chance-gated effect ability from caster to target.
///
/// The skeleton: a dead target, a caster without the ability, or an
/// ability granting no effect is a [`EffectOutcome::NoOp`]. Otherwise
/// the apply chance (base plus the caster team's chance modifier) is
/// rolled in `[0, 100)`, succeeding strictly below the chance. A
/// successful mind-affinity application against a mind-resistant target
/// is [`EffectOutcome::Resisted`]. When the effect is already active it
/// is extended only on the unit currently taking its turn; any other
/// re-application is a no-op. A fresh application always constructs a
/// new instance with the caster's effective power.
///
/// # Errors
///
/// Propagates RNG contract violations.
#[allow(clippy::too_many_arguments)]
pub fn apply_effect_ability(
    units: &mut UnitsHolder,
    caster_id: &UnitId,
    target_id: &UnitId,
    kind: AbilityKind,
    active_unit: Option<&UnitId>,
    fight: &FightState,
    rng: &mut dyn FightRng,
    log: &mut dyn SceneLog,
) -> Result<EffectOutcome> {
    let Some(effect_kind) = kind.effect_kind() else {
        return Ok(EffectOutcome::NoOp);
    };
    let Some(caster) = units.get(caster_id) else {
        return Ok(EffectOutcome::NoOp);
    };
    let Some(ability) = caster.ability(kind).cloned() else {
        return Ok(EffectOutcome::NoOp);
    };
    let modifiers = fight.team_modifiers(caster.team);
    let chance = caster.calculate_ability_apply_chance(&ability, modifiers.ability_chance);
    let power = if ability.power > 0.0 {
        caster.calculate_ability_count(&ability, modifiers.ability_power)
    } else {
        effect_kind.template().power
    };
    let caster_name = caster.name.clone();

    let Some(target) = units.get_mut(target_id) else {
        return Ok(EffectOutcome::NoOp);
    };
    if target.is_dead() {
        return Ok(EffectOutcome::NoOp);
    }

    if f64::from(rng.random_int(0, 100)?) >= chance {
        return Ok(EffectOutcome::Missed);
    }
    if ability.affinity == TargetAffinity::Mind && target.has_mind_attack_resistance() {
        log.update_log(&format!("{} resisted {}", target.name, kind.name()));
        return Ok(EffectOutcome::Resisted);
    }

    if target.has_effect_active(effect_kind) {
        if active_unit == Some(target_id) && target.extend_effect(effect_kind) {
            log.update_log(&format!("{} on {} lingers", kind.name(), target.name));
            return Ok(EffectOutcome::Extended);
        }
        return Ok(EffectOutcome::NoOp);
    }

    target.apply_effect(AppliedEffect {
        kind: effect_kind,
        power: round1(power),
        laps_left: ability.laps,
    });
    log.update_log(&format!(
        "{caster_name} applied {} to {}",
        kind.name(),
        target.name
    ));
    Ok(EffectOutcome::Applied)
}

/// Aggr: the shared skeleton, plus locking the target onto the caster
/// when the effect lands.
///
/// # Errors
///
/// Propagates RNG contract violations.
pub fn aggr(
    units: &mut UnitsHolder,
    caster_id: &UnitId,
    target_id: &UnitId,
    active_unit: Option<&UnitId>,
    fight: &FightState,
    rng: &mut dyn FightRng,
    log: &mut dyn SceneLog,
) -> Result<EffectOutcome> {
    let outcome = apply_effect_ability(
        units,
        caster_id,
        target_id,
        AbilityKind::Aggr,
        active_unit,
        fight,
        rng,
        log,
    )?;
    if matches!(outcome, EffectOutcome::Applied | EffectOutcome::Extended) {
        if let Some(target) = units.get_mut(target_id) {
            target.target_lock = Some(caster_id.clone());
        }
    }
    Ok(outcome)
}

/// Shatter Armor: unlike the shared skeleton, repeated applications
/// accumulate power onto the active instance instead of being no-ops,
/// and the shattering is half again as strong against mechanisms.
///
/// # Errors
///
/// Propagates RNG contract violations.
pub fn shatter_armor(
    units: &mut UnitsHolder,
    caster_id: &UnitId,
    target_id: &UnitId,
    fight: &FightState,
    rng: &mut dyn FightRng,
    log: &mut dyn SceneLog,
) -> Result<EffectOutcome> {
    let Some(caster) = units.get(caster_id) else {
        return Ok(EffectOutcome::NoOp);
    };
    let Some(ability) = caster.ability(AbilityKind::ShatterArmor).cloned() else {
        return Ok(EffectOutcome::NoOp);
    };
    let modifiers = fight.team_modifiers(caster.team);
    let chance = caster.calculate_ability_apply_chance(&ability, modifiers.ability_chance);
    let mut amount = caster.calculate_ability_count(&ability, modifiers.ability_power);
    let caster_name = caster.name.clone();

    let Some(target) = units.get_mut(target_id) else {
        return Ok(EffectOutcome::NoOp);
    };
    if target.is_dead() {
        return Ok(EffectOutcome::NoOp);
    }
    if f64::from(rng.random_int(0, 100)?) >= chance {
        return Ok(EffectOutcome::Missed);
    }
    if target.has_effect_active(EffectKind::Mechanism) {
        amount = round1(amount * 1.5);
    }

    let target_name = target.name.clone();
    let outcome = if let Some(active) = target.effect_mut(EffectKind::ShatterArmor) {
        active.power = round1(active.power + amount);
        active.laps_left = ability.laps;
        EffectOutcome::Extended
    } else {
        target.apply_effect(AppliedEffect {
            kind: EffectKind::ShatterArmor,
            power: round1(amount),
            laps_left: ability.laps,
        });
        EffectOutcome::Applied
    };
    log.update_log(&format!(
        "{caster_name} shattered {} armor on {target_name}",
        crate::math::fmt_power(amount)
    ));
    Ok(outcome)
}

/// Run one cascade trigger from attacker against target, when the
/// attacker carries the matching ability. The final trigger picks its
/// branch by whether the blow was an attack or a response.
///
/// # Errors
///
/// Propagates RNG contract violations.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_cascade_trigger(
    units: &mut UnitsHolder,
    attacker_id: &UnitId,
    target_id: &UnitId,
    trigger: CascadeTrigger,
    is_response: bool,
    fight: &FightState,
    rng: &mut dyn FightRng,
    log: &mut dyn SceneLog,
) -> Result<()> {
    if !units.get(target_id).is_some_and(crate::unit::Unit::is_alive) {
        return Ok(());
    }
    match trigger {
        CascadeTrigger::Miner => {
            miner(units, attacker_id, target_id, fight, log)?;
        }
        CascadeTrigger::DullingDefense => {
            dulling_defense(units, attacker_id, target_id, fight, log)?;
        }
        CascadeTrigger::Aggr => {
            aggr(units, attacker_id, target_id, None, fight, rng, log)?;
        }
        CascadeTrigger::Stun
        | CascadeTrigger::PetrifyingGaze
        | CascadeTrigger::BoarSaliva
        | CascadeTrigger::DeepWounds
        | CascadeTrigger::PegasusLight
        | CascadeTrigger::Paralysis => {
            let kind = match trigger {
                CascadeTrigger::Stun => AbilityKind::Stun,
                CascadeTrigger::PetrifyingGaze => AbilityKind::PetrifyingGaze,
                CascadeTrigger::BoarSaliva => AbilityKind::BoarSaliva,
                CascadeTrigger::DeepWounds => AbilityKind::DeepWounds,
                CascadeTrigger::PegasusLight => AbilityKind::PegasusLight,
                _ => AbilityKind::Paralysis,
            };
            apply_effect_ability(units, attacker_id, target_id, kind, None, fight, rng, log)?;
        }
        CascadeTrigger::ShatterArmorOrBlindness => {
            if !is_response {
                shatter_armor(units, attacker_id, target_id, fight, rng, log)?;
            } else {
                apply_effect_ability(
                    units,
                    attacker_id,
                    target_id,
                    AbilityKind::Blindness,
                    None,
                    fight,
                    rng,
                    log,
                )?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Ability;
    use crate::sinks::RecordedLog;
    use crate::unit::{Team, Unit, UnitSpawnParams};

    pub(super) fn uid(s: &str) -> UnitId {
        UnitId::new(s).unwrap()
    }

    /// RNG that replays a fixed script of rolls.
    pub(super) struct ScriptRng {
        rolls: Vec<i32>,
        next: usize,
    }

    impl ScriptRng {
        pub(super) fn new(rolls: &[i32]) -> Self {
            Self {
                rolls: rolls.to_vec(),
                next: 0,
            }
        }
    }

    impl FightRng for ScriptRng {
        fn random_int(&mut self, min: i32, max: i32) -> Result<i32> {
            let roll = self.rolls.get(self.next).copied().unwrap_or(min);
            self.next += 1;
            Ok(roll.clamp(min, max - 1))
        }
    }

    pub(super) fn caster_with(kind: AbilityKind, team: Team) -> Unit {
        Unit::spawn(
            uid("caster"),
            UnitSpawnParams {
                name: "Caster".to_owned(),
                team,
                abilities: vec![Ability::preset(kind)],
                ..UnitSpawnParams::default()
            },
        )
    }

    pub(super) fn plain_target(team: Team) -> Unit {
        Unit::spawn(
            uid("target"),
            UnitSpawnParams {
                name: "Target".to_owned(),
                team,
                max_hp: 10.0,
                amount: 3,
                ..UnitSpawnParams::default()
            },
        )
    }

    fn setup(kind: AbilityKind) -> (UnitsHolder, FightState, RecordedLog) {
        let mut units = UnitsHolder::new();
        units.add_unit(caster_with(kind, Team::Upper)).unwrap();
        units.add_unit(plain_target(Team::Lower)).unwrap();
        (units, FightState::new(), RecordedLog::new())
    }

    #[test]
    fn test_roll_strictly_below_chance_succeeds() {
        // Stun preset chance is 20: a roll of 19 lands, 20 does not.
        let (mut units, fight, mut log) = setup(AbilityKind::Stun);
        let mut rng = ScriptRng::new(&[19]);
        let outcome = apply_effect_ability(
            &mut units,
            &uid("caster"),
            &uid("target"),
            AbilityKind::Stun,
            None,
            &fight,
            &mut rng,
            &mut log,
        )
        .unwrap();
        assert_eq!(outcome, EffectOutcome::Applied);

        let (mut units, fight, mut log) = setup(AbilityKind::Stun);
        let mut rng = ScriptRng::new(&[20]);
        let outcome = apply_effect_ability(
            &mut units,
            &uid("caster"),
            &uid("target"),
            AbilityKind::Stun,
            None,
            &fight,
            &mut rng,
            &mut log,
        )
        .unwrap();
        assert_eq!(outcome, EffectOutcome::Missed);
    }

    #[test]
    fn test_mind_resistance_checked_after_roll() {
        let (mut units, fight, mut log) = setup(AbilityKind::Stun);
        units
            .get_mut(&uid("target"))
            .unwrap()
            .abilities
            .push(Ability::preset(AbilityKind::MindResistance));

        let mut rng = ScriptRng::new(&[0]);
        let outcome = apply_effect_ability(
            &mut units,
            &uid("caster"),
            &uid("target"),
            AbilityKind::Stun,
            None,
            &fight,
            &mut rng,
            &mut log,
        )
        .unwrap();
        assert_eq!(outcome, EffectOutcome::Resisted);
        assert!(log.log().contains("Target resisted Stun"));
    }

    #[test]
    fn test_no_reapplication_extension_only_on_active_unit() {
        let (mut units, fight, mut log) = setup(AbilityKind::Stun);
        let mut rng = ScriptRng::new(&[0, 0, 0]);
        let args = (uid("caster"), uid("target"));

        let first = apply_effect_ability(
            &mut units,
            &args.0,
            &args.1,
            AbilityKind::Stun,
            None,
            &fight,
            &mut rng,
            &mut log,
        )
        .unwrap();
        assert_eq!(first, EffectOutcome::Applied);

        // Re-application to a non-active target does nothing.
        let second = apply_effect_ability(
            &mut units,
            &args.0,
            &args.1,
            AbilityKind::Stun,
            None,
            &fight,
            &mut rng,
            &mut log,
        )
        .unwrap();
        assert_eq!(second, EffectOutcome::NoOp);

        // Against the unit currently acting, the duration extends.
        let third = apply_effect_ability(
            &mut units,
            &args.0,
            &args.1,
            AbilityKind::Stun,
            Some(&args.1),
            &fight,
            &mut rng,
            &mut log,
        )
        .unwrap();
        assert_eq!(third, EffectOutcome::Extended);
        let target = units.get(&uid("target")).unwrap();
        assert_eq!(target.effects()[0].laps_left, 2);
    }

    #[test]
    fn test_chance_modifier_shifts_roll_threshold() {
        let (mut units, mut fight, mut log) = setup(AbilityKind::Stun);
        fight.team_modifiers_mut(Team::Upper).ability_chance = 30.0;

        // 20 base + 30 modifier = 50: a roll of 49 now lands.
        let mut rng = ScriptRng::new(&[49]);
        let outcome = apply_effect_ability(
            &mut units,
            &uid("caster"),
            &uid("target"),
            AbilityKind::Stun,
            None,
            &fight,
            &mut rng,
            &mut log,
        )
        .unwrap();
        assert_eq!(outcome, EffectOutcome::Applied);
    }

    #[test]
    fn test_aggr_locks_target_onto_caster() {
        let (mut units, fight, mut log) = setup(AbilityKind::Aggr);
        let mut rng = ScriptRng::new(&[0]);
        let outcome = aggr(
            &mut units,
            &uid("caster"),
            &uid("target"),
            None,
            &fight,
            &mut rng,
            &mut log,
        )
        .unwrap();
        assert_eq!(outcome, EffectOutcome::Applied);
        assert_eq!(
            units.get(&uid("target")).unwrap().target_lock,
            Some(uid("caster"))
        );
    }

    #[test]
    fn test_shatter_armor_accumulates() {
        let (mut units, fight, mut log) = setup(AbilityKind::ShatterArmor);
        let mut rng = ScriptRng::new(&[0, 0]);

        shatter_armor(
            &mut units,
            &uid("caster"),
            &uid("target"),
            &fight,
            &mut rng,
            &mut log,
        )
        .unwrap();
        let outcome = shatter_armor(
            &mut units,
            &uid("caster"),
            &uid("target"),
            &fight,
            &mut rng,
            &mut log,
        )
        .unwrap();

        assert_eq!(outcome, EffectOutcome::Extended);
        let target = units.get(&uid("target")).unwrap();
        let shatter = target
            .effects()
            .iter()
            .find(|e| e.kind == EffectKind::ShatterArmor)
            .unwrap();
        assert_eq!(shatter.power, 2.0);
    }

    #[test]
    fn test_shatter_armor_amplified_against_mechanisms() {
        let (mut units, fight, mut log) = setup(AbilityKind::ShatterArmor);
        units
            .get_mut(&uid("target"))
            .unwrap()
            .apply_effect(crate::effects::AppliedEffect::from_template(
                EffectKind::Mechanism,
            ));

        let mut rng = ScriptRng::new(&[0]);
        shatter_armor(
            &mut units,
            &uid("caster"),
            &uid("target"),
            &fight,
            &mut rng,
            &mut log,
        )
        .unwrap();

        let target = units.get(&uid("target")).unwrap();
        let shatter = target
            .effects()
            .iter()
            .find(|e| e.kind == EffectKind::ShatterArmor)
            .unwrap();
        assert_eq!(shatter.power, 1.5);
    }

    #[test]
    fn test_cascade_order_is_fixed() {
        assert_eq!(SKEWER_STRIKE_CASCADE.len(), 10);
        assert_eq!(SKEWER_STRIKE_CASCADE[0], CascadeTrigger::Miner);
        assert_eq!(SKEWER_STRIKE_CASCADE[1], CascadeTrigger::Stun);
        assert_eq!(SKEWER_STRIKE_CASCADE[2], CascadeTrigger::DullingDefense);
        assert_eq!(SKEWER_STRIKE_CASCADE[3], CascadeTrigger::PetrifyingGaze);
        assert_eq!(SKEWER_STRIKE_CASCADE[4], CascadeTrigger::BoarSaliva);
        assert_eq!(SKEWER_STRIKE_CASCADE[5], CascadeTrigger::Aggr);
        assert_eq!(SKEWER_STRIKE_CASCADE[6], CascadeTrigger::DeepWounds);
        assert_eq!(SKEWER_STRIKE_CASCADE[7], CascadeTrigger::PegasusLight);
        assert_eq!(SKEWER_STRIKE_CASCADE[8], CascadeTrigger::Paralysis);
        assert_eq!(
            SKEWER_STRIKE_CASCADE[9],
            CascadeTrigger::ShatterArmorOrBlindness
        );
    }
}
