//! Whole-fight flow tests.
//!
//! These exercise the resolution pipeline end to end: lap refresh, turn
//! order, strikes with their cascades, deletion and victory detection.

use fight_core::abilities::{self, EffectOutcome, MORALE_CHANGE_FOR_KILL};
use fight_core::effects::{
    Ability, AbilityKind, AuraEffect, AuraPolarity, EffectKind, TargetAffinity,
};
use fight_core::fight::FightState;
use fight_core::grid::Board;
use fight_core::holder::{DeletionOutcome, UnitsHolder};
use fight_core::sinks::{RecordedLog, SceneLog, StatisticHolder};
use fight_core::unit::{Team, Unit, UnitSpawnParams};
use fight_test_utils::fixtures::{cell, skirmish, stack_with_ability, uid, ConstRng, ScriptRng};

#[test]
fn one_lap_plays_out_to_a_winner() {
    let (mut units, mut board, mut fight) = skirmish().unwrap();
    let mut log = RecordedLog::new();
    let mut rng = ConstRng(3);

    // The swordsman stack is one hit from collapse.
    units.get_mut(&uid("upper-1")).unwrap().apply_damage(40.0);

    // Speeds tie, so the lowest id acts first.
    let actor = fight.choose_next_actor(&units).unwrap();
    assert_eq!(actor, uid("lower-1"));

    let damage = units
        .require_mut(&actor)
        .unwrap()
        .roll_attack_damage(&mut rng)
        .unwrap();
    // 5 wolves at a scripted 3 per creature.
    assert_eq!(damage, 15.0);

    let result = abilities::skewer_strike(
        &mut units,
        &actor,
        &uid("upper-1"),
        damage,
        false,
        &fight,
        &board,
        &mut rng,
        &mut log,
    )
    .unwrap();
    let team = units.get(&actor).unwrap().team;
    fight.mark_turn_made(&actor, team);

    assert_eq!(result.unit_ids_died, vec![uid("upper-1")]);
    for id in &result.unit_ids_died {
        units.delete_unit(id, &mut board, &mut fight, &mut log).unwrap();
    }

    assert_eq!(fight.winner(), Some(Team::Lower));
    assert!(log.log().contains("perished"));
}

#[test]
fn team_chance_modifier_shifts_ability_outcomes() {
    let mut units = UnitsHolder::new();
    units
        .add_unit(Unit::spawn(
            uid("stunner"),
            stack_with_ability("Ogre", Team::Upper, 1, 10.0, AbilityKind::Stun),
        ))
        .unwrap();
    units
        .add_unit(Unit::spawn(
            uid("victim"),
            UnitSpawnParams {
                name: "Peasant".to_owned(),
                team: Team::Lower,
                ..UnitSpawnParams::default()
            },
        ))
        .unwrap();
    let mut fight = FightState::new();
    let mut log = RecordedLog::new();

    // Stun's preset chance is 20; a roll of 30 misses.
    let mut rng = ScriptRng::new(&[30]);
    let outcome = abilities::apply_effect_ability(
        &mut units,
        &uid("stunner"),
        &uid("victim"),
        AbilityKind::Stun,
        None,
        &fight,
        &mut rng,
        &mut log,
    )
    .unwrap();
    assert_eq!(outcome, EffectOutcome::Missed);

    // +15 chance from the team modifier turns the same roll into a hit.
    fight.team_modifiers_mut(Team::Upper).ability_chance = 15.0;
    let mut rng = ScriptRng::new(&[30]);
    let outcome = abilities::apply_effect_ability(
        &mut units,
        &uid("stunner"),
        &uid("victim"),
        AbilityKind::Stun,
        None,
        &fight,
        &mut rng,
        &mut log,
    )
    .unwrap();
    assert_eq!(outcome, EffectOutcome::Applied);
    assert!(units.get(&uid("victim")).unwrap().has_effect_active(EffectKind::Stun));
}

#[test]
fn miner_in_the_cascade_transfers_armor() {
    let mut units = UnitsHolder::new();
    let mut board = Board::new(8, 8).unwrap();
    units
        .add_unit(Unit::spawn(
            uid("dwarf"),
            UnitSpawnParams {
                name: "Dwarf".to_owned(),
                team: Team::Upper,
                abilities: vec![
                    Ability::preset(AbilityKind::SkewerStrike),
                    Ability::preset(AbilityKind::Miner),
                ],
                ..UnitSpawnParams::default()
            },
        ))
        .unwrap();
    units
        .add_unit(Unit::spawn(
            uid("knight"),
            UnitSpawnParams {
                name: "Knight".to_owned(),
                team: Team::Lower,
                max_hp: 100.0,
                armor: 5.0,
                ..UnitSpawnParams::default()
            },
        ))
        .unwrap();
    units.place_unit(&uid("dwarf"), vec![cell(2, 2)], &mut board).unwrap();
    units.place_unit(&uid("knight"), vec![cell(2, 3)], &mut board).unwrap();
    let fight = FightState::new();
    let mut log = RecordedLog::new();
    let mut rng = ScriptRng::new(&[]);

    abilities::skewer_strike(
        &mut units,
        &uid("dwarf"),
        &uid("knight"),
        10.0,
        false,
        &fight,
        &board,
        &mut rng,
        &mut log,
    )
    .unwrap();

    // Miner's preset moves 2 points of base armor across.
    assert_eq!(units.get(&uid("knight")).unwrap().base_armor, 3.0);
    assert_eq!(units.get(&uid("dwarf")).unwrap().base_armor, 2.0);
    assert!(log.log().contains("Dwarf mined 2 armor from Knight"));
}

#[test]
fn devour_essence_heals_up_to_the_cap_after_a_kill() {
    let mut units = UnitsHolder::new();
    let mut board = Board::new(8, 8).unwrap();
    units
        .add_unit(Unit::spawn(
            uid("fiend"),
            UnitSpawnParams {
                name: "Fiend".to_owned(),
                team: Team::Upper,
                max_hp: 50.0,
                amount: 1,
                abilities: vec![
                    Ability::preset(AbilityKind::SkewerStrike),
                    Ability::preset(AbilityKind::DevourEssence),
                ],
                ..UnitSpawnParams::default()
            },
        ))
        .unwrap();
    units
        .add_unit(Unit::spawn(
            uid("prey"),
            UnitSpawnParams {
                name: "Prey".to_owned(),
                team: Team::Lower,
                max_hp: 5.0,
                amount: 1,
                ..UnitSpawnParams::default()
            },
        ))
        .unwrap();
    units.place_unit(&uid("fiend"), vec![cell(2, 2)], &mut board).unwrap();
    units.place_unit(&uid("prey"), vec![cell(2, 3)], &mut board).unwrap();
    units.get_mut(&uid("fiend")).unwrap().hp = 10.0;
    let fight = FightState::new();
    let mut log = RecordedLog::new();
    let mut rng = ScriptRng::new(&[]);

    let result = abilities::skewer_strike(
        &mut units,
        &uid("fiend"),
        &uid("prey"),
        10.0,
        false,
        &fight,
        &board,
        &mut rng,
        &mut log,
    )
    .unwrap();
    assert_eq!(result.unit_ids_died, vec![uid("prey")]);

    // Cap is ceil(50 * 60%) = 30; from 10 hp that is 20 restored.
    let healed = abilities::devour_essence(&mut units, &uid("fiend"), &result.unit_ids_died, &mut log)
        .unwrap();
    assert_eq!(healed, 20.0);
    assert_eq!(units.get(&uid("fiend")).unwrap().hp, 30.0);
    assert!(log.log().contains("devours the essence of the slain"));
}

#[test]
fn resurrection_intercepts_deletion_once() {
    let mut units = UnitsHolder::new();
    let mut board = Board::new(8, 8).unwrap();
    let mut fight = FightState::new();
    let mut log = RecordedLog::new();

    units
        .add_unit(Unit::spawn(
            uid("phoenix"),
            UnitSpawnParams {
                name: "Phoenix".to_owned(),
                team: Team::Lower,
                max_hp: 20.0,
                amount: 7,
                abilities: vec![Ability::preset(AbilityKind::Resurrection)],
                ..UnitSpawnParams::default()
            },
        ))
        .unwrap();
    fight.set_team_alive(Team::Lower, 1);
    fight.set_team_alive(Team::Upper, 1);

    units.get_mut(&uid("phoenix")).unwrap().apply_damage(10_000.0);
    let outcome = units
        .delete_unit(&uid("phoenix"), &mut board, &mut fight, &mut log)
        .unwrap();

    // floor(7 / 2) = 3 creatures return; the fight is not over.
    assert_eq!(outcome, DeletionOutcome::Resurrected { revived: 3 });
    assert_eq!(fight.team_alive(Team::Lower), 1);
    assert_eq!(fight.winner(), None);
    assert!(log.log().contains("refuses to fall"));

    units.get_mut(&uid("phoenix")).unwrap().apply_damage(10_000.0);
    let outcome = units
        .delete_unit(&uid("phoenix"), &mut board, &mut fight, &mut log)
        .unwrap();
    assert_eq!(outcome, DeletionOutcome::Deleted);
    assert_eq!(fight.winner(), Some(Team::Upper));
}

#[test]
fn mind_abilities_respect_mechanism_targets() {
    let mut units = UnitsHolder::new();
    units
        .add_unit(Unit::spawn(
            uid("banshee"),
            stack_with_ability("Banshee", Team::Upper, 1, 10.0, AbilityKind::Aggr),
        ))
        .unwrap();
    units
        .add_unit(Unit::spawn(
            uid("golem"),
            UnitSpawnParams {
                name: "Golem".to_owned(),
                team: Team::Lower,
                innate_effects: vec![EffectKind::Mechanism],
                ..UnitSpawnParams::default()
            },
        ))
        .unwrap();
    let fight = FightState::new();
    let mut log = RecordedLog::new();
    // Aggr's preset chance is 40; roll 0 passes the gate.
    let mut rng = ScriptRng::new(&[0]);

    assert_eq!(Ability::preset(AbilityKind::Aggr).affinity, TargetAffinity::Mind);
    let outcome = abilities::aggr(
        &mut units,
        &uid("banshee"),
        &uid("golem"),
        None,
        &fight,
        &mut rng,
        &mut log,
    )
    .unwrap();

    assert_eq!(outcome, EffectOutcome::Resisted);
    assert_eq!(units.get(&uid("golem")).unwrap().target_lock, None);
    assert!(log.log().contains("Golem resisted Aggr"));
}

#[test]
fn fire_shield_reflection_feeds_the_damage_ledger() {
    let mut units = UnitsHolder::new();
    units
        .add_unit(Unit::spawn(
            uid("attacker"),
            UnitSpawnParams {
                name: "Swordsman".to_owned(),
                team: Team::Upper,
                max_hp: 100.0,
                amount: 1,
                ..UnitSpawnParams::default()
            },
        ))
        .unwrap();
    units
        .add_unit(Unit::spawn(
            uid("efreet"),
            stack_with_ability("Efreet", Team::Lower, 1, 30.0, AbilityKind::FireShield),
        ))
        .unwrap();
    let fight = FightState::new();
    let mut log = RecordedLog::new();
    let mut stats = StatisticHolder::new();

    let result = abilities::fire_shield(
        &mut units,
        &uid("attacker"),
        &uid("efreet"),
        50.0,
        &fight,
        &mut log,
        &mut stats,
    )
    .unwrap();

    // ceil(50 * 30%) = 15 comes back as magic damage.
    assert_eq!(result.reflected_damage, 15.0);
    assert_eq!(units.get(&uid("attacker")).unwrap().hp, 85.0);
    let ledger = stats.get(|a, b| a.lap.cmp(&b.lap));
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].unit_name, "Efreet");
    assert_eq!(ledger[0].damage, 15.0);
}

#[test]
fn tied_auras_collapse_to_a_single_instance() {
    let mut units = UnitsHolder::new();
    let mut board = Board::new(8, 8).unwrap();
    let fight = FightState::new();

    for (id, at) in [("banner-a", (0, 0)), ("banner-b", (2, 0))] {
        units
            .add_unit(Unit::spawn(
                uid(id),
                UnitSpawnParams {
                    name: "Standard Bearer".to_owned(),
                    team: Team::Upper,
                    aura_effects: vec![AuraEffect {
                        kind: EffectKind::WarAnger,
                        power: 3.0,
                        range: 3,
                        polarity: AuraPolarity::Buff,
                    }],
                    ..UnitSpawnParams::default()
                },
            ))
            .unwrap();
        units.place_unit(&uid(id), vec![cell(at.0, at.1)], &mut board).unwrap();
    }
    units
        .add_unit(Unit::spawn(
            uid("soldier"),
            UnitSpawnParams {
                name: "Soldier".to_owned(),
                team: Team::Upper,
                ..UnitSpawnParams::default()
            },
        ))
        .unwrap();
    units.place_unit(&uid("soldier"), vec![cell(1, 0)], &mut board).unwrap();

    let anger_on_soldier = |units: &UnitsHolder| {
        units
            .get(&uid("soldier"))
            .unwrap()
            .buffs()
            .iter()
            .filter(|b| b.kind == EffectKind::WarAnger)
            .map(|b| b.power)
            .collect::<Vec<_>>()
    };

    // Two equal-power auras overlap the soldier; one instance lands.
    units.refresh_aura_effects_for_all_units(&fight, &board);
    assert_eq!(anger_on_soldier(&units), vec![3.0]);

    // Losing one emitter changes nothing the soldier can observe.
    units.get_mut(&uid("banner-a")).unwrap().apply_damage(10_000.0);
    units.refresh_aura_effects_for_all_units(&fight, &board);
    assert_eq!(anger_on_soldier(&units), vec![3.0]);
}

#[test]
fn morale_penalty_reaches_same_named_kin_only() {
    let (mut units, _board, _fight) = skirmish().unwrap();
    units
        .add_unit(Unit::spawn(
            uid("lower-2"),
            UnitSpawnParams {
                name: "Wolf".to_owned(),
                team: Team::Lower,
                ..UnitSpawnParams::default()
            },
        ))
        .unwrap();

    units.change_morale_for_same_named("Wolf", Team::Lower, -MORALE_CHANGE_FOR_KILL);

    assert_eq!(units.get(&uid("lower-1")).unwrap().morale, -4);
    assert_eq!(units.get(&uid("lower-2")).unwrap().morale, -4);
    assert_eq!(units.get(&uid("upper-1")).unwrap().morale, 0);
}
