//! Combat units.
//!
//! A unit is a *stack* of identical creatures sharing one health pool:
//! damage drains the pool and kills whole creatures off the top,
//! resurrection refills it. All per-lap stat recomputation lives in
//! [`Unit::refresh_for_lap`] so that effects and team modifiers are
//! applied from base stats every lap instead of mutating in place.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::effects::{
    Ability, AbilityKind, AppliedBuff, AppliedEffect, AuraEffect, EffectKind,
};
use crate::error::{FightError, Result};
use crate::fight::TeamModifiers;
use crate::grid::GridCell;
use crate::math::{clamp_chance, round1};
use crate::rng::FightRng;

/// Morale is clamped to `[-10, 10]` after modifiers.
pub const MORALE_MAX_VALUE: i32 = 10;

/// Luck is clamped to `[-10, 10]` after modifiers.
pub const LUCK_MAX_VALUE: i32 = 10;

/// Stack power saturates at lap 10.
pub const MAX_STACK_POWER: f64 = 10.0;

/// Which side of the board a unit fights for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Team {
    /// Not yet assigned; never participates in a fight.
    #[default]
    NoTeam,
    /// Placed along the top rows.
    Upper,
    /// Placed along the bottom rows.
    Lower,
}

impl Team {
    /// The opposing side. [`Team::NoTeam`] opposes nobody.
    #[must_use]
    pub const fn opposing(self) -> Self {
        match self {
            Self::Upper => Self::Lower,
            Self::Lower => Self::Upper,
            Self::NoTeam => Self::NoTeam,
        }
    }
}

/// Creature race; drives flavor and a handful of racial rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Race {
    /// Knights, clerics, griffins.
    #[default]
    Life,
    /// Demons and the warped.
    Chaos,
    /// Barbarians and beasts.
    Might,
    /// Elves, sprites, treants.
    Nature,
    /// The risen and the undying.
    Death,
}

/// Footprint of a single creature on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitSize {
    /// Occupies one cell.
    #[default]
    Small,
    /// Occupies a 2x2 block of cells.
    Large,
}

/// How a unit delivers its primary attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AttackType {
    /// Adjacent-cell strikes; can be responded to.
    #[default]
    Melee,
    /// Shots across the board; reflected by Fire Shield.
    Range,
    /// Spell damage; ignores Fire Shield.
    Magic,
}

/// Validated unit identifier.
///
/// Identifiers are opaque non-blank strings; their [`Ord`] is the
/// engine-wide deterministic iteration and tie-break order.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Create an identifier, rejecting empty or blank strings.
    ///
    /// # Errors
    ///
    /// Returns [`FightError::InvalidUnitId`] for empty/whitespace input.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FightError::InvalidUnitId(id));
        }
        Ok(Self(id))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything needed to spawn a unit, with sensible zero defaults so
/// tests can override only what they exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSpawnParams {
    /// Display name used in log lines and same-named morale rules.
    pub name: String,
    /// Side the unit fights for.
    pub team: Team,
    /// Creature race.
    pub race: Race,
    /// Grid footprint.
    pub size: UnitSize,
    /// Primary attack delivery.
    pub attack_type: AttackType,
    /// Health of a single creature in the stack.
    pub max_hp: f64,
    /// Number of creatures in the stack.
    pub amount: u32,
    /// Minimum damage of one creature's attack.
    pub min_damage: i32,
    /// Maximum damage of one creature's attack (inclusive).
    pub max_damage: i32,
    /// Base attack stat.
    pub attack: f64,
    /// Base armor stat.
    pub armor: f64,
    /// Initiative; higher acts earlier within a lap.
    pub speed: u32,
    /// Base morale before modifiers.
    pub morale: i32,
    /// Base luck before modifiers.
    pub luck: i32,
    /// Resistance to magic damage, in percent.
    pub magic_resist: f64,
    /// Whether the unit flies.
    pub can_fly: bool,
    /// Extra armor granted while flying.
    pub fly_armor: f64,
    /// Abilities carried by the unit.
    pub abilities: Vec<Ability>,
    /// Auras the unit emits.
    pub aura_effects: Vec<AuraEffect>,
    /// Permanent effects the unit is born with (Mechanism, Fire Element).
    pub innate_effects: Vec<EffectKind>,
}

impl Default for UnitSpawnParams {
    fn default() -> Self {
        Self {
            name: String::new(),
            team: Team::NoTeam,
            race: Race::Life,
            size: UnitSize::Small,
            attack_type: AttackType::Melee,
            max_hp: 10.0,
            amount: 1,
            min_damage: 1,
            max_damage: 1,
            attack: 0.0,
            armor: 0.0,
            speed: 5,
            morale: 0,
            luck: 0,
            magic_resist: 0.0,
            can_fly: false,
            fly_armor: 0.0,
            abilities: Vec::new(),
            aura_effects: Vec::new(),
            innate_effects: Vec::new(),
        }
    }
}

/// A stack of identical creatures with one shared health pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    /// Stable identifier; also the deterministic iteration key.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// Side the unit fights for.
    pub team: Team,
    /// Creature race.
    pub race: Race,
    /// Grid footprint.
    pub size: UnitSize,
    /// Primary attack delivery.
    pub attack_type: AttackType,

    /// Health of a single creature.
    pub max_hp: f64,
    /// Health of the top creature in the stack.
    pub hp: f64,
    /// Creatures currently alive.
    pub amount_alive: u32,
    /// Creatures that have died this fight.
    pub amount_died: u32,

    /// Minimum damage of one creature's attack.
    pub min_damage: i32,
    /// Maximum damage of one creature's attack (inclusive).
    pub max_damage: i32,
    /// Base attack stat.
    pub base_attack: f64,
    /// Effective attack after effects and modifiers.
    pub attack: f64,
    /// Base armor stat.
    pub base_armor: f64,
    /// Effective armor after effects and modifiers.
    pub armor: f64,
    /// Initiative.
    pub speed: u32,
    /// Base morale before modifiers.
    pub base_morale: i32,
    /// Effective morale, clamped to `[-10, 10]`.
    pub morale: i32,
    /// Base luck before modifiers.
    pub base_luck: i32,
    /// Effective luck, clamped to `[-10, 10]`.
    pub luck: i32,
    /// Resistance to magic damage, in percent.
    pub magic_resist: f64,
    /// Damage multiplier; reduced by Paralysis.
    pub attack_multiplier: f64,
    /// Lap-scaled stack power, saturating at [`MAX_STACK_POWER`].
    pub stack_power: f64,

    /// Whether the unit flies.
    pub can_fly: bool,
    /// Extra armor granted while flying.
    pub fly_armor: f64,

    /// Cells occupied on the grid.
    pub cells: Vec<GridCell>,
    /// Abilities carried.
    pub abilities: Vec<Ability>,
    /// Auras emitted.
    pub aura_effects: Vec<AuraEffect>,

    /// Forced target set by Aggr.
    pub target_lock: Option<UnitId>,
    /// Whether the unit has responded to an attack this lap.
    pub responded: bool,
    /// Unused Resurrection charges.
    pub resurrection_charges: u32,

    effects: Vec<AppliedEffect>,
    buffs: Vec<AppliedBuff>,
    debuffs: Vec<AppliedBuff>,
}

impl Unit {
    /// Spawn a unit at full strength.
    #[must_use]
    pub fn spawn(id: UnitId, params: UnitSpawnParams) -> Self {
        let resurrection_charges = u32::from(
            params
                .abilities
                .iter()
                .any(|a| a.kind == AbilityKind::Resurrection),
        );
        let effects = params
            .innate_effects
            .iter()
            .map(|&kind| AppliedEffect::from_template(kind))
            .collect();
        Self {
            id,
            name: params.name,
            team: params.team,
            race: params.race,
            size: params.size,
            attack_type: params.attack_type,
            max_hp: params.max_hp,
            hp: params.max_hp,
            amount_alive: params.amount,
            amount_died: 0,
            min_damage: params.min_damage,
            max_damage: params.max_damage,
            base_attack: params.attack,
            attack: params.attack,
            base_armor: params.armor,
            armor: params.armor,
            speed: params.speed,
            base_morale: params.morale,
            morale: params.morale,
            base_luck: params.luck,
            luck: params.luck,
            magic_resist: params.magic_resist,
            attack_multiplier: 1.0,
            stack_power: 1.0,
            can_fly: params.can_fly,
            fly_armor: params.fly_armor,
            cells: Vec::new(),
            abilities: params.abilities,
            aura_effects: params.aura_effects,
            target_lock: None,
            responded: false,
            resurrection_charges,
            effects,
            buffs: Vec::new(),
            debuffs: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Vitals
    // ------------------------------------------------------------------

    /// Whether every creature in the stack is dead.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.amount_alive == 0
    }

    /// Whether at least one creature is still standing.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.amount_alive > 0
    }

    /// Total remaining health across the stack.
    #[must_use]
    pub fn health_pool(&self) -> f64 {
        if self.amount_alive == 0 {
            0.0
        } else {
            self.hp + f64::from(self.amount_alive - 1) * self.max_hp
        }
    }

    /// Apply damage to the shared pool and return how many creatures
    /// were killed by it.
    pub fn apply_damage(&mut self, damage: f64) -> u32 {
        if self.amount_alive == 0 || damage <= 0.0 {
            return 0;
        }
        let pool = self.health_pool() - damage;
        if pool <= 0.0 {
            let killed = self.amount_alive;
            self.amount_alive = 0;
            self.amount_died += killed;
            self.hp = 0.0;
            return killed;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let still_alive = (pool / self.max_hp).ceil() as u32;
        let killed = self.amount_alive - still_alive;
        self.amount_alive = still_alive;
        self.amount_died += killed;
        self.hp = pool - f64::from(still_alive - 1) * self.max_hp;
        killed
    }

    /// Heal the top creature, never past its maximum and never reviving
    /// the dead. Returns the health actually restored.
    pub fn heal(&mut self, amount: f64) -> f64 {
        if self.amount_alive == 0 || amount <= 0.0 {
            return 0.0;
        }
        let actual = amount.min(self.max_hp - self.hp);
        self.hp += actual;
        actual
    }

    /// Return creatures to life at full health, bounded by the number
    /// that have died. Returns the number revived.
    pub fn revive(&mut self, count: u32) -> u32 {
        let revived = count.min(self.amount_died);
        if revived == 0 {
            return 0;
        }
        self.amount_alive += revived;
        self.amount_died -= revived;
        self.hp = self.max_hp;
        revived
    }

    // ------------------------------------------------------------------
    // Abilities
    // ------------------------------------------------------------------

    /// The unit's ability of a given kind, if carried.
    #[must_use]
    pub fn ability(&self, kind: AbilityKind) -> Option<&Ability> {
        self.abilities.iter().find(|a| a.kind == kind)
    }

    /// Whether the unit carries an ability of a given kind.
    #[must_use]
    pub fn has_ability(&self, kind: AbilityKind) -> bool {
        self.ability(kind).is_some()
    }

    /// Effective apply chance of an ability: base chance plus the team
    /// modifier, clamped to `[0, 100]`.
    #[must_use]
    pub fn calculate_ability_apply_chance(&self, ability: &Ability, chance_modifier: f64) -> f64 {
        clamp_chance(ability.chance + chance_modifier)
    }

    /// Effective magnitude of an ability: base power scaled by the team
    /// power modifier, one-decimal rounded.
    #[must_use]
    pub fn calculate_ability_count(&self, ability: &Ability, power_modifier: f64) -> f64 {
        round1(ability.power * (1.0 + power_modifier / 100.0))
    }

    /// Effective aura power: base power scaled by the team aura-power
    /// modifier, one-decimal rounded.
    #[must_use]
    pub fn calculate_aura_power(&self, power: f64, aura_power_modifier: f64) -> f64 {
        round1(power * (1.0 + aura_power_modifier / 100.0))
    }

    /// Whether mind attacks are blocked: the Mind Resistance ability or
    /// the Mechanism nature.
    #[must_use]
    pub fn has_mind_attack_resistance(&self) -> bool {
        self.has_ability(AbilityKind::MindResistance)
            || self.has_effect_active(EffectKind::Mechanism)
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Whether an effect of the given kind is active.
    #[must_use]
    pub fn has_effect_active(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    /// Active effects, in application order.
    #[must_use]
    pub fn effects(&self) -> &[AppliedEffect] {
        &self.effects
    }

    /// Mutable access to an active effect of the given kind.
    pub fn effect_mut(&mut self, kind: EffectKind) -> Option<&mut AppliedEffect> {
        self.effects.iter_mut().find(|e| e.kind == kind)
    }

    /// Attach a fresh effect instance. No-op (returns `false`) when an
    /// effect of the same kind is already active.
    pub fn apply_effect(&mut self, effect: AppliedEffect) -> bool {
        if self.has_effect_active(effect.kind) {
            return false;
        }
        self.effects.push(effect);
        true
    }

    /// Lengthen an active effect by its template duration. Returns
    /// `false` when no such effect is active.
    pub fn extend_effect(&mut self, kind: EffectKind) -> bool {
        match self.effect_mut(kind) {
            Some(effect) => {
                effect.extend();
                true
            }
            None => false,
        }
    }

    /// Remove an active effect of the given kind, if any.
    pub fn remove_effect(&mut self, kind: EffectKind) {
        self.effects.retain(|e| e.kind != kind);
    }

    /// Count down non-permanent effects at lap end, dropping the
    /// expired ones.
    pub fn expire_effects_for_lap(&mut self) {
        self.effects.retain_mut(|effect| {
            if effect.is_permanent() {
                return true;
            }
            effect.laps_left -= 1;
            effect.laps_left > 0
        });
    }

    /// Strip every effect, buff, debuff and targeting mark. Used when a
    /// stack is reborn through resurrection.
    pub fn clear_all_effects_and_marks(&mut self) {
        self.effects.retain(AppliedEffect::is_permanent);
        self.buffs.clear();
        self.debuffs.clear();
        self.target_lock = None;
        self.responded = false;
    }

    // ------------------------------------------------------------------
    // Buffs and debuffs
    // ------------------------------------------------------------------

    /// Active buffs.
    #[must_use]
    pub fn buffs(&self) -> &[AppliedBuff] {
        &self.buffs
    }

    /// Active debuffs.
    #[must_use]
    pub fn debuffs(&self) -> &[AppliedBuff] {
        &self.debuffs
    }

    /// Attach a buff, replacing any existing buff of the same kind.
    /// Hidden and Visible are mutually exclusive marks.
    pub fn apply_buff(&mut self, buff: AppliedBuff) {
        match buff.kind {
            EffectKind::Hidden => self.buffs.retain(|b| b.kind != EffectKind::Visible),
            EffectKind::Visible => self.buffs.retain(|b| b.kind != EffectKind::Hidden),
            _ => {}
        }
        self.buffs.retain(|b| b.kind != buff.kind);
        self.buffs.push(buff);
    }

    /// Attach a debuff, replacing any existing debuff of the same kind.
    pub fn apply_debuff(&mut self, debuff: AppliedBuff) {
        self.debuffs.retain(|d| d.kind != debuff.kind);
        self.debuffs.push(debuff);
    }

    /// Whether a buff of the given kind is active.
    #[must_use]
    pub fn has_buff(&self, kind: EffectKind) -> bool {
        self.buffs.iter().any(|b| b.kind == kind)
    }

    /// Whether a debuff of the given kind is active.
    #[must_use]
    pub fn has_debuff(&self, kind: EffectKind) -> bool {
        self.debuffs.iter().any(|d| d.kind == kind)
    }

    /// Drop every aura-owned buff and debuff. The aura recompute pass
    /// calls this before re-applying, so stale auras never linger.
    pub fn clear_aura_applied(&mut self) {
        self.buffs.retain(|b| !b.from_aura);
        self.debuffs.retain(|d| !d.from_aura);
    }

    // ------------------------------------------------------------------
    // Per-lap recomputation
    // ------------------------------------------------------------------

    /// Recompute effective stats from base stats, active effects and
    /// team modifiers. Called at the start of every lap.
    pub fn refresh_for_lap(&mut self, lap: u32, modifiers: &TeamModifiers) {
        self.stack_power = f64::from(lap).min(MAX_STACK_POWER);

        self.morale = (self.base_morale + modifiers.morale)
            .clamp(-MORALE_MAX_VALUE, MORALE_MAX_VALUE);
        self.luck = (self.base_luck + modifiers.luck).clamp(-LUCK_MAX_VALUE, LUCK_MAX_VALUE);

        let shatter: f64 = self
            .effects
            .iter()
            .filter(|e| e.kind == EffectKind::ShatterArmor)
            .map(|e| e.power)
            .sum();
        let fly_bonus = if self.can_fly {
            self.fly_armor + modifiers.fly_armor
        } else {
            0.0
        };
        self.armor = round1((self.base_armor + modifiers.armor + fly_bonus - shatter).max(0.0));

        let saliva: f64 = self
            .effects
            .iter()
            .filter(|e| e.kind == EffectKind::BoarSaliva)
            .map(|e| e.power)
            .sum();
        let withering: f64 = self
            .debuffs
            .iter()
            .filter(|d| d.kind == EffectKind::Withering)
            .map(|d| d.power)
            .sum();
        self.attack = round1((self.base_attack + modifiers.attack - saliva - withering).max(0.0));

        self.responded = false;
    }

    // ------------------------------------------------------------------
    // Attacking
    // ------------------------------------------------------------------

    /// Chance in percent that an outgoing attack misses entirely.
    #[must_use]
    pub fn miss_chance(&self) -> f64 {
        self.effects
            .iter()
            .find(|e| e.kind == EffectKind::Blindness)
            .map_or(0.0, |e| e.power)
    }

    /// Damage multiplier after Paralysis weakening.
    #[must_use]
    pub fn attack_multiplier_effective(&self) -> f64 {
        let paralysis = self
            .effects
            .iter()
            .find(|e| e.kind == EffectKind::Paralysis)
            .map_or(0.0, |e| e.power);
        (self.attack_multiplier * (1.0 - paralysis / 100.0)).max(0.0)
    }

    /// Roll total attack damage for the stack: one shared per-creature
    /// roll, scaled by stack size and the effective multiplier.
    ///
    /// # Errors
    ///
    /// Propagates RNG contract violations from malformed damage ranges.
    pub fn roll_attack_damage(&mut self, rng: &mut dyn FightRng) -> Result<f64> {
        if self.amount_alive == 0 {
            return Ok(0.0);
        }
        let per_creature = if self.min_damage == self.max_damage {
            self.min_damage
        } else {
            rng.random_int(self.min_damage, self.max_damage + 1)?
        };
        Ok(round1(
            f64::from(self.amount_alive)
                * f64::from(per_creature)
                * self.attack_multiplier_effective(),
        ))
    }
}
