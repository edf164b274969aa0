//! Ability and effect definitions.
//!
//! Definitions are immutable templates keyed by closed enums; an
//! *applied* effect or buff is a separate mutable instance carrying its
//! own power and remaining duration. Resolvers always construct fresh
//! instances - templates are never written to, so sharing them across
//! units is safe.

use serde::{Deserialize, Serialize};

use crate::math::{fmt_power, round1};

/// What a hostile ability targets, and therefore what can resist it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TargetAffinity {
    /// Mind attacks - blocked outright by mind-attack resistance.
    Mind,
    /// Status attacks - land on anything alive.
    #[default]
    Status,
    /// Plain physical attacks.
    Physical,
}

/// Closed set of timed effects, buffs and aura emissions.
///
/// Dispatch is by variant; the display name exists only for log lines.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EffectKind {
    /// Forced to attack the provoker.
    Aggr,
    /// Attacks have a chance to miss.
    Blindness,
    /// Attack stat reduced.
    BoarSaliva,
    /// Bleeding each lap.
    DeepWounds,
    /// Fire-elemental nature; immune to Fire Shield reflection.
    FireElement,
    /// Constructed creature; resists mind attacks, vulnerable to
    /// status amplifiers.
    Mechanism,
    /// Attack multiplier weakened.
    Paralysis,
    /// Morale reduced.
    PegasusLight,
    /// Cannot act.
    PetrifyingGaze,
    /// Armor reduced; stacks by accumulation.
    ShatterArmor,
    /// Skips the next action.
    Stun,
    /// Aura: morale raised for the emitting team.
    WarAnger,
    /// Aura: attack sapped on the opposing team.
    Withering,
    /// Aura: emitter hides while no enemy is near.
    Disguise,
    /// Concealed from targeting.
    Hidden,
    /// Concealment broken.
    Visible,
}

/// Immutable effect template: default power, duration in laps
/// (`0` = permanent), affinity and log description.
///
/// The description may contain a `{power}` placeholder which is
/// interpolated with the applied instance's power.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectTemplate {
    /// Which effect this template describes.
    pub kind: EffectKind,
    /// Default power of a fresh instance.
    pub power: f64,
    /// Duration in laps; `0` means the effect never expires.
    pub laps: u32,
    /// Resistance channel.
    pub affinity: TargetAffinity,
    /// Log description with an optional `{power}` placeholder.
    pub description: &'static str,
}

impl EffectKind {
    /// Display name, for log lines only.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aggr => "Aggr",
            Self::Blindness => "Blindness",
            Self::BoarSaliva => "Boar Saliva",
            Self::DeepWounds => "Deep Wounds",
            Self::FireElement => "Fire Element",
            Self::Mechanism => "Mechanism",
            Self::Paralysis => "Paralysis",
            Self::PegasusLight => "Pegasus Light",
            Self::PetrifyingGaze => "Petrifying Gaze",
            Self::ShatterArmor => "Shatter Armor",
            Self::Stun => "Stun",
            Self::WarAnger => "War Anger",
            Self::Withering => "Withering",
            Self::Disguise => "Disguise",
            Self::Hidden => "Hidden",
            Self::Visible => "Visible",
        }
    }

    /// The immutable template for this effect.
    #[must_use]
    pub const fn template(self) -> EffectTemplate {
        use TargetAffinity::{Mind, Status};
        let (power, laps, affinity, description) = match self {
            Self::Aggr => (0.0, 2, Mind, "forced to attack the provoker"),
            Self::Blindness => (50.0, 2, Mind, "blinded, attacks miss {power}% of the time"),
            Self::BoarSaliva => (1.5, 2, Status, "attack reduced by {power}"),
            Self::DeepWounds => (1.5, 3, Status, "bleeding for {power} each lap"),
            Self::FireElement => (0.0, 0, Status, "wreathed in elemental fire"),
            Self::Mechanism => (0.0, 0, Status, "a soulless mechanism"),
            Self::Paralysis => (25.0, 1, Mind, "attack weakened by {power}%"),
            Self::PegasusLight => (1.0, 2, Status, "morale dimmed by {power}"),
            Self::PetrifyingGaze => (0.0, 1, Mind, "petrified and cannot act"),
            Self::ShatterArmor => (1.0, 3, Status, "armor shattered by {power}"),
            Self::Stun => (0.0, 1, Mind, "stunned and skips the next action"),
            Self::WarAnger => (2.0, 1, Status, "morale raised by {power}"),
            Self::Withering => (1.5, 1, Mind, "attack sapped by {power}"),
            Self::Disguise => (0.0, 0, Status, "disguised"),
            Self::Hidden => (0.0, 0, Status, "hidden from sight"),
            Self::Visible => (0.0, 0, Status, "revealed"),
        };
        EffectTemplate {
            kind: self,
            power,
            laps,
            affinity,
            description,
        }
    }

    /// Interpolate this effect's description with a concrete power.
    #[must_use]
    pub fn describe(self, power: f64) -> String {
        self.template()
            .description
            .replace("{power}", &fmt_power(power))
    }
}

/// Mutable instance of an effect currently active on a unit.
///
/// Power and duration belong to the instance; the shared template is
/// read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedEffect {
    /// Which effect is active.
    pub kind: EffectKind,
    /// Instance power, rounded to one decimal.
    pub power: f64,
    /// Laps remaining; `0` means the effect never expires.
    pub laps_left: u32,
}

impl AppliedEffect {
    /// Fresh instance with the template's default power and duration.
    #[must_use]
    pub fn from_template(kind: EffectKind) -> Self {
        let template = kind.template();
        Self {
            kind,
            power: template.power,
            laps_left: template.laps,
        }
    }

    /// Fresh instance with a recomputed power.
    #[must_use]
    pub fn with_power(kind: EffectKind, power: f64) -> Self {
        Self {
            power: round1(power),
            laps_left: kind.template().laps,
            kind,
        }
    }

    /// Lengthen the instance by the template duration without touching
    /// its power. Permanent effects stay permanent.
    pub fn extend(&mut self) {
        if self.laps_left > 0 {
            self.laps_left += self.kind.template().laps;
        }
    }

    /// Whether this instance never expires.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.laps_left == 0
    }
}

/// Whether an aura helps its emitter's team or hinders the enemy's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuraPolarity {
    /// Applies to the emitting unit's own team.
    Buff,
    /// Applies to the opposing team.
    Debuff,
}

/// Immutable aura emission carried by a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuraEffect {
    /// Effect the aura grants within range.
    pub kind: EffectKind,
    /// Base power before team modifiers.
    pub power: f64,
    /// Base Chebyshev range in cells before team modifiers.
    pub range: i32,
    /// Who the aura affects.
    pub polarity: AuraPolarity,
}

/// A buff or debuff currently active on a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedBuff {
    /// Which effect the buff carries.
    pub kind: EffectKind,
    /// Instance power, rounded to one decimal.
    pub power: f64,
    /// Interpolated description for UI/log consumers.
    pub description: String,
    /// Whether an aura recompute pass owns (and rebuilds) this entry.
    pub from_aura: bool,
}

impl AppliedBuff {
    /// Build an aura-applied instance with interpolated description.
    #[must_use]
    pub fn from_aura(kind: EffectKind, power: f64) -> Self {
        let power = round1(power);
        Self {
            kind,
            power,
            description: kind.describe(power),
            from_aura: true,
        }
    }

    /// Build a non-aura instance (visibility marks, spell buffs).
    #[must_use]
    pub fn new(kind: EffectKind, power: f64) -> Self {
        let power = round1(power);
        Self {
            kind,
            power,
            description: kind.describe(power),
            from_aura: false,
        }
    }
}

/// Closed set of unit abilities.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AbilityKind {
    /// Provoke: the target is forced to attack the caster.
    Aggr,
    /// Blind the target.
    Blindness,
    /// Corrode the target's attack stat.
    BoarSaliva,
    /// Leave bleeding wounds.
    DeepWounds,
    /// Heal by consuming the essence of slain enemies.
    DevourEssence,
    /// Permanently dull the target's attack.
    DullingDefense,
    /// Reflect melee/ranged damage back as magic damage.
    FireShield,
    /// Passive plating that scales Fire Shield reflection.
    HeavyArmor,
    /// Chance-gated damage multiplier.
    LuckyStrike,
    /// Immunity to mind attacks.
    MindResistance,
    /// Transfer armor from the target to the caster.
    Miner,
    /// Respond to every attack, not just the first.
    OneInTheField,
    /// Weaken the target's attack multiplier.
    Paralysis,
    /// Dim the target's morale.
    PegasusLight,
    /// Bonus damage from the target's maximum health.
    PenetratingBite,
    /// Petrify the target.
    PetrifyingGaze,
    /// Return half of the fallen to life, once.
    Resurrection,
    /// Shatter the target's armor, stacking.
    ShatterArmor,
    /// Melee strike that skewers the line behind the target.
    SkewerStrike,
    /// Stun the target.
    Stun,
    /// Ranged shot that pierces through ranks.
    ThroughShot,
}

impl AbilityKind {
    /// Display name, for log lines only.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aggr => "Aggr",
            Self::Blindness => "Blindness",
            Self::BoarSaliva => "Boar Saliva",
            Self::DeepWounds => "Deep Wounds",
            Self::DevourEssence => "Devour Essence",
            Self::DullingDefense => "Dulling Defense",
            Self::FireShield => "Fire Shield",
            Self::HeavyArmor => "Heavy Armor",
            Self::LuckyStrike => "Lucky Strike",
            Self::MindResistance => "Mind Resistance",
            Self::Miner => "Miner",
            Self::OneInTheField => "One in the Field",
            Self::Paralysis => "Paralysis",
            Self::PegasusLight => "Pegasus Light",
            Self::PenetratingBite => "Penetrating Bite",
            Self::PetrifyingGaze => "Petrifying Gaze",
            Self::Resurrection => "Resurrection",
            Self::ShatterArmor => "Shatter Armor",
            Self::SkewerStrike => "Skewer Strike",
            Self::Stun => "Stun",
            Self::ThroughShot => "Through Shot",
        }
    }

    /// The timed effect this ability grants, if it grants one.
    #[must_use]
    pub const fn effect_kind(self) -> Option<EffectKind> {
        match self {
            Self::Aggr => Some(EffectKind::Aggr),
            Self::Blindness => Some(EffectKind::Blindness),
            Self::BoarSaliva => Some(EffectKind::BoarSaliva),
            Self::DeepWounds => Some(EffectKind::DeepWounds),
            Self::Paralysis => Some(EffectKind::Paralysis),
            Self::PegasusLight => Some(EffectKind::PegasusLight),
            Self::PetrifyingGaze => Some(EffectKind::PetrifyingGaze),
            Self::ShatterArmor => Some(EffectKind::ShatterArmor),
            Self::Stun => Some(EffectKind::Stun),
            _ => None,
        }
    }
}

/// An ability as carried by a unit: the kind plus its tuned numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    /// Which ability this is.
    pub kind: AbilityKind,
    /// Ability power; meaning is per-kind (percent, count or flat).
    pub power: f64,
    /// Base apply chance in percent.
    pub chance: f64,
    /// Duration in laps of the granted effect, where applicable.
    pub laps: u32,
    /// Resistance channel of the ability.
    pub affinity: TargetAffinity,
}

impl Ability {
    /// Standard tuning for an ability kind.
    #[must_use]
    pub const fn preset(kind: AbilityKind) -> Self {
        use TargetAffinity::{Mind, Physical, Status};
        let (power, chance, laps, affinity) = match kind {
            AbilityKind::Aggr => (0.0, 40.0, 2, Mind),
            AbilityKind::Blindness => (50.0, 35.0, 2, Mind),
            AbilityKind::BoarSaliva => (1.5, 40.0, 2, Status),
            AbilityKind::DeepWounds => (1.5, 30.0, 3, Status),
            AbilityKind::DevourEssence => (60.0, 100.0, 0, Status),
            AbilityKind::DullingDefense => (1.5, 100.0, 0, Status),
            AbilityKind::FireShield => (30.0, 100.0, 0, Status),
            AbilityKind::HeavyArmor => (25.0, 100.0, 0, Status),
            AbilityKind::LuckyStrike => (200.0, 12.0, 0, Status),
            AbilityKind::MindResistance => (0.0, 100.0, 0, Status),
            AbilityKind::Miner => (2.0, 100.0, 0, Status),
            AbilityKind::OneInTheField => (0.0, 100.0, 0, Status),
            AbilityKind::Paralysis => (25.0, 30.0, 1, Mind),
            AbilityKind::PegasusLight => (1.0, 45.0, 2, Status),
            AbilityKind::PenetratingBite => (160.0, 100.0, 0, Status),
            AbilityKind::PetrifyingGaze => (0.0, 25.0, 1, Mind),
            AbilityKind::Resurrection => (0.0, 100.0, 0, Status),
            AbilityKind::ShatterArmor => (1.0, 50.0, 3, Status),
            AbilityKind::SkewerStrike => (0.0, 100.0, 0, Physical),
            AbilityKind::Stun => (0.0, 20.0, 1, Mind),
            AbilityKind::ThroughShot => (0.0, 100.0, 0, Physical),
        };
        Self {
            kind,
            power,
            chance,
            laps,
            affinity,
        }
    }
}
