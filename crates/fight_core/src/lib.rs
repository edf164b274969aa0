//! # Fight Core
//!
//! Deterministic turn-resolution and combat-rule engine for a tactical,
//! grid-based fight simulation.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (all chance flows through a seeded [`rng::FightRng`])
//!
//! This separation enables:
//! - Headless fight drivers and CI verification
//! - Replay from fight snapshots
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`unit`] - combat units (stack vitals, stats, capability sets)
//! - [`effects`] - ability/effect definitions and applied instances
//! - [`abilities`] - per-ability resolvers and the secondary-trigger cascade
//! - [`holder`] - the unit roster, aura propagation, lifecycle
//! - [`fight`] - per-fight mutable state and turn-order bookkeeping
//! - [`grid`] - the grid capability consumed by the engine
//! - [`sinks`] - scene log and statistics sinks
//! - [`rng`] - bounded-range random capability

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod abilities;
pub mod effects;
pub mod error;
pub mod fight;
pub mod grid;
pub mod holder;
pub mod math;
pub mod rng;
pub mod sinks;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::abilities::{
        AttackResult, CascadeTrigger, EffectOutcome, FireShieldResult, ThroughShotGroup,
        MORALE_CHANGE_FOR_KILL, SKEWER_STRIKE_CASCADE,
    };
    pub use crate::effects::{
        Ability, AbilityKind, AppliedBuff, AppliedEffect, AuraEffect, AuraPolarity, EffectKind,
        TargetAffinity,
    };
    pub use crate::error::{FightError, Result};
    pub use crate::fight::{FightSnapshot, FightState, TeamModifiers};
    pub use crate::grid::{Board, Grid, GridCell};
    pub use crate::holder::{DeletionOutcome, FightPhase, UnitsHolder};
    pub use crate::rng::{FightRng, SeededRng};
    pub use crate::sinks::{DamageStatistic, NoopLog, RecordedLog, SceneLog, StatisticHolder};
    pub use crate::unit::{AttackType, Race, Team, Unit, UnitId, UnitSize, UnitSpawnParams};
}
