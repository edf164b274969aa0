//! Per-fight mutable state.
//!
//! [`FightState`] owns everything that changes during a fight but does
//! not live on a unit: the lap counter, turn-order bookkeeping, per-team
//! rule modifiers and alive counters. Each fight constructs its own
//! state; nothing in the engine is process-global.
//!
//! All collections are ordered (`BTreeSet`/`BTreeMap`) so that
//! iteration order, and therefore every tie-break, is the unit-id order.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{FightError, Result};
use crate::holder::UnitsHolder;
use crate::unit::{Team, UnitId};

/// How many upcoming actors the turn-order preview shows.
pub const UP_NEXT_PREVIEW: usize = 5;

/// Additive rule modifiers a team has accumulated.
///
/// Every field defaults to zero; resolvers read the snapshot for a team
/// through [`FightState::team_modifiers`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamModifiers {
    /// Added to every unit's morale.
    pub morale: i32,
    /// Added to every unit's luck.
    pub luck: i32,
    /// Added to every unit's armor.
    pub armor: f64,
    /// Added to every unit's attack.
    pub attack: f64,
    /// Added to ability apply chances, in percent points.
    pub ability_chance: f64,
    /// Scales ability powers, in percent.
    pub ability_power: f64,
    /// Scales aura powers, in percent.
    pub aura_power: f64,
    /// Added to aura ranges, in cells.
    pub aura_range: i32,
    /// Added to every unit's movement steps per turn.
    pub movement_steps: i32,
    /// Added to the armor bonus of flying units only.
    pub fly_armor: f64,
    /// Added to the team's supply pool.
    pub supply: i32,
    /// Added to break chances, in percent points.
    pub break_chance: f64,
}

/// Mutable per-fight state: lap counter, turn order and team modifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FightState {
    current_lap: u32,
    last_active_team: Option<Team>,
    units_that_made_turn: BTreeSet<UnitId>,
    units_that_replied: BTreeSet<UnitId>,
    morale_queue: Vec<UnitId>,
    morale_minus_queue: Vec<UnitId>,
    hourglass_queue: Vec<UnitId>,
    up_next: Vec<UnitId>,
    modifiers: BTreeMap<Team, TeamModifiers>,
    alive_units: BTreeMap<Team, u32>,
}

impl FightState {
    /// Fresh state for a new fight, positioned at lap 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_lap: 1,
            ..Self::default()
        }
    }

    /// The current lap, starting at 1.
    #[must_use]
    pub const fn current_lap(&self) -> u32 {
        self.current_lap
    }

    // ------------------------------------------------------------------
    // Team modifiers
    // ------------------------------------------------------------------

    /// Snapshot of a team's accumulated modifiers.
    #[must_use]
    pub fn team_modifiers(&self, team: Team) -> TeamModifiers {
        self.modifiers.get(&team).copied().unwrap_or_default()
    }

    /// Mutable access to a team's modifiers, creating the zero entry on
    /// first touch.
    pub fn team_modifiers_mut(&mut self, team: Team) -> &mut TeamModifiers {
        self.modifiers.entry(team).or_default()
    }

    // ------------------------------------------------------------------
    // Turn order
    // ------------------------------------------------------------------

    /// Whether a unit has already acted this lap.
    #[must_use]
    pub fn has_made_turn(&self, unit_id: &UnitId) -> bool {
        self.units_that_made_turn.contains(unit_id)
    }

    /// Record that a unit has taken its action this lap.
    pub fn mark_turn_made(&mut self, unit_id: &UnitId, team: Team) {
        self.units_that_made_turn.insert(unit_id.clone());
        self.morale_queue.retain(|id| id != unit_id);
        self.morale_minus_queue.retain(|id| id != unit_id);
        self.hourglass_queue.retain(|id| id != unit_id);
        self.last_active_team = Some(team);
    }

    /// Whether a unit has already responded to an attack this lap.
    #[must_use]
    pub fn has_replied(&self, unit_id: &UnitId) -> bool {
        self.units_that_replied.contains(unit_id)
    }

    /// Record that a unit has spent its response for this lap.
    pub fn mark_replied(&mut self, unit_id: &UnitId) {
        self.units_that_replied.insert(unit_id.clone());
    }

    /// Grant a unit a bonus action from high morale. Duplicate grants
    /// collapse into one.
    pub fn enqueue_morale_bonus(&mut self, unit_id: &UnitId) {
        if !self.morale_queue.contains(unit_id) {
            self.morale_queue.push(unit_id.clone());
        }
    }

    /// Defer a unit's action to the end of the lap. Duplicate deferrals
    /// collapse into one.
    pub fn enqueue_hourglass(&mut self, unit_id: &UnitId) {
        if !self.hourglass_queue.contains(unit_id) {
            self.hourglass_queue.push(unit_id.clone());
        }
    }

    /// Push a unit to the back of the lap from low morale. Duplicate
    /// penalties collapse into one.
    pub fn enqueue_morale_penalty(&mut self, unit_id: &UnitId) {
        if !self.morale_minus_queue.contains(unit_id) {
            self.morale_minus_queue.push(unit_id.clone());
        }
    }

    /// Pick the unit that acts next, without marking it.
    ///
    /// Priority order: morale-bonus queue first, then the fastest
    /// not-yet-acted unit (ties prefer the team that did not act last,
    /// then the lowest id), then deferred units - the hourglass queue
    /// first, morale-penalized units last of all. `None` means the lap
    /// is over.
    #[must_use]
    pub fn choose_next_actor(&self, units: &UnitsHolder) -> Option<UnitId> {
        let eligible = |id: &UnitId| {
            !self.units_that_made_turn.contains(id)
                && units.get(id).is_some_and(crate::unit::Unit::is_alive)
        };

        if let Some(id) = self.morale_queue.iter().find(|id| eligible(id)) {
            return Some(id.clone());
        }

        let deferred: BTreeSet<&UnitId> = self
            .hourglass_queue
            .iter()
            .chain(self.morale_minus_queue.iter())
            .collect();
        let best = units
            .iter()
            .filter(|(id, _)| eligible(id) && !deferred.contains(id))
            .max_by(|(id_a, a), (id_b, b)| {
                a.speed
                    .cmp(&b.speed)
                    .then_with(|| {
                        let prefer = |team: Team| {
                            self.last_active_team.is_some_and(|last| team != last)
                        };
                        prefer(a.team).cmp(&prefer(b.team))
                    })
                    .then_with(|| id_b.cmp(id_a))
            });
        if let Some((id, _)) = best {
            return Some(id.clone());
        }

        self.hourglass_queue
            .iter()
            .chain(self.morale_minus_queue.iter())
            .find(|id| eligible(id))
            .cloned()
    }

    /// Rebuild the upcoming-actor preview by replaying the selection
    /// rule against a scratch copy of the bookkeeping.
    pub fn refresh_up_next(&mut self, units: &UnitsHolder) {
        let mut scratch = self.clone();
        let mut preview = Vec::with_capacity(UP_NEXT_PREVIEW);
        while preview.len() < UP_NEXT_PREVIEW {
            let Some(id) = scratch.choose_next_actor(units) else {
                break;
            };
            let team = scratch
                .last_active_team
                .map_or(Team::NoTeam, |t| t.opposing());
            let team = units.get(&id).map_or(team, |u| u.team);
            scratch.mark_turn_made(&id, team);
            preview.push(id);
        }
        self.up_next = preview;
    }

    /// The upcoming-actor preview, most imminent first.
    #[must_use]
    pub fn up_next(&self) -> &[UnitId] {
        &self.up_next
    }

    /// Close the current lap and open the next: per-lap bookkeeping is
    /// cleared, modifiers and alive counters persist.
    pub fn start_next_lap(&mut self) {
        self.current_lap += 1;
        self.units_that_made_turn.clear();
        self.units_that_replied.clear();
        self.morale_queue.clear();
        self.morale_minus_queue.clear();
        self.hourglass_queue.clear();
        self.up_next.clear();
        self.last_active_team = None;
    }

    // ------------------------------------------------------------------
    // Alive counters
    // ------------------------------------------------------------------

    /// Set a team's alive-unit counter outright.
    pub fn set_team_alive(&mut self, team: Team, count: u32) {
        self.alive_units.insert(team, count);
    }

    /// A team's alive-unit counter.
    #[must_use]
    pub fn team_alive(&self, team: Team) -> u32 {
        self.alive_units.get(&team).copied().unwrap_or(0)
    }

    /// Decrement a team's alive-unit counter, saturating at zero.
    pub fn decrement_team_alive(&mut self, team: Team) {
        let entry = self.alive_units.entry(team).or_insert(0);
        *entry = entry.saturating_sub(1);
    }

    /// Increment a team's alive-unit counter.
    pub fn increment_team_alive(&mut self, team: Team) {
        *self.alive_units.entry(team).or_insert(0) += 1;
    }

    /// The winning team, once exactly one fielded side has units left.
    #[must_use]
    pub fn winner(&self) -> Option<Team> {
        let upper = self.team_alive(Team::Upper);
        let lower = self.team_alive(Team::Lower);
        match (upper, lower) {
            (0, 1..) => Some(Team::Lower),
            (1.., 0) => Some(Team::Upper),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Remove every trace of a unit from the turn-order bookkeeping.
    pub fn purge_unit(&mut self, unit_id: &UnitId) {
        self.units_that_made_turn.remove(unit_id);
        self.units_that_replied.remove(unit_id);
        self.morale_queue.retain(|id| id != unit_id);
        self.morale_minus_queue.retain(|id| id != unit_id);
        self.hourglass_queue.retain(|id| id != unit_id);
        self.up_next.retain(|id| id != unit_id);
    }

    /// Return the state to its pre-fight condition.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// A serializable point-in-time capture of a fight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FightSnapshot {
    /// Turn-order and modifier state.
    pub state: FightState,
    /// The full unit roster.
    pub units: UnitsHolder,
}

impl FightSnapshot {
    /// Serialize the snapshot to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FightError::SnapshotError`] when encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| FightError::SnapshotError(e.to_string()))
    }

    /// Restore a snapshot from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FightError::SnapshotError`] when decoding fails.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| FightError::SnapshotError(e.to_string()))
    }

    /// Deterministic hash of the snapshot, for replay verification.
    ///
    /// # Errors
    ///
    /// Returns [`FightError::SnapshotError`] when encoding fails.
    pub fn state_hash(&self) -> Result<u64> {
        let bytes = self.to_bytes()?;
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Ok(hasher.finish())
    }
}
