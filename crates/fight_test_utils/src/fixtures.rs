//! Test fixtures and helpers.
//!
//! Pre-built units, boards and RNG doubles for consistent testing.

use fight_core::effects::{Ability, AbilityKind};
use fight_core::error::Result;
use fight_core::fight::FightState;
use fight_core::grid::{Board, GridCell};
use fight_core::holder::UnitsHolder;
use fight_core::rng::FightRng;
use fight_core::unit::{Team, Unit, UnitId, UnitSpawnParams};

/// Create a unit id from a literal.
///
/// # Panics
///
/// Panics on a blank id; test fixtures use literals.
#[must_use]
pub fn uid(id: &str) -> UnitId {
    UnitId::new(id).expect("fixture unit id")
}

/// Create a cell from literals.
///
/// # Panics
///
/// Panics out of bounds; test fixtures use literal coordinates.
#[must_use]
pub fn cell(x: u32, y: u32) -> GridCell {
    GridCell::new(x, y).expect("fixture cell")
}

/// A plain melee stack with the given size and per-creature health.
#[must_use]
pub fn stack_params(name: &str, team: Team, amount: u32, max_hp: f64) -> UnitSpawnParams {
    UnitSpawnParams {
        name: name.to_owned(),
        team,
        amount,
        max_hp,
        min_damage: 2,
        max_damage: 4,
        speed: 5,
        ..UnitSpawnParams::default()
    }
}

/// Like [`stack_params`] with one preset ability attached.
#[must_use]
pub fn stack_with_ability(
    name: &str,
    team: Team,
    amount: u32,
    max_hp: f64,
    ability: AbilityKind,
) -> UnitSpawnParams {
    UnitSpawnParams {
        abilities: vec![Ability::preset(ability)],
        ..stack_params(name, team, amount, max_hp)
    }
}

/// A standard 8x8 board.
///
/// # Panics
///
/// Never; 8x8 is always a valid board.
#[must_use]
pub fn standard_board() -> Board {
    Board::new(8, 8).expect("8x8 board")
}

/// A minimal two-sided skirmish: one stack per team, placed inside its
/// placement band, with alive counters primed.
///
/// # Errors
///
/// Propagates placement failures; never fires for the fixture layout.
pub fn skirmish() -> Result<(UnitsHolder, Board, FightState)> {
    let mut units = UnitsHolder::new();
    let mut board = standard_board();
    let mut fight = FightState::new();

    units.add_unit(Unit::spawn(
        uid("upper-1"),
        stack_params("Swordsman", Team::Upper, 5, 10.0),
    ))?;
    units.add_unit(Unit::spawn(
        uid("lower-1"),
        stack_params("Wolf", Team::Lower, 5, 8.0),
    ))?;
    units.place_unit(&uid("upper-1"), vec![cell(3, 0)], &mut board)?;
    units.place_unit(&uid("lower-1"), vec![cell(3, 7)], &mut board)?;

    fight.set_team_alive(Team::Upper, 1);
    fight.set_team_alive(Team::Lower, 1);
    units.refresh_stack_power_for_all_units(&fight);
    units.refresh_aura_effects_for_all_units(&fight, &board);
    Ok((units, board, fight))
}

/// RNG double that always returns the scripted value, clamped into the
/// requested range.
#[derive(Debug, Clone, Copy)]
pub struct ConstRng(pub i32);

impl FightRng for ConstRng {
    fn random_int(&mut self, min: i32, max: i32) -> Result<i32> {
        Ok(self.0.clamp(min, max - 1))
    }
}

/// RNG double that replays a fixed script of rolls, then falls back to
/// the range minimum.
#[derive(Debug, Clone)]
pub struct ScriptRng {
    rolls: Vec<i32>,
    next: usize,
}

impl ScriptRng {
    /// Create a scripted RNG from a roll sequence.
    #[must_use]
    pub fn new(rolls: &[i32]) -> Self {
        Self {
            rolls: rolls.to_vec(),
            next: 0,
        }
    }

    /// How many rolls have been consumed.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.next
    }
}

impl FightRng for ScriptRng {
    fn random_int(&mut self, min: i32, max: i32) -> Result<i32> {
        let roll = self.rolls.get(self.next).copied().unwrap_or(min);
        self.next += 1;
        Ok(roll.clamp(min, max - 1))
    }
}
