//! Determinism testing utilities.
//!
//! A fight must replay identically from the same seed. Sources of
//! non-determinism to guard against:
//!
//! - **Map iteration order**: the engine keeps every roster and table
//!   in ordered maps; these helpers catch regressions to hashed ones.
//! - **System randomness**: every roll goes through a seeded
//!   [`fight_core::rng::FightRng`].
//! - **Float accumulation order**: balance math funnels through the
//!   engine's one-decimal rounding helpers.

use fight_core::fight::FightSnapshot;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
}

impl DeterminismResult {
    /// Assert that the runs matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic,
            "Fight replay diverged!\nRuns: {}\nHashes: {:?}",
            self.hashes.len(),
            self.hashes
        );
    }
}

/// Run a scenario multiple times and verify every run hashes the same.
///
/// * `setup` builds the initial state, `step` advances it once, `hash`
///   reduces the final state to a hash. `steps` is the number of
///   advances per run.
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);
    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..steps {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
    }
}

/// Hash a snapshot, panicking on serialization failure.
///
/// # Panics
///
/// Panics when the snapshot cannot be encoded; test-only convenience.
#[must_use]
pub fn snapshot_hash(snapshot: &FightSnapshot) -> u64 {
    snapshot.state_hash().expect("snapshot hash")
}

/// Proptest strategies for fight scenarios.
pub mod strategies {
    use fight_core::unit::{Team, UnitSpawnParams};
    use proptest::prelude::*;

    /// Generate an apply chance in percent.
    pub fn arb_chance() -> impl Strategy<Value = f64> {
        (0u32..=100).prop_map(f64::from)
    }

    /// Generate a fighting team.
    pub fn arb_team() -> impl Strategy<Value = Team> {
        prop_oneof![Just(Team::Upper), Just(Team::Lower)]
    }

    /// Generate an RNG seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Generate spawn parameters for a plain stack.
    pub fn arb_stack_params() -> impl Strategy<Value = UnitSpawnParams> {
        (1u32..50, 1u32..100, 1i32..10, arb_team()).prop_map(
            |(amount, max_hp, min_damage, team)| UnitSpawnParams {
                name: "Stack".to_owned(),
                team,
                amount,
                max_hp: f64::from(max_hp),
                min_damage,
                max_damage: min_damage + 3,
                ..UnitSpawnParams::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{skirmish, uid};
    use fight_core::fight::FightSnapshot;
    use fight_core::rng::{FightRng, SeededRng};

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);
        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_seeded_fight_replays_identically() {
        let run = |seed: u64| {
            let (mut units, _board, fight) = skirmish().unwrap();
            let mut rng = SeededRng::new(seed);
            for _ in 0..20 {
                let roll = rng.random_int(1, 10).unwrap();
                units
                    .get_mut(&uid("lower-1"))
                    .unwrap()
                    .apply_damage(f64::from(roll));
            }
            snapshot_hash(&FightSnapshot {
                state: fight,
                units,
            })
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }
}
