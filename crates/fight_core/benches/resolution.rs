//! Resolution benchmarks for fight_core.
//!
//! Run with: `cargo bench -p fight_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fight_core::effects::{AuraEffect, AuraPolarity, EffectKind};
use fight_core::fight::FightState;
use fight_core::grid::{Board, GridCell};
use fight_core::holder::UnitsHolder;
use fight_core::unit::{Team, Unit, UnitId, UnitSpawnParams};

fn full_roster() -> (UnitsHolder, Board, FightState) {
    let mut units = UnitsHolder::new();
    let mut board = Board::new(16, 16).expect("board");
    let fight = FightState::new();

    for n in 0..16u32 {
        let team = if n % 2 == 0 { Team::Upper } else { Team::Lower };
        let id = UnitId::new(format!("unit-{n:02}")).expect("id");
        units
            .add_unit(Unit::spawn(
                id.clone(),
                UnitSpawnParams {
                    name: format!("Stack {n}"),
                    team,
                    max_hp: 20.0,
                    amount: 10,
                    aura_effects: vec![AuraEffect {
                        kind: EffectKind::WarAnger,
                        power: 1.0 + f64::from(n),
                        range: 4,
                        polarity: AuraPolarity::Buff,
                    }],
                    ..UnitSpawnParams::default()
                },
            ))
            .expect("spawn");
        let y = if team == Team::Upper { n / 8 } else { 15 - n / 8 };
        let cell = GridCell::new(n % 8, y).expect("cell");
        units.place_unit(&id, vec![cell], &mut board).expect("place");
    }
    (units, board, fight)
}

pub fn aura_recompute_benchmark(c: &mut Criterion) {
    let (mut units, board, fight) = full_roster();
    c.bench_function("aura_recompute_16_emitters", |b| {
        b.iter(|| {
            units.refresh_aura_effects_for_all_units(black_box(&fight), &board);
        })
    });
}

pub fn turn_order_benchmark(c: &mut Criterion) {
    let (units, _board, fight) = full_roster();
    c.bench_function("choose_next_actor_16_units", |b| {
        b.iter(|| black_box(fight.choose_next_actor(&units)))
    });
}

criterion_group!(benches, aura_recompute_benchmark, turn_order_benchmark);
criterion_main!(benches);
