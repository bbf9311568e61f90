#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use rand::{Rng, SeedableRng};
use stagger_life::LifeEngine;
use std::time::Instant;

fn bench_soup(side: i32, density: f64, iterations: u64) -> (f64, u64, usize) {
    let mut engine = LifeEngine::new();
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED_1234_ABCD_EF01);

    for y in 0..side {
        for x in 0..side {
            if rng.random_bool(density) && engine.set_cell(x, y, true).is_err() {
                return (f64::NAN, 0, 0);
            }
        }
    }

    let start = Instant::now();
    if let Err(err) = engine.step_n(iterations) {
        eprintln!("{side}x{side}: {err}");
        return (f64::NAN, 0, 0);
    }
    let duration = start.elapsed();

    let total_ms = duration.as_secs_f64() * 1000.0;
    (total_ms, engine.population(), engine.tile_counts().allocated)
}

fn main() {
    let scales: &[(i32, u64)] = &[
        (256, 400),  // ~256 tiles
        (512, 200),  // ~1024 tiles
        (1024, 100), // ~4096 tiles
        (2048, 50),  // ~16384 tiles
        (4096, 20),  // ~65536 tiles
    ];

    println!(
        "{:<10} {:>8} {:>12} {:>12} {:>10} {:>12}",
        "Grid", "Tiles", "Iters", "Total(ms)", "Avg(ms)", "Population"
    );
    println!("{}", "-".repeat(70));

    for &(side, iters) in scales {
        let (total_ms, pop, tiles) = bench_soup(side, 0.42, iters);
        let avg_ms = total_ms / iters as f64;
        println!(
            "{:<10} {:>8} {:>12} {:>12.1} {:>10.4} {:>12}",
            format!("{}x{}", side, side),
            tiles,
            iters,
            total_ms,
            avg_ms,
            pop
        );
    }
}
