#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use rand::{Rng, SeedableRng};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use stagger_life::{LifeConfig, LifeEngine, LifeError, Simulation};

const DEFAULT_SIDE: i32 = 1024;
const DEFAULT_GENERATIONS: u64 = 2000;
const DEFAULT_DENSITY: f64 = 0.42;
const CHECK_INTERVAL: u64 = 500;
const SEED: u64 = 0x5EED_1234_ABCD_EF01;

const USAGE: &str = "usage: stagger-life [--size N] [--generations N] [--density F] [--rule RULE] [--max-tiles N] [--threaded]";

struct MainArgs {
    config: LifeConfig,
    side: i32,
    generations: u64,
    density: f64,
    threaded: bool,
}

/// A soup density clamped to `[0, 1]`. NaN and infinities are refused.
fn parse_density(text: &str) -> Result<f64, String> {
    text.parse::<f64>()
        .ok()
        .filter(|d| d.is_finite())
        .map(|d| d.clamp(0.0, 1.0))
        .ok_or_else(|| "--density requires a finite number".to_owned())
}

fn parse_args() -> Result<MainArgs, String> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = MainArgs {
        config: LifeConfig::from_env(),
        side: DEFAULT_SIDE,
        generations: DEFAULT_GENERATIONS,
        density: DEFAULT_DENSITY,
        threaded: false,
    };
    let value = |i: usize, flag: &str| -> Result<&str, String> {
        args.get(i)
            .map(String::as_str)
            .ok_or_else(|| format!("{flag} requires a value"))
    };
    let number = |i: usize, flag: &str| -> Result<u64, String> {
        value(i, flag)?
            .parse()
            .map_err(|_| format!("{flag} requires a non-negative integer"))
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--size" => {
                i += 1;
                parsed.side = number(i, "--size")?.clamp(1, 1 << 19) as i32;
            }
            "--generations" => {
                i += 1;
                parsed.generations = number(i, "--generations")?;
            }
            "--density" => {
                i += 1;
                parsed.density = parse_density(value(i, "--density")?)?;
            }
            "--rule" => {
                i += 1;
                parsed.config = parsed.config.rule(value(i, "--rule")?);
            }
            "--max-tiles" => {
                i += 1;
                parsed.config = parsed.config.max_tiles(number(i, "--max-tiles")? as usize);
            }
            "--threaded" => parsed.threaded = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }
    Ok(parsed)
}

fn seed_soup(engine: &mut LifeEngine, side: i32, density: f64) -> Result<(), LifeError> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(SEED);
    for y in 0..side {
        for x in 0..side {
            if rng.random_bool(density) {
                engine.set_cell(x - side / 2, y - side / 2, true)?;
            }
        }
    }
    Ok(())
}

fn run_checked(mut engine: LifeEngine, generations: u64) -> Result<(), LifeError> {
    let mut total = Duration::ZERO;
    let mut done = 0;
    while done < generations {
        let batch = CHECK_INTERVAL.min(generations - done);
        let start = Instant::now();
        engine.step_n(batch)?;
        let elapsed = start.elapsed();
        total += elapsed;
        done += batch;

        let ms = elapsed.as_secs_f64() * 1000.0;
        let counts = engine.tile_counts();
        println!(
            "Generation {}: pop = {}, {ms:.3} ms ({:.6} ms/gen), tiles living {} / hibernating {} / morgue {}",
            engine.generation(),
            engine.population(),
            ms / batch as f64,
            counts.living,
            counts.hibernating,
            counts.morgue,
        );
    }

    let before = engine.population();
    engine.step_n(1)?;
    engine.step_back()?;
    let restored = if engine.population() == before {
        "MATCH"
    } else {
        "MISMATCH"
    };
    println!("Step back to generation {}: pop = {} [{restored}]", engine.generation(), engine.population());

    let total_ms = total.as_secs_f64() * 1000.0;
    println!("\n--- Summary ({generations} generations, rule {}) ---", engine.rule());
    if generations > 0 {
        println!(
            "{total_ms:.3} ms total, {:.6} ms/gen, {:.0} gen/s",
            total_ms / generations as f64,
            generations as f64 / total.as_secs_f64().max(f64::EPSILON)
        );
    }
    Ok(())
}

fn run_threaded(engine: LifeEngine, generations: u64) -> Result<(), LifeError> {
    let simulation = Simulation::spawn(engine, generations, Duration::from_millis(50));
    let mut frames = 0u64;
    let mut outcome = Ok(());
    while let Some(stop) = simulation.next_pit_stop(Duration::from_secs(30)) {
        frames += 1;
        let read = simulation.read(&stop, None, |engine| {
            (engine.population(), engine.display_tiles().count())
        });
        match read {
            Some((population, displayed)) => println!(
                "Pit stop at generation {}: pop = {population}, {displayed} tiles displayed",
                stop.generation
            ),
            None => println!("Pit stop at generation {}: missed", stop.generation),
        }
        if stop.is_final() {
            outcome = stop.outcome.map(|_| ());
            break;
        }
    }
    let engine = simulation.stop();
    println!("{frames} frames, finished at generation {}", engine.generation());
    outcome
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    let result = LifeEngine::with_config(args.config).and_then(|mut engine| {
        seed_soup(&mut engine, args.side, args.density)?;
        println!(
            "Seeded {}x{} soup: pop = {}, {} tiles",
            args.side,
            args.side,
            engine.population(),
            engine.tile_counts().allocated
        );
        if args.threaded {
            run_threaded(engine, args.generations)
        } else {
            run_checked(engine, args.generations)
        }
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_must_be_finite() {
        assert_eq!(parse_density("0.25"), Ok(0.25));
        assert_eq!(parse_density("7"), Ok(1.0));
        assert_eq!(parse_density("-1"), Ok(0.0));
        for text in ["nan", "NaN", "inf", "-inf", "dense"] {
            assert!(parse_density(text).is_err(), "{text}");
        }
    }
}
