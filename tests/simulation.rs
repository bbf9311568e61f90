use std::time::Duration;

use stagger_life::{
    Command, LifeConfig, LifeEngine, LifeError, PitStop, Simulation, StepOutcome,
};

const WAIT: Duration = Duration::from_secs(10);

fn blinker() -> LifeEngine {
    let mut engine = LifeEngine::new();
    for x in 0..3 {
        engine.set_cell(x, 0, true).unwrap();
    }
    engine
}

fn final_stop(simulation: &Simulation) -> PitStop {
    loop {
        let stop = simulation
            .next_pit_stop(WAIT)
            .expect("stepping thread went quiet");
        simulation.read(&stop, None, |_| ());
        if stop.is_final() {
            return stop;
        }
    }
}

#[test]
fn finite_run_reports_finished() {
    let simulation = Simulation::spawn(blinker(), 20, Duration::from_millis(20));
    let stop = final_stop(&simulation);
    assert_eq!(stop.generation, 20);
    assert_eq!(stop.outcome, Ok(StepOutcome::Finished));

    let engine = simulation.stop();
    assert_eq!(engine.generation(), 20);
    assert!(engine.get_cell(0, 0) && engine.get_cell(2, 0));
}

#[test]
fn commands_land_between_pit_stops() {
    let config = LifeConfig::default()
        .frame_interval(Duration::from_millis(1))
        .skip(1);
    let engine = LifeEngine::with_config(config).unwrap();
    let simulation = Simulation::spawn(engine, 0, WAIT);

    let first = simulation.next_pit_stop(WAIT).unwrap();
    assert_eq!(first.outcome, Ok(StepOutcome::PitStop));
    for (x, y) in [(40, 40), (41, 40), (40, 41), (41, 41)] {
        assert!(simulation.send(Command::SetCell { x, y, alive: true }));
    }
    simulation.read(&first, None, |_| ());

    let next = simulation.next_pit_stop(WAIT).unwrap();
    assert!(next.generation > first.generation);
    let population = simulation.read(&next, None, |engine| engine.population());
    assert_eq!(population, Some(4));

    let engine = simulation.stop();
    assert!(engine.get_cell(41, 41));
}

#[test]
fn rejected_command_does_not_stop_the_thread() {
    let config = LifeConfig::default()
        .frame_interval(Duration::from_millis(1))
        .skip(2);
    let engine = LifeEngine::with_config(config).unwrap();
    let simulation = Simulation::spawn(engine, 0, WAIT);
    let first = simulation.next_pit_stop(WAIT).unwrap();

    assert!(simulation.send(Command::SetRule("bogus".to_owned())));
    simulation.read(&first, None, |_| ());

    let stop = simulation.next_pit_stop(WAIT).unwrap();
    assert_eq!(stop.outcome, Ok(StepOutcome::PitStop));
    let rule = simulation.read(&stop, None, |engine| engine.rule());
    assert_eq!(rule.as_deref(), Some("B3/S23"));
}

#[test]
fn stop_applies_queued_commands() {
    let simulation = Simulation::spawn(blinker(), 5, Duration::from_millis(20));
    let stop = final_stop(&simulation);
    assert_eq!(stop.outcome, Ok(StepOutcome::Finished));

    let commands = simulation.commands();
    commands.send(Command::Clear).unwrap();
    commands
        .send(Command::SetCell {
            x: -7,
            y: 9,
            alive: true,
        })
        .unwrap();
    commands.send(Command::SetRule("B36/S23".to_owned())).unwrap();

    let engine = simulation.stop();
    assert_eq!(engine.generation(), 0);
    assert_eq!(engine.population(), 1);
    assert!(engine.get_cell(-7, 9));
    assert_eq!(engine.rule(), "B36/S23");
}

#[test]
fn resource_exhaustion_is_final() {
    let config = LifeConfig::default().max_tiles(1);
    let mut engine = LifeEngine::with_config(config).unwrap();
    for (x, y) in [(7, 6), (8, 7), (6, 8), (7, 8), (8, 8)] {
        engine.set_cell(x, y, true).unwrap();
    }
    let simulation = Simulation::spawn(engine, 200, Duration::from_millis(20));
    let stop = final_stop(&simulation);
    assert_eq!(stop.outcome, Err(LifeError::ResourceExhausted { tiles: 1 }));

    let engine = simulation.stop();
    assert_eq!(engine.generation(), stop.generation);
    assert_eq!(engine.population(), 5);
}

#[test]
fn late_read_does_not_leak_into_later_stops() {
    let config = LifeConfig::default()
        .frame_interval(Duration::from_millis(1))
        .skip(1);
    let mut engine = LifeEngine::with_config(config).unwrap();
    for x in 0..3 {
        engine.set_cell(x, 0, true).unwrap();
    }
    let simulation = Simulation::spawn(engine, 0, Duration::from_millis(200));

    // Miss the first window entirely, then acknowledge it late.
    let first = simulation.next_pit_stop(WAIT).unwrap();
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(simulation.read(&first, None, |engine| engine.generation()), None);

    let mut seen = 0;
    for _ in 0..20 {
        let stop = simulation.next_pit_stop(WAIT).unwrap();
        assert!(stop.sequence > first.sequence);
        if let Some(generation) = simulation.read(&stop, None, |engine| engine.generation()) {
            assert_eq!(generation, stop.generation);
            seen += 1;
        }
    }
    assert!(seen > 0);
    drop(simulation);
}
