#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a scripted Detour Defence session headlessly.

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use detour_defence_core::{CellCoord, Command, Event, SessionStatus};
use detour_defence_world::{self as world, query, Config, World};
use serde::Deserialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "detour-defence")]
#[command(about = "Runs a scripted tower-defence session and prints the outcome")]
struct Args {
    /// TOML scenario with `[session]` and `[script]` tables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of simulation ticks to run
    #[arg(long, default_value = "6000")]
    ticks: u32,

    /// Simulated milliseconds per tick
    #[arg(long, default_value = "16")]
    step_ms: u64,
}

/// Scenario file contents.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct Scenario {
    session: Config,
    script: Script,
}

/// Player actions replayed against the session.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
struct Script {
    towers: Vec<CellCoord>,
    waves: u32,
    wave_interval_ms: u64,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            towers: Vec::new(),
            waves: 1,
            wave_interval_ms: 10_000,
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    placed: u32,
    rejected: u32,
    reroutes: u32,
    shots: u32,
    leaked: u32,
    defeated: u32,
}

impl Tally {
    fn record(&mut self, event: &Event) {
        match event {
            Event::TowerPlaced { .. } => self.placed += 1,
            Event::TowerPlacementRejected { cell, reason } => {
                info!(%cell, %reason, "tower rejected");
                self.rejected += 1;
            }
            Event::AgentRerouted { .. } => self.reroutes += 1,
            Event::ProjectileFired { .. } => self.shots += 1,
            Event::AgentReachedEnd { .. } => self.leaked += 1,
            Event::AgentsDefeated { count, .. } => self.defeated += count,
            Event::WaveSpawnRejected { reason } => info!(%reason, "wave rejected"),
            _ => {}
        }
    }
}

fn load_scenario(path: Option<&PathBuf>) -> Result<Scenario> {
    let Some(path) = path else {
        return Ok(Scenario::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    parse_scenario(&text).with_context(|| format!("invalid scenario {}", path.display()))
}

fn parse_scenario(text: &str) -> Result<Scenario> {
    Ok(toml::from_str(text)?)
}

fn run(scenario: Scenario, ticks: u32, step: Duration) -> Result<(World, Tally)> {
    let Scenario { session, script } = scenario;
    let mut world = World::with_config(session).context("invalid session configuration")?;
    let mut tally = Tally::default();
    let mut events = Vec::new();

    for cell in script.towers {
        world::apply(&mut world, Command::PlaceTower { cell }, &mut events);
    }

    let interval = Duration::from_millis(script.wave_interval_ms);
    let mut spawned = 0;
    let mut next_wave_at = Duration::ZERO;
    for _ in 0..ticks {
        if spawned < script.waves && query::clock(&world) >= next_wave_at {
            world::apply(&mut world, Command::SpawnWave, &mut events);
            spawned += 1;
            next_wave_at = query::clock(&world).saturating_add(interval);
        }
        world::apply(&mut world, Command::Tick { dt: step }, &mut events);

        for event in events.drain(..) {
            tally.record(&event);
        }
        if query::status(&world) != SessionStatus::Playing {
            debug!(tick = query::tick_index(&world), "session ended");
            break;
        }
    }
    Ok((world, tally))
}

/// Entry point for the Detour Defence command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let scenario = load_scenario(args.config.as_ref())?;
    let (world, tally) = run(scenario, args.ticks, Duration::from_millis(args.step_ms))?;

    let economy = query::economy(&world);
    println!(
        "status: {:?} after {} ticks ({:.1}s simulated)",
        economy.status,
        query::tick_index(&world),
        query::clock(&world).as_secs_f64()
    );
    println!(
        "wave {} | money {} | lives {} | score {}",
        economy.wave, economy.money, economy.lives, economy.score
    );
    println!(
        "towers {} placed, {} rejected | {} shots | {} defeated | {} leaked | {} reroutes",
        tally.placed, tally.rejected, tally.shots, tally.defeated, tally.leaked, tally.reroutes
    );
    println!("agents still active: {}", query::agent_view(&world).len());
    Ok(())
}
