//! gridview playback CLI
//!
//! Drive a traffic-grid playback against a live simulation server, or run
//! the scripted scenarios offline on a virtual clock.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gridview_core::params::{CarCap, LightChance, RunParameters, SpawnRate};
use gridview_core::sync::SyncConfig;
use gridview_env::{
    FrameSource, HttpFrameSource, PlayerConfig, ScenePlayer, TokioClock, DEFAULT_BASE_URL,
};
use gridview_sim::recorder::RecordingRenderer;
use gridview_sim::runner::{place_grid, ScenarioRunner};
use gridview_sim::scenarios::Scenario;

#[derive(Parser, Debug)]
#[command(
    name = "gridview-sim",
    version,
    about = "Traffic-grid playback against a simulation server or scripted scenarios"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit run parameters to a live server, then play the run back.
    Run {
        /// Base URL of the simulation server.
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Grid side length (6-60).
        #[arg(long, default_value_t = 12)]
        dimensions: u32,

        /// Simulation steps (1-500).
        #[arg(long, default_value_t = 100)]
        steps: u32,

        /// Concurrent car cap (1-70); ignored with --infinite-cars.
        #[arg(long, default_value_t = 10)]
        max_cars: u32,

        /// Lift the car cap entirely.
        #[arg(long)]
        infinite_cars: bool,

        /// Per-step spawn probability (0-1); ignored with --infinite-spawn.
        #[arg(long, default_value_t = 0.5)]
        spawn_rate: f64,

        /// Spawn on every step.
        #[arg(long)]
        infinite_spawn: bool,

        /// Chance of running a yellow light (0-0.5); ignored with --always-yellow.
        #[arg(long, default_value_t = 0.2)]
        yellow_chance: f64,

        /// Drivers always run yellow lights.
        #[arg(long)]
        always_yellow: bool,

        /// Chance of running a red light (0-0.1); ignored with --always-red.
        #[arg(long, default_value_t = 0.01)]
        red_chance: f64,

        /// Drivers always run red lights.
        #[arg(long)]
        always_red: bool,

        /// Demand-aware traffic lights.
        #[arg(long)]
        smart_lights: bool,

        /// Green-phase duration in steps (5-50).
        #[arg(long, default_value_t = 15)]
        green_duration: u32,

        /// Seconds between simulation steps during playback.
        #[arg(long, default_value_t = 0.1)]
        frame_interval: f64,

        /// Playback tick rate in Hz.
        #[arg(long, default_value_t = 60)]
        tick_rate: u32,

        /// Play back the server's previous run without submitting parameters.
        #[arg(long)]
        replay_only: bool,
    },

    /// Run one scripted scenario (or all of them) on a virtual clock.
    Scenario {
        #[arg(value_enum)]
        scenario: Option<Scenario>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            base_url,
            dimensions,
            steps,
            max_cars,
            infinite_cars,
            spawn_rate,
            infinite_spawn,
            yellow_chance,
            always_yellow,
            red_chance,
            always_red,
            smart_lights,
            green_duration,
            frame_interval,
            tick_rate,
            replay_only,
        } => {
            let params = RunParameters {
                dimensions,
                steps,
                max_cars: if infinite_cars { CarCap::Infinite } else { CarCap::Capped(max_cars) },
                spawn_rate: if infinite_spawn {
                    SpawnRate::Infinite
                } else {
                    SpawnRate::Rate(spawn_rate)
                },
                chance_run_yellow_light: if always_yellow {
                    LightChance::Always
                } else {
                    LightChance::Chance(yellow_chance)
                },
                chance_run_red_light: if always_red {
                    LightChance::Always
                } else {
                    LightChance::Chance(red_chance)
                },
                smart_lights,
                green_duration,
            };
            let config = PlayerConfig {
                sync: SyncConfig { frame_interval },
                tick_rate_hz: tick_rate,
            };
            run_live(&base_url, &params, config, replay_only).await
        }
        Command::Scenario { scenario } => run_scenarios(scenario).await,
    }
}

async fn run_live(
    base_url: &str,
    params: &RunParameters,
    config: PlayerConfig,
    replay_only: bool,
) -> anyhow::Result<()> {
    let source = HttpFrameSource::new(base_url).context("building http client")?;

    if !replay_only {
        source
            .post_run_parameters(params)
            .await
            .context("submitting run parameters")?;
        info!("model run accepted");
    }

    let grid = source.fetch_grid().await.context("fetching intersection matrix")?;
    info!(rows = grid.rows(), cols = grid.cols(), "grid received");

    let mut renderer = RecordingRenderer::new();
    let tiles = place_grid(&mut renderer, &grid);
    info!(tiles = tiles.len(), "grid placed");

    if let Ok(total) = source.fetch_total_steps().await {
        info!(total_steps = total, "run length reported by server");
    }

    let player = ScenePlayer::new(config);
    let clock = TokioClock::new();
    let report = player
        .run(&source, &mut renderer, &clock)
        .await
        .context("playback aborted")?;

    println!(
        "playback complete: {} frames, {} creates, {} destroys, {} entities on screen",
        report.frames_applied,
        renderer.created_count(),
        renderer.destroyed_count(),
        renderer.live_count(),
    );
    Ok(())
}

async fn run_scenarios(scenario: Option<Scenario>) -> anyhow::Result<()> {
    let runner = ScenarioRunner::with_defaults();
    let scenarios = match scenario {
        Some(s) => vec![s],
        None => Scenario::all(),
    };

    let mut failures = 0;
    for scenario in scenarios {
        let result = runner.run(scenario).await;
        let status = if result.passed { "PASS" } else { "FAIL" };
        println!(
            "{status} {:<10} frames={} live={}{}",
            scenario.name(),
            result.frames_applied,
            result.live_entities,
            result.error.map(|e| format!(" error={e}")).unwrap_or_default(),
        );
        if !result.passed {
            failures += 1;
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} scenario(s) failed");
    }
    Ok(())
}
