//! Headless castle siege runner.
//!
//! Runs battles without graphics, driven by scripted strategies on both
//! sides. Designed for balance batches, CI determinism checks and quick
//! terminal review.
//!
//! # Usage
//!
//! ```bash
//! # Run a single match and print ASCII frames
//! cargo run -p siege_headless -- run --scenario classic --frames 120
//!
//! # Run batch balance test
//! cargo run -p siege_headless -- batch --count 1000 --output results/
//!
//! # Check scenario and strategy files
//! cargo run -p siege_headless -- validate assets/scenarios
//! ```

use std::path::{Path, PathBuf};
use std::process::exit;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siege_core::data::BattleConfig;
use siege_core::math::Fixed;
use siege_core::side::Side;
use siege_core::simulation::SimulationState;
use siege_core::snapshot::SimulationSnapshot;
use siege_headless::{
    ascii_visualizer::{render_ascii, visualize_snapshot_folder, AsciiConfig},
    batch::{run_batch, verify_determinism, BatchConfig},
    game_runner::{run_match, MatchConfig, DEFAULT_MAX_TICKS},
    scenario,
    strategies::Strategy,
};

#[derive(Parser)]
#[command(name = "siege_headless")]
#[command(about = "Headless castle siege runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single match
    Run {
        /// Built-in scenario name or RON file (default: classic)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Controller seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Left side strategy (preset or RON file)
        #[arg(long, default_value = "random")]
        player: String,

        /// Right side strategy (preset or RON file)
        #[arg(long, default_value = "random")]
        enemy: String,

        /// Tick limit
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,

        /// Print an ASCII frame every N ticks
        #[arg(long)]
        frames: Option<u64>,

        /// Also write each frame as JSON into this directory
        #[arg(long, requires = "frames")]
        snapshot_dir: Option<PathBuf>,

        /// Print match metrics as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Run batch of matches for balance testing
    Batch {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "classic")]
        scenario: String,

        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Left side strategy
        #[arg(long, default_value = "random")]
        player: String,

        /// Right side strategy
        #[arg(long, default_value = "random")]
        enemy: String,

        /// Tick limit per match
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long)]
        scenario: Option<String>,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Left side strategy
        #[arg(long, default_value = "random")]
        player: String,

        /// Right side strategy
        #[arg(long, default_value = "random")]
        enemy: String,
    },

    /// Validate scenario (or strategy) RON files
    Validate {
        /// Files or directories of .ron files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Treat the files as strategies instead of scenarios
        #[arg(long)]
        strategies: bool,
    },

    /// Render saved JSON snapshots as ASCII
    Visualize {
        /// Directory of snapshot JSON files
        #[arg(short, long)]
        path: PathBuf,

        /// Width of the lane in characters
        #[arg(long, default_value = "80")]
        width: usize,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Run N ticks of a crowded lane for benchmarking
    Benchmark {
        /// Number of ticks to run
        #[arg(short, long, default_value = "3600")]
        ticks: u64,

        /// Units placed on each side before the clock starts
        #[arg(short, long, default_value = "64")]
        units: usize,

        /// Built-in scenario name or RON file
        #[arg(short, long)]
        scenario: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for results
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            player,
            enemy,
            max_ticks,
            frames,
            snapshot_dir,
            json,
            no_color,
        } => cmd_run(
            scenario.as_deref(),
            seed,
            &player,
            &enemy,
            max_ticks,
            frames,
            snapshot_dir.as_deref(),
            json,
            no_color,
        ),
        Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            player,
            enemy,
            max_ticks,
        } => {
            let config = BatchConfig {
                parallel_matches: parallel,
                ..BatchConfig::new(&scenario, count)
                    .with_output(output)
                    .with_seed(seed)
                    .with_strategies(&player, &enemy)
                    .with_max_ticks(max_ticks)
            };
            cmd_batch(config);
        }
        Commands::Verify {
            scenario,
            seed,
            runs,
            player,
            enemy,
        } => cmd_verify(scenario.as_deref(), seed, runs, &player, &enemy),
        Commands::Validate { paths, strategies } => cmd_validate(&paths, strategies),
        Commands::Visualize {
            path,
            width,
            no_color,
        } => cmd_visualize(&path, width, no_color),
        Commands::Benchmark {
            ticks,
            units,
            scenario,
        } => cmd_benchmark(ticks, units, scenario.as_deref()),
    }
}

/// Print an error and exit with status 1.
fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    tracing::error!("{context}: {err}");
    eprintln!("{context}: {err}");
    exit(1)
}

fn load_battle(scenario: Option<&str>) -> BattleConfig {
    scenario::resolve(scenario).unwrap_or_else(|e| fail("Failed to load scenario", e))
}

fn load_strategy(arg: &str) -> Strategy {
    Strategy::resolve(arg).unwrap_or_else(|e| fail("Failed to load strategy", e))
}

/// Run one match
fn cmd_run(
    scenario: Option<&str>,
    seed: u64,
    player: &str,
    enemy: &str,
    max_ticks: u64,
    frames: Option<u64>,
    snapshot_dir: Option<&Path>,
    json: bool,
    no_color: bool,
) {
    let battle = load_battle(scenario);
    let mut config = MatchConfig::new(battle, seed)
        .with_strategies(load_strategy(player), load_strategy(enemy))
        .with_max_ticks(max_ticks);
    if let Some(interval) = frames {
        config = config.with_snapshot_interval(interval);
    }

    let result = run_match(&config).unwrap_or_else(|e| fail("Match failed", e));

    if let Some(dir) = snapshot_dir {
        if let Err(e) = save_snapshots(dir, &result.snapshots) {
            fail("Failed to write snapshots", e);
        }
        eprintln!("{} snapshots written to {}", result.snapshots.len(), dir.display());
    }

    if json {
        match serde_json::to_string_pretty(&result.metrics) {
            Ok(text) => println!("{text}"),
            Err(e) => fail("Failed to serialize metrics", e),
        }
        return;
    }

    let ascii = AsciiConfig {
        use_color: !no_color,
        ..AsciiConfig::default()
    };
    for snapshot in &result.snapshots {
        println!("{}", render_ascii(snapshot, &ascii));
    }
    println!("{}", render_ascii(&result.final_snapshot, &ascii));

    let metrics = &result.metrics;
    eprintln!(
        "{} vs {}: {:?} after {} ticks ({:.2?} wall)",
        metrics.player.strategy,
        metrics.enemy.strategy,
        metrics.end_condition,
        metrics.duration_ticks,
        result.wall_time
    );
    for side in Side::ALL {
        let s = metrics.side(side);
        eprintln!(
            "  {:<6} spawned {:>3} lost {:>3} upgrades {:>2} food {:>5} gathered {:>5} spent",
            side.key(),
            s.units_spawned,
            s.units_lost,
            s.upgrades_bought(),
            s.resources_gathered,
            s.resources_spent
        );
    }
    eprintln!("  final hash {:016x}", metrics.final_state_hash);
}

fn save_snapshots(dir: &Path, snapshots: &[SimulationSnapshot]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    for snapshot in snapshots {
        let json = serde_json::to_string_pretty(snapshot).map_err(std::io::Error::other)?;
        std::fs::write(dir.join(format!("tick_{:08}.json", snapshot.tick)), json)?;
    }
    Ok(())
}

/// Run a batch and save results
fn cmd_batch(config: BatchConfig) {
    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        scenario = %config.scenario,
        count = config.match_count,
        parallel = config.parallel_matches,
        seed = config.seed_start,
        output = %config.output_dir.display(),
        cpus_available = num_cpus,
        max_ticks = config.max_ticks,
        "Batch configuration"
    );

    let output_path = config.output_dir.join("batch_results.json");
    let results = run_batch(config).unwrap_or_else(|e| fail("Batch setup failed", e));
    if let Err(e) = results.save(&output_path) {
        fail("Failed to save results", e);
    }

    let summary = &results.summary;
    eprintln!("Batch complete: {} matches", summary.total_matches);
    for side in Side::ALL {
        eprintln!(
            "  {:<6} win rate {:>5.1}%",
            side.key(),
            summary.win_rate(side) * 100.0
        );
    }
    eprintln!("  draws {} timeouts {}", summary.draws, summary.timeouts);
    eprintln!(
        "  duration avg {:.0} ticks (min {}, max {})",
        summary.avg_duration_ticks, summary.min_duration_ticks, summary.max_duration_ticks
    );
    if let Some(side) = summary.dominant_side(0.1) {
        eprintln!("  {side} side dominates (>10 points)");
    }
    if !results.errors.is_empty() {
        eprintln!("  {} matches failed", results.errors.len());
    }
    eprintln!("Results written to {}", output_path.display());
}

/// Verify determinism across runs and across a save/load midway
fn cmd_verify(scenario: Option<&str>, seed: u64, runs: u32, player: &str, enemy: &str) {
    let battle = load_battle(scenario);
    let player = load_strategy(player);
    let enemy = load_strategy(enemy);
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        battle.name,
        seed,
        runs
    );

    let report = verify_determinism(&battle, &player, &enemy, seed, runs)
        .unwrap_or_else(|e| fail("Verification run failed", e));
    if !report.deterministic {
        eprintln!("FAIL: Non-determinism detected!");
        for (i, hash) in report.hashes.iter().enumerate() {
            eprintln!("  run {i}: {hash:016x}");
        }
        exit(1);
    }

    if let Err(e) = verify_resume(&battle) {
        eprintln!("FAIL: {e}");
        exit(1);
    }
    eprintln!(
        "PASS: All {} runs produced identical results ({:016x}), save/load resumes identically",
        runs, report.hashes[0]
    );
}

/// A state saved at tick 300 and restored continues bit-identically.
fn verify_resume(battle: &BattleConfig) -> Result<(), String> {
    let mut original = SimulationState::new(battle).map_err(|e| e.to_string())?;
    for side in Side::ALL {
        original.spawn_default_unit(side).map_err(|e| e.to_string())?;
    }
    for _ in 0..300 {
        original.step_tick().map_err(|e| e.to_string())?;
    }

    let bytes = original.serialize().map_err(|e| e.to_string())?;
    let mut restored = SimulationState::deserialize(&bytes).map_err(|e| e.to_string())?;
    for _ in 0..600 {
        original.step_tick().map_err(|e| e.to_string())?;
        restored.step_tick().map_err(|e| e.to_string())?;
        if original.state_hash() != restored.state_hash() {
            return Err(format!("restored state diverged at tick {}", original.tick()));
        }
    }
    Ok(())
}

fn ron_files(path: &Path) -> Vec<PathBuf> {
    if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.path())
                    .filter(|p| p.extension().is_some_and(|e| e == "ron"))
                    .collect()
            })
            .unwrap_or_default();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    }
}

/// Validate RON files
fn cmd_validate(paths: &[PathBuf], strategies: bool) {
    let files: Vec<PathBuf> = paths.iter().flat_map(|p| ron_files(p)).collect();
    if files.is_empty() {
        fail("Nothing to validate", "no .ron files found");
    }

    let mut failures = 0;
    for file in &files {
        let outcome = if strategies {
            Strategy::load(file).map(|s| s.name).map_err(|e| e.to_string())
        } else {
            scenario::load(file).map(|b| b.name).map_err(|e| e.to_string())
        };
        match outcome {
            Ok(name) => eprintln!("ok    {} ({name})", file.display()),
            Err(e) => {
                failures += 1;
                eprintln!("FAIL  {}: {e}", file.display());
            }
        }
    }

    eprintln!("{} files checked, {} failed", files.len(), failures);
    if failures > 0 {
        exit(1);
    }
}

/// Render saved snapshots
fn cmd_visualize(path: &Path, width: usize, no_color: bool) {
    let config = AsciiConfig {
        width,
        use_color: !no_color,
        ..AsciiConfig::default()
    };
    match visualize_snapshot_folder(path, &config) {
        Ok(output) => println!("{output}"),
        Err(e) => fail("Failed to visualize directory", e),
    }
}

/// Run benchmark
fn cmd_benchmark(ticks: u64, units: usize, scenario: Option<&str>) {
    let battle = load_battle(scenario);
    let mut state = SimulationState::new(&battle).unwrap_or_else(|e| fail("Invalid scenario", e));

    // Packed columns in front of each gate so the armies meet quickly
    let spacing = Fixed::from_num(24);
    let player_gate = state.stronghold(Side::Player).bounds().right();
    let enemy_gate = state.stronghold(Side::Enemy).bounds().x - battle.enemy_unit.width;
    for i in 0..units {
        let offset = spacing * Fixed::from_num(i % 8);
        let placed = state
            .spawn_unit_at(Side::Player, player_gate + offset, &battle.player_unit)
            .and_then(|_| state.spawn_unit_at(Side::Enemy, enemy_gate - offset, &battle.enemy_unit));
        if let Err(e) = placed {
            fail("Failed to place units", e);
        }
    }

    tracing::info!("Running {} tick benchmark with {} units per side", ticks, units);
    let start = Instant::now();
    let mut completed = 0u64;
    while completed < ticks && !state.is_terminated() {
        if let Err(e) = state.step_tick() {
            fail("Tick failed", e);
        }
        completed += 1;
    }
    let elapsed = start.elapsed();

    let per_sec = completed as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    eprintln!("Benchmark complete:");
    eprintln!("  Ticks: {completed}");
    eprintln!("  Time: {elapsed:.2?}");
    eprintln!("  Ticks/sec: {per_sec:.0}");
    eprintln!(
        "  Realtime factor: {:.1}x",
        per_sec / f64::from(state.tick_rate().max(1))
    );
    eprintln!("  Final state hash: {:016x}", state.state_hash());
}
