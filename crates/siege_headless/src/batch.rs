//! Batch match runner for balance testing.
//!
//! Runs many seeded matches in parallel using rayon and aggregates their
//! metrics.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use siege_core::data::BattleConfig;
use siege_core::error::Result as SiegeResult;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::game_runner::{run_match, MatchConfig, DEFAULT_MAX_TICKS};
use crate::metrics::{BatchSummary, MatchMetrics};
use crate::scenario::{self, ScenarioError};
use crate::strategies::{Strategy, StrategyError};

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Built-in scenario name or RON path
    pub scenario: String,
    /// Number of matches to run
    pub match_count: u32,
    /// Maximum parallel matches (0 = use rayon default)
    pub parallel_matches: u32,
    /// Output directory for results
    pub output_dir: PathBuf,
    /// Starting seed; match `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Maximum ticks per match
    pub max_ticks: u64,
    /// Strategy for the left side (preset name or RON path)
    pub player_strategy: String,
    /// Strategy for the right side
    pub enemy_strategy: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "classic".to_string(),
            match_count: 100,
            parallel_matches: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            player_strategy: "random".to_string(),
            enemy_strategy: "random".to_string(),
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: &str, match_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            match_count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set strategies
    pub fn with_strategies(mut self, player: &str, enemy: &str) -> Self {
        self.player_strategy = player.to_string();
        self.enemy_strategy = enemy.to_string();
        self
    }

    /// Set the per-match tick limit
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// Batch inputs that could not be resolved, so no match ran
#[derive(Error, Debug)]
pub enum BatchSetupError {
    /// Scenario could not be loaded.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// Strategy could not be loaded.
    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual match metrics, in seed order
    pub matches: Vec<MatchMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// A match that failed mid-run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Match index
    pub match_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Progress tracking for batch runs
#[derive(Debug)]
pub struct BatchProgress {
    /// Total matches
    pub total: u32,
    completed: AtomicU32,
    start_time: Instant,
    partial_wins: Mutex<HashMap<String, u32>>,
}

impl BatchProgress {
    /// Create new progress tracker
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            start_time: Instant::now(),
            partial_wins: Mutex::new(HashMap::new()),
        }
    }

    /// Record a completed match
    pub fn record_completion(&self, winner: Option<&str>) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if let Some(w) = winner {
            if let Ok(mut wins) = self.partial_wins.lock() {
                *wins.entry(w.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Get current completion count
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get completion percentage
    pub fn percentage(&self) -> f64 {
        self.current() as f64 / self.total.max(1) as f64 * 100.0
    }

    /// Get estimated time remaining
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::from_secs(0);
        }

        let per_match = self.start_time.elapsed().as_secs_f64() / completed as f64;
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_match * remaining as f64)
    }

    /// Get current win rates
    pub fn current_win_rates(&self) -> HashMap<String, f64> {
        let completed = self.current();
        if completed == 0 {
            return HashMap::new();
        }

        match self.partial_wins.lock() {
            Ok(wins) => wins
                .iter()
                .map(|(k, v)| (k.clone(), *v as f64 / completed as f64))
                .collect(),
            Err(_) => HashMap::new(),
        }
    }

    /// Display progress to stderr
    pub fn display(&self) {
        let eta = self.eta();
        eprintln!(
            "Batch progress: {}/{} ({:.1}%), ETA {}m {}s",
            self.current(),
            self.total,
            self.percentage(),
            eta.as_secs() / 60,
            eta.as_secs() % 60
        );
        let mut rates: Vec<_> = self.current_win_rates().into_iter().collect();
        rates.sort_by(|a, b| a.0.cmp(&b.0));
        for (side, rate) in rates {
            eprintln!("  {side:<8} {:>5.1}%", rate * 100.0);
        }
    }
}

/// Run a batch of matches.
///
/// Scenario and strategies are resolved once up front; a match that fails
/// afterwards is recorded in [`BatchResults::errors`] and the rest still run.
pub fn run_batch(config: BatchConfig) -> Result<BatchResults, BatchSetupError> {
    let battle = scenario::resolve(Some(&config.scenario))?;
    let player = Strategy::resolve(&config.player_strategy)?;
    let enemy = Strategy::resolve(&config.enemy_strategy)?;

    let start = Instant::now();
    let progress = BatchProgress::new(config.match_count);
    info!(
        "Starting batch run: {} matches of '{}' ({} vs {})",
        config.match_count, battle.name, player.name, enemy.name
    );

    let run_all = || -> Vec<Result<MatchMetrics, BatchError>> {
        (0..config.match_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                let match_config = MatchConfig::new(battle.clone(), seed)
                    .with_strategies(player.clone(), enemy.clone())
                    .with_max_ticks(config.max_ticks);

                match run_match(&match_config) {
                    Ok(result) => {
                        let metrics = result.metrics;
                        progress.record_completion(metrics.winner.map(|w| w.key()));
                        let completed = progress.current();
                        if completed % 10 == 0 {
                            debug!("Progress: {}/{}", completed, config.match_count);
                        }
                        if completed % 100 == 0 {
                            progress.display();
                        }
                        Ok(metrics)
                    }
                    Err(e) => {
                        warn!("Match {} failed: {}", i, e);
                        Err(BatchError {
                            match_index: i,
                            seed,
                            message: e.to_string(),
                        })
                    }
                }
            })
            .collect()
    };

    // A local pool keeps repeated batches in one process independent
    let results = if config.parallel_matches > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_matches as usize)
            .build()
        {
            Ok(pool) => pool.install(run_all),
            Err(e) => {
                warn!("Failed to build thread pool: {}, using global pool", e);
                run_all()
            }
        }
    } else {
        run_all()
    };

    let (matches, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let matches: Vec<MatchMetrics> = matches.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_matches(&matches);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        "Batch complete: {} matches in {:.1}s ({:.1} matches/sec)",
        matches.len(),
        duration_seconds,
        matches.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    Ok(BatchResults {
        config,
        matches,
        summary,
        duration_seconds,
        errors,
    })
}

/// Outcome of running one seed several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismReport {
    /// Seed replayed.
    pub seed: u64,
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
    /// Whether every run ended identically.
    pub deterministic: bool,
}

/// Replay one match `runs` times across the thread pool and compare.
pub fn verify_determinism(
    battle: &BattleConfig,
    player: &Strategy,
    enemy: &Strategy,
    seed: u64,
    runs: u32,
) -> SiegeResult<DeterminismReport> {
    let config = MatchConfig::new(battle.clone(), seed).with_strategies(player.clone(), enemy.clone());
    let results: Vec<MatchMetrics> = (0..runs.max(1))
        .into_par_iter()
        .map(|_| run_match(&config).map(|r| r.metrics))
        .collect::<SiegeResult<_>>()?;

    let first = &results[0];
    let deterministic = results.iter().all(|r| {
        r.final_state_hash == first.final_state_hash
            && r.winner == first.winner
            && r.duration_ticks == first.duration_ticks
            && r.end_condition == first.end_condition
    });

    Ok(DeterminismReport {
        seed,
        hashes: results.iter().map(|r| r.final_state_hash).collect(),
        deterministic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(count: u32) -> BatchConfig {
        BatchConfig::new("short_lane", count).with_max_ticks(3_000)
    }

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.match_count, 100);
        assert_eq!(config.scenario, "classic");
        assert_eq!(config.max_ticks, DEFAULT_MAX_TICKS);
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new("custom.ron", 500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345)
            .with_strategies("rush", "economic");

        assert_eq!(config.scenario, "custom.ron");
        assert_eq!(config.match_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.enemy_strategy, "economic");
    }

    #[test]
    fn test_progress_tracking() {
        let progress = BatchProgress::new(100);
        assert_eq!(progress.current(), 0);
        assert_eq!(progress.percentage(), 0.0);

        progress.record_completion(Some("player"));
        progress.record_completion(Some("enemy"));
        progress.record_completion(Some("player"));
        progress.record_completion(None);

        assert_eq!(progress.current(), 4);
        let rates = progress.current_win_rates();
        assert!((rates["player"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(quick(6).with_strategies("rush", "random")).unwrap();

        assert_eq!(results.matches.len(), 6);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_matches, 6);
        let seeds: Vec<u64> = results.matches.iter().map(|m| m.seed).collect();
        assert_eq!(seeds, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_bounded_pool() {
        let results = run_batch(quick(4).with_strategies("passive", "passive")).unwrap();
        let pooled = run_batch(BatchConfig {
            parallel_matches: 2,
            ..quick(4).with_strategies("passive", "passive")
        })
        .unwrap();
        assert_eq!(pooled.summary.timeouts, 4);
        assert_eq!(
            results.matches[3].final_state_hash,
            pooled.matches[3].final_state_hash
        );
    }

    #[test]
    fn test_unknown_strategy_fails_setup() {
        let err = run_batch(quick(1).with_strategies("rush", "turtle")).unwrap_err();
        assert!(matches!(err, BatchSetupError::Strategy(_)));
    }

    #[test]
    fn test_verify_determinism() {
        let report = verify_determinism(
            &scenario::short_lane(),
            &Strategy::random(),
            &Strategy::rush(),
            12345,
            4,
        )
        .unwrap();
        assert!(report.deterministic);
        assert_eq!(report.hashes.len(), 4);
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(quick(3)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.matches.len(), 3);
        assert_eq!(loaded.config.scenario, "short_lane");
    }
}
