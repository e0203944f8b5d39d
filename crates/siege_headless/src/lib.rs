//! Headless match runner for AI testing, balance batches and CI verification.
//!
//! Both sides of a siege are driven by scripted [`Strategy`] controllers and
//! the battle runs at a fixed tick rate with no rendering. This enables:
//!
//! - **Balance testing**: thousands of seeded matches in parallel
//! - **CI verification**: determinism checks across runs and threads
//! - **Quick review**: ASCII frames of a match in the terminal
//!
//! stdout carries results (JSON or ASCII); logs go to stderr.
//!
//! # Example
//!
//! ```bash
//! # One match, ASCII frame every 5 seconds
//! cargo run -p siege_headless -- run --frames 300
//!
//! # Balance batch
//! cargo run -p siege_headless -- batch --count 1000 --player rush --enemy random
//!
//! # Verify determinism
//! cargo run -p siege_headless -- verify --seed 12345 --runs 5
//! ```

pub mod ascii_visualizer;
pub mod batch;
pub mod game_runner;
pub mod metrics;
pub mod scenario;
pub mod strategies;

pub use ascii_visualizer::{render_ascii, visualize_snapshot_folder, AsciiConfig};
pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
pub use game_runner::{run_match, MatchConfig, MatchResult};
pub use metrics::{BatchSummary, MatchMetrics, MetricsCollector};
pub use scenario::ScenarioError;
pub use strategies::{SideController, Strategy, StrategyError};
