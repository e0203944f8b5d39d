//! ASCII battle visualizer for terminal review.
//!
//! Renders a [`SimulationSnapshot`] as a one-line lane with both
//! strongholds, their health bars and a unit legend.

use std::path::Path;

use siege_core::side::Side;
use siege_core::simulation::Outcome;
use siege_core::snapshot::{SimulationSnapshot, StrongholdView};

/// ASCII visualization configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Width of the lane in characters.
    pub width: usize,
    /// Show stronghold health bars.
    pub show_health: bool,
    /// Show unit counts legend.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            width: 80,
            show_health: true,
            show_legend: true,
            use_color: true,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";

    pub const BLUE: &str = "\x1b[34m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const MAGENTA: &str = "\x1b[35m";
}

const HEALTH_BAR_WIDTH: usize = 20;

const fn side_color(side: Side) -> &'static str {
    match side {
        Side::Player => colors::BLUE,
        Side::Enemy => colors::RED,
    }
}

fn health_color(fraction: f32) -> &'static str {
    if fraction > 0.66 {
        colors::GREEN
    } else if fraction > 0.33 {
        colors::YELLOW
    } else {
        colors::RED
    }
}

/// What occupies one lane cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Empty,
    Stronghold(Side),
    Unit(Side),
    Melee,
}

impl Cell {
    const fn glyph(self) -> char {
        match self {
            Self::Empty => '_',
            Self::Stronghold(_) => '#',
            Self::Unit(Side::Player) => '>',
            Self::Unit(Side::Enemy) => '<',
            Self::Melee => '*',
        }
    }

    const fn color(self) -> Option<&'static str> {
        match self {
            Self::Empty => None,
            Self::Stronghold(side) | Self::Unit(side) => Some(side_color(side)),
            Self::Melee => Some(colors::MAGENTA),
        }
    }

    fn with_unit(self, side: Side) -> Self {
        match self {
            Self::Unit(other) if other != side => Self::Melee,
            Self::Melee => Self::Melee,
            _ => Self::Unit(side),
        }
    }
}

fn column(x: f32, arena_width: f32, width: usize) -> usize {
    let scaled = x / arena_width.max(1.0) * width as f32;
    (scaled.max(0.0) as usize).min(width.saturating_sub(1))
}

fn paint(text: &str, color: &str, config: &AsciiConfig) -> String {
    if config.use_color {
        format!("{color}{text}{}", colors::RESET)
    } else {
        text.to_string()
    }
}

fn render_lane(snapshot: &SimulationSnapshot, config: &AsciiConfig) -> String {
    let width = config.width.max(8);
    let mut lane = vec![Cell::Empty; width];

    for side in Side::ALL {
        let keep = snapshot.stronghold(side);
        let from = column(keep.x, snapshot.arena_width, width);
        let to = column(keep.x + keep.width - 1.0, snapshot.arena_width, width);
        for cell in &mut lane[from..=to] {
            *cell = Cell::Stronghold(side);
        }
    }

    // Units sit on top of strongholds when they are battering them
    for unit in &snapshot.units {
        let col = column(unit.x + unit.width / 2.0, snapshot.arena_width, width);
        lane[col] = lane[col].with_unit(unit.side);
    }

    let mut line = String::with_capacity(width * 2);
    line.push('|');
    for cell in lane {
        let glyph = cell.glyph().to_string();
        match cell.color() {
            Some(color) => line.push_str(&paint(&glyph, color, config)),
            None => line.push_str(&glyph),
        }
    }
    line.push('|');
    line
}

fn render_health(keep: &StrongholdView, config: &AsciiConfig) -> String {
    let fraction = keep.health_fraction();
    let filled = ((fraction * HEALTH_BAR_WIDTH as f32).round() as usize).min(HEALTH_BAR_WIDTH);
    let bar = format!("{}{}", "=".repeat(filled), "-".repeat(HEALTH_BAR_WIDTH - filled));
    let name = paint(&format!("{:<12}", keep.name), side_color(keep.side), config);
    format!(
        "{name} [{}] {:>4}/{:<4} lvl {} food {}",
        paint(&bar, health_color(fraction), config),
        keep.health,
        keep.max_health,
        keep.level,
        keep.resources
    )
}

fn outcome_text(outcome: Option<Outcome>) -> Option<String> {
    match outcome? {
        Outcome::Victory(side) => Some(format!("{} wins", side.flank())),
        Outcome::Draw => Some("draw".to_string()),
    }
}

/// Render a snapshot as ASCII art.
pub fn render_ascii(snapshot: &SimulationSnapshot, config: &AsciiConfig) -> String {
    let mut output = String::new();

    let bold = if config.use_color { colors::BOLD } else { "" };
    let reset = if config.use_color { colors::RESET } else { "" };
    output.push_str(&format!(
        "{bold}== Tick {} ({:.1}s){} =={reset}\n",
        snapshot.tick,
        snapshot.elapsed_secs,
        outcome_text(snapshot.outcome)
            .map(|t| format!(" | {t}"))
            .unwrap_or_default()
    ));

    output.push_str(&render_lane(snapshot, config));
    output.push('\n');

    if config.show_health {
        for side in Side::ALL {
            output.push_str(&render_health(snapshot.stronghold(side), config));
            output.push('\n');
        }
    }

    if config.show_legend {
        let engaged = snapshot.units.iter().filter(|u| u.engaged).count();
        output.push_str(&format!(
            "{}=player {}=enemy *=melee #=stronghold | units {} vs {} ({} engaged)\n",
            paint(">", side_color(Side::Player), config),
            paint("<", side_color(Side::Enemy), config),
            snapshot.units_of(Side::Player).count(),
            snapshot.units_of(Side::Enemy).count(),
            engaged
        ));
    }

    output
}

/// Render a before/after comparison of two snapshots.
pub fn render_battle_progress(
    before: &SimulationSnapshot,
    after: &SimulationSnapshot,
    config: &AsciiConfig,
) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Battle Progress: Tick {} -> {}\n",
        before.tick, after.tick
    ));
    output.push_str("+----------+----------+----------+----------+----------+\n");
    output.push_str("| Side     | Units    | Units    | Keep hp  | Keep hp  |\n");
    output.push_str("|          | before   | after    | before   | after    |\n");
    output.push_str("+----------+----------+----------+----------+----------+\n");

    for side in Side::ALL {
        let b = before.units_of(side).count();
        let a = after.units_of(side).count();
        let hp_before = before.stronghold(side).health;
        let hp_after = after.stronghold(side).health;
        let hp_cell = format!("{hp_after:>8}");
        let hp_cell = if hp_after < hp_before {
            paint(&hp_cell, colors::RED, config)
        } else {
            hp_cell
        };
        output.push_str(&format!(
            "| {:<8} | {b:>8} | {a:>8} | {hp_before:>8} | {hp_cell} |\n",
            side.key()
        ));
    }
    output.push_str("+----------+----------+----------+----------+----------+\n");
    output
}

/// Load snapshots saved as JSON (one per file) and render them in tick
/// order, followed by a progress table.
pub fn visualize_snapshot_folder(path: &Path, config: &AsciiConfig) -> std::io::Result<String> {
    let mut snapshots: Vec<SimulationSnapshot> = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let file_path = entry?.path();
        if file_path.extension().is_some_and(|e| e == "json") {
            let json = std::fs::read_to_string(&file_path)?;
            match serde_json::from_str(&json) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => tracing::warn!(path = %file_path.display(), "Skipping snapshot: {e}"),
            }
        }
    }
    snapshots.sort_by_key(|s| s.tick);

    let mut output = String::new();
    if snapshots.is_empty() {
        output.push_str("No snapshots found in directory.\n");
        return Ok(output);
    }
    for snapshot in &snapshots {
        output.push_str(&render_ascii(snapshot, config));
        output.push('\n');
    }
    if let [first, .., last] = snapshots.as_slice() {
        output.push_str(&render_battle_progress(first, last, config));
    }
    Ok(output)
}
