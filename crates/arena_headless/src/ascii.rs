//! ASCII board renderer for terminal review.
//!
//! Player one's units are drawn in uppercase, player two's in lowercase.
//! Cells claimed by a moving unit show `+`, empty cells `.`. A dashed
//! line marks the border between the two zones.

use std::fmt::Write as _;

use arena_core::prelude::*;

/// ASCII rendering options.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Append a health bar per unit below the board.
    pub show_health: bool,
    /// Append a per-kind unit count legend.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_health: true,
            show_legend: true,
            use_color: true,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BLUE: &str = "\x1b[34m";
    pub const RED: &str = "\x1b[31m";
}

fn unit_char(kind: UnitKind, owner: Player) -> char {
    let base = kind.glyph();
    match owner {
        Player::One => base.to_ascii_uppercase(),
        Player::Two => base,
    }
}

fn player_color(owner: Player) -> &'static str {
    match owner {
        Player::One => colors::BLUE,
        Player::Two => colors::RED,
    }
}

fn health_bar(health: u32, max: u32, width: usize) -> String {
    let filled = if max == 0 {
        0
    } else {
        (health as usize * width).div_ceil(max as usize)
    };
    let mut bar = String::with_capacity(width);
    bar.extend(std::iter::repeat('#').take(filled));
    bar.extend(std::iter::repeat('-').take(width - filled));
    bar
}

/// Render the board, a status line and the optional legend.
#[must_use]
pub fn render_ascii(battle: &Battle, config: &AsciiConfig) -> String {
    let grid = battle.grid();
    let mut out = String::new();

    let phase = match battle.phase() {
        BattlePhase::Setup => "setup".to_string(),
        BattlePhase::Battle => "battle".to_string(),
        BattlePhase::Finished(outcome) => format!("finished: {outcome}"),
    };
    let _ = writeln!(
        out,
        "tick {} | {:.2}s | {}",
        battle.tick_count(),
        battle.elapsed().to_num::<f64>(),
        phase
    );

    let border = grid.rows() / 2;
    for row in 0..grid.rows() {
        if row == border {
            let _ = writeln!(out, "{}", "-".repeat(grid.cols() as usize * 2 - 1));
        }
        for col in 0..grid.cols() {
            if col > 0 {
                out.push(' ');
            }
            let pos = GridPos::new(col, row);
            let Some(cell) = grid.cell(pos) else {
                continue;
            };
            match cell.unit().and_then(|id| battle.unit(id)) {
                Some(unit) => {
                    let glyph = unit_char(unit.kind(), unit.owner());
                    if config.use_color {
                        let _ = write!(out, "{}{glyph}{}", player_color(unit.owner()), colors::RESET);
                    } else {
                        out.push(glyph);
                    }
                }
                None if cell.reserved_by().is_some() => out.push('+'),
                None if config.use_color => {
                    let _ = write!(out, "{}.{}", colors::DIM, colors::RESET);
                }
                None => out.push('.'),
            }
        }
        out.push('\n');
    }

    if config.show_health {
        out.push('\n');
        for view in battle.unit_views().iter().filter(|v| !v.is_dead) {
            let _ = writeln!(
                out,
                "{} {:<9} {} [{}] {:>3}/{:<3} lv{}{}",
                view.id,
                view.kind.id(),
                view.cell,
                health_bar(view.health, view.max_health, 10),
                view.health,
                view.max_health,
                view.level,
                if view.taunted_by.is_some() { " taunted" } else { "" },
            );
        }
    }

    if config.show_legend {
        out.push('\n');
        for player in Player::ALL {
            let counts: Vec<String> = UnitKind::ALL
                .iter()
                .filter_map(|&kind| {
                    let n = battle
                        .units()
                        .values()
                        .filter(|u| u.is_alive() && u.owner() == player && u.kind() == kind)
                        .count();
                    (n > 0).then(|| format!("{}={n}", unit_char(kind, player)))
                })
                .collect();
            let _ = writeln!(out, "{player}: {}", counts.join(" "));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    fn plain() -> AsciiConfig {
        AsciiConfig {
            use_color: false,
            ..AsciiConfig::default()
        }
    }

    #[test]
    fn test_duel_board() {
        let battle = Scenario::duel().build().unwrap();
        let text = render_ascii(&battle, &plain());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "tick 0 | 0.00s | battle");
        assert_eq!(lines[1], ". . . .");
        assert_eq!(lines[2], ". s . .");
        assert_eq!(lines[3], "-------");
        assert_eq!(lines[4], ". S . .");
        assert_eq!(lines[5], ". . . .");
        assert!(text.contains("player 1: S=1"));
        assert!(text.contains("player 2: s=1"));
    }

    #[test]
    fn test_reserved_cell_marked() {
        let mut battle = Scenario::skirmish().build().unwrap();
        battle.tick();
        let config = AsciiConfig {
            show_health: false,
            show_legend: false,
            use_color: false,
        };
        let text = render_ascii(&battle, &config);
        assert!(text.contains('+'));
    }

    #[test]
    fn test_health_bar() {
        assert_eq!(health_bar(10, 10, 10), "##########");
        assert_eq!(health_bar(1, 10, 10), "#---------");
        assert_eq!(health_bar(0, 10, 4), "----");
    }

    #[test]
    fn test_color_codes_optional() {
        let battle = Scenario::duel().build().unwrap();
        assert!(render_ascii(&battle, &AsciiConfig::default()).contains(colors::RESET));
        assert!(!render_ascii(&battle, &plain()).contains('\x1b'));
    }
}
